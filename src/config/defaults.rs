use std::collections::BTreeSet;

pub struct DefaultConfig;

impl DefaultConfig {
    /// 默认剪枝的目录名（遍历时不进入）
    pub fn default_excluded_dirs() -> BTreeSet<String> {
        [
            // 版本控制
            ".git", ".svn", ".hg", ".bzr",
            // 构建产物
            "target", "build", "dist", "out", "bin", "obj",
            // 依赖目录
            "node_modules", "bower_components", "vendor",
            // Python 相关
            "__pycache__", ".pytest_cache", "venv", ".venv", ".tox",
            // IDE 和工具目录
            ".idea", ".vscode", ".vs", ".gradle",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// 默认并发数
    pub fn default_workers() -> usize {
        num_cpus::get().max(1)
    }

    /// 取消后等待进行中任务的时间
    pub fn default_cancel_grace_millis() -> u64 {
        2_000
    }
}
