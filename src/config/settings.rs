use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::defaults::DefaultConfig;
use crate::models::PartitionStrategy;
use crate::report::ReportStyle;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 项目根目录
    pub root: PathBuf,

    /// 模块划分
    pub modules: PartitionStrategy,

    /// 行计数规则
    pub policy: LineCountPolicy,

    /// 扫描配置
    pub scan: ScanConfig,

    /// 输出配置
    pub output: OutputConfig,
}

/// 行计数规则
///
/// 扩展名不带前导点，大小写不敏感；空字符串表示没有扩展名的文件。
/// 同一扩展名同时出现在包含和排除列表时，排除优先。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineCountPolicy {
    /// 是否计入空行
    pub count_blank_lines: bool,

    /// 是否计入注释行
    pub count_comments: bool,

    /// 只统计这些扩展名（为空则全部统计）
    pub include_extensions: BTreeSet<String>,

    /// 排除的扩展名
    pub exclude_extensions: BTreeSet<String>,

    /// 排除的路径 glob（相对于项目根目录）
    pub exclude_paths: Vec<String>,

    /// 排除的路径正则（相对于项目根目录）
    pub exclude_patterns: Vec<String>,
}

impl LineCountPolicy {
    pub fn include<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_extensions
            .extend(extensions.into_iter().map(|e| normalize_extension(e.as_ref())));
        self
    }

    pub fn exclude<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_extensions
            .extend(extensions.into_iter().map(|e| normalize_extension(e.as_ref())));
        self
    }
}

/// 统一扩展名格式：去掉前导点并转小写
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 并发计数的 worker 数
    pub workers: usize,

    /// 运行超时（秒）
    pub timeout_secs: Option<u64>,

    /// 取消后等待进行中任务的时间（毫秒）
    pub cancel_grace_millis: u64,

    /// 遍历时剪枝的目录名
    pub excluded_dirs: BTreeSet<String>,

    /// 是否进入隐藏目录
    pub include_hidden: bool,
}

impl ScanConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_millis)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: DefaultConfig::default_workers(),
            timeout_secs: None,
            cancel_grace_millis: DefaultConfig::default_cancel_grace_millis(),
            excluded_dirs: DefaultConfig::default_excluded_dirs(),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 默认报告格式
    pub format: ReportStyle,
}

impl Config {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 `{}`", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件 `{}`", path.display()))?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("无法写入配置文件 `{}`", path.display()))?;
        Ok(())
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("无法找到配置目录"))?;
        path.push("module-size-cli");
        path.push("config.toml");
        Ok(path)
    }

    /// 加载默认位置的配置，文件不存在时使用默认值
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }
}
