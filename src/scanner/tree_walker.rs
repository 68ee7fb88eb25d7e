use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::scanner::FileFilter;
use crate::utils::relative_to;

/// 目录剪枝规则：隐藏目录和已知的构建/版本控制目录不进入
#[derive(Debug, Clone, Default)]
pub struct DirectoryRules {
    excluded: BTreeSet<String>,
    include_hidden: bool,
}

impl DirectoryRules {
    pub fn new(excluded: BTreeSet<String>, include_hidden: bool) -> Self {
        Self {
            excluded,
            include_hidden,
        }
    }

    pub fn from_scan(scan: &ScanConfig) -> Self {
        Self::new(scan.excluded_dirs.clone(), scan.include_hidden)
    }

    /// 该目录名是否应被剪枝
    pub fn prunes(&self, dir_name: &str) -> bool {
        if self.excluded.contains(dir_name) {
            return true;
        }
        !self.include_hidden && dir_name.starts_with('.') && dir_name != "." && dir_name != ".."
    }
}

/// 遍历产生的事件
#[derive(Debug)]
pub enum WalkEvent {
    /// 通过过滤的候选文件
    File(PathBuf),

    /// 无法读取的子目录或文件
    Skipped { path: PathBuf, error: String },

    /// 模块根目录本身无法读取
    RootUnreadable(String),
}

/// 目录遍历器
///
/// 深度优先；每个目录内先按名称访问文件，再按名称进入子目录。
/// 不跟随目录符号链接，指向普通文件的符号链接按普通文件处理。
#[derive(Debug, Clone)]
pub struct TreeWalker {
    project_root: PathBuf,
    filter: Arc<FileFilter>,
    rules: Arc<DirectoryRules>,
}

impl TreeWalker {
    pub fn new(project_root: impl Into<PathBuf>, filter: FileFilter, rules: DirectoryRules) -> Self {
        Self {
            project_root: project_root.into(),
            filter: Arc::new(filter),
            rules: Arc::new(rules),
        }
    }

    /// 开始一次独立的遍历
    pub fn walk(&self, module_root: &Path) -> ModuleFiles {
        self.walk_excluding(module_root, Vec::new())
    }

    /// 遍历时跳过 `skipped_dirs` 中的目录及其子树
    pub fn walk_excluding(&self, module_root: &Path, skipped_dirs: Vec<PathBuf>) -> ModuleFiles {
        let entries = WalkDir::new(module_root)
            .follow_links(false)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter();

        ModuleFiles {
            entries,
            project_root: self.project_root.clone(),
            filter: Arc::clone(&self.filter),
            rules: Arc::clone(&self.rules),
            skipped_dirs,
        }
    }
}

/// 单个模块的惰性文件序列
pub struct ModuleFiles {
    entries: walkdir::IntoIter,
    project_root: PathBuf,
    filter: Arc<FileFilter>,
    rules: Arc<DirectoryRules>,
    skipped_dirs: Vec<PathBuf>,
}

impl ModuleFiles {
    fn candidate(&self, path: &Path) -> Option<WalkEvent> {
        let relative = relative_to(path, &self.project_root);
        self.filter
            .accepts(relative)
            .then(|| WalkEvent::File(path.to_path_buf()))
    }
}

impl Iterator for ModuleFiles {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    if err.depth() == 0 {
                        return Some(WalkEvent::RootUnreadable(err.to_string()));
                    }
                    return Some(WalkEvent::Skipped {
                        path,
                        error: err.to_string(),
                    });
                }
            };

            let file_type = entry.file_type();

            if file_type.is_dir() {
                let name = entry.file_name().to_string_lossy();
                let pruned = entry.depth() > 0 && self.rules.prunes(&name);
                if pruned || self.skipped_dirs.iter().any(|dir| dir == entry.path()) {
                    self.entries.skip_current_dir();
                }
                continue;
            }

            if file_type.is_symlink() {
                match std::fs::metadata(entry.path()) {
                    Ok(metadata) if metadata.is_file() => {}
                    Ok(_) => continue,
                    Err(err) => {
                        if self.candidate(entry.path()).is_none() {
                            continue;
                        }
                        return Some(WalkEvent::Skipped {
                            path: entry.path().to_path_buf(),
                            error: err.to_string(),
                        });
                    }
                }
            } else if !file_type.is_file() {
                // 套接字、管道等特殊文件
                continue;
            }

            if let Some(event) = self.candidate(entry.path()) {
                return Some(event);
            }
        }
    }
}
