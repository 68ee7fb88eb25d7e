use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::models::{Module, ModuleSpec, PartitionStrategy};
use crate::scanner::DirectoryRules;

/// 模块解析器 - 将项目根目录划分为互不重叠的模块
pub struct ModuleResolver {
    rules: DirectoryRules,
}

impl ModuleResolver {
    pub fn new(rules: DirectoryRules) -> Self {
        Self { rules }
    }

    /// 按策略解析模块列表
    ///
    /// 任何划分错误都在读取文件之前返回。
    pub fn resolve(
        &self,
        project_root: &Path,
        strategy: &PartitionStrategy,
    ) -> Result<Vec<Module>, ConfigError> {
        let root = canonical_dir(project_root)
            .ok_or_else(|| ConfigError::InvalidProjectRoot(project_root.to_path_buf()))?;

        let modules = match strategy {
            PartitionStrategy::Explicit { entries, .. } => Self::explicit(&root, entries)?,
            PartitionStrategy::Subdirectories => self.subdirectories(&root)?,
            PartitionStrategy::WholeRoot { name } => {
                let name = name.clone().unwrap_or_else(|| {
                    root.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| ".".to_string())
                });
                vec![Module::new(name, root.clone())]
            }
        };

        validate_modules(&root, &modules)?;

        for module in &modules {
            tracing::debug!("模块 `{}` -> {}", module.name, module.root_path.display());
        }

        Ok(modules)
    }

    fn explicit(root: &Path, entries: &[ModuleSpec]) -> Result<Vec<Module>, ConfigError> {
        entries
            .iter()
            .map(|spec| {
                let path = root.join(spec.relative_path());
                let root_path = canonical_dir(&path).ok_or_else(|| ConfigError::InvalidModuleRoot {
                    name: spec.name.clone(),
                    path: path.clone(),
                })?;
                Ok(Module::new(spec.name.clone(), root_path))
            })
            .collect()
    }

    /// 每个直接子目录一个模块，按名称排序；符号链接和剪枝目录不算
    fn subdirectories(&self, root: &Path) -> Result<Vec<Module>, ConfigError> {
        let entries = std::fs::read_dir(root)
            .map_err(|_| ConfigError::InvalidProjectRoot(root.to_path_buf()))?;

        let mut modules: Vec<Module> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                if self.rules.prunes(&name) {
                    None
                } else {
                    Some(Module::new(name, entry.path()))
                }
            })
            .collect();

        modules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(modules)
    }
}

/// 名称唯一、根目录互不包含，且至少有一个模块
pub(crate) fn validate_modules(root: &Path, modules: &[Module]) -> Result<(), ConfigError> {
    if modules.is_empty() {
        return Err(ConfigError::NoModules(root.to_path_buf()));
    }

    let mut names = HashSet::new();
    for module in modules {
        if !names.insert(module.name.as_str()) {
            return Err(ConfigError::DuplicateModule(module.name.clone()));
        }
    }

    for (i, first) in modules.iter().enumerate() {
        for second in &modules[i + 1..] {
            if first.root_path.starts_with(&second.root_path)
                || second.root_path.starts_with(&first.root_path)
            {
                return Err(ConfigError::OverlappingRoots {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }
    }

    Ok(())
}

fn canonical_dir(path: &Path) -> Option<PathBuf> {
    let canonical = path.canonicalize().ok()?;
    canonical.is_dir().then_some(canonical)
}
