use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::{normalize_extension, LineCountPolicy};
use crate::error::ConfigError;
use crate::utils::normalize_path;

/// 单条过滤规则
#[derive(Debug, Clone)]
enum FilterRule {
    /// 路径匹配任一 glob 则排除
    ExcludeGlobs(GlobSet),

    /// 路径匹配任一正则则排除
    ExcludePatterns(Vec<Regex>),

    /// 扩展名在集合中则排除
    ExcludeExtensions(BTreeSet<String>),

    /// 扩展名不在集合中则排除
    IncludeExtensions(BTreeSet<String>),
}

impl FilterRule {
    fn rejects(&self, path: &str, extension: &str) -> bool {
        match self {
            FilterRule::ExcludeGlobs(globs) => globs.is_match(path),
            FilterRule::ExcludePatterns(patterns) => patterns.iter().any(|re| re.is_match(path)),
            FilterRule::ExcludeExtensions(extensions) => extensions.contains(extension),
            FilterRule::IncludeExtensions(extensions) => !extensions.contains(extension),
        }
    }
}

/// 文件过滤器 - 按顺序应用规则，第一个拒绝的规则生效
///
/// 只检查路径字符串，不做任何 I/O。
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    rules: Vec<FilterRule>,
}

impl FileFilter {
    /// 根据行计数规则构建过滤器
    pub fn new(policy: &LineCountPolicy) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();

        if !policy.exclude_paths.is_empty() {
            let mut builder = GlobSetBuilder::new();
            for pattern in &policy.exclude_paths {
                let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                    pattern: pattern.clone(),
                    source,
                })?;
                builder.add(glob);
            }
            let globs = builder.build().map_err(|source| ConfigError::InvalidGlob {
                pattern: policy.exclude_paths.join(", "),
                source,
            })?;
            rules.push(FilterRule::ExcludeGlobs(globs));
        }

        if !policy.exclude_patterns.is_empty() {
            let patterns = policy
                .exclude_patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(FilterRule::ExcludePatterns(patterns));
        }

        let excluded: BTreeSet<String> = policy
            .exclude_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect();
        if !excluded.is_empty() {
            rules.push(FilterRule::ExcludeExtensions(excluded));
        }

        let included: BTreeSet<String> = policy
            .include_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect();
        if !included.is_empty() {
            rules.push(FilterRule::IncludeExtensions(included));
        }

        Ok(Self { rules })
    }

    /// 接受所有文件的过滤器
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// 判断文件是否参与计数
    ///
    /// `relative_path` 是相对于项目根目录的路径。
    pub fn accepts(&self, relative_path: &Path) -> bool {
        let path = normalize_path(relative_path);
        let extension = extension_of(relative_path);
        !self.rules.iter().any(|rule| rule.rejects(&path, &extension))
    }
}

/// 小写、无前导点的扩展名；没有扩展名时为空字符串
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
        .unwrap_or_default()
}
