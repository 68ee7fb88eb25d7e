use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 一个模块：名称 + 根目录
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    /// 模块名称（报告中唯一）
    pub name: String,

    /// 模块根目录（绝对路径）
    pub root_path: PathBuf,
}

impl Module {
    pub fn new(name: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.into(),
        }
    }
}

/// 显式模块定义
///
/// `path` 缺省时，名称按包名解析：`pl.tfij.orders` 对应 `pl/tfij/orders`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// 显示名称
    pub name: String,

    /// 相对于项目根目录的路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }

    /// 以目录作为模块，名称即目录路径
    pub fn dir(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path: Some(PathBuf::from(&path)),
            name: path,
        }
    }

    /// 以包名作为模块
    pub fn package(package: impl Into<String>) -> Self {
        Self {
            name: package.into(),
            path: None,
        }
    }

    /// 相对于项目根目录的模块路径
    pub fn relative_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => self.name.split('.').filter(|s| !s.is_empty()).collect(),
        }
    }
}

/// 模块划分策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PartitionStrategy {
    /// 显式列出的 (名称, 相对路径)
    ///
    /// `include_undefined` 打开时，根目录下不属于任何模块的文件
    /// 归入名为 `undefined` 的模块。
    Explicit {
        entries: Vec<ModuleSpec>,
        #[serde(default)]
        include_undefined: bool,
    },

    /// 根目录下的每个直接子目录是一个模块
    Subdirectories,

    /// 整个根目录作为单个模块
    WholeRoot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// 未归属任何模块的文件所在的模块名
pub const UNDEFINED_MODULE: &str = "undefined";

impl PartitionStrategy {
    /// 显式模块，不统计未归属的文件
    pub fn explicit(entries: Vec<ModuleSpec>) -> Self {
        PartitionStrategy::Explicit {
            entries,
            include_undefined: false,
        }
    }

    pub fn includes_undefined(&self) -> bool {
        matches!(
            self,
            PartitionStrategy::Explicit {
                include_undefined: true,
                ..
            }
        )
    }
}

impl Default for PartitionStrategy {
    fn default() -> Self {
        PartitionStrategy::Subdirectories
    }
}
