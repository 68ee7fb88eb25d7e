use std::path::PathBuf;
use thiserror::Error;

/// 配置错误 - 在开始计数之前发现，整个运行立即中止
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{0}` 下没有解析出任何模块")]
    NoModules(PathBuf),

    #[error("模块名称 `{0}` 重复定义")]
    DuplicateModule(String),

    #[error("模块 `{first}` 与模块 `{second}` 的根目录重叠")]
    OverlappingRoots { first: String, second: String },

    #[error("项目根目录 `{0}` 不存在或不是目录")]
    InvalidProjectRoot(PathBuf),

    #[error("模块 `{name}` 的根目录 `{path}` 不存在或不是目录")]
    InvalidModuleRoot { name: String, path: PathBuf },

    #[error("无效的排除 glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("无效的排除正则 `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("阈值必须在 (0, 1] 范围内，实际为 {0}")]
    InvalidThreshold(f64),

    #[error("模块 `{0}` 未定义")]
    UnknownModule(String),

    #[error("允许的文件数必须大于等于 0，实际为 {0}")]
    InvalidFileCount(i64),
}

/// 单个文件计数失败 - 跳过该文件并记录，不中止整个报告
#[derive(Debug, Error)]
pub enum CountError {
    #[error("无法读取 `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{path}` 不是有效的文本（第 {line} 行）")]
    Encoding { path: PathBuf, line: usize },
}

/// 模块大小校验失败
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Module `{0}` is empty.")]
    EmptyModule(String),

    #[error("Module `{module}` relative size is {size}. Max allowed size is {threshold}.")]
    RelativeSizeExceeded {
        module: String,
        size: String,
        threshold: String,
    },

    #[error("Number of files in undefined module is {count}. Max allowed count is {allowed}.")]
    UndefinedFileCountExceeded { count: usize, allowed: i64 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
