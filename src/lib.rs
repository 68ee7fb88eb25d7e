pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod scanner;
pub mod utils;

// 重新导出常用模块
pub use config::{Config, LineCountPolicy};
pub use error::{ConfigError, CountError, VerificationError};
pub use models::{FileCount, Module, ModuleCount, ModuleSpec, PartitionStrategy, RunStatus, SizeReport};
pub use report::{ReportFormatter, ReportStyle};
pub use scanner::{FileFilter, FileLineCounter, ModuleResolver, SizeCalculator, TreeWalker};
