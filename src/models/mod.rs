pub mod module;
pub mod size_report;

pub use module::{Module, ModuleSpec, PartitionStrategy, UNDEFINED_MODULE};
pub use size_report::{FileCount, ModuleCount, RunStatus, SizeReport};
