pub mod defaults;
pub mod settings;

pub use defaults::DefaultConfig;
pub use settings::{normalize_extension, Config, LineCountPolicy, OutputConfig, ScanConfig};
