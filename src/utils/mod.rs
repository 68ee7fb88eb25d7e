pub mod paths;
pub mod time_format;

pub use paths::{normalize_path, relative_to};
pub use time_format::format_duration;
