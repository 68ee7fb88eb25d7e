pub mod formatter;
pub mod verification;

pub use formatter::{ReportFormatter, ReportStyle};
