pub mod comment_syntax;
pub mod file_filter;
pub mod line_counter;
pub mod module_resolver;
pub mod size_calculator;
pub mod tree_walker;

pub use comment_syntax::CommentSyntax;
pub use file_filter::FileFilter;
pub use line_counter::FileLineCounter;
pub use module_resolver::ModuleResolver;
pub use size_calculator::{ProgressCallback, ScanProgress, SizeCalculator};
pub use tree_walker::{DirectoryRules, ModuleFiles, TreeWalker, WalkEvent};
