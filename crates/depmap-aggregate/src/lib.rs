pub mod module_filter;
pub mod paths;
pub mod rollup;

pub use module_filter::{filter_doc_tracker_items, filter_main_tracker_modules};
pub use paths::{doc_tracker_path, main_tracker_path, mini_tracker_path};
pub use rollup::aggregate_dependencies;
