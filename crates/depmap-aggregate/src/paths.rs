use std::path::{Path, PathBuf};

use depmap_core::path::join_paths;

/// Path to a module's mini-tracker: `{module_path}/{module_name}_module.md`,
/// i.e. the tracker lives inside the directory it describes. Mirrors
/// `get_mini_tracker_path`'s fallback convention.
pub fn mini_tracker_path(module_path: &str) -> PathBuf {
    let module_name = Path::new(module_path).file_name().and_then(|s| s.to_str()).unwrap_or("module");
    PathBuf::from(join_paths(module_path, &format!("{module_name}_module.md")))
}

/// Path to the doc tracker: `{project_root}/{memory_dir}/{doc_tracker_filename}`.
pub fn doc_tracker_path(project_root: &str, memory_dir: &str, doc_tracker_filename: &str) -> PathBuf {
    PathBuf::from(join_paths(&join_paths(project_root, memory_dir), doc_tracker_filename))
}

/// Path to the main tracker: `{project_root}/{memory_dir}/{main_tracker_filename}`.
pub fn main_tracker_path(project_root: &str, memory_dir: &str, main_tracker_filename: &str) -> PathBuf {
    PathBuf::from(join_paths(&join_paths(project_root, memory_dir), main_tracker_filename))
}
