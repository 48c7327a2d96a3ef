use depmap_core::path::{is_subpath, join_paths, normalize_path};
use depmap_core::GlobalKeyMap;
use tracing::warn;

/// Selects the directory `KeyInfo`s eligible for the main tracker: anything
/// at or under one of `code_root_directories` (project-relative). Mirrors
/// `main_key_filter`.
pub fn filter_main_tracker_modules(
    project_root: &str,
    path_to_key_info: &GlobalKeyMap,
    code_root_directories: &[String],
) -> GlobalKeyMap {
    filter_by_roots(project_root, path_to_key_info, code_root_directories)
}

/// Selects the `KeyInfo`s (files and directories) eligible for the doc
/// tracker: anything at or under one of `doc_root_directories`. Mirrors
/// `doc_file_inclusion_logic`, which unlike the main tracker's filter does
/// not restrict to directories.
pub fn filter_doc_tracker_items(
    project_root: &str,
    path_to_key_info: &GlobalKeyMap,
    doc_root_directories: &[String],
) -> GlobalKeyMap {
    let roots = abs_roots(project_root, doc_root_directories);
    if roots.is_empty() {
        warn!("no doc root directories configured for doc tracker filtering");
        return GlobalKeyMap::new();
    }
    path_to_key_info
        .iter()
        .filter(|(norm_path, _)| roots.iter().any(|root| *norm_path == root || is_subpath(root, norm_path)))
        .map(|(p, info)| (p.clone(), info.clone()))
        .collect()
}

fn filter_by_roots(project_root: &str, path_to_key_info: &GlobalKeyMap, root_dirs: &[String]) -> GlobalKeyMap {
    let roots = abs_roots(project_root, root_dirs);
    if roots.is_empty() {
        warn!("no code root directories configured for main tracker key filtering");
        return GlobalKeyMap::new();
    }
    path_to_key_info
        .iter()
        .filter(|(norm_path, info)| {
            info.is_directory && roots.iter().any(|root| *norm_path == root || is_subpath(root, norm_path))
        })
        .map(|(p, info)| (p.clone(), info.clone()))
        .collect()
}

fn abs_roots(project_root: &str, root_dirs: &[String]) -> Vec<String> {
    root_dirs.iter().map(|r| join_paths(project_root, r)).map(|p| normalize_path(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;

    fn dir(key: &str, path: &str) -> KeyInfo {
        KeyInfo { key_string: key.to_string(), norm_path: path.to_string(), parent_path: None, tier: 1, is_directory: true }
    }
    fn file(key: &str, path: &str) -> KeyInfo {
        KeyInfo { key_string: key.to_string(), norm_path: path.to_string(), parent_path: None, tier: 1, is_directory: false }
    }

    #[test]
    fn selects_only_directories_under_code_roots() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/src".into(), dir("1A", "/repo/src"));
        map.insert("/repo/src/a.py".into(), file("1A1", "/repo/src/a.py"));
        map.insert("/repo/docs".into(), dir("2A", "/repo/docs"));

        let filtered = filter_main_tracker_modules("/repo", &map, &["src".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("/repo/src"));
    }

    #[test]
    fn no_code_roots_yields_empty() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/src".into(), dir("1A", "/repo/src"));
        let filtered = filter_main_tracker_modules("/repo", &map, &[]);
        assert!(filtered.is_empty());
    }

    #[test]
    fn doc_filter_includes_files_and_dirs() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/docs".into(), dir("2A", "/repo/docs"));
        map.insert("/repo/docs/guide.md".into(), file("2A1", "/repo/docs/guide.md"));
        map.insert("/repo/src/a.py".into(), file("1A1", "/repo/src/a.py"));

        let filtered = filter_doc_tracker_items("/repo", &map, &["docs".to_string()]);
        assert_eq!(filtered.len(), 2);
    }
}
