use std::path::Path;

use depmap_analyze::AnalysisRecord;
use depmap_core::path::normalize_path;
use depmap_core::GlobalKeyMap;
use depmap_keys::get_key_from_path;

use crate::model::Suggestion;
use crate::resolve::js_import_candidates;

/// Explicit JS/TS import dependencies (`>`). Bare package specifiers
/// (`react`, `lodash/debounce`) never resolve, since they're not
/// project-local paths and aren't tracked.
pub fn suggest_javascript_dependencies(record: &AnalysisRecord, path_to_key_info: &GlobalKeyMap) -> Vec<Suggestion> {
    let AnalysisRecord::Js { path, imports, .. } = record else {
        return Vec::new();
    };
    let Some(source_key) = get_key_from_path(path, path_to_key_info) else {
        return Vec::new();
    };
    let source_dir = Path::new(path).parent().map(normalize_path).unwrap_or_else(|| "/".to_string());

    imports
        .iter()
        .filter_map(|import_path| {
            let target_path = js_import_candidates(import_path, &source_dir)
                .into_iter()
                .find(|c| path_to_key_info.contains_key(c))?;
            let target_key = get_key_from_path(&target_path, path_to_key_info)?;
            (target_key != source_key).then(|| Suggestion::new(target_key, '>'))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_analyze::{ClassRef, FunctionRef};
    use depmap_core::KeyInfo;

    fn key_info(key: &str, path: &str) -> KeyInfo {
        KeyInfo { key_string: key.to_string(), norm_path: path.to_string(), parent_path: None, tier: 1, is_directory: false }
    }

    #[test]
    fn relative_import_resolves_to_tracked_sibling() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/src/a.js".to_string(), key_info("1A", "/repo/src/a.js"));
        map.insert("/repo/src/b.js".to_string(), key_info("1B", "/repo/src/b.js"));

        let record = AnalysisRecord::Js {
            path: "/repo/src/a.js".to_string(),
            imports: vec!["./b".to_string()],
            functions: Vec::<FunctionRef>::new(),
            classes: Vec::<ClassRef>::new(),
        };

        let suggestions = suggest_javascript_dependencies(&record, &map);
        assert_eq!(suggestions, vec![Suggestion::new("1B", '>')]);
    }

    #[test]
    fn bare_package_import_is_not_suggested() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/src/a.js".to_string(), key_info("1A", "/repo/src/a.js"));

        let record = AnalysisRecord::Js {
            path: "/repo/src/a.js".to_string(),
            imports: vec!["react".to_string()],
            functions: Vec::<FunctionRef>::new(),
            classes: Vec::<ClassRef>::new(),
        };

        assert!(suggest_javascript_dependencies(&record, &map).is_empty());
    }
}
