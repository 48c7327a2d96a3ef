use std::path::Path;

use depmap_analyze::AnalysisRecord;
use depmap_core::path::normalize_path;
use depmap_core::{GlobalKeyMap, COL_DEPENDS_CHAR};
use depmap_keys::get_key_from_path;

use crate::model::Suggestion;
use crate::resolve::css_import_candidate;

/// CSS `@import` dependencies, always `>`.
pub fn suggest_css_dependencies(record: &AnalysisRecord, path_to_key_info: &GlobalKeyMap) -> Vec<Suggestion> {
    let AnalysisRecord::Css { path, imports } = record else {
        return Vec::new();
    };
    let Some(source_key) = get_key_from_path(path, path_to_key_info) else {
        return Vec::new();
    };
    let source_dir = Path::new(path).parent().map(normalize_path).unwrap_or_else(|| "/".to_string());

    imports
        .iter()
        .filter_map(|import| {
            let resolved = css_import_candidate(&import.url, &source_dir)?;
            if !path_to_key_info.contains_key(&resolved) {
                return None;
            }
            let target_key = get_key_from_path(&resolved, path_to_key_info)?;
            (target_key != source_key).then(|| Suggestion::new(target_key, COL_DEPENDS_CHAR))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_analyze::LinkRef;
    use depmap_core::KeyInfo;

    fn key_info(key: &str, path: &str) -> KeyInfo {
        KeyInfo { key_string: key.to_string(), norm_path: path.to_string(), parent_path: None, tier: 1, is_directory: false }
    }

    #[test]
    fn css_import_resolves_to_col_depends_char() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/css/a.css".to_string(), key_info("1A", "/repo/css/a.css"));
        map.insert("/repo/css/base.css".to_string(), key_info("1B", "/repo/css/base.css"));

        let record = AnalysisRecord::Css {
            path: "/repo/css/a.css".to_string(),
            imports: vec![LinkRef { url: "./base.css".to_string(), line: 1 }],
        };

        let suggestions = suggest_css_dependencies(&record, &map);
        assert_eq!(suggestions, vec![Suggestion::new("1B", '>')]);
    }
}
