use std::path::Path;

use depmap_analyze::AnalysisRecord;
use depmap_core::path::normalize_path;
use depmap_core::{GlobalKeyMap, DOC_CHAR};
use depmap_keys::get_key_from_path;

use crate::model::Suggestion;
use crate::resolve::markdown_link_candidates;

/// Local Markdown links (`d`), with `.md`/`.rst`/`index.md`/`README.md`
/// fallbacks for extensionless directory-style links.
pub fn suggest_documentation_dependencies(record: &AnalysisRecord, path_to_key_info: &GlobalKeyMap) -> Vec<Suggestion> {
    let AnalysisRecord::Md { path, links } = record else {
        return Vec::new();
    };
    let Some(source_key) = get_key_from_path(path, path_to_key_info) else {
        return Vec::new();
    };
    let source_dir = Path::new(path).parent().map(normalize_path).unwrap_or_else(|| "/".to_string());

    links
        .iter()
        .filter_map(|link| {
            let target_path = markdown_link_candidates(&link.url, &source_dir)
                .into_iter()
                .find(|c| path_to_key_info.contains_key(c))?;
            let target_key = get_key_from_path(&target_path, path_to_key_info)?;
            (target_key != source_key).then(|| Suggestion::new(target_key, DOC_CHAR))
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
    fn local_link_resolves_to_doc_char() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/docs/a.md".to_string(), key_info("1A", "/repo/docs/a.md"));
        map.insert("/repo/docs/b.md".to_string(), key_info("1B", "/repo/docs/b.md"));

        let record = AnalysisRecord::Md {
            path: "/repo/docs/a.md".to_string(),
            links: vec![LinkRef { url: "./b.md".to_string(), line: 1 }],
        };

        let suggestions = suggest_documentation_dependencies(&record, &map);
        assert_eq!(suggestions, vec![Suggestion::new("1B", 'd')]);
    }
}
