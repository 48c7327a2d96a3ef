use std::path::Path;

use depmap_analyze::AnalysisRecord;
use depmap_core::{GlobalKeyMap, Result};
use depmap_keys::get_key_from_path;

use crate::css::suggest_css_dependencies;
use crate::html::suggest_html_dependencies;
use crate::javascript::suggest_javascript_dependencies;
use crate::markdown::suggest_documentation_dependencies;
use crate::model::{SimilarityThresholds, Suggestion};
use crate::priority::combine_with_char_priority;
use crate::python::suggest_python_dependencies;
use crate::semantic::suggest_semantic_dependencies;

/// Dispatches to the per-type static suggester and layers semantic
/// suggestions on top, then resolves conflicts by priority. Mirrors
/// `suggest_dependencies`'s extension-based dispatch, extended to route
/// `.html`/`.css` through their dedicated identifiers (present but unwired
/// in the source dispatcher) since static HTML/CSS edges are an explicit
/// requirement here.
pub fn suggest_dependencies(
    record: &AnalysisRecord,
    path_to_key_info: &GlobalKeyMap,
    project_root: &str,
    embeddings_dir: &Path,
    thresholds: SimilarityThresholds,
) -> Result<Vec<Suggestion>> {
    let Some(source_key) = get_key_from_path(record.path(), path_to_key_info) else {
        return Ok(Vec::new());
    };

    let mut suggestions = match record {
        AnalysisRecord::Py { .. } => suggest_python_dependencies(record, path_to_key_info, project_root),
        AnalysisRecord::Js { .. } => suggest_javascript_dependencies(record, path_to_key_info),
        AnalysisRecord::Md { .. } => suggest_documentation_dependencies(record, path_to_key_info),
        AnalysisRecord::Html { .. } => suggest_html_dependencies(record, path_to_key_info),
        AnalysisRecord::Css { .. } => suggest_css_dependencies(record, path_to_key_info),
        AnalysisRecord::Generic { .. } => Vec::new(),
    };

    suggestions.extend(suggest_semantic_dependencies(
        &source_key,
        path_to_key_info,
        embeddings_dir,
        Path::new(project_root),
        thresholds,
    )?);

    Ok(combine_with_char_priority(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;
    use tempfile::tempdir;

    #[test]
    fn generic_file_falls_back_to_semantic_only() {
        let root = tempdir().unwrap();
        let mut map = GlobalKeyMap::new();
        map.insert(
            "/repo/a.bin".to_string(),
            KeyInfo { key_string: "1A".to_string(), norm_path: "/repo/a.bin".to_string(), parent_path: None, tier: 1, is_directory: false },
        );
        let record = AnalysisRecord::Generic { path: "/repo/a.bin".to_string() };
        let suggestions = suggest_dependencies(
            &record,
            &map,
            "/repo",
            &root.path().join(".embeddings"),
            SimilarityThresholds::default(),
        )
        .unwrap();
        assert!(suggestions.is_empty());
    }

    #[test]
    fn unresolved_source_key_yields_no_suggestions() {
        let root = tempdir().unwrap();
        let map = GlobalKeyMap::new();
        let record = AnalysisRecord::Generic { path: "/repo/untracked.bin".to_string() };
        let suggestions = suggest_dependencies(
            &record,
            &map,
            "/repo",
            &root.path().join(".embeddings"),
            SimilarityThresholds::default(),
        )
        .unwrap();
        assert!(suggestions.is_empty());
    }
}
