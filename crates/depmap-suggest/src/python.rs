use std::collections::HashMap;
use std::path::Path;

use depmap_analyze::{AnalysisRecord, AttributeAccessRef, CallRef, InheritanceRef};
use depmap_core::path::normalize_path;
use depmap_core::GlobalKeyMap;
use depmap_keys::get_key_from_path;

use crate::model::Suggestion;
use crate::resolve::python_import_candidates;

fn source_dir_of(norm_file_path: &str) -> String {
    Path::new(norm_file_path)
        .parent()
        .map(|p| normalize_path(p))
        .unwrap_or_else(|| "/".to_string())
}

/// Resolves each of the file's own `import`/`from ... import` references to
/// a tracked path, keyed by the bound local name. Lossy relative to the
/// original's AST-driven import map: the regex analyzer only captures the
/// module path, not aliases or the individual names pulled out of a
/// `from X import a, b` statement, so this maps the module's last path
/// segment (e.g. `sibling` for `from .sibling import helper`) rather than
/// each imported symbol.
fn build_import_map(imports: &[String], source_dir: &str, project_root: &str, tracked: &GlobalKeyMap) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for import_name in imports {
        let candidates = python_import_candidates(import_name, source_dir, project_root);
        let resolved = candidates.into_iter().find(|c| tracked.contains_key(c));
        let Some(resolved_path) = resolved else { continue };
        let bound_name = import_name
            .trim_start_matches('.')
            .split('.')
            .next()
            .filter(|s| !s.is_empty())
            .or_else(|| import_name.trim_start_matches('.').split('.').last())
            .unwrap_or(import_name)
            .to_string();
        if !bound_name.is_empty() {
            map.insert(bound_name, resolved_path);
        }
    }
    map
}

fn resolve_via_import_map(potential_source: &str, import_map: &HashMap<String, String>) -> Option<String> {
    let base_name = potential_source.split('.').next()?;
    import_map.get(base_name).cloned()
}

/// Explicit import dependencies (`>`), via direct resolution of each import
/// statement to a tracked module path.
fn explicit_suggestions(imports: &[String], source_dir: &str, project_root: &str, tracked: &GlobalKeyMap) -> Vec<String> {
    let mut resolved = Vec::new();
    for import_name in imports {
        let candidates = python_import_candidates(import_name, source_dir, project_root);
        if let Some(path) = candidates.into_iter().find(|c| tracked.contains_key(c)) {
            resolved.push(path);
        }
    }
    resolved
}

/// Structural dependencies (calls/attribute access → `>`, inheritance →
/// `<`), resolved through the file's own import map.
fn structural_suggestions(
    calls: &[CallRef],
    attrs: &[AttributeAccessRef],
    inheritance: &[InheritanceRef],
    import_map: &HashMap<String, String>,
) -> Vec<(String, char)> {
    let mut out = Vec::new();
    for call in calls {
        if let Some(source) = &call.potential_source {
            if let Some(path) = resolve_via_import_map(source, import_map) {
                out.push((path, '>'));
            }
        }
    }
    for attr in attrs {
        if let Some(path) = resolve_via_import_map(&attr.potential_source, import_map) {
            out.push((path, '>'));
        }
    }
    for inh in inheritance {
        if let Some(path) = resolve_via_import_map(&inh.potential_source, import_map) {
            out.push((path, '<'));
        }
    }
    out
}

/// Builds static suggestions for a Python file's explicit imports and
/// structural references (calls, attribute access, inheritance). Semantic
/// suggestions are layered on separately by the caller.
pub fn suggest_python_dependencies(
    record: &AnalysisRecord,
    path_to_key_info: &GlobalKeyMap,
    project_root: &str,
) -> Vec<Suggestion> {
    let AnalysisRecord::Py { path, imports, calls, attribute_accesses, inheritance, .. } = record else {
        return Vec::new();
    };

    let source_key = match get_key_from_path(path, path_to_key_info) {
        Some(k) => k,
        None => return Vec::new(),
    };
    let source_dir = source_dir_of(path);

    let import_map = build_import_map(imports, &source_dir, project_root, path_to_key_info);

    let mut pairs: Vec<(String, char)> = explicit_suggestions(imports, &source_dir, project_root, path_to_key_info)
        .into_iter()
        .map(|p| (p, '>'))
        .collect();
    pairs.extend(structural_suggestions(calls, attribute_accesses, inheritance, &import_map));

    pairs
        .into_iter()
        .filter_map(|(target_path, dep_char)| {
            let target_key = get_key_from_path(&target_path, path_to_key_info)?;
            (target_key != source_key).then(|| Suggestion::new(target_key, dep_char))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_analyze::{ClassRef, FunctionRef};
    use depmap_core::KeyInfo;

    fn key_info(key: &str, path: &str) -> KeyInfo {
        KeyInfo {
            key_string: key.to_string(),
            norm_path: path.to_string(),
            parent_path: None,
            tier: 1,
            is_directory: false,
        }
    }

    #[test]
    fn explicit_import_resolves_to_tracked_module() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/pkg/a.py".to_string(), key_info("1A", "/repo/pkg/a.py"));
        map.insert("/repo/pkg/b.py".to_string(), key_info("1B", "/repo/pkg/b.py"));

        let record = AnalysisRecord::Py {
            path: "/repo/pkg/a.py".to_string(),
            imports: vec![".b".to_string()],
            functions: Vec::<FunctionRef>::new(),
            classes: Vec::<ClassRef>::new(),
            calls: Vec::new(),
            attribute_accesses: Vec::new(),
            inheritance: Vec::new(),
        };

        let suggestions = suggest_python_dependencies(&record, &map, "/repo");
        assert_eq!(suggestions, vec![Suggestion::new("1B", '>')]);
    }

    #[test]
    fn inheritance_resolves_through_import_map_to_row_depends_char() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/pkg/a.py".to_string(), key_info("1A", "/repo/pkg/a.py"));
        map.insert("/repo/pkg/base.py".to_string(), key_info("1Z", "/repo/pkg/base.py"));

        let record = AnalysisRecord::Py {
            path: "/repo/pkg/a.py".to_string(),
            imports: vec![".base".to_string()],
            functions: Vec::<FunctionRef>::new(),
            classes: Vec::<ClassRef>::new(),
            calls: Vec::new(),
            attribute_accesses: Vec::new(),
            inheritance: vec![InheritanceRef {
                class_name: "Derived".to_string(),
                base_class_name: "Base".to_string(),
                potential_source: "base".to_string(),
                line: 1,
            }],
        };

        let suggestions = suggest_python_dependencies(&record, &map, "/repo");
        assert!(suggestions.contains(&Suggestion::new("1Z", '<')));
    }

    #[test]
    fn unresolved_calls_produce_no_suggestions() {
        let mut map = GlobalKeyMap::new();
        map.insert("/repo/pkg/a.py".to_string(), key_info("1A", "/repo/pkg/a.py"));

        let record = AnalysisRecord::Py {
            path: "/repo/pkg/a.py".to_string(),
            imports: Vec::new(),
            functions: Vec::<FunctionRef>::new(),
            classes: Vec::<ClassRef>::new(),
            calls: vec![CallRef { target_name: "untracked.helper".to_string(), potential_source: Some("untracked".to_string()), line: 1 }],
            attribute_accesses: Vec::new(),
            inheritance: Vec::new(),
        };

        let suggestions = suggest_python_dependencies(&record, &map, "/repo");
        assert!(suggestions.is_empty());
    }
}
