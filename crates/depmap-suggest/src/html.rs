use std::path::Path;

use depmap_analyze::{AnalysisRecord, LinkRef};
use depmap_core::path::normalize_path;
use depmap_core::{GlobalKeyMap, COL_DEPENDS_CHAR, DOC_CHAR};
use depmap_keys::get_key_from_path;

use crate::model::Suggestion;
use crate::resolve::html_resource_candidate;

#[derive(Clone, Copy)]
enum ResourceKind {
    Link,
    Script,
    Style,
    Image,
}

fn dep_char_for(kind: ResourceKind, target_ext: &str) -> char {
    match kind {
        ResourceKind::Style => DOC_CHAR,
        ResourceKind::Script if matches!(target_ext, "js" | "ts" | "mjs") => COL_DEPENDS_CHAR,
        ResourceKind::Link if matches!(target_ext, "html" | "htm") => DOC_CHAR,
        ResourceKind::Link if matches!(target_ext, "md" | "rst") => DOC_CHAR,
        _ if target_ext == "css" => DOC_CHAR,
        _ => COL_DEPENDS_CHAR,
    }
}

fn collect(
    links: &[LinkRef],
    kind: ResourceKind,
    source_dir: &str,
    path_to_key_info: &GlobalKeyMap,
    source_key: &str,
    out: &mut Vec<Suggestion>,
) {
    for link in links {
        let Some(resolved) = html_resource_candidate(&link.url, source_dir) else { continue };
        if !path_to_key_info.contains_key(&resolved) {
            continue;
        }
        let Some(target_key) = get_key_from_path(&resolved, path_to_key_info) else { continue };
        if target_key == source_key {
            continue;
        }
        let ext = Path::new(&resolved)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        out.push(Suggestion::new(target_key, dep_char_for(kind, &ext)));
    }
}

/// Static HTML resource dependencies: anchors/scripts to `>` (unless the
/// target is itself documentation, which becomes `d`), stylesheets and
/// cross-document links to `d`.
pub fn suggest_html_dependencies(record: &AnalysisRecord, path_to_key_info: &GlobalKeyMap) -> Vec<Suggestion> {
    let AnalysisRecord::Html { path, links, scripts, stylesheets, images } = record else {
        return Vec::new();
    };
    let Some(source_key) = get_key_from_path(path, path_to_key_info) else {
        return Vec::new();
    };
    let source_dir = Path::new(path).parent().map(normalize_path).unwrap_or_else(|| "/".to_string());

    let mut out = Vec::new();
    collect(links, ResourceKind::Link, &source_dir, path_to_key_info, &source_key, &mut out);
    collect(scripts, ResourceKind::Script, &source_dir, path_to_key_info, &source_key, &mut out);
    collect(stylesheets, ResourceKind::Style, &source_dir, path_to_key_info, &source_key, &mut out);
    collect(images, ResourceKind::Image, &source_dir, path_to_key_info, &source_key, &mut out);
    out
}
