use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use depmap_core::path::is_subpath;
use depmap_core::{char_priority, GlobalKeyMap, NO_DEPENDENCY_CHAR, PLACEHOLDER_CHAR};
use depmap_grid::get_char_at;
use depmap_keys::sort_key_strings_hierarchically;
use depmap_tracker::parse_tracker_file;

use crate::context::AppContext;
use crate::query::all_tracker_paths;

struct ResolvedEdge {
    source: String,
    target: String,
    ch: char,
}

/// Implements `visualize-dependencies`: renders a Mermaid `flowchart TB`
/// with subgraphs nested to mirror the project's directory hierarchy.
/// `focus_key` narrows the rendered node set to that key and its immediate
/// neighbors; `None` renders every tracked key.
pub fn visualize_dependencies(ctx: &AppContext, focus_key: Option<&str>) -> Result<String> {
    let map = depmap_keys::load_global_key_map(&ctx.memory_dir)
        .context("failed to read global key map")?
        .context("no global key map found; run analyze-project first")?;

    let tracker_paths = all_tracker_paths(ctx, &map);
    let edges = collect_edges(&tracker_paths, &map);

    let visible_keys: HashSet<String> = match focus_key {
        Some(k) => {
            let mut set = HashSet::new();
            set.insert(k.to_string());
            for edge in &edges {
                if edge.source == k {
                    set.insert(edge.target.clone());
                } else if edge.target == k {
                    set.insert(edge.source.clone());
                }
            }
            set
        }
        None => map.values().map(|info| info.key_string.clone()).collect(),
    };

    let visible_edges: Vec<&ResolvedEdge> = edges
        .iter()
        .filter(|e| visible_keys.contains(&e.source) && visible_keys.contains(&e.target))
        .collect();

    Ok(render_mermaid(&map, &visible_keys, &visible_edges))
}

/// Scans every tracker file and resolves, per ordered key pair, the
/// highest-priority character recorded anywhere, then drops the edges the
/// query surface says aren't worth drawing: structural parent/child `x`,
/// file/directory type mismatches, and unresolved placeholders.
fn collect_edges(tracker_paths: &[std::path::PathBuf], map: &GlobalKeyMap) -> Vec<ResolvedEdge> {
    let mut best: HashMap<(String, String), (char, i32)> = HashMap::new();

    for path in tracker_paths {
        let doc = parse_tracker_file(path);
        if doc.key_defs.is_empty() {
            continue;
        }
        let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());
        for row_key in &sorted_keys {
            let Some(compressed) = doc.grid.get(row_key) else { continue };
            for (col_idx, col_key) in sorted_keys.iter().enumerate() {
                if row_key == col_key {
                    continue;
                }
                let Some(ch) = get_char_at(compressed, col_idx) else { continue };
                if ch == PLACEHOLDER_CHAR || ch == '.' {
                    continue;
                }
                let priority = char_priority(ch);
                let entry = best.entry((row_key.clone(), col_key.clone())).or_insert((ch, priority));
                if priority > entry.1 {
                    *entry = (ch, priority);
                }
            }
        }
    }

    best.into_iter()
        .filter(|((source, target), (ch, _))| keep_edge(map, source, target, *ch))
        .map(|((source, target), (ch, _))| ResolvedEdge { source, target, ch })
        .collect()
}

fn keep_edge(map: &GlobalKeyMap, source_key: &str, target_key: &str, ch: char) -> bool {
    if ch == NO_DEPENDENCY_CHAR {
        return false;
    }
    let Some(source) = map.values().find(|i| i.key_string == source_key) else { return true };
    let Some(target) = map.values().find(|i| i.key_string == target_key) else { return true };

    if ch == 'x' && (is_subpath(&source.norm_path, &target.norm_path) || is_subpath(&target.norm_path, &source.norm_path)) {
        return false;
    }
    if source.is_directory != target.is_directory {
        return false;
    }
    true
}

fn edge_style(ch: char) -> &'static str {
    match ch {
        'x' => "<-->",
        'd' => "-.->|doc|",
        'S' => "==>|semantic|",
        's' => "-.->|semantic|",
        '>' => "-->",
        '<' => "<--",
        _ => "---",
    }
}

fn render_mermaid(map: &GlobalKeyMap, visible_keys: &HashSet<String>, edges: &[&ResolvedEdge]) -> String {
    let path_by_key: HashMap<&str, &str> =
        map.values().map(|info| (info.key_string.as_str(), info.norm_path.as_str())).collect();
    let is_dir_by_key: HashMap<&str, bool> =
        map.values().map(|info| (info.key_string.as_str(), info.is_directory)).collect();

    let mut dirs: HashMap<String, Vec<String>> = HashMap::new();
    let mut all_keys: Vec<&String> = visible_keys.iter().collect();
    all_keys.sort_by_key(|k| path_by_key.get(k.as_str()).copied().unwrap_or_default());

    for key in &all_keys {
        let path = path_by_key.get(key.as_str()).copied().unwrap_or_default();
        let parent = std::path::Path::new(path).parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
        dirs.entry(parent).or_default().push((*key).clone());
    }

    let mut out = String::from("flowchart TB\n");
    let top_level: Vec<String> = dirs.keys().filter(|d| !dirs.keys().any(|other| other != *d && is_subpath(other, d))).cloned().collect();
    let mut rendered_dirs = HashSet::new();
    for dir in top_level {
        render_subgraph(&dir, &dirs, &path_by_key, &is_dir_by_key, &mut out, &mut rendered_dirs, 0);
    }
    for key in &all_keys {
        let dir = std::path::Path::new(path_by_key.get(key.as_str()).copied().unwrap_or_default())
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        if !rendered_dirs.contains(&dir) {
            let label = node_label(key, &path_by_key, &is_dir_by_key);
            out.push_str(&format!("    {label}\n"));
        }
    }

    for edge in edges {
        out.push_str(&format!("    {} {} {}\n", edge.source, edge_style(edge.ch), edge.target));
    }
    out
}

fn node_label(key: &str, path_by_key: &HashMap<&str, &str>, is_dir_by_key: &HashMap<&str, bool>) -> String {
    let path = path_by_key.get(key).copied().unwrap_or_default();
    let name = std::path::Path::new(path).file_name().and_then(|s| s.to_str()).unwrap_or(path);
    if *is_dir_by_key.get(key).unwrap_or(&false) {
        format!("{key}[\"{name}/\"]")
    } else {
        format!("{key}(\"{name}\")")
    }
}

#[allow(clippy::too_many_arguments)]
fn render_subgraph(
    dir_path: &str,
    dirs: &HashMap<String, Vec<String>>,
    path_by_key: &HashMap<&str, &str>,
    is_dir_by_key: &HashMap<&str, bool>,
    out: &mut String,
    rendered_dirs: &mut HashSet<String>,
    depth: usize,
) {
    if !dirs.contains_key(dir_path) || rendered_dirs.contains(dir_path) {
        return;
    }
    rendered_dirs.insert(dir_path.to_string());
    let indent = "    ".repeat(depth + 1);
    let name = std::path::Path::new(dir_path).file_name().and_then(|s| s.to_str()).unwrap_or(dir_path);
    out.push_str(&format!("{indent}subgraph {}[\"{name}\"]\n", sanitize_id(dir_path)));

    for key in dirs.get(dir_path).cloned().unwrap_or_default() {
        let path = path_by_key.get(key.as_str()).copied().unwrap_or_default();
        if dirs.contains_key(path) {
            render_subgraph(path, dirs, path_by_key, is_dir_by_key, out, rendered_dirs, depth + 1);
        } else {
            let label = node_label(&key, path_by_key, is_dir_by_key);
            out.push_str(&format!("{indent}    {label}\n"));
        }
    }
    out.push_str(&format!("{indent}end\n"));
}

fn sanitize_id(path: &str) -> String {
    path.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;

    #[test]
    fn keep_edge_drops_structural_parent_child_x() {
        let mut map = GlobalKeyMap::new();
        map.insert(
            "/repo/src".into(),
            KeyInfo { key_string: "1A".into(), norm_path: "/repo/src".into(), parent_path: None, tier: 1, is_directory: true },
        );
        map.insert(
            "/repo/src/a.py".into(),
            KeyInfo {
                key_string: "1A1".into(),
                norm_path: "/repo/src/a.py".into(),
                parent_path: Some("/repo/src".into()),
                tier: 1,
                is_directory: false,
            },
        );
        assert!(!keep_edge(&map, "1A", "1A1", 'x'));
    }
}
