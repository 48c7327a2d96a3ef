use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use depmap_aggregate::{filter_main_tracker_modules, mini_tracker_path};
use depmap_core::{char_priority, is_suggestion_proof, GlobalKeyMap, PLACEHOLDER_CHAR};
use depmap_grid::{decompress, dependencies_from_grid, Grid};
use depmap_keys::sort_key_strings_hierarchically;
use depmap_tracker::{parse_tracker_file, TrackerDocument};
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct KeyRow {
    pub key: String,
    pub path: String,
    pub needs_check: bool,
    pub note: Option<String>,
}

/// Implements `show-keys`: lists every key defined on `tracker`, flagging
/// rows that still carry a placeholder or unresolved semantic suggestion
/// (`p`/`s`/`S`) as needing a human look, and rows with no grid data at all.
pub fn show_keys(tracker_path: &std::path::Path) -> Result<Vec<KeyRow>> {
    let doc = parse_tracker_file(tracker_path);
    let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());

    let mut rows = Vec::with_capacity(sorted_keys.len());
    for key in &sorted_keys {
        let path = doc.key_defs.get(key).cloned().unwrap_or_default();
        let Some(compressed) = doc.grid.get(key) else {
            rows.push(KeyRow { key: key.clone(), path, needs_check: true, note: Some("(grid row missing)".to_string()) });
            continue;
        };
        let decompressed = decompress(compressed);
        let needs_check = decompressed.chars().any(|c| matches!(c, 'p' | 's' | 'S'));
        rows.push(KeyRow { key: key.clone(), path, needs_check, note: None });
    }
    Ok(rows)
}

#[derive(Debug, Serialize, Default)]
pub struct DependencySections {
    pub mutual: Vec<TrackerEdge>,
    pub documentation: Vec<TrackerEdge>,
    pub strong_semantic: Vec<TrackerEdge>,
    pub weak_semantic: Vec<TrackerEdge>,
    pub depends_on: Vec<TrackerEdge>,
    pub depended_on_by: Vec<TrackerEdge>,
    pub placeholders: Vec<TrackerEdge>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TrackerEdge {
    pub target_key: String,
    pub origin_tracker: String,
}

/// Implements `show-dependencies`: aggregates every tracker file's row for
/// `key` (main, doc, and every mini-tracker), resolving conflicting
/// characters for the same target by priority, and splits the result into
/// the seven sections from the spec's query surface. `p`/`s`/`S` rows
/// record which tracker file they came from, since those need a human to
/// resolve them.
pub fn show_dependencies(ctx: &AppContext, key: &str) -> Result<DependencySections> {
    let map = depmap_keys::load_global_key_map(&ctx.memory_dir)
        .context("failed to read global key map")?
        .context("no global key map found; run analyze-project first")?;

    let tracker_paths = all_tracker_paths(ctx, &map);

    let mut best: HashMap<String, (char, i32, String)> = HashMap::new();
    for path in &tracker_paths {
        let doc = parse_tracker_file(path);
        if !doc.key_defs.contains_key(key) {
            continue;
        }
        let origin = path.file_name().and_then(|n| n.to_str()).unwrap_or("tracker").to_string();
        let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());
        let grid = Grid::from_rows(doc.grid.clone());
        let Ok(buckets) = dependencies_from_grid(&grid, key, &sorted_keys) else { continue };
        for (ch, targets) in buckets {
            let priority = char_priority(ch);
            for target in targets {
                let entry = best.entry(target.clone()).or_insert((ch, priority, origin.clone()));
                if priority > entry.1 {
                    *entry = (ch, priority, origin.clone());
                }
            }
        }
    }

    let mut sections = DependencySections::default();
    for (target_key, (ch, _, origin)) in best {
        let edge = TrackerEdge { target_key, origin_tracker: origin };
        match ch {
            'x' => sections.mutual.push(edge),
            'd' => sections.documentation.push(edge),
            'S' => sections.strong_semantic.push(edge),
            's' => sections.weak_semantic.push(edge),
            '>' => sections.depends_on.push(edge),
            '<' => sections.depended_on_by.push(edge),
            c if c == PLACEHOLDER_CHAR => sections.placeholders.push(edge),
            _ => {}
        }
    }
    for bucket in [
        &mut sections.mutual,
        &mut sections.documentation,
        &mut sections.strong_semantic,
        &mut sections.weak_semantic,
        &mut sections.depends_on,
        &mut sections.depended_on_by,
        &mut sections.placeholders,
    ] {
        bucket.sort_by(|a, b| a.target_key.cmp(&b.target_key));
    }
    Ok(sections)
}

/// Every tracker file worth aggregating over: main, doc, and a mini-tracker
/// per main-tracker module directory (existing or not — `parse_tracker_file`
/// returns an empty document for a missing path, which `show_dependencies`
/// simply skips).
pub fn all_tracker_paths(ctx: &AppContext, map: &GlobalKeyMap) -> Vec<PathBuf> {
    let mut paths = vec![ctx.main_tracker_path(), ctx.doc_tracker_path()];
    let main_modules = filter_main_tracker_modules(
        &ctx.project_root.to_string_lossy(),
        map,
        &ctx.settings.code_root_directories,
    );
    for module_path in main_modules.keys() {
        paths.push(mini_tracker_path(module_path));
    }
    paths
}

/// True if a decoded tracker's row for `path` (by resolved key) exists and
/// resolves cleanly — used by `remove-key` to decide whether a key is still
/// referenced anywhere before deleting it outright.
pub fn key_is_referenced(doc: &TrackerDocument, key: &str) -> bool {
    let Some(compressed) = doc.grid.get(key) else { return false };
    let decompressed = decompress(compressed);
    decompressed.chars().any(|c| is_suggestion_proof(c) || matches!(c, '<' | '>' | 'x' | 'd' | 's' | 'S'))
}
