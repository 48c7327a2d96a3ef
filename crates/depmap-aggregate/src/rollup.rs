use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use depmap_core::path::normalize_path;
use depmap_core::{
    char_priority, GlobalKeyMap, COL_DEPENDS_CHAR, DIAGONAL_CHAR, MUTUAL_CHAR, PLACEHOLDER_CHAR,
    ROW_DEPENDS_CHAR,
};
use depmap_grid::codec::decompress;
use depmap_keys::sort_key_strings_hierarchically;
use depmap_tracker::parse_tracker_file;
use tracing::{debug, info, warn};

use crate::paths::mini_tracker_path;

type PrioEntry = (char, i32);

/// Cross-module edges derived from every module's mini-tracker, then rolled
/// up the directory hierarchy so a descendant's external dependency is
/// visible on its ancestors too. Mirrors `aggregate_dependencies_contextual`.
pub fn aggregate_dependencies(
    filtered_modules: &GlobalKeyMap,
    file_to_module: &HashMap<String, String>,
) -> HashMap<String, Vec<(String, char)>> {
    if file_to_module.is_empty() {
        warn!("file-to-module mapping is empty, cannot perform main tracker aggregation");
        return HashMap::new();
    }
    if filtered_modules.is_empty() {
        warn!("no module paths provided for main tracker aggregation");
        return HashMap::new();
    }

    let mut aggregated: HashMap<String, HashMap<String, PrioEntry>> = HashMap::new();

    gather_direct_foreign_dependencies(filtered_modules, file_to_module, &mut aggregated);

    let module_paths: Vec<String> = {
        let mut v: Vec<String> = filtered_modules.keys().cloned().collect();
        v.sort();
        v
    };
    roll_up_hierarchy(&module_paths, &mut aggregated);

    finalize(filtered_modules, &aggregated)
}

fn gather_direct_foreign_dependencies(
    filtered_modules: &GlobalKeyMap,
    file_to_module: &HashMap<String, String>,
    aggregated: &mut HashMap<String, HashMap<String, PrioEntry>>,
) {
    let mut processed = 0usize;
    for source_module_path in filtered_modules.keys() {
        let tracker_path = mini_tracker_path(source_module_path);
        if !tracker_path.is_file() {
            continue;
        }
        processed += 1;
        let doc = parse_tracker_file(&tracker_path);
        if doc.grid.is_empty() || doc.key_defs.is_empty() {
            debug!(module = source_module_path.as_str(), "mini tracker grid/keys empty");
            continue;
        }

        let mini_keys_defined: HashMap<String, String> =
            doc.key_defs.iter().map(|(k, p)| (k.clone(), normalize_path(p))).collect();
        let key_strings: Vec<String> = mini_keys_defined.keys().cloned().collect();
        let mini_grid_key_strings = sort_key_strings_hierarchically(&key_strings);
        let key_to_idx: HashMap<&str, usize> =
            mini_grid_key_strings.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();

        for (mini_source_key, compressed_row) in &doc.grid {
            if !key_to_idx.contains_key(mini_source_key.as_str()) {
                continue;
            }
            let Some(mini_source_path) = mini_keys_defined.get(mini_source_key) else { continue };
            let Some(actual_source_module) = file_to_module.get(mini_source_path) else { continue };
            if actual_source_module != source_module_path {
                continue;
            }

            let decompressed: Vec<char> = decompress(compressed_row).chars().collect();
            if decompressed.len() != mini_grid_key_strings.len() {
                warn!(
                    module = source_module_path.as_str(),
                    key = mini_source_key.as_str(),
                    "mini tracker row length mismatch"
                );
                continue;
            }
            for (col_idx, &dep_char) in decompressed.iter().enumerate() {
                if dep_char == PLACEHOLDER_CHAR || dep_char == DIAGONAL_CHAR {
                    continue;
                }
                let mini_target_key = &mini_grid_key_strings[col_idx];
                let Some(target_path) = mini_keys_defined.get(mini_target_key) else { continue };
                let Some(target_module) = file_to_module.get(target_path) else { continue };
                if target_module != actual_source_module {
                    upsert(aggregated, actual_source_module, target_module, dep_char);
                }
            }
        }
    }
    info!(processed, "processed mini-trackers for direct cross-module dependencies");
}

fn roll_up_hierarchy(module_paths: &[String], aggregated: &mut HashMap<String, HashMap<String, PrioEntry>>) {
    let hierarchy = build_hierarchy(module_paths);
    let max_passes = module_paths.len().max(1);
    let mut current_pass = 0;
    let mut changed = true;
    while changed && current_pass < max_passes {
        changed = false;
        current_pass += 1;
        for parent_path in module_paths {
            let Some(children) = hierarchy.get(parent_path).cloned() else { continue };
            let descendants = descendants_of(parent_path, &hierarchy);
            for child_path in &children {
                let child_deps: Vec<(String, PrioEntry)> = aggregated
                    .get(child_path)
                    .map(|m| m.iter().map(|(t, v)| (t.clone(), *v)).collect())
                    .unwrap_or_default();
                for (target_path, (dep_char, priority)) in child_deps {
                    if priority > -1 && target_path != *parent_path && !descendants.contains(&target_path) {
                        if upsert_raw(aggregated, parent_path, &target_path, dep_char, priority) {
                            changed = true;
                        }
                    }
                }
            }
        }
    }
    if current_pass == max_passes && changed {
        warn!("hierarchical rollup reached max passes without converging, check for a module dependency cycle");
    }
}

fn finalize(
    filtered_modules: &GlobalKeyMap,
    aggregated: &HashMap<String, HashMap<String, PrioEntry>>,
) -> HashMap<String, Vec<(String, char)>> {
    let mut out = HashMap::new();
    let mut sources: Vec<&String> = aggregated.keys().filter(|k| filtered_modules.contains_key(*k)).collect();
    sources.sort();
    for source in sources {
        let mut targets: Vec<&String> = aggregated[source].keys().collect();
        targets.sort();
        let edges: Vec<(String, char)> = targets
            .into_iter()
            .filter_map(|target| {
                let (dep_char, _) = aggregated[source][target];
                (filtered_modules.contains_key(target) && dep_char != PLACEHOLDER_CHAR)
                    .then(|| (target.clone(), dep_char))
            })
            .collect();
        if !edges.is_empty() {
            out.insert(source.clone(), edges);
        }
    }
    info!("main tracker aggregation finished");
    out
}

fn build_hierarchy(module_paths: &[String]) -> HashMap<String, Vec<String>> {
    let mut hierarchy: HashMap<String, Vec<String>> = HashMap::new();
    for p_path in module_paths {
        for c_path in module_paths {
            if p_path == c_path {
                continue;
            }
            let prefix = format!("{p_path}/");
            if !c_path.starts_with(&prefix) {
                continue;
            }
            let parent_of_c = Path::new(c_path).parent().map(normalize_path).unwrap_or_default();
            if &parent_of_c == p_path {
                hierarchy.entry(p_path.clone()).or_default().push(c_path.clone());
            }
        }
    }
    hierarchy
}

/// All paths reachable from `parent_path` through `hierarchy`, including
/// `parent_path` itself.
fn descendants_of(parent_path: &str, hierarchy: &HashMap<String, Vec<String>>) -> HashSet<String> {
    let mut descendants = HashSet::new();
    descendants.insert(parent_path.to_string());
    let mut queue: VecDeque<String> = hierarchy.get(parent_path).cloned().unwrap_or_default().into();
    while let Some(child) = queue.pop_front() {
        if descendants.insert(child.clone()) {
            if let Some(grandchildren) = hierarchy.get(&child) {
                queue.extend(grandchildren.iter().cloned());
            }
        }
    }
    descendants
}

fn upsert(aggregated: &mut HashMap<String, HashMap<String, PrioEntry>>, source: &str, target: &str, dep_char: char) {
    let priority = char_priority(dep_char);
    upsert_raw(aggregated, source, target, dep_char, priority);
}

/// Stores `dep_char` at `[source][target]` if it outranks what's there, or
/// merges an equal-priority `<`/`>` clash into `x`. Returns whether anything
/// changed.
fn upsert_raw(
    aggregated: &mut HashMap<String, HashMap<String, PrioEntry>>,
    source: &str,
    target: &str,
    dep_char: char,
    priority: i32,
) -> bool {
    let entry = aggregated
        .entry(source.to_string())
        .or_default()
        .entry(target.to_string())
        .or_insert((PLACEHOLDER_CHAR, -1));
    if priority > entry.1 {
        *entry = (dep_char, priority);
        true
    } else if priority == entry.1 && priority > -1 {
        if is_mutual_clash(entry.0, dep_char) && entry.0 != MUTUAL_CHAR {
            *entry = (MUTUAL_CHAR, priority);
            true
        } else {
            false
        }
    } else {
        false
    }
}

fn is_mutual_clash(a: char, b: char) -> bool {
    (a == ROW_DEPENDS_CHAR && b == COL_DEPENDS_CHAR) || (a == COL_DEPENDS_CHAR && b == ROW_DEPENDS_CHAR)
}
