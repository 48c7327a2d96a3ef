use std::collections::HashMap;

use chrono::Local;
use tracing::{debug, info, warn};

use depmap_core::path::is_subpath;
use depmap_core::{
    char_priority, GlobalKeyMap, TrackerKind, DIAGONAL_CHAR, EMPTY_CHAR, NO_DEPENDENCY_CHAR,
    PLACEHOLDER_CHAR,
};
use depmap_grid::{compress, decompress};
use depmap_keys::sort_key_strings_hierarchically;

/// A single proposed edge from a suggestion pass: `source -> target` with the
/// proposed cell character.
#[derive(Debug, Clone)]
pub struct SuggestedEdge {
    pub target_key: String,
    pub dep_char: char,
}

/// Inputs to a structural update of one tracker file.
pub struct TrackerUpdateInput<'a> {
    pub tracker_kind: TrackerKind,
    /// Key -> normalized path, as currently recorded on disk for this tracker.
    pub existing_key_defs: &'a HashMap<String, String>,
    /// Key -> compressed row, as currently recorded on disk for this tracker.
    pub existing_grid: &'a HashMap<String, String>,
    pub current_last_key_edit: &'a str,
    pub current_last_grid_edit: &'a str,
    /// Key -> normalized path, the key set this write should produce (already resolved
    /// by the caller per main/doc/mini inclusion rules).
    pub final_key_defs: HashMap<String, String>,
    /// Global path -> KeyInfo map, used to resolve directory/parent relationships
    /// for structural rule application.
    pub path_to_key_info: &'a GlobalKeyMap,
    /// Key -> path map used to migrate old cell values into the new grid. `None`
    /// disables migration (nothing to draw from).
    pub old_key_to_path: Option<HashMap<String, String>>,
    /// source key -> proposed edges, pre-filtered to keys relevant to this tracker.
    pub suggestions: HashMap<String, Vec<SuggestedEdge>>,
    pub force_apply_suggestions: bool,
}

pub struct TrackerUpdateResult {
    pub key_defs: HashMap<String, String>,
    pub grid: HashMap<String, String>,
    pub last_key_edit: String,
    pub last_grid_edit: String,
}

/// Runs the full structural-update algorithm for one tracker file: builds the
/// new grid keyed on `final_key_defs`, applies I7 structural rules for
/// doc/mini trackers, migrates old cell values, applies suggestions under the
/// priority/mutuality rules, and computes the two metadata lines.
pub fn compute_structural_update(input: TrackerUpdateInput) -> TrackerUpdateResult {
    let TrackerUpdateInput {
        tracker_kind,
        existing_key_defs,
        existing_grid,
        current_last_key_edit,
        current_last_grid_edit,
        final_key_defs,
        path_to_key_info,
        old_key_to_path,
        suggestions,
        force_apply_suggestions,
    } = input;

    let final_sorted_keys: Vec<String> =
        sort_key_strings_hierarchically(&final_key_defs.keys().cloned().collect::<Vec<_>>());
    let final_key_to_idx: HashMap<&str, usize> = final_sorted_keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();

    let existing_keys_set: std::collections::HashSet<&String> = existing_key_defs.keys().collect();
    let final_keys_set: std::collections::HashSet<&String> = final_key_defs.keys().collect();
    let added_keys: Vec<&String> = final_keys_set.difference(&existing_keys_set).copied().collect();
    let removed_keys: Vec<&String> = existing_keys_set.difference(&final_keys_set).copied().collect();

    let final_last_key_edit = if !added_keys.is_empty() || !removed_keys.is_empty() {
        let mut parts = Vec::new();
        if !added_keys.is_empty() {
            parts.push(format!("Added {} keys", added_keys.len()));
        }
        if !removed_keys.is_empty() {
            parts.push(format!("Removed {} keys", removed_keys.len()));
        }
        format!("Keys updated: {}", parts.join("; "))
    } else {
        current_last_key_edit.to_string()
    };

    let grid_structure_changed = !added_keys.is_empty() || !removed_keys.is_empty();

    // Step 2: initialize with placeholders + diagonal.
    let mut temp_grid: HashMap<String, Vec<char>> = final_sorted_keys
        .iter()
        .map(|row_key| {
            let mut row = vec![PLACEHOLDER_CHAR; final_sorted_keys.len()];
            if let Some(&idx) = final_key_to_idx.get(row_key.as_str()) {
                row[idx] = DIAGONAL_CHAR;
            }
            (row_key.clone(), row)
        })
        .collect();

    // Step 3: I7 structural rules for doc/mini trackers.
    if matches!(tracker_kind, TrackerKind::Doc | TrackerKind::Mini) {
        apply_structural_rules(
            tracker_kind,
            &final_sorted_keys,
            &final_key_defs,
            path_to_key_info,
            &final_key_to_idx,
            &mut temp_grid,
        );
    }

    // Step 4: migrate old cell values, only into cells still holding a placeholder.
    if let Some(old_key_to_path) = old_key_to_path {
        migrate_old_values(
            existing_grid,
            existing_key_defs,
            &old_key_to_path,
            &final_key_defs,
            &final_key_to_idx,
            &final_sorted_keys,
            &mut temp_grid,
        );
    } else {
        warn!("no old key-to-path mapping available, skipping grid value migration");
    }

    // Step 5: apply suggestions.
    let suggestion_applied = apply_suggestions(
        &suggestions,
        &final_key_to_idx,
        force_apply_suggestions,
        &mut temp_grid,
    );

    // Step 6: compute last_GRID_edit.
    let now = Local::now().to_rfc3339();
    let final_last_grid_edit = if suggestion_applied {
        format!("Applied suggestions ({now})")
    } else if grid_structure_changed {
        format!("Grid structure updated ({now})")
    } else {
        current_last_grid_edit.to_string()
    };

    let final_grid: HashMap<String, String> = temp_grid
        .into_iter()
        .map(|(key, row)| (key, compress(&row.into_iter().collect::<String>())))
        .collect();

    info!(
        tracker_kind = tracker_kind.as_str(),
        keys = final_sorted_keys.len(),
        added = added_keys.len(),
        removed = removed_keys.len(),
        "computed structural update"
    );

    TrackerUpdateResult {
        key_defs: final_key_defs,
        grid: final_grid,
        last_key_edit: final_last_key_edit,
        last_grid_edit: final_last_grid_edit,
    }
}

fn apply_structural_rules(
    tracker_kind: TrackerKind,
    final_sorted_keys: &[String],
    final_key_defs: &HashMap<String, String>,
    path_to_key_info: &GlobalKeyMap,
    final_key_to_idx: &HashMap<&str, usize>,
    temp_grid: &mut HashMap<String, Vec<char>>,
) {
    let mut applied = 0usize;
    for row_key in final_sorted_keys {
        let Some(row_path) = final_key_defs.get(row_key) else { continue };
        let Some(row_info) = path_to_key_info.get(row_path) else { continue };
        if !row_info.is_directory {
            continue;
        }
        for col_key in final_sorted_keys {
            if row_key == col_key {
                continue;
            }
            let Some(col_path) = final_key_defs.get(col_key) else { continue };
            if path_to_key_info.get(col_path).is_none() {
                continue;
            }

            let dep_char = if is_subpath(col_path, row_path) || is_subpath(row_path, col_path) {
                Some('x')
            } else if tracker_kind == TrackerKind::Doc {
                Some(NO_DEPENDENCY_CHAR)
            } else {
                None
            };

            if let Some(dep_char) = dep_char {
                let (Some(&row_idx), Some(&col_idx)) =
                    (final_key_to_idx.get(row_key.as_str()), final_key_to_idx.get(col_key.as_str()))
                else {
                    continue;
                };
                if row_idx == col_idx {
                    continue;
                }
                if let Some(row) = temp_grid.get_mut(row_key) {
                    row[col_idx] = dep_char;
                    applied += 1;
                }
            }
        }
    }
    debug!(applied, "applied structural dependency rules");
}

#[allow(clippy::too_many_arguments)]
fn migrate_old_values(
    existing_grid: &HashMap<String, String>,
    existing_key_defs: &HashMap<String, String>,
    old_key_to_path: &HashMap<String, String>,
    final_key_defs: &HashMap<String, String>,
    final_key_to_idx: &HashMap<&str, usize>,
    final_sorted_keys: &[String],
    temp_grid: &mut HashMap<String, Vec<char>>,
) {
    let old_keys_list = sort_key_strings_hierarchically(&existing_key_defs.keys().cloned().collect::<Vec<_>>());
    let path_to_final_idx: HashMap<&str, usize> = final_key_defs
        .iter()
        .filter_map(|(key, path)| final_key_to_idx.get(key.as_str()).map(|&idx| (path.as_str(), idx)))
        .collect();

    let mut copied = 0usize;
    for (old_row_key, compressed_row) in existing_grid {
        let Some(old_row_path) = old_key_to_path.get(old_row_key) else { continue };
        let Some(&new_row_idx) = path_to_final_idx.get(old_row_path.as_str()) else { continue };
        let new_row_key = &final_sorted_keys[new_row_idx];

        let decomp_row: Vec<char> = decompress(compressed_row).chars().collect();
        if decomp_row.len() != old_keys_list.len() {
            warn!(
                old_row_key,
                expected = old_keys_list.len(),
                got = decomp_row.len(),
                "grid row length mismatch during migration, skipping row"
            );
            continue;
        }

        for (old_col_idx, &value) in decomp_row.iter().enumerate() {
            if matches!(value, DIAGONAL_CHAR | PLACEHOLDER_CHAR | EMPTY_CHAR) {
                continue;
            }
            let Some(old_col_key) = old_keys_list.get(old_col_idx) else { continue };
            let Some(old_col_path) = old_key_to_path.get(old_col_key) else { continue };
            let Some(&new_col_idx) = path_to_final_idx.get(old_col_path.as_str()) else { continue };
            if new_row_idx == new_col_idx {
                continue;
            }

            if let Some(row) = temp_grid.get_mut(new_row_key) {
                if row[new_col_idx] == PLACEHOLDER_CHAR {
                    row[new_col_idx] = value;
                    copied += 1;
                }
            }
        }
    }
    debug!(copied, "migrated old grid values");
}

fn apply_suggestions(
    suggestions: &HashMap<String, Vec<SuggestedEdge>>,
    final_key_to_idx: &HashMap<&str, usize>,
    force_apply_suggestions: bool,
    temp_grid: &mut HashMap<String, Vec<char>>,
) -> bool {
    let mut applied_any = false;

    for (source_key, deps) in suggestions {
        let Some(&row_idx) = final_key_to_idx.get(source_key.as_str()) else { continue };

        for edge in deps {
            let target_key = &edge.target_key;
            if source_key == target_key {
                continue;
            }
            let Some(&col_idx) = final_key_to_idx.get(target_key.as_str()) else { continue };

            let existing = temp_grid
                .get(source_key)
                .map(|row| row[col_idx])
                .unwrap_or(PLACEHOLDER_CHAR);

            let should_apply = if force_apply_suggestions {
                edge.dep_char != PLACEHOLDER_CHAR && existing != edge.dep_char && existing != NO_DEPENDENCY_CHAR
            } else if existing == PLACEHOLDER_CHAR && edge.dep_char != PLACEHOLDER_CHAR {
                true
            } else if existing != PLACEHOLDER_CHAR && existing != DIAGONAL_CHAR && existing != edge.dep_char {
                existing != NO_DEPENDENCY_CHAR && char_priority(edge.dep_char) > char_priority(existing)
            } else {
                false
            };

            if !should_apply {
                continue;
            }

            let mut final_char = edge.dep_char;

            if matches!(edge.dep_char, '<' | '>') {
                if let Some(reverse_row) = temp_grid.get(target_key) {
                    if reverse_row.get(row_idx).copied() == Some(edge.dep_char) {
                        final_char = 'x';
                        if let Some(reverse_row) = temp_grid.get_mut(target_key) {
                            reverse_row[row_idx] = 'x';
                        }
                        applied_any = true;
                    }
                }
            }

            if let Some(row) = temp_grid.get_mut(source_key) {
                if row[col_idx] != final_char {
                    row[col_idx] = final_char;
                    applied_any = true;
                }
            }

            if final_char != 'x' {
                let reciprocal = match edge.dep_char {
                    '>' => Some('<'),
                    '<' => Some('>'),
                    _ => None,
                };
                if let Some(reciprocal) = reciprocal {
                    let reverse_existing = temp_grid.get(target_key).and_then(|r| r.get(row_idx)).copied();
                    let should_apply_reciprocal = match reverse_existing {
                        Some(c) if force_apply_suggestions => c != 'x' && c != reciprocal && c != NO_DEPENDENCY_CHAR,
                        Some(c) => c == PLACEHOLDER_CHAR || char_priority(reciprocal) > char_priority(c),
                        None => false,
                    };
                    if should_apply_reciprocal {
                        if let Some(reverse_row) = temp_grid.get_mut(target_key) {
                            reverse_row[row_idx] = reciprocal;
                            applied_any = true;
                        }
                    }
                }
            }
        }
    }

    applied_any
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;

    fn key_info(key: &str, path: &str, is_dir: bool, parent: Option<&str>) -> KeyInfo {
        KeyInfo {
            key_string: key.to_string(),
            norm_path: path.to_string(),
            parent_path: parent.map(|p| p.to_string()),
            tier: 1,
            is_directory: is_dir,
        }
    }

    #[test]
    fn new_tracker_gets_diagonal_and_placeholders() {
        let mut final_key_defs = HashMap::new();
        final_key_defs.insert("1A".to_string(), "/repo/a".to_string());
        final_key_defs.insert("1B".to_string(), "/repo/b".to_string());
        let map = GlobalKeyMap::new();

        let result = compute_structural_update(TrackerUpdateInput {
            tracker_kind: TrackerKind::Main,
            existing_key_defs: &HashMap::new(),
            existing_grid: &HashMap::new(),
            current_last_key_edit: "Initial creation",
            current_last_grid_edit: "Initial creation",
            final_key_defs,
            path_to_key_info: &map,
            old_key_to_path: None,
            suggestions: HashMap::new(),
            force_apply_suggestions: false,
        });

        assert_eq!(decompress(result.grid.get("1A").unwrap()), "op");
        assert_eq!(decompress(result.grid.get("1B").unwrap()), "po");
        assert!(result.last_key_edit.starts_with("Keys updated"));
    }

    #[test]
    fn doc_tracker_applies_n_between_unrelated_dirs() {
        let mut final_key_defs = HashMap::new();
        final_key_defs.insert("1A".to_string(), "/repo/docs".to_string());
        final_key_defs.insert("1B".to_string(), "/repo/notes".to_string());

        let mut map = GlobalKeyMap::new();
        map.insert("/repo/docs".to_string(), key_info("1A", "/repo/docs", true, None));
        map.insert("/repo/notes".to_string(), key_info("1B", "/repo/notes", true, None));

        let result = compute_structural_update(TrackerUpdateInput {
            tracker_kind: TrackerKind::Doc,
            existing_key_defs: &HashMap::new(),
            existing_grid: &HashMap::new(),
            current_last_key_edit: "Initial creation",
            current_last_grid_edit: "Initial creation",
            final_key_defs,
            path_to_key_info: &map,
            old_key_to_path: None,
            suggestions: HashMap::new(),
            force_apply_suggestions: false,
        });

        let row_a = decompress(result.grid.get("1A").unwrap());
        assert_eq!(row_a.chars().nth(1).unwrap(), NO_DEPENDENCY_CHAR);
    }

    #[test]
    fn migrates_old_value_into_placeholder_cell_only() {
        let mut existing_key_defs = HashMap::new();
        existing_key_defs.insert("1A".to_string(), "/repo/a".to_string());
        existing_key_defs.insert("1B".to_string(), "/repo/b".to_string());
        let mut existing_grid = HashMap::new();
        existing_grid.insert("1A".to_string(), compress("o>"));
        existing_grid.insert("1B".to_string(), compress("po"));

        let mut final_key_defs = HashMap::new();
        final_key_defs.insert("1A".to_string(), "/repo/a".to_string());
        final_key_defs.insert("1B".to_string(), "/repo/b".to_string());

        let mut old_key_to_path = HashMap::new();
        old_key_to_path.insert("1A".to_string(), "/repo/a".to_string());
        old_key_to_path.insert("1B".to_string(), "/repo/b".to_string());

        let result = compute_structural_update(TrackerUpdateInput {
            tracker_kind: TrackerKind::Main,
            existing_key_defs: &existing_key_defs,
            existing_grid: &existing_grid,
            current_last_key_edit: "Initial creation",
            current_last_grid_edit: "Initial creation",
            final_key_defs,
            path_to_key_info: &GlobalKeyMap::new(),
            old_key_to_path: Some(old_key_to_path),
            suggestions: HashMap::new(),
            force_apply_suggestions: false,
        });

        assert_eq!(decompress(result.grid.get("1A").unwrap()), "o>");
    }

    #[test]
    fn matching_directional_suggestion_collapses_to_mutual() {
        // Seed 1A -> 1B as already '>' (via migration), then suggest 1B -> 1A
        // as '>' too: the reverse cell already carries the same directional
        // char, so both directions should collapse to 'x'.
        let mut existing_key_defs = HashMap::new();
        existing_key_defs.insert("1A".to_string(), "/repo/a".to_string());
        existing_key_defs.insert("1B".to_string(), "/repo/b".to_string());
        let mut existing_grid = HashMap::new();
        existing_grid.insert("1A".to_string(), compress("o>"));
        existing_grid.insert("1B".to_string(), compress("po"));

        let final_key_defs = existing_key_defs.clone();
        let old_key_to_path = existing_key_defs.clone();

        let mut suggestions = HashMap::new();
        suggestions.insert(
            "1B".to_string(),
            vec![SuggestedEdge { target_key: "1A".to_string(), dep_char: '>' }],
        );

        let result = compute_structural_update(TrackerUpdateInput {
            tracker_kind: TrackerKind::Main,
            existing_key_defs: &existing_key_defs,
            existing_grid: &existing_grid,
            current_last_key_edit: "Initial creation",
            current_last_grid_edit: "Initial creation",
            final_key_defs,
            path_to_key_info: &GlobalKeyMap::new(),
            old_key_to_path: Some(old_key_to_path),
            suggestions,
            force_apply_suggestions: false,
        });

        assert_eq!(decompress(result.grid.get("1A").unwrap()), "ox");
        assert_eq!(decompress(result.grid.get("1B").unwrap()), "xo");
    }

    #[test]
    fn force_apply_never_overwrites_no_dependency() {
        let mut existing_key_defs = HashMap::new();
        existing_key_defs.insert("1A".to_string(), "/repo/a".to_string());
        existing_key_defs.insert("1B".to_string(), "/repo/b".to_string());
        let mut existing_grid = HashMap::new();
        existing_grid.insert("1A".to_string(), compress("on"));
        existing_grid.insert("1B".to_string(), compress("no"));

        let final_key_defs = existing_key_defs.clone();
        let old_key_to_path = existing_key_defs.clone();

        let mut suggestions = HashMap::new();
        suggestions.insert(
            "1A".to_string(),
            vec![SuggestedEdge { target_key: "1B".to_string(), dep_char: 'S' }],
        );

        let result = compute_structural_update(TrackerUpdateInput {
            tracker_kind: TrackerKind::Main,
            existing_key_defs: &existing_key_defs,
            existing_grid: &existing_grid,
            current_last_key_edit: "Initial creation",
            current_last_grid_edit: "Initial creation",
            final_key_defs,
            path_to_key_info: &GlobalKeyMap::new(),
            old_key_to_path: Some(old_key_to_path),
            suggestions,
            force_apply_suggestions: true,
        });

        assert_eq!(decompress(result.grid.get("1A").unwrap()), "on");
        assert_eq!(decompress(result.grid.get("1B").unwrap()), "no");
    }
}
