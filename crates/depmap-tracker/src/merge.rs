use std::collections::HashMap;

use tracing::debug;

use depmap_core::{char_priority, DIAGONAL_CHAR, EMPTY_CHAR, PLACEHOLDER_CHAR};
use depmap_grid::{compress, decompress};
use depmap_keys::sort_key_strings_hierarchically;

use crate::document::TrackerDocument;

/// Merges `secondary` into `primary`: the key set is the union (on conflicting
/// key strings the primary's path definition wins), resampled onto the
/// union's canonical key order. Per cell, the higher-priority character wins;
/// on equal priority, a `<`/`>` pair collapses to `x`, otherwise the primary's
/// value is kept.
pub fn merge_trackers(primary: &TrackerDocument, secondary: &TrackerDocument) -> TrackerDocument {
    let mut key_defs = secondary.key_defs.clone();
    for (key, path) in &primary.key_defs {
        key_defs.insert(key.clone(), path.clone());
    }

    let sorted_keys = sort_key_strings_hierarchically(&key_defs.keys().cloned().collect::<Vec<_>>());
    let idx_of: HashMap<&str, usize> = sorted_keys.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();

    let primary_sorted_keys =
        sort_key_strings_hierarchically(&primary.key_defs.keys().cloned().collect::<Vec<_>>());
    let secondary_sorted_keys =
        sort_key_strings_hierarchically(&secondary.key_defs.keys().cloned().collect::<Vec<_>>());
    let primary_rows = decompress_rows(&primary.grid);
    let secondary_rows = decompress_rows(&secondary.grid);

    let mut merged_rows: HashMap<String, Vec<char>> = HashMap::with_capacity(sorted_keys.len());
    let mut cells_resolved = 0usize;

    for row_key in &sorted_keys {
        let mut row = vec![PLACEHOLDER_CHAR; sorted_keys.len()];
        if let Some(&idx) = idx_of.get(row_key.as_str()) {
            row[idx] = DIAGONAL_CHAR;
        }
        merged_rows.insert(row_key.clone(), row);
    }

    for row_key in &sorted_keys {
        for col_key in &sorted_keys {
            if row_key == col_key {
                continue;
            }
            let col_idx = *idx_of.get(col_key.as_str()).expect("col_key is in sorted_keys");
            let p = cell_value(&primary_rows, &primary_sorted_keys, row_key, col_key);
            let s = cell_value(&secondary_rows, &secondary_sorted_keys, row_key, col_key);

            if let Some(resolved) = resolve_cell(p, s) {
                if let Some(row) = merged_rows.get_mut(row_key) {
                    row[col_idx] = resolved;
                    cells_resolved += 1;
                }
            }
        }
    }

    debug!(
        keys = sorted_keys.len(),
        cells = cells_resolved,
        "merged tracker grids"
    );

    let grid = merged_rows
        .into_iter()
        .map(|(key, row)| (key, compress(&row.into_iter().collect::<String>())))
        .collect();

    TrackerDocument {
        key_defs,
        grid,
        last_key_edit: primary.last_key_edit.clone(),
        last_grid_edit: primary.last_grid_edit.clone(),
        template_prefix: primary.template_prefix.clone().or_else(|| secondary.template_prefix.clone()),
        template_suffix: primary.template_suffix.clone().or_else(|| secondary.template_suffix.clone()),
    }
}

fn decompress_rows(grid: &HashMap<String, String>) -> HashMap<String, Vec<char>> {
    grid.iter()
        .map(|(key, compressed)| (key.clone(), decompress(compressed).chars().collect()))
        .collect()
}

fn cell_value(
    rows: &HashMap<String, Vec<char>>,
    keys: &[String],
    row_key: &str,
    col_key: &str,
) -> Option<char> {
    let row = rows.get(row_key)?;
    let col_idx = keys.iter().position(|k| k == col_key)?;
    let value = *row.get(col_idx)?;
    if matches!(value, PLACEHOLDER_CHAR | DIAGONAL_CHAR | EMPTY_CHAR) {
        None
    } else {
        Some(value)
    }
}

fn resolve_cell(primary: Option<char>, secondary: Option<char>) -> Option<char> {
    match (primary, secondary) {
        (None, None) => None,
        (Some(p), None) => Some(p),
        (None, Some(s)) => Some(s),
        (Some(p), Some(s)) => {
            let p_prio = char_priority(p);
            let s_prio = char_priority(s);
            if p_prio > s_prio {
                Some(p)
            } else if s_prio > p_prio {
                Some(s)
            } else if matches!((p, s), ('<', '>') | ('>', '<')) {
                Some('x')
            } else {
                Some(p)
            }
        }
    }
}
