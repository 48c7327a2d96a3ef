use std::collections::{HashMap, HashSet};

use tracing::error;

use depmap_core::{DepMapError, Result, DIAGONAL_CHAR, EMPTY_CHAR, PLACEHOLDER_CHAR};
use depmap_keys::{sort_key_strings_hierarchically, validate_key};

use crate::codec::{compress, decompress, get_char_at, set_char_at};

/// A square dependency grid: one compressed row per key, in canonical
/// (hierarchical) key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: HashMap<String, String>,
}

impl Grid {
    pub fn from_rows(rows: HashMap<String, String>) -> Self {
        Self { rows }
    }

    pub fn row(&self, key: &str) -> Option<&str> {
        self.rows.get(key).map(|s| s.as_str())
    }

    pub fn set_row(&mut self, key: &str, compressed_row: String) {
        self.rows.insert(key.to_string(), compressed_row);
    }

    pub fn rows(&self) -> &HashMap<String, String> {
        &self.rows
    }

    pub fn into_rows(self) -> HashMap<String, String> {
        self.rows
    }
}

/// Builds a grid with every cell a placeholder except the diagonal, which is
/// always the self-relationship marker.
pub fn create_initial_grid(keys: &[String]) -> Result<Grid> {
    if keys.is_empty() || !keys.iter().all(|k| validate_key(k)) {
        return Err(DepMapError::GridInvariantViolation(
            "all keys must be valid, non-empty key strings".to_string(),
        ));
    }
    let num_keys = keys.len();
    let mut rows = HashMap::with_capacity(num_keys);
    for (i, row_key) in keys.iter().enumerate() {
        let mut row_chars = vec![PLACEHOLDER_CHAR; num_keys];
        row_chars[i] = DIAGONAL_CHAR;
        rows.insert(row_key.clone(), compress(&row_chars.into_iter().collect::<String>()));
    }
    Ok(Grid { rows })
}

/// Verifies the grid's row set matches `sorted_keys`, every row decompresses
/// to the expected width, and every row's diagonal cell is correct (I1-I3 in
/// spec terms).
pub fn validate_grid(grid: &Grid, sorted_keys: &[String]) -> bool {
    let num_keys = sorted_keys.len();
    if num_keys == 0 {
        return grid.rows.is_empty();
    }

    let expected: HashSet<&String> = sorted_keys.iter().collect();
    let actual: HashSet<&String> = grid.rows.keys().collect();

    if expected != actual {
        let missing: Vec<_> = expected.difference(&actual).collect();
        let extra: Vec<_> = actual.difference(&expected).collect();
        if !missing.is_empty() {
            error!(?missing, "grid validation failed: missing rows");
        }
        if !extra.is_empty() {
            error!(?extra, "grid validation failed: extra rows");
        }
        return false;
    }

    for (idx, key) in sorted_keys.iter().enumerate() {
        let compressed_row = match grid.rows.get(key) {
            Some(row) => row,
            None => return false,
        };
        let decompressed = decompress(compressed_row);
        if decompressed.chars().count() != num_keys {
            error!(key, expected = num_keys, got = decompressed.chars().count(), "grid validation failed: row length mismatch");
            return false;
        }
        if decompressed.chars().nth(idx) != Some(DIAGONAL_CHAR) {
            error!(key, idx, "grid validation failed: wrong diagonal character");
            return false;
        }
    }
    true
}

/// Writes `dep_char` into `grid[source_key][target_key]`. The diagonal can
/// never be modified this way (I1).
pub fn set_dependency(
    grid: &mut Grid,
    source_key: &str,
    target_key: &str,
    keys: &[String],
    dep_char: char,
) -> Result<()> {
    let source_idx = keys.iter().position(|k| k == source_key).ok_or_else(|| {
        DepMapError::GridInvariantViolation(format!("key '{source_key}' not in keys list"))
    })?;
    let target_idx = keys.iter().position(|k| k == target_key).ok_or_else(|| {
        DepMapError::GridInvariantViolation(format!("key '{target_key}' not in keys list"))
    })?;
    if source_idx == target_idx {
        return Err(DepMapError::GridInvariantViolation(format!(
            "cannot directly modify diagonal element for key '{source_key}'"
        )));
    }

    let placeholder_row: String = compress(&PLACEHOLDER_CHAR.to_string().repeat(keys.len()));
    let current = grid.rows.get(source_key).cloned().unwrap_or(placeholder_row);
    let updated = set_char_at(&current, target_idx, dep_char).ok_or_else(|| {
        DepMapError::GridInvariantViolation(format!("target index {target_idx} out of range"))
    })?;
    grid.rows.insert(source_key.to_string(), updated);
    Ok(())
}

pub fn remove_dependency(grid: &mut Grid, source_key: &str, target_key: &str, keys: &[String]) -> Result<()> {
    let source_idx = keys.iter().position(|k| k == source_key).ok_or_else(|| {
        DepMapError::GridInvariantViolation(format!("key '{source_key}' not in keys list"))
    })?;
    let target_idx = keys.iter().position(|k| k == target_key).ok_or_else(|| {
        DepMapError::GridInvariantViolation(format!("key '{target_key}' not in keys list"))
    })?;
    if source_idx == target_idx {
        return Ok(());
    }
    set_dependency(grid, source_key, target_key, keys, EMPTY_CHAR)
}

/// Categorizes every other key's relationship to `key`, using the same
/// priority ordering as `depmap_core::model::char_priority`: mutual/doc/
/// semantic/directional relationships are reported before bare placeholders.
pub fn dependencies_from_grid(grid: &Grid, key: &str, keys: &[String]) -> Result<HashMap<char, Vec<String>>> {
    if !keys.iter().any(|k| k == key) {
        return Err(DepMapError::GridInvariantViolation(format!(
            "key '{key}' not in keys list"
        )));
    }
    let mut results: HashMap<char, Vec<String>> = HashMap::new();
    const DEFINED: [char; 6] = ['<', '>', 'x', 'd', 's', 'S'];

    for other_key in keys {
        if other_key == key {
            continue;
        }
        let other_idx = keys.iter().position(|k| k == other_key).unwrap();
        let char_outgoing = grid
            .rows
            .get(key)
            .and_then(|row| get_char_at(row, other_idx))
            .unwrap_or(EMPTY_CHAR);

        let bucket = match char_outgoing {
            'x' => Some('x'),
            'd' => Some('d'),
            'S' => Some('S'),
            's' => Some('s'),
            '>' => Some('>'),
            '<' => Some('<'),
            c if !DEFINED.contains(&c) && c == PLACEHOLDER_CHAR => Some('p'),
            _ => None,
        };
        if let Some(bucket) = bucket {
            results.entry(bucket).or_default().push(other_key.clone());
        }
    }
    Ok(results)
}

pub fn format_grid_for_display(grid: &Grid, keys: &[String]) -> String {
    let mut lines = vec![format!("X {}", keys.join(" "))];
    let placeholder_row = compress(&PLACEHOLDER_CHAR.to_string().repeat(keys.len()));
    for key in keys {
        let row = grid.rows.get(key).cloned().unwrap_or_else(|| placeholder_row.clone());
        lines.push(format!("{key} = {row}"));
    }
    lines.join("\n")
}

/// Canonical key ordering used everywhere a grid's column/row order matters.
pub fn canonical_key_order(keys: &[String]) -> Vec<String> {
    sort_key_strings_hierarchically(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<String> {
        vec!["1A".into(), "1A1".into(), "1B".into()]
    }

    #[test]
    fn initial_grid_has_diagonal_and_placeholders() {
        let ks = keys();
        let grid = create_initial_grid(&ks).unwrap();
        assert!(validate_grid(&grid, &ks));
        let row = decompress(grid.row("1A").unwrap());
        assert_eq!(row.chars().next(), Some(DIAGONAL_CHAR));
        assert_eq!(row.chars().nth(1), Some(PLACEHOLDER_CHAR));
    }

    #[test]
    fn set_dependency_rejects_diagonal() {
        let ks = keys();
        let mut grid = create_initial_grid(&ks).unwrap();
        let result = set_dependency(&mut grid, "1A", "1A", &ks, '>');
        assert!(result.is_err());
    }

    #[test]
    fn set_then_read_dependency() {
        let ks = keys();
        let mut grid = create_initial_grid(&ks).unwrap();
        set_dependency(&mut grid, "1A", "1A1", &ks, '>').unwrap();
        let deps = dependencies_from_grid(&grid, "1A", &ks).unwrap();
        assert_eq!(deps.get(&'>').cloned().unwrap_or_default(), vec!["1A1".to_string()]);
    }

    #[test]
    fn remove_dependency_restores_empty() {
        let ks = keys();
        let mut grid = create_initial_grid(&ks).unwrap();
        set_dependency(&mut grid, "1A", "1A1", &ks, '>').unwrap();
        remove_dependency(&mut grid, "1A", "1A1", &ks).unwrap();
        let row = decompress(grid.row("1A").unwrap());
        assert_eq!(row.chars().nth(1), Some(EMPTY_CHAR));
    }

    #[test]
    fn validate_rejects_missing_row() {
        let ks = keys();
        let mut grid = create_initial_grid(&ks).unwrap();
        let rows = grid.rows().clone();
        let mut trimmed = rows;
        trimmed.remove("1B");
        let grid = Grid::from_rows(trimmed);
        assert!(!validate_grid(&grid, &ks));
    }
}
