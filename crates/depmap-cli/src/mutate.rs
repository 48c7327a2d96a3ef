use std::path::Path;

use anyhow::{bail, Context, Result};
use depmap_core::{DIAGONAL_CHAR, PLACEHOLDER_CHAR};
use depmap_grid::set_char_at;
use depmap_keys::sort_key_strings_hierarchically;
use depmap_tracker::{export_tracker, merge_trackers, parse_tracker_file, write_tracker_file, ExportFormat};

/// Implements `add-dependency`: sets the cell at (source_key, target_key) to
/// `dep_char` in `tracker_path`'s grid, rejecting the diagonal and unknown
/// keys the way `depmap_grid::set_dependency` would.
pub fn add_dependency(tracker_path: &Path, source_key: &str, target_key: &str, dep_char: char) -> Result<()> {
    if source_key == target_key {
        bail!("cannot set a dependency from a key onto itself");
    }
    let doc = parse_tracker_file(tracker_path);
    if !doc.key_defs.contains_key(source_key) {
        bail!("source key '{source_key}' is not defined in '{}'", tracker_path.display());
    }
    if !doc.key_defs.contains_key(target_key) {
        bail!("target key '{target_key}' is not defined in '{}'", tracker_path.display());
    }

    let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());
    let target_idx = sorted_keys
        .iter()
        .position(|k| k == target_key)
        .context("target key missing from sorted key order")?;

    let mut grid = doc.grid.clone();
    let row = grid.entry(source_key.to_string()).or_insert_with(|| {
        let row_idx = sorted_keys.iter().position(|k| k == source_key).unwrap_or(0);
        let mut chars = vec![PLACEHOLDER_CHAR; sorted_keys.len()];
        chars[row_idx] = DIAGONAL_CHAR;
        depmap_grid::compress(&chars.into_iter().collect::<String>())
    });
    *row = set_char_at(row, target_idx, dep_char).context("failed to set dependency cell")?;

    write_tracker_file(tracker_path, &doc.key_defs, &grid, &doc.last_key_edit, &doc.last_grid_edit)
}

/// Implements `remove-key`: drops `key` from both the key definitions and
/// every row/column of the grid, then rewrites the tracker.
pub fn remove_key(tracker_path: &Path, key: &str) -> Result<()> {
    let mut doc = parse_tracker_file(tracker_path);
    if doc.key_defs.remove(key).is_none() {
        bail!("key '{key}' is not defined in '{}'", tracker_path.display());
    }

    let sorted_keys = sort_key_strings_hierarchically(
        &doc.grid.keys().cloned().collect::<Vec<_>>(),
    );
    let remove_idx = sorted_keys.iter().position(|k| k == key);
    doc.grid.remove(key);

    if let Some(idx) = remove_idx {
        for (_, compressed) in doc.grid.iter_mut() {
            let decompressed = depmap_grid::decompress(compressed);
            let mut chars: Vec<char> = decompressed.chars().collect();
            if idx < chars.len() {
                chars.remove(idx);
                *compressed = depmap_grid::compress(&chars.into_iter().collect::<String>());
            }
        }
    }

    write_tracker_file(tracker_path, &doc.key_defs, &doc.grid, &doc.last_key_edit, &doc.last_grid_edit)
}

/// Implements `merge-trackers`: merges `secondary` into `primary` and writes
/// the result either back over `primary` or to `output`.
pub fn merge_tracker_files(primary_path: &Path, secondary_path: &Path, output_path: Option<&Path>) -> Result<()> {
    let primary = parse_tracker_file(primary_path);
    let secondary = parse_tracker_file(secondary_path);
    if primary.is_empty() {
        bail!("primary tracker '{}' is empty or unreadable", primary_path.display());
    }
    let merged = merge_trackers(&primary, &secondary);
    let target = output_path.unwrap_or(primary_path);
    write_tracker_file(target, &merged.key_defs, &merged.grid, &merged.last_key_edit, &merged.last_grid_edit)
}

/// Implements `export-tracker`.
pub fn export(tracker_path: &Path, output_path: &Path, format: ExportFormat) -> Result<()> {
    let doc = parse_tracker_file(tracker_path);
    export_tracker(&doc, tracker_path, output_path, format)?;
    Ok(())
}

pub fn parse_format(s: &str) -> Result<ExportFormat> {
    match s.to_lowercase().as_str() {
        "md" | "markdown" => Ok(ExportFormat::Markdown),
        "json" => Ok(ExportFormat::Json),
        "csv" => Ok(ExportFormat::Csv),
        "dot" => Ok(ExportFormat::Dot),
        other => bail!("unknown export format '{other}', expected md|json|csv|dot"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn add_dependency_sets_the_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.md");
        let mut key_defs = HashMap::new();
        key_defs.insert("1A".to_string(), "/repo/a".to_string());
        key_defs.insert("1B".to_string(), "/repo/b".to_string());
        write_tracker_file(&path, &key_defs, &HashMap::new(), "init", "init").unwrap();

        add_dependency(&path, "1A", "1B", '>').unwrap();

        let doc = parse_tracker_file(&path);
        let row = depmap_grid::decompress(doc.grid.get("1A").unwrap());
        assert_eq!(row.chars().nth(1), Some('>'));
    }

    #[test]
    fn remove_key_drops_the_row_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.md");
        let mut key_defs = HashMap::new();
        key_defs.insert("1A".to_string(), "/repo/a".to_string());
        key_defs.insert("1B".to_string(), "/repo/b".to_string());
        write_tracker_file(&path, &key_defs, &HashMap::new(), "init", "init").unwrap();
        add_dependency(&path, "1A", "1B", '>').unwrap();

        remove_key(&path, "1B").unwrap();

        let doc = parse_tracker_file(&path);
        assert_eq!(doc.key_defs.len(), 1);
        assert!(!doc.key_defs.contains_key("1B"));
        let row = depmap_grid::decompress(doc.grid.get("1A").unwrap());
        assert_eq!(row.chars().count(), 1);
    }
}
