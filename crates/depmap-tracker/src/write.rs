use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use depmap_core::path::normalize_path;
use depmap_core::{DepMapError, Result, DIAGONAL_CHAR, PLACEHOLDER_CHAR};
use depmap_grid::{compress, decompress, validate_grid, Grid};
use depmap_keys::sort_key_strings_hierarchically;

fn io_err(path: &Path, source: std::io::Error) -> DepMapError {
    DepMapError::IoAt {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// Rebuilds any row that is missing or whose decompressed width doesn't
/// match the current key count: replaced with an all-placeholder row with
/// the diagonal marker at the right index. Rows that are already correct
/// pass through untouched.
fn rebuild_grid(grid_to_write: &HashMap<String, String>, sorted_keys: &[String]) -> HashMap<String, String> {
    let expected_len = sorted_keys.len();
    let index_of: HashMap<&str, usize> = sorted_keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();

    let mut final_grid = HashMap::with_capacity(expected_len);
    for row_key in sorted_keys {
        let rebuilt = grid_to_write
            .get(row_key)
            .and_then(|compressed| {
                let decompressed = decompress(compressed);
                if decompressed.chars().count() == expected_len {
                    Some(compressed.clone())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                let mut chars = vec![PLACEHOLDER_CHAR; expected_len];
                if let Some(&idx) = index_of.get(row_key.as_str()) {
                    chars[idx] = DIAGONAL_CHAR;
                }
                compress(&chars.into_iter().collect::<String>())
            });
        final_grid.insert(row_key.clone(), rebuilt);
    }
    final_grid
}

/// Writes a tracker file atomically: sorts keys, rebuilds/validates the
/// grid, then writes to a sibling temp file and renames over the target.
/// Identical to `write_tracker_file_with_template` with no template halves.
pub fn write_tracker_file(
    tracker_path: &Path,
    key_defs: &HashMap<String, String>,
    grid_to_write: &HashMap<String, String>,
    last_key_edit: &str,
    last_grid_edit: &str,
) -> Result<()> {
    write_tracker_file_with_template(tracker_path, key_defs, grid_to_write, last_key_edit, last_grid_edit, None, None)
}

/// Writes a tracker file atomically, additionally wrapping the
/// machine-managed section with a verbatim human template prefix/suffix
/// (the `---mini_tracker_start---`/`---mini_tracker_end---` markers mini
/// trackers carry). Pass `None` for both to write a plain tracker with no
/// markers at all, matching `write_tracker_file`.
pub fn write_tracker_file_with_template(
    tracker_path: &Path,
    key_defs: &HashMap<String, String>,
    grid_to_write: &HashMap<String, String>,
    last_key_edit: &str,
    last_grid_edit: &str,
    template_prefix: Option<&str>,
    template_suffix: Option<&str>,
) -> Result<()> {
    if let Some(dir) = tracker_path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let sorted_keys = sort_key_strings_hierarchically(&key_defs.keys().cloned().collect::<Vec<_>>());
    let final_grid_map = rebuild_grid(grid_to_write, &sorted_keys);
    let grid = Grid::from_rows(final_grid_map.clone());

    if !validate_grid(&grid, &sorted_keys) {
        return Err(DepMapError::GridInvariantViolation(format!(
            "grid failed validation while writing '{}'",
            tracker_path.display()
        )));
    }

    let mut out = String::new();
    if let Some(prefix) = template_prefix {
        out.push_str(prefix);
        if !prefix.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str("---KEY_DEFINITIONS_START---\n");
    out.push_str("Key Definitions:\n");
    for key in &sorted_keys {
        let path = key_defs.get(key).cloned().unwrap_or_default();
        out.push_str(&format!("{key}: {}\n", normalize_path(&path)));
    }
    out.push_str("---KEY_DEFINITIONS_END---\n\n");

    out.push_str(&format!("last_KEY_edit: {last_key_edit}\n"));
    out.push_str(&format!("last_GRID_edit: {last_grid_edit}\n\n"));

    out.push_str("---GRID_START---\n");
    if sorted_keys.is_empty() {
        out.push_str("X \n");
    } else {
        out.push_str(&format!("X {}\n", sorted_keys.join(" ")));
        for key in &sorted_keys {
            let row = final_grid_map.get(key).cloned().unwrap_or_default();
            out.push_str(&format!("{key} = {row}\n"));
        }
    }
    out.push_str("---GRID_END---\n");
    if let Some(suffix) = template_suffix {
        out.push('\n');
        out.push_str(suffix);
        if !suffix.ends_with('\n') {
            out.push('\n');
        }
    }

    let tmp_path = tracker_path.with_extension(format!(
        "{}.tmp",
        tracker_path.extension().and_then(|e| e.to_str()).unwrap_or("md")
    ));
    std::fs::write(&tmp_path, out).map_err(|e| io_err(&tmp_path, e))?;
    std::fs::rename(&tmp_path, tracker_path).map_err(|e| io_err(tracker_path, e))?;

    info!(
        path = %tracker_path.display(),
        keys = sorted_keys.len(),
        "wrote tracker file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_tracker_file;

    #[test]
    fn writes_and_reparses_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.md");

        let mut key_defs = HashMap::new();
        key_defs.insert("1A".to_string(), "/repo/src".to_string());
        key_defs.insert("1A1".to_string(), "/repo/src/lib.rs".to_string());

        let mut grid = HashMap::new();
        grid.insert("1A".to_string(), "ox".to_string());
        grid.insert("1A1".to_string(), "xo".to_string());

        write_tracker_file(&path, &key_defs, &grid, "Initial creation", "Initial creation").unwrap();

        let doc = parse_tracker_file(&path);
        assert_eq!(doc.key_defs.len(), 2);
        assert_eq!(doc.grid.get("1A").unwrap(), "ox");
    }

    #[test]
    fn template_prefix_and_suffix_survive_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_module.md");

        let mut key_defs = HashMap::new();
        key_defs.insert("1A".to_string(), "/repo/a".to_string());
        let mut grid = HashMap::new();
        grid.insert("1A".to_string(), "o".to_string());

        let prefix = "# Module: a\n\n## Purpose\nsomething\n\n---mini_tracker_start---";
        let suffix = "---mini_tracker_end---\n";

        write_tracker_file_with_template(&path, &key_defs, &grid, "init", "init", Some(prefix), Some(suffix)).unwrap();

        let doc = parse_tracker_file(&path);
        assert_eq!(doc.key_defs.len(), 1);
        assert_eq!(doc.template_prefix.as_deref(), Some(prefix));
        assert_eq!(doc.template_suffix.as_deref().unwrap(), suffix);
    }

    #[test]
    fn rebuilds_missing_rows_as_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.md");

        let mut key_defs = HashMap::new();
        key_defs.insert("1A".to_string(), "/repo/a".to_string());
        key_defs.insert("1B".to_string(), "/repo/b".to_string());
        let grid = HashMap::new();

        write_tracker_file(&path, &key_defs, &grid, "init", "init").unwrap();
        let doc = parse_tracker_file(&path);
        assert_eq!(decompress_row(&doc, "1A"), "op");
        assert_eq!(decompress_row(&doc, "1B"), "po");
    }

    fn decompress_row(doc: &crate::document::TrackerDocument, key: &str) -> String {
        depmap_grid::decompress(doc.grid.get(key).unwrap())
    }
}
