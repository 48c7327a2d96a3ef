use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use depmap_core::path::normalize_path;
use depmap_keys::validate_key;

use crate::document::TrackerDocument;

static KEY_DEF_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?si)---KEY_DEFINITIONS_START---\n(.*?)\n---KEY_DEFINITIONS_END---").unwrap()
});
static GRID_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)---GRID_START---\n(.*?)\n---GRID_END---").unwrap());
static KEY_DEF_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-zA-Z0-9]+)\s*:\s*(.*)$").unwrap());
static GRID_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-zA-Z0-9]+)\s*=\s*(.*)$").unwrap());
static LAST_KEY_EDIT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^last_KEY_edit\s*:\s*(.*)$").unwrap());
static LAST_GRID_EDIT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^last_GRID_edit\s*:\s*(.*)$").unwrap());

pub const MINI_TRACKER_START_MARKER: &str = "---mini_tracker_start---";
pub const MINI_TRACKER_END_MARKER: &str = "---mini_tracker_end---";

/// Splits out the verbatim human-template prefix/suffix around the two mini
/// tracker markers, if both are present and correctly ordered. Mirrors
/// `update_mini_tracker`'s marker handling, which preserves everything
/// outside the markers untouched on rewrite.
fn split_mini_template(content: &str) -> (Option<String>, Option<String>) {
    let start = content.find(MINI_TRACKER_START_MARKER);
    let end = content.find(MINI_TRACKER_END_MARKER);
    match (start, end) {
        (Some(start_idx), Some(end_idx)) if start_idx < end_idx => {
            let prefix_end = start_idx + MINI_TRACKER_START_MARKER.len();
            let prefix = content[..prefix_end].to_string();
            let suffix = content[end_idx..].to_string();
            (Some(prefix), Some(suffix))
        }
        _ => (None, None),
    }
}

/// Reads and parses a tracker file. Never hard-fails: a missing file, a
/// missing section, or a malformed line yields an empty/partial structure
/// with the problem logged, matching `read_tracker_file`'s
/// catch-and-return-empty behavior.
pub fn parse_tracker_file(path: &Path) -> TrackerDocument {
    let norm_path = normalize_path(path);
    if !path.is_file() {
        debug!(path = %norm_path, "tracker file not found, returning empty structure");
        return TrackerDocument::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %norm_path, error = %e, "failed to read tracker file");
            return TrackerDocument::default();
        }
    };

    let mut key_defs = std::collections::HashMap::new();
    if let Some(caps) = KEY_DEF_SECTION.captures(&content) {
        for line in caps[1].lines() {
            let line = line.trim();
            if line.is_empty() || line.to_lowercase().starts_with("key definitions:") {
                continue;
            }
            if let Some(m) = KEY_DEF_LINE.captures(line) {
                let key = &m[1];
                let value = m[2].trim();
                if validate_key(key) {
                    key_defs.insert(key.to_string(), normalize_path(value));
                } else {
                    warn!(key, "skipping invalid key format in key definitions");
                }
            }
        }
    }

    let mut grid = std::collections::HashMap::new();
    if let Some(caps) = GRID_SECTION.captures(&content) {
        let mut lines: Vec<&str> = caps[1].trim().lines().collect();
        if let Some(first) = lines.first() {
            let trimmed = first.trim();
            if trimmed.to_uppercase().starts_with("X ") || trimmed == "X" {
                lines.remove(0);
            }
        }
        for line in lines {
            let line = line.trim();
            if let Some(m) = GRID_LINE.captures(line) {
                let key = &m[1];
                let value = m[2].trim();
                if validate_key(key) {
                    grid.insert(key.to_string(), value.to_string());
                } else {
                    warn!(key, "grid row key has invalid format, skipping");
                }
            }
        }
    }

    let last_key_edit = LAST_KEY_EDIT_LINE
        .captures(&content)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();
    let last_grid_edit = LAST_GRID_EDIT_LINE
        .captures(&content)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    let (template_prefix, template_suffix) = split_mini_template(&content);

    debug!(path = %norm_path, keys = key_defs.len(), rows = grid.len(), "parsed tracker file");
    TrackerDocument {
        key_defs,
        grid,
        last_key_edit,
        last_grid_edit,
        template_prefix,
        template_suffix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> &'static str {
        "---KEY_DEFINITIONS_START---\nKey Definitions:\n1A: /repo/src\n1A1: /repo/src/lib.rs\n---KEY_DEFINITIONS_END---\n\nlast_KEY_edit: Initial creation\nlast_GRID_edit: Initial creation\n\n---GRID_START---\nX 1A 1A1\n1A = ox\n1A1 = xo\n---GRID_END---\n"
    }

    #[test]
    fn parses_full_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.md");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample().as_bytes()).unwrap();

        let doc = parse_tracker_file(&path);
        assert_eq!(doc.key_defs.len(), 2);
        assert_eq!(doc.grid.len(), 2);
        assert_eq!(doc.last_key_edit, "Initial creation");
        assert_eq!(doc.last_grid_edit, "Initial creation");
    }

    #[test]
    fn missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let doc = parse_tracker_file(&dir.path().join("nope.md"));
        assert!(doc.is_empty());
    }

    #[test]
    fn invalid_key_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.md");
        std::fs::write(
            &path,
            "---KEY_DEFINITIONS_START---\nKey Definitions:\nnotakey: /x\n1A: /repo\n---KEY_DEFINITIONS_END---\n",
        )
        .unwrap();
        let doc = parse_tracker_file(&path);
        assert_eq!(doc.key_defs.len(), 1);
        assert!(doc.key_defs.contains_key("1A"));
    }

    #[test]
    fn mini_tracker_markers_are_split_out_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_module.md");
        let content = format!(
            "# Module: a\n\n## Purpose\nsome text\n\n---mini_tracker_start---\n{}\n---mini_tracker_end---\ntrailing notes\n",
            sample()
        );
        std::fs::write(&path, &content).unwrap();

        let doc = parse_tracker_file(&path);
        assert_eq!(doc.key_defs.len(), 2);
        assert!(doc.template_prefix.as_deref().unwrap().ends_with("---mini_tracker_start---"));
        assert!(doc.template_prefix.as_deref().unwrap().contains("## Purpose"));
        assert!(doc.template_suffix.as_deref().unwrap().starts_with("---mini_tracker_end---"));
        assert!(doc.template_suffix.as_deref().unwrap().contains("trailing notes"));
    }
}
