use std::path::Path;

use serde_json::json;
use tracing::info;

use depmap_core::{DepMapError, Result, DIAGONAL_CHAR, EMPTY_CHAR, PLACEHOLDER_CHAR};
use depmap_grid::decompress;
use depmap_keys::sort_key_strings_hierarchically;

use crate::document::TrackerDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Dot,
    Markdown,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Dot => "dot",
            ExportFormat::Markdown => "md",
        }
    }
}

fn io_err(path: &Path, source: std::io::Error) -> DepMapError {
    DepMapError::IoAt {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// Renders a tracker document into one of the supported export formats and
/// writes it to `output_path`. `tracker_path` is only used for the markdown
/// pass-through copy.
pub fn export_tracker(
    doc: &TrackerDocument,
    tracker_path: &Path,
    output_path: &Path,
    format: ExportFormat,
) -> Result<()> {
    if doc.key_defs.is_empty() {
        return Err(DepMapError::TrackerParse {
            path: tracker_path.to_string_lossy().to_string(),
            reason: "cannot export an empty or unreadable tracker".to_string(),
        });
    }

    if let Some(dir) = output_path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());

    match format {
        ExportFormat::Markdown => {
            std::fs::copy(tracker_path, output_path).map_err(|e| io_err(output_path, e))?;
        }
        ExportFormat::Json => {
            let payload = json!({
                "keys": doc.key_defs,
                "grid": doc.grid,
                "last_KEY_edit": doc.last_key_edit,
                "last_GRID_edit": doc.last_grid_edit,
            });
            let rendered = serde_json::to_string_pretty(&payload)?;
            std::fs::write(output_path, rendered).map_err(|e| io_err(output_path, e))?;
        }
        ExportFormat::Csv => {
            let rendered = render_csv(doc, &sorted_keys);
            std::fs::write(output_path, rendered).map_err(|e| io_err(output_path, e))?;
        }
        ExportFormat::Dot => {
            let rendered = render_dot(doc, &sorted_keys);
            std::fs::write(output_path, rendered).map_err(|e| io_err(output_path, e))?;
        }
    }

    info!(path = %output_path.display(), format = ?format, "exported tracker");
    Ok(())
}

fn render_csv(doc: &TrackerDocument, sorted_keys: &[String]) -> String {
    let mut out = String::from("Source Key,Source Path,Target Key,Target Path,Dependency Type\n");
    for source_key in sorted_keys {
        let Some(compressed) = doc.grid.get(source_key) else { continue };
        let row: Vec<char> = decompress(compressed).chars().collect();
        if row.len() != sorted_keys.len() {
            continue;
        }
        for (j, &dep_char) in row.iter().enumerate() {
            if matches!(dep_char, EMPTY_CHAR | DIAGONAL_CHAR | PLACEHOLDER_CHAR) {
                continue;
            }
            let target_key = &sorted_keys[j];
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                source_key,
                doc.key_defs.get(source_key).cloned().unwrap_or_default(),
                target_key,
                doc.key_defs.get(target_key).cloned().unwrap_or_default(),
                dep_char,
            ));
        }
    }
    out
}

fn edge_style(dep_char: char) -> (&'static str, &'static str, &'static str) {
    match dep_char {
        '>' => ("blue", "solid", "normal"),
        '<' => ("green", "solid", "oinv"),
        'x' => ("red", "dashed", "odot"),
        'd' => ("orange", "solid", "normal"),
        's' => ("grey", "dotted", "normal"),
        'S' => ("dimgrey", "bold", "normal"),
        _ => ("black", "solid", "normal"),
    }
}

fn render_dot(doc: &TrackerDocument, sorted_keys: &[String]) -> String {
    let mut out = String::from("digraph Dependencies {\n  rankdir=LR;\n");
    out.push_str("  node [shape=box, style=\"filled\", fillcolor=\"#EFEFEF\", fontname=\"Arial\"];\n");
    out.push_str("  edge [fontsize=10, fontname=\"Arial\"];\n\n");

    for key in sorted_keys {
        let path = doc.key_defs.get(key).cloned().unwrap_or_default();
        let label_path = Path::new(&path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&path)
            .replace('"', "\\\"");
        out.push_str(&format!("  \"{key}\" [label=\"{key}\\n{label_path}\"];\n"));
    }
    out.push('\n');

    for source_key in sorted_keys {
        let Some(compressed) = doc.grid.get(source_key) else { continue };
        let row: Vec<char> = decompress(compressed).chars().collect();
        if row.len() != sorted_keys.len() {
            continue;
        }
        for (j, &dep_char) in row.iter().enumerate() {
            if matches!(dep_char, EMPTY_CHAR | DIAGONAL_CHAR | PLACEHOLDER_CHAR) {
                continue;
            }
            let target_key = &sorted_keys[j];
            let (color, style, arrowhead) = edge_style(dep_char);
            out.push_str(&format!(
                "  \"{source_key}\" -> \"{target_key}\" [label=\"{dep_char}\", color=\"{color}\", style=\"{style}\", arrowhead=\"{arrowhead}\"];\n"
            ));
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_grid::compress;
    use std::collections::HashMap;

    fn sample_doc() -> TrackerDocument {
        let mut key_defs = HashMap::new();
        key_defs.insert("1A".to_string(), "/repo/a.rs".to_string());
        key_defs.insert("1B".to_string(), "/repo/b.rs".to_string());
        let mut grid = HashMap::new();
        grid.insert("1A".to_string(), compress("o>"));
        grid.insert("1B".to_string(), compress("<o"));
        TrackerDocument {
            key_defs,
            grid,
            last_key_edit: "Initial creation".to_string(),
            last_grid_edit: "Initial creation".to_string(),
            template_prefix: None,
            template_suffix: None,
        }
    }

    #[test]
    fn csv_export_lists_one_row_per_edge() {
        let doc = sample_doc();
        let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());
        let csv = render_csv(&doc, &sorted_keys);
        assert_eq!(csv.lines().count(), 3); // header + 2 edges (> and <)
    }

    #[test]
    fn dot_export_includes_nodes_and_edges() {
        let doc = sample_doc();
        let sorted_keys = sort_key_strings_hierarchically(&doc.key_defs.keys().cloned().collect::<Vec<_>>());
        let dot = render_dot(&doc, &sorted_keys);
        assert!(dot.contains("\"1A\" [label=\"1A\\na.rs\"]"));
        assert!(dot.contains("\"1A\" -> \"1B\""));
    }

    #[test]
    fn json_export_fails_on_empty_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let empty = TrackerDocument::default();
        let result = export_tracker(
            &empty,
            &dir.path().join("t.md"),
            &dir.path().join("t.json"),
            ExportFormat::Json,
        );
        assert!(result.is_err());
    }
}
