use once_cell::sync::Lazy;
use regex::Regex;

static PY_DEF_OR_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<indent>[ \t]*)(?:async\s+def|def|class)\s+\w").unwrap());

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Extracts the source text of every top-level-or-nested `def`/`class` block
/// by indentation: a block runs from its header line until the first
/// following line whose indentation is <= the header's (blank lines don't
/// end a block). Stands in for `ast.get_source_segment` over
/// `FunctionDef`/`AsyncFunctionDef`/`ClassDef` nodes, which a regex-only
/// port can't reproduce exactly.
fn extract_def_and_class_blocks(lines: &[&str]) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if PY_DEF_OR_CLASS.is_match(line) {
            let header_indent = indent_width(line);
            let mut end = i + 1;
            while end < lines.len() {
                let candidate = lines[end];
                if candidate.trim().is_empty() {
                    end += 1;
                    continue;
                }
                if indent_width(candidate) <= header_indent {
                    break;
                }
                end += 1;
            }
            blocks.push(lines[i..end].join("\n"));
            i = end;
        } else {
            i += 1;
        }
    }
    blocks
}

/// Preprocesses file content before embedding generation. For Python source
/// this strips `import`/`from` lines (their token overlap across unrelated
/// files is noise for similarity) and appends each function/class
/// definition's text twice, weighting structural content over prose. Other
/// file types pass through unchanged; a dedicated preprocessor per type is
/// future work.
pub fn preprocess_for_embedding(file_path: &str, content: &str) -> String {
    if !file_path.to_lowercase().ends_with(".py") {
        return content.to_string();
    }

    let lines: Vec<&str> = content.lines().collect();
    let filtered: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with("import ") || trimmed.starts_with("from "))
        })
        .collect();

    let blocks = extract_def_and_class_blocks(&lines);
    let mut weighted = Vec::with_capacity(blocks.len() * 2);
    for block in &blocks {
        weighted.push(block.clone());
        weighted.push(block.clone());
    }

    let mut combined = filtered.join("\n");
    if !weighted.is_empty() {
        combined.push('\n');
        combined.push_str(&weighted.join("\n"));
    }
    combined
}
