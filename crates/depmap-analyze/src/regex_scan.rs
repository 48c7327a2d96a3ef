use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use depmap_core::path::normalize_path;
use depmap_core::{DepMapError, Result};

use crate::analyzer::Analyzer;
use crate::model::{
    AnalysisRecord, AttributeAccessRef, CallRef, ClassRef, FileType, FunctionRef, InheritanceRef, LinkRef,
};

static PY_IMPORT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*from\s+([.\w]+)\s+import\s+(?:\(|\*|\w+)").unwrap());
static PY_IMPORT_MODULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+([.\w]+(?:\s*,\s*[.\w]+)*)").unwrap());
static PY_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(\w+)\s*\(").unwrap());
static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap());
static PY_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\(").unwrap());
static PY_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\.([A-Za-z_][A-Za-z0-9_]*)\b").unwrap());

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"import(?:["'\s]*(?:[\w*{}\n\r\s,]+)from\s*)?["']([^"']+)["']|\brequire\s*\(\s*["']([^"']+)["']\s*\)|import\s*\(\s*["']([^"']+)["']\s*\)"#,
    )
    .unwrap()
});
static JS_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:async\s+)?function\s*\*?\s*([a-zA-Z_$][\w$]*)\s*\(").unwrap());
static JS_ARROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:const|let|var)\s+([a-zA-Z_$][\w$]*)\s*=\s*(?:async\s*)?\([^)]*\)\s*=>").unwrap());
static JS_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"class\s+([a-zA-Z_$][\w$]*)").unwrap());

static MD_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(?:[^\]]+)\]\(([^)]+)\)").unwrap());

static HTML_A_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<a\s+(?:[^>]*?\s+)?href=(["'])(?P<url>[^"']+?)\1"#).unwrap());
static HTML_SCRIPT_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<script\s+(?:[^>]*?\s+)?src=(["'])(?P<url>[^"']+?)\1"#).unwrap());
static HTML_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img\s+(?:[^>]*?\s+)?src=(["'])(?P<url>[^"']+?)\1"#).unwrap());
static HTML_LINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<link([^>]+)>").unwrap());
static HTML_HREF_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)href=(["'])(?P<url>[^"']+?)\1"#).unwrap());
static HTML_REL_STYLESHEET: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)rel=(["'])stylesheet\1"#).unwrap());

static CSS_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)@import\s+(?:url\s*\(\s*)?["']?([^"')\s]+[^"')]*?)["']?(?:\s*\))?;"#).unwrap());

const IGNORED_URL_PREFIXES: &[&str] = &["#", "http:", "https:", "mailto:", "tel:", "data:"];

fn is_local_url(url: &str) -> bool {
    !IGNORED_URL_PREFIXES.iter().any(|p| url.starts_with(p))
}

fn line_of(content: &str, byte_offset: usize) -> usize {
    content[..byte_offset].matches('\n').count() + 1
}

/// Best-effort line-oriented analyzer covering Python/JS/TS/Markdown/HTML/CSS
/// via regexes. Extraction correctness is explicitly out of scope; this
/// exists so the orchestrator's analyze phase has something concrete to
/// call. Swap in an AST-backed `Analyzer` for anything that needs precision.
pub struct RegexAnalyzer;

impl Analyzer for RegexAnalyzer {
    fn analyze(&self, path: &Path) -> Result<AnalysisRecord> {
        let norm_path = normalize_path(path);
        let content = std::fs::read_to_string(path).map_err(|e| DepMapError::AnalysisFailure {
            path: norm_path.clone(),
            reason: e.to_string(),
        })?;

        Ok(match FileType::from_path(path) {
            FileType::Py => scan_python(&norm_path, &content),
            FileType::Js => scan_js(&norm_path, &content),
            FileType::Md => scan_markdown(&norm_path, &content),
            FileType::Html => scan_html(&norm_path, &content),
            FileType::Css => scan_css(&norm_path, &content),
            FileType::Generic => AnalysisRecord::Generic { path: norm_path },
        })
    }
}

fn scan_python(path: &str, content: &str) -> AnalysisRecord {
    let mut imports = Vec::new();
    for caps in PY_IMPORT_FROM.captures_iter(content) {
        imports.push(caps[1].to_string());
    }
    for caps in PY_IMPORT_MODULE.captures_iter(content) {
        imports.extend(caps[1].split(',').map(|s| s.trim().to_string()));
    }

    let functions: Vec<FunctionRef> = PY_DEF
        .captures_iter(content)
        .map(|c| FunctionRef {
            name: c[1].to_string(),
            line: line_of(content, c.get(0).unwrap().start()),
        })
        .collect();

    let mut classes = Vec::new();
    let mut inheritance = Vec::new();
    for caps in PY_CLASS.captures_iter(content) {
        let class_name = caps[1].to_string();
        let line = line_of(content, caps.get(0).unwrap().start());
        classes.push(ClassRef { name: class_name.clone(), line });
        if let Some(bases) = caps.get(2) {
            for base in bases.as_str().split(',') {
                let base = base.trim();
                if base.is_empty() || base == "object" {
                    continue;
                }
                inheritance.push(InheritanceRef {
                    class_name: class_name.clone(),
                    base_class_name: base.to_string(),
                    potential_source: base.to_string(),
                    line,
                });
            }
        }
    }

    let calls: Vec<CallRef> = PY_CALL
        .captures_iter(content)
        .map(|c| {
            let full = c[1].to_string();
            let potential_source = full.rsplit_once('.').map(|(prefix, _)| prefix.to_string());
            CallRef {
                target_name: full,
                potential_source,
                line: line_of(content, c.get(0).unwrap().start()),
            }
        })
        .collect();

    let attribute_accesses: Vec<AttributeAccessRef> = PY_ATTR
        .captures_iter(content)
        .map(|c| AttributeAccessRef {
            target_name: c[2].to_string(),
            potential_source: c[1].to_string(),
            line: line_of(content, c.get(0).unwrap().start()),
        })
        .collect();

    AnalysisRecord::Py {
        path: path.to_string(),
        imports,
        functions,
        classes,
        calls,
        attribute_accesses,
        inheritance,
    }
}

fn scan_js(path: &str, content: &str) -> AnalysisRecord {
    let imports: Vec<String> = JS_IMPORT
        .captures_iter(content)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().to_string())
        .collect();

    let mut functions: Vec<FunctionRef> = JS_FUNCTION
        .captures_iter(content)
        .map(|c| FunctionRef {
            name: c[1].to_string(),
            line: line_of(content, c.get(0).unwrap().start()),
        })
        .collect();
    functions.extend(JS_ARROW.captures_iter(content).map(|c| FunctionRef {
        name: c[1].to_string(),
        line: line_of(content, c.get(0).unwrap().start()),
    }));

    let classes: Vec<ClassRef> = JS_CLASS
        .captures_iter(content)
        .map(|c| ClassRef {
            name: c[1].to_string(),
            line: line_of(content, c.get(0).unwrap().start()),
        })
        .collect();

    AnalysisRecord::Js { path: path.to_string(), imports, functions, classes }
}

fn scan_markdown(path: &str, content: &str) -> AnalysisRecord {
    let links = MD_LINK
        .captures_iter(content)
        .filter_map(|c| {
            let url = c[1].to_string();
            is_local_url(&url).then(|| LinkRef { url, line: line_of(content, c.get(0).unwrap().start()) })
        })
        .collect();
    AnalysisRecord::Md { path: path.to_string(), links }
}

fn extract_urls(pattern: &Regex, content: &str) -> Vec<LinkRef> {
    pattern
        .captures_iter(content)
        .filter_map(|c| {
            let url = c.name("url")?.as_str().to_string();
            is_local_url(&url).then(|| LinkRef { url, line: line_of(content, c.get(0).unwrap().start()) })
        })
        .collect()
}

fn scan_html(path: &str, content: &str) -> AnalysisRecord {
    let links = extract_urls(&HTML_A_HREF, content);
    let scripts = extract_urls(&HTML_SCRIPT_SRC, content);
    let images = extract_urls(&HTML_IMG_SRC, content);

    let mut stylesheets = Vec::new();
    for tag_match in HTML_LINK_TAG.captures_iter(content) {
        let tag_content = &tag_match[1];
        if !HTML_REL_STYLESHEET.is_match(tag_content) {
            continue;
        }
        if let Some(href) = HTML_HREF_ATTR.captures(tag_content) {
            let url = href["url"].to_string();
            if is_local_url(&url) {
                stylesheets.push(LinkRef { url, line: line_of(content, tag_match.get(0).unwrap().start()) });
            }
        }
    }

    AnalysisRecord::Html { path: path.to_string(), links, scripts, stylesheets, images }
}

fn scan_css(path: &str, content: &str) -> AnalysisRecord {
    let imports = CSS_IMPORT
        .captures_iter(content)
        .filter_map(|c| {
            let url = c[1].trim().to_string();
            is_local_url(&url).then(|| LinkRef { url, line: line_of(content, c.get(0).unwrap().start()) })
        })
        .collect();
    AnalysisRecord::Css { path: path.to_string(), imports }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_str(dir: &std::path::Path, name: &str, content: &str) -> AnalysisRecord {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        RegexAnalyzer.analyze(&path).unwrap()
    }

    #[test]
    fn python_imports_and_defs_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let record = analyze_str(
            dir.path(),
            "mod.py",
            "import os\nfrom .sibling import helper\n\nclass Foo(Base):\n    def bar(self):\n        pass\n",
        );
        match record {
            AnalysisRecord::Py { imports, classes, functions, inheritance, .. } => {
                assert!(imports.contains(&"os".to_string()));
                assert!(imports.iter().any(|i| i.contains("sibling")));
                assert_eq!(classes.len(), 1);
                assert_eq!(functions.len(), 1);
                assert_eq!(inheritance.len(), 1);
                assert_eq!(inheritance[0].base_class_name, "Base");
            }
            other => panic!("expected Py record, got {other:?}"),
        }
    }

    #[test]
    fn markdown_local_links_are_kept_and_external_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let record = analyze_str(
            dir.path(),
            "doc.md",
            "See [here](./other.md) and [ext](https://example.com)\n",
        );
        match record {
            AnalysisRecord::Md { links, .. } => {
                assert_eq!(links.len(), 1);
                assert_eq!(links[0].url, "./other.md");
            }
            other => panic!("expected Md record, got {other:?}"),
        }
    }

    #[test]
    fn css_import_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let record = analyze_str(dir.path(), "style.css", "@import \"./base.css\";\n");
        match record {
            AnalysisRecord::Css { imports, .. } => {
                assert_eq!(imports.len(), 1);
                assert_eq!(imports[0].url, "./base.css");
            }
            other => panic!("expected Css record, got {other:?}"),
        }
    }

    #[test]
    fn unknown_extension_yields_generic_record() {
        let dir = tempfile::tempdir().unwrap();
        let record = analyze_str(dir.path(), "data.bin", "whatever");
        assert!(matches!(record, AnalysisRecord::Generic { .. }));
    }
}
