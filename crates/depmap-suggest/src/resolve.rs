use std::path::Path;

use depmap_core::path::normalize_path;

const JS_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"];

/// Converts a Python `import`/`from ... import` module reference into the
/// candidate absolute paths it could resolve to. `import_name` carries
/// leading dots for relative imports, exactly as captured by the regex
/// analyzer (e.g. `.sibling`, `..pkg.mod`). Only project-local resolution is
/// attempted: the original also probes the running interpreter's installed
/// packages via `importlib.util.find_spec`, which has no Rust analogue and
/// is out of scope here.
pub fn python_import_candidates(import_name: &str, source_dir: &str, project_root: &str) -> Vec<String> {
    let project_root = normalize_path(project_root);
    let mut candidates = Vec::new();

    if let Some(stripped) = import_name.strip_prefix('.') {
        let level = import_name.len() - import_name.trim_start_matches('.').len();
        let mut base_dir = normalize_path(source_dir);
        for _ in 0..level.saturating_sub(1) {
            match Path::new(&base_dir).parent() {
                Some(p) if !p.as_os_str().is_empty() => base_dir = normalize_path(p),
                _ => return candidates,
            }
        }
        if !base_dir.starts_with(&project_root) {
            return candidates;
        }
        if stripped.is_empty() {
            candidates.push(normalize_path(format!("{base_dir}/__init__.py")));
        } else {
            let module_path = stripped.replace('.', "/");
            let base_path = normalize_path(format!("{base_dir}/{module_path}"));
            candidates.push(format!("{base_path}.py"));
            candidates.push(normalize_path(format!("{base_path}/__init__.py")));
        }
    } else if !import_name.is_empty() {
        let module_path = import_name.replace('.', "/");
        let base_path = normalize_path(format!("{project_root}/{module_path}"));
        candidates.push(format!("{base_path}.py"));
        candidates.push(normalize_path(format!("{base_path}/__init__.py")));
    }

    candidates.retain(|p| p.starts_with(&project_root));
    candidates
}

/// Converts a relative/absolute JS/TS import specifier into candidate
/// absolute paths, handling the extension-present, extension-missing, and
/// directory-index cases.
pub fn js_import_candidates(import_path: &str, source_dir: &str) -> Vec<String> {
    if import_path.is_empty()
        || !(import_path.starts_with('.') || import_path.starts_with('/'))
        || import_path.starts_with("http:")
        || import_path.starts_with("https:")
    {
        return Vec::new();
    }

    let resolved_base = normalize_path(format!("{}/{}", source_dir, import_path));
    let has_extension = JS_EXTENSIONS.iter().any(|ext| import_path.to_lowercase().ends_with(ext));

    let mut candidates = Vec::new();
    if has_extension {
        candidates.push(resolved_base);
    } else {
        for ext in JS_EXTENSIONS {
            candidates.push(format!("{resolved_base}{ext}"));
        }
        for ext in JS_EXTENSIONS {
            candidates.push(normalize_path(format!("{resolved_base}/index{ext}")));
        }
    }
    candidates
}

fn strip_fragment_and_query(url: &str) -> &str {
    url.split('#').next().unwrap_or("").split('?').next().unwrap_or("")
}

const MD_IGNORED_PREFIXES: &[&str] = &["#", "://", "//", "mailto:", "tel:"];

fn is_local_md_or_html_url(url: &str) -> bool {
    !url.is_empty()
        && !MD_IGNORED_PREFIXES.iter().any(|p| if *p == "://" { url.contains(p) } else { url.starts_with(p) })
}

/// Candidate absolute paths for a Markdown link target: the literal
/// resolved path, plus `.md`/`.rst`/`index.md`/`README.md` fallbacks when
/// the link has no extension (a bare directory reference).
pub fn markdown_link_candidates(url: &str, source_dir: &str) -> Vec<String> {
    if !is_local_md_or_html_url(url) {
        return Vec::new();
    }
    let cleaned = strip_fragment_and_query(url);
    if cleaned.is_empty() {
        return Vec::new();
    }
    let resolved = normalize_path(format!("{source_dir}/{cleaned}"));
    let mut candidates = vec![resolved.clone()];
    if Path::new(&resolved).extension().is_none() {
        candidates.push(format!("{resolved}.md"));
        candidates.push(format!("{resolved}.rst"));
        candidates.push(normalize_path(format!("{resolved}/index.md")));
        candidates.push(normalize_path(format!("{resolved}/README.md")));
    }
    candidates
}

const HTML_IGNORED_PREFIXES: &[&str] = &["#", "://", "//", "mailto:", "tel:", "data:"];

fn is_local_html_resource(url: &str) -> bool {
    !url.is_empty()
        && !HTML_IGNORED_PREFIXES.iter().any(|p| if *p == "://" { url.contains(p) } else { url.starts_with(p) })
}

/// Resolved absolute path for an HTML resource reference (anchor, script,
/// stylesheet, image), or `None` if the URL is external/fragment/empty.
pub fn html_resource_candidate(url: &str, source_dir: &str) -> Option<String> {
    if !is_local_html_resource(url) {
        return None;
    }
    let cleaned = strip_fragment_and_query(url);
    if cleaned.is_empty() {
        return None;
    }
    Some(normalize_path(format!("{source_dir}/{cleaned}")))
}

/// Resolved absolute path for a CSS `@import` target, or `None` if external.
pub fn css_import_candidate(url: &str, source_dir: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.starts_with('#') || url.contains("://") || url.starts_with("//") || url.starts_with("data:")
    {
        return None;
    }
    let cleaned = strip_fragment_and_query(url);
    if cleaned.is_empty() {
        return None;
    }
    Some(normalize_path(format!("{source_dir}/{cleaned}")))
}
