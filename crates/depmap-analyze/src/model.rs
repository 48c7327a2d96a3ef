use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Py,
    Js,
    Md,
    Html,
    Css,
    Generic,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Py => "py",
            FileType::Js => "js",
            FileType::Md => "md",
            FileType::Html => "html",
            FileType::Css => "css",
            FileType::Generic => "generic",
        }
    }

    /// Classifies a path by extension. Mirrors `path_utils.get_file_type`'s
    /// extension table; anything unrecognized falls back to `Generic`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
            Some(ext) if ext == "py" || ext == "pyi" => FileType::Py,
            Some(ext) if matches!(ext.as_str(), "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs") => FileType::Js,
            Some(ext) if ext == "md" || ext == "markdown" => FileType::Md,
            Some(ext) if ext == "html" || ext == "htm" => FileType::Html,
            Some(ext) if ext == "css" => FileType::Css,
            _ => FileType::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub url: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRef {
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRef {
    pub target_name: String,
    pub potential_source: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeAccessRef {
    pub target_name: String,
    pub potential_source: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceRef {
    pub class_name: String,
    pub base_class_name: String,
    pub potential_source: String,
    pub line: usize,
}

/// Tagged-variant analysis record: one variant per tracked file type, each
/// listing only the fields meaningful for that type. Replaces a
/// dynamic/optional-field record shape; the suggester dispatches on the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRecord {
    Py {
        path: String,
        imports: Vec<String>,
        functions: Vec<FunctionRef>,
        classes: Vec<ClassRef>,
        calls: Vec<CallRef>,
        attribute_accesses: Vec<AttributeAccessRef>,
        inheritance: Vec<InheritanceRef>,
    },
    Js {
        path: String,
        imports: Vec<String>,
        functions: Vec<FunctionRef>,
        classes: Vec<ClassRef>,
    },
    Md {
        path: String,
        links: Vec<LinkRef>,
    },
    Html {
        path: String,
        links: Vec<LinkRef>,
        scripts: Vec<LinkRef>,
        stylesheets: Vec<LinkRef>,
        images: Vec<LinkRef>,
    },
    Css {
        path: String,
        imports: Vec<LinkRef>,
    },
    Generic {
        path: String,
    },
}

impl AnalysisRecord {
    pub fn path(&self) -> &str {
        match self {
            AnalysisRecord::Py { path, .. }
            | AnalysisRecord::Js { path, .. }
            | AnalysisRecord::Md { path, .. }
            | AnalysisRecord::Html { path, .. }
            | AnalysisRecord::Css { path, .. }
            | AnalysisRecord::Generic { path } => path,
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            AnalysisRecord::Py { .. } => FileType::Py,
            AnalysisRecord::Js { .. } => FileType::Js,
            AnalysisRecord::Md { .. } => FileType::Md,
            AnalysisRecord::Html { .. } => FileType::Html,
            AnalysisRecord::Css { .. } => FileType::Css,
            AnalysisRecord::Generic { .. } => FileType::Generic,
        }
    }
}
