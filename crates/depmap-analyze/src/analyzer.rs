use std::path::Path;

use depmap_core::Result;

use crate::model::AnalysisRecord;

/// Contract for per-file analysis. A production deployment swaps in a
/// tree-sitter-backed implementation behind this trait without touching
/// the suggester, which only depends on `AnalysisRecord`.
pub trait Analyzer {
    fn analyze(&self, path: &Path) -> Result<AnalysisRecord>;
}
