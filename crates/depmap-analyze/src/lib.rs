pub mod analyzer;
pub mod model;
pub mod regex_scan;

pub use analyzer::Analyzer;
pub use model::{
    AnalysisRecord, AttributeAccessRef, CallRef, ClassRef, FileType, FunctionRef, InheritanceRef, LinkRef,
};
pub use regex_scan::RegexAnalyzer;
