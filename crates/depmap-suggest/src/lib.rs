pub mod css;
pub mod dispatch;
pub mod html;
pub mod javascript;
pub mod markdown;
pub mod model;
pub mod priority;
pub mod python;
pub mod resolve;
pub mod semantic;

pub use css::suggest_css_dependencies;
pub use dispatch::suggest_dependencies;
pub use html::suggest_html_dependencies;
pub use javascript::suggest_javascript_dependencies;
pub use markdown::suggest_documentation_dependencies;
pub use model::{SimilarityThresholds, Suggestion};
pub use priority::combine_with_char_priority;
pub use python::suggest_python_dependencies;
pub use semantic::suggest_semantic_dependencies;
