pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod path;

pub use cache::{Cache, CacheConfig, Namespace};
pub use config::{ConfigManager, Settings};
pub use error::{DepMapError, Result};
pub use model::{
    char_priority, is_suggestion_proof, Edge, GlobalKeyMap, KeyInfo, TrackerKind, COL_DEPENDS_CHAR,
    DIAGONAL_CHAR, DOC_CHAR, EMPTY_CHAR, MUTUAL_CHAR, NO_DEPENDENCY_CHAR, PLACEHOLDER_CHAR,
    ROW_DEPENDS_CHAR, STRONG_SEMANTIC_CHAR, WEAK_SEMANTIC_CHAR,
};
