use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Diagonal / self cell.
pub const DIAGONAL_CHAR: char = 'o';
/// Unverified placeholder cell, the weakest non-empty value.
pub const PLACEHOLDER_CHAR: char = 'p';
/// Explicit "no relationship known" cell.
pub const EMPTY_CHAR: char = '.';
/// Verified "no dependency" cell — suggestion-proof.
pub const NO_DEPENDENCY_CHAR: char = 'n';
/// Row depends on column.
pub const ROW_DEPENDS_CHAR: char = '<';
/// Column depends on row.
pub const COL_DEPENDS_CHAR: char = '>';
/// Mutual dependency.
pub const MUTUAL_CHAR: char = 'x';
/// Documentation relation.
pub const DOC_CHAR: char = 'd';
/// Weak semantic relation.
pub const WEAK_SEMANTIC_CHAR: char = 's';
/// Strong semantic relation.
pub const STRONG_SEMANTIC_CHAR: char = 'S';

/// Total order over cell characters, grounded on
/// `cline_utils/.../config_manager.py`'s `CHARACTER_PRIORITIES` table:
/// `. < p <= o < s < S < n = < = > = d < x`.
pub fn char_priority(c: char) -> i32 {
    match c {
        MUTUAL_CHAR => 5,
        ROW_DEPENDS_CHAR | COL_DEPENDS_CHAR | DOC_CHAR | NO_DEPENDENCY_CHAR => 4,
        STRONG_SEMANTIC_CHAR => 3,
        WEAK_SEMANTIC_CHAR => 2,
        PLACEHOLDER_CHAR | DIAGONAL_CHAR => 1,
        EMPTY_CHAR => 0,
        _ => 0,
    }
}

/// `n` may never be overwritten by a suggestion of any priority (I4); every
/// other cell is overwritten whenever the incoming value outranks it, with
/// strictly-greater-or-equal-and-non-placeholder semantics handled by the
/// caller (tracker/aggregate combine logic).
pub fn is_suggestion_proof(c: char) -> bool {
    c == NO_DEPENDENCY_CHAR
}

/// Hierarchical, contextual key identifying a tracked file or directory.
/// Persisted by path, not by `key_string` (the key string may be reassigned
/// across runs via tier promotion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_string: String,
    pub norm_path: String,
    pub parent_path: Option<String>,
    pub tier: u32,
    pub is_directory: bool,
}

/// `Path -> KeyInfo`, the persisted unit of the global key map.
pub type GlobalKeyMap = HashMap<String, KeyInfo>;

/// An edge proposed or recorded between two keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source_key: String,
    pub target_key: String,
    pub char: char,
}

/// Which kind of tracker a grid belongs to; governs §4.3's key-set and
/// structural rules (I7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerKind {
    Main,
    Doc,
    Mini,
}

impl TrackerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackerKind::Main => "main",
            TrackerKind::Doc => "doc",
            TrackerKind::Mini => "mini",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_matches_spec() {
        assert!(char_priority(EMPTY_CHAR) < char_priority(PLACEHOLDER_CHAR));
        assert!(char_priority(PLACEHOLDER_CHAR) <= char_priority(DIAGONAL_CHAR));
        assert!(char_priority(DIAGONAL_CHAR) < char_priority(WEAK_SEMANTIC_CHAR));
        assert!(char_priority(WEAK_SEMANTIC_CHAR) < char_priority(STRONG_SEMANTIC_CHAR));
        assert!(char_priority(STRONG_SEMANTIC_CHAR) < char_priority(NO_DEPENDENCY_CHAR));
        assert_eq!(char_priority(NO_DEPENDENCY_CHAR), char_priority(ROW_DEPENDS_CHAR));
        assert_eq!(char_priority(ROW_DEPENDS_CHAR), char_priority(COL_DEPENDS_CHAR));
        assert_eq!(char_priority(COL_DEPENDS_CHAR), char_priority(DOC_CHAR));
        assert!(char_priority(DOC_CHAR) < char_priority(MUTUAL_CHAR));
    }

    #[test]
    fn n_is_suggestion_proof() {
        assert!(is_suggestion_proof(NO_DEPENDENCY_CHAR));
        assert!(!is_suggestion_proof(MUTUAL_CHAR));
    }
}
