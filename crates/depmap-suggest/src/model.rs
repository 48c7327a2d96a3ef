/// One candidate edge from the file being suggested-for toward `target_key`,
/// before priority combination. `None` for an unresolved target is filtered
/// out by the caller rather than represented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub target_key: String,
    pub dep_char: char,
}

impl Suggestion {
    pub fn new(target_key: impl Into<String>, dep_char: char) -> Self {
        Self { target_key: target_key.into(), dep_char }
    }
}

/// Threshold configuration for semantic suggestions. Field names mirror the
/// two `.clinerules` config keys (`code_similarity`, `doc_similarity`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityThresholds {
    pub code_similarity: f32,
    pub doc_similarity: f32,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self { code_similarity: 0.7, doc_similarity: 0.65 }
    }
}
