use std::path::Path;

use depmap_core::{GlobalKeyMap, Result, STRONG_SEMANTIC_CHAR, WEAK_SEMANTIC_CHAR};
use depmap_embed::similarity_between_keys;
use tracing::debug;

use crate::model::{SimilarityThresholds, Suggestion};

/// Semantic suggestions (`s`/`S`) from embedding similarity against every
/// other tracked file. `O(files^2)` per run; the caller is expected to
/// invoke this once per changed file inside the bounded worker pool rather
/// than for the whole project on every pass.
pub fn suggest_semantic_dependencies(
    source_key: &str,
    path_to_key_info: &GlobalKeyMap,
    embeddings_dir: &Path,
    project_root: &Path,
    thresholds: SimilarityThresholds,
) -> Result<Vec<Suggestion>> {
    let mut out = Vec::new();
    let target_keys: Vec<&str> = path_to_key_info
        .values()
        .filter(|info| !info.is_directory && info.key_string != source_key)
        .map(|info| info.key_string.as_str())
        .collect();

    for target_key in target_keys {
        let confidence = similarity_between_keys(source_key, target_key, path_to_key_info, embeddings_dir, project_root)?;
        debug!(source_key, target_key, confidence, "semantic similarity computed");
        let assigned = if confidence >= thresholds.code_similarity {
            Some(STRONG_SEMANTIC_CHAR)
        } else if confidence >= thresholds.doc_similarity {
            Some(WEAK_SEMANTIC_CHAR)
        } else {
            None
        };
        if let Some(dep_char) = assigned {
            out.push(Suggestion::new(target_key, dep_char));
        }
    }

    Ok(out)
}
