use std::path::Path;

use depmap_core::{GlobalKeyMap, Result};
use depmap_keys::{get_path_from_key, validate_key};
use tracing::warn;

use crate::embedder::cosine_similarity;
use crate::persist;

/// Cosine similarity between the persisted vectors for two key strings.
/// Any resolution failure (invalid key syntax, key absent from the map, or a
/// missing `.npy` mirror) yields `0.0` rather than propagating an error —
/// the suggester treats "no similarity evidence" and "definitely dissimilar"
/// identically, matching `calculate_similarity`'s own best-effort contract.
pub fn similarity_between_keys(
    key1: &str,
    key2: &str,
    path_to_key_info: &GlobalKeyMap,
    embeddings_dir: &Path,
    project_root: &Path,
) -> Result<f32> {
    if !(validate_key(key1) && validate_key(key2)) {
        warn!(key1, key2, "invalid key format for similarity");
        return Ok(0.0);
    }
    if key1 == key2 {
        return Ok(1.0);
    }

    let path1 = match get_path_from_key(key1, path_to_key_info, None)? {
        Some(p) => p,
        None => {
            warn!(key1, "key not found for similarity");
            return Ok(0.0);
        }
    };
    let path2 = match get_path_from_key(key2, path_to_key_info, None)? {
        Some(p) => p,
        None => {
            warn!(key2, "key not found for similarity");
            return Ok(0.0);
        }
    };

    let vector1_path = persist::mirrored_vector_path(embeddings_dir, project_root, Path::new(&path1))?;
    let vector2_path = persist::mirrored_vector_path(embeddings_dir, project_root, Path::new(&path2))?;
    if !vector1_path.exists() || !vector2_path.exists() {
        return Ok(0.0);
    }

    let v1 = persist::load_vector(&vector1_path)?;
    let v2 = persist::load_vector(&vector2_path)?;
    Ok(cosine_similarity(&v1, &v2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;
    use tempfile::tempdir;

    #[test]
    fn identical_keys_are_maximally_similar() {
        let map = GlobalKeyMap::new();
        let root = tempdir().unwrap();
        let sim =
            similarity_between_keys("1A", "1A", &map, &root.path().join(".embeddings"), root.path()).unwrap();
        assert_eq!(sim, 1.0);
    }

    #[test]
    fn missing_key_yields_zero() {
        let map = GlobalKeyMap::new();
        let root = tempdir().unwrap();
        let sim =
            similarity_between_keys("1A", "1B", &map, &root.path().join(".embeddings"), root.path()).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn missing_vector_files_yield_zero() {
        let root = tempdir().unwrap();
        let mut map = GlobalKeyMap::new();
        map.insert(
            "/repo/a.py".to_string(),
            KeyInfo {
                key_string: "1A".to_string(),
                norm_path: "/repo/a.py".to_string(),
                parent_path: None,
                tier: 1,
                is_directory: false,
            },
        );
        map.insert(
            "/repo/b.py".to_string(),
            KeyInfo {
                key_string: "1B".to_string(),
                norm_path: "/repo/b.py".to_string(),
                parent_path: None,
                tier: 1,
                is_directory: false,
            },
        );
        let sim = similarity_between_keys(
            "1A",
            "1B",
            &map,
            &root.path().join(".embeddings"),
            Path::new("/repo"),
        )
        .unwrap();
        assert_eq!(sim, 0.0);
    }
}
