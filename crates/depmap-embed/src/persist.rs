use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use depmap_core::path::normalize_path;
use depmap_core::{DepMapError, Result};
use serde::{Deserialize, Serialize};

pub const METADATA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMeta {
    pub path: String,
    pub mtime: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub version: String,
    pub model: String,
    pub keys: HashMap<String, KeyMeta>,
}

impl EmbeddingMetadata {
    pub fn new(model: &str) -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            model: model.to_string(),
            keys: HashMap::new(),
        }
    }
}

pub fn metadata_path(embeddings_dir: &Path) -> PathBuf {
    embeddings_dir.join("metadata.json")
}

/// Loads metadata, returning `None` (triggering full regeneration) on a
/// missing file, unreadable JSON, or a version stamp other than
/// [`METADATA_VERSION`].
pub fn load_metadata(path: &Path) -> Option<EmbeddingMetadata> {
    let content = fs::read_to_string(path).ok()?;
    let metadata: EmbeddingMetadata = serde_json::from_str(&content).ok()?;
    if metadata.version != METADATA_VERSION {
        return None;
    }
    Some(metadata)
}

pub fn save_metadata(path: &Path, metadata: &EmbeddingMetadata) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(metadata)?;
    fs::write(path, content)?;
    Ok(())
}

/// Mirrors `abs_file_path`'s position relative to `project_root` underneath
/// `embeddings_dir`, appending a `.npy` suffix. The suffix names the
/// convention (one vector file per source file) rather than NumPy's binary
/// layout; the payload is a flat little-endian `f32` array written by
/// [`save_vector`].
pub fn mirrored_vector_path(embeddings_dir: &Path, project_root: &Path, abs_file_path: &Path) -> Result<PathBuf> {
    let relative = abs_file_path.strip_prefix(project_root).map_err(|_| {
        DepMapError::Config(format!(
            "{} is not under project root {}",
            abs_file_path.display(),
            project_root.display()
        ))
    })?;
    let mut joined = embeddings_dir.join(relative).into_os_string();
    joined.push(".npy");
    Ok(PathBuf::from(joined))
}

pub fn save_vector(path: &Path, vector: &[f32]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_vector(path: &Path) -> Result<Vec<f32>> {
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(DepMapError::TrackerParse {
            path: normalize_path(path),
            reason: "embedding vector file length is not a multiple of 4 bytes".to_string(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn vector_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.py.npy");
        let v = vec![0.5f32, -1.25, 3.0];
        save_vector(&path, &v).unwrap();
        let loaded = load_vector(&path).unwrap();
        assert_eq!(loaded, v);
    }

    #[test]
    fn metadata_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = metadata_path(dir.path());
        let mut metadata = EmbeddingMetadata::new("hashing-ngram-v1");
        metadata.keys.insert(
            "1A1".to_string(),
            KeyMeta {
                path: "/repo/src/a.py".to_string(),
                mtime: 1234.5,
            },
        );
        save_metadata(&path, &metadata).unwrap();
        let loaded = load_metadata(&path).unwrap();
        assert_eq!(loaded.model, "hashing-ngram-v1");
        assert_eq!(loaded.keys["1A1"].path, "/repo/src/a.py");
    }

    #[test]
    fn mismatched_version_triggers_none() {
        let dir = tempdir().unwrap();
        let path = metadata_path(dir.path());
        fs::write(&path, r#"{"version":"0.9","model":"x","keys":{}}"#).unwrap();
        assert!(load_metadata(&path).is_none());
    }

    #[test]
    fn mirrored_path_appends_npy_suffix() {
        let root = Path::new("/repo");
        let embeddings_dir = Path::new("/repo/.embeddings");
        let file = Path::new("/repo/src/a.py");
        let mirrored = mirrored_vector_path(embeddings_dir, root, file).unwrap();
        assert_eq!(mirrored, PathBuf::from("/repo/.embeddings/src/a.py.npy"));
    }
}
