use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use depmap_core::path::normalize_path;
use depmap_core::{GlobalKeyMap, Result};
use depmap_keys::ExclusionSet;
use tracing::{debug, info, warn};

use crate::embedder::Embedder;
use crate::persist::{self, EmbeddingMetadata, KeyMeta};
use crate::preprocess::preprocess_for_embedding;

/// Tuning for one `generate_embeddings` pass. `max_file_bytes` and the
/// exclusion set come from configuration, not hard-coded, so deployments can
/// widen or narrow what gets embedded without touching this crate.
pub struct EmbeddingGenerationConfig {
    pub embeddings_dir: PathBuf,
    pub project_root: PathBuf,
    pub max_file_bytes: u64,
    pub force: bool,
    pub exclusions: ExclusionSet,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmbeddingGenerationReport {
    pub generated: usize,
    pub skipped_mtime_match: usize,
    pub skipped_binary: usize,
    pub skipped_excluded: usize,
    pub skipped_empty_after_preprocess: usize,
    pub errors: Vec<(String, String)>,
}

impl EmbeddingGenerationReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(1024).any(|b| *b == 0)
}

fn is_excluded(norm_path: &str, exclusions: &ExclusionSet) -> bool {
    let file_name = Path::new(norm_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    if file_name.starts_with('.') {
        return true;
    }
    if exclusions
        .excluded_path_prefixes
        .iter()
        .any(|prefix| norm_path.starts_with(prefix.as_str()))
    {
        return true;
    }
    if exclusions.pattern_excluded(norm_path) {
        return true;
    }
    let segments: Vec<&str> = norm_path.split('/').collect();
    if segments
        .iter()
        .any(|segment| exclusions.excluded_dir_names.contains(*segment))
    {
        return true;
    }
    match Path::new(norm_path).extension().and_then(|e| e.to_str()) {
        Some(ext) => exclusions.excluded_extensions.contains(&ext.to_lowercase()),
        None => false,
    }
}

fn mtime_seconds(path: &Path) -> Option<f64> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let duration = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(duration.as_secs_f64())
}

/// Generates or refreshes embeddings for every non-directory entry of
/// `path_to_key_info`. Regenerates a file's vector when its `.npy` mirror is
/// missing, `force` is set, or the file's mtime no longer matches the
/// recorded metadata; otherwise the existing vector is left untouched and
/// the key is carried forward into the rewritten metadata.
pub fn generate_embeddings(
    path_to_key_info: &GlobalKeyMap,
    embedder: &dyn Embedder,
    config: &EmbeddingGenerationConfig,
) -> Result<EmbeddingGenerationReport> {
    let mut report = EmbeddingGenerationReport::default();
    if path_to_key_info.is_empty() {
        warn!("path_to_key_info map is empty; nothing to embed");
        return Ok(report);
    }

    fs::create_dir_all(&config.embeddings_dir)?;
    let metadata_file = persist::metadata_path(&config.embeddings_dir);
    let existing = if config.force {
        None
    } else {
        persist::load_metadata(&metadata_file)
    };
    let existing_keys: HashMap<String, KeyMeta> = existing.map(|m| m.keys).unwrap_or_default();

    let mut valid_keys_in_metadata: HashMap<String, KeyMeta> = HashMap::new();

    for key_info in path_to_key_info.values() {
        if key_info.is_directory {
            continue;
        }
        let key_string = key_info.key_string.clone();
        let abs_path = PathBuf::from(&key_info.norm_path);

        if !abs_path.is_file() {
            debug!(path = %key_info.norm_path, "skipping missing file");
            continue;
        }
        if is_excluded(&key_info.norm_path, &config.exclusions) {
            report.skipped_excluded += 1;
            continue;
        }

        let current_mtime = match mtime_seconds(&abs_path) {
            Some(m) => m,
            None => {
                report
                    .errors
                    .push((key_info.norm_path.clone(), "failed to read mtime".to_string()));
                continue;
            }
        };

        let vector_path = persist::mirrored_vector_path(&config.embeddings_dir, &config.project_root, &abs_path)?;
        let mtime_matches = existing_keys
            .get(&key_string)
            .map(|meta| (meta.mtime - current_mtime).abs() < f64::EPSILON)
            .unwrap_or(false);

        let should_generate = config.force || !vector_path.exists() || !mtime_matches;

        if !should_generate {
            report.skipped_mtime_match += 1;
            valid_keys_in_metadata.insert(
                key_string,
                KeyMeta {
                    path: normalize_path(&abs_path),
                    mtime: current_mtime,
                },
            );
            continue;
        }

        let raw = match fs::read(&abs_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                report.errors.push((key_info.norm_path.clone(), e.to_string()));
                continue;
            }
        };
        if raw.len() as u64 >= config.max_file_bytes {
            debug!(path = %key_info.norm_path, size = raw.len(), "skipping oversized file");
            continue;
        }
        if is_binary(&raw) {
            report.skipped_binary += 1;
            continue;
        }
        let content = match String::from_utf8(raw) {
            Ok(s) => s,
            Err(_) => {
                report.skipped_binary += 1;
                continue;
            }
        };

        let processed = preprocess_for_embedding(&key_info.norm_path, &content);
        if processed.trim().is_empty() {
            report.skipped_empty_after_preprocess += 1;
            continue;
        }

        match embedder.encode(&processed) {
            Ok(vector) => {
                if let Err(e) = persist::save_vector(&vector_path, &vector) {
                    report.errors.push((key_info.norm_path.clone(), e.to_string()));
                    continue;
                }
                report.generated += 1;
                valid_keys_in_metadata.insert(
                    key_string,
                    KeyMeta {
                        path: normalize_path(&abs_path),
                        mtime: current_mtime,
                    },
                );
            }
            Err(e) => {
                report.errors.push((key_info.norm_path.clone(), e.to_string()));
            }
        }
    }

    if valid_keys_in_metadata.is_empty() {
        warn!("no files produced embedding metadata; leaving existing metadata untouched");
    } else {
        let metadata = EmbeddingMetadata {
            version: persist::METADATA_VERSION.to_string(),
            model: embedder.name().to_string(),
            keys: valid_keys_in_metadata,
        };
        persist::save_metadata(&metadata_file, &metadata)?;
    }

    info!(
        generated = report.generated,
        skipped_mtime_match = report.skipped_mtime_match,
        skipped_binary = report.skipped_binary,
        errors = report.errors.len(),
        "embedding generation pass complete"
    );
    Ok(report)
}
