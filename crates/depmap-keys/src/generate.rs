use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use depmap_core::path::normalize_path;
use depmap_core::{DepMapError, GlobalKeyMap, KeyInfo, Result};

use crate::validate::validate_key;

const ASCII_A_UPPER: u8 = b'A';
const ASCII_Z_UPPER: u8 = b'Z';
const ASCII_A_LOWER: u8 = b'a';
const ASCII_Z_LOWER: u8 = b'z';

static SUBDIR_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9]\d*[A-Z][a-z]$").unwrap());
static TIER_DIR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([1-9]\d*)([A-Z])").unwrap());

/// Exclusion configuration for a generation run, resolved once up front so
/// recursion never needs to consult configuration itself.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    pub excluded_dir_names: HashSet<String>,
    pub excluded_extensions: HashSet<String>,
    pub excluded_path_prefixes: HashSet<String>,
    pub excluded_file_patterns: Vec<String>,
    file_pattern_globset: Option<GlobSet>,
}

impl ExclusionSet {
    /// Builds the `excluded_file_patterns` globs once up front; invalid
    /// patterns are logged and skipped rather than failing the whole run.
    pub fn new(
        excluded_dir_names: HashSet<String>,
        excluded_extensions: HashSet<String>,
        excluded_path_prefixes: HashSet<String>,
        excluded_file_patterns: Vec<String>,
    ) -> Self {
        let file_pattern_globset = build_globset(&excluded_file_patterns);
        Self {
            excluded_dir_names,
            excluded_extensions,
            excluded_path_prefixes,
            excluded_file_patterns,
            file_pattern_globset,
        }
    }

    fn path_excluded(&self, norm_path: &str) -> bool {
        self.excluded_path_prefixes
            .iter()
            .any(|prefix| norm_path.starts_with(prefix.as_str()))
    }

    fn extension_excluded(&self, file_name: &str) -> bool {
        match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => self.excluded_extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }

    pub fn pattern_excluded(&self, norm_path: &str) -> bool {
        self.file_pattern_globset.as_ref().is_some_and(|set| set.is_match(norm_path))
    }
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = false;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                added = true;
            }
            Err(e) => warn!("invalid glob pattern '{pattern}': {e}"),
        }
    }
    if added {
        builder.build().ok()
    } else {
        None
    }
}

fn parse_tier(key_string: &str) -> Option<u32> {
    TIER_DIR_PATTERN
        .captures(key_string)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Explicit per-level recursion state: direct-file counter, direct-subdir
/// letter counter, and promoted-subdirectory letter counter. Threaded
/// through calls by value rather than captured from an enclosing scope, so
/// there is no shared mutable state across sibling recursions.
struct ScopeCounters {
    file_counter: u32,
    subdir_letter_ord: u8,
    promoted_dir_ord: u8,
}

impl ScopeCounters {
    fn new() -> Self {
        Self {
            file_counter: 1,
            subdir_letter_ord: ASCII_A_LOWER,
            promoted_dir_ord: ASCII_A_UPPER,
        }
    }
}

/// Generates hierarchical, contextual keys for every file and directory
/// reachable from `root_paths`, honoring tier promotion for directories
/// nested beneath an already-keyed subdirectory.
pub fn generate_keys(
    root_paths: &[PathBuf],
    exclusions: &ExclusionSet,
) -> Result<(GlobalKeyMap, Vec<KeyInfo>)> {
    for root in root_paths {
        if !root.exists() {
            return Err(DepMapError::Config(format!(
                "root path '{}' does not exist",
                root.display()
            )));
        }
    }

    let mut map: GlobalKeyMap = GlobalKeyMap::new();
    let mut new_keys: Vec<KeyInfo> = Vec::new();
    let mut top_level_dir_count: u32 = 0;

    for root in root_paths {
        process_directory(root, exclusions, None, &mut map, &mut new_keys, &mut top_level_dir_count)?;
    }

    Ok((map, new_keys))
}

fn process_directory(
    dir_path: &Path,
    exclusions: &ExclusionSet,
    parent_info: Option<&KeyInfo>,
    map: &mut GlobalKeyMap,
    new_keys: &mut Vec<KeyInfo>,
    top_level_dir_count: &mut u32,
) -> Result<()> {
    let norm_dir_path = normalize_path(dir_path);

    if exclusions.path_excluded(&norm_dir_path) || exclusions.pattern_excluded(&norm_dir_path) {
        debug!(path = %norm_dir_path, "skipping excluded directory");
        return Ok(());
    }

    let current_dir_key_info = match parent_info {
        None => {
            let dir_letter = (ASCII_A_UPPER + *top_level_dir_count as u8) as char;
            let key_str = format!("1{dir_letter}");
            let info = KeyInfo {
                key_string: key_str,
                norm_path: norm_dir_path.clone(),
                parent_path: None,
                tier: 1,
                is_directory: true,
            };
            *top_level_dir_count += 1;
            if !map.contains_key(&norm_dir_path) {
                map.insert(norm_dir_path.clone(), info.clone());
                new_keys.push(info.clone());
            }
            map.get(&norm_dir_path).cloned().unwrap_or(info)
        }
        Some(_) => map.get(&norm_dir_path).cloned().ok_or_else(|| {
            DepMapError::KeyInvariantViolation(format!(
                "KeyInfo missing for supposedly processed directory: {norm_dir_path}"
            ))
        })?,
    };

    let mut entries: Vec<_> = std::fs::read_dir(dir_path)
        .map_err(|source| DepMapError::IoAt {
            path: dir_path.to_string_lossy().to_string(),
            source,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    entries.sort();

    let mut counters = ScopeCounters::new();
    let is_parent_key_a_subdir = SUBDIR_KEY_PATTERN.is_match(&current_dir_key_info.key_string);

    for item_name in entries {
        let item_path = dir_path.join(&item_name);
        let norm_item_path = normalize_path(&item_path);

        if exclusions.path_excluded(&norm_item_path) || exclusions.pattern_excluded(&norm_item_path) {
            continue;
        }
        if exclusions.excluded_dir_names.contains(&item_name) || item_name == ".gitkeep" {
            continue;
        }
        if item_name.ends_with("_module.md") {
            continue;
        }

        let is_dir = item_path.is_dir();
        let is_file = item_path.is_file();
        if !is_dir && !is_file {
            continue;
        }
        if is_file && exclusions.extension_excluded(&item_name) {
            continue;
        }

        let needs_promotion = is_parent_key_a_subdir && is_dir;

        let item_key_info = if needs_promotion {
            let parent_tier = parse_tier(&current_dir_key_info.key_string).ok_or_else(|| {
                DepMapError::KeyInvariantViolation(format!(
                    "could not parse parent key '{}' during promotion",
                    current_dir_key_info.key_string
                ))
            })?;
            let new_tier = parent_tier + 1;

            if counters.promoted_dir_ord > ASCII_Z_UPPER {
                return Err(DepMapError::KeyExhaustion {
                    parent_key: current_dir_key_info.key_string.clone(),
                    path: norm_item_path,
                    suggestion:
                        "reduce the number of directly-promoted subdirectories at this level, or add the offending path to excluded_dirs"
                            .to_string(),
                });
            }
            let new_dir_letter = counters.promoted_dir_ord as char;
            counters.promoted_dir_ord += 1;
            let key_str = format!("{new_tier}{new_dir_letter}");

            KeyInfo {
                key_string: key_str,
                norm_path: norm_item_path.clone(),
                parent_path: Some(norm_dir_path.clone()),
                tier: new_tier,
                is_directory: true,
            }
        } else {
            let base_key_part = current_dir_key_info.key_string.clone();
            let tier = current_dir_key_info.tier;

            let key_str = if is_dir {
                if counters.subdir_letter_ord > ASCII_Z_LOWER {
                    return Err(DepMapError::KeyExhaustion {
                        parent_key: base_key_part.clone(),
                        path: norm_item_path,
                        suggestion:
                            "reduce the number of direct subdirectories at this level, or add the offending path to excluded_dirs"
                                .to_string(),
                    });
                }
                let subdir_letter = counters.subdir_letter_ord as char;
                counters.subdir_letter_ord += 1;
                format!("{base_key_part}{subdir_letter}")
            } else {
                let key = format!("{base_key_part}{}", counters.file_counter);
                counters.file_counter += 1;
                key
            };

            KeyInfo {
                key_string: key_str,
                norm_path: norm_item_path.clone(),
                parent_path: Some(norm_dir_path.clone()),
                tier,
                is_directory: is_dir,
            }
        };

        if !validate_key(&item_key_info.key_string) {
            warn!(key = %item_key_info.key_string, path = %norm_item_path, "generated key failed validation, skipping");
            continue;
        }

        if map.contains_key(&norm_item_path) {
            warn!(path = %norm_item_path, "path already has an assigned key, overwriting");
        }
        map.insert(norm_item_path.clone(), item_key_info.clone());
        new_keys.push(item_key_info.clone());

        if is_dir {
            process_directory(&item_path, exclusions, Some(&item_key_info), map, new_keys, top_level_dir_count)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tree(root: &Path) {
        fs::create_dir_all(root.join("src/sub")).unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("src/sub/mod.rs"), "").unwrap();
        fs::create_dir_all(root.join("src/sub/deep")).unwrap();
        fs::write(root.join("src/sub/deep/leaf.rs"), "").unwrap();
    }

    #[test]
    fn assigns_top_level_and_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        let exclusions = ExclusionSet::default();
        let (map, _new_keys) =
            generate_keys(&[dir.path().to_path_buf()], &exclusions).unwrap();

        let root_key = &map.get(&normalize_path(dir.path())).unwrap().key_string;
        assert_eq!(root_key, "1A");

        let src_key = &map
            .get(&normalize_path(dir.path().join("src")))
            .unwrap()
            .key_string;
        assert_eq!(src_key, "1Aa");

        let lib_key = &map
            .get(&normalize_path(dir.path().join("src/lib.rs")))
            .unwrap()
            .key_string;
        assert_eq!(lib_key, "1Aa1");

        // "sub" is a subdirectory-of-a-subdir, so it gets promoted to tier 2.
        let sub_key = &map
            .get(&normalize_path(dir.path().join("src/sub")))
            .unwrap()
            .key_string;
        assert_eq!(sub_key, "2A");
    }

    #[test]
    fn sibling_limit_raises_key_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..27 {
            fs::create_dir_all(dir.path().join(format!("dir{i:02}"))).unwrap();
        }
        let exclusions = ExclusionSet::default();
        let result = generate_keys(&[dir.path().to_path_buf()], &exclusions);
        assert!(matches!(result, Err(DepMapError::KeyExhaustion { .. })));
    }

    #[test]
    fn excluded_dir_names_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("keep.rs"), "").unwrap();
        let mut exclusions = ExclusionSet::default();
        exclusions.excluded_dir_names.insert(".git".to_string());
        let (map, _) = generate_keys(&[dir.path().to_path_buf()], &exclusions).unwrap();
        assert!(!map.contains_key(&normalize_path(dir.path().join(".git"))));
        assert!(map.contains_key(&normalize_path(dir.path().join("keep.rs"))));
    }

    #[test]
    fn excluded_file_patterns_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.rs"), "").unwrap();
        fs::write(dir.path().join("schema.generated.rs"), "").unwrap();
        let exclusions = ExclusionSet::new(
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
            vec!["**/*.generated.rs".to_string()],
        );
        let (map, _) = generate_keys(&[dir.path().to_path_buf()], &exclusions).unwrap();
        assert!(map.contains_key(&normalize_path(dir.path().join("keep.rs"))));
        assert!(!map.contains_key(&normalize_path(dir.path().join("schema.generated.rs"))));
    }
}
