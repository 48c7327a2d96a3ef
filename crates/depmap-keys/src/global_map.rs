use std::path::{Path, PathBuf};

use tracing::info;

use depmap_core::{DepMapError, GlobalKeyMap, Result};

pub const GLOBAL_KEY_MAP_FILENAME: &str = "global_key_map.json";
pub const OLD_GLOBAL_KEY_MAP_FILENAME: &str = "global_key_map_old.json";

fn io_err(path: &Path, source: std::io::Error) -> DepMapError {
    DepMapError::IoAt {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// Rotates the current global key map to the "old" slot and writes `map` as
/// the new current map. Mirrors `generate_keys`'s save step in
/// `key_manager.py`: rename current -> old (best effort), then write new.
pub fn save_global_key_map(dir: &Path, map: &GlobalKeyMap) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let current_path = dir.join(GLOBAL_KEY_MAP_FILENAME);
    let old_path = dir.join(OLD_GLOBAL_KEY_MAP_FILENAME);

    if current_path.is_file() {
        std::fs::rename(&current_path, &old_path).map_err(|e| io_err(&current_path, e))?;
        info!("rotated {} -> {}", GLOBAL_KEY_MAP_FILENAME, OLD_GLOBAL_KEY_MAP_FILENAME);
    }

    let json = serde_json::to_string_pretty(map)?;
    std::fs::write(&current_path, json).map_err(|e| io_err(&current_path, e))?;
    info!(entries = map.len(), "saved global key map");
    Ok(())
}

pub fn load_global_key_map(dir: &Path) -> Result<Option<GlobalKeyMap>> {
    load_map_at(&dir.join(GLOBAL_KEY_MAP_FILENAME))
}

pub fn load_old_global_key_map(dir: &Path) -> Result<Option<GlobalKeyMap>> {
    load_map_at(&dir.join(OLD_GLOBAL_KEY_MAP_FILENAME))
}

fn load_map_at(path: &Path) -> Result<Option<GlobalKeyMap>> {
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let map: GlobalKeyMap = serde_json::from_str(&contents)?;
    Ok(Some(map))
}

/// Directory the global key map files live alongside, analogous to
/// `key_manager.py` saving next to the script: here, the project's memory
/// directory.
pub fn global_map_dir(memory_dir: impl Into<PathBuf>) -> PathBuf {
    memory_dir.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;

    fn sample_map() -> GlobalKeyMap {
        let mut map = GlobalKeyMap::new();
        map.insert(
            "/repo".to_string(),
            KeyInfo {
                key_string: "1A".to_string(),
                norm_path: "/repo".to_string(),
                parent_path: None,
                tier: 1,
                is_directory: true,
            },
        );
        map
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let map = sample_map();
        save_global_key_map(dir.path(), &map).unwrap();
        let loaded = load_global_key_map(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn second_save_rotates_old_map() {
        let dir = tempfile::tempdir().unwrap();
        let first = sample_map();
        save_global_key_map(dir.path(), &first).unwrap();

        let mut second = sample_map();
        second.insert(
            "/repo/extra".to_string(),
            KeyInfo {
                key_string: "1A1".to_string(),
                norm_path: "/repo/extra".to_string(),
                parent_path: Some("/repo".to_string()),
                tier: 1,
                is_directory: false,
            },
        );
        save_global_key_map(dir.path(), &second).unwrap();

        let old = load_old_global_key_map(dir.path()).unwrap().unwrap();
        assert_eq!(old, first);
        let current = load_global_key_map(dir.path()).unwrap().unwrap();
        assert_eq!(current, second);
    }

    #[test]
    fn missing_map_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_global_key_map(dir.path()).unwrap().is_none());
    }
}
