use anyhow::{bail, Context, Result};
use depmap_core::{ConfigManager, Settings};
use serde_json::Value;

use crate::context::AppContext;

/// Implements `update-config <dotted.key> <value>`: round-trips `Settings`
/// through `serde_json::Value` so a single dotted path can be overwritten
/// without hand-rolling a setter per field, then persists to `local.toml`
/// the way `ConfigManager::persist_local` already does for the rest of the
/// CLI.
pub fn update_config(manager: &mut ConfigManager, dotted_key: &str, raw_value: &str) -> Result<Settings> {
    let mut value = serde_json::to_value(manager.settings()).context("failed to serialize current settings")?;
    let new_value = parse_value(raw_value);
    set_by_path(&mut value, dotted_key, new_value)?;

    let settings: Settings = serde_json::from_value(value).context("updated settings no longer validate")?;
    manager.set_settings(settings);
    manager.persist_local().context("failed to persist updated settings")?;
    Ok(manager.settings().clone())
}

/// Implements `reset-config`: drops back to compiled-in defaults and
/// persists them, the same path `init_user_config_dir` uses for a fresh
/// project.
pub fn reset_config(manager: &mut ConfigManager) -> Result<Settings> {
    manager.set_settings(Settings::default());
    manager.persist_local().context("failed to persist reset settings")?;
    Ok(manager.settings().clone())
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_by_path(root: &mut Value, dotted_key: &str, new_value: Value) -> Result<()> {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let Some((last, ancestors)) = segments.split_last() else {
        bail!("empty config key");
    };
    let mut cursor = root;
    for segment in ancestors {
        cursor = cursor
            .get_mut(*segment)
            .with_context(|| format!("unknown config section '{segment}' in '{dotted_key}'"))?;
    }
    let object = cursor
        .as_object_mut()
        .with_context(|| format!("'{dotted_key}' does not address an object field"))?;
    if !object.contains_key(*last) {
        bail!("unknown config key '{dotted_key}'");
    }
    object.insert(last.to_string(), new_value);
    Ok(())
}

#[derive(Debug, serde::Serialize)]
pub struct ClearCachesReport {
    pub embeddings_metadata_removed: bool,
    pub vectors_removed: usize,
    pub backups_removed: usize,
}

/// Implements `clear-caches`. `Cache` itself lives only inside a single
/// `analyze-project` run, so there's nothing in-process to drop between CLI
/// invocations; what persists across runs is the embeddings store and the
/// tracker backup history, so those are what this command actually clears.
pub fn clear_caches(ctx: &AppContext) -> Result<ClearCachesReport> {
    let metadata_path = depmap_embed::persist::metadata_path(&ctx.embeddings_dir);
    let embeddings_metadata_removed = metadata_path.is_file();
    if embeddings_metadata_removed {
        std::fs::remove_file(&metadata_path).context("failed to remove embeddings metadata")?;
    }

    let mut vectors_removed = 0;
    if ctx.embeddings_dir.is_dir() {
        remove_matching_files(&ctx.embeddings_dir, "npy", &mut vectors_removed)?;
    }

    let mut backups_removed = 0;
    if ctx.backups_dir.is_dir() {
        for entry in std::fs::read_dir(&ctx.backups_dir).context("failed to list backups directory")? {
            let entry = entry.context("failed to read a backups directory entry")?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                std::fs::remove_file(entry.path()).context("failed to remove a tracker backup")?;
                backups_removed += 1;
            }
        }
    }

    Ok(ClearCachesReport { embeddings_metadata_removed, vectors_removed, backups_removed })
}

/// Recursively deletes every file under `dir` whose extension is `ext`,
/// leaving the mirrored directory tree itself in place (the next
/// `analyze-project` run repopulates it).
fn remove_matching_files(dir: &std::path::Path, ext: &str, removed: &mut usize) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let entry = entry.context("failed to read a directory entry")?;
        let path = entry.path();
        if path.is_dir() {
            remove_matching_files(&path, ext, removed)?;
        } else if path.extension().is_some_and(|e| e == ext) {
            std::fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
            *removed += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_by_path_updates_a_nested_field() {
        let mut value = json!({"workers": {"max_workers": 32}, "keys": {"max_siblings": 26}});
        set_by_path(&mut value, "workers.max_workers", json!(8)).unwrap();
        assert_eq!(value["workers"]["max_workers"], 8);
    }

    #[test]
    fn set_by_path_rejects_unknown_keys() {
        let mut value = json!({"workers": {"max_workers": 32}});
        assert!(set_by_path(&mut value, "workers.does_not_exist", json!(1)).is_err());
    }

    #[test]
    fn parse_value_falls_back_to_string_for_non_json() {
        assert_eq!(parse_value("info"), Value::String("info".to_string()));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
    }
}
