use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use depmap_core::{DepMapError, Result};

const DEFAULT_BACKUPS_TO_KEEP: usize = 2;

fn io_err(path: &Path, source: std::io::Error) -> DepMapError {
    DepMapError::IoAt {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// Equivalent to [`backup_tracker_file_keeping`] with the default retention
/// of two backups.
pub fn backup_tracker_file(tracker_path: &Path, backup_dir: &Path) -> Result<Option<PathBuf>> {
    backup_tracker_file_keeping(tracker_path, backup_dir, DEFAULT_BACKUPS_TO_KEEP)
}

/// Copies `tracker_path` to a timestamped sibling `<stem>_backup_<stamp>.<ext>`
/// inside `backup_dir`, then deletes all but the `keep` newest backups
/// sharing that stem. A missing source file is a no-op, not an error.
pub fn backup_tracker_file_keeping(tracker_path: &Path, backup_dir: &Path, keep: usize) -> Result<Option<PathBuf>> {
    if !tracker_path.is_file() {
        debug!(path = %tracker_path.display(), "nothing to back up, source tracker does not exist");
        return Ok(None);
    }

    std::fs::create_dir_all(backup_dir).map_err(|e| io_err(backup_dir, e))?;

    let stem = tracker_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tracker")
        .to_string();
    let ext = tracker_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("md")
        .to_string();

    let stamp = Local::now().format("%Y%m%d_%H%M%S_%f").to_string();
    let backup_name = format!("{stem}_backup_{stamp}.{ext}");
    let backup_path = backup_dir.join(&backup_name);

    std::fs::copy(tracker_path, &backup_path).map_err(|e| io_err(&backup_path, e))?;
    debug!(backup = %backup_path.display(), "wrote tracker backup");

    prune_old_backups(backup_dir, &stem, &ext, keep)?;
    Ok(Some(backup_path))
}

fn prune_old_backups(backup_dir: &Path, stem: &str, ext: &str, keep: usize) -> Result<()> {
    let prefix = format!("{stem}_backup_");
    let suffix = format!(".{ext}");

    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(backup_dir).map_err(|e| io_err(backup_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(backup_dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !name.starts_with(&prefix) || !name.ends_with(&suffix) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not stat backup candidate, skipping");
                continue;
            }
        };
        let modified = metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        candidates.push((modified, path));
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, stale) in candidates.into_iter().skip(keep) {
        if let Err(e) = std::fs::remove_file(&stale) {
            warn!(path = %stale.display(), error = %e, "failed to remove stale tracker backup");
        } else {
            debug!(path = %stale.display(), "removed stale tracker backup");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let result = backup_tracker_file(&dir.path().join("nope.md"), dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn creates_a_backup_copy() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = dir.path().join("main_tracker.md");
        std::fs::write(&tracker, "content").unwrap();

        let backup_dir = dir.path().join("backups");
        let backup = backup_tracker_file(&tracker, &backup_dir).unwrap().unwrap();
        assert!(backup.is_file());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "content");
    }

    #[test]
    fn keeps_only_two_newest_backups() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = dir.path().join("main_tracker.md");
        let backup_dir = dir.path().join("backups");
        std::fs::create_dir_all(&backup_dir).unwrap();

        for i in 0..4 {
            std::fs::write(&tracker, format!("content {i}")).unwrap();
            backup_tracker_file(&tracker, &backup_dir).unwrap();
        }

        let remaining = std::fs::read_dir(&backup_dir).unwrap().count();
        assert_eq!(remaining, 2);
    }

    #[test]
    fn keeping_respects_a_custom_retention_count() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = dir.path().join("main_tracker.md");
        let backup_dir = dir.path().join("backups");
        std::fs::create_dir_all(&backup_dir).unwrap();

        for i in 0..5 {
            std::fs::write(&tracker, format!("content {i}")).unwrap();
            backup_tracker_file_keeping(&tracker, &backup_dir, 4).unwrap();
        }

        let remaining = std::fs::read_dir(&backup_dir).unwrap().count();
        assert_eq!(remaining, 4);
    }
}
