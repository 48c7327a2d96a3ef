use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use depmap_core::{ConfigManager, Settings};
use depmap_keys::ExclusionSet;

/// Resolved, ready-to-use locations and settings for one CLI invocation.
/// Bundling these here keeps every subcommand from re-deriving the same
/// handful of paths off `Settings`.
pub struct AppContext {
    pub settings: Settings,
    pub project_root: PathBuf,
    pub memory_dir: PathBuf,
    pub embeddings_dir: PathBuf,
    pub backups_dir: PathBuf,
}

impl AppContext {
    pub fn load(root_override: Option<&str>) -> Result<Self> {
        let project_root = root_override
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let config_dir = ConfigManager::default_config_dir(&project_root);
        let manager = ConfigManager::load(&config_dir).context("failed to load configuration")?;
        let mut settings = manager.settings().clone();

        if root_override.is_some() {
            settings.project_root = project_root.clone();
        }
        let project_root = if settings.project_root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            settings.project_root.clone()
        };
        let memory_dir = project_root.join(&settings.memory_dir);

        Ok(Self {
            embeddings_dir: memory_dir.join("embeddings"),
            backups_dir: memory_dir.join("backups"),
            memory_dir,
            project_root,
            settings,
        })
    }

    pub fn main_tracker_path(&self) -> PathBuf {
        depmap_aggregate::main_tracker_path(
            &self.project_root.to_string_lossy(),
            &self.settings.memory_dir.to_string_lossy(),
            &self.settings.tracker.main_tracker_filename,
        )
    }

    pub fn doc_tracker_path(&self) -> PathBuf {
        depmap_aggregate::doc_tracker_path(
            &self.project_root.to_string_lossy(),
            &self.settings.memory_dir.to_string_lossy(),
            &self.settings.tracker.doc_tracker_filename,
        )
    }

    /// Resolves a `--tracker` argument: the literal names `main`/`doc`, or
    /// any other string is treated as a direct path to a mini-tracker (or
    /// any other tracker file).
    pub fn resolve_tracker_path(&self, tracker: &str) -> PathBuf {
        match tracker {
            "main" => self.main_tracker_path(),
            "doc" => self.doc_tracker_path(),
            other => PathBuf::from(other),
        }
    }

    pub fn exclusion_set(&self) -> ExclusionSet {
        ExclusionSet::new(
            self.settings.keys.excluded_dirs.iter().cloned().collect(),
            self.settings.keys.excluded_extensions.iter().cloned().collect(),
            self.settings
                .keys
                .excluded_paths
                .iter()
                .map(|p| depmap_core::path::join_paths(&self.project_root.to_string_lossy(), p))
                .collect(),
            self.settings.keys.excluded_file_patterns.clone(),
        )
    }

    /// Project-relative root directories (code + doc) resolved to absolute,
    /// normalized paths, for the walk that feeds `generate_keys`.
    pub fn root_paths(&self) -> Vec<PathBuf> {
        self.settings
            .code_root_directories
            .iter()
            .chain(self.settings.doc_root_directories.iter())
            .map(|rel| self.project_root.join(rel))
            .filter(|p| p.exists())
            .collect()
    }
}

pub fn init_logging(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

pub fn as_abs(project_root: &Path, rel_or_abs: &str) -> PathBuf {
    let candidate = Path::new(rel_or_abs);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        project_root.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_abs_passes_through_an_absolute_path() {
        let root = Path::new("/repo");
        assert_eq!(as_abs(root, "/elsewhere/file.rs"), PathBuf::from("/elsewhere/file.rs"));
    }

    #[test]
    fn as_abs_joins_a_relative_path_onto_the_root() {
        let root = Path::new("/repo");
        assert_eq!(as_abs(root, "src/lib.rs"), PathBuf::from("/repo/src/lib.rs"));
    }

    #[test]
    fn resolve_tracker_path_recognizes_main_and_doc_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let ctx = AppContext::load(Some(root.as_str())).unwrap();
        assert_eq!(ctx.resolve_tracker_path("main"), ctx.main_tracker_path());
        assert_eq!(ctx.resolve_tracker_path("doc"), ctx.doc_tracker_path());
        assert_eq!(ctx.resolve_tracker_path("some/other.md"), PathBuf::from("some/other.md"));
    }

    #[test]
    fn exclusion_set_resolves_excluded_paths_relative_to_the_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let mut ctx = AppContext::load(Some(root.as_str())).unwrap();
        ctx.settings.keys.excluded_paths = vec!["vendor".to_string()];
        let exclusions = ctx.exclusion_set();
        assert!(exclusions.excluded_path_prefixes.iter().any(|p| p.ends_with("vendor")));
    }
}
