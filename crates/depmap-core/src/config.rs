use crate::error::{DepMapError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Key-generation tuning (tier promotion, sibling limits).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct KeySettings {
    /// Max siblings before a `KeyExhaustion` error (26 letters, spec §4.1).
    pub max_siblings: u32,
    pub excluded_dirs: Vec<String>,
    pub excluded_extensions: Vec<String>,
    /// Project-relative paths excluded wholesale, matched as a prefix.
    pub excluded_paths: Vec<String>,
    /// Glob patterns (e.g. `**/*.generated.rs`) matched against the
    /// normalized path of every walked file or directory.
    pub excluded_file_patterns: Vec<String>,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            max_siblings: 26,
            excluded_dirs: vec![
                ".git".into(),
                "node_modules".into(),
                "target".into(),
                "__pycache__".into(),
                ".venv".into(),
            ],
            excluded_extensions: vec![
                "pyc".into(),
                "lock".into(),
                "log".into(),
            ],
            excluded_paths: Vec::new(),
            excluded_file_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GridSettings {
    pub run_length_threshold: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            run_length_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrackerSettings {
    pub backups_to_keep: usize,
    pub main_tracker_filename: String,
    pub doc_tracker_filename: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            backups_to_keep: 2,
            main_tracker_filename: "module_relationship_tracker.md".into(),
            doc_tracker_filename: "doc_tracker.md".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dimensions: usize,
    pub max_file_bytes: u64,
    pub weak_similarity_threshold: f32,
    pub strong_similarity_threshold: f32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimensions: 256,
            max_file_bytes: 1_000_000,
            weak_similarity_threshold: 0.65,
            strong_similarity_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorkerSettings {
    /// Hard cap on worker threads regardless of core count (spec §5).
    pub max_workers: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { max_workers: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Top-level, layered settings document. Mirrors the teacher's
/// `Settings`/`ServerConfig` split but collapsed to this domain's surface.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    pub project_root: PathBuf,
    pub memory_dir: PathBuf,
    /// Project-relative directories whose contents are eligible for the main
    /// tracker (directories only; files are aggregated up into them).
    pub code_root_directories: Vec<String>,
    /// Project-relative directories whose contents are eligible for the doc
    /// tracker.
    pub doc_root_directories: Vec<String>,
    pub keys: KeySettings,
    pub grid: GridSettings,
    pub tracker: TrackerSettings,
    pub embedding: EmbeddingSettings,
    pub workers: WorkerSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            memory_dir: PathBuf::from("cline_docs"),
            code_root_directories: vec!["src".into()],
            doc_root_directories: vec!["docs".into()],
            keys: KeySettings::default(),
            grid: GridSettings::default(),
            tracker: TrackerSettings::default(),
            embedding: EmbeddingSettings::default(),
            workers: WorkerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Loads and, on request, persists `Settings`, layering
/// `config/default.toml` < `config/{env}.toml` < `config/local.toml` <
/// `DEPMAP__`-prefixed environment variables, matching the teacher's
/// `ConfigManager::load_from_sources` precedence.
pub struct ConfigManager {
    config_dir: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    pub fn load(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        let settings = Self::load_from_sources(&config_dir)?;
        Ok(Self {
            config_dir,
            settings,
        })
    }

    /// Resolves the config directory the way the teacher's
    /// `default_config_dir` does: an explicit override directory first, a
    /// project-local `config/` next, falling back to the current directory.
    pub fn default_config_dir(project_root: &Path) -> PathBuf {
        let candidate = project_root.join("config");
        if candidate.is_dir() {
            candidate
        } else {
            project_root.to_path_buf()
        }
    }

    fn load_from_sources(config_dir: &Path) -> Result<Settings> {
        let env = std::env::var("DEPMAP_ENV").unwrap_or_else(|_| "development".to_string());
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default()).map_err(|e| {
                DepMapError::Config(format!("failed to seed defaults: {e}"))
            })?);

        let default_toml = config_dir.join("default.toml");
        if default_toml.is_file() {
            builder = builder.add_source(config::File::from(default_toml));
        }
        let env_toml = config_dir.join(format!("{env}.toml"));
        if env_toml.is_file() {
            builder = builder.add_source(config::File::from(env_toml));
        }
        let local_toml = config_dir.join("local.toml");
        if local_toml.is_file() {
            builder = builder.add_source(config::File::from(local_toml));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DEPMAP")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder
            .build()
            .map_err(|e| DepMapError::Config(format!("failed to build config: {e}")))?;
        built
            .try_deserialize()
            .map_err(|e| DepMapError::Config(format!("failed to deserialize config: {e}")))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Replaces the in-memory settings without touching disk; callers that
    /// want the change to survive past this process still need
    /// [`ConfigManager::persist_local`].
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn reload(&mut self) -> Result<()> {
        self.settings = Self::load_from_sources(&self.config_dir)?;
        Ok(())
    }

    /// Writes the current settings back to `local.toml`, the teacher's
    /// pattern for `update-config`/`reset-config`-style CLI commands.
    pub fn persist_local(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(&self.settings)
            .map_err(|e| DepMapError::Config(format!("failed to serialize settings: {e}")))?;
        let path = self.config_dir.join("local.toml");
        std::fs::write(&path, toml_str).map_err(|source| DepMapError::IoAt {
            path: path.to_string_lossy().to_string(),
            source,
        })
    }

    pub fn init_user_config_dir(config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir).map_err(|source| DepMapError::IoAt {
            path: config_dir.to_string_lossy().to_string(),
            source,
        })?;
        let default_path = config_dir.join("default.toml");
        if !default_path.is_file() {
            let toml_str = toml::to_string_pretty(&Settings::default())
                .map_err(|e| DepMapError::Config(format!("failed to serialize defaults: {e}")))?;
            std::fs::write(&default_path, toml_str).map_err(|source| DepMapError::IoAt {
                path: default_path.to_string_lossy().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.keys.max_siblings, 26);
        assert_eq!(settings.tracker.backups_to_keep, 2);
        assert!(settings.embedding.weak_similarity_threshold < settings.embedding.strong_similarity_threshold);
    }

    #[test]
    fn load_with_no_files_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();
        assert_eq!(manager.settings().workers.max_workers, 32);
    }

    #[test]
    fn local_toml_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("local.toml"),
            "[workers]\nmax_workers = 4\n",
        )
        .unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();
        assert_eq!(manager.settings().workers.max_workers, 4);
    }
}
