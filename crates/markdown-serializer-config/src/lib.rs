use relative_path::{RelativePath, RelativePathBuf};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid ignored folder pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

fn default_max_errors_shown() -> usize {
    5
}

fn default_write_cooldown_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

/// How to reach the external query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerConfig {
    /// Program and arguments. The query arrives on stdin, Markdown is read
    /// from stdout.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            command: vec![],
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub notes_path: PathBuf,
    /// Folders (relative to `notes_path`) to process. Empty means all.
    #[serde(default)]
    pub folders_to_scan: Vec<String>,
    /// Glob patterns for folders or files never processed.
    #[serde(default)]
    pub ignored_folders: Vec<String>,
    #[serde(default)]
    pub always_add_trailing_blank_line: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_max_errors_shown")]
    pub max_errors_shown: usize,
    #[serde(default = "default_write_cooldown_ms")]
    pub write_cooldown_ms: u64,
    #[serde(default)]
    pub serializer: SerializerConfig,
}

impl Config {
    pub fn new(notes_path: impl Into<PathBuf>) -> Self {
        Self {
            notes_path: notes_path.into(),
            folders_to_scan: vec![],
            ignored_folders: vec![],
            always_add_trailing_blank_line: false,
            debug: false,
            max_errors_shown: default_max_errors_shown(),
            write_cooldown_ms: default_write_cooldown_ms(),
            serializer: SerializerConfig::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config = Self::from_toml(&content).map_err(|err| match err {
            ConfigError::ConfigParseError { source, .. } => ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        Ok(Some(config))
    }

    /// Parses and validates configuration text, expanding `~` and
    /// environment variables in `notes_path`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(content).map_err(|source| ConfigError::ConfigParseError {
                config_path: PathBuf::new(),
                source,
            })?;

        config.notes_path = Self::expand_path(&config.notes_path).unwrap_or(config.notes_path);
        config.validate()?;
        Ok(config)
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-serializer");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.ignored_folders {
            glob::Pattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn serializer_timeout(&self) -> Duration {
        Duration::from_secs(self.serializer.timeout_secs)
    }

    pub fn write_cooldown(&self) -> Duration {
        Duration::from_millis(self.write_cooldown_ms)
    }

    /// Returns true when a note at `relative_path` (relative to
    /// `notes_path`) should be processed.
    ///
    /// The note must sit inside one of `folders_to_scan` (when any are set)
    /// and neither the note nor any folder above it may match an ignore
    /// pattern.
    pub fn should_process(&self, relative_path: &RelativePath) -> bool {
        if relative_path.extension() != Some("md") {
            return false;
        }

        let in_scope = self.folders_to_scan.is_empty()
            || self
                .folders_to_scan
                .iter()
                .any(|folder| relative_path.starts_with(folder.trim_matches('/')));
        if !in_scope {
            return false;
        }

        let patterns: Vec<_> = self
            .ignored_folders
            .iter()
            .filter_map(|p| glob::Pattern::new(p.trim_end_matches('/')).ok())
            .collect();
        let mut prefix = RelativePathBuf::new();
        for component in relative_path.components() {
            prefix.push(component.as_str());
            if patterns.iter().any(|p| p.matches(prefix.as_str())) {
                return false;
            }
        }
        true
    }
}
