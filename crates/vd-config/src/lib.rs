//! Configuration for the rendered-content service.
//!
//! Parses `vd.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. A missing config
//! file is not an error: every section has usable defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "vd.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering and visibility settings.
    pub web: WebConfig,
    /// Rendered-content cache settings.
    pub cache: CacheConfig,
    /// Version switch lock settings.
    pub lock: LockConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Rendering and visibility settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Content version being served.
    pub version: String,
    /// Whether dev affordances (source-code links, debug copies) are shown.
    pub dev_mode: bool,
    /// Whether rule text covered by code is hidden in dev mode.
    pub hide_covered: bool,
    /// Marker token gating id synthesis on table headers.
    pub table_marker: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_owned(),
            dev_mode: false,
            hide_covered: false,
            table_marker: None,
        }
    }
}

/// Rendered-content cache settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether rendered pages are cached at all.
    pub enabled: bool,
    /// Cache root directory; relative paths resolve against the config file.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".vd/cache"),
        }
    }
}

/// Version switch lock settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lock directory; `None` means the system temp directory.
    pub dir: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise
    /// searches for `vd.toml` in the current directory and its parents,
    /// falling back to defaults when nothing is found.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` doesn't exist or
    /// parsing fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }
        let start = std::env::current_dir().unwrap_or_default();
        match Self::discover(&start) {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Search for a config file in `start` and its parents.
    #[must_use]
    pub fn discover(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Relative cache dirs are anchored at the config file, not the cwd.
        let config_dir = path.parent().unwrap_or(Path::new("."));
        if config.cache.dir.is_relative() {
            config.cache.dir = config_dir.join(&config.cache.dir);
        }
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.web.version, "1.0");
        assert!(!config.web.dev_mode);
        assert!(!config.web.hide_covered);
        assert_eq!(config.web.table_marker, None);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from(".vd/cache"));
        assert_eq!(config.lock.dir, None);
    }

    #[test]
    fn test_load_full_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vd.toml");
        std::fs::write(
            &path,
            r#"
[web]
version = "1.1"
dev_mode = true
hide_covered = true
table_marker = "Tabulka"

[cache]
enabled = false
dir = "/var/cache/vd"

[lock]
dir = "/run/lock"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.web.version, "1.1");
        assert!(config.web.dev_mode);
        assert!(config.web.hide_covered);
        assert_eq!(config.web.table_marker.as_deref(), Some("Tabulka"));
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/vd"));
        assert_eq!(config.lock.dir, Some(PathBuf::from("/run/lock")));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vd.toml");
        std::fs::write(&path, "[web]\nversion = \"2.0\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.web.version, "2.0");
        assert!(config.cache.enabled);
        assert_eq!(config.lock.dir, None);
    }

    #[test]
    fn test_relative_cache_dir_resolves_against_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vd.toml");
        std::fs::write(&path, "[cache]\ndir = \"cache\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.dir, tmp.path().join("cache"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/vd.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vd.toml");
        std::fs::write(&path, "not toml at all [").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_discovery_walks_parents() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join("vd.toml"), "").unwrap();

        let found = Config::discover(&nested).unwrap();
        assert_eq!(found, tmp.path().join("vd.toml"));
    }
}
