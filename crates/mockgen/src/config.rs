//! Project layout and the `config.json` override document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory, relative to the project root, holding every mockgen artifact.
pub const MOCKGEN_DIR: &str = ".mockgen";

/// Errors reading or writing the config document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Output format for the API description document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

/// Paths of the artifacts under `<root>/.mockgen`.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(MOCKGEN_DIR)
    }

    pub fn endpoints_path(&self) -> PathBuf {
        self.dir().join("endpoints.json")
    }

    pub fn mock_bundle_path(&self) -> PathBuf {
        self.dir().join("mock.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir().join("config.json")
    }

    pub fn openapi_path(&self, format: DocumentFormat) -> PathBuf {
        match format {
            DocumentFormat::Json => self.dir().join("swagger.json"),
            DocumentFormat::Yaml => self.dir().join("swagger.yaml"),
        }
    }

    /// Create `.mockgen/` if it does not exist yet.
    pub fn ensure_dir(&self) -> std::io::Result<PathBuf> {
        let dir = self.dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// User overrides applied during generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockGenConfig {
    /// Base URL advertised in the API description document
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    /// URL -> response template; a present entry replaces heuristic generation
    #[serde(rename = "responseTemplates", default)]
    pub response_templates: BTreeMap<String, Value>,
}

impl MockGenConfig {
    /// Parse a config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config, creating it with empty defaults when absent.
    ///
    /// Never fails: an unreadable or malformed file yields the default config
    /// together with the error as a warning for the caller to surface.
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.write(path) {
                warn!("{}", e);
                return (config, Some(e));
            }
            info!("Created default config at {}", path.display());
            return (config, None);
        }

        match Self::from_file(path) {
            Ok(config) => (config, None),
            Err(e) => {
                warn!("{}; using defaults", e);
                (Self::default(), Some(e))
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// The configured base URL, if non-empty.
    pub fn base_url(&self) -> Option<&str> {
        let trimmed = self.base_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn template_for(&self, url: &str) -> Option<&Value> {
        self.response_templates.get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ProjectLayout::new("/project");
        assert_eq!(layout.dir(), PathBuf::from("/project/.mockgen"));
        assert_eq!(
            layout.mock_bundle_path(),
            PathBuf::from("/project/.mockgen/mock.json")
        );
        assert_eq!(
            layout.openapi_path(DocumentFormat::Yaml),
            PathBuf::from("/project/.mockgen/swagger.yaml")
        );
    }

    #[test]
    fn test_config_deserialize() {
        let json = r#"{"baseURL": "https://api.example.com", "responseTemplates": {"/api/me": {"id": 7}}}"#;
        let config: MockGenConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url(), Some("https://api.example.com"));
        assert_eq!(
            config.template_for("/api/me"),
            Some(&serde_json::json!({"id": 7}))
        );
        assert!(config.template_for("/api/other").is_none());
    }

    #[test]
    fn test_config_defaults_when_fields_missing() {
        let config: MockGenConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MockGenConfig::default());
        assert_eq!(config.base_url(), None);
    }

    #[test]
    fn test_load_or_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".mockgen/config.json");

        let (config, warning) = MockGenConfig::load_or_init(&path);
        assert!(warning.is_none());
        assert_eq!(config, MockGenConfig::default());
        assert!(path.exists());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({"baseURL": "", "responseTemplates": {}})
        );
    }

    #[test]
    fn test_load_or_init_malformed_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (config, warning) = MockGenConfig::load_or_init(&path);
        assert_eq!(config, MockGenConfig::default());
        assert!(matches!(warning, Some(ConfigError::Parse { .. })));
        // The malformed file is left for the user to fix
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
