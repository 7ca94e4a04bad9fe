use crate::models::{SortBy, SortOrder};
use crate::query::{ListQuery, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::session::SessionStore;
use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Where the session token is kept
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Initial list query for the dashboard
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.conectar/config.local.toml) > project (.conectar/config.toml)
    /// > user (~/.conectar/config.toml) > built-in defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".conectar").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".conectar").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Not meant to be committed
        let local_config = Path::new(".conectar").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every
    /// value it sets)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }
        if other.session.file.is_some() {
            self.session.file = other.session.file;
        }
        if other.dashboard.per_page.is_some() {
            self.dashboard.per_page = other.dashboard.per_page;
        }
        if other.dashboard.sort_by.is_some() {
            self.dashboard.sort_by = other.dashboard.sort_by;
        }
        if other.dashboard.sort_order.is_some() {
            self.dashboard.sort_order = other.dashboard.sort_order;
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Session storage, or `None` when no home directory can be found
    pub fn session_store(&self) -> Option<SessionStore> {
        self.session
            .file
            .clone()
            .or_else(SessionStore::default_path)
            .map(SessionStore::new)
    }

    /// The list query a freshly mounted dashboard starts from
    pub fn initial_query(&self) -> ListQuery {
        ListQuery {
            sort_by: self.dashboard.sort_by.unwrap_or_default(),
            sort_order: self.dashboard.sort_order.unwrap_or_default(),
            per_page: self.dashboard.per_page.unwrap_or(DEFAULT_PER_PAGE),
            ..Default::default()
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Must start with http:// or https://, got '{}'", base_url),
            });
        }

        if self.api.timeout_ms == Some(0) {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Some(per_page) = self.dashboard.per_page {
            if !(1..=MAX_PER_PAGE).contains(&per_page) {
                errors.push(ValidationError {
                    field: "dashboard.per_page".to_string(),
                    message: format!("Must be between 1 and {}, got {}", MAX_PER_PAGE, per_page),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_millis(15_000));
        assert_eq!(config.initial_query(), ListQuery::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://api.example.com"

[session]
file = "/tmp/conectar-token"

[dashboard]
per_page = 5
sort_by = "name"
sort_order = "asc"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url(), "https://api.example.com");
        assert_eq!(
            config.session_store().unwrap().path(),
            Path::new("/tmp/conectar-token")
        );
        let query = config.initial_query();
        assert_eq!(query.per_page, 5);
        assert_eq!(query.sort_by, SortBy::Name);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config::default();
        base.api.base_url = Some("http://user-level".to_string());
        base.api.timeout_ms = Some(1000);

        let mut project = Config::default();
        project.api.base_url = Some("http://project-level".to_string());
        base.merge(project);

        assert_eq!(base.base_url(), "http://project-level");
        assert_eq!(base.api.timeout_ms, Some(1000));
    }

    #[test]
    fn test_validate_errors() {
        let mut config = Config::default();
        config.api.base_url = Some("localhost:3000".to_string());
        config.api.timeout_ms = Some(0);
        config.dashboard.per_page = Some(500);

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].field.contains("base_url"));
        assert!(errors[1].message.contains("greater than 0"));
        assert!(errors[2].to_string().starts_with("[dashboard.per_page]"));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dashboard]\nsort_by = \"email\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
