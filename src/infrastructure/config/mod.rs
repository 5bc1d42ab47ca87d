use crate::domain::error::{AppError, Result};
use crate::domain::retention::{RetentionPolicy, DEFAULT_RETENTION_LIMIT};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "equiview.toml";
pub const ENV_PREFIX: &str = "EQUIVIEW_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub retention_limit: usize,
    /// Uploads larger than this are rejected before parsing.
    pub max_upload_bytes: usize,
    /// Equipment rows listed in a PDF report.
    pub report_row_limit: usize,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_url: "sqlite://equiview.db".to_string(),
            retention_limit: DEFAULT_RETENTION_LIMIT,
            max_upload_bytes: 10 * 1024 * 1024,
            report_row_limit: 50,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `equiview.toml` in the working directory, then
    /// `EQUIVIEW_*` environment variables (a `.env` file is honoured).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment(Path::new(CONFIG_FILE)))
    }

    pub fn figment(config_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(AppError::ConfigError("database_url is empty".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(AppError::ConfigError(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.report_row_limit == 0 {
            return Err(AppError::ConfigError(
                "report_row_limit must be greater than zero".to_string(),
            ));
        }
        self.retention_policy().map(|_| ())
    }

    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::new(self.retention_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("does-not-exist.toml"));
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retention_policy().unwrap().limit(), 5);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(
            Toml::string("port = 9100\nretention_limit = 3\ndatabase_url = \"sqlite::memory:\""),
        );
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.retention_limit, 3);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_zero_retention_rejected() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("retention_limit = 0"));
        let err = AppConfig::from_figment(figment).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
