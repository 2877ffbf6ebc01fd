use crate::executor::MAX_PROTECTION_BATCH_SIZE;
use crate::logging::{LoggingConfig, VALID_LEVELS, VALID_ROTATIONS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure for asg-unprotect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AWS configuration
    pub aws: AwsConfig,

    /// Protection removal configuration
    pub protection: ProtectionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS profile; the default credential chain is used when unset
    pub profile: Option<String>,

    /// AWS region; resolved from the environment/profile when unset
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Instance IDs per SetInstanceProtection call
    pub batch_size: usize,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_PROTECTION_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from `config_path`, or from the default location when it exists.
    ///
    /// A missing default file yields the defaults; nothing is written to disk.
    pub async fn load(config_path: Option<&str>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    anyhow::bail!("Config file not found: {:?}", path);
                }
                Some(path)
            }
            None => Self::default_config_path().filter(|p| p.exists()),
        };

        let mut config = match config_file {
            Some(path) => Self::read(&path).await?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    async fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {:?}", path))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {:?}", path))?
        };

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(profile) = env::var("ASG_UNPROTECT_AWS_PROFILE") {
            self.aws.profile = Some(profile);
        }

        if let Ok(region) = env::var("ASG_UNPROTECT_AWS_REGION") {
            self.aws.region = Some(region);
        }

        if let Ok(batch_size) = env::var("ASG_UNPROTECT_BATCH_SIZE") {
            self.protection.batch_size = batch_size
                .parse()
                .with_context(|| "Invalid ASG_UNPROTECT_BATCH_SIZE value")?;
        }

        if let Ok(level) = env::var("ASG_UNPROTECT_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }

        if let Ok(file_logging) = env::var("ASG_UNPROTECT_FILE_LOGGING") {
            self.logging.file_logging = file_logging
                .parse()
                .with_context(|| "Invalid ASG_UNPROTECT_FILE_LOGGING value (use true/false)")?;
        }

        if let Ok(log_dir) = env::var("ASG_UNPROTECT_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(log_dir);
        }

        if let Ok(json_format) = env::var("ASG_UNPROTECT_JSON_LOGGING") {
            self.logging.json_format = json_format
                .parse()
                .with_context(|| "Invalid ASG_UNPROTECT_JSON_LOGGING value (use true/false)")?;
        }

        Ok(())
    }

    /// Default configuration file path; `None` when no config directory can be determined
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|dir| dir.join("asg-unprotect").join("config.json"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.protection.batch_size == 0 || self.protection.batch_size > MAX_PROTECTION_BATCH_SIZE {
            anyhow::bail!(
                "batch_size must be between 1 and {}, got {}",
                MAX_PROTECTION_BATCH_SIZE,
                self.protection.batch_size
            );
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            );
        }

        if !VALID_ROTATIONS.contains(&self.logging.rotation.as_str()) {
            anyhow::bail!(
                "Invalid log rotation '{}'. Must be one of: {}",
                self.logging.rotation,
                VALID_ROTATIONS.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_toml_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let toml = r#"
[aws]
region = "eu-west-1"

[protection]
batch_size = 20

[logging]
level = "debug"
"#;
        fs::write(&path, toml).await.unwrap();

        let config = Config::read(&path).await.unwrap();
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.protection.batch_size, 20);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, "daily");
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"aws": {"profile": "ops"}}"#).await.unwrap();

        let config = Config::read(&path).await.unwrap();
        assert_eq!(config.aws.profile.as_deref(), Some("ops"));
        assert_eq!(config.protection.batch_size, MAX_PROTECTION_BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.json");
        assert!(Config::load(Some(path.to_string_lossy().as_ref())).await.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.validate().unwrap();

        config.protection.batch_size = 0;
        assert!(config.validate().is_err());
        config.protection.batch_size = 51;
        assert!(config.validate().is_err());

        config.protection.batch_size = 10;
        config.logging.level = "spam".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        config.logging.rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }
}
