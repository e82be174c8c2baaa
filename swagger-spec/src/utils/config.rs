use crate::business::expander::ExpandOptions;
use crate::utils::error::{Result, SpecError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_ALLOW_REMOTE: &str = "SWAGGER_SPEC_ALLOW_REMOTE";
pub const ENV_FETCH_TIMEOUT: &str = "SWAGGER_SPEC_FETCH_TIMEOUT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub expand: ExpandOptions,
}

/// How documents outside the root are fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Permit http(s) fetches.
    pub allow_remote: bool,
    /// Permit file:// reads.
    pub allow_file: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("swagger-spec/{}", env!("CARGO_PKG_VERSION")),
            allow_remote: true,
            allow_file: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SpecError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Config = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| {
                SpecError::config(format!("Failed to parse YAML config {:?}: {}", path, e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                SpecError::config(format!("Failed to parse TOML config {:?}: {}", path, e))
            })?
        };

        tracing::info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| SpecError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            SpecError::config(format!("Failed to write config file {:?}: {}", path, e))
        })?;

        tracing::info!("Saved configuration to: {:?}", path);
        Ok(())
    }

    /// Apply `SWAGGER_SPEC_*` environment overrides.
    pub fn from_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ALLOW_REMOTE) {
            self.fetch.allow_remote = parse_flag(&raw).ok_or_else(|| {
                SpecError::config(format!("{} must be a boolean, got '{}'", ENV_ALLOW_REMOTE, raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_FETCH_TIMEOUT) {
            self.fetch.timeout_secs = raw.trim().parse().map_err(|_| {
                SpecError::config(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_FETCH_TIMEOUT, raw
                ))
            })?;
        }
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.fetch.allow_remote);
        assert!(!config.expand.keep_circular_refs);
    }

    #[test]
    fn test_save_then_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("swagger-spec.toml");

        let mut config = Config::default();
        config.fetch.timeout_secs = 5;
        config.expand.keep_circular_refs = true;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "fetch:\n  allow_remote: false\nexpand:\n  relative_base: file:///specs/\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.fetch.allow_remote);
        assert!(config.fetch.allow_file);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.expand.relative_base.as_deref(), Some("file:///specs/"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[fetch\ntimeout_secs = ").unwrap();

        assert!(matches!(Config::load(&path), Err(SpecError::ConfigError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            [(ENV_ALLOW_REMOTE, "off"), (ENV_FETCH_TIMEOUT, " 7 ")].into_iter().collect();
        let config = Config::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(!config.fetch.allow_remote);
        assert_eq!(config.fetch.timeout_secs, 7);

        let err = Config::default()
            .with_overrides(|key| (key == ENV_FETCH_TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_FETCH_TIMEOUT));
    }
}
