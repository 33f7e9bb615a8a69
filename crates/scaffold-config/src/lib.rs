//! Configuration for the scaffold CLI.
//!
//! Two kinds of configuration live here: the user's CLI settings (a TOML file,
//! see [`Config`]) and the target project's TypeScript configuration (see
//! [`tsconfig`]), which decides which source files the engine loads.

pub mod error;
pub mod package_manager;
pub mod tsconfig;

pub use error::ConfigError;
pub use package_manager::PackageManager;
pub use tsconfig::TsConfig;

use scaffold_logger as logger;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_INDENT_WIDTH: usize = 4;
const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 600;

/// Keys accepted by `scaffold config get|set`.
pub const CONFIG_KEYS: &[&str] = &[
    "quote-style",
    "trailing-commas",
    "indent-width",
    "package-manager",
    "prompt-timeout-secs",
];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_commas: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_width: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_timeout_secs: Option<u64>,
}

impl Config {
    pub fn path() -> PathBuf {
        // Honor explicit override via SCAFFOLD_CONFIG for tests / isolated runs.
        if let Ok(env_path) = std::env::var("SCAFFOLD_CONFIG") {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".config")
            .join("scaffold")
            .join("scaffold.toml")
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path();
        if path.exists() {
            logger::debug(&format!("Loading config from {}", path.display()));
            let content = fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn reset() -> Result<(), ConfigError> {
        let path = Self::path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "quote-style" => self.quote_style.clone(),
            "trailing-commas" => self.trailing_commas.map(|v| v.to_string()),
            "indent-width" => self.indent_width.map(|v| v.to_string()),
            "package-manager" => self.package_manager.clone(),
            "prompt-timeout-secs" => self.prompt_timeout_secs.map(|v| v.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match key {
            "quote-style" => match value {
                "single" | "double" => self.quote_style = Some(value.to_string()),
                _ => return Err(invalid("expected 'single' or 'double'")),
            },
            "trailing-commas" => {
                let parsed = value
                    .parse::<bool>()
                    .map_err(|_| invalid("expected 'true' or 'false'"))?;
                self.trailing_commas = Some(parsed);
            }
            "indent-width" => {
                let parsed = value
                    .parse::<usize>()
                    .ok()
                    .filter(|w| (1..=8).contains(w))
                    .ok_or_else(|| invalid("expected a number between 1 and 8"))?;
                self.indent_width = Some(parsed);
            }
            "package-manager" => {
                PackageManager::from_name(value)
                    .ok_or_else(|| invalid("expected npm, yarn, pnpm or bun"))?;
                self.package_manager = Some(value.to_string());
            }
            "prompt-timeout-secs" => {
                let parsed = value
                    .parse::<u64>()
                    .map_err(|_| invalid("expected a number of seconds"))?;
                self.prompt_timeout_secs = Some(parsed);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Config::default()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| self.get(key).ok().flatten().map(|v| (*key, v)))
            .collect()
    }

    pub fn uses_double_quotes(&self) -> bool {
        self.quote_style.as_deref() == Some("double")
    }

    /// Trailing commas are on unless explicitly disabled.
    pub fn trailing_commas(&self) -> bool {
        self.trailing_commas.unwrap_or(true)
    }

    pub fn indent_width(&self) -> usize {
        self.indent_width.unwrap_or(DEFAULT_INDENT_WIDTH)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(
            self.prompt_timeout_secs
                .unwrap_or(DEFAULT_PROMPT_TIMEOUT_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, ConfigError};

    #[test]
    fn test_config_new() {
        let config = Config::default();
        assert!(config.is_empty());
        assert!(config.trailing_commas());
        assert_eq!(config.indent_width(), 4);
        assert!(!config.uses_double_quotes());
    }

    #[test]
    fn test_config_set_get() {
        let mut config = Config::default();
        config.set("quote-style", "double").unwrap();
        assert_eq!(config.get("quote-style").unwrap(), Some("double".to_string()));
        assert!(config.uses_double_quotes());
        assert!(!config.is_empty());
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("indent-width", "12"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("package-manager", "cargo"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(config.is_empty());
    }

    #[test]
    fn test_config_unknown_key() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("unknown-key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(config.get("unknown-key").is_err());
    }

    #[test]
    fn test_values_iter_lists_only_set_keys() {
        let mut config = Config::default();
        config.set("trailing-commas", "false").unwrap();
        config.set("prompt-timeout-secs", "30").unwrap();
        assert_eq!(
            config.values_iter(),
            vec![
                ("trailing-commas", "false".to_string()),
                ("prompt-timeout-secs", "30".to_string())
            ]
        );
        assert!(!config.trailing_commas());
        assert_eq!(config.prompt_timeout().as_secs(), 30);
    }

    #[test]
    fn test_toml_round_trip_uses_kebab_keys() {
        let mut config = Config::default();
        config.set("indent-width", "2").unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("indent-width = 2"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
