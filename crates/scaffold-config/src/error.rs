use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the CLI configuration or a project's tsconfig.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No tsconfig file found. Searched: {}", format_paths(.searched))]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("Cannot resolve \"extends\": \"{spec}\" referenced from {from}")]
    ExtendsNotFound { spec: String, from: PathBuf },

    #[error("Circular \"extends\" chain detected at {0}")]
    ExtendsCycle(PathBuf),

    #[error("Unknown config key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("'{0}' was not found on PATH")]
    ToolNotFound(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_lists_locations() {
        let err = ConfigError::ConfigNotFound {
            searched: vec![PathBuf::from("/a"), PathBuf::from("/a/b")],
        };
        assert_eq!(err.to_string(), "No tsconfig file found. Searched: /a, /a/b");
    }

    #[test]
    fn test_unknown_key_display() {
        let err = ConfigError::UnknownKey("colour".to_string());
        assert_eq!(err.to_string(), "Unknown config key 'colour'");
    }
}
