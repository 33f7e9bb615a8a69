//! The uniform result every command returns at its outer boundary.

use crate::errors::CommandError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            fields: Map::new(),
            exit_code: 0,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            fields: Map::new(),
            exit_code: 1,
        }
    }

    pub fn from_error(err: &CommandError) -> Self {
        let mut result = Self::failed(err.to_string());
        result.exit_code = err.exit_code();
        result.success = result.exit_code == 0;
        if let Some(hint) = err.hint() {
            result.fields.insert("hint".to_string(), Value::String(hint));
        }
        result
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Record written files, relative to `root` where possible.
    pub fn with_files(self, root: &Path, files: &[PathBuf]) -> Self {
        let files: Vec<Value> = files
            .iter()
            .map(|f| {
                let shown = f.strip_prefix(root).unwrap_or(f);
                Value::String(shown.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        self.with("files", Value::Array(files))
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_flattened() {
        let result = CommandResult::ok("Added entity")
            .with("entity", "ProductReview")
            .with_files(Path::new("/p"), &[PathBuf::from("/p/src/a.ts")]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["entity"], "ProductReview");
        assert_eq!(json["files"][0], "src/a.ts");
    }

    #[test]
    fn test_from_error() {
        let result = CommandResult::from_error(&CommandError::missing(
            "Plugin name is required",
            "Pass --plugin <name>",
        ));
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.message, "Plugin name is required");
        assert_eq!(result.field_str("hint"), Some("Pass --plugin <name>"));

        let cancelled = CommandResult::from_error(&CommandError::Cancelled);
        assert!(cancelled.success);
        assert_eq!(cancelled.exit_code, 0);
        assert_eq!(cancelled.message, "Operation cancelled");

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("exit_code").is_none());
    }
}
