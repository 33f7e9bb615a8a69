//! Error types for the code mutation engine.

use scaffold_config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File not found in project: {0}")]
    FileNotFound(PathBuf),

    #[error("Template for {path} is not valid TypeScript (syntax error at {line}:{column})")]
    TemplateParse {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("Class '{name}' not found in {path}")]
    ClassNotFound { name: String, path: PathBuf },

    #[error("Declaration '{name}' not found in {path}")]
    DeclarationNotFound { name: String, path: PathBuf },

    #[error("Method '{method}' not found on class '{class}'")]
    MethodNotFound { class: String, method: String },

    #[error("Class '{0}' has no @VendurePlugin decorator with an object literal argument")]
    MissingPluginMetadata(String),

    #[error(
        "Plugin metadata property '{property}' is already set to {existing}; refusing to overwrite it with {requested}"
    )]
    MetadataConflict {
        property: String,
        existing: String,
        requested: String,
    },

    #[error("Template placeholder '{placeholder}' has no declaration in {template}")]
    PlaceholderNotFound {
        placeholder: String,
        template: String,
    },

    #[error("Unexpected code shape in {path}: {detail}")]
    UnexpectedShape { path: PathBuf, detail: String },

    #[error("Overlapping edits in {0}")]
    OverlappingEdits(PathBuf),
}

impl AstError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AstError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        AstError::UnexpectedShape {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Whether the error means the project's code (or a template) does not
    /// have the shape the engine expects, as opposed to a missing input.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AstError::MissingPluginMetadata(_)
                | AstError::MetadataConflict { .. }
                | AstError::PlaceholderNotFound { .. }
                | AstError::TemplateParse { .. }
                | AstError::UnexpectedShape { .. }
                | AstError::OverlappingEdits(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_conflict_display() {
        let err = AstError::MetadataConflict {
            property: "dashboard".to_string(),
            existing: "'./x'".to_string(),
            requested: "'./y'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Plugin metadata property 'dashboard' is already set to './x'; refusing to overwrite it with './y'"
        );
        assert!(err.is_structural());
    }

    #[test]
    fn test_resolution_errors_are_not_structural() {
        let err = AstError::FileNotFound(PathBuf::from("/p/a.ts"));
        assert!(!err.is_structural());
    }
}
