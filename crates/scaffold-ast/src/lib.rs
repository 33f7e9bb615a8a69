//! AST-based mutation of a Vendure project's TypeScript sources.
//!
//! A [`Project`] loads the files a tsconfig governs and keeps each one as a
//! parsed [`SourceFile`]. Reads go through the symbol references in
//! [`refs`]; writes go through the editors in [`edit`], which produce text
//! edits that the owning file applies and re-parses. Nothing touches disk
//! until [`Project::persist`].

pub mod edit;
pub mod error;
pub mod markers;
pub mod project;
pub mod refs;
pub mod settings;
pub mod source;
pub mod syntax;
pub mod template;

pub use error::AstError;
pub use markers::Capability;
pub use project::{ClassHandle, Project};
pub use refs::{
    ApiType, ConfigRef, CrudCapabilities, EntityProp, EntityRef, Injection, PluginRef, ServiceRef,
    CRUD_METHODS,
};
pub use settings::{ManipulationSettings, QuoteKind};
pub use source::{FileView, SourceFile, TextEdit};
pub use template::{instantiate, Instantiation, Template};
