//! Scaffold library - command orchestration for the `scaffold` binary
//!
//! Exposed as a library so the commands can be driven from integration
//! tests with a scripted prompter and an in-memory project.

pub mod commands;
pub mod errors;
pub mod help;
pub mod install;
pub mod naming;
pub mod prompt;
pub mod result;
pub mod templates;

pub use errors::CommandError;
pub use result::CommandResult;
