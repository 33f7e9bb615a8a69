//! Symbol references: views over a class that re-locate it on every query.
//!
//! A reference holds only a file path and a class name, so edits made
//! through one reference are immediately visible through every other.

mod config;
mod entity;
mod plugin;
mod service;

pub use config::ConfigRef;
pub use entity::{EntityProp, EntityRef};
pub use plugin::{ApiType, PluginRef};
pub use service::{CrudCapabilities, Injection, ServiceRef, CRUD_METHODS};

use crate::error::AstError;
use crate::project::{ClassHandle, Project};
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, TsNode};

/// Run an editor against the class a handle points to.
pub(crate) fn modify_class<F>(project: &mut Project, handle: &ClassHandle, f: F) -> Result<bool, AstError>
where
    F: FnOnce(&FileView<'_>, &TsNode<'_>) -> Result<Vec<TextEdit>, AstError>,
{
    project.modify_file(&handle.path, |view| {
        let class = syntax::find_class(&view.root, &handle.name).ok_or_else(|| {
            AstError::ClassNotFound {
                name: handle.name.clone(),
                path: handle.path.clone(),
            }
        })?;
        f(view, &class)
    })
}

/// Names listed in an array literal, reduced to their leading identifier
/// (`Foo` for `Foo`, `Foo.init({...})` and `{ provide: Foo }` is skipped).
pub(crate) fn array_names(array: &TsNode<'_>) -> Vec<String> {
    syntax::named_children(array)
        .iter()
        .filter_map(|item| leading_identifier(item))
        .collect()
}

fn leading_identifier(expr: &TsNode<'_>) -> Option<String> {
    let expr = syntax::unwrap_expression(expr);
    match expr.kind().as_ref() {
        "identifier" => Some(expr.text().to_string()),
        "call_expression" => expr.field("function").and_then(|f| leading_identifier(&f)),
        "member_expression" => expr.field("object").and_then(|o| leading_identifier(&o)),
        _ => None,
    }
}
