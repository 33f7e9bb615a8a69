//! Object, array, string and template literal edits.

use super::append_list_item;
use crate::error::AstError;
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, named_children, TsNode};
use tracing::debug;

/// What to put under a property name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// An array element; the property becomes `name: [element]` when absent.
    Element(String),
    /// A whole initializer expression, used only when the property is absent.
    Initializer(String),
}

/// Create `name` on `object`, or append to it when it already holds an array.
///
/// An existing non-array value is left as found. Array appends are not
/// checked for duplicates.
pub fn insert_property_or_append_array(
    view: &FileView<'_>,
    object: &TsNode<'_>,
    name: &str,
    value: PropertyValue,
) -> Result<Vec<TextEdit>, AstError> {
    if object.kind() != "object" {
        return Err(view.shape_error(format!(
            "expected an object literal for property '{name}', found {}",
            object.kind()
        )));
    }

    let Some(member) = syntax::find_member(object, name) else {
        let initializer = match value {
            PropertyValue::Element(element) => format!("[{element}]"),
            PropertyValue::Initializer(init) => init,
        };
        let members = syntax::object_members(object);
        return Ok(vec![append_list_item(
            view,
            object,
            &members,
            &format!("{name}: {initializer}"),
            true,
        )]);
    };

    let PropertyValue::Element(element) = value else {
        debug!("Property '{}' already present; leaving it unchanged", name);
        return Ok(Vec::new());
    };

    match member
        .field("value")
        .map(|v| syntax::unwrap_expression(&v))
    {
        Some(array) if array.kind() == "array" => {
            let items = named_children(&array);
            Ok(vec![append_list_item(view, &array, &items, &element, false)])
        }
        _ => {
            debug!(
                "Property '{}' is not an array literal; leaving it unchanged",
                name
            );
            Ok(Vec::new())
        }
    }
}

/// Whether the array under `name` already lists `element`.
pub fn array_contains(object: &TsNode<'_>, name: &str, element: &str) -> bool {
    syntax::find_pair(object, name)
        .and_then(|pair| pair.field("value"))
        .map(|v| syntax::unwrap_expression(&v))
        .filter(|v| v.kind() == "array")
        .map(|array| {
            named_children(&array)
                .iter()
                .any(|item| item.text().trim() == element)
        })
        .unwrap_or(false)
}

/// Set a string-valued property. Setting it to the value it already has is
/// a no-op; setting it to anything else is a conflict.
pub fn set_string_property(
    view: &FileView<'_>,
    object: &TsNode<'_>,
    name: &str,
    value: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let requested = view.settings.quote(value);
    match syntax::find_pair(object, name) {
        None => Ok(vec![append_list_item(
            view,
            object,
            &syntax::object_members(object),
            &format!("{name}: {requested}"),
            true,
        )]),
        Some(pair) => {
            let existing = pair.field("value");
            let same = existing
                .as_ref()
                .and_then(syntax::string_value)
                .map(|s| s == value)
                .unwrap_or(false);
            if same {
                Ok(Vec::new())
            } else {
                Err(AstError::MetadataConflict {
                    property: name.to_string(),
                    existing: existing
                        .map(|v| v.text().to_string())
                        .unwrap_or_default(),
                    requested,
                })
            }
        }
    }
}

/// Follow nested object properties, e.g. `["dbConnectionOptions", "type"]`.
pub fn property_at_path<'r>(object: &TsNode<'r>, path: &[&str]) -> Option<TsNode<'r>> {
    let mut current = syntax::unwrap_expression(object);
    for segment in path {
        if current.kind() != "object" {
            return None;
        }
        let pair = syntax::find_pair(&current, segment)?;
        current = syntax::unwrap_expression(&pair.field("value")?);
    }
    Some(current)
}

/// Append a line before the closing backtick of a template string, unless the
/// template already contains it.
pub fn append_to_template(
    view: &FileView<'_>,
    template: &TsNode<'_>,
    line: &str,
) -> Result<Vec<TextEdit>, AstError> {
    if template.kind() != "template_string" {
        return Err(view.shape_error(format!(
            "expected a template literal, found {}",
            template.kind()
        )));
    }
    if template.text().contains(line.trim()) {
        return Ok(Vec::new());
    }
    let close = template.range().end - 1;
    let base = view.indent_at(template.range().start);
    let before_close = &view.text[..close];
    let insert_at = before_close
        .rfind('\n')
        .filter(|nl| view.text[nl + 1..close].trim().is_empty())
        .unwrap_or(close);
    Ok(vec![TextEdit::insert(
        insert_at,
        format!("\n{base}{}{}", view.settings.indent, line.trim()),
    )])
}

/// The template string passed to a tagged template or call, e.g. ``gql`...` ``.
pub fn template_of<'r>(expr: &TsNode<'r>) -> Option<TsNode<'r>> {
    let expr = syntax::unwrap_expression(expr);
    match expr.kind().as_ref() {
        "template_string" => Some(expr),
        "call_expression" => expr
            .field("arguments")
            .filter(|a| a.kind() == "template_string"),
        _ => None,
    }
}

/// Replace the initializer of a top-level variable.
pub fn set_variable_initializer(
    view: &FileView<'_>,
    name: &str,
    initializer: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let declaration =
        syntax::find_declaration(&view.root, name).ok_or_else(|| AstError::DeclarationNotFound {
            name: name.to_string(),
            path: view.path.to_path_buf(),
        })?;
    let value = declaration
        .name_node
        .parent()
        .and_then(|declarator| declarator.field("value"))
        .ok_or_else(|| view.shape_error(format!("'{name}' has no initializer")))?;
    if value.text() == initializer {
        return Ok(Vec::new());
    }
    Ok(vec![TextEdit::replace(value.range(), initializer)])
}
