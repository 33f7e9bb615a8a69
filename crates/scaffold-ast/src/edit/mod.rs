//! Structural editors.
//!
//! Editors inspect a [`FileView`] and return the [`TextEdit`]s that perform a
//! change; [`crate::Project::modify_file`] applies them and re-parses. An
//! editor that finds nothing to do returns no edits, which is how the
//! idempotent ones report "unchanged".

pub mod imports;
pub mod literals;
pub mod members;
pub mod rename;

pub use imports::{add_import, remove_unused_imports, ImportSpec, ModuleSpecifier};
pub use literals::{insert_property_or_append_array, set_string_property, PropertyValue};
pub use rename::{rename_class_and_references, rename_in_file, rename_symbol};

use crate::source::{FileView, TextEdit};
use crate::syntax::TsNode;
use std::ops::Range;

/// Offset of a comma directly after `from`, skipping whitespace and comments.
pub(crate) fn comma_after(text: &str, from: usize, limit: usize) -> Option<usize> {
    next_token(text, from, limit).filter(|(_, c)| *c == ',').map(|(i, _)| i)
}

fn next_token(text: &str, from: usize, limit: usize) -> Option<(usize, char)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < limit {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < limit && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < limit && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
            }
            c => return Some((i, c as char)),
        }
    }
    None
}

/// Append `item` to a delimited list (`[]`, `{}` or `()`), following the
/// layout the list already has.
pub(crate) fn append_list_item(
    view: &FileView<'_>,
    container: &TsNode<'_>,
    items: &[TsNode<'_>],
    item: &str,
    padded: bool,
) -> TextEdit {
    let range = container.range();
    let open = range.start + 1;
    let close = range.end.saturating_sub(1);
    let text = view.text;

    let Some(last) = items.last() else {
        let inner = &text[open..close];
        return if inner.contains('\n') {
            let base = view.indent_at(range.start);
            TextEdit::replace(
                open..close,
                format!(
                    "\n{base}{}{item}{}\n{base}",
                    view.settings.indent,
                    view.settings.trailing_comma()
                ),
            )
        } else if padded {
            TextEdit::replace(open..close, format!(" {item} "))
        } else {
            TextEdit::replace(open..close, item.to_string())
        };
    };

    let first_start = items[0].range().start;
    let multiline = text[open..first_start].contains('\n');
    let after_last = last.range().end;
    let comma = comma_after(text, after_last, close);

    if multiline {
        let indent = view.indent_at(first_start);
        match comma {
            Some(pos) => TextEdit::insert(pos + 1, format!("\n{indent}{item},")),
            None => TextEdit::insert(after_last, format!(",\n{indent}{item}")),
        }
    } else {
        match comma {
            Some(pos) => TextEdit::insert(pos + 1, format!(" {item},")),
            None => TextEdit::insert(after_last, format!(", {item}")),
        }
    }
}

/// Range that removes `items[index]` from a delimited list together with
/// one separating comma.
pub(crate) fn list_item_removal(
    text: &str,
    container: &TsNode<'_>,
    items: &[TsNode<'_>],
    index: usize,
) -> Range<usize> {
    let range = container.range();
    let open = range.start + 1;
    let close = range.end.saturating_sub(1);
    let item = items[index].range();

    if items.len() == 1 {
        let inner = &text[open..close];
        if inner.contains('\n') {
            let end = comma_after(text, item.end, close).map(|c| c + 1).unwrap_or(item.end);
            return crate::syntax::full_line_range(text, item.start..end);
        }
        return open..close;
    }

    if index + 1 < items.len() {
        // Remove the item up to the start of the next one.
        item.start..items[index + 1].range().start
    } else {
        // Last item: remove from the end of the previous one, keeping a
        // trailing comma if the list had one.
        let prev_end = items[index - 1].range().end;
        let had_trailing = comma_after(text, item.end, close);
        match had_trailing {
            Some(pos) => {
                let start = comma_after(text, prev_end, item.start)
                    .map(|c| c + 1)
                    .unwrap_or(prev_end);
                start..pos + 1
            }
            None => prev_end..item.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use crate::source::SourceFile;
    use crate::syntax::{self, named_children};
    use pretty_assertions::assert_eq;

    fn append_to_first_array(source: &str, item: &str) -> String {
        let mut file = SourceFile::new("/p/a.ts", source);
        file.modify(&ManipulationSettings::default(), |view| {
            let array = view.root.dfs().find(|n| n.kind() == "array").unwrap();
            let items = named_children(&array);
            Ok(vec![append_list_item(view, &array, &items, item, false)])
        })
        .unwrap();
        file.text().to_string()
    }

    fn remove_from_first_array(source: &str, index: usize) -> String {
        let mut file = SourceFile::new("/p/a.ts", source);
        file.modify(&ManipulationSettings::default(), |view| {
            let array = view.root.dfs().find(|n| n.kind() == "array").unwrap();
            let items = named_children(&array);
            Ok(vec![TextEdit::delete(list_item_removal(
                view.text, &array, &items, index,
            ))])
        })
        .unwrap();
        file.text().to_string()
    }

    #[test]
    fn test_append_follows_layout() {
        assert_eq!(append_to_first_array("const a = [];", "X"), "const a = [X];");
        assert_eq!(append_to_first_array("const a = [A];", "X"), "const a = [A, X];");
        assert_eq!(
            append_to_first_array("const a = [\n    A,\n];", "X"),
            "const a = [\n    A,\n    X,\n];"
        );
        assert_eq!(
            append_to_first_array("const a = [\n    A\n];", "X"),
            "const a = [\n    A,\n    X\n];"
        );
    }

    #[test]
    fn test_remove_list_items() {
        assert_eq!(remove_from_first_array("const a = [A, B, C];", 1), "const a = [A, C];");
        assert_eq!(remove_from_first_array("const a = [A, B];", 1), "const a = [A];");
        assert_eq!(remove_from_first_array("const a = [A];", 0), "const a = [];");
        assert_eq!(
            remove_from_first_array("const a = [\n    A,\n    B,\n];", 1),
            "const a = [\n    A,\n];"
        );
    }

    #[test]
    fn test_comma_scanning_skips_comments() {
        let text = "a /* x */ , b";
        assert_eq!(comma_after(text, 1, text.len()), Some(10));
        assert!(syntax::line_start(text, 5) == 0);
    }
}
