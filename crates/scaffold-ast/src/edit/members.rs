//! Class and interface member edits.

use super::{append_list_item, list_item_removal};
use crate::error::AstError;
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, full_line_range, named_children, reindent, TsNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberPosition {
    Start,
    AfterProperties,
    End,
}

/// Insert a member snippet (written at column 0) into a class body.
pub fn add_class_member(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    snippet: &str,
    position: MemberPosition,
) -> Result<Vec<TextEdit>, AstError> {
    let body = syntax::class_body(class)
        .ok_or_else(|| view.shape_error("class without a body"))?;
    let base = view.indent_at(class.range().start);
    let indent = format!("{base}{}", view.settings.indent);
    let member = reindent(snippet, &indent);
    let members = syntax::class_members(class);
    let open = body.range().start + 1;
    let close = body.range().end - 1;

    if members.is_empty() {
        return Ok(vec![TextEdit::replace(
            open..close,
            format!("\n{member}\n{base}"),
        )]);
    }

    let anchor = match position {
        MemberPosition::Start => None,
        MemberPosition::AfterProperties => members
            .iter()
            .filter(|m| m.kind() == "public_field_definition")
            .last()
            .cloned(),
        MemberPosition::End => members.last().cloned(),
    };

    Ok(vec![match anchor {
        None => TextEdit::insert(open, format!("\n{member}\n")),
        Some(last) => {
            let end = member_end(view.text, &last);
            let gap = if position == MemberPosition::AfterProperties {
                "\n"
            } else {
                "\n\n"
            };
            TextEdit::insert(end, format!("{gap}{member}"))
        }
    }])
}

/// End of a member including a directly following `;`.
fn member_end(text: &str, member: &TsNode<'_>) -> usize {
    let end = member.range().end;
    if text[end..].starts_with(';') {
        end + 1
    } else {
        end
    }
}

/// Add `snippet` as a property unless a property named `name` exists.
pub fn add_class_property(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    name: &str,
    snippet: &str,
) -> Result<Vec<TextEdit>, AstError> {
    if syntax::find_property(class, name).is_some() {
        return Ok(Vec::new());
    }
    add_class_member(view, class, snippet, MemberPosition::AfterProperties)
}

/// Add `snippet` as a method unless a method named `name` exists.
pub fn add_method(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    name: &str,
    snippet: &str,
) -> Result<Vec<TextEdit>, AstError> {
    if syntax::find_method(class, name).is_some() {
        return Ok(Vec::new());
    }
    add_class_member(view, class, snippet, MemberPosition::End)
}

/// Replace a method body with `body` (statements written at column 0).
pub fn replace_method_body(
    view: &FileView<'_>,
    method: &TsNode<'_>,
    body: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let block = method
        .field("body")
        .ok_or_else(|| view.shape_error("method without a body"))?;
    let base = view.indent_at(syntax::member_extent(method).start);
    let indent = format!("{base}{}", view.settings.indent);
    let replacement = if body.trim().is_empty() {
        "{}".to_string()
    } else {
        format!("{{\n{}\n{base}}}", reindent(body, &indent))
    };
    if block.text() == replacement {
        return Ok(Vec::new());
    }
    Ok(vec![TextEdit::replace(block.range(), replacement)])
}

/// Append statements at the end of a method body.
pub fn append_to_method_body(
    view: &FileView<'_>,
    method: &TsNode<'_>,
    statements: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let block = method
        .field("body")
        .ok_or_else(|| view.shape_error("method without a body"))?;
    let existing = named_children(&block);
    if existing.is_empty() {
        return replace_method_body(view, method, statements);
    }
    let indent = view.indent_at(existing[0].range().start);
    let last = existing[existing.len() - 1].range().end;
    Ok(vec![TextEdit::insert(
        last,
        format!("\n{}", reindent(statements, &indent)),
    )])
}

/// Set (or add) a method's return type annotation.
pub fn set_method_return_type(
    view: &FileView<'_>,
    method: &TsNode<'_>,
    return_type: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let annotation = format!(": {return_type}");
    match method.field("return_type") {
        Some(existing) if existing.text() == annotation => Ok(Vec::new()),
        Some(existing) => Ok(vec![TextEdit::replace(existing.range(), annotation)]),
        None => {
            let params = method
                .field("parameters")
                .ok_or_else(|| view.shape_error("method without parameters"))?;
            Ok(vec![TextEdit::insert(params.range().end, annotation)])
        }
    }
}

pub fn remove_method(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    name: &str,
) -> Result<Vec<TextEdit>, AstError> {
    Ok(syntax::find_method(class, name)
        .map(|method| vec![TextEdit::delete(member_removal(view.text, &method))])
        .unwrap_or_default())
}

pub fn remove_class_property(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    name: &str,
) -> Result<Vec<TextEdit>, AstError> {
    Ok(syntax::find_property(class, name)
        .map(|property| vec![TextEdit::delete(member_removal(view.text, &property))])
        .unwrap_or_default())
}

/// Range removing a member, its decorators, its line(s) and one adjoining
/// blank line.
fn member_removal(text: &str, member: &TsNode<'_>) -> std::ops::Range<usize> {
    let extent = syntax::member_extent(member);
    let mut range = full_line_range(text, extent);
    let rest = &text[range.end..];
    let blank_after = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    if rest[blank_after..].starts_with('\n') {
        range.end += blank_after + 1;
    } else if range.start > 0 {
        // Last member: drop the blank line before it instead.
        let before = &text[..range.start];
        if before.ends_with("\n\n") {
            range.start -= 1;
        }
    }
    range
}

pub fn add_constructor_parameter(
    view: &FileView<'_>,
    constructor: &TsNode<'_>,
    parameter: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let params = constructor
        .field("parameters")
        .ok_or_else(|| view.shape_error("constructor without parameters"))?;
    let items = named_children(&params);
    Ok(vec![append_list_item(view, &params, &items, parameter, false)])
}

pub fn remove_constructor_parameter(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    name: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let mut edits = Vec::new();
    for constructor in syntax::constructors(class) {
        let Some(params) = constructor.field("parameters") else {
            continue;
        };
        let items = named_children(&params);
        if let Some(index) = items
            .iter()
            .position(|p| syntax::parameter_name(p).as_deref() == Some(name))
        {
            edits.push(TextEdit::delete(list_item_removal(
                view.text, &params, &items, index,
            )));
        }
    }
    Ok(edits)
}

pub fn add_implements(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    interface: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let implemented = syntax::implemented_types(class);
    if implemented
        .iter()
        .any(|(name, node)| name == interface || node.text() == interface)
    {
        return Ok(Vec::new());
    }
    if let Some((_, last)) = implemented.last() {
        return Ok(vec![TextEdit::insert(
            last.range().end,
            format!(", {interface}"),
        )]);
    }
    let anchor = syntax::extends_clause(class)
        .or_else(|| class.field("type_parameters"))
        .or_else(|| class.field("name"))
        .ok_or_else(|| view.shape_error("anonymous class"))?;
    Ok(vec![TextEdit::insert(
        anchor.range().end,
        format!(" implements {interface}"),
    )])
}

pub fn remove_implements(
    view: &FileView<'_>,
    class: &TsNode<'_>,
    interface: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let Some(clause) = syntax::implements_clause(class) else {
        return Ok(Vec::new());
    };
    let implemented = syntax::implemented_types(class);
    let Some(index) = implemented.iter().position(|(name, _)| name == interface) else {
        return Ok(Vec::new());
    };

    if implemented.len() == 1 {
        let start = clause.range().start;
        let trimmed = view.text[..start].trim_end_matches([' ', '\t']).len();
        return Ok(vec![TextEdit::delete(trimmed..clause.range().end)]);
    }

    let items: Vec<TsNode<'_>> = implemented.into_iter().map(|(_, n)| n).collect();
    let item = items[index].range();
    let range = if index + 1 < items.len() {
        item.start..items[index + 1].range().start
    } else {
        items[index - 1].range().end..item.end
    };
    Ok(vec![TextEdit::delete(range)])
}

/// Remove a property from an interface declared in the file.
pub fn remove_interface_property(
    view: &FileView<'_>,
    interface: &str,
    property: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let body = interface_body(view, interface)?;
    Ok(named_children(&body)
        .into_iter()
        .find(|m| syntax::member_name(m).as_deref() == Some(property))
        .map(|member| vec![TextEdit::delete(full_line_range(view.text, member.range()))])
        .unwrap_or_default())
}

/// Add `name: type;` (or `name?: type;`) to an interface unless present.
pub fn add_interface_property(
    view: &FileView<'_>,
    interface: &str,
    property: &str,
    snippet: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let body = interface_body(view, interface)?;
    let members = named_children(&body);
    if members
        .iter()
        .any(|m| syntax::member_name(m).as_deref() == Some(property))
    {
        return Ok(Vec::new());
    }
    let open = body.range().start + 1;
    let close = body.range().end - 1;
    let base = view.indent_at(body.range().start);
    let indent = format!("{base}{}", view.settings.indent);
    let line = reindent(snippet, &indent);
    Ok(vec![match members.last() {
        None => TextEdit::replace(open..close, format!("\n{line}\n{base}")),
        Some(last) => TextEdit::insert(member_end(view.text, last), format!("\n{line}")),
    }])
}

fn interface_body<'r>(view: &FileView<'r>, name: &str) -> Result<TsNode<'r>, AstError> {
    let declaration = syntax::find_declaration(&view.root, name)
        .filter(|d| d.kind == "interface_declaration")
        .ok_or_else(|| AstError::DeclarationNotFound {
            name: name.to_string(),
            path: view.path.to_path_buf(),
        })?;
    declaration
        .name_node
        .parent()
        .and_then(|decl| decl.field("body"))
        .ok_or_else(|| view.shape_error(format!("interface '{name}' has no body")))
}

/// Remove a top-level declaration (with its `export`) by name.
pub fn remove_declaration(view: &FileView<'_>, name: &str) -> Result<Vec<TextEdit>, AstError> {
    let Some(declaration) = syntax::find_declaration(&view.root, name) else {
        return Ok(Vec::new());
    };
    let mut range = full_line_range(view.text, declaration.node.range());
    let rest = &view.text[range.end..];
    if rest.starts_with('\n') {
        range.end += 1;
    }
    Ok(vec![TextEdit::delete(range)])
}

/// Insert a top-level statement above the declaration of `name`, separated
/// by a blank line. Nothing happens when `snippet` declares something that
/// already exists.
pub fn insert_before_declaration(
    view: &FileView<'_>,
    name: &str,
    declares: &str,
    snippet: &str,
) -> Result<Vec<TextEdit>, AstError> {
    if syntax::find_declaration(&view.root, declares).is_some() {
        return Ok(Vec::new());
    }
    let anchor =
        syntax::find_declaration(&view.root, name).ok_or_else(|| AstError::DeclarationNotFound {
            name: name.to_string(),
            path: view.path.to_path_buf(),
        })?;
    let start = syntax::line_start(view.text, anchor.node.range().start);
    Ok(vec![TextEdit::insert(start, format!("{}\n\n", snippet.trim_end()))])
}

/// Rename a member of `class` together with its `this.name` accesses.
/// Parameter properties (`private name: T`) count as members.
pub fn rename_member(
    class: &TsNode<'_>,
    old: &str,
    new: &str,
) -> Result<Vec<TextEdit>, AstError> {
    let mut edits = Vec::new();
    for member in syntax::class_members(class) {
        if let Some(name) = member.field("name") {
            if name.text() == old
                && matches!(
                    member.kind().as_ref(),
                    "method_definition" | "public_field_definition"
                )
            {
                edits.push(TextEdit::replace(name.range(), new));
            }
        }
    }
    for constructor in syntax::constructors(class) {
        for param in syntax::parameters(&constructor) {
            let is_property = syntax::child_of_kind(&param, "accessibility_modifier").is_some()
                || syntax::has_token(&param, "readonly");
            if let (true, Some(pattern)) = (is_property, param.field("pattern")) {
                if pattern.text() == old {
                    edits.push(TextEdit::replace(pattern.range(), new));
                }
            }
        }
    }
    for access in class.dfs().filter(|n| n.kind() == "member_expression") {
        let is_this = access
            .field("object")
            .map(|o| o.kind() == "this")
            .unwrap_or(false);
        if let (true, Some(property)) = (is_this, access.field("property")) {
            if property.text() == old {
                edits.push(TextEdit::replace(property.range(), new));
            }
        }
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use crate::source::SourceFile;
    use pretty_assertions::assert_eq;

    fn edit_class(
        source: &str,
        f: impl FnOnce(&FileView<'_>, &TsNode<'_>) -> Result<Vec<TextEdit>, AstError>,
    ) -> String {
        let mut file = SourceFile::new("/p/a.ts", source);
        file.modify(&ManipulationSettings::default(), |view| {
            let class = syntax::class_declarations(&view.root).remove(0);
            f(view, &class)
        })
        .unwrap();
        file.text().to_string()
    }

    #[test]
    fn test_add_method_is_idempotent() {
        let source = "export class A {\n    a = 1;\n}\n";
        let once = edit_class(source, |view, class| {
            add_method(view, class, "go", "go() {\n    return 1;\n}")
        });
        assert_eq!(
            once,
            "export class A {\n    a = 1;\n\n    go() {\n        return 1;\n    }\n}\n"
        );
        let twice = edit_class(&once, |view, class| add_method(view, class, "go", "go() {}"));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_add_property_into_empty_class() {
        let out = edit_class("class A {}\n", |view, class| {
            add_class_property(view, class, "b", "private b: string;")
        });
        assert_eq!(out, "class A {\n    private b: string;\n}\n");
    }

    #[test]
    fn test_add_property_after_properties() {
        let source = "class A {\n    a = 1;\n\n    go() {}\n}\n";
        let out = edit_class(source, |view, class| {
            add_class_property(view, class, "b", "b = 2;")
        });
        assert_eq!(out, "class A {\n    a = 1;\n    b = 2;\n\n    go() {}\n}\n");
    }

    #[test]
    fn test_replace_body_and_return_type() {
        let source = "class A {\n    async find(): Promise<X> {\n        return x;\n    }\n}\n";
        let out = edit_class(source, |view, class| {
            let method = syntax::find_method(class, "find").unwrap();
            let mut edits = replace_method_body(view, &method, "const y = 1;\nreturn y;")?;
            edits.extend(set_method_return_type(view, &method, "Promise<Y>")?);
            Ok(edits)
        });
        assert_eq!(
            out,
            "class A {\n    async find(): Promise<Y> {\n        const y = 1;\n        return y;\n    }\n}\n"
        );
    }

    #[test]
    fn test_remove_method_with_decorators() {
        let source = "class A {\n    a = 1;\n\n    @Query()\n    go() {}\n\n    stay() {}\n}\n";
        let out = edit_class(source, |view, class| remove_method(view, class, "go"));
        assert_eq!(out, "class A {\n    a = 1;\n\n    stay() {}\n}\n");
    }

    #[test]
    fn test_remove_last_method() {
        let source = "class A {\n    a = 1;\n\n    go() {}\n}\n";
        let out = edit_class(source, |view, class| remove_method(view, class, "go"));
        assert_eq!(out, "class A {\n    a = 1;\n}\n");
    }

    #[test]
    fn test_constructor_parameters() {
        let source = "class A {\n    constructor(\n        private a: A,\n        private b: B,\n    ) {}\n}\n";
        let removed = edit_class(source, |view, class| {
            remove_constructor_parameter(view, class, "a")
        });
        assert_eq!(
            removed,
            "class A {\n    constructor(\n        private b: B,\n    ) {}\n}\n"
        );
        let added = edit_class(&removed, |view, class| {
            let ctor = syntax::constructors(class).remove(0);
            add_constructor_parameter(view, &ctor, "private c: C")
        });
        assert_eq!(
            added,
            "class A {\n    constructor(\n        private b: B,\n        private c: C,\n    ) {}\n}\n"
        );
    }

    #[test]
    fn test_implements_clause() {
        let source = "export class A extends B implements X, Y {}\n";
        let out = edit_class(source, |view, class| remove_implements(view, class, "X"));
        assert_eq!(out, "export class A extends B implements Y {}\n");
        let out = edit_class(&out, |view, class| remove_implements(view, class, "Y"));
        assert_eq!(out, "export class A extends B {}\n");
        let out = edit_class(&out, |view, class| add_implements(view, class, "OnModuleInit"));
        assert_eq!(out, "export class A extends B implements OnModuleInit {}\n");
        let out = edit_class(&out, |view, class| add_implements(view, class, "Z"));
        assert_eq!(out, "export class A extends B implements OnModuleInit, Z {}\n");
    }

    #[test]
    fn test_interface_properties() {
        let source = "export interface Input {\n    id: ID;\n    translations: T[];\n}\n";
        let mut file = SourceFile::new("/p/a.ts", source);
        let settings = ManipulationSettings::default();
        file.modify(&settings, |view| {
            remove_interface_property(view, "Input", "translations")
        })
        .unwrap();
        file.modify(&settings, |view| {
            add_interface_property(view, "Input", "name", "name?: string;")
        })
        .unwrap();
        assert_eq!(
            file.text(),
            "export interface Input {\n    id: ID;\n    name?: string;\n}\n"
        );
    }

    #[test]
    fn test_insert_before_declaration() {
        let source = "import gql from 'graphql-tag';\n\nexport const adminApiExtensions = gql`\n`;\n";
        let mut file = SourceFile::new("/p/api-extensions.ts", source);
        let settings = ManipulationSettings::default();
        let snippet = "const reviewAdminApiExtensions = gql`\n    type Review\n`;";
        for _ in 0..2 {
            file.modify(&settings, |view| {
                insert_before_declaration(view, "adminApiExtensions", "reviewAdminApiExtensions", snippet)
            })
            .unwrap();
        }
        assert_eq!(
            file.text(),
            "import gql from 'graphql-tag';\n\nconst reviewAdminApiExtensions = gql`\n    type Review\n`;\n\nexport const adminApiExtensions = gql`\n`;\n"
        );
    }

    #[test]
    fn test_remove_declaration_and_rename_member() {
        let source = "export class TemplateEntity {}\n\nexport class A {\n    constructor(private svc: S) {}\n    go() {\n        return this.svc.go();\n    }\n}\n";
        let mut file = SourceFile::new("/p/a.ts", source);
        let settings = ManipulationSettings::default();
        file.modify(&settings, |view| remove_declaration(view, "TemplateEntity"))
            .unwrap();
        file.modify(&settings, |view| {
            let class = syntax::find_class(&view.root, "A").unwrap();
            rename_member(&class, "svc", "reviewService")
        })
        .unwrap();
        assert_eq!(
            file.text(),
            "export class A {\n    constructor(private reviewService: S) {}\n    go() {\n        return this.reviewService.go();\n    }\n}\n"
        );
    }
}
