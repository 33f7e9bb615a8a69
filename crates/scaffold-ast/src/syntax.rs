//! Thin helpers over the tree-sitter TypeScript grammar as exposed by ast-grep.
//!
//! Everything here is read-only: functions take nodes and return nodes, names
//! or byte offsets. Mutation goes through [`crate::source::TextEdit`].

use ast_grep_core::source::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::SupportLang;
use std::ops::Range;
use std::path::Path;

pub type TsDoc = StrDoc<SupportLang>;
pub type TsNode<'r> = Node<'r, TsDoc>;
pub type TsTree = AstGrep<TsDoc>;

pub const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration"];

pub fn language_for(path: &Path) -> SupportLang {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsx") | Some("jsx") => SupportLang::Tsx,
        _ => SupportLang::TypeScript,
    }
}

pub fn parse(text: &str, lang: SupportLang) -> TsTree {
    AstGrep::new(text, lang)
}

pub fn is_kind(node: &TsNode<'_>, kinds: &[&str]) -> bool {
    let kind = node.kind();
    kinds.iter().any(|k| kind == *k)
}

pub fn named_children<'r>(node: &TsNode<'r>) -> Vec<TsNode<'r>> {
    node.children()
        .filter(|c| c.is_named() && c.kind() != "comment")
        .collect()
}

pub fn child_of_kind<'r>(node: &TsNode<'r>, kind: &str) -> Option<TsNode<'r>> {
    node.children().find(|c| c.kind() == kind)
}

pub fn has_token(node: &TsNode<'_>, token: &str) -> bool {
    node.children().any(|c| !c.is_named() && c.kind() == token)
}

/// Byte offset of the first syntax error in the tree.
pub fn first_error(root: &TsNode<'_>) -> Option<usize> {
    root.dfs()
        .find(|n| n.kind() == "ERROR")
        .map(|n| n.range().start)
}

/// 1-based line and column of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.len() - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    (line, column)
}

pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0)
}

pub fn line_end(text: &str, offset: usize) -> usize {
    text[offset.min(text.len())..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len())
}

/// Leading whitespace of the line containing `offset`.
pub fn indent_at(text: &str, offset: usize) -> String {
    let start = line_start(text, offset);
    text[start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Prefix every non-empty line of `snippet` with `indent`.
pub fn reindent(snippet: &str, indent: &str) -> String {
    snippet
        .trim_matches('\n')
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extend a removal range so the whole line(s) disappear when the node is
/// the only thing on them.
pub fn full_line_range(text: &str, range: Range<usize>) -> Range<usize> {
    let start = line_start(text, range.start);
    let mut end = range.end;
    let rest = &text[end..];
    let trailing = rest.len() - rest.trim_start_matches([' ', '\t', ';']).len();
    end += trailing;

    let only_whitespace_before = text[start..range.start].trim().is_empty();
    let at_line_end = text[end..].starts_with('\n') || end == text.len();
    if only_whitespace_before && at_line_end {
        let end = if end < text.len() { end + 1 } else { end };
        start..end
    } else {
        range.start..end
    }
}

/// Text of a string literal without its quotes.
pub fn string_value(node: &TsNode<'_>) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let text = node.text();
    let inner = text.get(1..text.len().saturating_sub(1))?;
    Some(inner.to_string())
}

/// Name of a property key, unquoting string keys.
pub fn property_name(key: &TsNode<'_>) -> String {
    string_value(key).unwrap_or_else(|| key.text().to_string())
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

pub fn class_declarations<'r>(root: &TsNode<'r>) -> Vec<TsNode<'r>> {
    root.dfs().filter(|n| is_kind(n, CLASS_KINDS)).collect()
}

pub fn class_name(class: &TsNode<'_>) -> Option<String> {
    class.field("name").map(|n| n.text().to_string())
}

pub fn find_class<'r>(root: &TsNode<'r>, name: &str) -> Option<TsNode<'r>> {
    class_declarations(root)
        .into_iter()
        .find(|c| class_name(c).as_deref() == Some(name))
}

/// Decorators on a class, including those written before `export`.
pub fn class_decorators<'r>(class: &TsNode<'r>) -> Vec<TsNode<'r>> {
    let mut decorators: Vec<TsNode<'r>> = Vec::new();
    if let Some(parent) = class.parent() {
        if parent.kind() == "export_statement" {
            decorators.extend(parent.children().filter(|c| c.kind() == "decorator"));
        }
    }
    decorators.extend(class.children().filter(|c| c.kind() == "decorator"));
    decorators
}

/// Name a decorator is called by: `Foo` for `@Foo`, `@Foo(...)` and `@x.Foo()`.
pub fn decorator_name(decorator: &TsNode<'_>) -> Option<String> {
    let expr = named_children(decorator).into_iter().next()?;
    let callee = if expr.kind() == "call_expression" {
        expr.field("function")?
    } else {
        expr
    };
    match callee.kind().as_ref() {
        "identifier" => Some(callee.text().to_string()),
        "member_expression" => callee.field("property").map(|p| p.text().to_string()),
        _ => None,
    }
}

pub fn decorator_arguments<'r>(decorator: &TsNode<'r>) -> Vec<TsNode<'r>> {
    named_children(decorator)
        .into_iter()
        .find(|c| c.kind() == "call_expression")
        .and_then(|call| call.field("arguments"))
        .map(|args| named_children(&args))
        .unwrap_or_default()
}

pub fn find_decorator<'r>(decorators: &[TsNode<'r>], name: &str) -> Option<TsNode<'r>> {
    decorators
        .iter()
        .find(|d| decorator_name(d).as_deref() == Some(name))
        .cloned()
}

pub fn class_body<'r>(class: &TsNode<'r>) -> Option<TsNode<'r>> {
    class.field("body")
}

pub fn class_members<'r>(class: &TsNode<'r>) -> Vec<TsNode<'r>> {
    class_body(class)
        .map(|body| {
            named_children(&body)
                .into_iter()
                .filter(|m| m.kind() != "decorator")
                .collect()
        })
        .unwrap_or_default()
}

pub fn member_name(member: &TsNode<'_>) -> Option<String> {
    member.field("name").map(|n| property_name(&n))
}

pub fn is_static(member: &TsNode<'_>) -> bool {
    has_token(member, "static")
}

pub fn methods<'r>(class: &TsNode<'r>) -> Vec<TsNode<'r>> {
    class_members(class)
        .into_iter()
        .filter(|m| m.kind() == "method_definition")
        .collect()
}

pub fn find_method<'r>(class: &TsNode<'r>, name: &str) -> Option<TsNode<'r>> {
    methods(class)
        .into_iter()
        .find(|m| member_name(m).as_deref() == Some(name))
}

pub fn constructors<'r>(class: &TsNode<'r>) -> Vec<TsNode<'r>> {
    methods(class)
        .into_iter()
        .filter(|m| member_name(m).as_deref() == Some("constructor"))
        .collect()
}

pub fn class_properties<'r>(class: &TsNode<'r>) -> Vec<TsNode<'r>> {
    class_members(class)
        .into_iter()
        .filter(|m| m.kind() == "public_field_definition")
        .collect()
}

pub fn find_property<'r>(class: &TsNode<'r>, name: &str) -> Option<TsNode<'r>> {
    class_properties(class)
        .into_iter()
        .find(|p| member_name(p).as_deref() == Some(name))
}

/// Decorators attached to a class member.
pub fn member_decorators<'r>(member: &TsNode<'r>) -> Vec<TsNode<'r>> {
    let mut decorators: Vec<TsNode<'r>> = member
        .children()
        .filter(|c| c.kind() == "decorator")
        .collect();
    // Older grammars attach member decorators to the class body instead.
    if decorators.is_empty() {
        let mut prev = member.prev();
        while let Some(node) = prev {
            if node.kind() != "decorator" {
                break;
            }
            decorators.insert(0, node.clone());
            prev = node.prev();
        }
    }
    decorators
}

/// Byte range of a member including its decorators.
pub fn member_extent(member: &TsNode<'_>) -> Range<usize> {
    let range = member.range();
    let start = member_decorators(member)
        .first()
        .map(|d| d.range().start.min(range.start))
        .unwrap_or(range.start);
    start..range.end
}

pub fn heritage<'r>(class: &TsNode<'r>) -> Option<TsNode<'r>> {
    child_of_kind(class, "class_heritage")
}

pub fn extends_clause<'r>(class: &TsNode<'r>) -> Option<TsNode<'r>> {
    heritage(class).and_then(|h| child_of_kind(&h, "extends_clause"))
}

pub fn implements_clause<'r>(class: &TsNode<'r>) -> Option<TsNode<'r>> {
    heritage(class).and_then(|h| child_of_kind(&h, "implements_clause"))
}

/// Name of the base class, without type arguments.
pub fn extends_name(class: &TsNode<'_>) -> Option<String> {
    let clause = extends_clause(class)?;
    let value = clause
        .field("value")
        .or_else(|| named_children(&clause).into_iter().next())?;
    Some(value.text().to_string())
}

/// Interfaces in the `implements` list, each paired with its base name.
pub fn implemented_types<'r>(class: &TsNode<'r>) -> Vec<(String, TsNode<'r>)> {
    implements_clause(class)
        .map(|clause| {
            named_children(&clause)
                .into_iter()
                .map(|t| (type_base_name(&t), t))
                .collect()
        })
        .unwrap_or_default()
}

/// `Foo` for `Foo`, `Foo<Bar>` and `ns.Foo`.
pub fn type_base_name(ty: &TsNode<'_>) -> String {
    match ty.kind().as_ref() {
        "generic_type" => ty
            .field("name")
            .map(|n| type_base_name(&n))
            .unwrap_or_else(|| ty.text().to_string()),
        "nested_type_identifier" => ty
            .field("name")
            .map(|n| n.text().to_string())
            .unwrap_or_else(|| ty.text().to_string()),
        _ => ty.text().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parameters, types and literals
// ---------------------------------------------------------------------------

pub fn parameters<'r>(method: &TsNode<'r>) -> Vec<TsNode<'r>> {
    method
        .field("parameters")
        .map(|p| named_children(&p))
        .unwrap_or_default()
}

pub fn parameter_name(param: &TsNode<'_>) -> Option<String> {
    param.field("pattern").map(|p| p.text().to_string())
}

/// The type node inside a `type_annotation` (or the node itself).
pub fn annotation_type<'r>(annotation: &TsNode<'r>) -> Option<TsNode<'r>> {
    if annotation.kind() == "type_annotation" {
        named_children(annotation).into_iter().next()
    } else {
        Some(annotation.clone())
    }
}

pub fn is_nullish_type(ty: &TsNode<'_>) -> bool {
    matches!(ty.text().trim(), "null" | "undefined")
}

/// Members of a union, flattened across nested unions.
pub fn union_members<'r>(ty: &TsNode<'r>) -> Vec<TsNode<'r>> {
    if ty.kind() != "union_type" {
        return vec![ty.clone()];
    }
    named_children(ty)
        .iter()
        .flat_map(union_members)
        .collect()
}

pub fn type_arguments<'r>(generic: &TsNode<'r>) -> Vec<TsNode<'r>> {
    generic
        .field("type_arguments")
        .map(|args| named_children(&args))
        .unwrap_or_default()
}

pub fn object_members<'r>(object: &TsNode<'r>) -> Vec<TsNode<'r>> {
    named_children(object)
}

pub fn find_pair<'r>(object: &TsNode<'r>, name: &str) -> Option<TsNode<'r>> {
    object_members(object).into_iter().find(|m| {
        m.kind() == "pair" && m.field("key").map(|k| property_name(&k)).as_deref() == Some(name)
    })
}

pub fn find_member<'r>(object: &TsNode<'r>, name: &str) -> Option<TsNode<'r>> {
    object_members(object).into_iter().find(|m| match m.kind().as_ref() {
        "pair" => m.field("key").map(|k| property_name(&k)).as_deref() == Some(name),
        "shorthand_property_identifier" => m.text() == name,
        "method_definition" => member_name(m).as_deref() == Some(name),
        _ => false,
    })
}

/// Unwrap `as`/`satisfies`/parentheses around an expression.
pub fn unwrap_expression<'r>(expr: &TsNode<'r>) -> TsNode<'r> {
    match expr.kind().as_ref() {
        "as_expression" | "satisfies_expression" | "parenthesized_expression"
        | "non_null_expression" => named_children(expr)
            .into_iter()
            .next()
            .map(|inner| unwrap_expression(&inner))
            .unwrap_or_else(|| expr.clone()),
        _ => expr.clone(),
    }
}

// ---------------------------------------------------------------------------
// Top-level declarations
// ---------------------------------------------------------------------------

/// A named top-level declaration. `node` is the outermost statement (the
/// `export_statement` when exported), `name_node` the declared identifier.
#[derive(Clone)]
pub struct Declaration<'r> {
    pub name: String,
    pub kind: String,
    pub node: TsNode<'r>,
    pub name_node: TsNode<'r>,
}

const DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "function_declaration",
    "lexical_declaration",
    "variable_declaration",
];

pub fn top_level_declarations<'r>(root: &TsNode<'r>) -> Vec<Declaration<'r>> {
    let mut out = Vec::new();
    for statement in named_children(root) {
        let inner = if statement.kind() == "export_statement" {
            match statement.field("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            statement.clone()
        };
        if !is_kind(&inner, DECLARATION_KINDS) {
            continue;
        }
        let kind = inner.kind().to_string();
        if kind == "lexical_declaration" || kind == "variable_declaration" {
            for declarator in named_children(&inner) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name_node) = declarator.field("name") {
                    out.push(Declaration {
                        name: name_node.text().to_string(),
                        kind: kind.clone(),
                        node: statement.clone(),
                        name_node,
                    });
                }
            }
        } else if let Some(name_node) = inner.field("name") {
            out.push(Declaration {
                name: name_node.text().to_string(),
                kind,
                node: statement.clone(),
                name_node,
            });
        }
    }
    out
}

pub fn find_declaration<'r>(root: &TsNode<'r>, name: &str) -> Option<Declaration<'r>> {
    top_level_declarations(root)
        .into_iter()
        .find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLUGIN: &str = r#"import { PluginCommonModule, VendurePlugin } from '@vendure/core';

@VendurePlugin({
    imports: [PluginCommonModule],
    entities: [Review],
})
export class ReviewsPlugin extends BasePlugin implements OnModuleInit, HasCustomFields<X> {
    static ui: AdminUiExtension = {};

    constructor(private service: ReviewService) {}

    onModuleInit(): void {}
}
"#;

    #[test]
    fn test_decorators_before_export_are_found() {
        let tree = parse(PLUGIN, SupportLang::TypeScript);
        let root = tree.root();
        let class = find_class(&root, "ReviewsPlugin").unwrap();
        let decorators = class_decorators(&class);
        assert_eq!(decorators.len(), 1);
        assert_eq!(decorator_name(&decorators[0]).as_deref(), Some("VendurePlugin"));
        let args = decorator_arguments(&decorators[0]);
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].kind(), "object");
        assert!(find_pair(&args[0], "entities").is_some());
    }

    #[test]
    fn test_class_heritage() {
        let tree = parse(PLUGIN, SupportLang::TypeScript);
        let class = find_class(&tree.root(), "ReviewsPlugin").unwrap();
        assert_eq!(extends_name(&class).as_deref(), Some("BasePlugin"));
        let names: Vec<String> = implemented_types(&class)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["OnModuleInit", "HasCustomFields"]);
    }

    #[test]
    fn test_members() {
        let tree = parse(PLUGIN, SupportLang::TypeScript);
        let class = find_class(&tree.root(), "ReviewsPlugin").unwrap();
        let ui = find_property(&class, "ui").unwrap();
        assert!(is_static(&ui));
        assert_eq!(constructors(&class).len(), 1);
        let params = parameters(&constructors(&class)[0]);
        assert_eq!(parameter_name(&params[0]).as_deref(), Some("service"));
        assert!(find_method(&class, "onModuleInit").is_some());
    }

    #[test]
    fn test_top_level_declarations() {
        let source = "export class A {}\ninterface B {}\nexport const c = 1, d = 2;\ntype E = A;\n";
        let tree = parse(source, SupportLang::TypeScript);
        let names: Vec<String> = top_level_declarations(&tree.root())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "c", "d", "E"]);
    }

    #[test]
    fn test_first_error_position() {
        let source = "class A {\n    foo(: {\n}\n";
        let tree = parse(source, SupportLang::TypeScript);
        let offset = first_error(&tree.root()).unwrap();
        let (line, _) = line_col(source, offset);
        assert!(line >= 2);
        assert!(first_error(&parse("class A {}", SupportLang::TypeScript).root()).is_none());
    }

    #[test]
    fn test_reindent_and_line_helpers() {
        assert_eq!(reindent("a\n\n  b\n", "    "), "    a\n\n      b");
        let text = "x\n    foo;\ny";
        let start = text.find("foo").unwrap();
        assert_eq!(indent_at(text, start), "    ");
        assert_eq!(full_line_range(text, start..start + 3), 2..11);
        assert_eq!(line_col(text, start), (2, 5));
    }
}
