//! Import declarations: idempotent merge-or-create and unused-import cleanup.

use super::{append_list_item, list_item_removal};
use crate::error::AstError;
use crate::project::Project;
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, named_children, TsNode};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSpecifier {
    /// A package or an already relative specifier, used as written.
    Literal(String),
    /// A project file; turned into a relative specifier from the importer.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub module: ModuleSpecifier,
    pub named: Vec<String>,
    pub namespace: Option<String>,
    pub default: Option<String>,
    /// Position among the file's import declarations for a new declaration.
    /// `None` appends after the last one.
    pub order: Option<usize>,
}

impl ImportSpec {
    pub fn named(module: ModuleSpecifier, names: &[&str]) -> Self {
        Self {
            module,
            named: names.iter().map(|n| n.to_string()).collect(),
            namespace: None,
            default: None,
            order: None,
        }
    }

    pub fn from_package(package: &str, names: &[&str]) -> Self {
        Self::named(ModuleSpecifier::Literal(package.to_string()), names)
    }

    pub fn from_file(path: impl Into<PathBuf>, names: &[&str]) -> Self {
        Self::named(ModuleSpecifier::File(path.into()), names)
    }

    pub fn namespace(module: ModuleSpecifier, alias: &str) -> Self {
        Self {
            module,
            named: Vec::new(),
            namespace: Some(alias.to_string()),
            default: None,
            order: None,
        }
    }

    pub fn default_import(module: ModuleSpecifier, name: &str) -> Self {
        Self {
            module,
            named: Vec::new(),
            namespace: None,
            default: Some(name.to_string()),
            order: None,
        }
    }
}

/// Add the imports described by `spec` to `file`, merging into an existing
/// declaration for the same module. Returns whether the file changed.
pub fn add_import(project: &mut Project, file: &Path, spec: &ImportSpec) -> Result<bool, AstError> {
    let file = project.absolute_path(file);
    let specifier = match &spec.module {
        ModuleSpecifier::Literal(s) => s.clone(),
        ModuleSpecifier::File(target) => project.module_specifier(&file, target),
    };
    if let ModuleSpecifier::File(target) = &spec.module {
        if project.absolute_path(target) == file {
            return Ok(false);
        }
    }

    let changed = project.modify_file(&file, |view| import_edits(view, &specifier, spec))?;
    if changed {
        debug!("Updated imports of '{}' in {}", specifier, file.display());
    }
    Ok(changed)
}

struct ExistingImport<'r> {
    node: TsNode<'r>,
    default: Option<TsNode<'r>>,
    namespace: Option<String>,
    named_imports: Option<TsNode<'r>>,
    /// Local names bound by the named imports.
    named: Vec<String>,
    type_only: bool,
}

fn existing_imports<'r>(root: &TsNode<'r>, specifier: &str) -> Vec<ExistingImport<'r>> {
    named_children(root)
        .into_iter()
        .filter(|s| s.kind() == "import_statement")
        .filter(|s| {
            s.field("source")
                .and_then(|src| syntax::string_value(&src))
                .as_deref()
                == Some(specifier)
        })
        .map(|node| {
            let clause = syntax::child_of_kind(&node, "import_clause");
            let default = clause.as_ref().and_then(|c| {
                named_children(c)
                    .into_iter()
                    .find(|n| n.kind() == "identifier")
            });
            let namespace = clause
                .as_ref()
                .and_then(|c| syntax::child_of_kind(c, "namespace_import"))
                .and_then(|ns| {
                    named_children(&ns)
                        .into_iter()
                        .find(|n| n.kind() == "identifier")
                })
                .map(|id| id.text().to_string());
            let named_imports = clause
                .as_ref()
                .and_then(|c| syntax::child_of_kind(c, "named_imports"));
            let named = named_imports
                .as_ref()
                .map(|ni| {
                    named_children(ni)
                        .iter()
                        .filter_map(specifier_local_name)
                        .collect()
                })
                .unwrap_or_default();
            let type_only = syntax::has_token(&node, "type");
            ExistingImport {
                node,
                default,
                namespace,
                named_imports,
                named,
                type_only,
            }
        })
        .collect()
}

fn specifier_local_name(specifier: &TsNode<'_>) -> Option<String> {
    specifier
        .field("alias")
        .or_else(|| specifier.field("name"))
        .map(|n| n.text().to_string())
}

fn import_edits(
    view: &FileView<'_>,
    specifier: &str,
    spec: &ImportSpec,
) -> Result<Vec<TextEdit>, AstError> {
    let existing = existing_imports(&view.root, specifier);
    let mut edits = Vec::new();
    let mut new_clauses: Vec<String> = Vec::new();

    // A module already bound by a default or namespace import keeps that binding.
    if let Some(alias) = &spec.namespace {
        if !existing
            .iter()
            .any(|e| e.default.is_some() || e.namespace.is_some())
        {
            new_clauses.push(format!("* as {alias}"));
        }
    }

    let mut pending_default = spec.default.clone();
    if let Some(name) = &spec.default {
        if existing
            .iter()
            .any(|e| e.default.as_ref().map(|d| d.text().to_string()).as_deref() == Some(name.as_str()))
        {
            pending_default = None;
        }
    }

    let bound: HashSet<&str> = existing
        .iter()
        .filter(|e| !e.type_only)
        .flat_map(|e| e.named.iter().map(String::as_str))
        .collect();
    let mut missing: Vec<&str> = Vec::new();
    for name in &spec.named {
        if !bound.contains(name.as_str()) && !missing.contains(&name.as_str()) {
            missing.push(name);
        }
    }

    let mergeable = existing
        .iter()
        .find(|e| !e.type_only && e.namespace.is_none());

    if let Some(target) = mergeable {
        if let (Some(name), None) = (&pending_default, &target.default) {
            let clause_start = syntax::child_of_kind(&target.node, "import_clause")
                .map(|c| c.range().start);
            if let Some(start) = clause_start {
                edits.push(TextEdit::insert(start, format!("{name}, ")));
                pending_default = None;
            }
        }
        if !missing.is_empty() {
            match &target.named_imports {
                Some(named_imports) => {
                    let items = named_children(named_imports);
                    if items.is_empty() {
                        edits.push(append_list_item(
                            view,
                            named_imports,
                            &items,
                            &missing.join(", "),
                            true,
                        ));
                    } else {
                        let mut edit =
                            append_list_item(view, named_imports, &items, missing[0], true);
                        for name in &missing[1..] {
                            let separator = if edit.text.contains('\n') {
                                format!("\n{}", view.indent_at(items[0].range().start))
                            } else {
                                " ".to_string()
                            };
                            if edit.text.ends_with(',') {
                                edit.text.push_str(&format!("{separator}{name},"));
                            } else {
                                edit.text.push_str(&format!(",{separator}{name}"));
                            }
                        }
                        edits.push(edit);
                    }
                }
                None => match &target.default {
                    Some(default) => edits.push(TextEdit::insert(
                        default.range().end,
                        format!(", {{ {} }}", missing.join(", ")),
                    )),
                    None => new_clauses.push(format!("{{ {} }}", missing.join(", "))),
                },
            }
        }
    } else if !missing.is_empty() || pending_default.is_some() {
        let mut parts = Vec::new();
        if let Some(name) = pending_default.take() {
            parts.push(name);
        }
        if !missing.is_empty() {
            parts.push(format!("{{ {} }}", missing.join(", ")));
        }
        new_clauses.push(parts.join(", "));
    }

    if let Some(name) = pending_default {
        new_clauses.push(name);
    }

    for clause in new_clauses {
        let statement = format!(
            "import {clause} from {};",
            view.settings.quote(specifier)
        );
        edits.push(new_declaration_edit(view, &statement, spec.order));
    }

    Ok(edits)
}

fn new_declaration_edit(view: &FileView<'_>, statement: &str, order: Option<usize>) -> TextEdit {
    let imports: Vec<TsNode<'_>> = named_children(&view.root)
        .into_iter()
        .filter(|s| s.kind() == "import_statement")
        .collect();

    if let Some(index) = order {
        if let Some(before) = imports.get(index) {
            return TextEdit::insert(before.range().start, format!("{statement}\n"));
        }
    }
    match imports.last() {
        Some(last) => TextEdit::insert(last.range().end, format!("\n{statement}")),
        None => {
            if view.text.trim().is_empty() {
                TextEdit::insert(0, format!("{statement}\n"))
            } else {
                TextEdit::insert(0, format!("{statement}\n\n"))
            }
        }
    }
}

/// Remove named and default imports whose local name is never referenced,
/// and declarations left empty by that. Side-effect imports are kept.
pub fn remove_unused_imports(view: &FileView<'_>) -> Result<Vec<TextEdit>, AstError> {
    let used = referenced_names(&view.root);
    let mut edits = Vec::new();

    for statement in named_children(&view.root) {
        if statement.kind() != "import_statement" {
            continue;
        }
        let Some(clause) = syntax::child_of_kind(&statement, "import_clause") else {
            continue;
        };

        let mut bindings = 0usize;
        let mut unused_specifiers: Vec<usize> = Vec::new();
        let mut default_unused = false;
        let mut namespace_unused = false;
        let named_imports = syntax::child_of_kind(&clause, "named_imports");
        let specifiers = named_imports
            .as_ref()
            .map(named_children)
            .unwrap_or_default();

        for part in named_children(&clause) {
            match part.kind().as_ref() {
                "identifier" => {
                    bindings += 1;
                    default_unused = !used.contains(part.text().as_ref());
                }
                "namespace_import" => {
                    bindings += 1;
                    namespace_unused = named_children(&part)
                        .first()
                        .map(|id| !used.contains(id.text().as_ref()))
                        .unwrap_or(false);
                }
                _ => {}
            }
        }
        for (i, specifier) in specifiers.iter().enumerate() {
            bindings += 1;
            if let Some(local) = specifier_local_name(specifier) {
                if !used.contains(local.as_str()) {
                    unused_specifiers.push(i);
                }
            }
        }

        let unused_count =
            unused_specifiers.len() + usize::from(default_unused) + usize::from(namespace_unused);
        if unused_count == 0 {
            continue;
        }
        if unused_count == bindings {
            edits.push(TextEdit::delete(syntax::full_line_range(
                view.text,
                statement.range(),
            )));
            continue;
        }
        if default_unused || namespace_unused {
            // Mixed default/namespace clauses are rare; leave them intact.
            continue;
        }
        if let Some(named_imports) = &named_imports {
            if unused_specifiers.len() == specifiers.len() {
                // Drop `, { ... }` after a used default import.
                let start = named_children(&clause)
                    .iter()
                    .find(|n| n.kind() == "identifier")
                    .map(|d| d.range().end)
                    .unwrap_or(named_imports.range().start);
                edits.push(TextEdit::delete(start..named_imports.range().end));
                continue;
            }
            // Remove from the back so ranges computed on the original text stay disjoint.
            let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
            let mut remaining: Vec<usize> = (0..specifiers.len()).collect();
            for &index in unused_specifiers.iter().rev() {
                let items: Vec<TsNode<'_>> =
                    remaining.iter().map(|&i| specifiers[i].clone()).collect();
                let position = remaining.iter().position(|&i| i == index).unwrap_or(0);
                ranges.push(list_item_removal(view.text, named_imports, &items, position));
                remaining.remove(position);
            }
            merge_ranges(&mut ranges);
            edits.extend(ranges.into_iter().map(TextEdit::delete));
        }
    }

    Ok(edits)
}

fn merge_ranges(ranges: &mut Vec<std::ops::Range<usize>>) {
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<std::ops::Range<usize>> = Vec::new();
    for range in ranges.drain(..) {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    *ranges = merged;
}

/// Identifier texts used outside import declarations.
fn referenced_names(root: &TsNode<'_>) -> HashSet<String> {
    root.dfs()
        .filter(|n| {
            matches!(
                n.kind().as_ref(),
                "identifier"
                    | "type_identifier"
                    | "shorthand_property_identifier"
                    | "jsx_identifier"
            )
        })
        .filter(|n| !inside_import(n))
        .map(|n| n.text().to_string())
        .collect()
}

fn inside_import(node: &TsNode<'_>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "import_statement" {
            return true;
        }
        current = parent.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    fn project_with(path: &str, text: &str) -> Project {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(Path::new(path), text);
        project
    }

    fn text(project: &Project, path: &str) -> String {
        project.file(Path::new(path)).unwrap().text().to_string()
    }

    #[test]
    fn test_add_import_is_idempotent() {
        let mut project = project_with("src/a.ts", "export class A {}\n");
        let spec = ImportSpec::from_package("@vendure/core", &["Injectable"]);
        assert!(add_import(&mut project, Path::new("src/a.ts"), &spec).unwrap());
        assert!(!add_import(&mut project, Path::new("src/a.ts"), &spec).unwrap());
        assert_eq!(
            text(&project, "src/a.ts"),
            "import { Injectable } from '@vendure/core';\n\nexport class A {}\n"
        );
    }

    #[test]
    fn test_add_import_merges_named_imports() {
        let mut project = project_with(
            "src/a.ts",
            "import { A } from '@vendure/core';\nimport { X } from './x';\n",
        );
        let spec = ImportSpec::from_package("@vendure/core", &["A", "B", "C"]);
        assert!(add_import(&mut project, Path::new("src/a.ts"), &spec).unwrap());
        assert_eq!(
            text(&project, "src/a.ts"),
            "import { A, B, C } from '@vendure/core';\nimport { X } from './x';\n"
        );
    }

    #[test]
    fn test_add_import_multiline_named_imports() {
        let mut project = project_with(
            "src/a.ts",
            "import {\n    A,\n    B,\n} from '@vendure/core';\n",
        );
        let spec = ImportSpec::from_package("@vendure/core", &["C", "D"]);
        add_import(&mut project, Path::new("src/a.ts"), &spec).unwrap();
        assert_eq!(
            text(&project, "src/a.ts"),
            "import {\n    A,\n    B,\n    C,\n    D,\n} from '@vendure/core';\n"
        );
    }

    #[test]
    fn test_add_import_from_file_uses_relative_specifier() {
        let mut project = project_with(
            "src/plugins/reviews/reviews.plugin.ts",
            "import { PluginCommonModule } from '@vendure/core';\n\nexport class ReviewsPlugin {}\n",
        );
        let spec = ImportSpec::from_file(
            "/p/src/plugins/reviews/entities/review.entity.ts",
            &["Review"],
        );
        add_import(&mut project, Path::new("src/plugins/reviews/reviews.plugin.ts"), &spec).unwrap();
        assert_eq!(
            text(&project, "src/plugins/reviews/reviews.plugin.ts"),
            "import { PluginCommonModule } from '@vendure/core';\nimport { Review } from './entities/review.entity';\n\nexport class ReviewsPlugin {}\n"
        );
    }

    #[test]
    fn test_namespace_and_default_imports() {
        let mut project = project_with("src/a.ts", "import { A } from 'lib';\n");
        let path = Path::new("src/a.ts");
        add_import(
            &mut project,
            path,
            &ImportSpec::namespace(ModuleSpecifier::Literal("path".into()), "path"),
        )
        .unwrap();
        add_import(
            &mut project,
            path,
            &ImportSpec::default_import(ModuleSpecifier::Literal("lib".into()), "lib"),
        )
        .unwrap();
        assert!(!add_import(
            &mut project,
            path,
            &ImportSpec::namespace(ModuleSpecifier::Literal("path".into()), "path"),
        )
        .unwrap());
        assert_eq!(
            text(&project, "src/a.ts"),
            "import lib, { A } from 'lib';\nimport * as path from 'path';\n"
        );
    }

    #[test]
    fn test_namespace_skipped_when_module_already_bound() {
        let original = "import lib from 'lib';\nimport * as other from 'other';\n";
        let mut project = project_with("src/a.ts", original);
        let path = Path::new("src/a.ts");
        assert!(!add_import(
            &mut project,
            path,
            &ImportSpec::namespace(ModuleSpecifier::Literal("lib".into()), "ns"),
        )
        .unwrap());
        assert!(!add_import(
            &mut project,
            path,
            &ImportSpec::namespace(ModuleSpecifier::Literal("other".into()), "ns2"),
        )
        .unwrap());
        assert_eq!(text(&project, "src/a.ts"), original);
    }

    #[test]
    fn test_add_import_respects_order_and_quotes() {
        let mut project = Project::in_memory(
            "/p",
            ManipulationSettings {
                quote: crate::settings::QuoteKind::Double,
                ..ManipulationSettings::default()
            },
        );
        project.add_source_file(Path::new("a.ts"), "import { B } from \"b\";\n");
        let mut spec = ImportSpec::from_package("a", &["A"]);
        spec.order = Some(0);
        add_import(&mut project, Path::new("a.ts"), &spec).unwrap();
        assert_eq!(
            text(&project, "a.ts"),
            "import { A } from \"a\";\nimport { B } from \"b\";\n"
        );
    }

    #[test]
    fn test_remove_unused_imports() {
        let mut project = project_with(
            "src/a.ts",
            "import { A, B, C } from 'x';\nimport { D } from 'y';\nimport 'reflect-metadata';\n\nexport class E extends A implements C {}\n",
        );
        project
            .modify_file(Path::new("src/a.ts"), remove_unused_imports)
            .unwrap();
        assert_eq!(
            text(&project, "src/a.ts"),
            "import { A, C } from 'x';\nimport 'reflect-metadata';\n\nexport class E extends A implements C {}\n"
        );
    }
}
