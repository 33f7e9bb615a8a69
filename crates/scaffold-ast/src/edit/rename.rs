//! Whole-symbol rename across the project.
//!
//! Identifier nodes are renamed in the declaring file and in every file that
//! imports the symbol, following `export { X } from` and `export * from`
//! re-exports. Aliased imports keep their alias; only the imported name
//! changes. Object shorthand `{ Old }` becomes `{ Old: New }` so the property
//! key is preserved, and `{ New: New }` collapses back to `{ New }`. Local
//! shadowing is not tracked.

use crate::error::AstError;
use crate::project::Project;
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, named_children, TsNode};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rename a class and every reference to it. Returns the number of files
/// changed.
pub fn rename_class_and_references(
    project: &mut Project,
    file: &Path,
    old: &str,
    new: &str,
) -> Result<usize, AstError> {
    let path = project.absolute_path(file);
    {
        let source = project.file(&path)?;
        if syntax::find_class(&source.root(), old).is_none() {
            return Err(AstError::ClassNotFound {
                name: old.to_string(),
                path,
            });
        }
    }
    rename_symbol(project, &path, old, new)
}

/// Rename any top-level declaration and its references.
pub fn rename_symbol(
    project: &mut Project,
    file: &Path,
    old: &str,
    new: &str,
) -> Result<usize, AstError> {
    if old == new {
        return Ok(0);
    }
    let declaring = project.absolute_path(file);
    let mut plan: BTreeMap<PathBuf, Vec<TextEdit>> = BTreeMap::new();

    {
        let source = project.file(&declaring)?;
        let root = source.root();
        if syntax::find_declaration(&root, old).is_none() {
            return Err(AstError::DeclarationNotFound {
                name: old.to_string(),
                path: declaring,
            });
        }
        let excluded: Vec<Range<usize>> = named_children(&root)
            .into_iter()
            .filter(|s| s.kind() == "import_statement")
            .map(|s| s.range())
            .collect();
        plan.insert(
            declaring.clone(),
            identifier_edits(&root, old, new, &excluded),
        );
    }

    let mut queue: VecDeque<PathBuf> = VecDeque::from([declaring.clone()]);
    let mut visited: HashSet<PathBuf> = HashSet::from([declaring.clone()]);

    while let Some(exporter) = queue.pop_front() {
        for path in project.paths() {
            if path == exporter {
                continue;
            }
            let source = project.file(&path)?;
            let root = source.root();
            let mut edits = Vec::new();
            let mut binds_locally = false;
            let mut foreign_imports = Vec::new();

            for statement in named_children(&root) {
                let kind = statement.kind();
                if kind != "import_statement" && kind != "export_statement" {
                    continue;
                }
                let Some(specifier) = statement
                    .field("source")
                    .and_then(|s| syntax::string_value(&s))
                else {
                    continue;
                };
                let from_exporter =
                    project.resolve_import(&path, &specifier).as_deref() == Some(exporter.as_path());
                if !from_exporter {
                    if kind == "import_statement" {
                        foreign_imports.push(statement.range());
                    }
                    continue;
                }

                if kind == "import_statement" {
                    if let Some(alias) = namespace_alias(&statement) {
                        edits.extend(namespace_edits(&root, &alias, old, new));
                    }
                    for spec in statement.dfs().filter(|n| n.kind() == "import_specifier") {
                        let Some(name) = spec.field("name") else {
                            continue;
                        };
                        if name.text() != old {
                            continue;
                        }
                        if spec.field("alias").is_some() {
                            edits.push(TextEdit::replace(name.range(), new));
                        } else {
                            binds_locally = true;
                        }
                    }
                } else {
                    let clause = syntax::child_of_kind(&statement, "export_clause");
                    match clause {
                        None => {
                            // `export * from` re-exports the symbol unchanged.
                            if visited.insert(path.clone()) {
                                queue.push_back(path.clone());
                            }
                        }
                        Some(clause) => {
                            for spec in named_children(&clause) {
                                let Some(name) = spec.field("name") else {
                                    continue;
                                };
                                if name.text() != old {
                                    continue;
                                }
                                edits.push(TextEdit::replace(name.range(), new));
                                if spec.field("alias").is_none() && visited.insert(path.clone()) {
                                    queue.push_back(path.clone());
                                }
                            }
                        }
                    }
                }
            }

            if binds_locally {
                edits.extend(identifier_edits(
                    &root,
                    old,
                    new,
                    &foreign_imports,
                ));
                if exports_locally(&root, old) && visited.insert(path.clone()) {
                    queue.push_back(path.clone());
                }
            }

            if !edits.is_empty() {
                plan.entry(path.clone()).or_default().extend(edits);
            }
        }
    }

    let mut changed = 0;
    for (path, edits) in plan {
        let edits = dedup_edits(edits);
        if project.file_mut(&path)?.apply(edits)? {
            debug!("Renamed {} -> {} in {}", old, new, path.display());
            changed += 1;
        }
    }
    Ok(changed)
}

/// Rename references to `old` within a single file, declaration included.
pub fn rename_in_file(view: &FileView<'_>, old: &str, new: &str) -> Result<Vec<TextEdit>, AstError> {
    Ok(identifier_edits(&view.root, old, new, &[]))
}

fn dedup_edits(edits: Vec<TextEdit>) -> Vec<TextEdit> {
    let mut by_range: BTreeMap<(usize, usize), TextEdit> = BTreeMap::new();
    for edit in edits {
        by_range
            .entry((edit.range.start, edit.range.end))
            .or_insert(edit);
    }
    by_range.into_values().collect()
}

fn namespace_alias(import: &TsNode<'_>) -> Option<String> {
    let clause = syntax::child_of_kind(import, "import_clause")?;
    let namespace = syntax::child_of_kind(&clause, "namespace_import")?;
    named_children(&namespace)
        .into_iter()
        .find(|n| n.kind() == "identifier")
        .map(|id| id.text().to_string())
}

fn namespace_edits(root: &TsNode<'_>, alias: &str, old: &str, new: &str) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    for node in root.dfs() {
        let (module, name) = match node.kind().as_ref() {
            "member_expression" => (node.field("object"), node.field("property")),
            "nested_type_identifier" => (node.field("module"), node.field("name")),
            _ => continue,
        };
        if let (Some(module), Some(name)) = (module, name) {
            if module.text() == alias && name.text() == old {
                edits.push(TextEdit::replace(name.range(), new));
            }
        }
    }
    edits
}

/// Whether the file has a source-less `export { old }`.
fn exports_locally(root: &TsNode<'_>, old: &str) -> bool {
    named_children(root).iter().any(|statement| {
        statement.kind() == "export_statement"
            && statement.field("source").is_none()
            && syntax::child_of_kind(statement, "export_clause")
                .map(|clause| {
                    named_children(&clause).iter().any(|spec| {
                        spec.field("name").map(|n| n.text() == old).unwrap_or(false)
                            && spec.field("alias").is_none()
                    })
                })
                .unwrap_or(false)
    })
}

fn identifier_edits(
    root: &TsNode<'_>,
    old: &str,
    new: &str,
    excluded: &[Range<usize>],
) -> Vec<TextEdit> {
    let is_excluded = |range: &Range<usize>| {
        excluded
            .iter()
            .any(|ex| ex.start <= range.start && range.end <= ex.end)
    };
    let mut edits = Vec::new();

    for node in root.dfs() {
        let kind = node.kind();
        let range = node.range();
        match kind.as_ref() {
            "identifier" | "type_identifier" => {
                if node.text() != old || is_excluded(&range) {
                    continue;
                }
                let parent = node.parent();
                if let Some(parent) = &parent {
                    if parent.kind() == "nested_type_identifier"
                        && parent
                            .field("name")
                            .map(|n| n.range() == range)
                            .unwrap_or(false)
                    {
                        continue;
                    }
                    if parent.kind() == "pair" {
                        let is_value = parent
                            .field("value")
                            .map(|v| v.range() == range)
                            .unwrap_or(false);
                        let key = parent.field("key").map(|k| k.text().to_string());
                        if is_value && key.as_deref() == Some(new) {
                            edits.push(TextEdit::replace(parent.range(), new));
                            continue;
                        }
                    }
                }
                edits.push(TextEdit::replace(range, new));
            }
            "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                if node.text() == old && !is_excluded(&range) {
                    edits.push(TextEdit::replace(range, format!("{old}: {new}")));
                }
            }
            _ => {}
        }
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    fn project(files: &[(&str, &str)]) -> Project {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        for (path, text) in files {
            project.add_source_file(Path::new(path), *text);
        }
        project
    }

    fn text(project: &Project, path: &str) -> String {
        project.file(Path::new(path)).unwrap().text().to_string()
    }

    #[test]
    fn test_rename_across_imports_and_reexports() {
        let mut project = project(&[
            ("src/review.entity.ts", "export class Review {}\nconst r: Review = new Review();\n"),
            ("src/index.ts", "export { Review } from './review.entity';\n"),
            (
                "src/service.ts",
                "import { Review } from './index';\nimport { Other } from 'x';\nexport function f(r: Review) { return { Review }; }\n",
            ),
            (
                "src/aliased.ts",
                "import { Review as R } from './review.entity';\nlet x: R;\n",
            ),
            ("src/unrelated.ts", "const Review = 1;\n"),
        ]);

        let changed =
            rename_class_and_references(&mut project, Path::new("src/review.entity.ts"), "Review", "ProductReview")
                .unwrap();
        assert_eq!(changed, 4);
        assert_eq!(
            text(&project, "src/review.entity.ts"),
            "export class ProductReview {}\nconst r: ProductReview = new ProductReview();\n"
        );
        assert_eq!(
            text(&project, "src/index.ts"),
            "export { ProductReview } from './review.entity';\n"
        );
        assert_eq!(
            text(&project, "src/service.ts"),
            "import { ProductReview } from './index';\nimport { Other } from 'x';\nexport function f(r: ProductReview) { return { Review: ProductReview }; }\n"
        );
        assert_eq!(
            text(&project, "src/aliased.ts"),
            "import { ProductReview as R } from './review.entity';\nlet x: R;\n"
        );
        assert_eq!(text(&project, "src/unrelated.ts"), "const Review = 1;\n");
    }

    #[test]
    fn test_rename_round_trip_restores_text() {
        let original = [
            ("src/a.ts", "export class A {}\nexport const m = { A };\n"),
            ("src/b.ts", "import * as ns from './a';\nlet x: ns.A = new ns.A();\n"),
        ];
        let mut project = project(&original);
        rename_symbol(&mut project, Path::new("src/a.ts"), "A", "B").unwrap();
        assert_eq!(
            text(&project, "src/a.ts"),
            "export class B {}\nexport const m = { A: B };\n"
        );
        assert_eq!(
            text(&project, "src/b.ts"),
            "import * as ns from './a';\nlet x: ns.B = new ns.B();\n"
        );
        rename_symbol(&mut project, Path::new("src/a.ts"), "B", "A").unwrap();
        for (path, expected) in original {
            assert_eq!(text(&project, path), expected);
        }
    }

    #[test]
    fn test_rename_missing_class() {
        let mut project = project(&[("src/a.ts", "export interface A {}\n")]);
        let err = rename_class_and_references(&mut project, Path::new("src/a.ts"), "A", "B")
            .unwrap_err();
        assert!(matches!(err, AstError::ClassNotFound { .. }));
        assert_eq!(
            rename_symbol(&mut project, Path::new("src/a.ts"), "A", "B").unwrap(),
            1
        );
    }
}
