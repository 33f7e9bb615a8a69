//! Instantiate TypeScript templates whose declarations use placeholder
//! names (`TemplateEntity`, `TemplateService`, ...).

use crate::edit::imports::{add_import, ImportSpec, ModuleSpecifier};
use crate::edit::members::remove_declaration;
use crate::edit::rename::{rename_in_file, rename_symbol};
use crate::error::AstError;
use crate::project::Project;
use crate::syntax;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Declarations whose name starts with this are placeholders.
pub const PLACEHOLDER_PREFIX: &str = "Template";

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub content: String,
}

impl Template {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A placeholder that stands for a symbol defined elsewhere. The stub
/// declaration is removed and replaced by an import.
#[derive(Debug, Clone)]
pub struct ExternalSymbol {
    pub placeholder: String,
    pub name: String,
    pub module: ModuleSpecifier,
}

#[derive(Debug, Clone, Default)]
pub struct Instantiation {
    pub renames: Vec<(String, String)>,
    pub externals: Vec<ExternalSymbol>,
}

impl Instantiation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, placeholder: impl Into<String>, name: impl Into<String>) -> Self {
        self.renames.push((placeholder.into(), name.into()));
        self
    }

    pub fn external(
        mut self,
        placeholder: impl Into<String>,
        name: impl Into<String>,
        module: ModuleSpecifier,
    ) -> Self {
        self.externals.push(ExternalSymbol {
            placeholder: placeholder.into(),
            name: name.into(),
            module,
        });
        self
    }

    fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.renames
            .iter()
            .map(|(placeholder, _)| placeholder.as_str())
            .chain(self.externals.iter().map(|e| e.placeholder.as_str()))
    }
}

/// Create `target` from `template` and apply the instantiation plan.
///
/// Every placeholder named in the plan must have a top-level declaration in
/// the template; otherwise the new file is discarded and
/// [`AstError::PlaceholderNotFound`] returned.
pub fn instantiate(
    project: &mut Project,
    template: &Template,
    target: &Path,
    plan: &Instantiation,
) -> Result<PathBuf, AstError> {
    let path = project.absolute_path(target);
    project.create_file_from_template(&template.content, &path)?;

    let missing = {
        let root = project.file(&path)?.root();
        plan.placeholders()
            .find(|placeholder| syntax::find_declaration(&root, placeholder).is_none())
            .map(str::to_string)
    };
    if let Some(placeholder) = missing {
        project.remove_file(&path);
        return Err(AstError::PlaceholderNotFound {
            placeholder,
            template: template.name.clone(),
        });
    }

    for (placeholder, name) in &plan.renames {
        rename_symbol(project, &path, placeholder, name)?;
    }

    for external in &plan.externals {
        project.modify_file(&path, |view| remove_declaration(view, &external.placeholder))?;
        if external.placeholder != external.name {
            project.modify_file(&path, |view| {
                rename_in_file(view, &external.placeholder, &external.name)
            })?;
        }
        add_import(
            project,
            &path,
            &ImportSpec::named(external.module.clone(), &[external.name.as_str()]),
        )?;
    }

    let covered: HashSet<&str> = plan
        .renames
        .iter()
        .map(|(_, name)| name.as_str())
        .chain(plan.externals.iter().map(|e| e.name.as_str()))
        .collect();
    let leftovers: Vec<String> = syntax::top_level_declarations(&project.file(&path)?.root())
        .into_iter()
        .map(|declaration| declaration.name)
        .filter(|name| name.starts_with(PLACEHOLDER_PREFIX) && !covered.contains(name.as_str()))
        .collect();
    for name in leftovers {
        debug!("Removing unused placeholder {} from {}", name, path.display());
        project.modify_file(&path, |view| remove_declaration(view, &name))?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    const SERVICE: &str = "import { Injectable } from '@nestjs/core';

export class TemplateEntity {}

export interface TemplateOptions {}

@Injectable()
export class TemplateService {
    findOne(id: ID): Promise<TemplateEntity | null> {
        return this.connection.getRepository(TemplateEntity).findOne(id);
    }
}
";

    fn project() -> Project {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(
            Path::new("src/plugins/reviews/entities/review.entity.ts"),
            "export class Review extends VendureEntity {}\n",
        );
        project
    }

    #[test]
    fn test_instantiate_with_external_entity() {
        let mut project = project();
        let plan = Instantiation::new()
            .rename("TemplateService", "ReviewService")
            .external(
                "TemplateEntity",
                "Review",
                ModuleSpecifier::File(PathBuf::from(
                    "/p/src/plugins/reviews/entities/review.entity.ts",
                )),
            );
        let path = instantiate(
            &mut project,
            &Template::new("service-entity", SERVICE),
            Path::new("src/plugins/reviews/services/review.service.ts"),
            &plan,
        )
        .unwrap();

        assert_eq!(
            project.file(&path).unwrap().text(),
            "import { Injectable } from '@nestjs/core';
import { Review } from '../entities/review.entity';

@Injectable()
export class ReviewService {
    findOne(id: ID): Promise<Review | null> {
        return this.connection.getRepository(Review).findOne(id);
    }
}
"
        );
    }

    #[test]
    fn test_missing_placeholder_discards_file() {
        let mut project = project();
        let plan = Instantiation::new().rename("TemplateResolver", "ReviewResolver");
        let target = Path::new("src/x.ts");
        let err = instantiate(&mut project, &Template::new("service", SERVICE), target, &plan)
            .unwrap_err();
        assert!(matches!(err, AstError::PlaceholderNotFound { ref placeholder, .. } if placeholder == "TemplateResolver"));
        assert!(!project.contains(target));
    }

    #[test]
    fn test_template_syntax_error() {
        let mut project = project();
        let err = instantiate(
            &mut project,
            &Template::new("broken", "export class Broken { ) }\n"),
            Path::new("src/broken.ts"),
            &Instantiation::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AstError::TemplateParse { .. }));
    }
}
