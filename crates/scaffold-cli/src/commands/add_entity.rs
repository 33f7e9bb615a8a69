//! `scaffold add entity`

use super::{ensure_absent, ensure_class_free, tidy_imports, Session};
use crate::errors::CommandError;
use crate::naming;
use crate::result::CommandResult;
use crate::templates;
use clap::Args;
use scaffold_ast::edit::members::{remove_class_property, remove_implements};
use scaffold_ast::edit::{add_import, ImportSpec, ModuleSpecifier};
use scaffold_ast::{instantiate, ClassHandle, EntityRef, Instantiation, PluginRef, Project};
use scaffold_logger as logger;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct AddEntityOptions {
    /// Entity class name in PascalCase, e.g. ProductReview
    #[arg(long)]
    pub name: Option<String>,

    /// Plugin to add the entity to
    #[arg(long)]
    pub plugin: Option<String>,

    /// Generate a translation entity and implement Translatable
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub translatable: Option<bool>,

    /// Implement HasCustomFields
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub custom_fields: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityFeatures {
    pub translatable: bool,
    pub custom_fields: bool,
}

/// Files created for one entity.
#[derive(Debug, Clone)]
pub struct EntityFiles {
    pub entity: PathBuf,
    pub translation: Option<PathBuf>,
}

pub fn run(session: &mut Session, options: &AddEntityOptions) -> Result<CommandResult, CommandError> {
    let name = session.text(
        options.name.clone(),
        "What is the name of the new entity?",
        naming::validate_class_name,
        ("Entity name is required", "Pass --name <EntityName>"),
    )?;
    let plugin = session.select_plugin(options.plugin.clone())?;
    let features = EntityFeatures {
        translatable: session.confirm(
            options.translatable,
            "Should the entity be translatable?",
            false,
        )?,
        custom_fields: session.confirm(
            options.custom_fields,
            "Should the entity support custom fields?",
            false,
        )?,
    };

    logger::step(&format!("Adding entity {name} to {}", plugin.class_name()));
    add_entity(&mut session.project, &plugin, &name, features)?;
    session.finish(
        CommandResult::ok(format!("Added entity {name} to {}", plugin.class_name()))
            .with("entity", name.as_str())
            .with("plugin", plugin.class_name()),
        &[],
    )
}

pub fn entity_path(plugin: &PluginRef, name: &str) -> PathBuf {
    plugin
        .plugin_dir()
        .join("entities")
        .join(format!("{}.entity.ts", naming::kebab(name)))
}

fn translation_path(plugin: &PluginRef, name: &str) -> PathBuf {
    plugin
        .plugin_dir()
        .join("entities")
        .join(format!("{}-translation.entity.ts", naming::kebab(name)))
}

/// Create the entity (and its translation entity) and register both with
/// the plugin.
pub fn add_entity(
    project: &mut Project,
    plugin: &PluginRef,
    name: &str,
    features: EntityFeatures,
) -> Result<EntityFiles, CommandError> {
    let path = entity_path(plugin, name);
    let translation_name = format!("{name}Translation");
    let translation = translation_path(plugin, name);
    ensure_absent(project, &path, "Entity file")?;
    ensure_class_free(project, name)?;
    if features.translatable {
        ensure_absent(project, &translation, "Translation entity file")?;
        ensure_class_free(project, &translation_name)?;
    }

    let mut plan = Instantiation::new().rename("TemplateEntity", name);
    if features.custom_fields {
        plan = plan.rename("TemplateEntityCustomFields", format!("{name}CustomFields"));
    }
    if features.translatable {
        plan = plan.external(
            "TemplateEntityTranslation",
            translation_name.as_str(),
            ModuleSpecifier::File(translation.clone()),
        );
    }
    instantiate(project, &templates::entity(), &path, &plan)?;

    let entity = EntityRef::new(ClassHandle {
        path: path.clone(),
        name: name.to_string(),
    });
    if !features.translatable {
        entity.edit(project, |view, class| remove_implements(view, class, "Translatable"))?;
        entity.edit(project, |view, class| remove_class_property(view, class, "localizedName"))?;
        entity.edit(project, |view, class| remove_class_property(view, class, "translations"))?;
    }
    if !features.custom_fields {
        entity.edit(project, |view, class| remove_implements(view, class, "HasCustomFields"))?;
        entity.edit(project, |view, class| remove_class_property(view, class, "customFields"))?;
    }
    tidy_imports(project, &path)?;

    plugin.add_entity(project, name)?;
    add_import(project, plugin.path(), &ImportSpec::from_file(&path, &[name]))?;

    if !features.translatable {
        return Ok(EntityFiles {
            entity: path,
            translation: None,
        });
    }

    let mut plan = Instantiation::new()
        .rename("TemplateEntityTranslation", translation_name.as_str())
        .external("TemplateEntity", name, ModuleSpecifier::File(path.clone()));
    if features.custom_fields {
        plan = plan.rename(
            "TemplateEntityCustomFieldsTranslation",
            format!("{name}CustomFieldsTranslation"),
        );
    }
    instantiate(project, &templates::entity_translation(), &translation, &plan)?;
    if !features.custom_fields {
        let translation_ref = EntityRef::new(ClassHandle {
            path: translation.clone(),
            name: translation_name.clone(),
        });
        translation_ref.edit(project, |view, class| remove_implements(view, class, "HasCustomFields"))?;
        translation_ref.edit(project, |view, class| remove_class_property(view, class, "customFields"))?;
    }
    tidy_imports(project, &translation)?;

    plugin.add_entity(project, &translation_name)?;
    add_import(
        project,
        plugin.path(),
        &ImportSpec::from_file(&translation, &[translation_name.as_str()]),
    )?;

    Ok(EntityFiles {
        entity: path,
        translation: Some(translation),
    })
}
