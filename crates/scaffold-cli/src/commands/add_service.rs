//! `scaffold add service`
//!
//! A basic service is the template with its class renamed. An entity-backed
//! service starts from the full CRUD template (translatable entity with
//! custom fields) and is cut down to what the entity supports: methods that
//! were not requested are removed, and the translation and custom field
//! plumbing disappears when the entity does not implement the marker.

use super::{ensure_absent, ensure_class_free, tidy_imports, Session};
use crate::errors::CommandError;
use crate::naming;
use crate::result::CommandResult;
use crate::templates;
use clap::Args;
use scaffold_ast::edit::members::{
    add_interface_property, remove_constructor_parameter, remove_declaration,
    remove_interface_property, remove_method, replace_method_body, set_method_return_type,
};
use scaffold_ast::edit::{add_import, ImportSpec, ModuleSpecifier};
use scaffold_ast::syntax;
use scaffold_ast::{
    instantiate, ClassHandle, CrudCapabilities, EntityRef, Instantiation, PluginRef, Project,
    ServiceRef, CRUD_METHODS,
};
use scaffold_logger as logger;
use std::path::{Path, PathBuf};

/// Entity properties that never become input fields.
const INPUT_EXCLUDED: &[&str] = &[
    "id",
    "createdAt",
    "updatedAt",
    "translations",
    "customFields",
    "localizedName",
];

#[derive(Args, Debug, Clone, Default)]
pub struct AddServiceOptions {
    /// Service class name. Defaults to `<Entity>Service` for entity services
    #[arg(long)]
    pub name: Option<String>,

    /// Plugin to add the service to
    #[arg(long)]
    pub plugin: Option<String>,

    /// Entity the service manages; omit for a basic service
    #[arg(long)]
    pub entity: Option<String>,

    /// CRUD methods to generate, e.g. `findOne,findAll`
    #[arg(long, value_delimiter = ',')]
    pub methods: Option<Vec<String>>,
}

/// What an entity-backed service is generated for.
#[derive(Debug, Clone)]
pub struct EntityServiceSpec {
    pub entity: EntityRef,
    pub capabilities: CrudCapabilities,
}

pub fn run(session: &mut Session, options: &AddServiceOptions) -> Result<CommandResult, CommandError> {
    let plugin = session.select_plugin(options.plugin.clone())?;
    let entity = choose_entity(session, &plugin, options)?;

    let service = match entity {
        None => {
            let name = session.text(
                options.name.clone(),
                "What is the name of the new service?",
                naming::validate_class_name,
                ("Service name is required", "Pass --name <ServiceName>"),
            )?;
            logger::step(&format!("Adding service {name} to {}", plugin.class_name()));
            add_basic_service(&mut session.project, &plugin, &name)?
        }
        Some(entity) => {
            let default_name = format!("{}Service", entity.name());
            let name = options.name.clone().unwrap_or(default_name);
            naming::validate_class_name(&name)
                .map_err(|message| CommandError::validation(message, "Pass --name <ServiceName>"))?;
            let capabilities = choose_methods(session, options.methods.as_deref())?;
            logger::step(&format!(
                "Adding service {name} for {} to {}",
                entity.name(),
                plugin.class_name()
            ));
            add_entity_service(
                &mut session.project,
                &plugin,
                &name,
                &EntityServiceSpec {
                    entity,
                    capabilities,
                },
            )?
        }
    };

    session.finish(
        CommandResult::ok(format!(
            "Added service {} to {}",
            service.class_name(),
            plugin.class_name()
        ))
        .with("service", service.class_name())
        .with("plugin", plugin.class_name()),
        &[],
    )
}

fn choose_entity(
    session: &mut Session,
    plugin: &PluginRef,
    options: &AddServiceOptions,
) -> Result<Option<EntityRef>, CommandError> {
    if options.entity.is_some() {
        return session.select_entity(plugin, options.entity.clone()).map(Some);
    }
    if !session.interactive || plugin.entities(&session.project).is_empty() {
        return Ok(None);
    }
    let kinds = vec![
        "Basic service".to_string(),
        "Service for an entity (CRUD)".to_string(),
    ];
    match session.prompter.select("What kind of service?", &kinds)? {
        0 => Ok(None),
        _ => session.select_entity(plugin, None).map(Some),
    }
}

fn choose_methods(
    session: &mut Session,
    methods: Option<&[String]>,
) -> Result<CrudCapabilities, CommandError> {
    let capabilities = match methods {
        Some(methods) => {
            if let Some(unknown) = methods.iter().find(|m| !CRUD_METHODS.contains(&m.as_str())) {
                return Err(CommandError::validation(
                    format!("Unknown CRUD method '{unknown}'"),
                    format!("Use any of: {}", CRUD_METHODS.join(", ")),
                ));
            }
            CrudCapabilities::only(methods)
        }
        None if session.interactive => {
            if session.prompter.confirm("Generate all CRUD methods?", true)? {
                CrudCapabilities::all()
            } else {
                let mut chosen = Vec::new();
                for method in CRUD_METHODS {
                    if session.prompter.confirm(&format!("Include {method}?"), true)? {
                        chosen.push(method);
                    }
                }
                CrudCapabilities::only(&chosen)
            }
        }
        None => CrudCapabilities::all(),
    };
    if !capabilities.any() {
        return Err(CommandError::validation(
            "At least one CRUD method must be generated",
            format!("Use any of: {}", CRUD_METHODS.join(", ")),
        ));
    }
    Ok(with_dependencies(capabilities))
}

/// create and update return through findOne.
fn with_dependencies(mut capabilities: CrudCapabilities) -> CrudCapabilities {
    if (capabilities.create || capabilities.update) && !capabilities.find_one {
        logger::debug("Including findOne, which create and update return through");
        capabilities.find_one = true;
    }
    capabilities
}

pub fn service_path(plugin: &PluginRef, name: &str) -> PathBuf {
    plugin
        .plugin_dir()
        .join("services")
        .join(format!("{}.service.ts", naming::kebab(naming::service_base_name(name))))
}

pub fn add_basic_service(
    project: &mut Project,
    plugin: &PluginRef,
    name: &str,
) -> Result<ServiceRef, CommandError> {
    let path = service_path(plugin, name);
    ensure_absent(project, &path, "Service file")?;
    ensure_class_free(project, name)?;

    instantiate(
        project,
        &templates::service_basic(),
        &path,
        &Instantiation::new().rename("TemplateService", name),
    )?;
    register(project, plugin, &path, name)
}

pub fn add_entity_service(
    project: &mut Project,
    plugin: &PluginRef,
    name: &str,
    spec: &EntityServiceSpec,
) -> Result<ServiceRef, CommandError> {
    let path = service_path(plugin, name);
    ensure_absent(project, &path, "Service file")?;
    ensure_class_free(project, name)?;

    let entity = &spec.entity;
    let entity_name = entity.name().to_string();
    let translatable = entity.is_translatable(project);
    let custom_fields = entity.has_custom_fields(project);
    let create_input = format!("Create{entity_name}Input");
    let update_input = format!("Update{entity_name}Input");

    let mut plan = Instantiation::new()
        .rename("TemplateService", name)
        .rename("CreateTemplateEntityInput", create_input.as_str())
        .rename("UpdateTemplateEntityInput", update_input.as_str())
        .external(
            "TemplateEntity",
            entity_name.as_str(),
            ModuleSpecifier::File(entity.path().to_path_buf()),
        );
    let mut translation_name = None;
    if translatable {
        let translation = entity.translation_class(project).ok_or_else(|| {
            CommandError::validation(
                format!("Could not find the translation entity of {entity_name}"),
                "Declare `translations` with a relation decorator such as @OneToMany(type => XTranslation, ...)",
            )
        })?;
        plan = plan.external(
            "TemplateEntityTranslation",
            translation.name.as_str(),
            ModuleSpecifier::File(translation.path.clone()),
        );
        translation_name = Some(translation.name);
    }
    instantiate(project, &templates::service_entity(), &path, &plan)?;

    let service = ServiceRef::new(
        project,
        ClassHandle {
            path: path.clone(),
            name: name.to_string(),
        },
    );
    let shape = CrudShape {
        entity: &entity_name,
        translation: translation_name.as_deref(),
        custom_fields,
    };

    for method in CRUD_METHODS {
        if !spec.capabilities.has(method) {
            service.edit(project, |view, class| remove_method(view, class, method))?;
            continue;
        }
        if translatable && custom_fields {
            continue;
        }
        let (Some(body), Some(return_type)) = (shape.body(method), shape.return_type(method)) else {
            continue;
        };
        service.edit(project, |view, class| {
            let node = syntax::find_method(class, method).ok_or_else(|| {
                scaffold_ast::AstError::MethodNotFound {
                    class: name.to_string(),
                    method: method.to_string(),
                }
            })?;
            let mut edits = set_method_return_type(view, &node, &return_type)?;
            edits.extend(replace_method_body(view, &node, &body)?);
            Ok(edits)
        })?;
    }

    let mut unused_params = Vec::new();
    if !translatable {
        unused_params.extend(["translatableSaver", "translator"]);
    }
    if !custom_fields {
        unused_params.push("customFieldRelationService");
    }
    if !spec.capabilities.find_all {
        unused_params.push("listQueryBuilder");
    }
    for param in unused_params {
        service.edit(project, |view, class| remove_constructor_parameter(view, class, param))?;
    }

    specialize_inputs(project, &path, entity, spec.capabilities, translatable, custom_fields)?;
    tidy_imports(project, &path)?;
    register(project, plugin, &path, name)
}

fn specialize_inputs(
    project: &mut Project,
    path: &Path,
    entity: &EntityRef,
    capabilities: CrudCapabilities,
    translatable: bool,
    custom_fields: bool,
) -> Result<(), CommandError> {
    let entity_name = entity.name();
    let props: Vec<_> = entity
        .props(project)
        .into_iter()
        .filter(|prop| !INPUT_EXCLUDED.contains(&prop.name.as_str()))
        .collect();

    let inputs = [
        (format!("Create{entity_name}Input"), capabilities.create, false),
        (format!("Update{entity_name}Input"), capabilities.update, true),
    ];
    for (input, wanted, all_optional) in inputs {
        if !wanted {
            project.modify_file(path, |view| remove_declaration(view, &input))?;
            continue;
        }
        if !translatable {
            project.modify_file(path, |view| remove_interface_property(view, &input, "translations"))?;
        }
        if !custom_fields {
            project.modify_file(path, |view| remove_interface_property(view, &input, "customFields"))?;
        }
        for prop in &props {
            let optional = if all_optional || prop.nullable { "?" } else { "" };
            let snippet = format!("{}{optional}: {};", prop.name, prop.type_text);
            project.modify_file(path, |view| add_interface_property(view, &input, &prop.name, &snippet))?;
        }
    }
    Ok(())
}

fn register(
    project: &mut Project,
    plugin: &PluginRef,
    path: &Path,
    name: &str,
) -> Result<ServiceRef, CommandError> {
    plugin.add_provider(project, name)?;
    add_import(project, plugin.path(), &ImportSpec::from_file(path, &[name]))?;
    Ok(ServiceRef::new(
        project,
        ClassHandle {
            path: path.to_path_buf(),
            name: name.to_string(),
        },
    ))
}

/// Method bodies and return types for the non-default shapes.
struct CrudShape<'a> {
    entity: &'a str,
    translation: Option<&'a str>,
    custom_fields: bool,
}

impl CrudShape<'_> {
    fn returned(&self) -> String {
        match self.translation {
            Some(_) => format!("Translated<{}>", self.entity),
            None => self.entity.to_string(),
        }
    }

    fn return_type(&self, method: &str) -> Option<String> {
        match method {
            "findAll" => Some(format!("Promise<PaginatedList<{}>>", self.returned())),
            "findOne" => Some(format!("Promise<{} | null>", self.returned())),
            "create" | "update" => Some(format!("Promise<{}>", self.returned())),
            _ => None,
        }
    }

    fn relations_line(&self, variable: &str) -> String {
        if self.custom_fields {
            format!(
                "await this.customFieldRelationService.updateRelations(ctx, {}, input, {variable});\n",
                self.entity
            )
        } else {
            String::new()
        }
    }

    fn body(&self, method: &str) -> Option<String> {
        let entity = self.entity;
        let body = match (method, self.translation) {
            ("findAll", Some(_)) => format!(
                "return this.listQueryBuilder
    .build({entity}, options, {{
        relations,
        ctx,
    }})
    .getManyAndCount()
    .then(([items, totalItems]) => {{
        return {{
            items: items.map(item => this.translator.translate(item, ctx)),
            totalItems,
        }};
    }});"
            ),
            ("findAll", None) => format!(
                "return this.listQueryBuilder
    .build({entity}, options, {{
        relations,
        ctx,
    }})
    .getManyAndCount()
    .then(([items, totalItems]) => {{
        return {{
            items,
            totalItems,
        }};
    }});"
            ),
            ("findOne", Some(_)) => format!(
                "return this.connection
    .getRepository(ctx, {entity})
    .findOne({{
        where: {{ id }},
        relations,
    }})
    .then(entity => entity && this.translator.translate(entity, ctx));"
            ),
            ("findOne", None) => format!(
                "return this.connection.getRepository(ctx, {entity}).findOne({{
    where: {{ id }},
    relations,
}});"
            ),
            ("create", Some(translation)) => format!(
                "const newEntity = await this.translatableSaver.create({{
    ctx,
    input,
    entityType: {entity},
    translationType: {translation},
}});
{}return assertFound(this.findOne(ctx, newEntity.id));",
                self.relations_line("newEntity")
            ),
            ("create", None) => format!(
                "const newEntity = await this.connection.getRepository(ctx, {entity}).save(new {entity}(input));
{}return assertFound(this.findOne(ctx, newEntity.id));",
                self.relations_line("newEntity")
            ),
            ("update", Some(translation)) => format!(
                "const updatedEntity = await this.translatableSaver.update({{
    ctx,
    input,
    entityType: {entity},
    translationType: {translation},
}});
{}return assertFound(this.findOne(ctx, updatedEntity.id));",
                self.relations_line("updatedEntity")
            ),
            ("update", None) => format!(
                "const entity = await this.connection.getEntityOrThrow(ctx, {entity}, input.id);
const updatedEntity = patchEntity(entity, input);
await this.connection.getRepository(ctx, {entity}).save(updatedEntity, {{ reload: false }});
{}return assertFound(this.findOne(ctx, updatedEntity.id));",
                self.relations_line("updatedEntity")
            ),
            _ => return None,
        };
        Some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::super::add_entity::{add_entity, EntityFeatures};
    use super::super::testing::*;
    use super::*;
    use pretty_assertions::assert_eq;

    const SERVICE_PATH: &str = "/p/src/plugins/reviews/services/product-review.service.ts";

    fn project_with_entity(features: EntityFeatures) -> (Project, PluginRef, EntityRef) {
        let mut project = project_with_plugin();
        let plugin = PluginRef::all(&project).remove(0);
        add_entity(&mut project, &plugin, "ProductReview", features).unwrap();
        let entity = plugin.entities(&project).remove(0);
        (project, plugin, entity)
    }

    fn service_text(project: &Project) -> String {
        project.file(Path::new(SERVICE_PATH)).unwrap().text().to_string()
    }

    #[test]
    fn test_translatable_service_without_custom_fields() {
        let (mut project, plugin, entity) = project_with_entity(EntityFeatures {
            translatable: true,
            custom_fields: false,
        });
        let service = add_entity_service(
            &mut project,
            &plugin,
            "ProductReviewService",
            &EntityServiceSpec {
                entity,
                capabilities: CrudCapabilities::all(),
            },
        )
        .unwrap();

        let text = service_text(&project);
        assert!(!text.contains("customFieldRelationService"));
        assert!(text.contains("private translatableSaver: TranslatableSaver"));
        assert!(text.contains("private translator: TranslatorService"));
        assert!(text.contains("translations: Array<TranslationInput<ProductReview>>;"));
        assert!(text.contains("translations?: Array<TranslationInput<ProductReview>>;"));
        assert!(!text.contains("customFields"));
        assert!(text.contains("translationType: ProductReviewTranslation"));
        assert!(text.contains("code: string;"));
        assert!(text.contains("code?: string;"));
        assert!(!text.contains("Template"));
        assert!(!text.contains("CustomFieldRelationService"));

        assert_eq!(service.entity().map(|e| e.name()), Some("ProductReview"));
        assert_eq!(service.capabilities(), CrudCapabilities::all());
        let plugin_text = text_of(&project, PLUGIN_PATH);
        assert!(plugin_text.contains("providers: [ProductReviewService]"));
    }

    #[test]
    fn test_plain_entity_service_with_subset_of_methods() {
        let (mut project, plugin, entity) = project_with_entity(EntityFeatures::default());
        add_entity_service(
            &mut project,
            &plugin,
            "ProductReviewService",
            &EntityServiceSpec {
                entity,
                capabilities: with_dependencies(CrudCapabilities::only(&["findAll", "create"])),
            },
        )
        .unwrap();

        let text = service_text(&project);
        assert!(text.contains("findAll("));
        assert!(text.contains("findOne("));
        assert!(text.contains("async create("));
        assert!(!text.contains("async update("));
        assert!(!text.contains("async delete("));
        assert!(!text.contains("UpdateProductReviewInput"));
        assert!(!text.contains("translat"));
        assert!(!text.contains("Translated"));
        assert!(text.contains("Promise<PaginatedList<ProductReview>>"));
        assert!(text.contains(".save(new ProductReview(input))"));
        assert!(!text.contains("DeletionResult"));
        assert!(!text.contains("patchEntity"));
    }

    #[test]
    fn test_basic_service() {
        let mut project = project_with_plugin();
        let plugin = PluginRef::all(&project).remove(0);
        let service = add_basic_service(&mut project, &plugin, "ModerationService").unwrap();
        assert_eq!(
            service.path(),
            Path::new("/p/src/plugins/reviews/services/moderation.service.ts")
        );
        assert!(service.entity().is_none());
        let text = text_of(&project, "/p/src/plugins/reviews/services/moderation.service.ts");
        assert!(text.contains("export class ModerationService"));
        assert!(text_of(&project, PLUGIN_PATH)
            .contains("import { ModerationService } from './services/moderation.service';"));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let mut session = session(project_with_plugin(), vec![], false);
        let err = choose_methods(&mut session, Some(&["findSome".to_string()])).unwrap_err();
        assert!(err.to_string().contains("findSome"));
    }

    fn text_of(project: &Project, path: &str) -> String {
        project.file(Path::new(path)).unwrap().text().to_string()
    }
}
