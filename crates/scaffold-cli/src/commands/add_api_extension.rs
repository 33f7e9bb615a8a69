//! `scaffold add api-extension`
//!
//! Adds an Admin API schema extension and a resolver for one service. The
//! schema lives in `api/api-extensions.ts` as one `gql` declaration per
//! service, all interpolated into the exported `adminApiExtensions`.

use super::{ensure_absent, ensure_class_free, tidy_imports, Session};
use crate::errors::CommandError;
use crate::install::Dependency;
use crate::naming;
use crate::result::CommandResult;
use crate::templates;
use clap::Args;
use scaffold_ast::edit::literals::{append_to_template, template_of};
use scaffold_ast::edit::members::{
    insert_before_declaration, remove_declaration, remove_method, rename_member,
};
use scaffold_ast::edit::{add_import, ImportSpec, ModuleSpecifier};
use scaffold_ast::{
    instantiate, syntax, ApiType, AstError, ClassHandle, CrudCapabilities, EntityProp, EntityRef,
    Instantiation, PluginRef, Project, ServiceRef,
};
use scaffold_logger as logger;
use std::path::{Path, PathBuf};

const EXTENSIONS_VARIABLE: &str = "adminApiExtensions";
const SKIPPED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "translations", "customFields"];

#[derive(Args, Debug, Clone, Default)]
pub struct AddApiExtensionOptions {
    /// Plugin to extend
    #[arg(long)]
    pub plugin: Option<String>,

    /// Service the resolver delegates to
    #[arg(long)]
    pub service: Option<String>,
}

pub fn run(
    session: &mut Session,
    options: &AddApiExtensionOptions,
) -> Result<CommandResult, CommandError> {
    let plugin = session.select_plugin(options.plugin.clone())?;
    let service = session.select_service(&plugin, options.service.clone())?;
    logger::step(&format!(
        "Adding Admin API extension for {} to {}",
        service.class_name(),
        plugin.class_name()
    ));
    let resolver = add_api_extension(&mut session.project, &plugin, &service)?;
    session.finish(
        CommandResult::ok(format!(
            "Added {} and the Admin API schema for {}",
            resolver.name,
            service.class_name()
        ))
        .with("resolver", resolver.name.as_str())
        .with("plugin", plugin.class_name()),
        &[Dependency::new("graphql-tag")],
    )
}

/// GraphQL operation names for each CRUD method of an entity service.
struct Operations {
    entity: String,
    find_one: String,
    find_all: String,
    create: String,
    update: String,
    delete: String,
}

impl Operations {
    fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            find_one: naming::camel(entity),
            find_all: naming::plural(&naming::camel(entity)),
            create: format!("create{entity}"),
            update: format!("update{entity}"),
            delete: format!("delete{entity}"),
        }
    }

    /// Resolver template method name paired with the generated one.
    fn resolver_methods(&self) -> [(&'static str, &'static str, &str); 5] {
        [
            ("findOne", "templateEntity", &self.find_one),
            ("findAll", "templateEntities", &self.find_all),
            ("create", "createTemplateEntity", &self.create),
            ("update", "updateTemplateEntity", &self.update),
            ("delete", "deleteTemplateEntity", &self.delete),
        ]
    }
}

/// Add the schema, the resolver and the plugin registration. Returns the
/// resolver class.
pub fn add_api_extension(
    project: &mut Project,
    plugin: &PluginRef,
    service: &ServiceRef,
) -> Result<ClassHandle, CommandError> {
    let base = naming::service_base_name(service.class_name()).to_string();
    let resolver = ClassHandle {
        path: resolver_path(plugin, &base),
        name: format!("{base}AdminResolver"),
    };
    let schema_variable = format!("{}AdminApiExtensions", naming::camel(&base));
    let extensions_path = plugin.plugin_dir().join("api").join("api-extensions.ts");

    ensure_absent(project, &resolver.path, "Resolver file")?;
    ensure_class_free(project, &resolver.name)?;
    open_extensions_file(project, &extensions_path)?;
    if syntax::find_declaration(&project.file(&extensions_path)?.root(), &schema_variable).is_some() {
        return Err(CommandError::validation(
            format!("{} already declares {schema_variable}", extensions_path.display()),
            "Each service can have one Admin API extension",
        ));
    }

    let schema = match service.entity() {
        Some(entity) => {
            let operations = Operations::new(entity.name());
            let schema = entity_schema(project, entity, &operations, service.capabilities());
            create_entity_resolver(project, service, entity, &operations, &resolver)?;
            schema
        }
        None => {
            create_basic_resolver(project, service, &base, &resolver)?;
            basic_schema(&naming::camel(&base))
        }
    };

    let indent = project.settings().indent.clone();
    let declaration = format!(
        "const {schema_variable} = gql`\n{}\n`;",
        schema
            .iter()
            .map(|line| indent_line(&indent, line))
            .collect::<Vec<_>>()
            .join("\n")
    );
    project.modify_file(&extensions_path, |view| {
        insert_before_declaration(view, EXTENSIONS_VARIABLE, &schema_variable, &declaration)
    })?;
    project.modify_file(&extensions_path, |view| {
        let declaration = syntax::find_declaration(&view.root, EXTENSIONS_VARIABLE).ok_or_else(|| {
            AstError::DeclarationNotFound {
                name: EXTENSIONS_VARIABLE.to_string(),
                path: view.path.to_path_buf(),
            }
        })?;
        let template = declaration
            .name_node
            .parent()
            .and_then(|declarator| declarator.field("value"))
            .and_then(|value| template_of(&value))
            .ok_or_else(|| view.shape_error(format!("{EXTENSIONS_VARIABLE} is not a gql template")))?;
        append_to_template(view, &template, &format!("${{{schema_variable}}}"))
    })?;

    plugin.add_api_extension(
        project,
        ApiType::Admin,
        EXTENSIONS_VARIABLE,
        &[resolver.name.as_str()],
    )?;
    add_import(
        project,
        plugin.path(),
        &ImportSpec::from_file(&extensions_path, &[EXTENSIONS_VARIABLE]),
    )?;
    add_import(
        project,
        plugin.path(),
        &ImportSpec::from_file(&resolver.path, &[resolver.name.as_str()]),
    )?;
    Ok(resolver)
}

pub fn resolver_path(plugin: &PluginRef, base: &str) -> PathBuf {
    plugin
        .plugin_dir()
        .join("api")
        .join(format!("{}-admin.resolver.ts", naming::kebab(base)))
}

fn open_extensions_file(project: &mut Project, path: &Path) -> Result<(), CommandError> {
    if project.contains(path) {
        return Ok(());
    }
    if project.absolute_path(path).exists() {
        project.load_file(path)?;
    } else {
        instantiate(project, &templates::api_extensions(), path, &Instantiation::new())?;
    }
    Ok(())
}

fn create_entity_resolver(
    project: &mut Project,
    service: &ServiceRef,
    entity: &EntityRef,
    operations: &Operations,
    resolver: &ClassHandle,
) -> Result<(), CommandError> {
    let capabilities = service.capabilities();
    let mut plan = Instantiation::new()
        .rename("TemplateAdminResolver", resolver.name.as_str())
        .external(
            "TemplateEntity",
            entity.name(),
            ModuleSpecifier::File(entity.path().to_path_buf()),
        )
        .external(
            "TemplateService",
            service.class_name(),
            ModuleSpecifier::File(service.path().to_path_buf()),
        );

    let inputs = [
        ("CreateTemplateEntityInput", format!("Create{}Input", entity.name()), capabilities.create),
        ("UpdateTemplateEntityInput", format!("Update{}Input", entity.name()), capabilities.update),
    ];
    let service_root = project.file(service.path())?.root();
    for (placeholder, name, wanted) in &inputs {
        if !wanted {
            continue;
        }
        plan = if syntax::find_declaration(&service_root, name).is_some() {
            plan.external(*placeholder, name.as_str(), ModuleSpecifier::File(service.path().to_path_buf()))
        } else {
            plan.rename(*placeholder, name.as_str())
        };
    }
    instantiate(project, &templates::resolver_entity(), &resolver.path, &plan)?;

    for (placeholder, _, wanted) in &inputs {
        if !wanted {
            project.modify_file(&resolver.path, |view| remove_declaration(view, placeholder))?;
        }
    }
    for (method, template_name, _) in operations.resolver_methods() {
        if !capabilities.has(method) {
            project.modify_file(&resolver.path, |view| {
                let class = resolver_class(view, resolver)?;
                remove_method(view, &class, template_name)
            })?;
        }
    }

    let service_property = naming::camel(service.class_name());
    let mut renames: Vec<(&str, &str)> = operations
        .resolver_methods()
        .iter()
        .map(|(_, from, to)| (*from, *to))
        .collect();
    renames.push(("templateService", service_property.as_str()));
    for (from, to) in renames {
        project.modify_file(&resolver.path, |view| {
            let class = resolver_class(view, resolver)?;
            rename_member(&class, from, to)
        })?;
    }
    tidy_imports(project, &resolver.path)
}

fn create_basic_resolver(
    project: &mut Project,
    service: &ServiceRef,
    base: &str,
    resolver: &ClassHandle,
) -> Result<(), CommandError> {
    if !service.has_method(project, "exampleMethod") {
        service.add_method(
            project,
            "exampleMethod",
            "async exampleMethod(ctx: RequestContext, options?: { id: ID }): Promise<string> {\n    return options ? 'This is the entity with id ' + options.id : 'Hello!';\n}",
        )?;
        add_import(
            project,
            service.path(),
            &ImportSpec::from_package("@vendure/core", &["ID", "RequestContext"]),
        )?;
    }

    let plan = Instantiation::new()
        .rename("TemplateAdminResolver", resolver.name.as_str())
        .external(
            "TemplateService",
            service.class_name(),
            ModuleSpecifier::File(service.path().to_path_buf()),
        );
    instantiate(project, &templates::resolver_basic(), &resolver.path, &plan)?;

    let camel = naming::camel(base);
    let renames = [
        ("exampleQuery".to_string(), format!("{camel}Example")),
        ("exampleMutation".to_string(), format!("{camel}ExampleMutation")),
        ("templateService".to_string(), naming::camel(service.class_name())),
    ];
    for (from, to) in &renames {
        project.modify_file(&resolver.path, |view| {
            let class = resolver_class(view, resolver)?;
            rename_member(&class, from, to)
        })?;
    }
    Ok(())
}

fn resolver_class<'r>(
    view: &scaffold_ast::FileView<'r>,
    resolver: &ClassHandle,
) -> Result<syntax::TsNode<'r>, AstError> {
    syntax::find_class(&view.root, &resolver.name).ok_or_else(|| AstError::ClassNotFound {
        name: resolver.name.clone(),
        path: resolver.path.clone(),
    })
}

fn indent_line(indent: &str, line: &str) -> String {
    if line.is_empty() {
        return String::new();
    }
    let depth = line.len() - line.trim_start_matches('\t').len();
    format!("{}{}", indent.repeat(depth + 1), line.trim_start_matches('\t'))
}

/// GraphQL type for a TypeScript property type.
fn graphql_type(ts_type: &str) -> String {
    let ts_type = ts_type.trim();
    if let Some(inner) = ts_type.strip_suffix("[]") {
        return format!("[{}!]", graphql_type(inner));
    }
    match ts_type {
        "string" | "LocaleString" => "String",
        "number" => "Int",
        "boolean" => "Boolean",
        "Date" => "DateTime",
        "ID" => "ID",
        "LanguageCode" => "LanguageCode",
        _ => "JSON",
    }
    .to_string()
}

fn field(prop: &EntityProp, required: bool) -> String {
    let bang = if required && !prop.nullable { "!" } else { "" };
    format!("\t{}: {}{bang}", prop.name, graphql_type(&prop.type_text))
}

/// Schema lines for an entity service; a leading tab marks one nesting level.
fn entity_schema(
    project: &Project,
    entity: &EntityRef,
    ops: &Operations,
    capabilities: CrudCapabilities,
) -> Vec<String> {
    let name = &ops.entity;
    let props: Vec<EntityProp> = entity
        .props(project)
        .into_iter()
        .filter(|p| !SKIPPED_FIELDS.contains(&p.name.as_str()))
        .collect();
    let input_props: Vec<&EntityProp> = props.iter().filter(|p| p.name != "localizedName").collect();
    let translation_props: Option<Vec<EntityProp>> = entity
        .is_translatable(project)
        .then(|| entity.translation_class(project))
        .flatten()
        .map(|handle| {
            EntityRef::new(handle)
                .props(project)
                .into_iter()
                .filter(|p| !SKIPPED_FIELDS.contains(&p.name.as_str()) && p.name != "base")
                .collect()
        });

    let mut lines = vec![format!("type {name} implements Node {{")];
    lines.extend(["\tid: ID!", "\tcreatedAt: DateTime!", "\tupdatedAt: DateTime!"].map(String::from));
    lines.extend(props.iter().map(|p| field(p, true)));
    if translation_props.is_some() {
        lines.push(format!("\ttranslations: [{name}Translation!]!"));
    }
    lines.push("}".into());

    if let Some(translation_props) = &translation_props {
        lines.push(String::new());
        lines.push(format!("type {name}Translation {{"));
        lines.extend(["\tid: ID!", "\tcreatedAt: DateTime!", "\tupdatedAt: DateTime!"].map(String::from));
        lines.extend(translation_props.iter().map(|p| field(p, true)));
        lines.push("}".into());
        if capabilities.create || capabilities.update {
            lines.push(String::new());
            lines.push(format!("input {name}TranslationInput {{"));
            lines.push("\tid: ID".into());
            lines.extend(translation_props.iter().map(|p| field(p, p.name == "languageCode")));
            lines.push("}".into());
        }
    }

    if capabilities.find_all {
        lines.push(String::new());
        lines.push(format!("type {name}List implements PaginatedList {{"));
        lines.push(format!("\titems: [{name}!]!"));
        lines.push("\ttotalItems: Int!".into());
        lines.push("}".into());
        lines.push(String::new());
        lines.push("# Generated at run-time by Vendure".into());
        lines.push(format!("input {name}ListOptions"));
    }

    if capabilities.create {
        lines.push(String::new());
        lines.push(format!("input Create{name}Input {{"));
        lines.extend(input_props.iter().map(|p| field(p, true)));
        if translation_props.is_some() {
            lines.push(format!("\ttranslations: [{name}TranslationInput!]!"));
        }
        lines.push("}".into());
    }
    if capabilities.update {
        lines.push(String::new());
        lines.push(format!("input Update{name}Input {{"));
        lines.push("\tid: ID!".into());
        lines.extend(input_props.iter().map(|p| field(p, false)));
        if translation_props.is_some() {
            lines.push(format!("\ttranslations: [{name}TranslationInput!]"));
        }
        lines.push("}".into());
    }

    if capabilities.find_one || capabilities.find_all {
        lines.push(String::new());
        lines.push("extend type Query {".into());
        if capabilities.find_one {
            lines.push(format!("\t{}(id: ID!): {name}", ops.find_one));
        }
        if capabilities.find_all {
            lines.push(format!(
                "\t{}(options: {name}ListOptions): {name}List!",
                ops.find_all
            ));
        }
        lines.push("}".into());
    }
    if capabilities.create || capabilities.update || capabilities.delete {
        lines.push(String::new());
        lines.push("extend type Mutation {".into());
        if capabilities.create {
            lines.push(format!("\t{}(input: Create{name}Input!): {name}!", ops.create));
        }
        if capabilities.update {
            lines.push(format!("\t{}(input: Update{name}Input!): {name}!", ops.update));
        }
        if capabilities.delete {
            lines.push(format!("\t{}(id: ID!): DeletionResponse!", ops.delete));
        }
        lines.push("}".into());
    }
    lines
}

fn basic_schema(camel: &str) -> Vec<String> {
    vec![
        "extend type Query {".into(),
        format!("\t{camel}Example(id: ID!): String!"),
        "}".into(),
        String::new(),
        "extend type Mutation {".into(),
        format!("\t{camel}ExampleMutation(id: ID!): String!"),
        "}".into(),
    ]
}
