//! `scaffold create plugin`

use super::{ensure_absent, ensure_class_free, Session};
use crate::errors::CommandError;
use crate::naming;
use crate::result::CommandResult;
use crate::templates;
use clap::Args;
use scaffold_ast::edit::literals::set_variable_initializer;
use scaffold_ast::edit::{add_import, ImportSpec};
use scaffold_ast::{instantiate, ConfigRef, Instantiation, Project};
use scaffold_logger as logger;
use std::path::{Path, PathBuf};

const DEFAULT_PLUGINS_DIR: &str = "src/plugins";

#[derive(Args, Debug, Clone, Default)]
pub struct CreatePluginOptions {
    /// Plugin name, e.g. reviews or ReviewsPlugin
    #[arg(long)]
    pub name: Option<String>,

    /// Directory the plugin directory is created in
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,
}

/// Files of a newly created plugin and where it was registered.
#[derive(Debug, Clone)]
pub struct CreatedPlugin {
    pub class_name: String,
    pub plugin_file: PathBuf,
    pub registered_in: Option<PathBuf>,
}

pub fn run(session: &mut Session, options: &CreatePluginOptions) -> Result<CommandResult, CommandError> {
    let name = session.text(
        options.name.clone(),
        "What is the name of the plugin?",
        naming::validate_plugin_name,
        ("Plugin name is required", "Pass --name <plugin-name>"),
    )?;
    let parent = options
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGINS_DIR));

    let class_name = naming::plugin_class_name(&name);
    logger::step(&format!("Creating {class_name}"));
    let created = create_plugin(&mut session.project, &name, &parent)?;
    let mut result = CommandResult::ok(format!("Created {}", created.class_name))
        .with("plugin", created.class_name.as_str());
    if let Some(config) = &created.registered_in {
        result = result.with("config", config.to_string_lossy().into_owned());
    }
    session.finish(result, &[])
}

pub fn create_plugin(project: &mut Project, name: &str, parent: &Path) -> Result<CreatedPlugin, CommandError> {
    let class_name = naming::plugin_class_name(name);
    let dir_name = naming::plugin_dir_name(name);
    let dir = project.absolute_path(parent).join(&dir_name);
    let plugin_file = dir.join(format!("{dir_name}.plugin.ts"));
    let constants_file = dir.join("constants.ts");
    let types_file = dir.join("types.ts");
    for path in [&plugin_file, &constants_file, &types_file] {
        ensure_absent(project, path, "Plugin file")?;
    }
    ensure_class_free(project, &class_name)?;

    instantiate(
        project,
        &templates::plugin(),
        &plugin_file,
        &Instantiation::new().rename("TemplatePlugin", class_name.as_str()),
    )?;

    // Renaming the token in constants.ts also updates the plugin's import.
    let options_token = format!("{}_OPTIONS", naming::constant(&class_name));
    instantiate(
        project,
        &templates::plugin_constants(),
        &constants_file,
        &Instantiation::new().rename("TEMPLATE_PLUGIN_OPTIONS", options_token.as_str()),
    )?;
    let quote = |s: &str| project.settings().quote(s);
    let symbol = format!("Symbol({})", quote(&options_token));
    let logger_ctx = quote(&class_name);
    project.modify_file(&constants_file, |view| {
        set_variable_initializer(view, &options_token, &symbol)
    })?;
    project.modify_file(&constants_file, |view| {
        set_variable_initializer(view, "loggerCtx", &logger_ctx)
    })?;

    instantiate(project, &templates::plugin_types(), &types_file, &Instantiation::new())?;

    let registered_in = register_in_config(project, &class_name, &plugin_file)?;
    Ok(CreatedPlugin {
        class_name,
        plugin_file,
        registered_in,
    })
}

/// Add `Plugin.init({})` to the config's `plugins` array. A project without
/// a recognisable config only gets a warning.
fn register_in_config(
    project: &mut Project,
    class_name: &str,
    plugin_file: &Path,
) -> Result<Option<PathBuf>, CommandError> {
    let Some(config) = ConfigRef::find(project, true).or_else(|| ConfigRef::find(project, false)) else {
        logger::warn(&format!(
            "No VendureConfig found; add {class_name}.init({{}}) to your config's plugins manually"
        ));
        return Ok(None);
    };
    if config.has_plugin(project, class_name) {
        return Ok(Some(config.path().to_path_buf()));
    }
    config.add_plugin(project, &format!("{class_name}.init({{}})"))?;
    add_import(project, config.path(), &ImportSpec::from_file(plugin_file, &[class_name]))?;
    logger::debug(&format!("Registered {class_name} in {}", config.path().display()));
    Ok(Some(config.path().to_path_buf()))
}
