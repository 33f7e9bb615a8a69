//! `scaffold add dashboard`

use super::{ensure_absent, Session};
use crate::errors::CommandError;
use crate::install::Dependency;
use crate::result::CommandResult;
use crate::templates;
use clap::Args;
use scaffold_ast::{instantiate, AstError, Instantiation, PluginRef, Project};
use scaffold_logger as logger;
use std::path::PathBuf;

const DASHBOARD_ENTRY: &str = "./dashboard/index.tsx";

#[derive(Args, Debug, Clone, Default)]
pub struct AddDashboardOptions {
    /// Plugin to extend
    #[arg(long)]
    pub plugin: Option<String>,
}

pub fn run(session: &mut Session, options: &AddDashboardOptions) -> Result<CommandResult, CommandError> {
    let plugin = session.select_plugin(options.plugin.clone())?;
    logger::step(&format!("Adding dashboard extension to {}", plugin.class_name()));
    let entry = add_dashboard(&mut session.project, &plugin)?;
    let relative = entry
        .strip_prefix(session.project.root_dir())
        .unwrap_or(&entry)
        .to_string_lossy()
        .replace('\\', "/");
    session.finish(
        CommandResult::ok(format!("Added dashboard extension to {}", plugin.class_name()))
            .with("plugin", plugin.class_name())
            .with("entry", relative),
        &[Dependency::dev("@vendure/dashboard")],
    )
}

pub fn add_dashboard(project: &mut Project, plugin: &PluginRef) -> Result<PathBuf, CommandError> {
    let entry = plugin.plugin_dir().join("dashboard").join("index.tsx");
    ensure_absent(project, &entry, "Dashboard entry file")?;

    plugin
        .set_metadata_property(project, "dashboard", DASHBOARD_ENTRY)
        .map_err(|err| match err {
            AstError::MetadataConflict { existing, .. } => CommandError::validation(
                format!("{} already declares a dashboard extension at {existing}", plugin.class_name()),
                "Extend the existing dashboard entry instead",
            ),
            other => other.into(),
        })?;
    instantiate(project, &templates::dashboard_index(), &entry, &Instantiation::new())?;
    Ok(entry)
}
