//! Command orchestrators.
//!
//! Each `add`/`create` command validates its inputs, resolves the plugin or
//! service it targets, edits the in-memory [`Project`] through references and
//! editors, and persists once at the very end. Nothing is written when a
//! command fails or is cancelled part-way.

pub mod add_api_extension;
pub mod add_dashboard;
pub mod add_entity;
pub mod add_job_queue;
pub mod add_service;
pub mod add_ui_extension;
pub mod config;
pub mod create_plugin;
pub mod select;

use crate::errors::CommandError;
use crate::install::{Dependency, PackageInstaller};
use crate::naming;
use crate::prompt::{Prompter, Validator};
use crate::result::CommandResult;
use scaffold_ast::edit::remove_unused_imports;
use scaffold_ast::{EntityRef, PluginRef, Project, ServiceRef};
use scaffold_logger as logger;
use select::{Selection, Target};
use std::path::Path;

/// Everything a command needs for one invocation.
pub struct Session {
    pub project: Project,
    pub prompter: Box<dyn Prompter>,
    pub installer: Box<dyn PackageInstaller>,
    pub interactive: bool,
}

impl Session {
    pub fn new(
        project: Project,
        prompter: Box<dyn Prompter>,
        installer: Box<dyn PackageInstaller>,
        interactive: bool,
    ) -> Self {
        Self {
            project,
            prompter,
            installer,
            interactive,
        }
    }

    /// Resolve the target plugin. `reviews` matches `ReviewsPlugin`.
    pub fn select_plugin(&mut self, name: Option<String>) -> Result<PluginRef, CommandError> {
        let candidates = PluginRef::all(&self.project);
        let target = match name {
            Some(name) if !candidates.iter().any(|p| p.class_name() == name) => {
                Target::Named(naming::plugin_class_name(&name))
            }
            other => Target::from(other),
        };
        let selection = Selection {
            kind: "Plugin",
            candidates,
            interactive: self.interactive,
            hint: "Pass --plugin <name>",
        };
        let plugin = selection.resolve(target, self.prompter.as_mut())?;
        logger::debug(&format!(
            "Using plugin {} in {}",
            plugin.class_name(),
            plugin.path().display()
        ));
        Ok(plugin)
    }

    pub fn select_service(
        &mut self,
        plugin: &PluginRef,
        name: Option<String>,
    ) -> Result<ServiceRef, CommandError> {
        let selection = Selection {
            kind: "Service",
            candidates: plugin.services(&self.project),
            interactive: self.interactive,
            hint: "Pass --service <name>, or add one with `scaffold add service`",
        };
        selection.resolve(Target::from(name), self.prompter.as_mut())
    }

    pub fn select_entity(
        &mut self,
        plugin: &PluginRef,
        name: Option<String>,
    ) -> Result<EntityRef, CommandError> {
        let selection = Selection {
            kind: "Entity",
            candidates: plugin.entities(&self.project),
            interactive: self.interactive,
            hint: "Pass --entity <name>, or add one with `scaffold add entity`",
        };
        selection.resolve(Target::from(name), self.prompter.as_mut())
    }

    /// A required text value: validated when given, prompted for when
    /// interactive, otherwise a `MissingRequired` error.
    pub fn text(
        &mut self,
        value: Option<String>,
        prompt: &str,
        validator: Validator,
        missing: (&str, &str),
    ) -> Result<String, CommandError> {
        match value {
            Some(value) => {
                validator(&value).map_err(|message| CommandError::validation(message, missing.1))?;
                Ok(value)
            }
            None if self.interactive => Ok(self.prompter.text(prompt, Some(validator))?),
            None => Err(CommandError::missing(missing.0, missing.1)),
        }
    }

    /// A yes/no option: the flag when given, a prompt when interactive,
    /// otherwise `default`.
    pub fn confirm(&mut self, value: Option<bool>, prompt: &str, default: bool) -> Result<bool, CommandError> {
        match value {
            Some(value) => Ok(value),
            None if self.interactive => Ok(self.prompter.confirm(prompt, default)?),
            None => Ok(default),
        }
    }

    /// Persist every edit, then install what the new code imports.
    pub fn finish(
        &mut self,
        result: CommandResult,
        dependencies: &[Dependency],
    ) -> Result<CommandResult, CommandError> {
        let written = self.project.persist()?;
        tracing::debug!(files = written.len(), "persisted project edits");
        let root = self.project.root_dir().to_path_buf();
        let mut result = result.with_files(&root, &written);
        if !dependencies.is_empty() {
            let installed = self.installer.install(&root, dependencies)?;
            if !installed.is_empty() {
                result = result.with("installed", installed);
            }
        }
        Ok(result)
    }
}

/// Run a command and turn any error into a failed [`CommandResult`].
pub fn execute<F>(session: &mut Session, command: F) -> CommandResult
where
    F: FnOnce(&mut Session) -> Result<CommandResult, CommandError>,
{
    match command(session) {
        Ok(result) => result,
        Err(err) => {
            if err.is_structural() {
                logger::error(&error_chain(&err));
            } else {
                logger::debug(&format!("Command failed: {err:?}"));
            }
            CommandResult::from_error(&err)
        }
    }
}

fn error_chain(err: &CommandError) -> String {
    let mut chain = format!("{err:?}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        chain.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    chain
}

/// Fail when a file the command would create is already present.
pub(crate) fn ensure_absent(project: &Project, path: &Path, what: &str) -> Result<(), CommandError> {
    let absolute = project.absolute_path(path);
    if project.contains(&absolute) || absolute.exists() {
        return Err(CommandError::validation(
            format!("{what} {} already exists", absolute.display()),
            "Choose a different name",
        ));
    }
    Ok(())
}

/// Fail when a class of this name is already declared anywhere.
pub(crate) fn ensure_class_free(project: &Project, name: &str) -> Result<(), CommandError> {
    if let Some(existing) = project.find_class(name) {
        return Err(CommandError::validation(
            format!("A class named {name} already exists in {}", existing.path.display()),
            "Choose a different name",
        ));
    }
    Ok(())
}

pub(crate) fn tidy_imports(project: &mut Project, path: &Path) -> Result<(), CommandError> {
    project.modify_file(path, |view| remove_unused_imports(view))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::install::NoopInstaller;
    use crate::prompt::{Answer, ScriptedPrompter};
    use scaffold_ast::ManipulationSettings;

    pub const PLUGIN_PATH: &str = "/p/src/plugins/reviews/reviews.plugin.ts";

    pub const PLUGIN: &str = "import { PluginCommonModule, VendurePlugin } from '@vendure/core';

@VendurePlugin({
    imports: [PluginCommonModule],
})
export class ReviewsPlugin {}
";

    pub fn project_with_plugin() -> Project {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(Path::new(PLUGIN_PATH), PLUGIN);
        project
    }

    pub fn session(project: Project, answers: Vec<Answer>, interactive: bool) -> Session {
        Session::new(
            project,
            Box::new(ScriptedPrompter::new(answers)),
            Box::new(NoopInstaller),
            interactive,
        )
    }

    pub fn text(session: &Session, path: &str) -> String {
        session.project.file(Path::new(path)).unwrap().text().to_string()
    }

    /// A session whose project root is a temporary directory, for commands
    /// that persist.
    pub fn temp_session(answers: Vec<Answer>, interactive: bool) -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::in_memory(dir.path(), ManipulationSettings::default());
        project.add_source_file(&dir.path().join(PLUGIN_RELATIVE), PLUGIN);
        (dir, session(project, answers, interactive))
    }

    pub const PLUGIN_RELATIVE: &str = "src/plugins/reviews/reviews.plugin.ts";

    /// Text of a file given relative to the project root.
    pub fn text_at(session: &Session, relative: &str) -> String {
        let path = session.project.root_dir().join(relative);
        session.project.file(&path).unwrap().text().to_string()
    }
}
