//! `scaffold add ui-extension`

use super::{ensure_absent, Session};
use crate::errors::CommandError;
use crate::install::Dependency;
use crate::naming;
use crate::result::CommandResult;
use crate::templates;
use clap::Args;
use scaffold_ast::edit::{add_import, ImportSpec, ModuleSpecifier};
use scaffold_ast::{instantiate, Instantiation, PluginRef, Project};
use scaffold_logger as logger;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct AddUiExtensionOptions {
    /// Plugin to extend
    #[arg(long)]
    pub plugin: Option<String>,
}

pub fn run(session: &mut Session, options: &AddUiExtensionOptions) -> Result<CommandResult, CommandError> {
    let plugin = session.select_plugin(options.plugin.clone())?;
    logger::step(&format!("Adding Admin UI extension to {}", plugin.class_name()));
    add_ui_extension(&mut session.project, &plugin)?;
    session.finish(
        CommandResult::ok(format!("Added Admin UI extension to {}", plugin.class_name()))
            .with("plugin", plugin.class_name()),
        &[Dependency::dev("@vendure/ui-devkit")],
    )
}

/// The `ui/` directory next to the plugin file.
pub fn ui_dir(plugin: &PluginRef) -> PathBuf {
    plugin.plugin_dir().join("ui")
}

pub fn add_ui_extension(project: &mut Project, plugin: &PluginRef) -> Result<(), CommandError> {
    if plugin.has_ui_extensions(project) {
        return Err(CommandError::validation(
            format!("{} already has UI extensions", plugin.class_name()),
            "Edit the existing `ui` property of the plugin instead",
        ));
    }
    let dir = ui_dir(plugin);
    let providers = dir.join("providers.ts");
    let routes = dir.join("routes.ts");
    ensure_absent(project, &providers, "UI providers file")?;
    ensure_absent(project, &routes, "UI routes file")?;

    let id = naming::plugin_dir_name(plugin.class_name());
    let quote = |s: &str| project.settings().quote(s);
    let snippet = format!(
        "static ui: AdminUiExtension = {{
    id: {id_value},
    extensionPath: path.join(__dirname, {ui}),
    routes: [{{ route: {route}, filePath: {routes_file} }}],
    providers: [{providers_file}],
}};",
        id_value = quote(&format!("{id}-ui")),
        ui = quote("ui"),
        route = quote(&id),
        routes_file = quote("routes.ts"),
        providers_file = quote("providers.ts"),
    );
    plugin.add_ui_extension_property(project, &snippet)?;
    add_import(
        project,
        plugin.path(),
        &ImportSpec::from_package("@vendure/ui-devkit/compiler", &["AdminUiExtension"]),
    )?;
    add_import(
        project,
        plugin.path(),
        &ImportSpec::namespace(ModuleSpecifier::Literal("path".to_string()), "path"),
    )?;

    instantiate(project, &templates::ui_providers(), &providers, &Instantiation::new())?;
    instantiate(project, &templates::ui_routes(), &routes, &Instantiation::new())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::prompt::Answer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ui_extension_added_to_plugin() {
        let (dir, mut session) = temp_session(vec![], false);
        let result = run(
            &mut session,
            &AddUiExtensionOptions {
                plugin: Some("ReviewsPlugin".into()),
            },
        )
        .unwrap();
        assert!(result.success);

        let plugin = text_at(&session, PLUGIN_RELATIVE);
        assert_eq!(
            plugin,
            "import { PluginCommonModule, VendurePlugin } from '@vendure/core';
import { AdminUiExtension } from '@vendure/ui-devkit/compiler';
import * as path from 'path';

@VendurePlugin({
    imports: [PluginCommonModule],
})
export class ReviewsPlugin {
    static ui: AdminUiExtension = {
        id: 'reviews-ui',
        extensionPath: path.join(__dirname, 'ui'),
        routes: [{ route: 'reviews', filePath: 'routes.ts' }],
        providers: ['providers.ts'],
    };
}
"
        );
        assert_eq!(session.project.flush_count(), 1);
        assert!(dir.path().join("src/plugins/reviews/ui/providers.ts").is_file());
        assert!(text_at(&session, "src/plugins/reviews/ui/routes.ts").contains("export default ["));
        assert_eq!(
            result.fields["files"].as_array().map(Vec::len),
            Some(3)
        );
    }

    #[test]
    fn test_second_ui_extension_is_rejected() {
        let (_dir, mut session) =
            temp_session(vec![Answer::Choose("ReviewsPlugin".into())], true);
        let result = run(&mut session, &AddUiExtensionOptions::default()).unwrap();
        assert!(result.success);

        let plugin = PluginRef::all(&session.project).remove(0);
        let err = add_ui_extension(&mut session.project, &plugin).unwrap_err();
        assert_eq!(err.to_string(), "ReviewsPlugin already has UI extensions");
    }
}
