use super::array_names;
use crate::edit::literals::{self, PropertyValue};
use crate::error::AstError;
use crate::markers::{CONFIG_FILE_NAME, CONFIG_TYPE};
use crate::project::Project;
use crate::syntax::{self, TsNode};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The top-level variable typed `VendureConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRef {
    path: PathBuf,
    variable: String,
}

impl ConfigRef {
    /// Locate the config variable. In strict mode only files named
    /// `vendure-config.ts` are considered.
    pub fn find(project: &Project, strict: bool) -> Option<Self> {
        let found = project
            .files()
            .filter(|file| {
                !strict
                    || file.path().file_name().and_then(|n| n.to_str()) == Some(CONFIG_FILE_NAME)
            })
            .find_map(|file| {
                config_variable(&file.root()).map(|variable| Self {
                    path: file.path().to_path_buf(),
                    variable,
                })
            });
        if let Some(config) = &found {
            debug!(
                "Config variable {} in {}",
                config.variable,
                config.path.display()
            );
        }
        found
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// The object literal the variable is initialised with.
    pub fn config_object<'p>(&self, project: &'p Project) -> Result<TsNode<'p>, AstError> {
        let root = project.file(&self.path)?.root();
        config_object_of(&root, &self.variable).ok_or_else(|| AstError::UnexpectedShape {
            path: self.path.clone(),
            detail: format!("'{}' is not initialised with an object literal", self.variable),
        })
    }

    /// Source text of a nested option, e.g. `["apiOptions", "port"]`.
    pub fn property_path(&self, project: &Project, path: &[&str]) -> Option<String> {
        let object = self.config_object(project).ok()?;
        literals::property_at_path(&object, path).map(|node| node.text().to_string())
    }

    pub fn plugin_names(&self, project: &Project) -> Vec<String> {
        self.config_object(project)
            .ok()
            .and_then(|object| literals::property_at_path(&object, &["plugins"]))
            .filter(|plugins| plugins.kind() == "array")
            .map(|plugins| array_names(&plugins))
            .unwrap_or_default()
    }

    pub fn has_plugin(&self, project: &Project, class_name: &str) -> bool {
        self.plugin_names(project).iter().any(|name| name == class_name)
    }

    /// Append a plugin expression (`ReviewsPlugin` or `ReviewsPlugin.init({})`)
    /// to the `plugins` array.
    pub fn add_plugin(&self, project: &mut Project, expression: &str) -> Result<bool, AstError> {
        let variable = self.variable.clone();
        let path = self.path.clone();
        project.modify_file(&path, |view| {
            let object = config_object_of(&view.root, &variable).ok_or_else(|| {
                view.shape_error(format!("'{variable}' is not initialised with an object literal"))
            })?;
            literals::insert_property_or_append_array(
                view,
                &object,
                "plugins",
                PropertyValue::Element(expression.to_string()),
            )
        })
    }
}

fn config_variable(root: &TsNode<'_>) -> Option<String> {
    syntax::top_level_declarations(root)
        .into_iter()
        .find(|declaration| {
            declaration
                .name_node
                .parent()
                .and_then(|declarator| declarator.field("type"))
                .and_then(|annotation| syntax::annotation_type(&annotation))
                .map(|ty| syntax::type_base_name(&ty) == CONFIG_TYPE)
                .unwrap_or(false)
        })
        .map(|declaration| declaration.name)
}

fn config_object_of<'r>(root: &TsNode<'r>, variable: &str) -> Option<TsNode<'r>> {
    let declaration = syntax::find_declaration(root, variable)?;
    let value = declaration.name_node.parent()?.field("value")?;
    let object = syntax::unwrap_expression(&value);
    (object.kind() == "object").then_some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = "import { VendureConfig } from '@vendure/core';

export const config: VendureConfig = {
    apiOptions: {
        port: 3000,
    },
    plugins: [
        AssetServerPlugin.init({ route: 'assets' }),
        DefaultSearchPlugin,
    ],
};
";

    fn setup(name: &str) -> Project {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(Path::new("src/index.ts"), "export const x = 1;\n");
        project.add_source_file(&Path::new("src").join(name), CONFIG);
        project
    }

    #[test]
    fn test_find_and_navigate() {
        let project = setup("vendure-config.ts");
        let config = ConfigRef::find(&project, true).unwrap();
        assert_eq!(config.variable(), "config");
        assert_eq!(
            config.property_path(&project, &["apiOptions", "port"]).as_deref(),
            Some("3000")
        );
        assert_eq!(
            config.plugin_names(&project),
            vec!["AssetServerPlugin", "DefaultSearchPlugin"]
        );
    }

    #[test]
    fn test_strict_mode_requires_file_name() {
        let project = setup("app-config.ts");
        assert!(ConfigRef::find(&project, true).is_none());
        assert!(ConfigRef::find(&project, false).is_some());
    }

    #[test]
    fn test_add_plugin() {
        let mut project = setup("vendure-config.ts");
        let config = ConfigRef::find(&project, true).unwrap();
        assert!(config.add_plugin(&mut project, "ReviewsPlugin.init({})").unwrap());
        assert!(config.has_plugin(&project, "ReviewsPlugin"));
        assert!(project
            .file(config.path())
            .unwrap()
            .text()
            .contains("        DefaultSearchPlugin,\n        ReviewsPlugin.init({}),\n    ],"));
    }
}
