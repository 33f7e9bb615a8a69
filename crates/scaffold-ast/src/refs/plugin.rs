use super::{array_names, modify_class, EntityRef, ServiceRef};
use crate::edit::literals::{self, PropertyValue};
use crate::edit::members::{self, MemberPosition};
use crate::error::AstError;
use crate::markers::{Capability, PLUGIN_DECORATOR};
use crate::project::{ClassHandle, Project};
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, TsNode};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiType {
    Admin,
    Shop,
}

impl ApiType {
    pub fn metadata_property(&self) -> &'static str {
        match self {
            ApiType::Admin => "adminApiExtensions",
            ApiType::Shop => "shopApiExtensions",
        }
    }
}

/// A class decorated with `@VendurePlugin({...})`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRef {
    handle: ClassHandle,
}

impl PluginRef {
    pub fn new(handle: ClassHandle) -> Self {
        Self { handle }
    }

    /// Every plugin class in the project.
    pub fn all(project: &Project) -> Vec<PluginRef> {
        project
            .find_classes_with_marker(PLUGIN_DECORATOR)
            .into_iter()
            .map(PluginRef::new)
            .collect()
    }

    pub fn handle(&self) -> &ClassHandle {
        &self.handle
    }

    pub fn class_name(&self) -> &str {
        &self.handle.name
    }

    pub fn path(&self) -> &Path {
        &self.handle.path
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.handle
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// The object literal passed to `@VendurePlugin`.
    pub fn metadata_object<'p>(&self, project: &'p Project) -> Result<TsNode<'p>, AstError> {
        let class = project.class_node(&self.handle)?;
        metadata_object_of(&class)
            .ok_or_else(|| AstError::MissingPluginMetadata(self.handle.name.clone()))
    }

    pub fn entity_names(&self, project: &Project) -> Vec<String> {
        self.metadata_array(project, "entities")
    }

    pub fn provider_names(&self, project: &Project) -> Vec<String> {
        self.metadata_array(project, "providers")
    }

    /// Entities listed in the metadata that resolve to project classes.
    pub fn entities(&self, project: &Project) -> Vec<EntityRef> {
        self.entity_names(project)
            .iter()
            .filter_map(|name| project.find_class_from(self.path(), name))
            .map(EntityRef::new)
            .collect()
    }

    /// Providers that resolve to project classes, as services.
    pub fn services(&self, project: &Project) -> Vec<ServiceRef> {
        self.provider_names(project)
            .iter()
            .filter_map(|name| project.find_class_from(self.path(), name))
            .map(|handle| ServiceRef::new(project, handle))
            .collect()
    }

    fn metadata_array(&self, project: &Project, property: &str) -> Vec<String> {
        let Ok(object) = self.metadata_object(project) else {
            return Vec::new();
        };
        syntax::find_pair(&object, property)
            .and_then(|pair| pair.field("value"))
            .map(|value| syntax::unwrap_expression(&value))
            .filter(|value| value.kind() == "array")
            .map(|array| array_names(&array))
            .unwrap_or_default()
    }

    pub fn add_entity(&self, project: &mut Project, entity: &str) -> Result<bool, AstError> {
        self.append_to_metadata_array(project, "entities", entity)
    }

    pub fn add_provider(&self, project: &mut Project, provider: &str) -> Result<bool, AstError> {
        self.append_to_metadata_array(project, "providers", provider)
    }

    fn append_to_metadata_array(
        &self,
        project: &mut Project,
        property: &str,
        element: &str,
    ) -> Result<bool, AstError> {
        let changed = self.modify_metadata(project, |view, object| {
            literals::insert_property_or_append_array(
                view,
                object,
                property,
                PropertyValue::Element(element.to_string()),
            )
        })?;
        if changed {
            debug!("Added {} to {}.{}", element, self.class_name(), property);
        }
        Ok(changed)
    }

    /// Register a GraphQL schema extension and its resolvers.
    ///
    /// An existing extension object keeps its schema; resolvers already
    /// listed are not added again.
    pub fn add_api_extension(
        &self,
        project: &mut Project,
        api: ApiType,
        schema: &str,
        resolvers: &[&str],
    ) -> Result<bool, AstError> {
        let property = api.metadata_property();
        let existing = {
            let object = self.metadata_object(project)?;
            syntax::find_pair(&object, property)
                .and_then(|pair| pair.field("value"))
                .map(|value| syntax::unwrap_expression(&value).kind() == "object")
        };

        match existing {
            None => self.modify_metadata(project, |view, object| {
                let indent = member_indent(view, object);
                let inner = format!("{indent}{}", view.settings.indent);
                let initializer = format!(
                    "{{\n{inner}schema: {schema},\n{inner}resolvers: [{}],\n{indent}}}",
                    resolvers.join(", ")
                );
                literals::insert_property_or_append_array(
                    view,
                    object,
                    property,
                    PropertyValue::Initializer(initializer),
                )
            }),
            Some(false) => {
                debug!(
                    "{}.{} is not an object literal; leaving it unchanged",
                    self.class_name(),
                    property
                );
                Ok(false)
            }
            Some(true) => {
                let mut changed = self.modify_extension(project, property, |view, ext| {
                    if syntax::find_member(ext, "schema").is_some() {
                        return Ok(Vec::new());
                    }
                    literals::insert_property_or_append_array(
                        view,
                        ext,
                        "schema",
                        PropertyValue::Initializer(schema.to_string()),
                    )
                })?;
                for resolver in resolvers {
                    changed |= self.modify_extension(project, property, |view, ext| {
                        if literals::array_contains(ext, "resolvers", resolver) {
                            return Ok(Vec::new());
                        }
                        literals::insert_property_or_append_array(
                            view,
                            ext,
                            "resolvers",
                            PropertyValue::Element(resolver.to_string()),
                        )
                    })?;
                }
                Ok(changed)
            }
        }
    }

    /// Create a string-valued metadata property, or verify it already has
    /// this value.
    pub fn set_metadata_property(
        &self,
        project: &mut Project,
        name: &str,
        value: &str,
    ) -> Result<bool, AstError> {
        self.modify_metadata(project, |view, object| {
            literals::set_string_property(view, object, name, value)
        })
    }

    pub fn metadata_property_text(&self, project: &Project, name: &str) -> Option<String> {
        let object = self.metadata_object(project).ok()?;
        syntax::find_pair(&object, name)
            .and_then(|pair| pair.field("value"))
            .map(|value| value.text().to_string())
    }

    /// Whether the plugin declares a static property typed `AdminUiExtension`.
    pub fn has_ui_extensions(&self, project: &Project) -> bool {
        let Ok(class) = project.class_node(&self.handle) else {
            return false;
        };
        Capability::UiExtensions.is_implemented_by(&class)
    }

    /// Add the static UI extension property unless one exists.
    pub fn add_ui_extension_property(
        &self,
        project: &mut Project,
        snippet: &str,
    ) -> Result<bool, AstError> {
        if self.has_ui_extensions(project) {
            return Ok(false);
        }
        modify_class(project, &self.handle, |view, class| {
            members::add_class_member(view, class, snippet, MemberPosition::Start)
        })
    }

    fn modify_metadata<F>(&self, project: &mut Project, f: F) -> Result<bool, AstError>
    where
        F: FnOnce(&FileView<'_>, &TsNode<'_>) -> Result<Vec<TextEdit>, AstError>,
    {
        let name = self.handle.name.clone();
        modify_class(project, &self.handle, |view, class| {
            let object =
                metadata_object_of(class).ok_or_else(|| AstError::MissingPluginMetadata(name))?;
            f(view, &object)
        })
    }

    fn modify_extension<F>(&self, project: &mut Project, property: &str, f: F) -> Result<bool, AstError>
    where
        F: FnOnce(&FileView<'_>, &TsNode<'_>) -> Result<Vec<TextEdit>, AstError>,
    {
        self.modify_metadata(project, |view, object| {
            let ext = syntax::find_pair(object, property)
                .and_then(|pair| pair.field("value"))
                .map(|value| syntax::unwrap_expression(&value))
                .filter(|value| value.kind() == "object")
                .ok_or_else(|| view.shape_error(format!("{property} is not an object literal")))?;
            f(view, &ext)
        })
    }
}

fn metadata_object_of<'r>(class: &TsNode<'r>) -> Option<TsNode<'r>> {
    let decorators = syntax::class_decorators(class);
    let decorator = syntax::find_decorator(&decorators, PLUGIN_DECORATOR)?;
    syntax::decorator_arguments(&decorator)
        .first()
        .map(syntax::unwrap_expression)
        .filter(|arg| arg.kind() == "object")
}

/// Indentation of the members of `object`.
fn member_indent(view: &FileView<'_>, object: &TsNode<'_>) -> String {
    match syntax::object_members(object).first() {
        Some(first) if view.text[object.range().start..first.range().start].contains('\n') => {
            view.indent_at(first.range().start)
        }
        _ => format!("{}{}", view.indent_at(object.range().start), view.settings.indent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    const PLUGIN: &str = "import { PluginCommonModule, VendurePlugin } from '@vendure/core';

@VendurePlugin({
    imports: [PluginCommonModule],
    providers: [ReviewService],
})
export class ReviewsPlugin {}
";

    fn setup(source: &str) -> (Project, PluginRef) {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(Path::new("src/plugins/reviews/reviews.plugin.ts"), source);
        let plugin = PluginRef::all(&project).remove(0);
        (project, plugin)
    }

    fn text(project: &Project, plugin: &PluginRef) -> String {
        project.file(plugin.path()).unwrap().text().to_string()
    }

    #[test]
    fn test_add_entity_and_provider() {
        let (mut project, plugin) = setup(PLUGIN);
        assert_eq!(plugin.plugin_dir(), PathBuf::from("/p/src/plugins/reviews"));
        assert!(plugin.add_entity(&mut project, "Review").unwrap());
        assert!(plugin.add_entity(&mut project, "Coupon").unwrap());
        assert!(plugin.add_provider(&mut project, "CouponService").unwrap());
        assert_eq!(plugin.entity_names(&project), vec!["Review", "Coupon"]);
        assert_eq!(
            plugin.provider_names(&project),
            vec!["ReviewService", "CouponService"]
        );
        assert!(text(&project, &plugin).contains("    entities: [Review, Coupon],\n"));
    }

    #[test]
    fn test_add_api_extension_creates_then_merges() {
        let (mut project, plugin) = setup(PLUGIN);
        plugin
            .add_api_extension(&mut project, ApiType::Admin, "adminApiExtensions", &["ReviewResolver"])
            .unwrap();
        assert!(text(&project, &plugin).contains(
            "    adminApiExtensions: {\n        schema: adminApiExtensions,\n        resolvers: [ReviewResolver],\n    },\n"
        ));

        let changed = plugin
            .add_api_extension(&mut project, ApiType::Admin, "otherSchema", &["ReviewResolver"])
            .unwrap();
        assert!(!changed);

        plugin
            .add_api_extension(&mut project, ApiType::Admin, "otherSchema", &["CouponResolver"])
            .unwrap();
        assert!(text(&project, &plugin)
            .contains("resolvers: [ReviewResolver, CouponResolver],"));
        assert!(!text(&project, &plugin).contains("otherSchema"));
    }

    #[test]
    fn test_set_metadata_property() {
        let (mut project, plugin) = setup(PLUGIN);
        assert!(plugin
            .set_metadata_property(&mut project, "dashboard", "./dashboard/index.tsx")
            .unwrap());
        assert!(!plugin
            .set_metadata_property(&mut project, "dashboard", "./dashboard/index.tsx")
            .unwrap());
        let before = text(&project, &plugin);
        let err = plugin
            .set_metadata_property(&mut project, "dashboard", "./other/index.tsx")
            .unwrap_err();
        assert!(matches!(err, AstError::MetadataConflict { .. }));
        assert_eq!(text(&project, &plugin), before);
    }

    #[test]
    fn test_missing_metadata_object() {
        let (mut project, plugin) =
            setup("@VendurePlugin(config)\nexport class Odd {}\n");
        assert!(matches!(
            plugin.add_entity(&mut project, "X"),
            Err(AstError::MissingPluginMetadata(_))
        ));
    }

    #[test]
    fn test_ui_extension_property() {
        let (mut project, plugin) = setup(PLUGIN);
        assert!(!plugin.has_ui_extensions(&project));
        let snippet = "static ui: AdminUiExtension = {\n    extensionPath: path.join(__dirname, 'ui'),\n};";
        assert!(plugin.add_ui_extension_property(&mut project, snippet).unwrap());
        assert!(plugin.has_ui_extensions(&project));
        assert!(!plugin.add_ui_extension_property(&mut project, snippet).unwrap());
        assert!(text(&project, &plugin).contains(
            "export class ReviewsPlugin {\n    static ui: AdminUiExtension = {\n        extensionPath: path.join(__dirname, 'ui'),\n    };\n}\n"
        ));
    }
}
