use super::modify_class;
use crate::error::AstError;
use crate::markers::Capability;
use crate::project::{ClassHandle, Project};
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, TsNode};
use std::path::Path;

/// A property declared on an entity class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityProp {
    pub name: String,
    /// Declared type with `null` and `undefined` branches removed.
    pub type_text: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    handle: ClassHandle,
}

impl EntityRef {
    pub fn new(handle: ClassHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ClassHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn path(&self) -> &Path {
        &self.handle.path
    }

    pub fn has_capability(&self, project: &Project, capability: Capability) -> bool {
        project
            .class_node(&self.handle)
            .map(|class| capability.is_implemented_by(&class))
            .unwrap_or(false)
    }

    pub fn is_translatable(&self, project: &Project) -> bool {
        self.has_capability(project, Capability::Translatable)
    }

    pub fn has_custom_fields(&self, project: &Project) -> bool {
        self.has_capability(project, Capability::HasCustomFields)
    }

    /// Instance properties in declaration order.
    pub fn props(&self, project: &Project) -> Vec<EntityProp> {
        let Ok(class) = project.class_node(&self.handle) else {
            return Vec::new();
        };
        syntax::class_properties(&class)
            .iter()
            .filter(|property| !syntax::is_static(property))
            .filter_map(entity_prop)
            .collect()
    }

    /// The translation class named by the relation decorator on
    /// `translations`, e.g. `@OneToMany(type => WidgetTranslation, ...)`.
    pub fn translation_class(&self, project: &Project) -> Option<ClassHandle> {
        let class = project.class_node(&self.handle).ok()?;
        let property = syntax::find_property(&class, "translations")?;
        let name = syntax::member_decorators(&property)
            .iter()
            .find_map(|decorator| {
                let arrow = syntax::decorator_arguments(decorator).into_iter().next()?;
                if arrow.kind() != "arrow_function" {
                    return None;
                }
                let body = syntax::unwrap_expression(&arrow.field("body")?);
                (body.kind() == "identifier").then(|| body.text().to_string())
            })?;
        project.find_class_from(&self.handle.path, &name)
    }

    pub fn edit<F>(&self, project: &mut Project, f: F) -> Result<bool, AstError>
    where
        F: FnOnce(&FileView<'_>, &TsNode<'_>) -> Result<Vec<TextEdit>, AstError>,
    {
        modify_class(project, &self.handle, f)
    }
}

fn entity_prop(property: &TsNode<'_>) -> Option<EntityProp> {
    let name = syntax::member_name(property)?;
    let optional = syntax::has_token(property, "?");
    let Some(ty) = property
        .field("type")
        .and_then(|annotation| syntax::annotation_type(&annotation))
    else {
        return Some(EntityProp {
            name,
            type_text: "any".to_string(),
            nullable: optional,
        });
    };
    let members = syntax::union_members(&ty);
    let kept: Vec<String> = members
        .iter()
        .filter(|member| !syntax::is_nullish_type(member))
        .map(|member| member.text().to_string())
        .collect();
    Some(EntityProp {
        name,
        nullable: optional || kept.len() < members.len(),
        type_text: kept.join(" | "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    const WIDGET: &str = "import { WidgetTranslation } from './widget-translation.entity';

@Entity()
export class Widget extends VendureEntity implements Translatable, HasCustomFields {
    static readonly kind = 'widget';

    @Column()
    code: string;

    @Column({ nullable: true })
    description: string | null;

    rating?: number;

    @OneToMany(type => WidgetTranslation, translation => translation.base, { eager: true })
    translations: Array<Translation<Widget>>;
}
";

    fn setup() -> (Project, EntityRef) {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(Path::new("src/widget.entity.ts"), WIDGET);
        project.add_source_file(
            Path::new("src/widget-translation.entity.ts"),
            "export class WidgetTranslation extends VendureEntity {}\n",
        );
        let entity = EntityRef::new(project.find_class("Widget").unwrap());
        (project, entity)
    }

    #[test]
    fn test_capabilities() {
        let (project, entity) = setup();
        assert!(entity.is_translatable(&project));
        assert!(entity.has_custom_fields(&project));
    }

    #[test]
    fn test_props_strip_nullish_types() {
        let (project, entity) = setup();
        let props = entity.props(&project);
        let summary: Vec<(&str, &str, bool)> = props
            .iter()
            .map(|p| (p.name.as_str(), p.type_text.as_str(), p.nullable))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("code", "string", false),
                ("description", "string", true),
                ("rating", "number", true),
                ("translations", "Array<Translation<Widget>>", false),
            ]
        );
    }

    #[test]
    fn test_translation_class() {
        let (project, entity) = setup();
        let translation = entity.translation_class(&project).unwrap();
        assert_eq!(translation.name, "WidgetTranslation");
        assert_eq!(
            translation.path,
            Path::new("/p/src/widget-translation.entity.ts")
        );
    }
}
