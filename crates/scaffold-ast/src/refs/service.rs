use super::{modify_class, EntityRef};
use crate::edit::members::{self, MemberPosition};
use crate::error::AstError;
use crate::markers::BASE_ENTITY;
use crate::project::{ClassHandle, Project};
use crate::source::{FileView, TextEdit};
use crate::syntax::{self, TsNode};
use std::path::Path;
use tracing::debug;

/// CRUD method names in entity-inference priority order.
pub const CRUD_METHODS: [&str; 5] = ["findOne", "findAll", "create", "update", "delete"];

const MAX_UNWRAP_DEPTH: usize = 8;

/// Which CRUD methods a service declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrudCapabilities {
    pub find_one: bool,
    pub find_all: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl CrudCapabilities {
    pub fn all() -> Self {
        Self {
            find_one: true,
            find_all: true,
            create: true,
            update: true,
            delete: true,
        }
    }

    /// Only the named methods. Unknown names are ignored.
    pub fn only<S: AsRef<str>>(methods: &[S]) -> Self {
        let mut capabilities = Self::default();
        for method in methods {
            match method.as_ref() {
                "findOne" => capabilities.find_one = true,
                "findAll" => capabilities.find_all = true,
                "create" => capabilities.create = true,
                "update" => capabilities.update = true,
                "delete" => capabilities.delete = true,
                _ => {}
            }
        }
        capabilities
    }

    pub fn any(&self) -> bool {
        self.find_one || self.find_all || self.create || self.update || self.delete
    }

    /// Flag for a method name from [`CRUD_METHODS`].
    pub fn has(&self, method: &str) -> bool {
        match method {
            "findOne" => self.find_one,
            "findAll" => self.find_all,
            "create" => self.create,
            "update" => self.update,
            "delete" => self.delete,
            _ => false,
        }
    }

    fn from_class(class: &TsNode<'_>) -> Self {
        let has = |name| syntax::find_method(class, name).is_some();
        Self {
            find_one: has("findOne"),
            find_all: has("findAll"),
            create: has("create"),
            update: has("update"),
            delete: has("delete"),
        }
    }
}

/// A constructor-injected dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub name: String,
    pub type_name: String,
    pub scope: Option<String>,
}

impl Injection {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    fn parameter(&self) -> String {
        format!(
            "{} {}: {}",
            self.scope.as_deref().unwrap_or("private"),
            self.name,
            self.type_name
        )
    }
}

/// A service class with its CRUD capabilities and the entity it manages,
/// both computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    handle: ClassHandle,
    capabilities: CrudCapabilities,
    entity: Option<EntityRef>,
}

impl ServiceRef {
    /// Inspect a class. Never fails: an unreadable class has no capabilities
    /// and no entity.
    pub fn new(project: &Project, handle: ClassHandle) -> Self {
        let (capabilities, entity) = match project.class_node(&handle) {
            Ok(class) => (
                CrudCapabilities::from_class(&class),
                infer_entity(project, &handle.path, &class),
            ),
            Err(_) => (CrudCapabilities::default(), None),
        };
        if let Some(entity) = &entity {
            debug!("{} manages entity {}", handle.name, entity.name());
        }
        Self {
            handle,
            capabilities,
            entity,
        }
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

    pub fn capabilities(&self) -> CrudCapabilities {
        self.capabilities
    }

    pub fn entity(&self) -> Option<&EntityRef> {
        self.entity.as_ref()
    }

    pub fn has_method(&self, project: &Project, name: &str) -> bool {
        project
            .class_node(&self.handle)
            .map(|class| syntax::find_method(&class, name).is_some())
            .unwrap_or(false)
    }

    /// Add a constructor parameter to every constructor that lacks one by
    /// that name. A class without a constructor gets one.
    pub fn inject_dependency(
        &self,
        project: &mut Project,
        injection: &Injection,
    ) -> Result<bool, AstError> {
        let parameter = injection.parameter();
        modify_class(project, &self.handle, |view, class| {
            let constructors = syntax::constructors(class);
            if constructors.is_empty() {
                return members::add_class_member(
                    view,
                    class,
                    &format!("constructor({parameter}) {{}}"),
                    MemberPosition::AfterProperties,
                );
            }
            let mut edits = Vec::new();
            for constructor in constructors {
                let present = syntax::parameters(&constructor)
                    .iter()
                    .any(|p| syntax::parameter_name(p).as_deref() == Some(injection.name.as_str()));
                if !present {
                    edits.extend(members::add_constructor_parameter(
                        view,
                        &constructor,
                        &parameter,
                    )?);
                }
            }
            Ok(edits)
        })
    }

    pub fn add_property(&self, project: &mut Project, name: &str, snippet: &str) -> Result<bool, AstError> {
        modify_class(project, &self.handle, |view, class| {
            members::add_class_property(view, class, name, snippet)
        })
    }

    pub fn add_method(&self, project: &mut Project, name: &str, snippet: &str) -> Result<bool, AstError> {
        modify_class(project, &self.handle, |view, class| {
            members::add_method(view, class, name, snippet)
        })
    }

    /// Run any editor against this service's class.
    pub fn edit<F>(&self, project: &mut Project, f: F) -> Result<bool, AstError>
    where
        F: FnOnce(&FileView<'_>, &TsNode<'_>) -> Result<Vec<TextEdit>, AstError>,
    {
        modify_class(project, &self.handle, f)
    }
}

fn infer_entity(project: &Project, path: &Path, class: &TsNode<'_>) -> Option<EntityRef> {
    CRUD_METHODS.iter().find_map(|name| {
        let method = syntax::find_method(class, name)?;
        let return_type = syntax::annotation_type(&method.field("return_type")?)?;
        resolve_entity_type(project, path, &return_type, 0).map(EntityRef::new)
    })
}

/// Unwrap a type annotation down to a class extending the base entity.
fn resolve_entity_type(
    project: &Project,
    from: &Path,
    ty: &TsNode<'_>,
    depth: usize,
) -> Option<ClassHandle> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    match ty.kind().as_ref() {
        "union_type" => syntax::union_members(ty)
            .iter()
            .filter(|member| !syntax::is_nullish_type(member))
            .find_map(|member| resolve_entity_type(project, from, member, depth + 1)),
        "generic_type" => syntax::type_arguments(ty)
            .first()
            .and_then(|arg| resolve_entity_type(project, from, arg, depth + 1)),
        "parenthesized_type" | "array_type" | "readonly_type" => syntax::named_children(ty)
            .first()
            .and_then(|inner| resolve_entity_type(project, from, inner, depth + 1)),
        "type_identifier" | "nested_type_identifier" => {
            let name = syntax::type_base_name(ty);
            if let Some(class) = project.find_class_from(from, &name) {
                return extends_base_entity(project, &class, 0).then_some(class);
            }
            let (alias_path, alias) = project.find_type_alias(from, &name)?;
            let value = alias.field("value")?;
            resolve_entity_type(project, &alias_path, &value, depth + 1)
        }
        _ => None,
    }
}

fn extends_base_entity(project: &Project, class: &ClassHandle, depth: usize) -> bool {
    if depth > MAX_UNWRAP_DEPTH {
        return false;
    }
    let Some(base) = project
        .class_node(class)
        .ok()
        .and_then(|node| syntax::extends_name(&node))
    else {
        return false;
    };
    if base == BASE_ENTITY {
        return true;
    }
    project
        .find_class_from(&class.path, &base)
        .map(|parent| parent != *class && extends_base_entity(project, &parent, depth + 1))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ManipulationSettings;
    use pretty_assertions::assert_eq;

    const WIDGET: &str = "import { VendureEntity } from '@vendure/core';
export class Widget extends VendureEntity {}
";

    fn project(files: &[(&str, &str)]) -> Project {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        for (path, text) in files {
            project.add_source_file(Path::new(path), *text);
        }
        project
    }

    fn service(project: &Project, name: &str) -> ServiceRef {
        ServiceRef::new(project, project.find_class(name).unwrap())
    }

    #[test]
    fn test_entity_inference_priority() {
        let project = project(&[
            ("src/widget.entity.ts", WIDGET),
            (
                "src/gadget.entity.ts",
                "export class Gadget extends VendureEntity {}\n",
            ),
            (
                "src/widget.service.ts",
                "import { Widget } from './widget.entity';
import { Gadget } from './gadget.entity';
export class WidgetService {
    findAll(): Promise<PaginatedList<Gadget>> {}
    findOne(id: ID): Promise<Widget | null> {}
}
",
            ),
        ]);
        let service = service(&project, "WidgetService");
        let caps = service.capabilities();
        assert!(caps.find_one && caps.find_all);
        assert!(!caps.create && !caps.update && !caps.delete);
        assert_eq!(service.entity().unwrap().name(), "Widget");
    }

    #[test]
    fn test_entity_inference_through_alias_and_base_class() {
        let project = project(&[
            (
                "src/base.ts",
                "export abstract class Base extends VendureEntity {}\nexport class Widget extends Base {}\n",
            ),
            (
                "src/widget.service.ts",
                "import { Widget } from './base';
type MaybeWidget = Translated<Widget> | undefined;
export class WidgetService {
    delete(id: ID): Promise<DeletionResponse> {}
    update(input: any): Promise<MaybeWidget> {}
}
",
            ),
        ]);
        let service = service(&project, "WidgetService");
        assert_eq!(service.entity().unwrap().name(), "Widget");
    }

    #[test]
    fn test_no_entity_without_base_class() {
        let project = project(&[(
            "src/s.ts",
            "class Plain {}\nexport class S {\n    findOne(): Promise<Plain> {}\n    other() {}\n}\n",
        )]);
        let service = service(&project, "S");
        assert!(service.entity().is_none());
        assert!(service.capabilities().find_one);
        assert!(service.has_method(&project, "other"));
    }

    #[test]
    fn test_inject_dependency() {
        let mut project = project(&[(
            "src/s.ts",
            "export class S {\n    constructor(private connection: TransactionalConnection) {}\n}\n",
        )]);
        let service = service(&project, "S");
        let injection = Injection::new("jobQueueService", "JobQueueService");
        assert!(service.inject_dependency(&mut project, &injection).unwrap());
        assert!(!service.inject_dependency(&mut project, &injection).unwrap());
        assert_eq!(
            project.file(Path::new("src/s.ts")).unwrap().text(),
            "export class S {\n    constructor(private connection: TransactionalConnection, private jobQueueService: JobQueueService) {}\n}\n"
        );
    }

    #[test]
    fn test_inject_dependency_creates_constructor() {
        let mut project = project(&[(
            "src/s.ts",
            "export class S {\n    private queue: JobQueue;\n}\n",
        )]);
        let service = service(&project, "S");
        let injection = Injection::new("cache", "CacheService").with_scope("protected");
        service.inject_dependency(&mut project, &injection).unwrap();
        assert_eq!(
            project.file(Path::new("src/s.ts")).unwrap().text(),
            "export class S {\n    private queue: JobQueue;\n    constructor(protected cache: CacheService) {}\n}\n"
        );
    }
}
