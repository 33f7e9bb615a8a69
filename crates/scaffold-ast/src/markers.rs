//! Names the framework uses to mark plugins, entities and their capabilities.

use crate::syntax::{self, TsNode};

pub const PLUGIN_DECORATOR: &str = "VendurePlugin";
pub const INJECTABLE_DECORATOR: &str = "Injectable";
pub const BASE_ENTITY: &str = "VendureEntity";
pub const CONFIG_TYPE: &str = "VendureConfig";
pub const CONFIG_FILE_NAME: &str = "vendure-config.ts";
pub const UI_EXTENSION_TYPE: &str = "AdminUiExtension";

/// Capabilities a class declares. Entities list theirs in `implements`;
/// plugins carry UI extensions as a static property of the marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Translatable,
    HasCustomFields,
    UiExtensions,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Translatable,
        Capability::HasCustomFields,
        Capability::UiExtensions,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            Capability::Translatable => "Translatable",
            Capability::HasCustomFields => "HasCustomFields",
            Capability::UiExtensions => UI_EXTENSION_TYPE,
        }
    }

    pub fn is_implemented_by(&self, class: &TsNode<'_>) -> bool {
        match self {
            Capability::UiExtensions => syntax::class_properties(class).iter().any(|property| {
                syntax::is_static(property)
                    && property
                        .field("type")
                        .and_then(|t| syntax::annotation_type(&t))
                        .map(|t| syntax::type_base_name(&t) == self.marker())
                        .unwrap_or(false)
            }),
            _ => syntax::implemented_types(class)
                .iter()
                .any(|(name, _)| name == self.marker()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}
