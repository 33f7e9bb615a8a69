//! TypeScript templates compiled into the binary.
//!
//! Every template is valid TypeScript on its own. Declarations named
//! `Template*` are placeholders replaced during instantiation.

use scaffold_ast::Template;

macro_rules! bundled {
    ($fn_name:ident, $path:literal) => {
        pub fn $fn_name() -> Template {
            Template::new($path, include_str!(concat!("../templates/", $path)))
        }
    };
}

bundled!(entity, "entity/entity.ts");
bundled!(entity_translation, "entity/entity-translation.ts");
bundled!(service_basic, "service/service-basic.ts");
bundled!(service_entity, "service/service-entity.ts");
bundled!(api_extensions, "api/api-extensions.ts");
bundled!(resolver_basic, "api/resolver-basic.ts");
bundled!(resolver_entity, "api/resolver-entity.ts");
bundled!(plugin, "plugin/plugin.ts");
bundled!(plugin_constants, "plugin/constants.ts");
bundled!(plugin_types, "plugin/types.ts");
bundled!(ui_providers, "ui/providers.ts");
bundled!(ui_routes, "ui/routes.ts");
bundled!(dashboard_index, "dashboard/index.tsx");

pub fn all() -> Vec<Template> {
    vec![
        entity(),
        entity_translation(),
        service_basic(),
        service_entity(),
        api_extensions(),
        resolver_basic(),
        resolver_entity(),
        plugin(),
        plugin_constants(),
        plugin_types(),
        ui_providers(),
        ui_routes(),
        dashboard_index(),
    ]
}
