//! Name validation and case conversion for generated symbols and files.

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("valid class name regex"));
static KEBAB_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("valid kebab name regex"));
static PLUGIN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*([- ][A-Za-z0-9]+)*$").expect("valid plugin name regex")
});

const RESERVED: &[&str] = &["Plugin", "Service", "Entity", "Template", "VendureEntity"];

pub fn validate_class_name(name: &str) -> Result<(), String> {
    if !CLASS_NAME.is_match(name) {
        return Err(format!(
            "'{name}' is not a valid class name; use PascalCase letters and digits"
        ));
    }
    if RESERVED.contains(&name) || name.starts_with("Template") {
        return Err(format!("'{name}' is reserved; choose a more specific name"));
    }
    Ok(())
}

pub fn validate_kebab_name(name: &str) -> Result<(), String> {
    if KEBAB_NAME.is_match(name) {
        Ok(())
    } else {
        Err(format!(
            "'{name}' is not valid; use lowercase words separated by dashes, e.g. 're-index'"
        ))
    }
}

pub fn validate_plugin_name(name: &str) -> Result<(), String> {
    if !PLUGIN_NAME.is_match(name) {
        return Err(format!(
            "'{name}' is not a valid plugin name; use letters, digits and dashes, e.g. 'reviews'"
        ));
    }
    validate_class_name(&plugin_class_name(name))
}

pub fn pascal(name: &str) -> String {
    name.to_case(Case::Pascal)
}

pub fn camel(name: &str) -> String {
    name.to_case(Case::Camel)
}

pub fn kebab(name: &str) -> String {
    name.to_case(Case::Kebab)
}

/// `REVIEWS_PLUGIN_OPTIONS` style.
pub fn constant(name: &str) -> String {
    name.to_case(Case::Snake).to_uppercase()
}

/// English plural of the last word.
pub fn plural(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let consonant_y = lower.ends_with('y')
        && !matches!(
            lower.chars().rev().nth(1),
            Some('a' | 'e' | 'i' | 'o' | 'u')
        );
    if consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// `reviews` and `ReviewsPlugin` both become `ReviewsPlugin`.
pub fn plugin_class_name(name: &str) -> String {
    let base = pascal(name);
    if base.ends_with("Plugin") {
        base
    } else {
        format!("{base}Plugin")
    }
}

/// `ReviewsPlugin` becomes `reviews`.
pub fn plugin_dir_name(name: &str) -> String {
    let class = plugin_class_name(name);
    kebab(class.strip_suffix("Plugin").unwrap_or(&class))
}

/// `ReviewService` becomes `Review`.
pub fn service_base_name(service: &str) -> &str {
    service
        .strip_suffix("Service")
        .filter(|base| !base.is_empty())
        .unwrap_or(service)
}
