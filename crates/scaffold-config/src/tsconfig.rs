//! tsconfig discovery and `extends` resolution.
//!
//! The merged configuration keeps the child's values over its parents'.
//! `compilerOptions` is merged key by key and `compilerOptions.paths` is the
//! union of every level of the chain. `include`, `exclude` and `files`
//! remember the directory of the config that declared them, since their
//! patterns are relative to that file.

use crate::ConfigError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TSCONFIG_FILE_NAME: &str = "tsconfig.json";

/// File patterns together with the directory they are relative to.
#[derive(Debug, Clone, PartialEq)]
pub struct Patterns {
    pub base_dir: PathBuf,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TsConfig {
    path: PathBuf,
    compiler_options: Map<String, Value>,
    include: Option<Patterns>,
    exclude: Option<Patterns>,
    files: Option<Patterns>,
}

impl TsConfig {
    /// Find the project tsconfig in `dir`.
    ///
    /// `tsconfig.json` is preferred; otherwise the first `tsconfig*.json` in
    /// sorted directory order is used.
    pub fn discover(dir: &Path) -> Result<PathBuf, ConfigError> {
        find_in_dir(dir)?.ok_or_else(|| ConfigError::ConfigNotFound {
            searched: vec![dir.to_path_buf()],
        })
    }

    /// Find the tsconfig governing `file` by walking up from its directory.
    pub fn discover_for_file(file: &Path) -> Result<PathBuf, ConfigError> {
        let start = if file.is_dir() {
            file
        } else {
            file.parent().unwrap_or(file)
        };

        let mut searched = Vec::new();
        for dir in start.ancestors() {
            searched.push(dir.to_path_buf());
            if let Some(found) = find_in_dir(dir)? {
                debug!("Found {} for {}", found.display(), file.display());
                return Ok(found);
            }
        }

        Err(ConfigError::ConfigNotFound { searched })
    }

    /// Load `path` and everything it extends.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut visiting = HashSet::new();
        load_chain(path, &mut visiting)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn compiler_options(&self) -> &Map<String, Value> {
        &self.compiler_options
    }

    pub fn compiler_option_str(&self, key: &str) -> Option<&str> {
        self.compiler_options.get(key).and_then(Value::as_str)
    }

    /// `compilerOptions.paths` as an ordered table.
    pub fn paths(&self) -> BTreeMap<String, Vec<String>> {
        let Some(Value::Object(paths)) = self.compiler_options.get("paths") else {
            return BTreeMap::new();
        };
        paths
            .iter()
            .map(|(alias, targets)| {
                let targets = targets
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                (alias.clone(), targets)
            })
            .collect()
    }

    /// Include patterns; `**/*` relative to the config when unset.
    pub fn include(&self) -> Patterns {
        self.include.clone().unwrap_or_else(|| Patterns {
            base_dir: self.root_dir().to_path_buf(),
            patterns: vec!["**/*".to_string()],
        })
    }

    pub fn has_explicit_include(&self) -> bool {
        self.include.is_some()
    }

    pub fn exclude(&self) -> Option<&Patterns> {
        self.exclude.as_ref()
    }

    pub fn files(&self) -> Option<&Patterns> {
        self.files.as_ref()
    }
}

fn find_in_dir(dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let canonical = dir.join(TSCONFIG_FILE_NAME);
    if canonical.is_file() {
        return Ok(Some(canonical));
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(None);
    };
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("tsconfig") && n.ends_with(".json"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn load_chain(path: &Path, visiting: &mut HashSet<PathBuf>) -> Result<TsConfig, ConfigError> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visiting.insert(path.clone()) {
        return Err(ConfigError::ExtendsCycle(path));
    }

    let raw = read_jsonc(&path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let parents: Vec<String> = match raw.get("extends") {
        Some(Value::String(spec)) => vec![spec.clone()],
        Some(Value::Array(specs)) => specs
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    // With several bases, later entries override earlier ones.
    let mut merged: Option<TsConfig> = None;
    for spec in &parents {
        let parent_path = resolve_extends(&dir, spec)?;
        debug!("{} extends {}", path.display(), parent_path.display());
        let parent = load_chain(&parent_path, visiting)?;
        merged = Some(match merged {
            Some(base) => merge(base, parent),
            None => parent,
        });
    }

    visiting.remove(&path);

    let own = TsConfig {
        path: path.clone(),
        compiler_options: match raw.get("compilerOptions") {
            Some(Value::Object(options)) => options.clone(),
            _ => Map::new(),
        },
        include: patterns_of(&raw, "include", &dir),
        exclude: patterns_of(&raw, "exclude", &dir),
        files: patterns_of(&raw, "files", &dir),
    };

    Ok(match merged {
        Some(base) => merge(base, own),
        None => own,
    })
}

fn patterns_of(raw: &Value, key: &str, dir: &Path) -> Option<Patterns> {
    raw.get(key).and_then(Value::as_array).map(|items| Patterns {
        base_dir: dir.to_path_buf(),
        patterns: items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    })
}

/// Child-over-parent merge. The result takes the child's path.
fn merge(parent: TsConfig, child: TsConfig) -> TsConfig {
    let parent_paths = parent.compiler_options.get("paths").cloned();
    let child_paths = child.compiler_options.get("paths").cloned();

    let mut compiler_options = parent.compiler_options;
    for (key, value) in child.compiler_options {
        compiler_options.insert(key, value);
    }

    if let (Some(Value::Object(mut union)), Some(Value::Object(child_paths))) =
        (parent_paths, child_paths)
    {
        for (alias, targets) in child_paths {
            union.insert(alias, targets);
        }
        compiler_options.insert("paths".to_string(), Value::Object(union));
    }

    TsConfig {
        path: child.path,
        compiler_options,
        include: child.include.or(parent.include),
        exclude: child.exclude.or(parent.exclude),
        files: child.files.or(parent.files),
    }
}

fn resolve_extends(dir: &Path, spec: &str) -> Result<PathBuf, ConfigError> {
    let not_found = || ConfigError::ExtendsNotFound {
        spec: spec.to_string(),
        from: dir.to_path_buf(),
    };

    let candidates_for = |base: PathBuf| -> Vec<PathBuf> {
        let mut with_json = base.clone().into_os_string();
        with_json.push(".json");
        vec![
            base.clone(),
            PathBuf::from(with_json),
            base.join(TSCONFIG_FILE_NAME),
        ]
    };

    if spec.starts_with('.') || Path::new(spec).is_absolute() {
        return candidates_for(dir.join(spec))
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(not_found);
    }

    // Package reference: look in every node_modules up the tree.
    for ancestor in dir.ancestors() {
        let base = ancestor.join("node_modules").join(spec);
        if let Some(found) = candidates_for(base).into_iter().find(|p| p.is_file()) {
            return Ok(found);
        }
    }

    Err(not_found())
}

fn read_jsonc(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&strip_jsonc(&content)).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove `//` and `/* */` comments and trailing commas, leaving strings intact.
pub fn strip_jsonc(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    if chars[i] == '"' {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                if !matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// First character at or after `from` that is neither whitespace nor comment.
fn next_significant(chars: &[char], from: usize) -> Option<char> {
    let mut j = from;
    while j < chars.len() {
        match chars[j] {
            c if c.is_whitespace() => j += 1,
            '/' if chars.get(j + 1) == Some(&'/') => {
                while j < chars.len() && chars[j] != '\n' {
                    j += 1;
                }
            }
            '/' if chars.get(j + 1) == Some(&'*') => {
                j += 2;
                while j < chars.len() && !(chars[j] == '*' && chars.get(j + 1) == Some(&'/')) {
                    j += 1;
                }
                j += 2;
            }
            c => return Some(c),
        }
    }
    None
}
