//! The in-memory source model of a TypeScript project.

use crate::error::AstError;
use crate::markers::Capability;
use crate::settings::ManipulationSettings;
use crate::source::{FileView, SourceFile, TextEdit};
use crate::syntax::{self, TsNode};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use scaffold_config::tsconfig::Patterns;
use scaffold_config::TsConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx"];
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist"];

/// A class located by file and name. References build on this.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassHandle {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug)]
pub struct Project {
    root_dir: PathBuf,
    config_path: Option<PathBuf>,
    settings: ManipulationSettings,
    files: BTreeMap<PathBuf, SourceFile>,
    flush_count: usize,
}

impl Project {
    /// Load the project governing `start`, a directory or a file inside it.
    pub fn resolve(start: &Path, settings: ManipulationSettings) -> Result<Self, AstError> {
        let start = absolute(start);
        let config_path = if start.is_file() && is_tsconfig_name(&start) {
            start.clone()
        } else {
            TsConfig::discover_for_file(&start)?
        };
        Self::from_tsconfig(&config_path, settings)
    }

    pub fn from_tsconfig(
        config_path: &Path,
        settings: ManipulationSettings,
    ) -> Result<Self, AstError> {
        let config = TsConfig::load(config_path)?;
        let mut project = Self::in_memory(config.root_dir(), settings);
        project.config_path = Some(config.path().to_path_buf());

        let governed = governed_files(&config)?;
        debug!(
            "{} governs {} source files",
            config.path().display(),
            governed.len()
        );
        for path in governed {
            if let Err(err) = project.load_file(&path) {
                warn!("Skipping {}: {}", path.display(), err);
            }
        }
        info!(
            "Loaded {} files from {}",
            project.files.len(),
            config.path().display()
        );
        Ok(project)
    }

    pub fn in_memory(root_dir: impl AsRef<Path>, settings: ManipulationSettings) -> Self {
        Self {
            root_dir: normalize(root_dir.as_ref()),
            config_path: None,
            settings,
            files: BTreeMap::new(),
            flush_count: 0,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn settings(&self) -> &ManipulationSettings {
        &self.settings
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Absolute, normalized form of `path`, relative paths taken from the root.
    pub fn absolute_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root_dir.join(path))
        }
    }

    /// Load a file from disk, or return the already loaded one.
    pub fn load_file(&mut self, path: &Path) -> Result<&mut SourceFile, AstError> {
        let path = self.absolute_path(path);
        if !self.files.contains_key(&path) {
            let text = fs::read_to_string(&path).map_err(|e| AstError::io(&path, e))?;
            let file = SourceFile::loaded(path.clone(), text);
            if let Some((line, column)) = file.syntax_error() {
                warn!(
                    "{} has a syntax error at {}:{}; edits may be imprecise",
                    path.display(),
                    line,
                    column
                );
            }
            self.files.insert(path.clone(), file);
        }
        self.files
            .get_mut(&path)
            .ok_or(AstError::FileNotFound(path))
    }

    /// Add an unsaved file, replacing any in-memory file at that path.
    pub fn add_source_file(&mut self, path: &Path, text: impl Into<String>) -> &mut SourceFile {
        let path = self.absolute_path(path);
        let mut file = SourceFile::new(path.clone(), text);
        if let Some(existing) = self.files.remove(&path) {
            if let Some(disk) = existing.disk_text() {
                file.set_disk_text(disk.to_string());
            }
        }
        self.files.entry(path).or_insert(file)
    }

    /// Parse `content` into a new file at `target`.
    pub fn create_file_from_template(
        &mut self,
        content: &str,
        target: &Path,
    ) -> Result<&mut SourceFile, AstError> {
        let path = self.absolute_path(target);
        let probe = SourceFile::new(path.clone(), content);
        if let Some((line, column)) = probe.syntax_error() {
            return Err(AstError::TemplateParse { path, line, column });
        }
        debug!("Creating {}", path.display());
        Ok(self.add_source_file(&path, content))
    }

    pub fn remove_file(&mut self, path: &Path) -> Option<SourceFile> {
        let path = self.absolute_path(path);
        self.files.remove(&path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(&self.absolute_path(path))
    }

    pub fn file(&self, path: &Path) -> Result<&SourceFile, AstError> {
        let path = self.absolute_path(path);
        self.files.get(&path).ok_or(AstError::FileNotFound(path))
    }

    pub fn file_mut(&mut self, path: &Path) -> Result<&mut SourceFile, AstError> {
        let path = self.absolute_path(path);
        self.files.get_mut(&path).ok_or(AstError::FileNotFound(path))
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// Run an editor against one file.
    pub fn modify_file<F>(&mut self, path: &Path, f: F) -> Result<bool, AstError>
    where
        F: FnOnce(&FileView<'_>) -> Result<Vec<TextEdit>, AstError>,
    {
        let settings = self.settings.clone();
        self.file_mut(path)?.modify(&settings, f)
    }

    /// Every class decorated with `@marker(...)`, in path then source order.
    pub fn find_classes_with_marker(&self, marker: &str) -> Vec<ClassHandle> {
        let mut found = Vec::new();
        for (path, file) in &self.files {
            let root = file.root();
            for class in syntax::class_declarations(&root) {
                let decorated = syntax::class_decorators(&class)
                    .iter()
                    .any(|d| syntax::decorator_name(d).as_deref() == Some(marker));
                if let (true, Some(name)) = (decorated, syntax::class_name(&class)) {
                    found.push(ClassHandle {
                        path: path.clone(),
                        name,
                    });
                }
            }
        }
        found
    }

    /// Classes implementing the capability's marker interface.
    pub fn find_classes_with_capability(&self, capability: Capability) -> Vec<ClassHandle> {
        let mut found = Vec::new();
        for (path, file) in &self.files {
            let root = file.root();
            for class in syntax::class_declarations(&root) {
                if capability.is_implemented_by(&class) {
                    if let Some(name) = syntax::class_name(&class) {
                        found.push(ClassHandle {
                            path: path.clone(),
                            name,
                        });
                    }
                }
            }
        }
        found
    }

    /// First class named `name` anywhere in the project.
    pub fn find_class(&self, name: &str) -> Option<ClassHandle> {
        self.files.iter().find_map(|(path, file)| {
            syntax::find_class(&file.root(), name).map(|_| ClassHandle {
                path: path.clone(),
                name: name.to_string(),
            })
        })
    }

    /// Resolve `name` as seen from `from`: a local declaration, then a
    /// relative import, then any project class with that name.
    pub fn find_class_from(&self, from: &Path, name: &str) -> Option<ClassHandle> {
        let from = self.absolute_path(from);
        if let Some(file) = self.files.get(&from) {
            let root = file.root();
            if syntax::find_class(&root, name).is_some() {
                return Some(ClassHandle {
                    path: from.clone(),
                    name: name.to_string(),
                });
            }
            if let Some((source, imported)) = imported_binding(&root, name) {
                if let Some(target) = self.resolve_import(&from, &source) {
                    if let Some(file) = self.files.get(&target) {
                        if syntax::find_class(&file.root(), &imported).is_some() {
                            return Some(ClassHandle {
                                path: target,
                                name: imported,
                            });
                        }
                    }
                }
            }
        }
        self.find_class(name)
    }

    /// The class node a handle points to.
    pub fn class_node<'p>(&'p self, handle: &ClassHandle) -> Result<TsNode<'p>, AstError> {
        let file = self.file(&handle.path)?;
        syntax::find_class(&file.root(), &handle.name).ok_or_else(|| AstError::ClassNotFound {
            name: handle.name.clone(),
            path: handle.path.clone(),
        })
    }

    /// Local `type` alias named `name`, looked up from `from` then globally.
    pub fn find_type_alias(&self, from: &Path, name: &str) -> Option<(PathBuf, TsNode<'_>)> {
        let from = self.absolute_path(from);
        if let Some(found) = self
            .files
            .get(&from)
            .and_then(|file| type_alias_in(file, name))
        {
            return Some((from, found));
        }
        self.files
            .iter()
            .find_map(|(path, file)| type_alias_in(file, name).map(|node| (path.clone(), node)))
    }

    /// Resolve a relative module specifier to a loaded file.
    pub fn resolve_import(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        if !specifier.starts_with('.') && !specifier.starts_with('/') {
            return None;
        }
        let from = self.absolute_path(from);
        let base_dir = from.parent()?;
        let base = normalize(&base_dir.join(specifier));
        let stem = base.to_string_lossy().to_string();
        let stem = stem
            .strip_suffix(".js")
            .map(str::to_string)
            .unwrap_or(stem);

        let candidates = [
            PathBuf::from(&stem),
            PathBuf::from(format!("{stem}.ts")),
            PathBuf::from(format!("{stem}.tsx")),
            PathBuf::from(&stem).join("index.ts"),
            PathBuf::from(&stem).join("index.tsx"),
        ];
        candidates
            .into_iter()
            .find(|candidate| self.files.contains_key(candidate))
    }

    /// Paths whose text differs from disk, or that were never written.
    pub fn modified_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|(_, file)| file.is_modified())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Write every modified file and return the written paths.
    pub fn persist(&mut self) -> Result<Vec<PathBuf>, AstError> {
        let mut written = Vec::new();
        for (path, file) in self.files.iter_mut() {
            if !file.is_modified() {
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| AstError::io(parent, e))?;
            }
            fs::write(path, file.text()).map_err(|e| AstError::io(path, e))?;
            file.mark_persisted();
            debug!("Wrote {}", path.display());
            written.push(path.clone());
        }
        self.flush_count += 1;
        info!("Persisted {} files", written.len());
        Ok(written)
    }

    /// Module specifier for importing `target` from `from`.
    pub fn module_specifier(&self, from: &Path, target: &Path) -> String {
        relative_specifier(&self.absolute_path(from), &self.absolute_path(target))
    }
}

fn type_alias_in<'p>(file: &'p SourceFile, name: &str) -> Option<TsNode<'p>> {
    let declaration = syntax::top_level_declarations(&file.root())
        .into_iter()
        .find(|d| d.name == name && d.kind == "type_alias_declaration")?;
    if declaration.node.kind() == "export_statement" {
        declaration.node.field("declaration")
    } else {
        Some(declaration.node)
    }
}

/// `(module specifier, imported name)` of the import binding `local` in a file.
fn imported_binding(root: &TsNode<'_>, local: &str) -> Option<(String, String)> {
    for statement in syntax::named_children(root) {
        if statement.kind() != "import_statement" {
            continue;
        }
        let Some(source) = statement.field("source").and_then(|s| syntax::string_value(&s)) else {
            continue;
        };
        for specifier in statement.dfs().filter(|n| n.kind() == "import_specifier") {
            let name = specifier.field("name").map(|n| n.text().to_string());
            let alias = specifier.field("alias").map(|n| n.text().to_string());
            let bound = alias.clone().or_else(|| name.clone());
            if bound.as_deref() == Some(local) {
                return name.map(|n| (source.clone(), n));
            }
        }
    }
    None
}

/// Relative module specifier with forward slashes and no extension.
pub fn relative_specifier(from: &Path, target: &Path) -> String {
    let from_dir = from.parent().unwrap_or(from);
    let from_parts: Vec<Component<'_>> = from_dir.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let common = from_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        segments.push("..".to_string());
    }
    for part in &target_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().to_string());
    }

    let mut specifier = segments.join("/");
    for ext in [".tsx", ".ts", ".js"] {
        if let Some(stripped) = specifier.strip_suffix(ext) {
            specifier = stripped.to_string();
            break;
        }
    }
    if specifier.starts_with("..") {
        specifier
    } else {
        format!("./{specifier}")
    }
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        normalize(&cwd.join(path))
    }
}

fn is_tsconfig_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("tsconfig") && n.ends_with(".json"))
        .unwrap_or(false)
}

fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".d.ts") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn glob_set(patterns: &Patterns) -> Result<GlobSet, AstError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &patterns.patterns {
        for expanded in expand_pattern(pattern) {
            let glob = GlobBuilder::new(&expanded)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    AstError::shape(
                        &patterns.base_dir,
                        format!("invalid tsconfig pattern '{pattern}': {e}"),
                    )
                })?;
            builder.add(glob);
        }
    }
    builder.build().map_err(|e| {
        AstError::shape(&patterns.base_dir, format!("invalid tsconfig patterns: {e}"))
    })
}

/// A pattern without wildcards or extension names a directory.
fn expand_pattern(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
    let has_wildcard = trimmed.contains(['*', '?']);
    let has_extension = Path::new(trimmed).extension().is_some();
    if has_wildcard || has_extension {
        vec![trimmed.to_string()]
    } else {
        vec![trimmed.to_string(), format!("{trimmed}/**/*")]
    }
}

fn governed_files(config: &TsConfig) -> Result<Vec<PathBuf>, AstError> {
    let mut out = Vec::new();

    if let Some(files) = config.files() {
        for pattern in &files.patterns {
            let path = normalize(&files.base_dir.join(pattern));
            if path.is_file() {
                out.push(path);
            }
        }
        if !config.has_explicit_include() {
            return Ok(out);
        }
    }

    let include = config.include();
    let include_set = glob_set(&include)?;
    let exclude = match config.exclude() {
        Some(patterns) => Some((patterns.base_dir.clone(), glob_set(patterns)?)),
        None => None,
    };

    let walker = WalkDir::new(&include.base_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .map(|name| SKIPPED_DIRS.contains(&name))
                    .unwrap_or(false)
        });

    for entry in walker.filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_source_file(path) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(&include.base_dir) else {
            continue;
        };
        if !include_set.is_match(relative) {
            continue;
        }
        if let Some((base, set)) = &exclude {
            if let Ok(rel) = path.strip_prefix(base) {
                if set.is_match(rel) {
                    continue;
                }
            }
        }
        out.push(normalize(path));
    }

    out.sort();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_resolve_loads_governed_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "tsconfig.json",
            r#"{ "include": ["src"], "exclude": ["src/**/*.spec.ts"], }"#,
        );
        write(root, "src/index.ts", "export const a = 1;\n");
        write(root, "src/plugins/a.plugin.ts", "export class A {}\n");
        write(root, "src/plugins/a.spec.ts", "test();\n");
        write(root, "src/types.d.ts", "declare const x: number;\n");
        write(root, "node_modules/x/index.ts", "export {};\n");
        write(root, "scripts/run.ts", "run();\n");

        let project = Project::resolve(root, ManipulationSettings::default()).unwrap();
        let names: Vec<String> = project
            .paths()
            .iter()
            .map(|p| p.strip_prefix(project.root_dir()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["src/index.ts", "src/plugins/a.plugin.ts"]);
        assert!(project.config_path().unwrap().ends_with("tsconfig.json"));
    }

    #[test]
    fn test_resolve_without_tsconfig_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Project::resolve(dir.path(), ManipulationSettings::default()).unwrap_err();
        assert!(err.to_string().contains("No tsconfig file found"));
    }

    #[test]
    fn test_find_classes_with_marker() {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(
            Path::new("src/b.ts"),
            "@VendurePlugin({})\nexport class B {}\n@Injectable()\nclass C {}\n",
        );
        project.add_source_file(
            Path::new("src/a.ts"),
            "@VendurePlugin({ imports: [] })\nexport abstract class A {}\n@VendurePlugin({})\nclass A2 {}\n",
        );
        let names: Vec<String> = project
            .find_classes_with_marker("VendurePlugin")
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["A", "A2", "B"]);
    }

    #[test]
    fn test_create_file_from_template_reports_position() {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        let err = project
            .create_file_from_template("export class {\n", Path::new("src/x.ts"))
            .unwrap_err();
        match err {
            AstError::TemplateParse { path, line, .. } => {
                assert_eq!(path, PathBuf::from("/p/src/x.ts"));
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!project.contains(Path::new("src/x.ts")));
    }

    #[test]
    fn test_resolve_import_and_find_class_from() {
        let mut project = Project::in_memory("/p", ManipulationSettings::default());
        project.add_source_file(Path::new("src/entities/review.entity.ts"), "export class Review {}\n");
        project.add_source_file(Path::new("src/api/index.ts"), "export const x = 1;\n");
        project.add_source_file(
            Path::new("src/service.ts"),
            "import { Review as R } from './entities/review.entity';\n",
        );
        assert_eq!(
            project.resolve_import(Path::new("/p/src/service.ts"), "./api"),
            Some(PathBuf::from("/p/src/api/index.ts"))
        );
        assert_eq!(project.resolve_import(Path::new("/p/src/service.ts"), "@vendure/core"), None);
        let handle = project
            .find_class_from(Path::new("/p/src/service.ts"), "R")
            .unwrap();
        assert_eq!(handle.name, "Review");
        assert_eq!(handle.path, PathBuf::from("/p/src/entities/review.entity.ts"));
    }

    #[test]
    fn test_relative_specifier() {
        let from = Path::new("/p/src/plugins/reviews/reviews.plugin.ts");
        assert_eq!(
            relative_specifier(from, Path::new("/p/src/plugins/reviews/entities/review.entity.ts")),
            "./entities/review.entity"
        );
        assert_eq!(
            relative_specifier(from, Path::new("/p/src/vendure-config.ts")),
            "../../vendure-config"
        );
    }

    #[test]
    fn test_persist_writes_only_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "tsconfig.json", "{}");
        write(root, "src/a.ts", "export const a = 1;\n");
        write(root, "src/b.ts", "export const b = 1;\n");

        let mut project = Project::resolve(root, ManipulationSettings::default()).unwrap();
        project
            .file_mut(&root.join("src/a.ts"))
            .unwrap()
            .set_text("export const a = 2;\n");
        project.add_source_file(Path::new("src/new/c.ts"), "export const c = 3;\n");
        let mut expected = vec![root.join("src/a.ts"), root.join("src/new/c.ts")];
        expected.sort();
        assert_eq!(project.modified_paths(), expected);

        let written = project.persist().unwrap();
        assert_eq!(written, expected);
        assert_eq!(project.flush_count(), 1);
        assert_eq!(
            fs::read_to_string(root.join("src/new/c.ts")).unwrap(),
            "export const c = 3;\n"
        );
        assert!(project.modified_paths().is_empty());
    }
}
