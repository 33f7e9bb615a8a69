//! Adding npm packages to the target project after its sources are written.

use crate::errors::CommandError;
use scaffold_config::PackageManager;
use scaffold_logger as logger;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub package: String,
    pub dev: bool,
}

impl Dependency {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            dev: false,
        }
    }

    pub fn dev(package: &str) -> Self {
        Self {
            package: package.to_string(),
            dev: true,
        }
    }
}

pub trait PackageInstaller {
    /// Ensure `dependencies` are in the project's manifest. Returns the
    /// packages that were actually installed.
    fn install(&self, project_root: &Path, dependencies: &[Dependency]) -> Result<Vec<String>, CommandError>;
}

/// Runs the project's package manager.
pub struct SystemInstaller {
    preferred: Option<String>,
}

impl SystemInstaller {
    pub fn new(preferred: Option<String>) -> Self {
        Self { preferred }
    }
}

impl PackageInstaller for SystemInstaller {
    fn install(&self, project_root: &Path, dependencies: &[Dependency]) -> Result<Vec<String>, CommandError> {
        let manifest = find_package_json(project_root);
        let declared = manifest
            .as_deref()
            .map(declared_packages)
            .unwrap_or_default();
        let missing: Vec<&Dependency> = dependencies
            .iter()
            .filter(|dep| !declared.contains(&dep.package))
            .collect();
        if missing.is_empty() {
            logger::debug("All required packages are already declared");
            return Ok(Vec::new());
        }

        let workdir = manifest
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(project_root);
        let pm = PackageManager::detect(workdir, self.preferred.as_deref());
        let binary = pm.locate()?;

        let mut installed = Vec::new();
        for dev in [false, true] {
            let packages: Vec<String> = missing
                .iter()
                .filter(|dep| dep.dev == dev)
                .map(|dep| dep.package.clone())
                .collect();
            if packages.is_empty() {
                continue;
            }
            let args = pm.add_args(&packages, dev);
            logger::debug(&format!("Running: {} {}", binary.display(), args.join(" ")));

            let spinner = logger::spinner(&format!("Installing {}", packages.join(", ")));
            let output = Command::new(&binary)
                .args(&args)
                .current_dir(workdir)
                .output()
                .map_err(|e| CommandError::Install {
                    packages: packages.join(", "),
                    reason: e.to_string(),
                })?;
            spinner.finish_and_clear();
            logger::capture_output(&format!("{} {}", pm.binary(), args.join(" ")), &output);

            if !output.status.success() {
                return Err(CommandError::Install {
                    packages: packages.join(", "),
                    reason: format!("{} {} exited with {}", pm.binary(), args.join(" "), output.status),
                });
            }
            installed.extend(packages);
        }
        Ok(installed)
    }
}

/// Installs nothing. Used with `--skip-install` and in tests.
pub struct NoopInstaller;

impl PackageInstaller for NoopInstaller {
    fn install(&self, _project_root: &Path, dependencies: &[Dependency]) -> Result<Vec<String>, CommandError> {
        for dep in dependencies {
            logger::debug(&format!("Skipping install of {}", dep.package));
        }
        Ok(Vec::new())
    }
}

fn find_package_json(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("package.json"))
        .find(|candidate| candidate.is_file())
}

fn declared_packages(manifest: &Path) -> HashSet<String> {
    let Ok(content) = fs::read_to_string(manifest) else {
        return HashSet::new();
    };
    let Ok(json) = serde_json::from_str::<Value>(&content) else {
        logger::warn(&format!("Could not parse {}", manifest.display()));
        return HashSet::new();
    };
    ["dependencies", "devDependencies", "peerDependencies"]
        .iter()
        .filter_map(|section| json.get(section).and_then(Value::as_object))
        .flat_map(|deps| deps.keys().cloned())
        .collect()
}
