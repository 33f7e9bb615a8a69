//! Detection of the JavaScript package manager a project uses.

use crate::ConfigError;
use std::path::{Path, PathBuf};
use which::which;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

/// Lockfiles checked in order; the first one present wins.
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("bun.lockb", PackageManager::Bun),
    ("bun.lock", PackageManager::Bun),
    ("package-lock.json", PackageManager::Npm),
];

impl PackageManager {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "npm" => Some(Self::Npm),
            "yarn" => Some(Self::Yarn),
            "pnpm" => Some(Self::Pnpm),
            "bun" => Some(Self::Bun),
            _ => None,
        }
    }

    /// Pick the package manager for `project_root`.
    ///
    /// An explicit preference wins, then the first lockfile found while
    /// walking up from the project root, then npm.
    pub fn detect(project_root: &Path, preferred: Option<&str>) -> Self {
        if let Some(pm) = preferred.and_then(Self::from_name) {
            return pm;
        }

        for dir in project_root.ancestors() {
            for (lockfile, pm) in LOCKFILES {
                if dir.join(lockfile).exists() {
                    return *pm;
                }
            }
        }

        Self::Npm
    }

    pub fn binary(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
        }
    }

    /// Arguments for adding `packages` to the manifest.
    pub fn add_args(&self, packages: &[String], dev: bool) -> Vec<String> {
        let mut args = match self {
            Self::Npm => vec!["install".to_string()],
            Self::Yarn | Self::Pnpm | Self::Bun => vec!["add".to_string()],
        };
        if dev {
            args.push(
                match self {
                    Self::Npm => "--save-dev",
                    Self::Yarn | Self::Pnpm | Self::Bun => "-D",
                }
                .to_string(),
            );
        }
        args.extend(packages.iter().cloned());
        args
    }

    pub fn locate(&self) -> Result<PathBuf, ConfigError> {
        which(self.binary()).map_err(|_| ConfigError::ToolNotFound(self.binary().to_string()))
    }
}
