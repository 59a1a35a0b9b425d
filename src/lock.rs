// src/lock.rs

//! Lock snapshot data model
//!
//! The lock records every installed package with its resolved version and
//! the dependency constraints it declares. It is read once per resolution
//! pass through a [`LockStore`] and never written by this crate.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageType {
    Provider,
    Configuration,
    Function,
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageType::Provider => write!(f, "Provider"),
            PackageType::Configuration => write!(f, "Configuration"),
            PackageType::Function => write!(f, "Function"),
        }
    }
}

/// A dependency that is referenced but not necessarily installed
///
/// Identity is the package path. Several installed packages depending on the
/// same path collapse into one `Dependency` whose `parent_constraints` holds
/// every declared constraint, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Package path without tag or digest
    pub package: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub package_type: Option<PackageType>,
    /// Semver range or digest; the first declaration seen wins
    pub constraints: String,
    /// Filled in by the graph on each pass; never read from or written to the lock
    #[serde(skip)]
    pub parent_constraints: Vec<String>,
}

impl Dependency {
    pub fn new(package: impl Into<String>, constraints: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            package_type: None,
            constraints: constraints.into(),
            parent_constraints: Vec::new(),
        }
    }

    pub fn with_type(mut self, package_type: PackageType) -> Self {
        self.package_type = Some(package_type);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.package
    }

    /// Append constraints contributed by another parent
    pub fn add_parent_constraints<I, S>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_constraints
            .extend(constraints.into_iter().map(Into::into));
    }
}

/// An installed package as recorded in the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockPackage {
    /// Name of the package object
    pub name: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    /// Package path without tag or digest; the graph identifier
    pub source: String,
    /// Resolved tag or digest
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Constraints placed on this package by other installed packages,
    /// recomputed on each pass
    #[serde(skip)]
    pub parent_constraints: Vec<String>,
}

impl LockPackage {
    pub fn new(
        name: impl Into<String>,
        package_type: PackageType,
        source: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package_type,
            source: source.into(),
            version: version.into(),
            dependencies: Vec::new(),
            parent_constraints: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.source
    }
}

/// Snapshot of every installed package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    #[serde(default)]
    pub packages: Vec<LockPackage>,
}

impl Lock {
    pub fn new(packages: Vec<LockPackage>) -> Self {
        Self { packages }
    }

    /// Find an installed package by identifier
    pub fn find(&self, identifier: &str) -> Option<&LockPackage> {
        self.packages.iter().find(|p| p.identifier() == identifier)
    }

    /// Parse a lock snapshot from JSON
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Read access to the persisted lock
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Fetch the current lock snapshot
    async fn get(&self) -> Result<Lock>;
}

/// Lock store backed by a JSON file, read on every call
pub struct FileLockStore {
    path: PathBuf,
}

impl FileLockStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl LockStore for FileLockStore {
    async fn get(&self) -> Result<Lock> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Lock(format!("{}: {e}", self.path.display())))?;
        Lock::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_json_roundtrip_names() {
        let json = r#"{
            "packages": [{
                "name": "provider-a",
                "type": "Provider",
                "source": "xpkg.io/acme/provider-a",
                "version": "v1.0.0",
                "dependencies": [
                    {
                        "package": "xpkg.io/acme/shared-lib",
                        "type": "Function",
                        "constraints": ">=1.0.0"
                    }
                ]
            }]
        }"#;

        let lock = Lock::from_json(json).unwrap();
        let pkg = lock.find("xpkg.io/acme/provider-a").unwrap();
        assert_eq!(pkg.package_type, PackageType::Provider);
        assert_eq!(pkg.dependencies.len(), 1);
        assert_eq!(pkg.dependencies[0].package_type, Some(PackageType::Function));
        assert!(pkg.dependencies[0].parent_constraints.is_empty());
        assert!(pkg.parent_constraints.is_empty());

        let out = serde_json::to_string(&pkg.dependencies[0]).unwrap();
        assert!(!out.contains("parentConstraints"));
    }

    #[test]
    fn test_lock_json_parent_constraints_ignored() {
        let json = r#"{
            "packages": [{
                "name": "shared-lib",
                "type": "Provider",
                "source": "xpkg.io/acme/shared-lib",
                "version": "v1.2.0",
                "parentConstraints": ["<1.0.0"],
                "dependencies": [
                    {
                        "package": "xpkg.io/acme/base",
                        "constraints": ">=0.1.0",
                        "parentConstraints": ["0.0.1"]
                    }
                ]
            }]
        }"#;

        let lock = Lock::from_json(json).unwrap();
        let pkg = lock.find("xpkg.io/acme/shared-lib").unwrap();
        assert!(pkg.parent_constraints.is_empty());
        assert!(pkg.dependencies[0].parent_constraints.is_empty());

        let mut dep = pkg.dependencies[0].clone();
        dep.add_parent_constraints([">=0.1.0"]);
        let out = serde_json::to_string(&dep).unwrap();
        assert!(!out.contains("parentConstraints"));
    }

    #[test]
    fn test_dependency_parent_constraints_keep_order() {
        let mut dep = Dependency::new("lib", ">=1.0.0");
        dep.add_parent_constraints([">=1.0.0"]);
        dep.add_parent_constraints(vec!["1.0.0".to_string()]);
        assert_eq!(dep.parent_constraints, vec![">=1.0.0", "1.0.0"]);
    }

    #[tokio::test]
    async fn test_file_lock_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::new(dir.path().join("lock.json"));
        let err = store.get().await.unwrap_err();
        assert!(matches!(err, Error::Lock(_)));
    }
}
