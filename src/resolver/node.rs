// src/resolver/node.rs

//! Graph nodes
//!
//! A node is either a package recorded in the lock or a dependency that an
//! installed package refers to. Both share one identifier space: the package
//! path without tag or digest.

use crate::error::{Error, Result};
use crate::lock::{Dependency, LockPackage, PackageType};

/// A participant in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A package present in the lock
    Installed(LockPackage),
    /// A referenced package; implied when no installed node shares its identifier
    Dependency(Dependency),
}

impl Node {
    /// Stable unique key
    pub fn identifier(&self) -> &str {
        match self {
            Node::Installed(pkg) => pkg.identifier(),
            Node::Dependency(dep) => dep.identifier(),
        }
    }

    /// Direct dependencies declared by this node
    ///
    /// Dependency nodes carry no declarations of their own until the package
    /// they stand for is installed.
    pub fn neighbors(&self) -> Vec<Node> {
        match self {
            Node::Installed(pkg) => pkg
                .dependencies
                .iter()
                .cloned()
                .map(Node::Dependency)
                .collect(),
            Node::Dependency(_) => Vec::new(),
        }
    }

    /// Record dependencies on this node
    ///
    /// Installed packages only accept dependency nodes; an existing
    /// declaration with the same identifier is replaced. Fails without
    /// modifying the node if any supplied node is not a dependency.
    pub fn add_neighbors(&mut self, nodes: &[Node]) -> Result<()> {
        let Node::Installed(pkg) = self else {
            return Ok(());
        };

        let mut deps = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Dependency(dep) => deps.push(dep),
                Node::Installed(other) => {
                    return Err(Error::Build(format!(
                        "{} cannot be a neighbor of {}: not a dependency",
                        other.identifier(),
                        pkg.identifier()
                    )));
                }
            }
        }

        for dep in deps {
            match pkg
                .dependencies
                .iter_mut()
                .find(|d| d.identifier() == dep.identifier())
            {
                Some(existing) => *existing = dep.clone(),
                None => pkg.dependencies.push(dep.clone()),
            }
        }

        Ok(())
    }

    /// The effective constraint of a dependency node
    pub fn constraints(&self) -> Option<&str> {
        match self {
            Node::Installed(_) => None,
            Node::Dependency(dep) => Some(&dep.constraints),
        }
    }

    /// Constraints contributed by every parent, in the order parents were added
    pub fn parent_constraints(&self) -> &[String] {
        match self {
            Node::Installed(pkg) => &pkg.parent_constraints,
            Node::Dependency(dep) => &dep.parent_constraints,
        }
    }

    pub fn add_parent_constraint(&mut self, constraint: &str) {
        if constraint.is_empty() {
            return;
        }
        match self {
            Node::Installed(pkg) => pkg.parent_constraints.push(constraint.to_string()),
            Node::Dependency(dep) => dep.parent_constraints.push(constraint.to_string()),
        }
    }

    /// Drop recorded parent constraints, including those on declared dependencies
    pub fn clear_parent_constraints(&mut self) {
        match self {
            Node::Installed(pkg) => {
                pkg.parent_constraints.clear();
                for dep in &mut pkg.dependencies {
                    dep.parent_constraints.clear();
                }
            }
            Node::Dependency(dep) => dep.parent_constraints.clear(),
        }
    }

    pub fn package_type(&self) -> Option<PackageType> {
        match self {
            Node::Installed(pkg) => Some(pkg.package_type),
            Node::Dependency(dep) => dep.package_type,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Node::Installed(_))
    }

    /// Resolved tag or digest of an installed package
    pub fn installed_version(&self) -> Option<&str> {
        match self {
            Node::Installed(pkg) if !pkg.version.is_empty() => Some(&pkg.version),
            _ => None,
        }
    }
}

impl From<LockPackage> for Node {
    fn from(pkg: LockPackage) -> Self {
        Node::Installed(pkg)
    }
}

impl From<Dependency> for Node {
    fn from(dep: Dependency) -> Self {
        Node::Dependency(dep)
    }
}
