// src/resolver/plan.rs

//! Resolution plan data structures
//!
//! Contains the result types of one resolution pass.

use crate::lock::PackageType;
use std::fmt;

/// Result of one resolution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPlan {
    /// Every identifier, dependents before dependencies
    pub sort_order: Vec<String>,
    /// Dependencies referenced but not installed, in first-referenced order
    pub implied: Vec<String>,
    /// What the driver should do next
    pub outcome: PassOutcome,
}

/// The single action a pass asks the driver to take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Create a package for an implied dependency
    Install(ResolvedDependency),
    /// Move an installed package to a newer version
    Upgrade(UpgradeCandidate),
    /// Every dependency is installed and satisfied
    Satisfied,
}

/// An implied dependency with the version chosen for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub package: String,
    pub package_type: Option<PackageType>,
    /// Tag or digest to install
    pub version: String,
}

/// An installed package whose version violates a parent constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCandidate {
    /// Name of the installed package object
    pub name: String,
    pub package: String,
    pub from: String,
    pub to: String,
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassOutcome::Install(dep) => match dep.package_type {
                Some(t) => write!(f, "install {} {}:{}", t, dep.package, dep.version),
                None => write!(f, "install {}:{}", dep.package, dep.version),
            },
            PassOutcome::Upgrade(up) => {
                write!(f, "upgrade {} ({}) {} -> {}", up.name, up.package, up.from, up.to)
            }
            PassOutcome::Satisfied => write!(f, "all dependencies satisfied"),
        }
    }
}
