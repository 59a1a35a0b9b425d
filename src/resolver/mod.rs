// src/resolver/mod.rs

//! Dependency resolution
//!
//! This module provides dependency graph construction, cycle detection,
//! topological sorting, and version selection for implied dependencies.
//!
//! Each pass builds a fresh [`DependencyGraph`] from the lock, asks it for
//! the dependencies nothing installed provides, and resolves a version for
//! them against the registry's tags.

mod engine;
mod finder;
mod graph;
mod node;
mod plan;

pub use engine::DependencyManager;
pub use finder::{VersionFinder, satisfies_constraints};
pub use graph::DependencyGraph;
pub use node::Node;
pub use plan::{PassOutcome, ResolutionPlan, ResolvedDependency, UpgradeCandidate};

use serde::{Deserialize, Serialize};

/// How dependency versions are chosen
///
/// Selects both the graph variant and the version search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The first declared constraint wins; pick the highest matching tag
    #[default]
    Default,
    /// Honor every parent's constraint and never downgrade
    Updatable,
}

impl std::fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionPolicy::Default => write!(f, "default"),
            ResolutionPolicy::Updatable => write!(f, "updatable"),
        }
    }
}
