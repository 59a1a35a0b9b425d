// src/revision/mod.rs

//! Package revisions and their activation
//!
//! A package keeps one numbered revision per installed version. The
//! activator decides which of them is Active, which keep only their runtime,
//! and which are Inactive; the history module picks old Inactive revisions
//! for garbage collection. Creating and deleting revisions is left to the
//! caller.

pub mod activator;
pub mod history;

pub use activator::{ActivationPlan, ActivationStep, RevisionActivator};
pub use history::select_for_gc;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Desired state of a package revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevisionState {
    /// Owns the package's definitions and runs its runtime
    Active,
    /// Not running and owning nothing
    Inactive,
    /// Runtime kept for compatibility; owns no definitions
    RuntimeOnly,
}

impl RevisionState {
    /// Position in apply order; lower states are written first
    fn apply_rank(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::RuntimeOnly => 1,
            Self::Active => 2,
        }
    }
}

impl std::fmt::Display for RevisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionState::Active => write!(f, "Active"),
            RevisionState::Inactive => write!(f, "Inactive"),
            RevisionState::RuntimeOnly => write!(f, "RuntimeOnly"),
        }
    }
}

/// Who controls which revision is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivationPolicy {
    #[default]
    Automatic,
    /// The user activates revisions out of band
    Manual,
}

/// One numbered revision of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevision {
    /// Unique revision object name
    pub name: String,
    /// Monotonically increasing per package
    pub revision: i64,
    pub desired_state: RevisionState,
}

impl PackageRevision {
    pub fn new(name: impl Into<String>, revision: i64, desired_state: RevisionState) -> Self {
        Self {
            name: name.into(),
            revision,
            desired_state,
        }
    }

    /// Parse a JSON array of revisions
    pub fn list_from_json(s: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Persists a revision's desired state
#[async_trait]
pub trait RevisionWriter: Send + Sync {
    async fn set_desired_state(&self, revision: &PackageRevision, state: RevisionState)
    -> Result<()>;
}
