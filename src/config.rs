// src/config.rs

//! Manager configuration
//!
//! Chooses the resolution policy and the activation strategy explicitly at
//! startup. Loaded from TOML:
//!
//! ```toml
//! [resolution]
//! policy = "updatable"
//!
//! [activation]
//! strategy = "multi"
//! active_revision_limit = 2
//! revision_history_limit = 1
//! ```

use crate::error::{Error, Result};
use crate::lock::LockStore;
use crate::registry::{PullSecretResolver, TagLister};
use crate::resolver::{DependencyGraph, DependencyManager, ResolutionPolicy, VersionFinder};
use crate::revision::{ActivationPolicy, RevisionActivator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub activation: ActivationConfig,
}

/// Dependency resolution settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub policy: ResolutionPolicy,
}

/// Revision activation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivationConfig {
    #[serde(default)]
    pub policy: ActivationPolicy,

    #[serde(default)]
    pub strategy: RevisionActivator,

    /// Revisions kept running under the multi strategy; values below 1 act as 1
    #[serde(default = "default_active_revision_limit")]
    pub active_revision_limit: i64,

    /// Inactive revisions kept before garbage collection; 0 keeps all
    #[serde(default = "default_revision_history_limit")]
    pub revision_history_limit: i64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            policy: ActivationPolicy::default(),
            strategy: RevisionActivator::default(),
            active_revision_limit: default_active_revision_limit(),
            revision_history_limit: default_revision_history_limit(),
        }
    }
}

fn default_active_revision_limit() -> i64 {
    1
}

fn default_revision_history_limit() -> i64 {
    1
}

impl ManagerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        if config.activation.revision_history_limit < 0 {
            return Err(Error::Config(format!(
                "revision_history_limit must not be negative, got {}",
                config.activation.revision_history_limit
            )));
        }
        Ok(config)
    }

    pub fn resolution_policy(&self) -> ResolutionPolicy {
        self.resolution.policy
    }

    /// Empty graph of the configured variant
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::new(self.resolution.policy)
    }

    pub fn version_finder(
        &self,
        tags: Arc<dyn TagLister>,
        secrets: Arc<dyn PullSecretResolver>,
    ) -> VersionFinder {
        VersionFinder::new(self.resolution.policy, tags, secrets)
    }

    pub fn dependency_manager(
        &self,
        lock: Arc<dyn LockStore>,
        tags: Arc<dyn TagLister>,
        secrets: Arc<dyn PullSecretResolver>,
    ) -> DependencyManager {
        DependencyManager::new(self.resolution.policy, lock, tags, secrets)
    }

    pub fn revision_activator(&self) -> RevisionActivator {
        self.activation.strategy
    }

    pub fn activation_policy(&self) -> ActivationPolicy {
        self.activation.policy
    }

    pub fn active_revision_limit(&self) -> i64 {
        self.activation.active_revision_limit.max(1)
    }

    pub fn revision_history_limit(&self) -> i64 {
        self.activation.revision_history_limit
    }
}
