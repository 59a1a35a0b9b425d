// src/registry.rs

//! Registry collaborators
//!
//! Version resolution needs two things from outside the core: the list of
//! tags published for a package, and the credentials to list them with.
//! Both are injected as traits; each is called at most once per resolution
//! attempt and never retried here.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// Lists the tags published for a package reference
#[async_trait]
pub trait TagLister: Send + Sync {
    /// Fetch every tag of `package`, authenticating with the named pull secrets
    async fn tags(&self, package: &str, pull_secrets: &[String]) -> Result<Vec<String>>;
}

/// Credential selected for an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSecret {
    /// Image configuration whose prefix matched
    pub config_name: String,
    pub secret_name: String,
}

/// Picks the pull secret to use for an image reference
#[async_trait]
pub trait PullSecretResolver: Send + Sync {
    /// `Ok(None)` when no image configuration matches
    async fn pull_secret_for(&self, image: &str) -> Result<Option<PullSecret>>;
}

/// Resolver for registries that need no credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPullSecrets;

#[async_trait]
impl PullSecretResolver for NoPullSecrets {
    async fn pull_secret_for(&self, _image: &str) -> Result<Option<PullSecret>> {
        Ok(None)
    }
}

/// Tag lister serving a fixed package → tags index
///
/// Used for offline planning; the JSON form is `{ "<package>": ["v1.0.0"] }`.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: HashMap<String, Vec<String>>,
}

impl TagIndex {
    pub fn new(tags: HashMap<String, Vec<String>>) -> Self {
        Self { tags }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(s)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[async_trait]
impl TagLister for TagIndex {
    async fn tags(&self, package: &str, _pull_secrets: &[String]) -> Result<Vec<String>> {
        self.tags
            .get(package)
            .cloned()
            .ok_or_else(|| Error::TagFetch {
                package: package.to_string(),
                reason: "repository not found in tag index".to_string(),
            })
    }
}
