// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use xpkg::{
    Dependency, Error, Lock, LockPackage, LockStore, PackageRevision, PackageType, PullSecret,
    PullSecretResolver, Result, RevisionState, RevisionWriter, TagLister,
};

pub const PROVIDER_A: &str = "xpkg.io/acme/provider-a";
pub const PROVIDER_B: &str = "xpkg.io/acme/provider-b";
pub const SHARED_LIB: &str = "xpkg.io/acme/shared-lib";

/// Tag lister over a fixed map that records every call
#[derive(Default)]
pub struct FakeTags {
    tags: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, package: &str, tags: &[&str]) -> Self {
        self.tags
            .insert(package.to_string(), tags.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Every `(package, pull_secrets)` the lister was called with
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TagLister for FakeTags {
    async fn tags(&self, package: &str, pull_secrets: &[String]) -> Result<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((package.to_string(), pull_secrets.to_vec()));

        self.tags.get(package).cloned().ok_or_else(|| Error::TagFetch {
            package: package.to_string(),
            reason: "registry unreachable".to_string(),
        })
    }
}

/// Pull secret resolver returning the same answer for every image
pub struct FakeSecrets(pub Option<PullSecret>);

impl FakeSecrets {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn named(secret_name: &str) -> Self {
        Self(Some(PullSecret {
            config_name: "acme-registry".to_string(),
            secret_name: secret_name.to_string(),
        }))
    }
}

#[async_trait]
impl PullSecretResolver for FakeSecrets {
    async fn pull_secret_for(&self, _image: &str) -> Result<Option<PullSecret>> {
        Ok(self.0.clone())
    }
}

/// Tag lister whose transport fails before reaching the registry
pub struct UnreachableTags;

#[async_trait]
impl TagLister for UnreachableTags {
    async fn tags(&self, _package: &str, _pull_secrets: &[String]) -> Result<Vec<String>> {
        Err(Error::Io(std::io::Error::other("connection reset by peer")))
    }
}

/// Pull secret resolver whose backing store is unavailable
pub struct BrokenSecrets;

#[async_trait]
impl PullSecretResolver for BrokenSecrets {
    async fn pull_secret_for(&self, _image: &str) -> Result<Option<PullSecret>> {
        Err(Error::Io(std::io::Error::other("secret store unavailable")))
    }
}

/// Lock store whose read fails with an I/O error
pub struct BrokenLock;

#[async_trait]
impl LockStore for BrokenLock {
    async fn get(&self) -> Result<Lock> {
        Err(Error::Io(std::io::Error::other("lock read timed out")))
    }
}

/// Lock store serving a fixed snapshot
pub struct MemoryLock(pub Lock);

#[async_trait]
impl LockStore for MemoryLock {
    async fn get(&self) -> Result<Lock> {
        Ok(self.0.clone())
    }
}

/// Revision writer recording successful writes, optionally failing on one revision
#[derive(Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<(String, RevisionState)>>,
    fail_on: Option<String>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(name: &str) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail_on: Some(name.to_string()),
        }
    }

    pub fn writes(&self) -> Vec<(String, RevisionState)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RevisionWriter for RecordingWriter {
    async fn set_desired_state(
        &self,
        revision: &PackageRevision,
        state: RevisionState,
    ) -> Result<()> {
        if self.fail_on.as_deref() == Some(revision.name.as_str()) {
            return Err(Error::Io(std::io::Error::other("api server unavailable")));
        }
        self.writes
            .lock()
            .unwrap()
            .push((revision.name.clone(), state));
        Ok(())
    }
}

/// Installed provider at `version` with the given dependencies
pub fn provider(source: &str, version: &str, deps: &[(&str, &str)]) -> LockPackage {
    let name = source.rsplit('/').next().unwrap_or(source);
    deps.iter().fold(
        LockPackage::new(name, PackageType::Provider, source, version),
        |pkg, (package, constraint)| {
            pkg.with_dependency(
                Dependency::new(*package, *constraint).with_type(PackageType::Provider),
            )
        },
    )
}

/// provider-a (">=1.0.0") and provider-b ("1.0.0") both depending on shared-lib
pub fn shared_lib_lock() -> Lock {
    Lock::new(vec![
        provider(PROVIDER_A, "v1.0.0", &[(SHARED_LIB, ">=1.0.0")]),
        provider(PROVIDER_B, "v1.0.0", &[(SHARED_LIB, "1.0.0")]),
    ])
}

/// Revisions numbered `1..=n`, all Inactive, named `rev-<n>`
pub fn revisions(n: i64) -> Vec<PackageRevision> {
    (1..=n)
        .map(|i| PackageRevision::new(format!("rev-{i}"), i, RevisionState::Inactive))
        .collect()
}

pub fn count(revisions: &[PackageRevision], state: RevisionState) -> usize {
    revisions.iter().filter(|r| r.desired_state == state).count()
}
