// src/lib.rs

//! xpkg Package Manager Core
//!
//! Dependency resolution and revision activation for control-plane packages
//! (Providers, Configurations and Functions).
//!
//! # Architecture
//!
//! - Lock-driven: every pass starts from a snapshot of installed packages
//! - Ephemeral graph: the dependency DAG is rebuilt per pass, never persisted
//! - One step per pass: at most one dependency is installed or upgraded
//! - Explicit policy: resolution and activation strategies come from config
//! - Injected I/O: registry, credentials, lock and revision writes are traits

pub mod config;
mod error;
pub mod lock;
pub mod registry;
pub mod resolver;
pub mod revision;
pub mod version;

pub use config::ManagerConfig;
pub use error::{Error, ErrorKind, Result};
pub use lock::{Dependency, FileLockStore, Lock, LockPackage, LockStore, PackageType};
pub use registry::{NoPullSecrets, PullSecret, PullSecretResolver, TagIndex, TagLister};
pub use resolver::{
    DependencyGraph, DependencyManager, Node, PassOutcome, ResolutionPlan, ResolutionPolicy,
    ResolvedDependency, UpgradeCandidate, VersionFinder,
};
pub use revision::{
    ActivationPlan, ActivationPolicy, ActivationStep, PackageRevision, RevisionActivator,
    RevisionState, RevisionWriter,
};
pub use version::{VersionConstraint, is_digest};
