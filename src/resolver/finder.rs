// src/resolver/finder.rs

//! Version selection for dependencies
//!
//! Given a dependency and the tags a registry publishes for it, pick the tag
//! to install or upgrade to. Two policies exist:
//!
//! - **Default**: the highest tag satisfying the dependency's effective
//!   constraint.
//! - **Updatable**: every parent constraint must hold at once. A fresh
//!   install takes the highest such tag; an installed package moves to the
//!   lowest such tag at or above its current version and is never
//!   downgraded.
//!
//! Digest-pinned dependencies are returned as-is under both policies.

use crate::error::{Error, Result};
use crate::lock::Dependency;
use crate::registry::{PullSecretResolver, TagLister};
use crate::version::{VersionConstraint, is_digest, parse_version, semver_tags};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ResolutionPolicy;
use super::node::Node;

impl ResolutionPolicy {
    /// Compute the version of `dep` to install from `remote_tags`
    ///
    /// `existing` is the graph node already carrying the dependency's
    /// identifier, if any; only an installed node with a version makes the
    /// updatable policy search for an upgrade.
    pub fn find_valid_dependency_version(
        &self,
        dep: &Dependency,
        remote_tags: &[String],
        existing: Option<&Node>,
    ) -> Result<String> {
        match self {
            ResolutionPolicy::Default => find_default(dep, remote_tags),
            ResolutionPolicy::Updatable => find_updatable(dep, remote_tags, existing),
        }
    }

    /// The digest `dep` is pinned to, if any
    pub fn pinned_digest(&self, dep: &Dependency) -> Result<Option<String>> {
        match self {
            ResolutionPolicy::Default => {
                Ok(is_digest(&dep.constraints).then(|| dep.constraints.clone()))
            }
            ResolutionPolicy::Updatable => {
                let raw = effective_constraints(dep);
                if !raw.iter().any(|c| is_digest(c)) {
                    return Ok(None);
                }
                if raw.iter().all(|c| *c == raw[0]) {
                    return Ok(Some(raw[0].to_string()));
                }
                Err(Error::InvalidConstraint {
                    package: dep.package.clone(),
                    constraint: raw.join(", "),
                    reason: "digest pin conflicts with other constraints".to_string(),
                })
            }
        }
    }
}

fn find_default(dep: &Dependency, remote_tags: &[String]) -> Result<String> {
    if is_digest(&dep.constraints) {
        return Ok(dep.constraints.clone());
    }

    let constraint = parse_constraint(&dep.package, &dep.constraints)?;

    semver_tags(remote_tags)
        .into_iter()
        .rev()
        .find(|t| constraint.satisfies(&t.version))
        .map(|t| {
            info!("Selected {} {} for constraint {}", dep.package, t.tag, constraint);
            t.tag
        })
        .ok_or_else(|| Error::NoValidVersion {
            package: dep.package.clone(),
            constraint: dep.constraints.clone(),
        })
}

fn find_updatable(
    dep: &Dependency,
    remote_tags: &[String],
    existing: Option<&Node>,
) -> Result<String> {
    if let Some(digest) = ResolutionPolicy::Updatable.pinned_digest(dep)? {
        return Ok(digest);
    }

    let raw = effective_constraints(dep);
    let constraints = raw
        .iter()
        .map(|c| parse_constraint(&dep.package, c))
        .collect::<Result<Vec<_>>>()?;
    let satisfies_all =
        |v: &semver::Version| constraints.iter().all(|c| c.satisfies(v));
    let no_valid_version = || Error::NoValidVersion {
        package: dep.package.clone(),
        constraint: raw.join(", "),
    };

    let candidates = semver_tags(remote_tags);

    let installed = existing
        .and_then(Node::installed_version)
        .and_then(|tag| parse_version(tag).map(|v| (tag, v)));

    let Some((installed_tag, current)) = installed else {
        if let Some(tag) = existing.and_then(Node::installed_version) {
            debug!(
                "Installed version {} of {} is not a semantic version, searching as fresh install",
                tag, dep.package
            );
        }
        return candidates
            .into_iter()
            .rev()
            .find(|t| satisfies_all(&t.version))
            .map(|t| {
                info!("Selected {} {} for constraints {}", dep.package, t.tag, raw.join(", "));
                t.tag
            })
            .ok_or_else(no_valid_version);
    };

    if satisfies_all(&current) {
        debug!("{} {} already satisfies {}", dep.package, installed_tag, raw.join(", "));
        return Ok(installed_tag.to_string());
    }

    let mut lower = None;
    for candidate in candidates {
        if !satisfies_all(&candidate.version) {
            continue;
        }
        if candidate.version < current {
            lower = Some(candidate);
            continue;
        }
        info!("Upgrading {} from {} to {}", dep.package, installed_tag, candidate.tag);
        return Ok(candidate.tag);
    }

    match lower {
        Some(candidate) => {
            warn!(
                "Refusing to downgrade {} from {} to {}",
                dep.package, installed_tag, candidate.tag
            );
            Err(Error::DowngradeNotAllowed {
                package: dep.package.clone(),
                installed: installed_tag.to_string(),
                candidate: candidate.tag,
            })
        }
        None => Err(no_valid_version()),
    }
}

/// Parent constraints, or the effective constraint when no parent recorded any
fn effective_constraints(dep: &Dependency) -> Vec<&str> {
    if dep.parent_constraints.is_empty() {
        vec![dep.constraints.as_str()]
    } else {
        dep.parent_constraints.iter().map(String::as_str).collect()
    }
}

fn parse_constraint(package: &str, constraint: &str) -> Result<VersionConstraint> {
    VersionConstraint::parse(constraint).map_err(|e| Error::InvalidConstraint {
        package: package.to_string(),
        constraint: constraint.to_string(),
        reason: e.to_string(),
    })
}

/// Whether `version` satisfies every constraint placed on `dep`
///
/// Digest pins are satisfied only by the same digest.
pub fn satisfies_constraints(dep: &Dependency, version: &str) -> Result<bool> {
    let raw = effective_constraints(dep);
    if raw.iter().any(|c| is_digest(c)) {
        return Ok(raw.iter().all(|c| *c == version));
    }

    let Some(parsed) = parse_version(version) else {
        return Ok(false);
    };
    for c in raw {
        if !parse_constraint(&dep.package, c)?.satisfies(&parsed) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Version finder backed by a registry
///
/// Fetches tags through the injected [`TagLister`], using the credential the
/// [`PullSecretResolver`] selects, then applies the configured policy.
#[derive(Clone)]
pub struct VersionFinder {
    policy: ResolutionPolicy,
    tags: Arc<dyn TagLister>,
    secrets: Arc<dyn PullSecretResolver>,
}

impl VersionFinder {
    pub fn new(
        policy: ResolutionPolicy,
        tags: Arc<dyn TagLister>,
        secrets: Arc<dyn PullSecretResolver>,
    ) -> Self {
        Self {
            policy,
            tags,
            secrets,
        }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Resolve the version of `dep` to install
    ///
    /// Digest pins return without contacting the registry.
    pub async fn resolve(&self, dep: &Dependency, existing: Option<&Node>) -> Result<String> {
        if let Some(digest) = self.policy.pinned_digest(dep)? {
            debug!("{} is pinned to {}", dep.package, digest);
            return Ok(digest);
        }

        let secret = self
            .secrets
            .pull_secret_for(&dep.package)
            .await
            .map_err(|e| match e {
                e @ Error::PullSecret { .. } => e,
                e => Error::PullSecret {
                    image: dep.package.clone(),
                    reason: e.to_string(),
                },
            })?;
        let secrets: Vec<String> = secret
            .map(|s| {
                debug!(
                    "Using pull secret {} from {} for {}",
                    s.secret_name, s.config_name, dep.package
                );
                vec![s.secret_name]
            })
            .unwrap_or_default();

        let tags = self
            .tags
            .tags(&dep.package, &secrets)
            .await
            .map_err(|e| match e {
                e @ Error::TagFetch { .. } => e,
                e => Error::TagFetch {
                    package: dep.package.clone(),
                    reason: e.to_string(),
                },
            })?;
        self.policy.find_valid_dependency_version(dep, &tags, existing)
    }
}

impl std::fmt::Debug for VersionFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionFinder")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
