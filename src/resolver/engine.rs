// src/resolver/engine.rs

//! Resolution pass over the lock
//!
//! Builds the dependency graph from the current lock snapshot, rejects
//! cycles, and decides the next single action: install one implied
//! dependency, upgrade one installed package whose parents now require a
//! newer version, or nothing. The lock itself is never written here.

use crate::error::{Error, Result};
use crate::lock::LockStore;
use crate::registry::{PullSecretResolver, TagLister};
use crate::version::parse_version;
use std::sync::Arc;
use tracing::{debug, info};

use super::ResolutionPolicy;
use super::finder::{VersionFinder, satisfies_constraints};
use super::graph::DependencyGraph;
use super::node::Node;
use super::plan::{PassOutcome, ResolutionPlan, ResolvedDependency, UpgradeCandidate};

/// Drives one resolution pass per call
pub struct DependencyManager {
    lock: Arc<dyn LockStore>,
    finder: VersionFinder,
}

impl DependencyManager {
    pub fn new(
        policy: ResolutionPolicy,
        lock: Arc<dyn LockStore>,
        tags: Arc<dyn TagLister>,
        secrets: Arc<dyn PullSecretResolver>,
    ) -> Self {
        Self {
            lock,
            finder: VersionFinder::new(policy, tags, secrets),
        }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.finder.policy()
    }

    /// Run one pass
    ///
    /// Only the first implied dependency is resolved; the driver creates it
    /// and the next pass picks up the rest from the updated lock.
    pub async fn reconcile(&self) -> Result<ResolutionPlan> {
        let lock = self.lock.get().await.map_err(|e| match e {
            e @ Error::Lock(_) => e,
            e => Error::Lock(e.to_string()),
        })?;
        let nodes: Vec<Node> = lock.packages.into_iter().map(Node::from).collect();

        let mut graph = DependencyGraph::new(self.policy());
        let implied = graph.init(nodes)?;
        let sort_order = graph.sort()?;
        let implied: Vec<String> = implied.iter().map(|n| n.identifier().to_string()).collect();

        let outcome = match implied.first() {
            Some(id) => {
                let dep = graph.dependency_for(id)?;
                let version = self.finder.resolve(&dep, None).await?;
                info!("Resolved missing dependency {} to {}", id, version);
                PassOutcome::Install(ResolvedDependency {
                    package: dep.package,
                    package_type: dep.package_type,
                    version,
                })
            }
            None if self.policy() == ResolutionPolicy::Updatable => {
                self.find_upgrade(&graph, &sort_order).await?
            }
            None => PassOutcome::Satisfied,
        };

        Ok(ResolutionPlan {
            sort_order,
            implied,
            outcome,
        })
    }

    /// First installed package, in sort order, whose version no longer
    /// satisfies all of its parents
    async fn find_upgrade(
        &self,
        graph: &DependencyGraph,
        sort_order: &[String],
    ) -> Result<PassOutcome> {
        for id in sort_order {
            let node = graph.get_node(id)?;
            let Node::Installed(pkg) = node else {
                continue;
            };
            if pkg.parent_constraints.is_empty() || parse_version(&pkg.version).is_none() {
                continue;
            }

            let dep = graph.dependency_for(id)?;
            if satisfies_constraints(&dep, &pkg.version)? {
                continue;
            }

            debug!(
                "{} {} violates parent constraints {}",
                id,
                pkg.version,
                pkg.parent_constraints.join(", ")
            );
            let version = self.finder.resolve(&dep, Some(node)).await?;
            if version == pkg.version {
                continue;
            }

            return Ok(PassOutcome::Upgrade(UpgradeCandidate {
                name: pkg.name.clone(),
                package: pkg.source.clone(),
                from: pkg.version.clone(),
                to: version,
            }));
        }

        Ok(PassOutcome::Satisfied)
    }
}
