// src/revision/activator.rs

//! Revision activation strategies
//!
//! Both strategies compute the complete desired assignment from scratch,
//! without reading the states revisions are currently in, so re-running an
//! interrupted activation converges on the same result.
//!
//! Writes are ordered so that at most one revision is ever observably
//! Active: every revision that loses its state is written first, and the
//! Active revision last. A crash part way through leaves zero Active
//! revisions, never two.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ActivationPolicy, PackageRevision, RevisionState, RevisionWriter};

/// How many revisions of a package may run at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionActivator {
    /// The current revision is Active, every other revision Inactive
    #[default]
    Single,
    /// The newest revision is Active and up to `limit - 1` older ones keep
    /// their runtime
    Multi,
}

impl std::fmt::Display for RevisionActivator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionActivator::Single => write!(f, "single"),
            RevisionActivator::Multi => write!(f, "multi"),
        }
    }
}

/// Desired state of one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationStep {
    pub name: String,
    pub revision: i64,
    /// State the revision was in when the plan was computed
    pub from: RevisionState,
    pub to: RevisionState,
}

impl ActivationStep {
    fn new(rev: &PackageRevision, to: RevisionState) -> Self {
        Self {
            name: rev.name.clone(),
            revision: rev.revision,
            from: rev.desired_state,
            to,
        }
    }

    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Desired state of every revision, in apply order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationPlan {
    pub steps: Vec<ActivationStep>,
}

impl ActivationPlan {
    /// Steps that actually change a revision
    pub fn changes(&self) -> impl Iterator<Item = &ActivationStep> {
        self.steps.iter().filter(|s| s.is_change())
    }

    pub fn desired_state(&self, name: &str) -> Option<RevisionState> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.to)
    }

    /// Number of revisions planned into `state`
    pub fn count(&self, state: RevisionState) -> usize {
        self.steps.iter().filter(|s| s.to == state).count()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl RevisionActivator {
    /// Compute the desired state of every revision
    ///
    /// `current_revision_id` names the revision to activate under the
    /// single strategy; the multi strategy always activates the newest
    /// revision. `active_limit` is only read by the multi strategy and is
    /// clamped to `1..=revisions.len()`.
    pub fn plan(
        &self,
        active_limit: Option<i64>,
        current_revision_id: &str,
        revisions: &[PackageRevision],
    ) -> Result<ActivationPlan> {
        let mut steps = match self {
            RevisionActivator::Single => plan_single(current_revision_id, revisions)?,
            RevisionActivator::Multi => plan_multi(active_limit, revisions),
        };

        // Stable: equal states keep oldest-first order
        steps.sort_by_key(|s| s.to.apply_rank());

        Ok(ActivationPlan { steps })
    }

    /// Apply the desired states through `writer`
    ///
    /// Returns the revisions in input order with their new states. Revisions
    /// already in their desired state are not written. The first failed
    /// write aborts; writes before it stay in effect.
    pub async fn activate(
        &self,
        policy: ActivationPolicy,
        active_limit: Option<i64>,
        current_revision_id: &str,
        mut revisions: Vec<PackageRevision>,
        writer: &dyn RevisionWriter,
    ) -> Result<Vec<PackageRevision>> {
        if policy == ActivationPolicy::Manual {
            debug!("Manual activation policy, leaving {} revisions untouched", revisions.len());
            return Ok(revisions);
        }

        let plan = self.plan(active_limit, current_revision_id, &revisions)?;

        for step in plan.changes() {
            let Some(rev) = revisions.iter_mut().find(|r| r.name == step.name) else {
                return Err(Error::RevisionNotFound(step.name.clone()));
            };

            writer
                .set_desired_state(rev, step.to)
                .await
                .map_err(|e| match e {
                    e @ Error::RevisionUpdate { .. } => e,
                    e => Error::RevisionUpdate {
                        revision: step.name.clone(),
                        reason: e.to_string(),
                    },
                })?;

            info!("Revision {} ({}) {} -> {}", step.name, step.revision, step.from, step.to);
            rev.desired_state = step.to;
        }

        Ok(revisions)
    }
}

fn plan_single(
    current_revision_id: &str,
    revisions: &[PackageRevision],
) -> Result<Vec<ActivationStep>> {
    if !revisions.iter().any(|r| r.name == current_revision_id) {
        return Err(Error::RevisionNotFound(current_revision_id.to_string()));
    }

    Ok(oldest_first(revisions)
        .into_iter()
        .map(|rev| {
            let to = if rev.name == current_revision_id {
                RevisionState::Active
            } else {
                RevisionState::Inactive
            };
            ActivationStep::new(rev, to)
        })
        .collect())
}

fn plan_multi(active_limit: Option<i64>, revisions: &[PackageRevision]) -> Vec<ActivationStep> {
    if revisions.is_empty() {
        return Vec::new();
    }

    let limit = active_limit
        .unwrap_or(1)
        .clamp(1, revisions.len() as i64) as usize;
    debug!("Keeping {} of {} revisions running", limit, revisions.len());

    let mut newest_first = revisions.iter().collect::<Vec<_>>();
    newest_first.sort_by(|a, b| b.revision.cmp(&a.revision));

    let mut steps = newest_first
        .into_iter()
        .enumerate()
        .map(|(i, rev)| {
            let to = match i {
                0 => RevisionState::Active,
                i if i < limit => RevisionState::RuntimeOnly,
                _ => RevisionState::Inactive,
            };
            ActivationStep::new(rev, to)
        })
        .collect::<Vec<_>>();
    steps.reverse();
    steps
}

/// Revisions sorted by revision number, ties in input order
fn oldest_first(revisions: &[PackageRevision]) -> Vec<&PackageRevision> {
    let mut sorted = revisions.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|r| r.revision);
    sorted
}
