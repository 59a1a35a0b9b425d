// src/revision/history.rs

//! Revision history garbage collection

use super::{PackageRevision, RevisionState};

/// Names of Inactive revisions older than the newest `history_limit`
/// Inactive ones, oldest first
///
/// A limit of zero or less keeps every revision. Active and RuntimeOnly
/// revisions are never selected.
pub fn select_for_gc(revisions: &[PackageRevision], history_limit: i64) -> Vec<String> {
    if history_limit <= 0 {
        return Vec::new();
    }

    let mut inactive = revisions
        .iter()
        .filter(|r| r.desired_state == RevisionState::Inactive)
        .collect::<Vec<_>>();
    inactive.sort_by(|a, b| b.revision.cmp(&a.revision));

    let mut stale = inactive
        .into_iter()
        .skip(history_limit as usize)
        .map(|r| r.name.clone())
        .collect::<Vec<_>>();
    stale.reverse();
    stale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(n: i64, state: RevisionState) -> PackageRevision {
        PackageRevision::new(format!("rev-{n}"), n, state)
    }

    #[test]
    fn test_select_oldest_inactive_beyond_limit() {
        let revs = vec![
            rev(4, RevisionState::Active),
            rev(1, RevisionState::Inactive),
            rev(3, RevisionState::Inactive),
            rev(2, RevisionState::Inactive),
        ];

        assert_eq!(select_for_gc(&revs, 1), vec!["rev-1", "rev-2"]);
        assert_eq!(select_for_gc(&revs, 2), vec!["rev-1"]);
        assert!(select_for_gc(&revs, 3).is_empty());
    }

    #[test]
    fn test_zero_limit_keeps_everything() {
        let revs = vec![rev(1, RevisionState::Inactive), rev(2, RevisionState::Inactive)];
        assert!(select_for_gc(&revs, 0).is_empty());
    }

    #[test]
    fn test_running_revisions_never_selected() {
        let revs = vec![
            rev(1, RevisionState::RuntimeOnly),
            rev(2, RevisionState::RuntimeOnly),
            rev(3, RevisionState::Active),
        ];
        assert!(select_for_gc(&revs, 1).is_empty());
    }
}
