// src/error.rs

//! Error types for the package manager core
//!
//! Every failure carries the package identifier (and constraint, where one
//! is involved) so the caller can surface a descriptive condition.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by graph construction, version selection and activation
#[derive(Debug, Error)]
pub enum Error {
    /// The graph could not be built (malformed identifier, bad neighbor, missing edge source)
    #[error("Failed to build dependency graph: {0}")]
    Build(String),

    /// The dependency declarations form a cycle
    #[error("Detected cycle on: {node} ({})", .cycle.join(" -> "))]
    CyclicDependency { node: String, cycle: Vec<String> },

    /// A node was looked up that is not part of the graph
    #[error("Node {0} does not exist in the dependency graph")]
    NodeNotFound(String),

    /// A version constraint could not be parsed
    #[error("Invalid version constraint '{constraint}' for package {package}: {reason}")]
    InvalidConstraint {
        package: String,
        constraint: String,
        reason: String,
    },

    /// The registry has no tag satisfying the constraint(s)
    #[error("No valid version of {package} satisfies constraint {constraint}")]
    NoValidVersion { package: String, constraint: String },

    /// Only versions older than the installed one satisfy the constraints
    #[error("Downgrade of {package} from {installed} to {candidate} is not allowed")]
    DowngradeNotAllowed {
        package: String,
        installed: String,
        candidate: String,
    },

    /// Listing tags from the registry failed
    #[error("Failed to fetch tags for {package}: {reason}")]
    TagFetch { package: String, reason: String },

    /// Resolving the pull secret for an image failed
    #[error("Failed to resolve pull secret for {image}: {reason}")]
    PullSecret { image: String, reason: String },

    /// The requested revision is not among the package's revisions
    #[error("Revision {0} not found")]
    RevisionNotFound(String),

    /// Writing a revision's desired state failed
    #[error("Failed to update revision {revision}: {reason}")]
    RevisionUpdate { revision: String, reason: String },

    /// Reading the lock snapshot failed
    #[error("Failed to read lock: {0}")]
    Lock(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`] for callers deciding how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Build,
    Cycle,
    NotFound,
    InvalidConstraint,
    NoValidVersion,
    DowngradeNotAllowed,
    /// Registry, credential or lock store unreachable
    Transient,
    Apply,
    Config,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Build(_) => ErrorKind::Build,
            Error::CyclicDependency { .. } => ErrorKind::Cycle,
            Error::NodeNotFound(_) | Error::RevisionNotFound(_) => ErrorKind::NotFound,
            Error::InvalidConstraint { .. } => ErrorKind::InvalidConstraint,
            Error::NoValidVersion { .. } => ErrorKind::NoValidVersion,
            Error::DowngradeNotAllowed { .. } => ErrorKind::DowngradeNotAllowed,
            Error::TagFetch { .. } | Error::PullSecret { .. } | Error::Lock(_) => {
                ErrorKind::Transient
            }
            Error::RevisionUpdate { .. } => ErrorKind::Apply,
            Error::Config(_) | Error::Io(_) | Error::Json(_) => ErrorKind::Config,
        }
    }

    /// Whether waiting and re-running the same pass can succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NoValidVersion | ErrorKind::Transient | ErrorKind::Apply
        )
    }
}
