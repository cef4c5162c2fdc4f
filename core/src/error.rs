use crate::types::{CaseId, Version};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionsError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Assignment conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Invalid rule set: {}", problems.join("; "))]
    InvalidRuleSet { problems: Vec<String> },

    #[error("Cannot read rule set {path}: {source}")]
    RuleSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CollectionsError {
    pub fn case_not_found(case_id: CaseId) -> Self {
        Self::NotFound { entity: "Case", id: case_id }
    }

    /// Store failures roll back cleanly, so the whole run can be retried.
    /// Conflicts are not: the caller must re-read the case first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Why an optimistic write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Caller's expected version no longer matches the stored case.
    StaleVersion { expected: Version, current: Version },
    /// Another writer advanced the version between our read and our write.
    ConcurrentUpdate { case_id: CaseId },
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::StaleVersion { expected, current } => {
                write!(f, "expectedVersion={expected}, currentVersion={current}")
            }
            ConflictKind::ConcurrentUpdate { case_id } => {
                write!(f, "case {case_id} was modified by another process")
            }
        }
    }
}

pub type CollectionsResult<T> = Result<T, CollectionsError>;
