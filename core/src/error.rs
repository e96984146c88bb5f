use crate::types::ComplaintId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unknown sort key '{key}'")]
    UnknownSortKey { key: String },

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Complaint {complaint_id}: illegal status transition {from} -> {to}")]
    IllegalTransition {
        complaint_id: ComplaintId,
        from: String,
        to: String,
    },

    #[error("Complaint {complaint_id}: voter '{voter}' has already upvoted")]
    DuplicateUpvote {
        complaint_id: ComplaintId,
        voter: String,
    },

    #[error("Complaint '{complaint_id}' not found")]
    ComplaintNotFound { complaint_id: ComplaintId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;

/// A per-record annotation. Engines never fail a batch because of one bad
/// record; they report what they had to work around instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub complaint_id: ComplaintId,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// `createdAt` missing or unparseable; excluded from age-based counts.
    AgeUnknown,
    /// `updatedAt` missing or unparseable; excluded from resolved-today.
    UpdatedAtUnknown,
    UnknownCategory,
    UnknownSeverity,
    UnknownStatus,
    /// Location present but no registry zone matched.
    ZoneUnmatched,
    /// No location at all.
    NoLocation,
}

impl RecordIssue {
    pub fn new(complaint_id: &str, kind: IssueKind) -> Self {
        Self {
            complaint_id: complaint_id.to_string(),
            kind,
        }
    }
}
