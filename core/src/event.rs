//! Events emitted by the escalation pass.
//!
//! The desk never delivers notifications itself. A transition event is the
//! hand-off point for whatever dispatcher the host application runs.

use crate::{
    escalation::EscalationLevel,
    types::{ComplaintId, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    /// A complaint reached a level it had not been notified for.
    ComplaintEscalated {
        complaint_id: ComplaintId,
        from: EscalationLevel,
        to: EscalationLevel,
        days_open: i64,
        at: Timestamp,
    },
    /// A settled complaint dropped back to green.
    EscalationReset {
        complaint_id: ComplaintId,
        from: EscalationLevel,
        at: Timestamp,
    },
}

impl DeskEvent {
    pub fn complaint_id(&self) -> &str {
        match self {
            DeskEvent::ComplaintEscalated { complaint_id, .. }
            | DeskEvent::EscalationReset { complaint_id, .. } => complaint_id,
        }
    }

    /// Stable name used for the `event_type` column of the event log.
    pub fn event_type(&self) -> &'static str {
        match self {
            DeskEvent::ComplaintEscalated { .. } => "complaint_escalated",
            DeskEvent::EscalationReset { .. }    => "escalation_reset",
        }
    }

    pub fn at(&self) -> Timestamp {
        match self {
            DeskEvent::ComplaintEscalated { at, .. } | DeskEvent::EscalationReset { at, .. } => *at,
        }
    }
}

/// An event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub complaint_id: ComplaintId,
    pub event_type: String,
    pub payload: String, // JSON-serialized DeskEvent
    pub recorded_at: String,
}
