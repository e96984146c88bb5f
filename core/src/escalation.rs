//! Escalation classifier — maps a complaint's age and status to a
//! green/yellow/red urgency level.
//!
//! RULES:
//!   - Resolved and closed complaints are always green.
//!   - While open, the recorded level never goes down. A complaint that was
//!     red stays red even if a later evaluation computes a lower level.
//!   - A transition event fires once per level, tracked through
//!     `notifications_sent`.
//!   - `now` is always passed in. Nothing here reads the system clock.

use crate::{
    complaint::{Complaint, EscalationStatus},
    config::EscalationThresholds,
    error::{IssueKind, RecordIssue},
    event::DeskEvent,
    types::{ComplaintId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    #[default]
    Green,
    Yellow,
    Red,
}

impl EscalationLevel {
    pub const ALL: [EscalationLevel; 3] = [
        EscalationLevel::Green,
        EscalationLevel::Yellow,
        EscalationLevel::Red,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationLevel::Green  => "green",
            EscalationLevel::Yellow => "yellow",
            EscalationLevel::Red    => "red",
        }
    }
}

impl fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole days open, rounded up. A creation time in the future counts as 0.
pub fn days_open(created_at: Timestamp, now: Timestamp) -> i64 {
    let elapsed = now.signed_duration_since(created_at);
    if elapsed <= Duration::zero() {
        return 0;
    }
    // Any fraction of a day counts, down to the nanosecond.
    let secs = elapsed.num_seconds();
    let subsec = elapsed - Duration::seconds(secs);
    let partial = secs % DAY_SECS != 0 || subsec > Duration::zero();
    secs / DAY_SECS + i64::from(partial)
}

/// Level for a number of days open under the given thresholds.
pub fn level_for_days(days: i64, thresholds: &EscalationThresholds) -> EscalationLevel {
    if days > thresholds.red_after_days {
        EscalationLevel::Red
    } else if days > thresholds.yellow_after_days {
        EscalationLevel::Yellow
    } else {
        EscalationLevel::Green
    }
}

/// Result of evaluating one complaint. The input is never mutated; callers
/// that own the complaint write `status` back with [`EscalationClassifier::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub complaint_id: ComplaintId,
    pub status: EscalationStatus,
    pub transition: Option<DeskEvent>,
    pub issue: Option<RecordIssue>,
}

impl EscalationOutcome {
    pub fn level(&self) -> EscalationLevel {
        self.status.level
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationReport {
    pub outcomes: Vec<EscalationOutcome>,
}

impl EscalationReport {
    pub fn transitions(&self) -> impl Iterator<Item = &DeskEvent> {
        self.outcomes.iter().filter_map(|o| o.transition.as_ref())
    }

    pub fn issues(&self) -> impl Iterator<Item = &RecordIssue> {
        self.outcomes.iter().filter_map(|o| o.issue.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationClassifier {
    thresholds: EscalationThresholds,
}

impl EscalationClassifier {
    pub fn new(thresholds: EscalationThresholds) -> Self {
        Self { thresholds }
    }

    /// Level from status and age alone, ignoring recorded state.
    /// `None` when the complaint is open and its age is unknown.
    pub fn computed_level(&self, complaint: &Complaint, now: Timestamp) -> Option<EscalationLevel> {
        if complaint.status.is_settled() {
            return Some(EscalationLevel::Green);
        }
        complaint
            .created_at
            .map(|created| level_for_days(days_open(created, now), &self.thresholds))
    }

    pub fn evaluate(&self, complaint: &Complaint, now: Timestamp) -> EscalationOutcome {
        let recorded = &complaint.escalation_status;
        let mut status = recorded.clone();
        let mut transition = None;
        let mut issue = None;

        if complaint.status.is_settled() {
            status.level = EscalationLevel::Green;
            status.escalated_at = None;
            if recorded.level != EscalationLevel::Green {
                transition = Some(DeskEvent::EscalationReset {
                    complaint_id: complaint.id.clone(),
                    from: recorded.level,
                    at: now,
                });
            }
        } else if let Some(created) = complaint.created_at {
            let days = days_open(created, now);
            let level = level_for_days(days, &self.thresholds).max(recorded.level);
            if level > recorded.level {
                status.level = level;
                status.escalated_at = Some(now);
            }
            // Only a rise fires. A level already on record counts as notified.
            if level > recorded.level && !recorded.notified(level) {
                status.notifications_sent.insert(level.as_str().to_string());
                transition = Some(DeskEvent::ComplaintEscalated {
                    complaint_id: complaint.id.clone(),
                    from: recorded.level,
                    to: level,
                    days_open: days,
                    at: now,
                });
            }
        } else {
            issue = Some(RecordIssue::new(&complaint.id, IssueKind::AgeUnknown));
        }

        EscalationOutcome {
            complaint_id: complaint.id.clone(),
            status,
            transition,
            issue,
        }
    }

    pub fn refresh_all(&self, complaints: &[Complaint], now: Timestamp) -> EscalationReport {
        let outcomes: Vec<EscalationOutcome> =
            complaints.iter().map(|c| self.evaluate(c, now)).collect();

        let report = EscalationReport { outcomes };
        for event in report.transitions() {
            if let DeskEvent::ComplaintEscalated { complaint_id, from, to, days_open, .. } = event {
                log::info!("complaint {complaint_id} escalated {from} -> {to} after {days_open} days");
            }
        }
        let undated = report.issues().count();
        if undated > 0 {
            log::warn!("{undated} open complaints have no usable createdAt; escalation left unchanged");
        }
        report
    }

    /// Write an outcome back onto the complaint it was computed from.
    pub fn apply(complaint: &mut Complaint, outcome: &EscalationOutcome) {
        debug_assert_eq!(complaint.id, outcome.complaint_id);
        complaint.escalation_status = outcome.status.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn days_open_rounds_up() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(days_open(created, created), 0);
        assert_eq!(days_open(created, created + Duration::seconds(1)), 1);
        assert_eq!(days_open(created, created + Duration::days(3)), 3);
        assert_eq!(days_open(created, created + Duration::days(3) + Duration::minutes(1)), 4);
        assert_eq!(days_open(created, created + Duration::days(3) + Duration::microseconds(500)), 4);
        assert_eq!(days_open(created, created + Duration::nanoseconds(1)), 1);
    }

    #[test]
    fn future_creation_is_zero_days() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(days_open(now + Duration::hours(5), now), 0);
    }

    #[test]
    fn band_edges() {
        let t = EscalationThresholds::default();
        assert_eq!(level_for_days(0, &t), EscalationLevel::Green);
        assert_eq!(level_for_days(3, &t), EscalationLevel::Green);
        assert_eq!(level_for_days(4, &t), EscalationLevel::Yellow);
        assert_eq!(level_for_days(7, &t), EscalationLevel::Yellow);
        assert_eq!(level_for_days(8, &t), EscalationLevel::Red);
    }
}
