//! Complaint record — the unit of work flowing through every engine.
//!
//! RULES:
//!   - `timeline` is append-only. Nothing reorders or edits past events.
//!   - `updated_at` only moves forward.
//!   - `upvotes` is a set; a voter counts once.
//!   - `closed` is terminal. `resolved` may only move on to `closed`.
//!
//! Snapshots arrive from an external store and may be malformed. Enum
//! fields fall back to an `Unknown` variant and timestamps to `None`
//! instead of failing deserialization.

use crate::{
    error::{DeskError, DeskResult, IssueKind},
    escalation::EscalationLevel,
    types::{ComplaintId, Timestamp, UserId, ZoneId},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

// ── Classification enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sanitation,
    Roads,
    Water,
    Electricity,
    Parks,
    Traffic,
    Other,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Sanitation,
        Category::Roads,
        Category::Water,
        Category::Electricity,
        Category::Parks,
        Category::Traffic,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sanitation  => "sanitation",
            Category::Roads       => "roads",
            Category::Water       => "water",
            Category::Electricity => "electricity",
            Category::Parks       => "parks",
            Category::Traffic     => "traffic",
            Category::Other       => "other",
            Category::Unknown     => "unknown",
        }
    }
}

impl FromStr for Category {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DeskError::UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Fixed ordinal used for sorting. Unknown sorts below everything.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Unknown  => 0,
            Severity::Low      => 1,
            Severity::Medium   => 2,
            Severity::High     => 3,
            Severity::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low      => "low",
            Severity::Medium   => "medium",
            Severity::High     => "high",
            Severity::Critical => "critical",
            Severity::Unknown  => "unknown",
        }
    }
}

impl FromStr for Severity {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Severity::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| DeskError::UnknownVariant {
                kind: "severity",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Resolved,
        Status::Closed,
    ];

    /// Resolved or closed: escalation no longer applies.
    pub fn is_settled(&self) -> bool {
        matches!(self, Status::Resolved | Status::Closed)
    }

    /// Sort ordinal following the lifecycle.
    pub fn rank(&self) -> u8 {
        match self {
            Status::Unknown    => 0,
            Status::Pending    => 1,
            Status::InProgress => 2,
            Status::Resolved   => 3,
            Status::Closed     => 4,
        }
    }

    pub fn can_transition_to(&self, to: Status) -> bool {
        match (self, to) {
            (_, Status::Unknown)                => false,
            (Status::Closed, _)                 => false,
            (Status::Resolved, Status::Closed)  => true,
            (Status::Resolved, _)               => false,
            // closed is only reachable through resolved
            (_, Status::Closed)                 => false,
            _                                   => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending    => "pending",
            Status::InProgress => "in_progress",
            Status::Resolved   => "resolved",
            Status::Closed     => "closed",
            Status::Unknown    => "unknown",
        }
    }
}

impl FromStr for Status {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Status::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| DeskError::UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Location ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub zone: Option<ZoneId>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn at_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn in_zone(address: impl Into<String>, zone: impl Into<ZoneId>) -> Self {
        Self {
            address: address.into(),
            zone: Some(zone.into()),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates { lat, lng });
        self
    }

    /// The explicit zone, ignoring blank strings.
    pub fn explicit_zone(&self) -> Option<&str> {
        self.zone.as_deref().map(str::trim).filter(|z| !z.is_empty())
    }
}

// ── Timeline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
    Submitted,
    StatusChanged,
    Assigned,
    ProgressUpdated,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub action: TimelineAction,
    #[serde(default, with = "lenient_time")]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub performed_by: UserId,
    #[serde(default)]
    pub comment: Option<String>,
}

// ── Escalation state ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationStatus {
    #[serde(default)]
    pub level: EscalationLevel,
    #[serde(default, with = "lenient_time")]
    pub escalated_at: Option<Timestamp>,
    /// Levels for which a notification has already been dispatched.
    #[serde(default)]
    pub notifications_sent: BTreeSet<String>,
}

impl EscalationStatus {
    pub fn notified(&self, level: EscalationLevel) -> bool {
        self.notifications_sent.contains(level.as_str())
    }
}

// ── Complaint ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(alias = "_id")]
    pub id: ComplaintId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub citizen_id: UserId,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub assigned_squad: Option<String>,
    #[serde(default)]
    pub upvotes: BTreeSet<UserId>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub escalation_status: EscalationStatus,
    #[serde(default, with = "lenient_time")]
    pub created_at: Option<Timestamp>,
    #[serde(default, with = "lenient_time")]
    pub updated_at: Option<Timestamp>,
    /// Produced by the category-suggestion service; carried, never read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<serde_json::Value>,
}

impl Complaint {
    /// A citizen files a new complaint. The birth event is the first
    /// timeline entry.
    pub fn file(
        id: impl Into<ComplaintId>,
        citizen_id: impl Into<UserId>,
        title: impl Into<String>,
        category: Category,
        severity: Severity,
        location: Option<Location>,
        now: Timestamp,
    ) -> Self {
        let citizen_id = citizen_id.into();
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category,
            severity,
            status: Status::Pending,
            progress: 0,
            location,
            citizen_id: citizen_id.clone(),
            assigned_to: None,
            assigned_squad: None,
            upvotes: BTreeSet::new(),
            timeline: vec![TimelineEvent {
                action: TimelineAction::Submitted,
                timestamp: Some(now),
                performed_by: citizen_id,
                comment: None,
            }],
            escalation_status: EscalationStatus::default(),
            created_at: Some(now),
            updated_at: Some(now),
            ai_suggestions: None,
        }
    }

    /// A fresh random identifier for complaints filed outside a store.
    pub fn new_id() -> ComplaintId {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn votes(&self) -> usize {
        self.upvotes.len()
    }

    pub fn zone(&self) -> Option<&str> {
        self.location.as_ref().and_then(Location::explicit_zone)
    }

    pub fn address(&self) -> &str {
        self.location.as_ref().map_or("", |l| l.address.as_str())
    }

    pub fn set_status(
        &mut self,
        to: Status,
        performed_by: &str,
        comment: Option<String>,
        now: Timestamp,
    ) -> DeskResult<()> {
        if self.status == to {
            return Ok(());
        }
        if !self.status.can_transition_to(to) {
            return Err(DeskError::IllegalTransition {
                complaint_id: self.id.clone(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        if to.is_settled() {
            self.escalation_status.level = EscalationLevel::Green;
            self.escalation_status.escalated_at = None;
        }
        self.record(TimelineAction::StatusChanged, performed_by, comment, now);
        Ok(())
    }

    pub fn assign(
        &mut self,
        officer: Option<UserId>,
        squad: Option<String>,
        performed_by: &str,
        now: Timestamp,
    ) -> DeskResult<()> {
        self.ensure_not_closed(Status::InProgress)?;
        let comment = match (&officer, &squad) {
            (Some(o), Some(s)) => format!("assigned to {o} ({s})"),
            (Some(o), None)    => format!("assigned to {o}"),
            (None, Some(s))    => format!("assigned to squad {s}"),
            (None, None)       => "unassigned".to_string(),
        };
        self.assigned_to = officer;
        self.assigned_squad = squad;
        self.record(TimelineAction::Assigned, performed_by, Some(comment), now);
        Ok(())
    }

    /// Progress is clamped to 0–100. Lowering it is allowed; callers own
    /// that convention.
    pub fn set_progress(&mut self, pct: u8, performed_by: &str, now: Timestamp) -> DeskResult<()> {
        self.ensure_not_closed(self.status)?;
        self.progress = pct.min(100);
        self.record(
            TimelineAction::ProgressUpdated,
            performed_by,
            Some(format!("progress {}%", self.progress)),
            now,
        );
        Ok(())
    }

    pub fn upvote(&mut self, voter: &str, now: Timestamp) -> DeskResult<()> {
        if !self.upvotes.insert(voter.to_string()) {
            return Err(DeskError::DuplicateUpvote {
                complaint_id: self.id.clone(),
                voter: voter.to_string(),
            });
        }
        self.touch(now);
        Ok(())
    }

    /// Annotations for fields this record had to fall back on.
    pub fn issues(&self) -> Vec<IssueKind> {
        let mut issues = Vec::new();
        if self.created_at.is_none() {
            issues.push(IssueKind::AgeUnknown);
        }
        if self.updated_at.is_none() {
            issues.push(IssueKind::UpdatedAtUnknown);
        }
        if self.category == Category::Unknown {
            issues.push(IssueKind::UnknownCategory);
        }
        if self.severity == Severity::Unknown {
            issues.push(IssueKind::UnknownSeverity);
        }
        if self.status == Status::Unknown {
            issues.push(IssueKind::UnknownStatus);
        }
        if self.location.is_none() {
            issues.push(IssueKind::NoLocation);
        }
        issues
    }

    fn ensure_not_closed(&self, to: Status) -> DeskResult<()> {
        if self.status == Status::Closed {
            return Err(DeskError::IllegalTransition {
                complaint_id: self.id.clone(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    fn record(
        &mut self,
        action: TimelineAction,
        performed_by: &str,
        comment: Option<String>,
        now: Timestamp,
    ) {
        self.timeline.push(TimelineEvent {
            action,
            timestamp: Some(now),
            performed_by: performed_by.to_string(),
            comment,
        });
        self.touch(now);
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = Some(match self.updated_at {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }
}

// ── Timestamp parsing ────────────────────────────────────────────────────────

/// Parse the timestamp shapes stores hand us: RFC 3339 strings, naive
/// date-times, bare dates, epoch milliseconds and `{"$date": ..}` wrappers.
pub fn parse_timestamp(raw: &serde_json::Value) -> Option<Timestamp> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
    use serde_json::Value;

    match raw {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => map.get("$date").and_then(parse_timestamp),
        _ => None,
    }
}

mod lenient_time {
    use super::parse_timestamp;
    use crate::types::Timestamp;
    use chrono::SecondsFormat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(d)?;
        let parsed = raw.as_ref().and_then(parse_timestamp);
        if parsed.is_none() {
            if let Some(bad) = raw.filter(|v| !v.is_null()) {
                log::warn!("Unparseable timestamp {bad}; treating as unknown");
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp(&json!("2024-03-01T12:00:00Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-01T12:00:00.000")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-01 12:00:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(
            parse_timestamp(&json!({ "$date": "2024-03-01T12:00:00Z" })),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2024-03-01")),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn garbage_timestamps_become_none() {
        assert_eq!(parse_timestamp(&json!("last tuesday")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn unknown_enum_strings_fall_back() {
        let c: Complaint = serde_json::from_value(json!({
            "_id": "c-1",
            "category": "graffiti",
            "severity": "apocalyptic",
            "status": "archived",
            "createdAt": "not a date"
        }))
        .unwrap();
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.severity, Severity::Unknown);
        assert_eq!(c.status, Status::Unknown);
        assert_eq!(c.created_at, None);
    }

    #[test]
    fn status_parsing_accepts_dashes() {
        assert_eq!("In-Progress".parse::<Status>().unwrap(), Status::InProgress);
        assert!("archived".parse::<Status>().is_err());
    }
}
