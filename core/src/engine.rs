//! The desk engine — one refresh of every derived view.
//!
//! PIPELINE (fixed):
//!   1. Escalation classifier refreshes each complaint's escalation state.
//!   2. Zone aggregator, statistics summarizer and map points read the
//!      refreshed snapshot. They do not depend on one another.
//!
//! RULES:
//!   - The input slice is never mutated; the view carries refreshed copies.
//!   - `now` is always supplied by the caller.
//!   - One malformed record never fails the refresh; it shows up in `issues`.

use crate::{
    complaint::Complaint,
    config::DeskConfig,
    error::{DeskResult, RecordIssue},
    escalation::{EscalationClassifier, EscalationReport},
    event::DeskEvent,
    query::{filter_and_sort, Filter, SortSpec},
    stats::{StatisticsSummarizer, Summary},
    types::Timestamp,
    zone::{map_points, MapPoints, ZoneAggregator, ZoneRegistry, ZoneReport},
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DeskView {
    pub evaluated_at: Timestamp,
    /// The input snapshot with escalation state refreshed, in input order.
    pub complaints: Vec<Complaint>,
    pub transitions: Vec<DeskEvent>,
    pub zones: ZoneReport,
    pub summary: Summary,
    pub map: MapPoints,
    pub issues: Vec<RecordIssue>,
}

pub struct DeskEngine {
    classifier: EscalationClassifier,
    aggregator: ZoneAggregator,
    summarizer: StatisticsSummarizer,
}

impl DeskEngine {
    pub fn new(config: &DeskConfig) -> DeskResult<Self> {
        config.validate()?;
        Ok(Self {
            classifier: EscalationClassifier::new(config.escalation),
            aggregator: ZoneAggregator::new(ZoneRegistry::new(config.zones.clone()), config.density),
            summarizer: StatisticsSummarizer::new(config.escalation),
        })
    }

    pub fn classifier(&self) -> &EscalationClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &ZoneRegistry {
        self.aggregator.registry()
    }

    /// Escalation pass only; nothing is written back.
    pub fn escalate(&self, complaints: &[Complaint], now: Timestamp) -> EscalationReport {
        self.classifier.refresh_all(complaints, now)
    }

    /// Full refresh. `now`'s timezone decides what "today" means for the
    /// summary; escalation ages are timezone-free.
    pub fn refresh<Tz: TimeZone>(&self, complaints: &[Complaint], now: &DateTime<Tz>) -> DeskView {
        let now_utc = now.with_timezone(&Utc);
        let report = self.classifier.refresh_all(complaints, now_utc);

        let mut refreshed = complaints.to_vec();
        for (complaint, outcome) in refreshed.iter_mut().zip(&report.outcomes) {
            EscalationClassifier::apply(complaint, outcome);
        }

        let zones = self.aggregator.aggregate(&refreshed);
        let summary = self.summarizer.summarize(&refreshed, now);
        let map = map_points(&refreshed);

        let mut issues: Vec<RecordIssue> = refreshed
            .iter()
            .flat_map(|c| c.issues().into_iter().map(|kind| RecordIssue::new(&c.id, kind)))
            .collect();
        issues.extend(zones.issues.iter().cloned());
        issues.sort_by(|a, b| a.complaint_id.cmp(&b.complaint_id).then(a.kind.cmp(&b.kind)));
        issues.dedup();

        let transitions: Vec<DeskEvent> = report.transitions().cloned().collect();
        log::debug!(
            "refresh at {now_utc}: {} complaints, {} transitions, {} issues",
            refreshed.len(),
            transitions.len(),
            issues.len(),
        );

        DeskView {
            evaluated_at: now_utc,
            complaints: refreshed,
            transitions,
            zones,
            summary,
            map,
            issues,
        }
    }

    /// Filtered, sorted view over any snapshot (usually `DeskView::complaints`).
    pub fn query<'a>(
        &self,
        complaints: &'a [Complaint],
        filter: &Filter,
        sort: &SortSpec,
    ) -> Vec<&'a Complaint> {
        filter_and_sort(complaints, filter, sort)
    }
}
