//! Zone aggregator — groups complaints by zone for dashboards and heatmaps.
//!
//! Matching (one zone per complaint at most):
//!   1. `location.zone` equals a registry id exactly.
//!   2. Only when `location.zone` is absent: the address contains a
//!      registry id, case-insensitively. First registry entry wins.
//!   3. Everything else lands in the unmatched bucket.
//!
//! Aggregation is order-independent: shuffling the input never changes the
//! report.

use crate::{
    complaint::{Complaint, Severity},
    config::{DensityBands, ZoneConfig},
    error::{IssueKind, RecordIssue},
    escalation::EscalationLevel,
    types::{ComplaintId, ZoneId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityClass {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl DensityBands {
    pub fn classify(&self, count: usize) -> DensityClass {
        match count {
            0 => DensityClass::None,
            n if n <= self.low_max => DensityClass::Low,
            n if n <= self.medium_max => DensityClass::Medium,
            n if n <= self.high_max => DensityClass::High,
            _ => DensityClass::Critical,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneStats {
    pub count: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_escalation: BTreeMap<EscalationLevel, usize>,
    pub density: DensityClass,
    /// Share of all complaints, 0–100. Zero when there are no complaints.
    pub percentage: f64,
}

impl ZoneStats {
    fn add(&mut self, complaint: &Complaint) {
        self.count += 1;
        *self.by_severity.entry(complaint.severity).or_default() += 1;
        *self
            .by_escalation
            .entry(complaint.escalation_status.level)
            .or_default() += 1;
    }

    fn finish(&mut self, total: usize, bands: &DensityBands) {
        self.density = bands.classify(self.count);
        self.percentage = if total == 0 {
            0.0
        } else {
            self.count as f64 / total as f64 * 100.0
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneReport {
    pub total: usize,
    /// One entry per registry zone, including empty ones.
    pub zones: BTreeMap<ZoneId, ZoneStats>,
    pub unmatched: ZoneStats,
    pub issues: Vec<RecordIssue>,
}

impl ZoneReport {
    pub fn zone(&self, id: &str) -> Option<&ZoneStats> {
        self.zones.get(id)
    }

    /// Sum over every bucket, unmatched included. Always equals `total`.
    pub fn bucket_sum(&self) -> usize {
        self.zones.values().map(|z| z.count).sum::<usize>() + self.unmatched.count
    }

    /// Zones ordered by count (descending), ties broken by id.
    pub fn ranked(&self) -> Vec<(&ZoneId, &ZoneStats)> {
        let mut ranked: Vec<_> = self.zones.iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// A fixed, ordered set of known zones.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: Vec<ZoneConfig>,
    needles: Vec<String>,
}

impl ZoneRegistry {
    pub fn new(zones: Vec<ZoneConfig>) -> Self {
        let needles = zones.iter().map(|z| z.id.to_lowercase()).collect();
        Self { zones, needles }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ids.into_iter()
                .map(|id| {
                    let id = id.into();
                    ZoneConfig {
                        label: id.clone(),
                        id,
                    }
                })
                .collect(),
        )
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|z| z.id.as_str())
    }

    pub fn zones(&self) -> &[ZoneConfig] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The registry zone a complaint belongs to, if any.
    pub fn match_zone(&self, complaint: &Complaint) -> Option<&ZoneId> {
        let location = complaint.location.as_ref()?;
        match location.explicit_zone() {
            Some(zone) => self.zones.iter().find(|z| z.id == zone).map(|z| &z.id),
            None => {
                let address = location.address.to_lowercase();
                self.needles
                    .iter()
                    .position(|needle| address.contains(needle.as_str()))
                    .map(|i| &self.zones[i].id)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneAggregator {
    registry: ZoneRegistry,
    bands: DensityBands,
}

impl ZoneAggregator {
    pub fn new(registry: ZoneRegistry, bands: DensityBands) -> Self {
        Self { registry, bands }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn aggregate(&self, complaints: &[Complaint]) -> ZoneReport {
        let mut zones: BTreeMap<ZoneId, ZoneStats> = self
            .registry
            .ids()
            .map(|id| (id.to_string(), ZoneStats::default()))
            .collect();
        let mut unmatched = ZoneStats::default();
        let mut issues = Vec::new();

        for complaint in complaints {
            match self.registry.match_zone(complaint) {
                Some(id) => {
                    if let Some(stats) = zones.get_mut(id) {
                        stats.add(complaint);
                    }
                }
                None => {
                    unmatched.add(complaint);
                    let kind = if complaint.location.is_none() {
                        IssueKind::NoLocation
                    } else {
                        IssueKind::ZoneUnmatched
                    };
                    issues.push(RecordIssue::new(&complaint.id, kind));
                }
            }
        }

        let total = complaints.len();
        for stats in zones.values_mut() {
            stats.finish(total, &self.bands);
        }
        unmatched.finish(total, &self.bands);
        // Keep the report independent of input order.
        issues.sort_by(|a, b| a.complaint_id.cmp(&b.complaint_id).then(a.kind.cmp(&b.kind)));

        if unmatched.count > 0 {
            log::debug!(
                "zone aggregation: {} of {total} complaints unmatched",
                unmatched.count
            );
        }

        ZoneReport {
            total,
            zones,
            unmatched,
            issues,
        }
    }
}

// ── Heatmap points ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub complaint_id: ComplaintId,
    pub lat: f64,
    pub lng: f64,
    pub severity: Severity,
    pub escalation: EscalationLevel,
    /// Heat weight in (0, 1], scaled by severity.
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPoints {
    pub points: Vec<MapPoint>,
    /// Complaints left off the map for lack of coordinates.
    pub skipped: usize,
}

/// Heat weight for a severity. Unknown severities still show up, faintly.
pub fn heat_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Unknown  => 0.1,
        Severity::Low      => 0.25,
        Severity::Medium   => 0.5,
        Severity::High     => 0.75,
        Severity::Critical => 1.0,
    }
}

/// One point per complaint with finite coordinates, in input order.
pub fn map_points(complaints: &[Complaint]) -> MapPoints {
    let mut out = MapPoints::default();
    for complaint in complaints {
        let coords = complaint
            .location
            .as_ref()
            .and_then(|l| l.coordinates)
            .filter(|c| c.lat.is_finite() && c.lng.is_finite());
        match coords {
            Some(c) => out.points.push(MapPoint {
                complaint_id: complaint.id.clone(),
                lat: c.lat,
                lng: c.lng,
                severity: complaint.severity,
                escalation: complaint.escalation_status.level,
                weight: heat_weight(complaint.severity),
            }),
            None => out.skipped += 1,
        }
    }
    out
}
