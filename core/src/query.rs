//! Filter/sort engine for tabular complaint views.
//!
//! Filters combine with AND. Free-text search is the one OR: a hit on id,
//! title, category or address is enough. Sorting is stable in both
//! directions; equal keys keep their input order.

use crate::{
    complaint::{Category, Complaint, Severity, Status},
    error::{DeskError, DeskResult},
    types::{Timestamp, ZoneId},
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{cmp::Ordering, str::FromStr};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, deserialize_with = "choice")]
    pub severity: Option<Severity>,
    #[serde(default, deserialize_with = "choice")]
    pub status: Option<Status>,
    #[serde(default, alias = "zone", deserialize_with = "region")]
    pub region: Option<ZoneId>,
    #[serde(default, deserialize_with = "choice")]
    pub category: Option<Category>,
    /// Inclusive lower bound on `created_at`.
    #[serde(default)]
    pub date_from: Option<Timestamp>,
    /// Inclusive upper bound on `created_at`.
    #[serde(default)]
    pub date_to: Option<Timestamp>,
    #[serde(default)]
    pub search: Option<String>,
}

impl Filter {
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn region(mut self, region: impl Into<ZoneId>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Whole calendar days (UTC): `from` at midnight through the last
    /// millisecond of `to`.
    pub fn between_days(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive));
        self.date_to = to
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive) + Duration::days(1) - Duration::milliseconds(1));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Filter::default()
    }

    pub fn matches(&self, complaint: &Complaint) -> bool {
        if self.severity.is_some_and(|s| complaint.severity != s) {
            return false;
        }
        if self.status.is_some_and(|s| complaint.status != s) {
            return false;
        }
        if self.category.is_some_and(|c| complaint.category != c) {
            return false;
        }
        if let Some(region) = &self.region {
            if !in_region(complaint, region) {
                return false;
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(created) = complaint.created_at else {
                return false;
            };
            if self.date_from.is_some_and(|from| created < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| created > to) {
                return false;
            }
        }
        if let Some(text) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = [
                complaint.id.as_str(),
                complaint.title.as_str(),
                complaint.category.as_str(),
                complaint.address(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Same resolution order as zone matching: explicit zone first, address
/// substring only when no zone is recorded.
fn in_region(complaint: &Complaint, region: &str) -> bool {
    let Some(location) = complaint.location.as_ref() else {
        return false;
    };
    let region = region.trim().to_lowercase();
    match location.explicit_zone() {
        Some(zone) => zone.to_lowercase() == region,
        None => location.address.to_lowercase().contains(&region),
    }
}

/// Turn a query-string style value into a filter field. Empty and `"all"`
/// mean no filter.
pub fn parse_filter_value<T: FromStr<Err = DeskError>>(raw: &str) -> DeskResult<Option<T>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    raw.parse().map(Some)
}

/// Request values go through the same parsing as query strings: case is
/// folded, `"all"` and empty clear the field, anything else unknown is
/// rejected rather than matched as the unknown bucket.
fn choice<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = DeskError>,
{
    match Option::<String>::deserialize(d)? {
        Some(raw) => parse_filter_value(&raw).map_err(de::Error::custom),
        None => Ok(None),
    }
}

fn region<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ZoneId>, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty() && !raw.eq_ignore_ascii_case("all")))
}

fn param<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = DeskError>,
{
    String::deserialize(d)?.parse().map_err(de::Error::custom)
}

// ── Sorting ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// `created_at`.
    #[default]
    Date,
    UpdatedAt,
    Severity,
    Status,
    Upvotes,
    Progress,
    Category,
    Title,
    Id,
    Zone,
    Escalation,
}

impl SortKey {
    pub fn compare(&self, a: &Complaint, b: &Complaint) -> Ordering {
        match self {
            SortKey::Date       => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt  => a.updated_at.cmp(&b.updated_at),
            SortKey::Severity   => a.severity.rank().cmp(&b.severity.rank()),
            SortKey::Status     => a.status.rank().cmp(&b.status.rank()),
            SortKey::Upvotes    => a.votes().cmp(&b.votes()),
            SortKey::Progress   => a.progress.cmp(&b.progress),
            SortKey::Category   => a.category.as_str().cmp(b.category.as_str()),
            SortKey::Title      => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Id         => a.id.cmp(&b.id),
            SortKey::Zone       => a.zone().cmp(&b.zone()),
            SortKey::Escalation => a.escalation_status.level.cmp(&b.escalation_status.level),
        }
    }
}

impl FromStr for SortKey {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "date" | "created_at" | "createdat" => SortKey::Date,
            "updated_at" | "updatedat"          => SortKey::UpdatedAt,
            "severity"                          => SortKey::Severity,
            "status"                            => SortKey::Status,
            "upvotes" | "votes"                 => SortKey::Upvotes,
            "progress"                          => SortKey::Progress,
            "category"                          => SortKey::Category,
            "title"                             => SortKey::Title,
            "id" | "_id"                        => SortKey::Id,
            "zone" | "region"                   => SortKey::Zone,
            "escalation" | "escalation_level"   => SortKey::Escalation,
            _ => {
                return Err(DeskError::UnknownSortKey {
                    key: s.to_string(),
                })
            }
        };
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDir {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending"   => Ok(SortDir::Asc),
            "desc" | "descending" => Ok(SortDir::Desc),
            _ => Err(DeskError::UnknownVariant {
                kind: "sort direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Newest first unless told otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    #[serde(default, deserialize_with = "param")]
    pub sort_by: SortKey,
    #[serde(default, deserialize_with = "param")]
    pub sort_dir: SortDir,
}

impl SortSpec {
    pub fn new(sort_by: SortKey, sort_dir: SortDir) -> Self {
        Self { sort_by, sort_dir }
    }

    pub fn asc(sort_by: SortKey) -> Self {
        Self::new(sort_by, SortDir::Asc)
    }

    pub fn desc(sort_by: SortKey) -> Self {
        Self::new(sort_by, SortDir::Desc)
    }

    fn compare(&self, a: &Complaint, b: &Complaint) -> Ordering {
        let ord = self.sort_by.compare(a, b);
        match self.sort_dir {
            SortDir::Asc  => ord,
            SortDir::Desc => ord.reverse(),
        }
    }
}

/// Filter then stable-sort. Returns references into `complaints`.
pub fn filter_and_sort<'a>(
    complaints: &'a [Complaint],
    filter: &Filter,
    sort: &SortSpec,
) -> Vec<&'a Complaint> {
    let mut view: Vec<&Complaint> = complaints.iter().filter(|c| filter.matches(c)).collect();
    view.sort_by(|a, b| sort.compare(a, b));
    view
}
