//! Statistics summarizer — dashboard headline counts at an instant.
//!
//! `active` excludes only `resolved`. Closed complaints still count as
//! active; see DESIGN.md before changing that.

use crate::{
    complaint::{Complaint, Status},
    config::EscalationThresholds,
    escalation::{days_open, level_for_days, EscalationLevel},
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub resolved_today: usize,
    pub overdue_yellow: usize,
    pub overdue_red: usize,
    /// Records skipped by a time-based count because a timestamp was unusable.
    pub undated: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsSummarizer {
    thresholds: EscalationThresholds,
}

impl StatisticsSummarizer {
    pub fn new(thresholds: EscalationThresholds) -> Self {
        Self { thresholds }
    }

    /// "Today" is the calendar day of `now` in `now`'s own timezone.
    pub fn summarize<Tz: TimeZone>(&self, complaints: &[Complaint], now: &DateTime<Tz>) -> Summary {
        let tz = now.timezone();
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);
        let mut summary = Summary {
            total: complaints.len(),
            ..Summary::default()
        };

        for complaint in complaints {
            if complaint.status == Status::Resolved {
                match complaint.updated_at {
                    Some(updated) => {
                        if updated.with_timezone(&tz).date_naive() == today {
                            summary.resolved_today += 1;
                        }
                    }
                    None => summary.undated += 1,
                }
                continue;
            }

            summary.active += 1;
            let Some(created) = complaint.created_at else {
                summary.undated += 1;
                continue;
            };
            match level_for_days(days_open(created, now_utc), &self.thresholds) {
                EscalationLevel::Green  => {}
                EscalationLevel::Yellow => summary.overdue_yellow += 1,
                EscalationLevel::Red    => summary.overdue_red += 1,
            }
        }

        log::debug!(
            "summary: total={} active={} resolved_today={} yellow={} red={} undated={}",
            summary.total,
            summary.active,
            summary.resolved_today,
            summary.overdue_yellow,
            summary.overdue_red,
            summary.undated,
        );
        summary
    }
}
