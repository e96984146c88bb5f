use chrono::{Duration, FixedOffset, TimeZone, Utc};
use civicdesk_core::{
    complaint::{Category, Complaint, Severity, Status},
    config::EscalationThresholds,
    stats::{StatisticsSummarizer, Summary},
    types::Timestamp,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap()
}

fn aged(id: &str, days_old: i64) -> Complaint {
    Complaint::file(
        id,
        "citizen-1",
        "Missed garbage pickup",
        Category::Sanitation,
        Severity::Medium,
        None,
        now() - Duration::days(days_old),
    )
}

/// Walk a complaint to `status`, with the final transition at `at`.
fn moved_to(mut c: Complaint, status: Status, at: Timestamp) -> Complaint {
    let path: &[Status] = match status {
        Status::InProgress => &[Status::InProgress],
        Status::Resolved => &[Status::InProgress, Status::Resolved],
        Status::Closed => &[Status::InProgress, Status::Resolved, Status::Closed],
        _ => &[],
    };
    for step in path {
        c.set_status(*step, "officer-1", None, at).unwrap();
    }
    c
}

fn summarizer() -> StatisticsSummarizer {
    StatisticsSummarizer::new(EscalationThresholds::default())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn empty_collection_is_all_zero() {
    assert_eq!(summarizer().summarize(&[], &now()), Summary::default());
}

/// Only `resolved` is excluded from active; closed still counts.
#[test]
fn active_excludes_resolved_but_not_closed() {
    let complaints = vec![
        aged("pending", 1),
        moved_to(aged("working", 1), Status::InProgress, now()),
        moved_to(aged("resolved", 1), Status::Resolved, now()),
        moved_to(aged("closed", 1), Status::Closed, now()),
    ];
    let summary = summarizer().summarize(&complaints, &now());
    assert_eq!(summary.total, 4);
    assert_eq!(summary.active, 3);
}

#[test]
fn overdue_bands_are_disjoint() {
    let complaints = vec![
        aged("fresh", 2),
        aged("edge-green", 3),
        aged("yellow", 5),
        aged("edge-yellow", 7),
        moved_to(aged("red", 9), Status::InProgress, now()),
        moved_to(aged("red-closed", 12), Status::Closed, now() - Duration::days(1)),
        moved_to(aged("old-resolved", 20), Status::Resolved, now() - Duration::days(2)),
    ];
    let summary = summarizer().summarize(&complaints, &now());

    assert_eq!(summary.overdue_yellow, 2);
    assert_eq!(summary.overdue_red, 2);
    assert_eq!(summary.active, 6);
    assert!(summary.overdue_yellow + summary.overdue_red <= summary.active);
}

#[test]
fn resolved_today_uses_calendar_day_of_now() {
    let today = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
    let yesterday = Utc.with_ymd_and_hms(2024, 6, 9, 23, 0, 0).unwrap();
    let complaints = vec![
        moved_to(aged("a", 4), Status::Resolved, today),
        moved_to(aged("b", 4), Status::Resolved, yesterday),
        // Closed today is not "resolved today".
        moved_to(aged("c", 4), Status::Closed, today),
    ];
    let summary = summarizer().summarize(&complaints, &now());
    assert_eq!(summary.resolved_today, 1);
}

/// "Today" follows the timezone `now` is expressed in.
#[test]
fn resolved_today_respects_evaluation_timezone() {
    let resolved_at = Utc.with_ymd_and_hms(2024, 6, 9, 18, 30, 0).unwrap();
    let complaints = vec![moved_to(aged("a", 4), Status::Resolved, resolved_at)];
    let instant = Utc.with_ymd_and_hms(2024, 6, 9, 20, 0, 0).unwrap();

    let in_utc = summarizer().summarize(&complaints, &instant);
    assert_eq!(in_utc.resolved_today, 1);

    // 18:30Z is 23:30 on the 9th at +05:00, while 20:00Z is already the 10th.
    let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
    let in_plus_five = summarizer().summarize(&complaints, &instant.with_timezone(&plus_five));
    assert_eq!(in_plus_five.resolved_today, 0);
}

#[test]
fn undated_records_skip_time_based_counts_only() {
    let mut no_created = aged("a", 10);
    no_created.created_at = None;
    let mut no_updated = moved_to(aged("b", 10), Status::Resolved, now());
    no_updated.updated_at = None;

    let summary = summarizer().summarize(&[no_created, no_updated], &now());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.active, 1);
    assert_eq!(summary.overdue_red, 0);
    assert_eq!(summary.resolved_today, 0);
    assert_eq!(summary.undated, 2);
}

#[test]
fn recomputation_is_idempotent() {
    let complaints = vec![aged("a", 5), aged("b", 9), moved_to(aged("c", 1), Status::Resolved, now())];
    let first = summarizer().summarize(&complaints, &now());
    let second = summarizer().summarize(&complaints, &(now() + Duration::minutes(30)));
    assert_eq!(first, second);
}
