use chrono::{Duration, NaiveDate, TimeZone, Utc};
use civicdesk_core::{
    complaint::{Category, Complaint, Location, Severity, Status},
    error::DeskError,
    query::{filter_and_sort, parse_filter_value, Filter, SortDir, SortKey, SortSpec},
    types::Timestamp,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn complaint(id: &str, severity: Severity, zone: &str, created: Timestamp) -> Complaint {
    Complaint::file(
        id,
        "citizen-1",
        format!("Issue {id}"),
        Category::Roads,
        severity,
        Some(Location::in_zone("1 High Street", zone)),
        created,
    )
}

fn ids(view: &[&Complaint]) -> Vec<String> {
    view.iter().map(|c| c.id.clone()).collect()
}

fn five() -> Vec<Complaint> {
    vec![
        complaint("c1", Severity::High, "riverside", t0()),
        complaint("c2", Severity::High, "downtown", t0() + Duration::hours(1)),
        complaint("c3", Severity::Low, "downtown", t0() + Duration::hours(2)),
        complaint("c4", Severity::High, "downtown", t0() + Duration::hours(3)),
        complaint("c5", Severity::Medium, "downtown", t0() + Duration::hours(4)),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn filters_compose_with_and() {
    let complaints = five();
    let filter = Filter::default().severity(Severity::High).region("downtown");

    let unsorted: Vec<&Complaint> = complaints.iter().filter(|c| filter.matches(c)).collect();
    assert_eq!(ids(&unsorted), ["c2", "c4"]);

    let sorted = filter_and_sort(&complaints, &filter, &SortSpec::asc(SortKey::Severity));
    assert_eq!(ids(&sorted), ["c2", "c4"]);
}

#[test]
fn severity_sorts_by_rank_not_name() {
    let complaints = vec![
        complaint("m", Severity::Medium, "downtown", t0()),
        complaint("c", Severity::Critical, "downtown", t0()),
        complaint("l", Severity::Low, "downtown", t0()),
        complaint("h", Severity::High, "downtown", t0()),
    ];
    let asc = filter_and_sort(&complaints, &Filter::default(), &SortSpec::asc(SortKey::Severity));
    assert_eq!(ids(&asc), ["l", "m", "h", "c"]);

    let desc = filter_and_sort(&complaints, &Filter::default(), &SortSpec::desc(SortKey::Severity));
    assert_eq!(ids(&desc), ["c", "h", "m", "l"]);
}

/// Equal keys keep their input order in both directions.
#[test]
fn sort_is_stable() {
    let complaints = vec![
        complaint("a", Severity::High, "downtown", t0()),
        complaint("b", Severity::Low, "downtown", t0()),
        complaint("c", Severity::High, "downtown", t0()),
        complaint("d", Severity::Low, "downtown", t0()),
    ];
    let asc = filter_and_sort(&complaints, &Filter::default(), &SortSpec::asc(SortKey::Severity));
    assert_eq!(ids(&asc), ["b", "d", "a", "c"]);

    let desc = filter_and_sort(&complaints, &Filter::default(), &SortSpec::desc(SortKey::Severity));
    assert_eq!(ids(&desc), ["a", "c", "b", "d"]);
}

#[test]
fn default_sort_is_newest_first() {
    let complaints = five();
    let view = filter_and_sort(&complaints, &Filter::default(), &SortSpec::default());
    assert_eq!(ids(&view), ["c5", "c4", "c3", "c2", "c1"]);
}

#[test]
fn upvote_sort_uses_distinct_voter_count() {
    let mut complaints = five();
    for voter in ["v1", "v2", "v3"] {
        complaints[2].upvote(voter, t0()).unwrap();
    }
    complaints[0].upvote("v1", t0()).unwrap();

    let view = filter_and_sort(&complaints, &Filter::default(), &SortSpec::desc(SortKey::Upvotes));
    assert_eq!(ids(&view)[..2], ["c3", "c1"]);
}

#[test]
fn date_range_is_inclusive() {
    let complaints = five();
    let filter = Filter {
        date_from: Some(t0() + Duration::hours(1)),
        date_to: Some(t0() + Duration::hours(3)),
        ..Filter::default()
    };
    let view = filter_and_sort(&complaints, &filter, &SortSpec::asc(SortKey::Date));
    assert_eq!(ids(&view), ["c2", "c3", "c4"]);
}

#[test]
fn whole_day_range_covers_the_last_day() {
    let complaints = vec![
        complaint("before", Severity::Low, "downtown", Utc.with_ymd_and_hms(2024, 4, 30, 23, 59, 59).unwrap()),
        complaint("start", Severity::Low, "downtown", Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
        complaint("end", Severity::Low, "downtown", Utc.with_ymd_and_hms(2024, 5, 2, 23, 59, 59).unwrap()),
        complaint("after", Severity::Low, "downtown", Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()),
    ];
    let filter = Filter::default().between_days(
        NaiveDate::from_ymd_opt(2024, 5, 1),
        NaiveDate::from_ymd_opt(2024, 5, 2),
    );
    let view = filter_and_sort(&complaints, &filter, &SortSpec::asc(SortKey::Date));
    assert_eq!(ids(&view), ["start", "end"]);
}

#[test]
fn undated_records_fail_date_filters() {
    let mut complaints = five();
    complaints[1].created_at = None;
    let filter = Filter {
        date_from: Some(t0() - Duration::days(1)),
        ..Filter::default()
    };
    let view = filter_and_sort(&complaints, &filter, &SortSpec::asc(SortKey::Id));
    assert_eq!(ids(&view), ["c1", "c3", "c4", "c5"]);
}

#[test]
fn search_matches_any_field_case_insensitively() {
    let mut complaints = five();
    complaints[0].title = "Broken SIGNAL at junction".into();
    complaints[4].location = Some(Location::at_address("7 Canal Walk"));
    complaints[3].category = Category::Water;

    let by_title = Filter::default().search("signal");
    assert_eq!(ids(&filter_and_sort(&complaints, &by_title, &SortSpec::asc(SortKey::Id))), ["c1"]);

    let by_address = Filter::default().search("CANAL");
    assert_eq!(ids(&filter_and_sort(&complaints, &by_address, &SortSpec::asc(SortKey::Id))), ["c5"]);

    let by_category = Filter::default().search("water");
    assert_eq!(ids(&filter_and_sort(&complaints, &by_category, &SortSpec::asc(SortKey::Id))), ["c4"]);

    let by_id = Filter::default().search("C2");
    assert_eq!(ids(&filter_and_sort(&complaints, &by_id, &SortSpec::asc(SortKey::Id))), ["c2"]);

    let blank = Filter::default().search("   ");
    assert_eq!(filter_and_sort(&complaints, &blank, &SortSpec::default()).len(), 5);
}

#[test]
fn region_filter_falls_back_to_address_when_zone_missing() {
    let mut complaints = five();
    complaints[0].location = Some(Location::at_address("3 Mill Lane, Downtown"));
    let view = filter_and_sort(
        &complaints,
        &Filter::default().region("downtown"),
        &SortSpec::asc(SortKey::Id),
    );
    assert_eq!(ids(&view), ["c1", "c2", "c3", "c4", "c5"]);
}

#[test]
fn status_and_category_filters() {
    let mut complaints = five();
    complaints[2].set_status(Status::InProgress, "officer-1", None, t0()).unwrap();
    complaints[2].category = Category::Parks;

    let view = filter_and_sort(
        &complaints,
        &Filter::default().status(Status::InProgress).category(Category::Parks),
        &SortSpec::default(),
    );
    assert_eq!(ids(&view), ["c3"]);
}

#[test]
fn empty_results_are_not_errors() {
    let complaints = five();
    let view = filter_and_sort(&complaints, &Filter::default().severity(Severity::Critical), &SortSpec::default());
    assert!(view.is_empty());
    assert!(filter_and_sort(&[], &Filter::default(), &SortSpec::default()).is_empty());
}

#[test]
fn parses_sort_and_filter_parameters() {
    assert_eq!("createdAt".parse::<SortKey>().unwrap(), SortKey::Date);
    assert_eq!("upvotes".parse::<SortKey>().unwrap(), SortKey::Upvotes);
    assert_eq!("DESC".parse::<SortDir>().unwrap(), SortDir::Desc);
    assert!(matches!(
        "mood".parse::<SortKey>(),
        Err(DeskError::UnknownSortKey { .. })
    ));

    assert_eq!(parse_filter_value::<Severity>("all").unwrap(), None);
    assert_eq!(parse_filter_value::<Severity>("").unwrap(), None);
    assert_eq!(parse_filter_value::<Severity>("High").unwrap(), Some(Severity::High));
    assert!(parse_filter_value::<Status>("archived").is_err());
}

#[test]
fn filter_and_sort_deserialize_from_request_json() {
    let filter: Filter =
        serde_json::from_str(r#"{ "severity": "high", "zone": "downtown" }"#).unwrap();
    assert!(!filter.is_empty());
    let sort: SortSpec = serde_json::from_str(r#"{ "sortBy": "severity", "sortDir": "asc" }"#).unwrap();
    assert_eq!(sort, SortSpec::asc(SortKey::Severity));

    let complaints = five();
    assert_eq!(ids(&filter_and_sort(&complaints, &filter, &sort)), ["c2", "c4"]);
}

/// Request JSON reads choices the way query strings do: case-folded, with
/// `"all"` or an empty value meaning no filter.
#[test]
fn request_json_choices_fold_case_and_accept_all() {
    let complaints = five();

    let all: Filter = serde_json::from_str(r#"{ "severity": "all", "status": "", "zone": "All" }"#).unwrap();
    assert!(all.is_empty());
    assert_eq!(filter_and_sort(&complaints, &all, &SortSpec::default()).len(), 5);

    let shouted: Filter =
        serde_json::from_str(r#"{ "severity": "HIGH", "status": "Pending", "region": "downtown" }"#).unwrap();
    assert_eq!(shouted.severity, Some(Severity::High));
    assert_eq!(shouted.status, Some(Status::Pending));
    assert_eq!(
        ids(&filter_and_sort(&complaints, &shouted, &SortSpec::asc(SortKey::Date))),
        ["c2", "c4"]
    );

    let dashed: Filter = serde_json::from_str(r#"{ "status": "in-progress" }"#).unwrap();
    assert_eq!(dashed.status, Some(Status::InProgress));

    let sort: SortSpec = serde_json::from_str(r#"{ "sortBy": "createdAt", "sortDir": "ASC" }"#).unwrap();
    assert_eq!(sort, SortSpec::asc(SortKey::Date));
}

#[test]
fn request_json_rejects_unknown_choices() {
    assert!(serde_json::from_str::<Filter>(r#"{ "severity": "extreme" }"#).is_err());
    assert!(serde_json::from_str::<Filter>(r#"{ "category": "potholes" }"#).is_err());
    assert!(serde_json::from_str::<SortSpec>(r#"{ "sortBy": "mood" }"#).is_err());
}
