//! Deterministic sample snapshots for demos, the runner and tests.
//!
//! Same seed, same registry and same `now` give byte-identical output.
//! Every complaint is built through the normal lifecycle operations, so
//! generated records respect the same invariants as real ones.

use crate::{
    complaint::{Category, Complaint, Location, Severity, Status},
    error::DeskResult,
    rng::{DeskRng, SampleStream},
    types::Timestamp,
    zone::ZoneRegistry,
};
use chrono::Duration;

const DAY_MS: u64 = 86_400_000;
const MAX_AGE_DAYS: u64 = 20;

const STREETS: &[&str] = &[
    "Market Street", "Elm Avenue", "Station Road", "Mill Lane", "Park Row",
    "Quay Street", "Church Road", "Victoria Avenue", "Canal Walk", "High Street",
];

const SQUADS: &[&str] = &["alpha", "bravo", "charlie", "delta"];

pub struct SampleGenerator {
    identity: DeskRng,
    classification: DeskRng,
    location: DeskRng,
    lifecycle: DeskRng,
    votes: DeskRng,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            identity: DeskRng::new(seed, SampleStream::Identity),
            classification: DeskRng::new(seed, SampleStream::Classification),
            location: DeskRng::new(seed, SampleStream::Location),
            lifecycle: DeskRng::new(seed, SampleStream::Lifecycle),
            votes: DeskRng::new(seed, SampleStream::Votes),
        }
    }

    /// `count` complaints created within the last 20 days before `now`.
    pub fn generate(
        &mut self,
        count: usize,
        registry: &ZoneRegistry,
        now: Timestamp,
    ) -> DeskResult<Vec<Complaint>> {
        let complaints = (0..count)
            .map(|_| self.complaint(registry, now))
            .collect::<DeskResult<Vec<_>>>()?;
        log::debug!("generated {} sample complaints", complaints.len());
        Ok(complaints)
    }

    fn complaint(&mut self, registry: &ZoneRegistry, now: Timestamp) -> DeskResult<Complaint> {
        let id = self.identity.next_uuid().to_string();
        let citizen = format!("citizen-{:04}", self.identity.next_u64_below(500));

        let category = *self.classification.pick(&Category::ALL);
        let severity = Severity::ALL[self.classification.weighted_index(&[0.35, 0.35, 0.2, 0.1])];
        let title = *self.classification.pick(titles(category));

        let age_ms = self.lifecycle.next_u64_below(MAX_AGE_DAYS * DAY_MS);
        let created = now - Duration::milliseconds(age_ms as i64);

        let location = self.place(registry);
        let mut complaint = Complaint::file(id, citizen, title, category, severity, location, created);

        for i in 0..self.votes.next_u64_below(8) {
            let voter = format!("voter-{:04}", i * 61 + self.votes.next_u64_below(61));
            complaint.upvote(&voter, created)?;
        }

        self.advance_lifecycle(&mut complaint, created, age_ms)?;
        Ok(complaint)
    }

    fn place(&mut self, registry: &ZoneRegistry) -> Option<Location> {
        let rng = &mut self.location;
        let number = 1 + rng.next_u64_below(400);
        let address = format!("{number} {}", rng.pick(STREETS));
        let roll = rng.next_f64();

        let (mut location, zone_index) = if registry.is_empty() || roll >= 0.95 {
            return None;
        } else if roll < 0.6 {
            let i = rng.next_u64_below(registry.len() as u64) as usize;
            let zone = &registry.zones()[i];
            (Location::in_zone(address, zone.id.clone()), i)
        } else if roll < 0.85 {
            // Older records carry the zone only inside the address.
            let i = rng.next_u64_below(registry.len() as u64) as usize;
            let zone = &registry.zones()[i];
            (Location::at_address(format!("{address}, {}", zone.id)), i)
        } else {
            (Location::at_address(format!("{address}, Outer Ring")), registry.len())
        };

        if rng.chance(0.7) {
            let lat = 40.70 + zone_index as f64 * 0.02 + rng.next_f64() * 0.015;
            let lng = -74.01 + zone_index as f64 * 0.02 + rng.next_f64() * 0.015;
            location = location.with_coordinates(lat, lng);
        }
        Some(location)
    }

    fn advance_lifecycle(
        &mut self,
        complaint: &mut Complaint,
        created: Timestamp,
        age_ms: u64,
    ) -> DeskResult<()> {
        let rng = &mut self.lifecycle;
        let target = [Status::Pending, Status::InProgress, Status::Resolved, Status::Closed]
            [rng.weighted_index(&[0.4, 0.3, 0.25, 0.05])];
        if target == Status::Pending {
            return Ok(());
        }

        let mut cursor = 0u64;
        let officer = format!("officer-{:02}", rng.next_u64_below(12));
        let squad = rng.pick(SQUADS).to_string();
        let at = next_instant(rng, &mut cursor, age_ms, created);
        complaint.assign(Some(officer.clone()), Some(squad), "dispatcher", at)?;
        complaint.set_status(Status::InProgress, &officer, None, at)?;
        let progress = 10 + rng.next_u64_below(80) as u8;
        complaint.set_progress(progress, &officer, next_instant(rng, &mut cursor, age_ms, created))?;
        if target == Status::InProgress {
            return Ok(());
        }

        complaint.set_progress(100, &officer, next_instant(rng, &mut cursor, age_ms, created))?;
        let resolved_at = next_instant(rng, &mut cursor, age_ms, created);
        complaint.set_status(Status::Resolved, &officer, Some("work completed".into()), resolved_at)?;
        if target == Status::Closed {
            complaint.set_status(Status::Closed, "supervisor", None, next_instant(rng, &mut cursor, age_ms, created))?;
        }
        Ok(())
    }
}

/// Non-decreasing instants inside [created, created + age]; each call moves
/// the cursor at most halfway to the end.
fn next_instant(rng: &mut DeskRng, cursor: &mut u64, age_ms: u64, created: Timestamp) -> Timestamp {
    let remaining = age_ms - *cursor;
    if remaining > 0 {
        *cursor += rng.next_u64_below(remaining + 1) / 2;
    }
    created + Duration::milliseconds(*cursor as i64)
}

fn titles(category: Category) -> &'static [&'static str] {
    match category {
        Category::Sanitation  => &["Overflowing bins", "Missed garbage pickup", "Illegal dumping"],
        Category::Roads       => &["Pothole on main road", "Cracked pavement", "Road cave-in"],
        Category::Water       => &["Burst water main", "Low water pressure", "Contaminated supply"],
        Category::Electricity => &["Streetlight out", "Exposed wiring", "Repeated outages"],
        Category::Parks       => &["Broken playground swing", "Overgrown grass", "Fallen tree"],
        Category::Traffic     => &["Signal not working", "Missing stop sign", "Blocked junction"],
        Category::Other | Category::Unknown => &["General civic issue"],
    }
}
