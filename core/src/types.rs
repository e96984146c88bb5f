//! Shared primitive types used across the desk.

use chrono::{DateTime, Utc};

/// An instant in time. All stored timestamps are UTC.
pub type Timestamp = DateTime<Utc>;

/// A stable, opaque complaint identifier.
pub type ComplaintId = String;

/// A zone identifier from the zone registry.
pub type ZoneId = String;

/// A citizen or official identifier.
pub type UserId = String;
