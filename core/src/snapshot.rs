//! Snapshot loading — a complaint collection handed over by the store.
//!
//! A snapshot is a JSON array of complaint records. Records that cannot be
//! decoded at all (not an object, no id) are set aside with a reason; the
//! rest of the batch still loads.

use crate::{complaint::Complaint, error::DeskResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position in the source array.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintSnapshot {
    pub complaints: Vec<Complaint>,
    pub rejected: Vec<RejectedRecord>,
}

impl ComplaintSnapshot {
    pub fn from_json(json: &str) -> DeskResult<Self> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
        Ok(Self::from_values(raw))
    }

    pub fn from_values(raw: Vec<serde_json::Value>) -> Self {
        let mut snapshot = Self::default();
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<Complaint>(value) {
                Ok(complaint) => snapshot.complaints.push(complaint),
                Err(e) => {
                    log::warn!("snapshot record {index} rejected: {e}");
                    snapshot.rejected.push(RejectedRecord {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        snapshot
    }

    pub fn to_json(&self) -> DeskResult<String> {
        Ok(serde_json::to_string_pretty(&self.complaints)?)
    }
}
