//! Desk configuration: zone registry, escalation day thresholds and
//! density bands.
//!
//! Files under `data_dir`:
//!   zones/zones.json   — required, `{ "zones": [{ "id", "label" }] }`
//!   thresholds.json    — optional, falls back to the defaults below

use crate::error::{DeskError, DeskResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationThresholds {
    /// Days open above which a complaint turns yellow.
    pub yellow_after_days: i64,
    /// Days open above which a complaint turns red.
    pub red_after_days: i64,
}

impl Default for EscalationThresholds {
    fn default() -> Self {
        Self {
            yellow_after_days: 3,
            red_after_days: 7,
        }
    }
}

/// Inclusive upper bounds of the low/medium/high density bands.
/// Zero is always `none`; anything above `high_max` is `critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityBands {
    pub low_max: usize,
    pub medium_max: usize,
    pub high_max: usize,
}

impl Default for DensityBands {
    fn default() -> Self {
        Self {
            low_max: 2,
            medium_max: 5,
            high_max: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ZonesFile {
    zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ThresholdsFile {
    #[serde(default)]
    escalation: EscalationThresholds,
    #[serde(default)]
    density: DensityBands,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    pub escalation: EscalationThresholds,
    pub density: DensityBands,
    pub zones: Vec<ZoneConfig>,
}

impl DeskConfig {
    /// Load all config files from `data_dir`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let zones_path = format!("{data_dir}/zones/zones.json");
        let zones_content = std::fs::read_to_string(&zones_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {zones_path}: {e}"))?;
        let zones_file: ZonesFile = serde_json::from_str(&zones_content)?;

        let thresholds_path = format!("{data_dir}/thresholds.json");
        let thresholds = if Path::new(&thresholds_path).exists() {
            let content = std::fs::read_to_string(&thresholds_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {thresholds_path}: {e}"))?;
            serde_json::from_str::<ThresholdsFile>(&content)?
        } else {
            log::debug!("{thresholds_path} not found; using default thresholds");
            ThresholdsFile::default()
        };

        let config = Self {
            escalation: thresholds.escalation,
            density: thresholds.density,
            zones: zones_file.zones,
        };
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        let zone = |id: &str, label: &str| ZoneConfig {
            id: id.into(),
            label: label.into(),
        };
        Self {
            escalation: EscalationThresholds::default(),
            density: DensityBands::default(),
            zones: vec![
                zone("downtown", "Downtown"),
                zone("riverside", "Riverside"),
                zone("harbor", "Harbor District"),
                zone("hillcrest", "Hillcrest"),
                zone("northgate", "Northgate"),
            ],
        }
    }

    pub fn validate(&self) -> DeskResult<()> {
        let esc = &self.escalation;
        if esc.yellow_after_days < 0 || esc.red_after_days <= esc.yellow_after_days {
            return Err(invalid(format!(
                "escalation thresholds must satisfy 0 <= yellow < red (got {} / {})",
                esc.yellow_after_days, esc.red_after_days
            )));
        }

        let d = &self.density;
        if !(0 < d.low_max && d.low_max < d.medium_max && d.medium_max < d.high_max) {
            return Err(invalid(format!(
                "density bands must be strictly increasing and positive (got {} / {} / {})",
                d.low_max, d.medium_max, d.high_max
            )));
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            if zone.id.trim().is_empty() {
                return Err(invalid("zone id must not be empty".into()));
            }
            if !seen.insert(zone.id.to_lowercase()) {
                return Err(invalid(format!("duplicate zone id '{}'", zone.id)));
            }
        }
        Ok(())
    }
}

fn invalid(reason: String) -> DeskError {
    DeskError::InvalidConfig { reason }
}
