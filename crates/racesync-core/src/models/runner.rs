//! Runner models: roster entries and per-checkpoint runner rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::collection::composite_key;
use super::{Collection, Entity};

/// Progress status of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerStatus {
    #[default]
    NotStarted,
    Passed,
    Dnf,
    NonStarter,
    Withdrawn,
    VetOut,
}

impl RunnerStatus {
    /// Every accepted wire value
    pub const VALUES: [&'static str; 6] = [
        "not-started",
        "passed",
        "dnf",
        "non-starter",
        "withdrawn",
        "vet-out",
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Passed => "passed",
            Self::Dnf => "dnf",
            Self::NonStarter => "non-starter",
            Self::Withdrawn => "withdrawn",
            Self::VetOut => "vet-out",
        }
    }
}

/// A runner on the race roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runner {
    pub id: i64,
    pub race_id: i64,
    /// Bib number
    pub number: u32,
    pub status: RunnerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this station does not model, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Runner {
    #[must_use]
    pub fn new(id: i64, race_id: i64, number: u32) -> Self {
        Self {
            id,
            race_id,
            number,
            status: RunnerStatus::NotStarted,
            first_name: None,
            last_name: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl Entity for Runner {
    const COLLECTION: Collection = Collection::Runners;

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn race_id(&self) -> i64 {
        self.race_id
    }
}

/// A runner as recorded at one checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRunner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub race_id: i64,
    pub checkpoint_number: u32,
    /// Bib number
    pub number: u32,
    pub status: RunnerStatus,
    /// Time of day the runner was marked off (`HH:MM`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_off_time: Option<String>,
    /// Time of day the runner was called in to base (`HH:MM`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_in_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this station does not model, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckpointRunner {
    #[must_use]
    pub fn new(race_id: i64, checkpoint_number: u32, number: u32) -> Self {
        Self {
            id: None,
            race_id,
            checkpoint_number,
            number,
            status: RunnerStatus::NotStarted,
            mark_off_time: None,
            call_in_time: None,
            notes: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl Entity for CheckpointRunner {
    const COLLECTION: Collection = Collection::CheckpointRunners;

    fn key(&self) -> String {
        composite_key(
            self.race_id,
            i64::from(self.checkpoint_number),
            i64::from(self.number),
        )
    }

    fn race_id(&self) -> i64 {
        self.race_id
    }
}

/// A runner as recorded by the base station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseStationRunner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub race_id: i64,
    pub checkpoint_number: u32,
    /// Bib number
    pub number: u32,
    pub status: RunnerStatus,
    /// Time bucket label the runner was grouped under (`HH:MM`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_time_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this station does not model, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for BaseStationRunner {
    const COLLECTION: Collection = Collection::BaseStationRunners;

    fn key(&self) -> String {
        composite_key(
            self.race_id,
            i64::from(self.checkpoint_number),
            i64::from(self.number),
        )
    }

    fn race_id(&self) -> i64 {
        self.race_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_values() {
        for (status, expected) in [
            (RunnerStatus::NotStarted, "not-started"),
            (RunnerStatus::Dnf, "dnf"),
            (RunnerStatus::NonStarter, "non-starter"),
            (RunnerStatus::VetOut, "vet-out"),
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), json!(expected));
            assert_eq!(status.as_str(), expected);
        }
        assert!(RunnerStatus::VALUES.contains(&RunnerStatus::Withdrawn.as_str()));
    }

    #[test]
    fn test_checkpoint_runner_key_matches_raw_key() {
        let mut row = CheckpointRunner::new(7, 3, 215);
        row.status = RunnerStatus::Passed;
        row.mark_off_time = Some("10:42".to_string());

        let raw = serde_json::to_value(&row).unwrap();
        assert_eq!(Collection::CheckpointRunners.key_of(&raw), Some(row.key()));
        assert_eq!(raw["markOffTime"], json!("10:42"));
        assert!(raw.get("id").is_none());
    }
}
