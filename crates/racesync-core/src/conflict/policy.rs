//! Resolution policies

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Conflict;
use crate::models::Collection;
use crate::package::EntityCollections;

/// Which side of a conflict survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "existing")]
    KeepExisting,
    #[serde(rename = "incoming")]
    KeepIncoming,
}

/// Operator decisions keyed by [`Conflict::id`]
pub type ManualDecisions = HashMap<String, Decision>;

/// Decides each conflict independently
pub trait ResolutionPolicy: Send + Sync {
    fn decide(&self, conflict: &Conflict) -> Decision;
}

/// Keep whichever side is strictly later
#[derive(Debug, Clone, Copy, Default)]
pub struct Newer;

/// Keep whichever side is strictly earlier
#[derive(Debug, Clone, Copy, Default)]
pub struct Older;

/// Always keep the stored record
#[derive(Debug, Clone, Copy, Default)]
pub struct Skip;

/// Always take the incoming record
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptIncoming;

/// Follow operator decisions; anything not marked incoming keeps the stored record
#[derive(Debug, Clone, Default)]
pub struct Manual(pub ManualDecisions);

impl ResolutionPolicy for Newer {
    fn decide(&self, conflict: &Conflict) -> Decision {
        match (conflict.existing_time, conflict.incoming_time) {
            (Some(existing), Some(incoming)) if incoming > existing => Decision::KeepIncoming,
            _ => Decision::KeepExisting,
        }
    }
}

impl ResolutionPolicy for Older {
    fn decide(&self, conflict: &Conflict) -> Decision {
        match (conflict.existing_time, conflict.incoming_time) {
            (Some(existing), Some(incoming)) if incoming < existing => Decision::KeepIncoming,
            _ => Decision::KeepExisting,
        }
    }
}

impl ResolutionPolicy for Skip {
    fn decide(&self, _conflict: &Conflict) -> Decision {
        Decision::KeepExisting
    }
}

impl ResolutionPolicy for AcceptIncoming {
    fn decide(&self, _conflict: &Conflict) -> Decision {
        Decision::KeepIncoming
    }
}

impl ResolutionPolicy for Manual {
    fn decide(&self, conflict: &Conflict) -> Decision {
        match self.0.get(&conflict.id()) {
            Some(Decision::KeepIncoming) => Decision::KeepIncoming,
            _ => Decision::KeepExisting,
        }
    }
}

/// Named resolution strategy, as chosen by an operator or configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Newer,
    Older,
    #[default]
    Skip,
    Manual,
}

impl Strategy {
    pub const VALUES: [&'static str; 4] = ["newer", "older", "skip", "manual"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newer => "newer",
            Self::Older => "older",
            Self::Skip => "skip",
            Self::Manual => "manual",
        }
    }

    /// Build the policy; `decisions` is only read by [`Strategy::Manual`]
    #[must_use]
    pub fn policy(self, decisions: ManualDecisions) -> Box<dyn ResolutionPolicy> {
        match self {
            Self::Newer => Box::new(Newer),
            Self::Older => Box::new(Older),
            Self::Skip => Box::new(Skip),
            Self::Manual => Box::new(Manual(decisions)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newer" => Ok(Self::Newer),
            "older" => Ok(Self::Older),
            "skip" => Ok(Self::Skip),
            "manual" => Ok(Self::Manual),
            other => Err(format!(
                "unknown strategy '{other}', expected one of {}",
                Self::VALUES.join(", ")
            )),
        }
    }
}

/// Incoming data with the losing side of every conflict removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub data: EntityCollections,
    /// Conflicts where the stored record was kept
    pub kept_existing: usize,
    /// Conflicts where the incoming record replaces the stored one
    pub kept_incoming: usize,
}

/// Apply `policy` to every conflict, dropping incoming rows that lose
pub fn resolve(
    data: &EntityCollections,
    conflicts: &[Conflict],
    policy: &dyn ResolutionPolicy,
) -> Resolution {
    let mut resolved = data.clone();
    let mut dropped: HashMap<Collection, HashSet<&str>> = HashMap::new();
    let mut kept_incoming = 0;

    for conflict in conflicts {
        match policy.decide(conflict) {
            Decision::KeepIncoming => kept_incoming += 1,
            Decision::KeepExisting => {
                dropped
                    .entry(conflict.collection)
                    .or_default()
                    .insert(conflict.key.as_str());
            }
        }
    }

    let mut kept_existing = 0;
    for (collection, keys) in &dropped {
        kept_existing += keys.len();
        resolved.retain_keys(*collection, |key| !keys.contains(key));
    }

    debug!(kept_existing, kept_incoming, "Resolved import conflicts");
    Resolution {
        data: resolved,
        kept_existing,
        kept_incoming,
    }
}
