use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of clinical-study categories; each drives its own field schema
/// and eligibility logic on the evaluation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    Hypertension,
    Arthritis,
    Migraine,
    Phase1,
}

/// Display metadata attached to every trial type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

impl TrialType {
    pub const ALL: [TrialType; 4] = [
        TrialType::Hypertension,
        TrialType::Arthritis,
        TrialType::Migraine,
        TrialType::Phase1,
    ];

    /// Wire tag used in URLs, upload forms, and template file names.
    pub const fn tag(self) -> &'static str {
        match self {
            TrialType::Hypertension => "hypertension",
            TrialType::Arthritis => "arthritis",
            TrialType::Migraine => "migraine",
            TrialType::Phase1 => "phase1",
        }
    }

    /// Metadata lookup is exhaustive over the variant set, so a new trial
    /// type cannot be added without supplying its display metadata.
    pub const fn metadata(self) -> TrialMetadata {
        match self {
            TrialType::Hypertension => TrialMetadata {
                name: "Hypertension Trial",
                description: "Clinical trial for hypertension treatment and blood pressure management",
                icon: "heartbeat",
                color: "red",
            },
            TrialType::Arthritis => TrialMetadata {
                name: "Arthritis Trial",
                description: "Rheumatoid arthritis treatment study with new therapeutic approaches",
                icon: "bone",
                color: "orange",
            },
            TrialType::Migraine => TrialMetadata {
                name: "Migraine Trial",
                description: "Migraine prevention medication trial for chronic sufferers",
                icon: "brain",
                color: "purple",
            },
            TrialType::Phase1 => TrialMetadata {
                name: "Phase 1 Trial",
                description: "Phase 1 safety and dosage study for new investigational drugs",
                icon: "vial",
                color: "blue",
            },
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Raised when a tag does not name a known trial type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trial type: {0}")]
pub struct UnknownTrialType(pub String);

impl FromStr for TrialType {
    type Err = UnknownTrialType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hypertension" => Ok(TrialType::Hypertension),
            "arthritis" => Ok(TrialType::Arthritis),
            "migraine" => Ok(TrialType::Migraine),
            "phase1" => Ok(TrialType::Phase1),
            other => Err(UnknownTrialType(other.to_string())),
        }
    }
}
