use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum title length in characters
pub const TITLE_MAX_LEN: usize = 100;

/// Maximum description length in characters
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Enum value as sent by clients: the wire name or its ordinal
#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Name(String),
    Ordinal(u64),
}

impl WireValue {
    fn parse<T: FromStr<Err = String>>(self) -> Result<T, String> {
        match self {
            WireValue::Name(name) => name.parse(),
            WireValue::Ordinal(ordinal) => ordinal.to_string().parse(),
        }
    }
}

/// Incident severity enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Type, ToSchema)]
#[sqlx(type_name = "incident_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    pub const ALL: [IncidentSeverity; 4] = [
        IncidentSeverity::Low,
        IncidentSeverity::Medium,
        IncidentSeverity::High,
        IncidentSeverity::Critical,
    ];
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentSeverity::Low => write!(f, "low"),
            IncidentSeverity::Medium => write!(f, "medium"),
            IncidentSeverity::High => write!(f, "high"),
            IncidentSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Parses the wire name (any case) or the ordinal used by form clients (`0`..`3`)
impl FromStr for IncidentSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Ok(index) = value.parse::<usize>() {
            return Self::ALL
                .get(index)
                .copied()
                .ok_or_else(|| format!("Unknown severity '{}'", value));
        }

        Self::ALL
            .into_iter()
            .find(|severity| severity.to_string().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!(
                    "Unknown severity '{}'. Expected one of: low, medium, high, critical",
                    value
                )
            })
    }
}

impl<'de> Deserialize<'de> for IncidentSeverity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireValue::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Incident status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Type, ToSchema)]
#[sqlx(type_name = "incident_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
}

impl IncidentStatus {
    /// Status every incident starts in
    pub const INITIAL: IncidentStatus = IncidentStatus::Open;

    pub const ALL: [IncidentStatus; 3] = [
        IncidentStatus::Open,
        IncidentStatus::InProgress,
        IncidentStatus::Resolved,
    ];
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "open"),
            IncidentStatus::InProgress => write!(f, "in_progress"),
            IncidentStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Parses the wire name (any case, `new` as an alias of `open`) or the ordinal (`0`..`2`)
impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "new" | "0" => Ok(IncidentStatus::Open),
            "in_progress" | "inprogress" | "1" => Ok(IncidentStatus::InProgress),
            "resolved" | "2" => Ok(IncidentStatus::Resolved),
            other => Err(format!(
                "Unknown status '{}'. Expected one of: open, in_progress, resolved",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for IncidentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireValue::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Database model for incident
#[derive(Debug, Clone, FromRow)]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new incident
#[derive(Debug, Clone)]
pub struct CreateIncident {
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
}
