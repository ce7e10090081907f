//! Broadcast alerts shown on the dashboard.
//!
//! Alerts are append-only from the user's point of view: created, then
//! dismissed. They are never edited in place.

use super::{deserialize_lenient_text, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Alert urgency. Unknown spellings are kept verbatim; a missing severity
/// reads as `Info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertSeverity {
    Critical,
    Warning,
    #[default]
    Info,
    Unrecognized(String),
}

impl AlertSeverity {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "Critical",
            Self::Warning => "Warning",
            Self::Info => "Info",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Parses case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "warning" => Self::Warning,
            "info" => Self::Info,
            _ => Self::Unrecognized(value.to_string()),
        }
    }
}

impl From<String> for AlertSeverity {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<AlertSeverity> for String {
    fn from(value: AlertSeverity) -> Self {
        match value {
            AlertSeverity::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One alert entry. Collections keep alerts newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub id: RecordId,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: AlertSeverity,
    /// Unix epoch milliseconds at creation.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input for raising an alert. Id and timestamp are assigned on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub message: String,
    pub severity: AlertSeverity,
}
