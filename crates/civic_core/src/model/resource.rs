//! Resource inventory records.
//!
//! # Invariants
//! - `quantity` is free text; arithmetic only happens through `Quantity`.
//! - Status and type spellings are accepted case-insensitively and written
//!   back in canonical capitalized form. Unknown statuses are written back
//!   exactly as read.

use super::quantity::Quantity;
use super::{deserialize_lenient_text, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource category.
///
/// Unrecognized categories fold into `Other`, mirroring how the dashboard
/// treats them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ResourceType {
    Water,
    Food,
    Energy,
    Medical,
    Comms,
    #[default]
    Other,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "Water",
            Self::Food => "Food",
            Self::Energy => "Energy",
            Self::Medical => "Medical",
            Self::Comms => "Comms",
            Self::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "water" => Self::Water,
            "food" => Self::Food,
            "energy" => Self::Energy,
            "medical" => Self::Medical,
            "comms" => Self::Comms,
            _ => Self::Other,
        }
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ResourceType> for &'static str {
    fn from(value: ResourceType) -> Self {
        value.as_str()
    }
}

/// Stock health of one resource.
///
/// Spellings outside the known four are kept verbatim as `Unrecognized` and
/// never count as active. A record with no status at all reads as an empty
/// `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceStatus {
    Good,
    Adequate,
    Low,
    Critical,
    Unrecognized(String),
}

impl ResourceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Good => "Good",
            Self::Adequate => "Adequate",
            Self::Low => "Low",
            Self::Critical => "Critical",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Parses case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "good" => Self::Good,
            "adequate" => Self::Adequate,
            "low" => Self::Low,
            "critical" => Self::Critical,
            _ => Self::Unrecognized(value.to_string()),
        }
    }

    /// Whether the resource counts toward the active tally.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Good | Self::Adequate)
    }
}

impl Default for ResourceStatus {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for ResourceStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ResourceStatus> for String {
    fn from(value: ResourceStatus) -> Self {
        match value {
            ResourceStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One tracked supply item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(deserialize_with = "deserialize_lenient_text")]
    pub id: RecordId,
    /// Serialized as `type` to match stored documents.
    #[serde(rename = "type", default)]
    pub kind: ResourceType,
    #[serde(default)]
    pub location: String,
    /// `<number><optional unit suffix>`, e.g. `12 gal`.
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub quantity: String,
    #[serde(default)]
    pub status: ResourceStatus,
    /// Fields written by other versions; kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    /// Parsed view of `quantity`, or `None` when it does not lead with a number.
    pub fn parsed_quantity(&self) -> Option<Quantity> {
        Quantity::parse(&self.quantity)
    }
}

/// Input for creating a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResource {
    pub kind: ResourceType,
    pub location: String,
    pub quantity: String,
    pub status: ResourceStatus,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePatch {
    pub kind: Option<ResourceType>,
    pub location: Option<String>,
    pub quantity: Option<String>,
    pub status: Option<ResourceStatus>,
}

impl ResourcePatch {
    pub fn apply(self, resource: &mut Resource) {
        if let Some(kind) = self.kind {
            resource.kind = kind;
        }
        if let Some(location) = self.location {
            resource.location = location;
        }
        if let Some(quantity) = self.quantity {
            resource.quantity = quantity;
        }
        if let Some(status) = self.status {
            resource.status = status;
        }
    }
}
