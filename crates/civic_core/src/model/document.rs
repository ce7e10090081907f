//! The persisted aggregate.
//!
//! # Responsibility
//! - Hold community metadata plus the three record collections.
//! - Convert between raw JSON and the typed shape, upgrading old shapes first.
//!
//! # Invariants
//! - `resources` keeps insertion order; `alerts` keeps newest first.
//! - Parsing always runs the migration chain before typed decoding.

use super::alert::Alert;
use super::migration::{migrate_to_current, MigrationError, CURRENT_SCHEMA_VERSION};
use super::person::Person;
use super::resource::Resource;
use super::now_epoch_ms;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Community name used when neither `communityInfo` nor a legacy
/// `communityName` is present.
pub const DEFAULT_COMMUNITY_NAME: &str = "My Community";

/// Singleton community metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub captain: String,
    #[serde(default)]
    pub location: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CommunityInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_COMMUNITY_NAME.to_string(),
            captain: String::new(),
            location: String::new(),
            extra: Map::new(),
        }
    }
}

/// Partial update of the community record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityInfoPatch {
    pub name: Option<String>,
    pub captain: Option<String>,
    pub location: Option<String>,
}

impl CommunityInfoPatch {
    pub fn apply(self, info: &mut CommunityInfo) {
        if let Some(name) = self.name {
            info.name = name;
        }
        if let Some(captain) = self.captain {
            info.captain = captain;
        }
        if let Some(location) = self.location {
            info.location = location;
        }
    }
}

/// The whole application state as persisted under one storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub community_info: CommunityInfo,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub people: Vec<Person>,
    /// Advisory Unix epoch milliseconds of the last mutation.
    #[serde(default)]
    pub last_updated: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Fresh document with default community info and empty collections.
    pub fn empty() -> Self {
        Self::empty_at(now_epoch_ms())
    }

    /// Same as [`Document::empty`] with a caller-provided timestamp.
    pub fn empty_at(last_updated: i64) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            community_info: CommunityInfo::default(),
            resources: Vec::new(),
            alerts: Vec::new(),
            people: Vec::new(),
            last_updated,
            extra: Map::new(),
        }
    }

    /// Upgrades `value` to the current shape, then decodes it.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let migrated = migrate_to_current(value)?;
        serde_json::from_value(migrated).map_err(DocumentError::Decode)
    }

    /// Parses JSON text, upgrading old shapes.
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(text).map_err(DocumentError::Syntax)?;
        Self::from_value(value)
    }

    /// Compact JSON used for storage writes.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented JSON used for snapshot files.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn touch(&mut self) {
        self.last_updated = now_epoch_ms();
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// Failure turning raw JSON into a typed `Document`.
#[derive(Debug)]
pub enum DocumentError {
    /// Text is not JSON at all.
    Syntax(serde_json::Error),
    /// Valid JSON that does not fit the record shapes.
    Decode(serde_json::Error),
    /// Schema upgrade refused the input.
    Migration(MigrationError),
}

impl DocumentError {
    /// Whether the input was unparseable text, as opposed to readable JSON
    /// this binary cannot interpret.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(err) => write!(f, "invalid JSON: {err}"),
            Self::Decode(err) => write!(f, "unexpected document shape: {err}"),
            Self::Migration(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Syntax(err) | Self::Decode(err) => Some(err),
            Self::Migration(err) => Some(err),
        }
    }
}

impl From<MigrationError> for DocumentError {
    fn from(value: MigrationError) -> Self {
        Self::Migration(value)
    }
}
