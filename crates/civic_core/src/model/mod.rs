//! Domain model for the persisted civic document.
//!
//! # Responsibility
//! - Define the single aggregate (`Document`) and its record collections.
//! - Keep wire naming compatible with documents written by earlier versions.
//!
//! # Invariants
//! - Record ids are unique within their collection and never reassigned.
//! - Unknown JSON fields survive a load/save cycle untouched.
//!
//! # See also
//! - `model::migration` for the schema upgrade chain.

pub mod alert;
pub mod document;
pub mod migration;
pub mod person;
pub mod quantity;
pub mod resource;

use serde::{Deserialize, Deserializer};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for resources, alerts and people.
///
/// Kept as a string: documents written before UUID ids carry clock-based
/// numeric strings, and those must keep resolving.
pub type RecordId = String;

/// Generates a fresh record id.
pub fn new_record_id() -> RecordId {
    Uuid::new_v4().to_string()
}

/// Current wall clock in Unix epoch milliseconds.
///
/// Returns `0` when the system clock reports a time before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Accepts either a JSON string or a JSON number and yields text.
///
/// Form inputs were stored as strings, hand-written bootstrap files often use
/// bare numbers for the same fields.
pub(crate) fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
        Float(f64),
        Null(()),
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::Str(value) => value,
        Text::Int(value) => value.to_string(),
        Text::Float(value) => value.to_string(),
        Text::Null(()) => String::new(),
    })
}
