//! Document schema migration registry and executor.
//!
//! # Responsibility
//! - Upgrade raw JSON written by any earlier version to the current shape.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Every step is pure and total over any subset of fields being present.
//! - Steps only add: existing fields, known or not, are never removed.
//! - Applied version is mirrored to the `schemaVersion` field.
//! - Record ids are unique strings after every call, whatever the input
//!   version claims.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use super::document::DEFAULT_COMMUNITY_NAME;

/// Schema version written by this binary.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

const SCHEMA_VERSION_FIELD: &str = "schemaVersion";
const RECORD_COLLECTIONS: &[&str] = &["resources", "alerts", "people"];

type MigrationStep = fn(Map<String, Value>) -> Map<String, Value>;

#[derive(Clone, Copy)]
struct Migration {
    version: u32,
    apply: MigrationStep,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        apply: migrate_v0_to_v1,
    },
    Migration {
        version: 2,
        apply: migrate_v1_to_v2,
    },
    Migration {
        version: 3,
        apply: migrate_v2_to_v3,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// Top-level JSON value is not an object.
    NotAnObject,
    /// Document was written by a newer binary.
    UnsupportedSchemaVersion {
        document_version: u32,
        latest_supported: u32,
    },
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "document root must be a JSON object"),
            Self::UnsupportedSchemaVersion {
                document_version,
                latest_supported,
            } => write!(
                f,
                "document schema version {document_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for MigrationError {}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads `schemaVersion`; absent or non-numeric means an unversioned (v0)
/// document.
pub fn schema_version_of(value: &Value) -> u32 {
    value
        .get(SCHEMA_VERSION_FIELD)
        .and_then(Value::as_u64)
        .and_then(|version| u32::try_from(version).ok())
        .unwrap_or(0)
}

/// Applies every pending step to `value`.
pub fn migrate_to_current(value: Value) -> Result<Value, MigrationError> {
    let current_version = schema_version_of(&value);
    let latest = latest_version();

    if current_version > latest {
        return Err(MigrationError::UnsupportedSchemaVersion {
            document_version: current_version,
            latest_supported: latest,
        });
    }

    let Value::Object(mut object) = value else {
        return Err(MigrationError::NotAnObject);
    };

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        object = (migration.apply)(object);
        object.insert(
            SCHEMA_VERSION_FIELD.to_string(),
            Value::from(migration.version),
        );
    }

    // Current-version input may still come from an edited or merged file.
    Ok(Value::Object(normalize_record_ids(object)))
}

/// v0 -> v1: collections and `lastUpdated` exist.
///
/// Early bootstrap files carried only `resources` and `alerts`, sometimes
/// neither.
pub fn migrate_v0_to_v1(mut doc: Map<String, Value>) -> Map<String, Value> {
    for field in ["resources", "alerts"] {
        insert_if_absent(&mut doc, field, Value::Array(Vec::new()));
    }
    insert_if_absent(&mut doc, "lastUpdated", Value::from(0));
    doc
}

/// v1 -> v2: `communityInfo` object and `people` collection exist.
///
/// The legacy flat `communityName` seeds `communityInfo.name` and is kept.
pub fn migrate_v1_to_v2(mut doc: Map<String, Value>) -> Map<String, Value> {
    let legacy_name = doc
        .get("communityName")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_COMMUNITY_NAME)
        .to_string();

    insert_if_absent(&mut doc, "communityInfo", Value::Object(Map::new()));
    if let Some(Value::Object(info)) = doc.get_mut("communityInfo") {
        insert_if_absent(info, "name", Value::String(legacy_name));
        insert_if_absent(info, "captain", Value::String(String::new()));
        insert_if_absent(info, "location", Value::String(String::new()));
    }

    insert_if_absent(&mut doc, "people", Value::Array(Vec::new()));
    doc
}

/// v2 -> v3: every record carries a unique string id.
pub fn migrate_v2_to_v3(doc: Map<String, Value>) -> Map<String, Value> {
    normalize_record_ids(doc)
}

/// Makes every record id a unique, non-empty string. Idempotent.
///
/// Numeric ids become their decimal text. Missing, empty or duplicate ids
/// (two records created in the same clock tick) get a positional id derived
/// from the collection name, so the pass stays deterministic.
pub fn normalize_record_ids(mut doc: Map<String, Value>) -> Map<String, Value> {
    for collection in RECORD_COLLECTIONS {
        let Some(Value::Array(records)) = doc.get_mut(*collection) else {
            continue;
        };

        let mut seen = HashSet::new();
        for (index, record) in records.iter_mut().enumerate() {
            let Value::Object(fields) = record else {
                continue;
            };

            let existing = match fields.get("id") {
                Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
                Some(Value::Number(number)) => Some(number.to_string()),
                _ => None,
            };

            let id = match existing {
                Some(id) if !seen.contains(&id) => id,
                _ => positional_id(collection, index, &seen),
            };
            seen.insert(id.clone());
            fields.insert("id".to_string(), Value::String(id));
        }
    }
    doc
}

fn positional_id(collection: &str, index: usize, taken: &HashSet<String>) -> String {
    let base = format!("{collection}-{index}");
    if !taken.contains(&base) {
        return base;
    }
    let mut attempt = 1usize;
    loop {
        let candidate = format!("{base}-{attempt}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        attempt += 1;
    }
}

fn insert_if_absent(map: &mut Map<String, Value>, key: &str, default: Value) {
    match map.get(key) {
        Some(Value::Null) | None => {
            map.insert(key.to_string(), default);
        }
        Some(_) => {}
    }
}
