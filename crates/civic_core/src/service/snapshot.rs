//! Snapshot export and import.
//!
//! # Responsibility
//! - Serialize the whole document into a portable, indented JSON file.
//! - Validate an uploaded snapshot and swap it in as the new document.
//!
//! # Invariants
//! - A rejected import leaves the current document and storage untouched.
//! - Importing an exported snapshot reproduces the same document.

use crate::model::document::{Document, DocumentError};
use crate::model::now_epoch_ms;
use crate::repo::kv_repo::KvRepository;
use crate::service::state_store::StateStore;
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Exported snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Suggested download name, e.g. `civic-backup-1700000000000.json`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub enum SnapshotError {
    /// Bytes are not UTF-8 JSON.
    InvalidJson(serde_json::Error),
    /// No `resources` field at the top level.
    MissingResources,
    /// `resources` exists but is not a list.
    MalformedResources,
    /// JSON parsed but does not describe a document.
    InvalidDocument(DocumentError),
    Serialize(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "invalid JSON file: {err}"),
            Self::MissingResources => write!(f, "invalid backup file: missing `resources`"),
            Self::MalformedResources => {
                write!(f, "invalid backup file: `resources` must be a list")
            }
            Self::InvalidDocument(err) => write!(f, "invalid backup file: {err}"),
            Self::Serialize(err) => write!(f, "snapshot serialization failed: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) | Self::Serialize(err) => Some(err),
            Self::InvalidDocument(err) => Some(err),
            Self::MissingResources | Self::MalformedResources => None,
        }
    }
}

/// Pretty-printed bytes of `doc`.
pub fn export_snapshot(doc: &Document) -> Result<Vec<u8>, SnapshotError> {
    doc.to_pretty_json()
        .map(String::into_bytes)
        .map_err(SnapshotError::Serialize)
}

/// Parses and validates snapshot bytes into a document.
///
/// Older snapshot shapes are upgraded the same way stored documents are.
pub fn import_snapshot(bytes: &[u8]) -> Result<Document, SnapshotError> {
    let value: Value = serde_json::from_slice(bytes).map_err(SnapshotError::InvalidJson)?;
    match value.get("resources") {
        None | Some(Value::Null) => return Err(SnapshotError::MissingResources),
        Some(Value::Array(_)) => {}
        Some(_) => return Err(SnapshotError::MalformedResources),
    }
    Document::from_value(value).map_err(SnapshotError::InvalidDocument)
}

impl<R: KvRepository> StateStore<R> {
    /// Exports the current document with a timestamped file name.
    pub fn export_snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let bytes = export_snapshot(self.document())?;
        let file_name = self.config().snapshot_file_name(now_epoch_ms());
        info!(
            "event=snapshot_export module=snapshot status=ok bytes={}",
            bytes.len()
        );
        Ok(Snapshot { file_name, bytes })
    }

    /// Replaces the current document with an uploaded snapshot.
    ///
    /// On error nothing changes; the caller is expected to show the error.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> Result<&Document, SnapshotError> {
        let document = match import_snapshot(bytes) {
            Ok(document) => document,
            Err(err) => {
                warn!("event=snapshot_import module=snapshot status=rejected error={err}");
                return Err(err);
            }
        };
        self.replace(document);
        info!("event=snapshot_import module=snapshot status=ok");
        Ok(self.document())
    }
}
