//! Owner of the single in-memory document.
//!
//! # Responsibility
//! - Load the document from storage, upgrading old shapes, or fall back to a
//!   bootstrap source or an empty document.
//! - Persist the full document after every mutation.
//!
//! # Invariants
//! - Exactly one `Document` per store; callers mutate it only through
//!   `RecordService` or `replace`.
//! - Persistence failures never propagate: the in-memory document stays
//!   authoritative and the failure is logged and kept for inspection.
//! - Only unparseable text is discarded. Readable JSON this binary cannot
//!   interpret (a newer schema, or records of an unexpected shape) is never
//!   overwritten; writes stay suspended until a snapshot import replaces it.

use crate::config::StoreConfig;
use crate::model::document::{Document, DocumentError};
use crate::model::migration::MigrationError;
use crate::repo::kv_repo::{KvRepository, RepoError};
use crate::service::metrics::{compute_metrics_with, Metrics};
use crate::service::record_service::RecordService;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Lifecycle of the store after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    /// Document loaded; nothing written since.
    Loaded,
    /// In-memory document differs from what storage holds.
    Dirty,
    /// Last write reached storage.
    Persisted,
}

/// Where the in-memory document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Persisted,
    Bootstrap,
    /// Nothing stored and no usable bootstrap.
    Fresh,
    /// Stored text was unparseable and has been replaced.
    RecoveredFromCorruption,
    /// Storage could not be read.
    StorageUnavailable,
    /// Stored document is newer than this binary; left untouched on disk.
    NewerSchema,
    /// Stored value is JSON but not a document this binary can decode; left
    /// untouched on disk.
    Unreadable,
}

impl LoadOrigin {
    /// Whether storage holds a value that must not be overwritten.
    pub fn protects_storage(self) -> bool {
        matches!(self, Self::NewerSchema | Self::Unreadable)
    }
}

/// Why the persisted document could not be used.
#[derive(Debug)]
pub enum LoadError {
    Missing,
    Storage(RepoError),
    /// Stored text is not JSON.
    Corrupt(DocumentError),
    /// Stored text is JSON but does not decode into a document.
    Unreadable(DocumentError),
    UnsupportedSchemaVersion {
        document_version: u32,
        latest_supported: u32,
    },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no document persisted"),
            Self::Storage(err) => write!(f, "storage read failed: {err}"),
            Self::Corrupt(err) => write!(f, "persisted document is corrupt: {err}"),
            Self::Unreadable(err) => write!(f, "persisted document is unreadable: {err}"),
            Self::UnsupportedSchemaVersion {
                document_version,
                latest_supported,
            } => write!(
                f,
                "persisted document version {document_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Corrupt(err) | Self::Unreadable(err) => Some(err),
            Self::Missing | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<DocumentError> for LoadError {
    fn from(value: DocumentError) -> Self {
        match value {
            DocumentError::Migration(MigrationError::UnsupportedSchemaVersion {
                document_version,
                latest_supported,
            }) => Self::UnsupportedSchemaVersion {
                document_version,
                latest_supported,
            },
            other if other.is_syntax() => Self::Corrupt(other),
            other => Self::Unreadable(other),
        }
    }
}

/// Why a save did not reach storage.
#[derive(Debug)]
pub enum PersistError {
    Serialize(serde_json::Error),
    Repo(RepoError),
    /// Storage holds a document this binary must not overwrite.
    StorageProtected(LoadOrigin),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "document serialization failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::StorageProtected(origin) => write!(
                f,
                "stored document left untouched ({origin:?}); import a snapshot to resume saving"
            ),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::StorageProtected(_) => None,
        }
    }
}

/// Optional seed consulted when nothing has been persisted yet.
///
/// Produces a partial document as JSON text; missing collections are filled
/// in by the migration chain.
pub trait BootstrapSource {
    fn fetch(&self) -> Result<String, BootstrapError>;
}

#[derive(Debug)]
pub enum BootstrapError {
    Io { path: PathBuf, source: std::io::Error },
    Unavailable(String),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "bootstrap file `{}` unreadable: {source}", path.display())
            }
            Self::Unavailable(reason) => write!(f, "bootstrap unavailable: {reason}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Unavailable(_) => None,
        }
    }
}

/// Bootstrap document read from a static JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBootstrap {
    path: PathBuf,
}

impl JsonFileBootstrap {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BootstrapSource for JsonFileBootstrap {
    fn fetch(&self) -> Result<String, BootstrapError> {
        std::fs::read_to_string(&self.path).map_err(|source| BootstrapError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Reads and upgrades the persisted document without any fallback.
pub fn read_document<R: KvRepository + ?Sized>(repo: &R, key: &str) -> Result<Document, LoadError> {
    let text = repo
        .get(key)
        .map_err(LoadError::Storage)?
        .ok_or(LoadError::Missing)?;
    Ok(Document::from_json_str(&text)?)
}

/// Holder of the document and its storage.
pub struct StateStore<R: KvRepository> {
    repo: R,
    config: StoreConfig,
    document: Document,
    phase: StorePhase,
    origin: LoadOrigin,
    storage_protected: bool,
    last_persist_error: Option<PersistError>,
}

impl<R: KvRepository> StateStore<R> {
    /// Loads the persisted document, falling back to an empty one.
    pub fn load(repo: R, config: StoreConfig) -> Self {
        Self::load_with_bootstrap(repo, config, None)
    }

    /// Loads the persisted document; when nothing is persisted, seeds from
    /// `bootstrap` before falling back to an empty document.
    ///
    /// # Side effects
    /// - Fallback documents are written immediately, unless storage holds a
    ///   value that must be kept (`NewerSchema`, `Unreadable`).
    /// - Emits one `state_load` event describing the outcome.
    pub fn load_with_bootstrap(
        repo: R,
        config: StoreConfig,
        bootstrap: Option<&dyn BootstrapSource>,
    ) -> Self {
        let (document, origin) = match read_document(&repo, &config.storage_key) {
            Ok(document) => {
                info!(
                    "event=state_load module=state status=ok origin=persisted resources={} alerts={} people={}",
                    document.resources.len(),
                    document.alerts.len(),
                    document.people.len()
                );
                (document, LoadOrigin::Persisted)
            }
            Err(LoadError::Missing) => match bootstrap.map(seed_from_bootstrap) {
                Some(Some(document)) => {
                    info!("event=state_load module=state status=fallback origin=bootstrap");
                    (document, LoadOrigin::Bootstrap)
                }
                _ => {
                    info!("event=state_load module=state status=fallback origin=fresh");
                    (Document::empty(), LoadOrigin::Fresh)
                }
            },
            Err(err @ LoadError::Corrupt(_)) => {
                error!(
                    "event=state_load module=state status=fallback origin=recovered error={err}"
                );
                (Document::empty(), LoadOrigin::RecoveredFromCorruption)
            }
            Err(err @ LoadError::Storage(_)) => {
                error!(
                    "event=state_load module=state status=fallback origin=storage_unavailable error={err}"
                );
                (Document::empty(), LoadOrigin::StorageUnavailable)
            }
            Err(err @ LoadError::UnsupportedSchemaVersion { .. }) => {
                error!("event=state_load module=state status=fallback origin=newer_schema error={err}");
                (Document::empty(), LoadOrigin::NewerSchema)
            }
            Err(err @ LoadError::Unreadable(_)) => {
                error!("event=state_load module=state status=fallback origin=unreadable error={err}");
                (Document::empty(), LoadOrigin::Unreadable)
            }
        };

        let mut store = Self {
            repo,
            config,
            document,
            phase: StorePhase::Loaded,
            origin,
            storage_protected: origin.protects_storage(),
            last_persist_error: None,
        };

        if origin != LoadOrigin::Persisted && !store.storage_protected {
            store.phase = StorePhase::Dirty;
            store.save();
        }
        store
    }

    /// Current document, for rendering.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn phase(&self) -> StorePhase {
        self.phase
    }

    pub fn load_origin(&self) -> LoadOrigin {
        self.origin
    }

    /// Whether saves are suspended to keep an unreadable stored document.
    pub fn is_storage_protected(&self) -> bool {
        self.storage_protected
    }

    /// Error from the most recent failed save, cleared by the next success.
    pub fn last_persist_error(&self) -> Option<&PersistError> {
        self.last_persist_error.as_ref()
    }

    /// Metrics for the current document under the configured policy.
    pub fn metrics(&self) -> Metrics {
        compute_metrics_with(&self.document, &self.config.score_policy)
    }

    /// Record operations bound to this store.
    pub fn records(&mut self) -> RecordService<'_, R> {
        RecordService::new(self)
    }

    /// Writes the full document under the configured key.
    ///
    /// Returns whether the write reached storage. Failures are logged and
    /// kept in [`StateStore::last_persist_error`]; they never propagate.
    pub fn save(&mut self) -> bool {
        match self.try_save() {
            Ok(bytes) => {
                info!("event=state_save module=state status=ok bytes={bytes}");
                self.phase = StorePhase::Persisted;
                self.last_persist_error = None;
                true
            }
            Err(err) => {
                error!("event=state_save module=state status=error error={err}");
                self.phase = StorePhase::Dirty;
                self.last_persist_error = Some(err);
                false
            }
        }
    }

    /// Swaps in a whole new document (snapshot import) and persists it.
    ///
    /// `lastUpdated` is kept as supplied. Dependent views are expected to
    /// re-render from scratch afterwards. An explicit replace is the one
    /// write allowed over a protected stored document.
    pub fn replace(&mut self, document: Document) -> bool {
        if self.storage_protected {
            warn!(
                "event=state_replace module=state status=unprotect origin={:?}",
                self.origin
            );
            self.storage_protected = false;
        }
        info!(
            "event=state_replace module=state status=start resources={} alerts={} people={}",
            document.resources.len(),
            document.alerts.len(),
            document.people.len()
        );
        self.document = document;
        self.phase = StorePhase::Dirty;
        self.save()
    }

    /// Runs one mutation. `None` from `op` means nothing changed, so nothing
    /// is written; otherwise `lastUpdated` is refreshed and the document saved.
    pub(crate) fn mutate<T>(
        &mut self,
        op: &'static str,
        apply: impl FnOnce(&mut Document) -> Option<T>,
    ) -> Option<T> {
        let outcome = apply(&mut self.document)?;
        self.document.touch();
        self.phase = StorePhase::Dirty;
        info!("event=record_mutation module=records op={op} status=ok");
        self.save();
        Some(outcome)
    }

    fn try_save(&self) -> Result<usize, PersistError> {
        if self.storage_protected {
            return Err(PersistError::StorageProtected(self.origin));
        }
        let text = self
            .document
            .to_json_string()
            .map_err(PersistError::Serialize)?;
        self.repo
            .set(&self.config.storage_key, &text)
            .map_err(PersistError::Repo)?;
        Ok(text.len())
    }
}

fn seed_from_bootstrap(source: &dyn BootstrapSource) -> Option<Document> {
    let text = match source.fetch() {
        Ok(text) => text,
        Err(err) => {
            warn!("event=bootstrap_fetch module=state status=error error={err}");
            return None;
        }
    };
    match Document::from_json_str(&text) {
        Ok(document) => Some(document),
        Err(err) => {
            warn!("event=bootstrap_parse module=state status=error error={err}");
            None
        }
    }
}
