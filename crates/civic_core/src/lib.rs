//! Local-first state core for the civic resource tracker.
//! This crate is the single source of truth for document invariants.
//!
//! The presentation layer renders from [`StateStore::document`] and calls
//! back through [`StateStore::records`], [`StateStore::metrics`] and the
//! snapshot methods.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::alert::{Alert, AlertSeverity, NewAlert};
pub use model::document::{CommunityInfo, CommunityInfoPatch, Document, DocumentError};
pub use model::migration::{MigrationError, CURRENT_SCHEMA_VERSION};
pub use model::person::{HealthStatus, NewPerson, Person, PersonPatch};
pub use model::quantity::Quantity;
pub use model::resource::{NewResource, Resource, ResourcePatch, ResourceStatus, ResourceType};
pub use model::RecordId;
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository,
};
pub use service::metrics::{
    compute_metrics, compute_metrics_with, ColorBand, GreenBoundary, Metrics, ScorePolicy,
};
pub use service::record_service::{
    Alerts, ConfirmPrompt, DeleteOutcome, People, QuantityOutcome, QuantityStep, RecordRef,
    RecordService, Resources,
};
pub use service::snapshot::{export_snapshot, import_snapshot, Snapshot, SnapshotError};
pub use service::state_store::{
    read_document, BootstrapError, BootstrapSource, JsonFileBootstrap, LoadError, LoadOrigin,
    PersistError, StateStore, StorePhase,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
