use civic_core::db::open_db;
use civic_core::{
    read_document, BootstrapError, BootstrapSource, Document, JsonFileBootstrap, KvRepository,
    LoadError, LoadOrigin, MemoryKvRepository, NewResource, PersistError, RepoError,
    HealthStatus, ResourceStatus, ResourceType, SqliteKvRepository, StateStore, StoreConfig,
    StorePhase, CURRENT_SCHEMA_VERSION,
};
use serde_json::{json, Value};

const KEY: &str = "civicData";

struct FailingBootstrap;

impl BootstrapSource for FailingBootstrap {
    fn fetch(&self) -> Result<String, BootstrapError> {
        Err(BootstrapError::Unavailable("offline".to_string()))
    }
}

struct StaticBootstrap(&'static str);

impl BootstrapSource for StaticBootstrap {
    fn fetch(&self) -> Result<String, BootstrapError> {
        Ok(self.0.to_string())
    }
}

fn stored_json(repo: &MemoryKvRepository) -> Value {
    let text = repo.get(KEY).unwrap().expect("document should be stored");
    serde_json::from_str(&text).unwrap()
}

fn water(quantity: &str) -> NewResource {
    NewResource {
        kind: ResourceType::Water,
        location: "Shed".to_string(),
        quantity: quantity.to_string(),
        status: ResourceStatus::Good,
    }
}

#[test]
fn empty_storage_initializes_and_persists_fresh_document() {
    let repo = MemoryKvRepository::new();
    let store = StateStore::load(&repo, StoreConfig::default());

    assert_eq!(store.load_origin(), LoadOrigin::Fresh);
    assert_eq!(store.phase(), StorePhase::Persisted);
    assert_eq!(store.document().community_info.name, "My Community");
    assert!(store.document().resources.is_empty());
    assert!(store.document().last_updated > 0);

    let stored = stored_json(&repo);
    assert_eq!(stored["schemaVersion"], CURRENT_SCHEMA_VERSION);
    assert_eq!(stored["people"], json!([]));
}

#[test]
fn corrupt_storage_is_replaced_with_empty_document() {
    let repo = MemoryKvRepository::seeded(KEY, "{not json");
    let store = StateStore::load(&repo, StoreConfig::default());

    assert_eq!(store.load_origin(), LoadOrigin::RecoveredFromCorruption);
    assert!(store.document().resources.is_empty());
    assert_eq!(stored_json(&repo)["resources"], json!([]));
}

#[test]
fn legacy_document_is_upgraded_without_losing_fields() {
    let legacy = json!({
        "communityName": "Elm Street",
        "resources": [
            { "id": "1700000000001", "type": "water", "location": "Tank", "quantity": "2 gal", "status": "good" }
        ],
        "alerts": [],
        "skills": ["radio"],
        "lastUpdated": 1700000000000_i64
    });
    let repo = MemoryKvRepository::seeded(KEY, &legacy.to_string());
    let mut store = StateStore::load(&repo, StoreConfig::default());

    assert_eq!(store.load_origin(), LoadOrigin::Persisted);
    assert_eq!(store.phase(), StorePhase::Loaded);
    let doc = store.document();
    assert_eq!(doc.community_info.name, "Elm Street");
    assert!(doc.people.is_empty());
    assert_eq!(doc.resources[0].kind, ResourceType::Water);
    assert_eq!(doc.resources[0].status, ResourceStatus::Good);
    assert_eq!(doc.extra["skills"], json!(["radio"]));

    assert!(store.save());
    let stored = stored_json(&repo);
    assert_eq!(stored["schemaVersion"], CURRENT_SCHEMA_VERSION);
    assert_eq!(stored["communityName"], "Elm Street");
    assert_eq!(stored["communityInfo"]["name"], "Elm Street");
    assert_eq!(stored["skills"], json!(["radio"]));
    assert_eq!(stored["resources"][0]["id"], "1700000000001");
}

#[test]
fn newer_document_is_left_untouched_in_storage() {
    let future = r#"{"schemaVersion":99,"resources":[],"hologram":true}"#;
    let repo = MemoryKvRepository::seeded(KEY, future);
    let store = StateStore::load(&repo, StoreConfig::default());

    assert_eq!(store.load_origin(), LoadOrigin::NewerSchema);
    assert_eq!(store.phase(), StorePhase::Loaded);
    assert!(store.document().resources.is_empty());
    assert_eq!(repo.get(KEY).unwrap().as_deref(), Some(future));
}

#[test]
fn readable_legacy_records_with_missing_fields_are_kept() {
    let legacy = json!({
        "communityName": "Elm",
        "resources": [
            { "id": "1", "type": "Water", "location": "Tank", "quantity": "2 gal", "status": "Good" },
            { "id": "3", "type": "Food", "location": "Barn", "quantity": "4 sacks" }
        ],
        "alerts": [{ "id": "4", "message": "Check in" }],
        "people": [{ "id": "2", "name": "Ann", "skill": "nurse" }]
    });
    let repo = MemoryKvRepository::seeded(KEY, &legacy.to_string());
    let mut store = StateStore::load(&repo, StoreConfig::default());

    assert_eq!(store.load_origin(), LoadOrigin::Persisted);
    assert_eq!(repo.get(KEY).unwrap(), Some(legacy.to_string()));
    let doc = store.document();
    assert_eq!(doc.community_info.name, "Elm");
    assert_eq!(doc.resources.len(), 2);
    assert_eq!(doc.people[0].health, HealthStatus::Healthy);

    let metrics = store.metrics();
    assert_eq!(metrics.living_count, 1);
    assert_eq!(metrics.medics_count, 1);
    assert_eq!(metrics.active_resource_count, 1);

    assert!(store.save());
    let stored = stored_json(&repo);
    assert_eq!(stored["people"][0]["name"], "Ann");
    assert_eq!(stored["resources"][1]["quantity"], "4 sacks");
    assert_eq!(stored["communityInfo"]["name"], "Elm");
}

#[test]
fn undecodable_document_is_never_overwritten() {
    let odd = r#"{"communityName":"Elm","resources":[5],"alerts":[]}"#;
    let repo = MemoryKvRepository::seeded(KEY, odd);
    let mut store = StateStore::load(&repo, StoreConfig::default());

    assert_eq!(store.load_origin(), LoadOrigin::Unreadable);
    assert!(store.is_storage_protected());
    assert!(store.document().resources.is_empty());

    store.records().create_resource(water("1 L"));
    assert_eq!(store.document().resources.len(), 1);
    assert_eq!(store.phase(), StorePhase::Dirty);
    assert!(matches!(
        store.last_persist_error(),
        Some(PersistError::StorageProtected(LoadOrigin::Unreadable))
    ));
    assert!(!store.save());
    assert_eq!(repo.get(KEY).unwrap().as_deref(), Some(odd));
}

#[test]
fn replace_lifts_storage_protection() {
    let future = r#"{"schemaVersion":99,"resources":[]}"#;
    let repo = MemoryKvRepository::seeded(KEY, future);
    let mut store = StateStore::load(&repo, StoreConfig::default());
    assert!(store.is_storage_protected());

    store.records().create_resource(water("1 L"));
    assert_eq!(repo.get(KEY).unwrap().as_deref(), Some(future));

    assert!(store.replace(Document::empty_at(9)));
    assert!(!store.is_storage_protected());
    assert_eq!(store.phase(), StorePhase::Persisted);
    assert_eq!(stored_json(&repo)["lastUpdated"], 9);
}

#[test]
fn read_document_distinguishes_failure_kinds() {
    let empty = MemoryKvRepository::new();
    assert!(matches!(read_document(&empty, KEY), Err(LoadError::Missing)));

    let corrupt = MemoryKvRepository::seeded(KEY, "[1,2");
    assert!(matches!(read_document(&corrupt, KEY), Err(LoadError::Corrupt(_))));

    let not_object = MemoryKvRepository::seeded(KEY, "[1,2]");
    assert!(matches!(read_document(&not_object, KEY), Err(LoadError::Unreadable(_))));

    let bad_record = MemoryKvRepository::seeded(KEY, r#"{"resources":[5]}"#);
    assert!(matches!(read_document(&bad_record, KEY), Err(LoadError::Unreadable(_))));

    let future = MemoryKvRepository::seeded(KEY, r#"{"schemaVersion":7}"#);
    assert!(matches!(
        read_document(&future, KEY),
        Err(LoadError::UnsupportedSchemaVersion {
            document_version: 7,
            ..
        })
    ));
}

#[test]
fn quota_failure_keeps_memory_authoritative() {
    let repo = MemoryKvRepository::with_quota(Some(400));
    let mut store = StateStore::load(&repo, StoreConfig::default());
    assert_eq!(store.phase(), StorePhase::Persisted);
    let before = repo.get(KEY).unwrap();

    let id = store.records().create_resource(NewResource {
        location: "x".repeat(1_000),
        ..water("5 L")
    });

    assert_eq!(store.document().resources.len(), 1);
    assert_eq!(store.document().resources[0].id, id);
    assert_eq!(store.phase(), StorePhase::Dirty);
    assert!(matches!(
        store.last_persist_error(),
        Some(PersistError::Repo(RepoError::QuotaExceeded { .. }))
    ));
    assert_eq!(repo.get(KEY).unwrap(), before);
}

#[test]
fn successful_save_clears_previous_persist_error() {
    let repo = MemoryKvRepository::with_quota(Some(400));
    let mut store = StateStore::load(&repo, StoreConfig::default());

    let id = store.records().create_resource(NewResource {
        location: "x".repeat(1_000),
        ..water("5 L")
    });
    assert!(store.last_persist_error().is_some());

    let deleted = store.records().delete_resource(id.as_str().into(), |_| true);
    assert!(deleted.is_deleted());
    assert!(store.last_persist_error().is_none());
    assert_eq!(store.phase(), StorePhase::Persisted);
}

#[test]
fn bootstrap_seeds_when_nothing_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(
        &path,
        r#"{"resources":[{"id":1,"type":"Food","location":"Pantry","quantity":"10 cans","status":"Adequate"}],"alerts":[]}"#,
    )
    .unwrap();

    let repo = MemoryKvRepository::new();
    let bootstrap = JsonFileBootstrap::new(&path);
    let store = StateStore::load_with_bootstrap(&repo, StoreConfig::default(), Some(&bootstrap));

    assert_eq!(store.load_origin(), LoadOrigin::Bootstrap);
    assert_eq!(store.document().resources.len(), 1);
    assert_eq!(store.document().resources[0].id, "1");
    assert!(store.document().people.is_empty());
    assert_eq!(stored_json(&repo)["resources"][0]["quantity"], "10 cans");
}

#[test]
fn failing_or_invalid_bootstrap_falls_back_to_empty() {
    let repo = MemoryKvRepository::new();
    let store =
        StateStore::load_with_bootstrap(&repo, StoreConfig::default(), Some(&FailingBootstrap));
    assert_eq!(store.load_origin(), LoadOrigin::Fresh);

    let repo = MemoryKvRepository::new();
    let store = StateStore::load_with_bootstrap(
        &repo,
        StoreConfig::default(),
        Some(&StaticBootstrap("<html>404</html>")),
    );
    assert_eq!(store.load_origin(), LoadOrigin::Fresh);

    let repo = MemoryKvRepository::new();
    let missing = JsonFileBootstrap::new("/definitely/not/here/data.json");
    let store = StateStore::load_with_bootstrap(&repo, StoreConfig::default(), Some(&missing));
    assert_eq!(store.load_origin(), LoadOrigin::Fresh);
}

#[test]
fn bootstrap_is_ignored_when_document_is_persisted() {
    let persisted = Document::empty_at(1).to_json_string().unwrap();
    let repo = MemoryKvRepository::seeded(KEY, &persisted);
    let store = StateStore::load_with_bootstrap(
        &repo,
        StoreConfig::default(),
        Some(&StaticBootstrap(r#"{"resources":[{"id":"b","status":"Low"}]}"#)),
    );

    assert_eq!(store.load_origin(), LoadOrigin::Persisted);
    assert!(store.document().resources.is_empty());
}

#[test]
fn custom_storage_key_is_honored() {
    let repo = MemoryKvRepository::new();
    let _store = StateStore::load(&repo, StoreConfig::default().with_storage_key("otherKey"));

    assert!(repo.get("otherKey").unwrap().is_some());
    assert!(repo.get(KEY).unwrap().is_none());
}

#[test]
fn sqlite_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("civic.db");

    let id = {
        let conn = open_db(&path).unwrap();
        let mut store = StateStore::load(SqliteKvRepository::new(&conn), StoreConfig::default());
        let id = store.records().create_resource(water("12 gal"));
        id
    };

    let conn = open_db(&path).unwrap();
    let store = StateStore::load(SqliteKvRepository::new(&conn), StoreConfig::default());
    assert_eq!(store.load_origin(), LoadOrigin::Persisted);
    assert_eq!(store.document().resources.len(), 1);
    assert_eq!(store.document().resources[0].id, id);
    assert_eq!(store.document().resources[0].quantity, "12 gal");
}

#[test]
fn mutations_refresh_last_updated_and_persist_every_time() {
    let repo = MemoryKvRepository::new();
    let mut store = StateStore::load(&repo, StoreConfig::default());

    store.records().create_resource(water("1 L"));
    assert_eq!(stored_json(&repo)["resources"].as_array().unwrap().len(), 1);
    store.records().create_resource(water("2 L"));
    assert_eq!(stored_json(&repo)["resources"].as_array().unwrap().len(), 2);

    let stored_last_updated = stored_json(&repo)["lastUpdated"].as_i64().unwrap();
    assert_eq!(stored_last_updated, store.document().last_updated);
    assert!(stored_last_updated > 0);
}
