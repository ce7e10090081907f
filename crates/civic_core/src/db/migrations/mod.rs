//! SQLite migration registry for the key-value table.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Document shape upgrades live in `model::migration`; this registry only
//!   covers the storage table layout.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct TableMigration {
    version: u32,
    sql: &'static str,
}

const TABLE_MIGRATIONS: &[TableMigration] = &[TableMigration {
    version: 1,
    sql: include_str!("0001_kv_store.sql"),
}];

/// Returns the latest storage layout version known by this binary.
pub fn latest_version() -> u32 {
    TABLE_MIGRATIONS
        .last()
        .map_or(0, |migration| migration.version)
}

/// Brings the storage layout up to date inside one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let on_disk = user_version(conn)?;
    let latest = latest_version();

    if on_disk > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: on_disk,
            latest_supported: latest,
        });
    }

    let pending: Vec<&TableMigration> = TABLE_MIGRATIONS
        .iter()
        .filter(|migration| migration.version > on_disk)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        on_disk,
        latest,
        pending.len()
    );
    Ok(())
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}
