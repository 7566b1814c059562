//! Versioned upgrades of the sitepulse store.
//!
//! The applied version lives in `PRAGMA user_version` and is mirrored into
//! `store_meta.schema_version` so `sp init` and operators can read it with
//! plain SQL. A store stamped with a version newer than this build knows
//! is refused.

use super::schema;
use rusqlite::{Connection, types::Type};
use tracing::{debug, info};

/// Newest store layout this build can read and write.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// One forward step of the store layout.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "collaborator tables and snapshot series",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "read-path indexes and snapshot provenance",
        sql: schema::MIGRATION_V2_SQL,
    },
];

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// The store was written by a newer `sp`.
    #[error("store schema v{found} is newer than supported v{supported}; upgrade sp")]
    NewerStore { found: u32, supported: u32 },
}

/// Schema version recorded in the store, `0` for a fresh database.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`] and return the version
/// it ends on.
///
/// Steps at or below the recorded version are skipped; each remaining step
/// commits together with its version stamp, so a failed step leaves the
/// store at the previous version.
///
/// # Errors
///
/// Returns [`MigrationError::NewerStore`] for a store from a newer build,
/// or the `SQLite` error of the failing step.
pub fn migrate(conn: &mut Connection) -> Result<u32, MigrationError> {
    let found = current_schema_version(conn)?;
    if found > LATEST_SCHEMA_VERSION {
        return Err(MigrationError::NewerStore {
            found,
            supported: LATEST_SCHEMA_VERSION,
        });
    }

    let pending = MIGRATIONS.iter().filter(|m| m.version > found);
    let mut version = found;
    for step in pending {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(step.version)],
        )?;
        tx.commit()?;
        version = step.version;
        debug!(version, name = step.name, "applied store migration");
    }

    if version != found {
        info!(from = found, to = version, "upgraded sitepulse store");
    }
    Ok(version)
}
