//! The on-disk sitepulse store: one `SQLite` file under `.sitepulse/`.
//!
//! Every connection runs in WAL mode with a 5 s busy timeout. The health
//! path reads inside one transaction while a concurrent `sp health` may be
//! appending the day's snapshot; the timeout makes that second writer wait
//! for the lock and then hit `ON CONFLICT DO NOTHING`. Foreign keys are on
//! so cost rows cannot outlive their resource.

pub mod migrations;
pub mod schema;
pub mod store;

pub use store::{ReadView, SqliteStore};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a connection waits on a locked store before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the store at `path`, creating it (and its directory) if needed, and
/// upgrade its schema.
///
/// # Errors
///
/// Fails if the directory or file cannot be created, the connection cannot
/// be configured, or the schema cannot be upgraded (including a store
/// written by a newer `sp`).
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create store directory {}", dir.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store {}", path.display()))?;
    configure_connection(&conn)
        .with_context(|| format!("configure store {}", path.display()))?;
    let version = migrations::migrate(&mut conn)
        .with_context(|| format!("upgrade store {}", path.display()))?;
    tracing::debug!(store = %path.display(), version, "store ready");

    Ok(conn)
}

/// Like [`open_store`], but `None` when no store exists at `path` yet.
///
/// Data commands use this so a missing store surfaces as "not initialized"
/// instead of silently creating an empty one.
///
/// # Errors
///
/// Same as [`open_store`] for an existing file.
pub fn try_open_store(path: &Path) -> Result<Option<Connection>> {
    if path.exists() {
        open_store(path).map(Some)
    } else {
        Ok(None)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    // Set first so the pragmas below also wait on a locked file.
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!(%mode, "store did not switch to WAL journaling");
    }
    Ok(())
}
