//! Cache schema versions.
//!
//! The schema version lives in SQLite's `user_version` header field. Each
//! pending schema step runs in its own transaction together with the
//! version bump, so a failed step leaves the store at the previous version.

use super::Error;
use tokio_rusqlite::{Connection, rusqlite};

/// Schema steps in order; step `n` brings the store to version `n + 1`.
const SCHEMA: &[&str] = &[
    include_str!("../../migrations/001_partitions.sql"),
    include_str!("../../migrations/002_entries.sql"),
];

/// Bring the cache schema up to date.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a step fails or the store was written
/// by a newer schema than this build knows.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| upgrade(conn, SCHEMA)).await.map_err(Error::from)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<usize, Error> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    usize::try_from(version).map_err(|_| Error::MigrationFailed(format!("negative schema version {version}")))
}

fn upgrade(conn: &mut rusqlite::Connection, steps: &[&str]) -> Result<(), Error> {
    let current = schema_version(conn)?;
    if current > steps.len() {
        return Err(Error::MigrationFailed(format!(
            "cache schema version {current} is newer than supported version {}",
            steps.len()
        )));
    }

    for (index, sql) in steps.iter().enumerate().skip(current) {
        let version = index + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| Error::MigrationFailed(format!("schema version {version}: {e}")))?;
        tx.pragma_update(None, "user_version", version as i64)?;
        tx.commit()?;
        tracing::debug!(version, "cache schema upgraded");
    }

    Ok(())
}
