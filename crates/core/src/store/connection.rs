//! Database connection management with pragma configuration.
//!
//! This module handles opening a SQLite database, applying required pragmas
//! for durability and concurrency (WAL mode), and running migrations.

use super::migrations::{self, Migrations};
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Open a database at the specified path and migrate it to `schema_version`.
///
/// Creates the file if it doesn't exist. Any failure to open or configure
/// the file is reported as `StorageUnavailable`.
pub(crate) async fn open(
    path: impl AsRef<Path>, migrations: Migrations, schema_version: i64,
) -> Result<Connection, Error> {
    let path = path.as_ref();
    let conn = Connection::open(path)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("{}: {e}", path.display())))?;

    prepare(conn, migrations, schema_version).await
}

/// Open an in-memory database for testing.
///
/// Uses the same pragma configuration and migrations as file-based databases.
pub(crate) async fn open_in_memory(migrations: Migrations, schema_version: i64) -> Result<Connection, Error> {
    let conn = Connection::open_in_memory()
        .await
        .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

    prepare(conn, migrations, schema_version).await
}

async fn prepare(conn: Connection, migrations: Migrations, schema_version: i64) -> Result<Connection, Error> {
    conn.call(|conn| conn.execute_batch(PRAGMAS))
        .await
        .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

    migrations::run(&conn, migrations, schema_version).await?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let conn = open_in_memory(migrations::PHOTOS, 1).await.unwrap();
        let version = conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let conn = open_in_memory(migrations::ASSET_CACHE, 1).await.unwrap();
        let enabled: i64 = conn
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_open_unreachable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("photos.sqlite");

        let result = open(&path, migrations::PHOTOS, 1).await;
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }
}
