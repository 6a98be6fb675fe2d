//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each database (photos, asset cache) has its own ordered migration list;
//! a migration is a SQL batch applied inside the same transaction that
//! records its version, so an upgrade never lands half-way.

use std::num::ParseIntError;

use super::Error;
use tokio_rusqlite::{Connection, params};

/// A migration list: (version, SQL).
pub type Migrations = &'static [(&'static str, &'static str)];

/// Photo store migrations.
///
/// Version 2 only adds an index, so upgrading from version 1 keeps every record.
pub const PHOTOS: Migrations = &[
    ("1", include_str!("../../migrations/photos/001_photos.sql")),
    ("2", include_str!("../../migrations/photos/002_photos_captured_at.sql")),
];

/// Asset cache migrations.
///
/// Version 2 records each generation's asset set so a changed list can be
/// detected and reinstalled under the same name.
pub const ASSET_CACHE: Migrations = &[
    ("1", include_str!("../../migrations/asset_cache/001_generations.sql")),
    ("2", include_str!("../../migrations/asset_cache/002_generation_asset_set.sql")),
];

/// Highest schema version known for a migration list.
pub fn latest(migrations: Migrations) -> i64 {
    migrations.len() as i64
}

/// Bring the schema up to `target`, applying pending migrations in order.
///
/// Returns the schema version the database is at afterwards.
///
/// # Errors
///
/// - `MigrationFailed` if `target` is 0 or unknown, or a migration SQL fails.
/// - `StorageUnavailable` if the stored version is newer than `target`.
pub async fn run(conn: &Connection, migrations: Migrations, target: i64) -> Result<i64, Error> {
    if target < 1 || target > latest(migrations) {
        return Err(Error::MigrationFailed(format!(
            "unknown schema version {target} (known: 1..={})",
            latest(migrations)
        )));
    }

    conn.call(move |conn| -> Result<i64, Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        if current > target {
            return Err(Error::StorageUnavailable(format!(
                "stored schema version {current} is newer than requested {target}"
            )));
        }

        let tx = conn.transaction()?;
        for (version, sql) in migrations {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num > current && version_num <= target {
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version_num}: {e}")))?;
                tx.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
                tracing::debug!(version = version_num, "applied migration");
            }
        }
        tx.commit()?;

        Ok(target)
    })
    .await
    .map_err(Error::from)
}
