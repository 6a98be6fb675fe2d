//! Photo record store.
//!
//! A single append-only table of captured photos. Every mutation runs in its
//! own SQLite transaction and observers hear about it only after commit.

use super::{connection, migrations};
use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::broadcast;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Capacity of the change notification channel.
const EVENT_CAPACITY: usize = 64;

/// Newest photo schema version.
pub const SCHEMA_VERSION: i64 = migrations::PHOTOS.len() as i64;

/// A persisted photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Store-assigned, never reused.
    pub id: i64,
    /// Encoded image as a self-describing `data:` URL.
    pub payload: String,
    pub captured_at: DateTime<Utc>,
}

/// Notification published after a mutation has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Appended(PhotoRecord),
    Cleared { removed: u64 },
}

/// Handle to the photo database.
///
/// Cheap to clone; clones share the connection and the event channel.
#[derive(Clone, Debug)]
pub struct PhotoStore {
    conn: Connection,
    events: broadcast::Sender<StoreEvent>,
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<PhotoRecord, rusqlite::Error> {
    let captured_at: String = row.get(2)?;
    Ok(PhotoRecord { id: row.get(0)?, payload: row.get(1)?, captured_at: parse_timestamp(2, &captured_at)? })
}

impl PhotoStore {
    /// Open (or create) the photo database at `path`.
    ///
    /// Migrations newer than the stored version and up to `schema_version`
    /// are applied before the handle is returned, so the `photos` table
    /// always exists once this succeeds.
    pub async fn open(path: impl AsRef<Path>, schema_version: i64) -> Result<Self, Error> {
        let conn = connection::open(path, migrations::PHOTOS, schema_version)
            .await
            .map_err(unavailable)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory photo store for testing.
    pub async fn open_in_memory(schema_version: i64) -> Result<Self, Error> {
        let conn = connection::open_in_memory(migrations::PHOTOS, schema_version)
            .await
            .map_err(unavailable)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { conn, events }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Append a photo.
    ///
    /// `captured_at` never goes backwards: if the clock reads earlier than the
    /// newest stored record, the newer timestamp is reused.
    pub async fn append(&self, payload: &str) -> Result<PhotoRecord, Error> {
        if payload.is_empty() {
            return Err(Error::InvalidInput("payload cannot be empty".into()));
        }

        let payload = payload.to_string();
        let now = format_timestamp(Utc::now());
        let record = self
            .conn
            .call(move |conn| -> Result<PhotoRecord, Error> {
                let tx = conn.transaction()?;
                let latest: Option<String> =
                    tx.query_row("SELECT MAX(captured_at) FROM photos", [], |row| row.get(0))?;
                let captured_at = match latest {
                    Some(latest) if latest > now => latest,
                    _ => now,
                };

                tx.execute("INSERT INTO photos (payload, captured_at) VALUES (?1, ?2)", params![payload, captured_at])?;
                let id = tx.last_insert_rowid();
                tx.commit()?;

                Ok(PhotoRecord { id, payload, captured_at: parse_timestamp(2, &captured_at)? })
            })
            .await
            .map_err(|e| Error::from(e).into_write_failed())?;

        tracing::debug!(id = record.id, bytes = record.payload.len(), "photo appended");
        self.notify(StoreEvent::Appended(record.clone()));
        Ok(record)
    }

    /// Every stored photo, oldest id first.
    ///
    /// The order is stable for a fixed store state.
    pub async fn list_all(&self) -> Result<Vec<PhotoRecord>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PhotoRecord>, Error> {
                let mut stmt = conn.prepare("SELECT id, payload, captured_at FROM photos ORDER BY id ASC")?;
                let records = stmt
                    .query_map([], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    /// Get a photo by id.
    ///
    /// Returns None if the id doesn't exist.
    pub async fn get(&self, id: i64) -> Result<Option<PhotoRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<PhotoRecord>, Error> {
                let result = conn.query_row(
                    "SELECT id, payload, captured_at FROM photos WHERE id = ?1",
                    params![id],
                    row_to_record,
                );

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every photo in one transaction.
    ///
    /// Returns the number of removed records. Ids are not reset.
    pub async fn clear(&self) -> Result<u64, Error> {
        let removed = self
            .conn
            .call(|conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let removed = tx.execute("DELETE FROM photos", [])?;
                tx.commit()?;
                Ok(removed as u64)
            })
            .await
            .map_err(|e| Error::from(e).into_write_failed())?;

        tracing::info!(removed, "gallery cleared");
        self.notify(StoreEvent::Cleared { removed });
        Ok(removed)
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Any failure while opening means the gallery cannot save photos.
fn unavailable(err: Error) -> Error {
    match err {
        Error::Database(e) => Error::StorageUnavailable(e.to_string()),
        Error::MigrationFailed(msg) => Error::StorageUnavailable(msg),
        other => other,
    }
}
