//! Versioned asset cache storage.
//!
//! Cache generations are named snapshots of responses. A generation row is
//! written in the same transaction as its initial entries, so a generation
//! either exists with every asset or does not exist at all. Deleting a
//! generation cascades to its entries.

use super::{connection, hash::compute_request_key, migrations};
use crate::Error;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_rusqlite::{Connection, params, rusqlite};

/// How a response relates to the application's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response.
    Cors,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            _ => None,
        }
    }
}

/// A response as written to and read from a cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A request identity paired with the response stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub method: String,
    pub url: String,
    pub response: CachedResponse,
}

/// Summary of a stored generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
    /// Asset paths the generation was last installed with.
    pub asset_set: Vec<String>,
    pub entries: u64,
}

/// Handle to the asset cache database.
#[derive(Clone, Debug)]
pub struct CacheStorage {
    conn: Connection,
}

fn upsert_entry(
    conn: &rusqlite::Connection, generation: &str, entry: &CacheEntry, precached: bool, stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.response.headers)
        .map_err(|e| Error::WriteFailed(format!("failed to encode headers: {e}")))?;
    conn.execute(
        "INSERT INTO cache_entries (
            generation, request_key, method, url, status, status_text,
            response_type, headers_json, body, precached, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(generation, request_key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            precached = MAX(precached, excluded.precached),
            stored_at = excluded.stored_at",
        params![
            generation,
            compute_request_key(&entry.method, &entry.url),
            entry.method.to_ascii_uppercase(),
            &entry.url,
            entry.response.status,
            &entry.response.status_text,
            entry.response.response_type.as_str(),
            headers_json,
            &entry.response.body,
            precached,
            stored_at,
        ],
    )?;
    Ok(())
}

fn decode_asset_set(json: &str) -> Result<Vec<String>, Error> {
    serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("corrupt asset set: {e}")))
}

impl CacheStorage {
    /// Open (or create) the asset cache database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn =
            connection::open(path, migrations::ASSET_CACHE, migrations::latest(migrations::ASSET_CACHE)).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory asset cache for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn =
            connection::open_in_memory(migrations::ASSET_CACHE, migrations::latest(migrations::ASSET_CACHE)).await?;
        Ok(Self { conn })
    }

    /// Names of every stored generation, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every stored generation with its entry count, oldest first.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, g.asset_set_json, COUNT(e.request_key)
                    FROM cache_generations g
                    LEFT JOIN cache_entries e ON e.generation = g.name
                    GROUP BY g.name
                    ORDER BY g.created_at ASC, g.name ASC",
                )?;
                let generations = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                generations
                    .into_iter()
                    .map(|(name, created_at, asset_set_json, entries)| {
                        Ok(GenerationInfo {
                            asset_set: decode_asset_set(&asset_set_json)?,
                            name,
                            created_at,
                            entries: entries as u64,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_generations WHERE name = ?1)",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// The asset set `generation` was last installed with, if it exists.
    pub async fn asset_set(&self, generation: &str) -> Result<Option<Vec<String>>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<String>>, Error> {
                let result = conn.query_row(
                    "SELECT asset_set_json FROM cache_generations WHERE name = ?1",
                    params![generation],
                    |row| row.get::<_, String>(0),
                );
                match result {
                    Ok(json) => Ok(Some(decode_asset_set(&json)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Create `generation` together with all of `entries` in one transaction.
    ///
    /// Reinstalling an existing generation replaces its asset set and every
    /// entry a previous install wrote, so assets dropped from the list go
    /// away. Responses stored on a miss are kept. Either the generation and
    /// every entry become visible, or nothing changes.
    pub async fn commit_generation(
        &self, generation: &str, asset_set: &[String], entries: Vec<CacheEntry>,
    ) -> Result<(), Error> {
        let generation = generation.to_string();
        let asset_set_json = serde_json::to_string(asset_set)
            .map_err(|e| Error::WriteFailed(format!("failed to encode asset set: {e}")))?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_generations (name, created_at, asset_set_json) VALUES (?1, ?2, ?3)
                    ON CONFLICT(name) DO UPDATE SET asset_set_json = excluded.asset_set_json",
                    params![generation, now, asset_set_json],
                )?;
                tx.execute(
                    "DELETE FROM cache_entries WHERE generation = ?1 AND precached = 1",
                    params![generation],
                )?;
                for entry in &entries {
                    upsert_entry(&tx, &generation, entry, true, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|e| Error::from(e).into_write_failed())
    }

    /// Look up the response stored for a request identity.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn match_request(&self, generation: &str, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.to_string();
        let key = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, status_text, response_type, headers_json, body
                    FROM cache_entries WHERE generation = ?1 AND request_key = ?2",
                    params![generation, key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u16>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, Vec<u8>>(5)?,
                        ))
                    },
                );

                let (url, status, status_text, response_type, headers_json, body) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let response_type = ResponseType::parse(&response_type)
                    .ok_or_else(|| Error::InvalidInput(format!("unknown response type: {response_type}")))?;
                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::InvalidInput(format!("corrupt cached headers: {e}")))?;

                Ok(Some(CachedResponse { url, status, status_text, response_type, headers, body }))
            })
            .await
            .map_err(Error::from)
    }

    /// Store a single entry in an existing generation.
    ///
    /// Concurrent writers for the same identity resolve last-write-wins.
    /// Fails with `WriteFailed` if the generation no longer exists.
    pub async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .call(move |conn| -> Result<(), Error> { upsert_entry(conn, &generation, &entry, false, &now) })
            .await
            .map_err(|e| Error::from(e).into_write_failed())
    }

    /// Delete every generation except `keep`, in one transaction.
    ///
    /// Returns the names that were deleted.
    pub async fn retain_only(&self, keep: &str) -> Result<Vec<String>, Error> {
        let keep = keep.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale = {
                    let mut stmt = tx.prepare("SELECT name FROM cache_generations WHERE name != ?1 ORDER BY name")?;
                    stmt.query_map(params![keep], |row| row.get(0))?
                        .collect::<Result<Vec<String>, _>>()?
                };
                tx.execute("DELETE FROM cache_generations WHERE name != ?1", params![keep])?;
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(|e| Error::from(e).into_write_failed())
    }

    pub async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, body: &[u8]) -> CacheEntry {
        let url = format!("https://app.local/{path}");
        CacheEntry {
            method: "GET".to_string(),
            url: url.clone(),
            response: CachedResponse {
                url,
                status: 200,
                status_text: "OK".to_string(),
                response_type: ResponseType::Basic,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
                body: body.to_vec(),
            },
        }
    }

    #[tokio::test]
    async fn test_commit_and_match() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let index = entry("index.html", b"<html></html>");
        storage
            .commit_generation("v1", &[], vec![index.clone(), entry("app.js", b"console.log(1)")])
            .await
            .unwrap();

        let hit = storage
            .match_request("v1", "GET", "https://app.local/index.html")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit, index.response);
        assert_eq!(storage.entry_count("v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.commit_generation("v1", &[], vec![]).await.unwrap();

        assert!(storage.match_request("v1", "GET", "https://app.local/nope").await.unwrap().is_none());
        assert!(storage.match_request("v2", "GET", "https://app.local/nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_generation() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.commit_generation("v1", &[], vec![entry("app.js", b"old")]).await.unwrap();
        storage.commit_generation("v2", &[], vec![entry("app.js", b"new")]).await.unwrap();

        let v1 = storage.match_request("v1", "GET", "https://app.local/app.js").await.unwrap().unwrap();
        let v2 = storage.match_request("v2", "GET", "https://app.local/app.js").await.unwrap().unwrap();
        assert_eq!(v1.body, b"old");
        assert_eq!(v2.body, b"new");
    }

    #[tokio::test]
    async fn test_put_last_write_wins() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.commit_generation("v1", &[], vec![]).await.unwrap();

        storage.put("v1", entry("photo.css", b"first")).await.unwrap();
        storage.put("v1", entry("photo.css", b"second")).await.unwrap();

        let hit = storage.match_request("v1", "GET", "https://app.local/photo.css").await.unwrap().unwrap();
        assert_eq!(hit.body, b"second");
        assert_eq!(storage.entry_count("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_into_missing_generation_fails() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let result = storage.put("gone", entry("app.js", b"x")).await;
        assert!(matches!(result, Err(Error::WriteFailed(_))));
    }

    #[tokio::test]
    async fn test_retain_only() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.commit_generation("v1", &[], vec![entry("app.js", b"1")]).await.unwrap();
        storage.commit_generation("v2", &[], vec![entry("app.js", b"2")]).await.unwrap();
        storage.commit_generation("v3", &[], vec![entry("app.js", b"3")]).await.unwrap();

        let deleted = storage.retain_only("v3").await.unwrap();
        assert_eq!(deleted, vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(storage.keys().await.unwrap(), vec!["v3".to_string()]);
        assert_eq!(storage.entry_count("v1").await.unwrap(), 0);

        assert!(storage.retain_only("v3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generations_summary() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage
            .commit_generation("v1", &[], vec![entry("index.html", b"a"), entry("app.js", b"b")])
            .await
            .unwrap();

        let generations = storage.generations().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].name, "v1");
        assert_eq!(generations[0].entries, 2);
        assert!(generations[0].asset_set.is_empty());
    }

    #[tokio::test]
    async fn test_asset_set_recorded() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let assets = vec!["index.html".to_string(), "app.js".to_string()];
        storage.commit_generation("v1", &assets, vec![]).await.unwrap();

        assert_eq!(storage.asset_set("v1").await.unwrap(), Some(assets));
        assert_eq!(storage.asset_set("v2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reinstall_replaces_installed_entries_only() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage
            .commit_generation("v1", &["index.html".into(), "app.js".into()], vec![
                entry("index.html", b"old page"),
                entry("app.js", b"old js"),
            ])
            .await
            .unwrap();
        storage.put("v1", entry("photo.css", b"css")).await.unwrap();

        storage
            .commit_generation("v1", &["index.html".into()], vec![entry("index.html", b"new page")])
            .await
            .unwrap();

        let page = storage.match_request("v1", "GET", "https://app.local/index.html").await.unwrap().unwrap();
        assert_eq!(page.body, b"new page");
        assert!(storage.match_request("v1", "GET", "https://app.local/app.js").await.unwrap().is_none());
        assert!(storage.match_request("v1", "GET", "https://app.local/photo.css").await.unwrap().is_some());
        assert_eq!(storage.asset_set("v1").await.unwrap(), Some(vec!["index.html".to_string()]));
    }

    #[test]
    fn test_response_type_round_trip() {
        for ty in [ResponseType::Basic, ResponseType::Cors] {
            assert_eq!(ResponseType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ResponseType::parse("opaque"), None);
    }
}
