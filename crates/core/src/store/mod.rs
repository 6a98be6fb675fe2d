//! SQLite-backed storage for photos and cached assets.
//!
//! Both databases are accessed asynchronously via tokio-rusqlite and share
//! the same connection setup:
//!
//! - WAL mode so readers never block the single writer
//! - Versioned schema migrations per database
//! - One transaction per mutation

pub mod assets;
pub mod connection;
pub mod hash;
pub mod migrations;
pub mod photos;

pub use crate::Error;

pub use assets::{CacheEntry, CacheStorage, CachedResponse, GenerationInfo, ResponseType};
pub use photos::{PhotoRecord, PhotoStore, SCHEMA_VERSION, StoreEvent};
