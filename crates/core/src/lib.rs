//! Core types and shared functionality for shutter.
//!
//! This crate provides:
//! - Photo record store and asset cache storage with a SQLite backend
//! - The capture payload contract
//! - Unified error types
//! - Configuration structures

pub mod capture;
pub mod config;
pub mod error;
pub mod store;

pub use capture::{CaptureConstraints, CapturePayload, FacingMode};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{CacheEntry, CacheStorage, CachedResponse, GenerationInfo, PhotoRecord, PhotoStore, ResponseType, StoreEvent};
