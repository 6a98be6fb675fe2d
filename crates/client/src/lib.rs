//! Client side of the shutter gallery.
//!
//! This crate provides the network layer, the cache generation lifecycle and
//! the asset cache manager, plus the [`AppContext`] that wires them to the
//! photo store for the server.

pub mod context;
pub mod fetch;
pub mod lifecycle;
pub mod manager;
pub mod request;

pub use context::AppContext;
pub use fetch::{FetchConfig, FetchedResponse, HttpNetwork, Network};
pub use lifecycle::{Disposition, GenerationState, LifecycleEvent, Route, Transition};
pub use manager::{AssetCacheManager, AssetResponse, ResponseSource};
pub use request::AssetRequest;
pub use reqwest::Method;
