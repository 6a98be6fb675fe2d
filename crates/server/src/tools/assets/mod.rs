//! Asset cache MCP tools.
//!
//! `asset_fetch` routes a request through the asset cache manager exactly as
//! an intercepted page request would be; `cache_status` reports generations.

pub mod fetch;
pub mod status;

pub use fetch::{AssetFetchOutput, AssetFetchParams, fetch_impl};
pub use status::{CacheStatusOutput, status_impl};
