//! Cache-first asset serving.
//!
//! The manager owns the name of the current cache generation and answers
//! every intercepted request from it before falling back to the network.
//!
//! ### Install
//! - Every asset is fetched before anything is written.
//! - A non-2xx status counts as a failed fetch.
//! - The generation and all its entries are committed in one transaction.
//!
//! ### Activate
//! - Deletes every generation except the named one, whole.
//! - Re-running with the same name changes nothing.
//!
//! ### Requests
//! - Hits are returned verbatim; there is no revalidation, so stale assets
//!   are served until the generation name changes.
//! - Misses go to the network; `200` same-origin responses are copied into
//!   the current generation before being returned.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use crate::AssetRequest;
use crate::fetch::{FetchedResponse, Network, same_origin};
use crate::lifecycle::{Disposition, GenerationState, LifecycleEvent, Route, Transition};
use shutter_core::{CacheEntry, CacheStorage, CachedResponse, Error, GenerationInfo, ResponseType};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Served from the current generation without touching the network.
    Cache,
    /// Fetched and returned without being stored.
    Network,
    /// Fetched, and a copy stored in the current generation.
    NetworkStored,
}

/// Response handed back to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl AssetResponse {
    fn from_cached(cached: CachedResponse) -> Self {
        Self {
            url: cached.url,
            status: cached.status,
            status_text: cached.status_text,
            response_type: cached.response_type,
            headers: cached.headers,
            body: Bytes::from(cached.body),
            source: ResponseSource::Cache,
        }
    }

    fn from_network(fetched: FetchedResponse, response_type: ResponseType) -> Self {
        Self {
            url: fetched.url.to_string(),
            status: fetched.status.as_u16(),
            status_text: fetched.status_text().to_string(),
            response_type,
            headers: fetched.headers,
            body: fetched.body,
            source: ResponseSource::Network,
        }
    }

    /// Independent copy suitable for storing.
    pub fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            response_type: self.response_type,
            headers: self.headers.clone(),
            body: self.body.to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Asset cache manager.
///
/// Owns the current generation name; it changes only through [`activate`](Self::activate)
/// and [`resume`](Self::resume).
pub struct AssetCacheManager {
    storage: CacheStorage,
    network: Arc<dyn Network>,
    origin: Url,
    current: RwLock<Option<String>>,
}

impl AssetCacheManager {
    pub fn new(storage: CacheStorage, network: Arc<dyn Network>, origin: Url) -> Self {
        Self { storage, network, origin, current: RwLock::new(None) }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub async fn current_generation(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.storage.generations().await
    }

    /// Populate `generation` with every asset in `assets`.
    ///
    /// All-or-nothing: if any asset fails, nothing is written and a generation
    /// that didn't exist before still doesn't.
    pub async fn install(&self, generation: &str, assets: &[String]) -> Result<GenerationState, Error> {
        let state = GenerationState::Installing;
        tracing::info!(generation, assets = assets.len(), "installing cache generation");

        match self.populate(generation, assets).await {
            Ok(()) => {
                let Transition::Next(ready) = state.apply(LifecycleEvent::InstallSucceeded)? else {
                    return Err(Error::InvalidTransition(format!("{generation} did not become ready")));
                };
                tracing::info!(generation, "cache generation ready");
                Ok(ready)
            }
            Err(reason) => {
                state.apply(LifecycleEvent::InstallFailed)?;
                tracing::warn!(generation, %reason, "cache generation install failed");
                Err(Error::InstallFailed { generation: generation.to_string(), reason })
            }
        }
    }

    async fn populate(&self, generation: &str, assets: &[String]) -> Result<(), String> {
        let fetches = assets.iter().map(|path| self.fetch_asset(path));
        let entries = try_join_all(fetches).await?;
        self.storage
            .commit_generation(generation, assets, entries)
            .await
            .map_err(|e| e.to_string())
    }

    async fn fetch_asset(&self, path: &str) -> Result<CacheEntry, String> {
        let request = AssetRequest::resolve(reqwest::Method::GET, &self.origin, path)
            .map_err(|e| format!("{path}: {e}"))?;
        let fetched = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| format!("{path}: {e}"))?;

        if !fetched.status.is_success() {
            return Err(format!("{path}: status {}", fetched.status.as_u16()));
        }

        let response = AssetResponse::from_network(fetched, self.response_type(request.url()));
        Ok(CacheEntry {
            method: request.method().to_string(),
            url: request.url().to_string(),
            response: response.to_cached(),
        })
    }

    /// Make `generation` current and delete every other generation.
    ///
    /// Returns the names that were deleted. Fails with `GenerationMissing`,
    /// deleting nothing, if `generation` was never installed.
    pub async fn activate(&self, generation: &str) -> Result<Vec<String>, Error> {
        let mut current = self.current.write().await;

        if !self.storage.has(generation).await? {
            return Err(Error::GenerationMissing(generation.to_string()));
        }

        let purged = self.storage.retain_only(generation).await?;
        for name in &purged {
            GenerationState::Ready.apply(LifecycleEvent::Superseded)?;
            tracing::info!(generation = %name, "deleted superseded cache generation");
        }

        *current = Some(generation.to_string());
        tracing::info!(generation, purged = purged.len(), "cache generation activated");
        Ok(purged)
    }

    /// Install `generation` unless it is already stored with the same asset
    /// list, then activate it.
    ///
    /// A changed list reinstalls under the same name: new assets are fetched
    /// and assets no longer listed are dropped.
    pub async fn register(&self, generation: &str, assets: &[String]) -> Result<Vec<String>, Error> {
        match self.storage.asset_set(generation).await? {
            Some(stored) if stored == assets => {
                tracing::debug!(generation, "cache generation already installed");
            }
            Some(_) => {
                tracing::info!(generation, "asset list changed, reinstalling cache generation");
                self.install(generation, assets).await?;
            }
            None => {
                self.install(generation, assets).await?;
            }
        }
        self.activate(generation).await
    }

    /// Serve from the newest stored generation without deleting anything.
    ///
    /// Used when installing a new generation failed and the previous one
    /// must keep serving.
    pub async fn resume(&self) -> Result<Option<String>, Error> {
        let newest = self.storage.keys().await?.pop();
        let mut current = self.current.write().await;
        *current = newest.clone();
        if let Some(generation) = &newest {
            tracing::info!(generation = %generation, "resumed cache generation");
        }
        Ok(newest)
    }

    /// Answer an intercepted request.
    ///
    /// # Errors
    ///
    /// `NetworkUnavailable` when the network is needed and fails, or
    /// `FetchTooLarge` when the body exceeds the configured limit. Nothing is
    /// retried and neither case stores anything.
    pub async fn handle_request(&self, request: &AssetRequest) -> Result<AssetResponse, Error> {
        let current = self.current.read().await.clone();

        match Route::select(current.as_deref(), request.is_cacheable_method()) {
            Route::NetworkOnly => {
                let fetched = self.fetch_network(request).await?;
                let response_type = self.response_type(&fetched.url);
                Ok(AssetResponse::from_network(fetched, response_type))
            }
            Route::CacheFirst { generation } => self.cache_first(&generation, request).await,
        }
    }

    async fn cache_first(&self, generation: &str, request: &AssetRequest) -> Result<AssetResponse, Error> {
        let method = request.method().as_str();
        let url = request.url().as_str();

        if let Some(cached) = self.storage.match_request(generation, method, url).await? {
            tracing::debug!("cache hit for {} in {}", url, generation);
            return Ok(AssetResponse::from_cached(cached));
        }

        tracing::debug!("cache miss for {} in {}", url, generation);
        let fetched = self.fetch_network(request).await?;
        let response_type = self.response_type(&fetched.url);
        let mut response = AssetResponse::from_network(fetched, response_type);

        if Disposition::for_response(response.status, response.response_type) == Disposition::Store {
            let entry = CacheEntry { method: method.to_string(), url: url.to_string(), response: response.to_cached() };
            match self.storage.put(generation, entry).await {
                Ok(()) => response.source = ResponseSource::NetworkStored,
                Err(e) => tracing::warn!(error = %e, url, generation, "failed to store network response"),
            }
        }

        Ok(response)
    }

    async fn fetch_network(&self, request: &AssetRequest) -> Result<FetchedResponse, Error> {
        self.network.fetch(request).await.inspect_err(|e| {
            tracing::warn!(error = %e, url = %request.url(), "network request failed");
        })
    }

    fn response_type(&self, url: &Url) -> ResponseType {
        if same_origin(url, &self.origin) { ResponseType::Basic } else { ResponseType::Cors }
    }
}
