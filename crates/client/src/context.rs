//! Application wiring: the photo store and the asset cache manager opened
//! from one [`AppConfig`].

use std::sync::Arc;

use url::Url;

use crate::fetch::{FetchConfig, HttpNetwork, Network};
use crate::manager::AssetCacheManager;
use shutter_core::{AppConfig, CacheStorage, Error, PhotoStore};

/// Everything a running gallery needs.
pub struct AppContext {
    pub config: AppConfig,
    pub photos: PhotoStore,
    pub assets: AssetCacheManager,
}

impl AppContext {
    /// Open both databases and bring the configured cache generation up.
    ///
    /// A failed install is not fatal: the newest generation already on disk
    /// keeps serving, or requests go straight to the network if there is none.
    /// Storage errors are fatal.
    pub async fn start(config: AppConfig) -> Result<Self, Error> {
        let network = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
        let photos = PhotoStore::open(&config.db_path, config.schema_version).await?;
        let storage = CacheStorage::open(&config.cache_db_path).await?;
        Self::with_parts(config, photos, storage, network).await
    }

    /// Assemble a context from already-opened parts.
    pub async fn with_parts(
        config: AppConfig, photos: PhotoStore, storage: CacheStorage, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let assets = AssetCacheManager::new(storage, network, origin);

        match assets.register(&config.cache_name, &config.assets).await {
            Ok(purged) => {
                tracing::info!(generation = %config.cache_name, purged = purged.len(), "asset cache registered");
            }
            Err(e @ (Error::InstallFailed { .. } | Error::GenerationMissing(_))) => {
                tracing::warn!(error = %e, "asset cache install failed, keeping previous generation");
                match assets.resume().await? {
                    Some(generation) => tracing::info!(%generation, "serving previous cache generation"),
                    None => tracing::warn!("no cache generation available, serving from network"),
                }
            }
            Err(e) => return Err(e),
        }

        Ok(Self { config, photos, assets })
    }
}
