//! shutter server entry point.
//!
//! Opens the photo store and asset cache, then boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shutter_client::AppContext;
use shutter_core::{AppConfig, Error, PhotoStore, StoreEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), cache = %config.cache_name, "starting shutter server on stdio transport");

    let ctx = Arc::new(AppContext::start(config).await?);
    tokio::spawn(observe_gallery(ctx.photos.clone()));

    let handler = handler::GalleryServer::new(ctx);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Re-read the gallery after every committed change.
async fn observe_gallery(photos: PhotoStore) {
    let mut events = photos.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = refresh_gallery(&photos, &event).await {
                    tracing::warn!(error = %e, "failed to re-read gallery");
                }
            }
            Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "gallery observer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Re-read every record after `event` and return how many there are.
async fn refresh_gallery(photos: &PhotoStore, event: &StoreEvent) -> Result<usize, Error> {
    let count = photos.list_all().await?.len();
    match event {
        StoreEvent::Appended(record) => tracing::info!(id = record.id, count, "gallery updated"),
        StoreEvent::Cleared { removed } => tracing::info!(removed, count, "gallery cleared"),
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_core::store::SCHEMA_VERSION;

    #[tokio::test]
    async fn test_refresh_gallery_sees_committed_changes() {
        let photos = PhotoStore::open_in_memory(SCHEMA_VERSION).await.unwrap();
        let mut events = photos.subscribe();

        photos.append("data:image/png;base64,QQ==").await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(refresh_gallery(&photos, &event).await.unwrap(), 1);

        photos.clear().await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, StoreEvent::Cleared { removed: 1 }));
        assert_eq!(refresh_gallery(&photos, &event).await.unwrap(), 0);
    }
}
