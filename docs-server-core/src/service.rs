//! Read-side facade handed to the serving layer.
//!
//! [`DocsService`] answers "which versions exist", "which files does a version
//! have", "where does a file live" and, when proxying is enabled, returns file
//! bytes through the [`ContentCache`], downloading from the provider on a miss.
//! Requests for versions or files the registry does not know are rejected as
//! not found without touching the provider.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::cache::ContentCache;
use crate::contract::Provider;
use crate::error::ProviderError;
use crate::registry::{DocumentationEntry, Registry};

pub struct DocsService<P: ?Sized> {
    provider: Arc<P>,
    registry: Arc<Registry>,
    cache: Option<Arc<ContentCache>>,
}

impl<P: Provider + ?Sized> DocsService<P> {
    /// Service with proxying disabled; clients link to [`DocsService::path`] directly.
    pub fn new(provider: Arc<P>, registry: Arc<Registry>) -> Self {
        Self {
            provider,
            registry,
            cache: None,
        }
    }

    /// Service that serves file bytes itself, caching every download.
    pub fn with_proxy(provider: Arc<P>, registry: Arc<Registry>, cache: Arc<ContentCache>) -> Self {
        Self {
            provider,
            registry,
            cache: Some(cache),
        }
    }

    pub fn proxy_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn get_versions(&self) -> Vec<String> {
        self.registry.list_versions()
    }

    pub fn get_version(&self, version: &str) -> Option<Arc<DocumentationEntry>> {
        self.registry.get(version)
    }

    /// Remote locator for a file, for direct linking.
    pub fn path(&self, version: &str, file: &str) -> String {
        self.provider.get_path(version, file)
    }

    /// File bytes via the cache, falling back to the provider.
    pub async fn get_file(&self, version: &str, file: &str) -> Result<Bytes, ProviderError> {
        let Some(cache) = &self.cache else {
            return Err(ProviderError::not_found("proxy disabled"));
        };

        match self.registry.get(version) {
            None => {
                return Err(ProviderError::not_found("unknown version").with_field("version", version))
            }
            Some(entry) if !entry.has_file(file) => {
                return Err(ProviderError::not_found("unknown file")
                    .with_field("version", version)
                    .with_field("file", file))
            }
            Some(_) => {}
        }

        if let Some(data) = cache.get(version, file) {
            debug!(version = %version, file = %file, "Cache hit");
            return Ok(data);
        }

        let data = self.provider.download_file(version, file).await?;
        info!(version = %version, file = %file, bytes = data.len(), "Downloaded file into cache");
        cache.set(version, file, data.clone());
        Ok(data)
    }
}
