//! # contract: the interface between the reconciliation core and a remote source
//!
//! This module defines the [`Provider`] trait, the only way the core talks to the
//! place documentation lives. Concrete backends ([`crate::github::GithubProvider`],
//! [`crate::local::LocalProvider`]) implement it independently; the reconciler and
//! the proxy path never see backend-specific error types.
//!
//! ## Error contract
//! - Throttling is reported as [`ErrorKind::RateLimited`](crate::error::ErrorKind::RateLimited),
//!   with diagnostic fields such as `limit`, `reset` or `retry_after`.
//! - A missing version or file on download is
//!   [`ErrorKind::NotFound`](crate::error::ErrorKind::NotFound).
//! - Everything else is [`ErrorKind::Other`](crate::error::ErrorKind::Other).
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests get a `MockProvider` with
//!   deterministic expectations (exported under the `test-export-mocks` feature).

use async_trait::async_trait;
use bytes::Bytes;

use mockall::automock;

use crate::error::ProviderError;

/// Supplies version listings, file listings and raw file content.
///
/// Implementations must be `Send + Sync`; the reconciler and any number of
/// serving tasks share a single provider behind an `Arc`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Every version currently visible remotely, bounded by the provider's
    /// configured maximum.
    async fn list_versions(&self) -> Result<Vec<String>, ProviderError>;

    /// Remote paths of the documentation files in `version`.
    ///
    /// Only paths under the configured prefix and carrying the configured
    /// suffix are returned; anything else is skipped without error.
    async fn list_files(&self, version: &str) -> Result<Vec<String>, ProviderError>;

    /// Locator (URL or path) for a logical file at a version. Pure, no I/O.
    fn get_path(&self, version: &str, file: &str) -> String;

    /// Raw bytes of a logical file at a version.
    async fn download_file(&self, version: &str, file: &str) -> Result<Bytes, ProviderError>;
}
