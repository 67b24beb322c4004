//! Poll loop: keeps the [`Registry`] in step with what the [`Provider`] reports.
//!
//! This module provides the reconciliation logic for "synchronising" the local
//! registry with the remote source. One cycle:
//!   - lists remote versions
//!   - diffs them against the registry (set semantics)
//!   - fetches file listings for new versions, one at a time, and upserts them
//!   - removes versions that disappeared remotely
//!
//! # Error Handling
//! Rate limiting is soft: a throttled version listing skips the whole cycle, a
//! throttled file listing skips only that version (it stays "new" and is retried
//! next cycle). Any other provider error aborts the cycle and stops the loop;
//! removals for that cycle do not run and the registry keeps what it had. The
//! next successful cycle reconciles fully, there is no rollback.
//!
//! # Navigation
//! - Loop entrypoint: [`Reconciler::run`]
//! - Single cycle: [`Reconciler::poll_once`], reporting via [`CycleReport`]
//! - Path mapping: [`normalize_file`]

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::contract::Provider;
use crate::error::ProviderError;
use crate::registry::Registry;

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// The version listing was rate limited; nothing else ran.
    pub skipped: bool,
    /// Versions fetched and upserted this cycle.
    pub added: Vec<String>,
    /// Versions removed this cycle.
    pub removed: Vec<String>,
    /// New versions whose file listing was rate limited; retried next cycle.
    pub rate_limited: Vec<String>,
    /// Shutdown was requested before every new version was fetched; removals did not run.
    pub interrupted: bool,
}

impl CycleReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.rate_limited.is_empty()
    }
}

/// Drives periodic synchronisation between a provider and a registry.
///
/// The reconciler is the only writer of its registry.
pub struct Reconciler<P: ?Sized> {
    provider: Arc<P>,
    registry: Arc<Registry>,
    config: ServerConfig,
}

impl<P: Provider + ?Sized> Reconciler<P> {
    pub fn new(provider: Arc<P>, registry: Arc<Registry>, config: ServerConfig) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run cycles until `shutdown` is cancelled or a fatal provider error occurs.
    ///
    /// The first cycle runs immediately. Cancellation is observed while waiting
    /// for the next tick and between per-version fetches; an in-flight provider
    /// call is never aborted. Cancellation returns `Ok(())`.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ProviderError> {
        info!(poll_interval = ?self.config.poll_interval, "[SYNC] Starting poll loop");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let report = self.cycle(Some(&shutdown)).await?;
            if report.interrupted {
                info!(
                    added = report.added.len(),
                    versions = self.registry.len(),
                    "[SYNC] Cycle interrupted by shutdown"
                );
                break;
            }
            if report.skipped {
                info!("[SYNC] Cycle skipped, waiting for next tick");
            } else {
                info!(
                    added = report.added.len(),
                    removed = report.removed.len(),
                    rate_limited = report.rate_limited.len(),
                    versions = self.registry.len(),
                    "[SYNC] Cycle complete"
                );
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("[SYNC] Shutdown requested, poll loop stopped");
        Ok(())
    }

    /// Run exactly one reconciliation cycle.
    pub async fn poll_once(&self) -> Result<CycleReport, ProviderError> {
        self.cycle(None).await
    }

    async fn cycle(
        &self,
        shutdown: Option<&CancellationToken>,
    ) -> Result<CycleReport, ProviderError> {
        let remote = match self.provider.list_versions().await {
            Ok(versions) => versions,
            Err(e) if e.is_rate_limited() => {
                warn!(kind = %e.kind(), error = %e, "[SYNC] Rate limited while listing versions, skipping cycle");
                return Ok(CycleReport::skipped());
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "[SYNC][ERROR] Failed to list versions");
                return Err(e);
            }
        };

        let (new_versions, removed_versions) = self.diff(&remote);
        debug!(
            remote = remote.len(),
            new = new_versions.len(),
            removed = removed_versions.len(),
            "[SYNC] Computed version diff"
        );

        let mut report = CycleReport::default();

        for version in new_versions {
            if shutdown.is_some_and(CancellationToken::is_cancelled) {
                info!("[SYNC] Shutdown requested mid-cycle, stopping before next fetch");
                report.interrupted = true;
                return Ok(report);
            }

            let paths = match self.provider.list_files(&version).await {
                Ok(paths) => paths,
                Err(e) if e.is_rate_limited() => {
                    warn!(version = %version, kind = %e.kind(), error = %e, "[SYNC] Rate limited while listing files, will retry next cycle");
                    report.rate_limited.push(version);
                    continue;
                }
                Err(e) => {
                    error!(version = %version, kind = %e.kind(), error = %e, "[SYNC][ERROR] Failed to list files");
                    return Err(e);
                }
            };

            let files: Vec<String> = paths
                .iter()
                .filter_map(|p| {
                    normalize_file(p, &self.config.path_prefix, &self.config.file_suffix).or_else(
                        || {
                            warn!(
                                version = %version,
                                file = %p,
                                suffix = %self.config.file_suffix,
                                "File does not end with the suffix, skipping"
                            );
                            None
                        },
                    )
                })
                .collect();

            info!(version = %version, files = files.len(), "[SYNC] Registering version");
            self.registry.upsert(version.clone(), files);
            report.added.push(version);
        }

        for version in removed_versions {
            self.registry.remove(&version);
            info!(version = %version, "[SYNC] Removed version no longer present remotely");
            report.removed.push(version);
        }

        Ok(report)
    }

    /// `(remote - registry, registry - remote)`. New versions keep provider order.
    fn diff(&self, remote: &[String]) -> (Vec<String>, Vec<String>) {
        let remote_set: HashSet<&str> = remote.iter().map(String::as_str).collect();

        let mut seen = HashSet::new();
        let new_versions = remote
            .iter()
            .filter(|v| seen.insert(v.as_str()) && !self.registry.contains(v.as_str()))
            .cloned()
            .collect();

        let removed_versions = self
            .registry
            .list_versions()
            .into_iter()
            .filter(|v| !remote_set.contains(v.as_str()))
            .collect();

        (new_versions, removed_versions)
    }
}

/// Map a remote path to its logical file name.
///
/// Strips `prefix` (when present) and any leading `/`, then `suffix`. Returns
/// `None` when the path does not carry the suffix or nothing is left of it.
pub fn normalize_file(path: &str, prefix: &str, suffix: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    let rest = rest.trim_start_matches('/');
    let name = rest.strip_suffix(suffix)?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_owned())
}
