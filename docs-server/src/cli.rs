///
/// This module implements the CLI interface for docs-server: command parsing,
/// wiring a provider, registry, reconciler and docs service together, and the
/// user-visible invocations.
///
/// All reconciliation logic (provider contract, registry, poll loop, cache) lives
/// in the [`docs-server-core`] crate. This module is strictly glue.
///
/// ## Commands
/// - `run`: poll until Ctrl-C/SIGTERM or a fatal provider error. After the first
///   signal the reconciler gets [`SHUTDOWN_GRACE`] to stop; a second signal exits
///   immediately
/// - `snapshot`: one cycle, then print the registry as JSON
/// - `fetch`: one cycle, then fetch a single file through the proxy path, or
///   print its remote locator when `server.proxy` is off
///
/// For programmatic/integration use, call [`run`] with a constructed [`Cli`].
///
/// [`docs-server-core`]: ../../docs-server-core/
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docs_server_core::cache::ContentCache;
use docs_server_core::contract::Provider;
use docs_server_core::error::ProviderError;
use docs_server_core::registry::{DocumentationEntry, Registry};
use docs_server_core::service::DocsService;
use docs_server_core::synchronise::{CycleReport, Reconciler};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::load_config::{load_config, CliConfig};

/// How long `run` waits for the reconciler after the first shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// CLI for docs-server: mirror versioned documentation from a remote repository.
#[derive(Parser)]
#[clap(
    name = "docs-server",
    version,
    about = "Mirror versioned documentation from GitHub tags or a local tree into a live registry"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep the registry in sync until interrupted
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Run a single reconciliation cycle and print the registry as JSON
    Snapshot {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Run a single reconciliation cycle, then fetch one file through the proxy
    Fetch {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Version to read from, e.g. a tag name
        version: String,
        /// Logical file name, without prefix or suffix
        file: String,
        /// Write the file here instead of stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub fn config_path(&self) -> &PathBuf {
        match self {
            Commands::Run { config }
            | Commands::Snapshot { config }
            | Commands::Fetch { config, .. } => config,
        }
    }
}

/// JSON printed by `snapshot`.
#[derive(Serialize)]
struct Snapshot<'a> {
    report: &'a CycleReport,
    versions: Vec<DocumentationEntry>,
}

struct Runtime {
    provider: Arc<dyn Provider>,
    reconciler: Reconciler<dyn Provider>,
    proxy: bool,
}

fn build_runtime(config: CliConfig) -> Result<Runtime> {
    let provider_name = config.provider.name();
    config.server.trace_loaded();

    let provider = config
        .provider
        .build()
        .with_context(|| format!("Failed to build {provider_name} provider"))?;
    let registry = Arc::new(Registry::new());
    let reconciler = Reconciler::new(provider.clone(), registry, config.server);

    tracing::info!(provider = provider_name, proxy = config.proxy, "Runtime assembled");
    Ok(Runtime {
        provider,
        reconciler,
        proxy: config.proxy,
    })
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config } => {
            let runtime = build_runtime(load_config(config)?)?;
            tracing::info!(
                command = "run",
                poll_interval = ?runtime.reconciler.config().poll_interval,
                "Starting reconciler"
            );

            let shutdown = CancellationToken::new();
            run_until_shutdown(
                runtime.reconciler.run(shutdown.clone()),
                shutdown,
                shutdown_signal,
                SHUTDOWN_GRACE,
            )
            .await
        }
        Commands::Snapshot { config } => {
            let runtime = build_runtime(load_config(config)?)?;
            let report = runtime
                .reconciler
                .poll_once()
                .await
                .context("Reconciliation failed")?;
            tracing::info!(command = "snapshot", ?report, "Cycle complete");

            let snapshot = Snapshot {
                report: &report,
                versions: runtime
                    .reconciler
                    .registry()
                    .snapshot()
                    .into_iter()
                    .map(Arc::unwrap_or_clone)
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Commands::Fetch {
            config,
            version,
            file,
            output,
        } => {
            let runtime = build_runtime(load_config(config)?)?;
            runtime
                .reconciler
                .poll_once()
                .await
                .context("Reconciliation failed")?;

            let service = if runtime.proxy {
                DocsService::with_proxy(
                    runtime.provider,
                    runtime.reconciler.registry().clone(),
                    Arc::new(ContentCache::new()),
                )
            } else {
                DocsService::new(runtime.provider, runtime.reconciler.registry().clone())
            };

            // Without the proxy, clients link to the remote locator directly.
            if !service.proxy_enabled() {
                let entry = service
                    .get_version(&version)
                    .with_context(|| format!("Unknown version {version}"))?;
                anyhow::ensure!(entry.has_file(&file), "Unknown file {file} at {version}");
                println!("{}", service.path(&version, &file));
                return Ok(());
            }

            tracing::info!(command = "fetch", version = %version, file = %file, "Fetching file");
            let data = service
                .get_file(&version, &file)
                .await
                .with_context(|| format!("Failed to fetch {file} at {version}"))?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)
                        .with_context(|| format!("Failed to write {path:?}"))?;
                    tracing::info!(command = "fetch", output = ?path, bytes = data.len(), "File written");
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&data)?;
                    stdout.flush()?;
                }
            }
            Ok(())
        }
    }
}

/// Drive the reconciler future `task` until it returns.
///
/// The first completion of `signal` cancels `shutdown`, then `task` has `grace` to
/// return. A second signal, or the grace period running out, gives up on it.
pub async fn run_until_shutdown<T, S, F>(
    task: T,
    shutdown: CancellationToken,
    mut signal: S,
    grace: Duration,
) -> Result<()>
where
    T: Future<Output = Result<(), ProviderError>>,
    S: FnMut() -> F,
    F: Future<Output = ()>,
{
    tokio::pin!(task);

    let result = tokio::select! {
        res = &mut task => res,
        _ = signal() => {
            tracing::info!(grace = ?grace, "Shutdown signal received, stopping reconciler");
            shutdown.cancel();
            tokio::select! {
                res = &mut task => res,
                _ = signal() => {
                    tracing::warn!("Second shutdown signal received, forcing exit");
                    anyhow::bail!("Forced exit on second shutdown signal");
                }
                _ = tokio::time::sleep(grace) => {
                    tracing::error!(grace = ?grace, "Reconciler did not stop in time");
                    anyhow::bail!("Reconciler did not stop within {grace:?}");
                }
            }
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(command = "run", "Reconciler stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "run", kind = %e.kind(), error = %e, "Reconciler failed");
            Err(anyhow::Error::new(e).context("Reconciliation failed"))
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
