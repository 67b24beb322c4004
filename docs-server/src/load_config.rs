/// `load_config` module: loads the static YAML config, injects secrets from the
/// environment and resolves it into the typed settings the CLI wires together.
///
/// This is the only place where untrusted YAML is parsed.
///
/// # Responsibilities
/// - Parse the YAML file into intermediate (YAML-side) structs
/// - Require exactly one `provider` section (`github` or `local`)
/// - Take `GITHUB_TOKEN` from the environment when no token is set in the file
/// - Turn `server.poll_interval` into a [`ServerConfig`] sharing the provider's
///   prefix and suffix, so listed paths and logical names line up
///
/// # Errors
/// Everything surfaces as `anyhow::Error` with the config path in context.
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docs_server_core::config::{parse_interval, ConfigError, ServerConfig};
use docs_server_core::contract::Provider;
use docs_server_core::github::{GithubConfig, GithubProvider};
use docs_server_core::local::{LocalConfig, LocalProvider};
use serde::Deserialize;
use tracing::{error, info, warn};

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Resolved configuration, ready to build the runtime from.
#[derive(Debug)]
pub struct CliConfig {
    pub log_level: String,
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub proxy: bool,
}

/// The one configured backend.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Github(GithubConfig),
    Local(LocalConfig),
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Github(_) => "github",
            ProviderConfig::Local(_) => "local",
        }
    }

    pub fn path_prefix(&self) -> &str {
        match self {
            ProviderConfig::Github(c) => &c.path_prefix,
            ProviderConfig::Local(c) => &c.path_prefix,
        }
    }

    pub fn file_suffix(&self) -> &str {
        match self {
            ProviderConfig::Github(c) => &c.file_suffix,
            ProviderConfig::Local(c) => &c.file_suffix,
        }
    }

    pub fn build(self) -> Result<Arc<dyn Provider>, ConfigError> {
        let provider: Arc<dyn Provider> = match self {
            ProviderConfig::Github(c) => Arc::new(GithubProvider::new(c)?),
            ProviderConfig::Local(c) => Arc::new(LocalProvider::new(c)?),
        };
        Ok(provider)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    log_level: Option<String>,
    provider: ProviderSection,
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSection {
    #[serde(default)]
    github: Option<GithubConfig>,
    #[serde(default)]
    local: Option<LocalConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    #[serde(default)]
    poll_interval: Option<RawInterval>,
    #[serde(default)]
    proxy: bool,
}

// `poll_interval: 900` arrives as a number, `poll_interval: 15m` as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Seconds(u64),
    Text(String),
}

impl RawInterval {
    fn parse(&self) -> Result<Duration, ConfigError> {
        match self {
            RawInterval::Seconds(n) => Ok(Duration::from_secs(*n)),
            RawInterval::Text(s) => parse_interval(s),
        }
    }
}

/// Loads a static YAML config file and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    resolve(raw).with_context(|| format!("Invalid config in {path_ref:?}"))
}

/// Read only `log_level` from the config file, for setting up tracing before the
/// full load. Any failure yields `None`; [`load_config`] reports it properly later.
pub fn peek_log_level<P: AsRef<Path>>(path: P) -> Option<String> {
    #[derive(Deserialize)]
    struct LogOnly {
        log_level: Option<String>,
    }

    let content = fs::read_to_string(path).ok()?;
    serde_yaml::from_str::<LogOnly>(&content).ok()?.log_level
}

fn resolve(raw: RawConfig) -> Result<CliConfig, ConfigError> {
    let mut provider = match (raw.provider.github, raw.provider.local) {
        (Some(github), None) => ProviderConfig::Github(github),
        (None, Some(local)) => ProviderConfig::Local(local),
        (None, None) => return Err(ConfigError::NoProvider),
        (Some(_), Some(_)) => {
            return Err(ConfigError::MultipleProviders("github, local".to_owned()))
        }
    };

    if let ProviderConfig::Github(github) = &mut provider {
        if github.auth_token.is_none() {
            match std::env::var(GITHUB_TOKEN_ENV) {
                Ok(token) if !token.is_empty() => {
                    info!(env = GITHUB_TOKEN_ENV, "Using GitHub token from environment");
                    github.auth_token = Some(token);
                }
                _ => warn!(
                    env = GITHUB_TOKEN_ENV,
                    "No GitHub token configured, requests are unauthenticated and heavily rate limited"
                ),
            }
        }
    }

    let poll_interval = match &raw.server.poll_interval {
        Some(interval) => interval.parse()?,
        None => Duration::ZERO,
    };
    let server = ServerConfig::new(poll_interval, provider.path_prefix(), provider.file_suffix());

    Ok(CliConfig {
        log_level: raw
            .log_level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
        provider,
        server,
        proxy: raw.server.proxy,
    })
}
