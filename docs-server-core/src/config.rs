//! Reconciler settings and the validation errors shared by every config source.
//!
//! [`ServerConfig`] holds the poll interval and the prefix/suffix used to map remote
//! paths to logical file names. Construction never fails: a zero interval becomes
//! [`DEFAULT_POLL_INTERVAL`] and the prefix is normalized to `dir/` form.
//!
//! Intervals come in as text (`15m`, `30s`, `250ms`, `2h`, bare seconds) and are
//! parsed by [`parse_interval`]. Provider constructors and the CLI loader report
//! bad input as [`ConfigError`].

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

/// Poll interval used when none (or zero) is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

static INTERVAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*(ms|s|m|h)?\s*$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing owner")]
    MissingOwner,
    #[error("missing repo")]
    MissingRepo,
    #[error("missing root directory")]
    MissingRoot,
    #[error("no provider configured")]
    NoProvider,
    #[error("more than one provider configured: {0}")]
    MultipleProviders(String),
    #[error("invalid poll interval {0:?}: expected <n>ms, <n>s, <n>m or <n>h")]
    InvalidInterval(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Settings for the reconciler: how often to poll and how remote paths map to
/// logical file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub poll_interval: Duration,
    /// Normalized to end in `/`, or empty.
    pub path_prefix: String,
    pub file_suffix: String,
}

impl ServerConfig {
    /// Build a validated config. A zero interval falls back to
    /// [`DEFAULT_POLL_INTERVAL`] and the prefix gets a trailing `/`.
    pub fn new(
        poll_interval: Duration,
        path_prefix: impl AsRef<str>,
        file_suffix: impl Into<String>,
    ) -> Self {
        let poll_interval = if poll_interval.is_zero() {
            info!(default = ?DEFAULT_POLL_INTERVAL, "No poll interval set, using default");
            DEFAULT_POLL_INTERVAL
        } else {
            poll_interval
        };

        Self {
            poll_interval,
            path_prefix: normalize_prefix(path_prefix.as_ref()),
            file_suffix: file_suffix.into(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            path_prefix = %self.path_prefix,
            file_suffix = %self.file_suffix,
            "Loaded server config"
        );
        debug!(?self, "Server config loaded (full debug)");
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Duration::ZERO, "", "")
    }
}

/// Normalize a path prefix to `dir/sub/` form. Empty stays empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if !prefix.ends_with('/') {
        debug!(prefix = %prefix, "Path prefix does not end with a slash, appending one");
    }
    format!("{trimmed}/")
}

/// Parse an interval such as `15m`, `30s`, `250ms`, `2h` or bare seconds (`900`).
///
/// An empty string parses to [`Duration::ZERO`], which [`ServerConfig::new`]
/// replaces with the default.
pub fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    if s.trim().is_empty() {
        return Ok(Duration::ZERO);
    }

    let caps = INTERVAL_REGEX
        .captures(s)
        .ok_or_else(|| ConfigError::InvalidInterval(s.to_owned()))?;
    let n: u64 = caps[1]
        .parse()
        .map_err(|_| ConfigError::InvalidInterval(s.to_owned()))?;

    let secs = |mul: u64| {
        n.checked_mul(mul)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::InvalidInterval(s.to_owned()))
    };

    match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => Ok(Duration::from_millis(n)),
        Some("s") | None => secs(1),
        Some("m") => secs(60),
        Some("h") => secs(3600),
        Some(_) => Err(ConfigError::InvalidInterval(s.to_owned())),
    }
}
