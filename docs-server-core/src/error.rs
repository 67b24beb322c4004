//! Provider error classification.
//!
//! Every provider returns [`ProviderError`], which carries an [`ErrorKind`] so the
//! reconciler and the proxy path can branch on "rate limited", "not found" or
//! "anything else" without knowing which backend produced the error. Diagnostic
//! key/value pairs (remaining quota, reset time, HTTP status, ...) travel with the
//! error and are rendered after the message, e.g.
//! `rate limit reached limit=60 reset=1718000000`.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Boxed error used for wrapped transport/IO causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How a provider failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote throttled the request. Transient: skip and retry on the next cycle.
    RateLimited,
    /// The requested version or file does not exist remotely.
    NotFound,
    /// Any other failure. Fatal for the reconciler.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::NotFound => "not found",
            ErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("{message}{}", render_fields(.fields))]
pub struct ProviderError {
    kind: ErrorKind,
    message: String,
    fields: BTreeMap<String, String>,
    #[source]
    source: Option<BoxError>,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: BTreeMap::new(),
            source: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    /// Attach a diagnostic field. A repeated key overwrites the earlier value.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Diagnostic fields, ordered by key.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        };
        ProviderError::new(kind, e.to_string()).with_source(e)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let mut err = ProviderError::other(format!("request failed: {e}"));
        if let Some(status) = e.status() {
            err = err.with_field("status", status.as_u16());
        }
        if e.is_timeout() {
            err = err.with_field("timeout", true);
        }
        err.with_source(e)
    }
}

fn render_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!(" {k}={v}"))
        .collect()
}
