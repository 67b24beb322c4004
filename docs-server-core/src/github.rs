//! GitHub-backed [`Provider`]: tags are versions, blobs under the path prefix are files.
//!
//! - Versions: `GET /repos/{owner}/{repo}/tags?per_page={max_tags}`
//! - Files: `GET /repos/{owner}/{repo}/git/trees/{version}?recursive=1`
//! - Content: the raw host, `{raw}/{owner}/{repo}/{version}/{prefix}/{file}{suffix}`
//!
//! Throttling responses (403/429 with an exhausted quota or a `retry-after`
//! header) become [`ErrorKind::RateLimited`](crate::error::ErrorKind::RateLimited)
//! carrying the quota headers as diagnostic fields.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::contract::Provider;
use crate::error::ProviderError;

pub const DEFAULT_MAX_TAGS: usize = 10;
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_RAW_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("docs-server/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub file_suffix: String,
    /// Upper bound on listed tags. `0` means [`DEFAULT_MAX_TAGS`].
    #[serde(default)]
    pub max_tags: usize,
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    /// Override for GitHub Enterprise or tests.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
    /// Upper bound on a whole request, body included. `0` means
    /// [`DEFAULT_REQUEST_TIMEOUT_SECS`].
    #[serde(default)]
    pub request_timeout_secs: u64,
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("path_prefix", &self.path_prefix)
            .field("file_suffix", &self.file_suffix)
            .field("max_tags", &self.max_tags)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("raw_url", &self.raw_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Tree {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// One entry of a git tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

pub struct GithubProvider {
    client: Client,
    cfg: GithubConfig,
    api_url: String,
    raw_root: String,
}

impl GithubProvider {
    pub fn new(mut cfg: GithubConfig) -> Result<Self, ConfigError> {
        if cfg.owner.is_empty() {
            return Err(ConfigError::MissingOwner);
        }
        if cfg.repo.is_empty() {
            return Err(ConfigError::MissingRepo);
        }

        cfg.path_prefix = cfg.path_prefix.trim_matches('/').to_owned();

        if cfg.max_tags == 0 {
            info!(default = DEFAULT_MAX_TAGS, "Max tags not set, using default");
            cfg.max_tags = DEFAULT_MAX_TAGS;
        }

        if cfg.request_timeout_secs == 0 {
            cfg.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }

        let api_url = cfg
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_owned();
        let raw_url = cfg
            .raw_url
            .as_deref()
            .unwrap_or(DEFAULT_RAW_URL)
            .trim_end_matches('/');
        let raw_root = format!("{}/{}/{}", raw_url, cfg.owner, cfg.repo);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        info!(
            owner = %cfg.owner,
            repo = %cfg.repo,
            path_prefix = %cfg.path_prefix,
            file_suffix = %cfg.file_suffix,
            max_tags = cfg.max_tags,
            request_timeout_secs = cfg.request_timeout_secs,
            authenticated = cfg.auth_token.is_some(),
            "Initialized GitHub provider"
        );

        Ok(Self {
            client,
            cfg,
            api_url,
            raw_root,
        })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.cfg
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let req = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.cfg.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ProviderError> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(error_for_status(resp.status(), resp.headers()))
    }
}

#[async_trait]
impl Provider for GithubProvider {
    async fn list_versions(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!(
            "{}/repos/{}/{}/tags?per_page={}",
            self.api_url, self.cfg.owner, self.cfg.repo, self.cfg.max_tags
        );
        debug!(url = %url, "Listing tags");

        let tags: Vec<Tag> = self.send(self.get(&url)).await?.json().await?;
        Ok(tags
            .into_iter()
            .take(self.cfg.max_tags)
            .map(|t| t.name)
            .collect())
    }

    async fn list_files(&self, version: &str) -> Result<Vec<String>, ProviderError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_url, self.cfg.owner, self.cfg.repo, version
        );
        debug!(url = %url, version = %version, "Listing tree");

        let tree: Tree = self.send(self.get(&url)).await?.json().await?;
        if tree.truncated {
            warn!(version = %version, "Tree listing was truncated by GitHub, some files may be missing");
        }

        Ok(select_blobs(
            &tree.tree,
            &self.cfg.path_prefix,
            &self.cfg.file_suffix,
        ))
    }

    fn get_path(&self, version: &str, file: &str) -> String {
        if self.cfg.path_prefix.is_empty() {
            format!(
                "{}/{}/{}{}",
                self.raw_root, version, file, self.cfg.file_suffix
            )
        } else {
            format!(
                "{}/{}/{}/{}{}",
                self.raw_root, version, self.cfg.path_prefix, file, self.cfg.file_suffix
            )
        }
    }

    async fn download_file(&self, version: &str, file: &str) -> Result<Bytes, ProviderError> {
        let url = self.get_path(version, file);
        debug!(url = %url, "Downloading file");

        let mut req = self.client.get(&url);
        if let Some(token) = &self.cfg.auth_token {
            req = req.bearer_auth(token);
        }

        match self.send(req).await {
            Ok(resp) => Ok(resp.bytes().await?),
            Err(e) if e.is_not_found() => Err(ProviderError::not_found("not found")
                .with_field("version", version)
                .with_field("file", file)),
            Err(e) => Err(e),
        }
    }
}

/// Blob paths under `prefix` (a directory, no trailing `/`) that end in `suffix`.
///
/// Blobs under the prefix without the suffix are logged and skipped.
pub fn select_blobs(entries: &[TreeEntry], prefix: &str, suffix: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.kind == "blob")
        .filter(|e| {
            prefix.is_empty()
                || e.path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .filter(|e| {
            if e.path.ends_with(suffix) {
                return true;
            }
            warn!(file = %e.path, suffix = %suffix, "File does not end with the suffix, skipping");
            false
        })
        .map(|e| e.path.clone())
        .collect()
}

/// Classify a non-success GitHub response.
pub fn error_for_status(status: StatusCode, headers: &HeaderMap) -> ProviderError {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        if header("x-ratelimit-remaining").as_deref() == Some("0") {
            return ProviderError::rate_limited("rate limit reached")
                .with_field("limit", header("x-ratelimit-limit").unwrap_or_default())
                .with_field("reset", header("x-ratelimit-reset").unwrap_or_default());
        }
        if let Some(retry_after) = header("retry-after") {
            return ProviderError::rate_limited("secondary rate limit reached")
                .with_field("retry_after", retry_after);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return ProviderError::rate_limited("rate limit reached");
        }
    }

    if status == StatusCode::NOT_FOUND {
        return ProviderError::not_found("not found").with_field("status", status.as_u16());
    }

    ProviderError::other("unexpected status code").with_field("status", status.as_u16())
}
