//! Filesystem-backed [`Provider`].
//!
//! Layout: every directory directly under `root` is a version; documentation files
//! live under `<root>/<version>/<path_prefix>`. Useful for mirroring an exported
//! checkout and for running the server without network access.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::contract::Provider;
use crate::error::ProviderError;

pub const DEFAULT_MAX_VERSIONS: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub file_suffix: String,
    /// Upper bound on listed versions. `0` means [`DEFAULT_MAX_VERSIONS`].
    #[serde(default)]
    pub max_versions: usize,
}

pub struct LocalProvider {
    cfg: LocalConfig,
}

impl LocalProvider {
    pub fn new(mut cfg: LocalConfig) -> Result<Self, ConfigError> {
        if cfg.root.as_os_str().is_empty() {
            return Err(ConfigError::MissingRoot);
        }
        cfg.path_prefix = cfg.path_prefix.trim_matches('/').to_owned();
        if cfg.max_versions == 0 {
            info!(default = DEFAULT_MAX_VERSIONS, "Max versions not set, using default");
            cfg.max_versions = DEFAULT_MAX_VERSIONS;
        }

        info!(
            root = %cfg.root.display(),
            path_prefix = %cfg.path_prefix,
            file_suffix = %cfg.file_suffix,
            max_versions = cfg.max_versions,
            "Initialized local provider"
        );
        Ok(Self { cfg })
    }

    fn docs_dir(&self, version: &str) -> PathBuf {
        let dir = self.cfg.root.join(version);
        if self.cfg.path_prefix.is_empty() {
            dir
        } else {
            dir.join(&self.cfg.path_prefix)
        }
    }
}

#[async_trait]
impl Provider for LocalProvider {
    async fn list_versions(&self) -> Result<Vec<String>, ProviderError> {
        let mut dir = tokio::fs::read_dir(&self.cfg.root).await?;
        let mut versions = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                versions.push(name.to_owned());
            }
        }
        versions.sort();
        versions.truncate(self.cfg.max_versions);
        Ok(versions)
    }

    async fn list_files(&self, version: &str) -> Result<Vec<String>, ProviderError> {
        if !is_plain(version) {
            return Err(ProviderError::not_found("invalid version").with_field("version", version));
        }

        let base = self.cfg.root.join(version);
        if !tokio::fs::try_exists(&base).await? {
            return Err(ProviderError::not_found("version not found").with_field("version", version));
        }

        let docs = self.docs_dir(version);
        if !tokio::fs::try_exists(&docs).await? {
            debug!(version = %version, dir = %docs.display(), "No documentation directory");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![docs];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(rel) = relative_slash_path(&base, &path) else {
                    continue;
                };
                if rel.ends_with(&self.cfg.file_suffix) {
                    files.push(rel);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn get_path(&self, version: &str, file: &str) -> String {
        let mut path = self.docs_dir(version);
        path.push(format!("{}{}", file, self.cfg.file_suffix));
        path.display().to_string()
    }

    async fn download_file(&self, version: &str, file: &str) -> Result<Bytes, ProviderError> {
        if !is_plain(version) || !is_plain(file) {
            return Err(ProviderError::not_found("invalid path")
                .with_field("version", version)
                .with_field("file", file));
        }

        let path = self.get_path(version, file);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) => Err(ProviderError::from(e)
                .with_field("version", version)
                .with_field("file", file)),
        }
    }
}

// Rejects absolute paths and `..` so lookups stay under the root.
fn is_plain(segment: &str) -> bool {
    !segment.is_empty()
        && Path::new(segment)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
