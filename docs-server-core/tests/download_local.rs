// Integration tests for the filesystem provider, including a full reconcile + proxy round.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docs_server_core::cache::ContentCache;
use docs_server_core::config::{ConfigError, ServerConfig};
use docs_server_core::contract::Provider;
use docs_server_core::error::ErrorKind;
use docs_server_core::local::{LocalConfig, LocalProvider};
use docs_server_core::registry::Registry;
use docs_server_core::service::DocsService;
use docs_server_core::synchronise::Reconciler;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn seed(root: &Path) {
    write(root, "v1.0.0/docs/api.json", "{\"v\":\"1.0.0\"}");
    write(root, "v1.0.0/docs/readme.md", "# readme");
    write(root, "v1.1.0/docs/api.json", "{\"v\":\"1.1.0\"}");
    write(root, "v1.1.0/docs/v2/users.json", "{}");
    write(root, "v1.1.0/src/lib.json", "{}");
    write(root, "not-a-version.txt", "ignored");
}

fn provider(root: &Path, max_versions: usize) -> LocalProvider {
    LocalProvider::new(LocalConfig {
        root: root.to_path_buf(),
        path_prefix: "docs/".into(),
        file_suffix: ".json".into(),
        max_versions,
    })
    .expect("valid config")
}

#[test]
fn test_new_requires_root() {
    let err = LocalProvider::new(LocalConfig::default()).err().expect("must fail");
    assert_eq!(err, ConfigError::MissingRoot);
}

#[tokio::test]
async fn test_list_versions_lists_directories_sorted_and_bounded() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    write(dir.path(), "v0.9.0/docs/api.json", "{}");

    let all = provider(dir.path(), 0).list_versions().await.unwrap();
    assert_eq!(all, vec!["v0.9.0", "v1.0.0", "v1.1.0"]);

    let bounded = provider(dir.path(), 2).list_versions().await.unwrap();
    assert_eq!(bounded, vec!["v0.9.0", "v1.0.0"]);
}

#[tokio::test]
async fn test_list_files_returns_matching_paths_under_prefix() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let provider = provider(dir.path(), 0);

    assert_eq!(
        provider.list_files("v1.1.0").await.unwrap(),
        vec!["docs/api.json", "docs/v2/users.json"]
    );

    let err = provider.list_files("v9.9.9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_download_file_and_not_found() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let provider = provider(dir.path(), 0);

    let data = provider.download_file("v1.0.0", "api").await.unwrap();
    assert_eq!(&data[..], b"{\"v\":\"1.0.0\"}");

    let err = provider.download_file("v1.0.0", "users").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.fields().get("file").map(String::as_str), Some("users"));

    let err = provider.download_file("..", "api").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_reconcile_and_proxy_against_local_tree() {
    let dir = tempdir().unwrap();
    seed(dir.path());

    let provider = Arc::new(provider(dir.path(), 0));
    let registry = Arc::new(Registry::new());
    let reconciler = Reconciler::new(
        provider.clone(),
        registry.clone(),
        ServerConfig::new(Duration::from_secs(60), "docs", ".json"),
    );

    reconciler.poll_once().await.expect("first cycle");
    assert_eq!(registry.list_versions(), vec!["v1.0.0", "v1.1.0"]);
    assert_eq!(registry.get("v1.0.0").unwrap().files, vec!["api"]);
    assert_eq!(registry.get("v1.1.0").unwrap().files, vec!["api", "v2/users"]);

    let service = DocsService::with_proxy(provider, registry.clone(), Arc::new(ContentCache::new()));
    let data = service.get_file("v1.1.0", "v2/users").await.expect("proxied file");
    assert_eq!(&data[..], b"{}");

    // A version deleted on disk disappears on the next cycle.
    fs::remove_dir_all(dir.path().join("v1.0.0")).unwrap();
    let report = reconciler.poll_once().await.expect("second cycle");
    assert_eq!(report.removed, vec!["v1.0.0"]);
    assert_eq!(service.get_versions(), vec!["v1.1.0"]);
}
