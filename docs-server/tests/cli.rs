use std::fs;
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, NamedTempFile, TempDir};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, Registry};

/// A local mirror with two versions, plus a config pointing at it.
fn local_fixture(proxy: bool) -> (TempDir, NamedTempFile) {
    let root = tempdir().expect("temp dir");
    for (rel, content) in [
        ("v1.0.0/docs/api.json", "{\"v\":1}"),
        ("v1.1.0/docs/api.json", "{\"v\":2}"),
        ("v1.1.0/docs/v2/users.json", "{\"users\":[]}"),
        ("v1.1.0/docs/notes.txt", "skipped"),
    ] {
        let path = root.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let config = NamedTempFile::new().expect("temp config");
    fs::write(
        config.path(),
        format!(
            "log_level: warn\nprovider:\n  local:\n    root: {:?}\n    path_prefix: docs\n    file_suffix: .json\nserver:\n  poll_interval: 1s\n  proxy: {proxy}\n",
            root.path().display().to_string()
        ),
    )
    .expect("write config");
    (root, config)
}

fn docs_server() -> Command {
    let mut cmd = Command::cargo_bin("docs-server").expect("Binary exists");
    cmd.env_remove("RUST_LOG").env_remove("GITHUB_TOKEN");
    cmd
}

#[test]
fn snapshot_prints_registry_as_json() {
    let (_root, config) = local_fixture(false);

    docs_server()
        .arg("snapshot")
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"version\": \"v1.0.0\"")
                .and(predicate::str::contains("\"version\": \"v1.1.0\""))
                .and(predicate::str::contains("\"v2/users\""))
                .and(predicate::str::contains("notes").not()),
        );
}

#[test]
fn fetch_with_proxy_writes_file_content() {
    let (_root, config) = local_fixture(true);

    docs_server()
        .args(["fetch", "--config"])
        .arg(config.path())
        .args(["v1.1.0", "v2/users"])
        .assert()
        .success()
        .stdout("{\"users\":[]}");
}

#[test]
fn fetch_with_proxy_to_output_file() {
    let (_root, config) = local_fixture(true);
    let out = tempdir().unwrap();
    let target = out.path().join("api.json");

    docs_server()
        .args(["fetch", "--config"])
        .arg(config.path())
        .args(["v1.0.0", "api", "--output"])
        .arg(&target)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(target).unwrap(), "{\"v\":1}");
}

#[test]
fn fetch_without_proxy_prints_locator() {
    let (root, config) = local_fixture(false);
    let expected = root
        .path()
        .join("v1.0.0/docs/api.json")
        .display()
        .to_string();

    docs_server()
        .args(["fetch", "--config"])
        .arg(config.path())
        .args(["v1.0.0", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn fetch_unknown_file_fails() {
    let (_root, config) = local_fixture(true);

    docs_server()
        .args(["fetch", "--config"])
        .arg(config.path())
        .args(["v1.0.0", "users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch users at v1.0.0"));
}

#[test]
fn missing_config_fails() {
    docs_server()
        .args(["snapshot", "--config", "/definitely/not/here.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use docs_server::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Snapshot {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
