use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use statuswatch::config::WatchConfig;
use statuswatch::watch::SessionState;
use statuswatch::{StatusSnapshot, StatusSync};
use tokio::sync::watch;

const WAIT_LIMIT: Duration = Duration::from_secs(10);

struct TestWorkspace {
    root: PathBuf,
}

impl TestWorkspace {
    fn new(prefix: &str) -> Self {
        let root = unique_temp_dir(prefix);
        fs::create_dir_all(&root).expect("create workspace root");
        fs::write(root.join("README.md"), "watched repo\n").expect("write README");
        init_git_repo(&root, "initial");
        Self { root }
    }
}

impl Drop for TestWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn fast_config() -> WatchConfig {
    WatchConfig {
        quiet_period_ms: 100,
        ..WatchConfig::default()
    }
}

async fn wait_for<F>(
    snapshots: &mut watch::Receiver<Arc<StatusSnapshot>>,
    description: &str,
    predicate: F,
) -> Arc<StatusSnapshot>
where
    F: Fn(&StatusSnapshot) -> bool,
{
    let result = tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            {
                let current = snapshots.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            snapshots
                .changed()
                .await
                .expect("snapshot channel closed");
        }
    })
    .await;

    match result {
        Ok(snapshot) => snapshot,
        Err(_) => panic!(
            "timed out waiting for {description}; last snapshot: {:?}",
            snapshots.borrow()
        ),
    }
}

fn init_git_repo(repo_path: &Path, message: &str) {
    run_git(repo_path, &["init", "--quiet"]);
    run_git(repo_path, &["config", "user.name", "Statuswatch Test"]);
    run_git(
        repo_path,
        &["config", "user.email", "statuswatch-test@example.com"],
    );
    run_git(repo_path, &["add", "-A"]);
    run_git(repo_path, &["commit", "--quiet", "-m", message]);
}

fn run_git(repo_path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .expect("run git command");
    assert!(
        output.status.success(),
        "git command failed in {}: git {}\nstderr:\n{}",
        repo_path.display(),
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos();
    let pid = std::process::id();
    std::env::temp_dir().join(format!("statuswatch-{prefix}-{pid}-{nanos}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_file_flows_through_unstaged_staged_and_back() {
    let workspace = TestWorkspace::new("sync-flow");
    let sync = StatusSync::with_git(fast_config()).expect("create sync");
    let mut snapshots = sync.subscribe();

    sync.set_root(&workspace.root).expect("watch root");
    assert_eq!(sync.session_state(), SessionState::Active);
    sync.wait_idle().await;
    assert!(sync.snapshot().is_clean(), "{:?}", sync.snapshot());

    fs::write(workspace.root.join("a.txt"), "first\n").expect("write a.txt");
    let snapshot = wait_for(&mut snapshots, "a.txt to appear unstaged", |s| {
        s.is_unstaged("a.txt")
    })
    .await;
    assert!(!snapshot.is_staged("a.txt"));

    assert!(sync.stage("a.txt").await.expect("stage a.txt"));
    let snapshot = wait_for(&mut snapshots, "a.txt to become staged", |s| {
        s.is_staged("a.txt")
    })
    .await;
    assert!(!snapshot.is_unstaged("a.txt"));

    assert!(sync.unstage("a.txt").await.expect("unstage a.txt"));
    let snapshot = wait_for(&mut snapshots, "a.txt to return to unstaged", |s| {
        s.is_unstaged("a.txt") && !s.is_staged("a.txt")
    })
    .await;
    assert_eq!(
        snapshot.root.as_deref(),
        Some(fs::canonicalize(&workspace.root).expect("canonical root").as_path())
    );

    sync.clear_root();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleting_a_tracked_file_is_reported_as_unstaged() {
    let workspace = TestWorkspace::new("sync-delete");
    let sync = StatusSync::with_git(fast_config()).expect("create sync");
    let mut snapshots = sync.subscribe();

    sync.set_root(&workspace.root).expect("watch root");
    sync.wait_idle().await;

    fs::remove_file(workspace.root.join("README.md")).expect("remove README");
    wait_for(&mut snapshots, "README.md deletion", |s| {
        s.is_unstaged("README.md")
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ignored_paths_do_not_trigger_refresh() {
    let workspace = TestWorkspace::new("sync-ignore");
    let config = WatchConfig {
        ignore: vec!["**/*.log".to_string()],
        ..fast_config()
    };
    let sync = StatusSync::with_git(config).expect("create sync");

    sync.set_root(&workspace.root).expect("watch root");
    sync.wait_idle().await;
    let before = sync.snapshot().generation;

    fs::write(workspace.root.join("build.log"), "noise\n").expect("write log");
    tokio::time::sleep(Duration::from_millis(600)).await;
    sync.wait_idle().await;

    assert_eq!(sync.snapshot().generation, before);
    assert!(!sync.snapshot().is_unstaged("build.log"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_refresh_picks_up_external_git_changes() {
    let workspace = TestWorkspace::new("sync-manual");
    let sync = StatusSync::with_git(fast_config()).expect("create sync");

    sync.set_root(&workspace.root).expect("watch root");
    sync.wait_idle().await;

    fs::write(workspace.root.join("b.txt"), "external\n").expect("write b.txt");
    run_git(&workspace.root, &["add", "b.txt"]);
    sync.request_refresh();
    tokio::time::sleep(Duration::from_millis(50)).await;
    sync.wait_idle().await;

    let mut snapshots = sync.subscribe();
    wait_for(&mut snapshots, "b.txt to be staged", |s| s.is_staged("b.txt")).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn directory_without_repository_reports_refresh_failure() {
    let root = unique_temp_dir("sync-not-a-repo");
    fs::create_dir_all(&root).expect("create dir");
    let sync = StatusSync::with_git(fast_config()).expect("create sync");
    let mut notifications = sync.notifications();

    sync.set_root(&root).expect("plain directories can be watched");
    sync.wait_idle().await;

    let notification = tokio::time::timeout(WAIT_LIMIT, notifications.recv())
        .await
        .expect("refresh failure notification")
        .expect("notification channel open");
    assert!(
        matches!(notification, statuswatch::Notification::RefreshFailed { .. }),
        "{notification:?}"
    );
    assert!(sync.snapshot().is_clean());

    sync.clear_root();
    let _ = fs::remove_dir_all(&root);
}
