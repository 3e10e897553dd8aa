#![cfg(unix)]

use catalina_runner::error::Error;
use catalina_runner::launch::LaunchSpec;
use catalina_runner::server::{
    ChannelSink, EventKind, LaunchStatus, OutputClassifier, ServerProcess,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A launch spec that runs a shell script instead of a JVM.
fn shell_spec(dir: &Path, script: &str) -> LaunchSpec {
    LaunchSpec {
        java: PathBuf::from("/bin/sh"),
        working_dir: dir.to_path_buf(),
        classpath: Vec::new(),
        vm_options: Vec::new(),
        env: HashMap::new(),
        main_class: String::new(),
        program_args: vec!["-c".to_string(), script.to_string()],
        pass_parent_env: true,
    }
}

#[tokio::test]
async fn test_start_and_wait() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), "exit 0"));

    assert_eq!(server.status(), LaunchStatus::NotStarted);
    server.start().await.unwrap();
    assert_eq!(server.status(), LaunchStatus::Running);

    let code = server.wait().await.unwrap();
    assert_eq!(code, Some(0));
    assert_eq!(server.status(), LaunchStatus::Terminated);
}

#[tokio::test]
async fn test_nonzero_exit_is_an_observation_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), "exit 3"));

    server.start().await.unwrap();
    let code = server.wait().await.unwrap();
    assert_eq!(code, Some(3));
}

#[tokio::test]
async fn test_output_is_drained_without_a_sink() {
    let dir = tempfile::tempdir().unwrap();
    let script = "echo line one; echo line two >&2; exit 0";
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), script));

    server.start().await.unwrap();
    assert_eq!(server.wait().await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_start_twice_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), "sleep 10"));

    server.start().await.unwrap();
    let result = server.start().await;
    assert!(matches!(result, Err(Error::AlreadyRunning)));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_before_start_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), "exit 0"));

    assert!(matches!(server.stop().await, Err(Error::NotRunning)));
    assert!(matches!(server.wait().await, Err(Error::NotRunning)));
}

#[tokio::test]
async fn test_stop_terminates_long_running_process() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), "sleep 30"));

    server.start().await.unwrap();
    let code = server.stop().await.unwrap();

    assert_eq!(server.status(), LaunchStatus::Terminated);
    // Died on the soft signal; some shells report 128+15 instead.
    assert!(code.is_none() || code == Some(143));
}

#[tokio::test]
async fn test_output_lines_reach_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let (sink, mut receiver) = ChannelSink::channel();
    let classifier = Arc::new(OutputClassifier::new("app:war exploded"));
    let script = "echo 'Server startup in 1534 ms'; echo 'WARNING: low disk space' >&2";
    let mut server = ServerProcess::new("app".to_string(), shell_spec(dir.path(), script))
        .with_sink(Arc::new(sink), classifier);

    server.start().await.unwrap();
    server.wait().await.unwrap();

    // The reader tasks run concurrently with wait(), so events arrive in no
    // fixed order relative to the Terminated event.
    let mut saw_startup = false;
    let mut saw_warning = false;
    let mut saw_terminated = false;
    while !(saw_startup && saw_warning && saw_terminated) {
        let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event channel closed early");
        match event.kind {
            EventKind::StartupComplete { duration_ms } => {
                assert_eq!(duration_ms, 1534);
                saw_startup = true;
            }
            EventKind::Warning { .. } => saw_warning = true,
            EventKind::Terminated { exit_code } => {
                assert_eq!(exit_code, Some(0));
                saw_terminated = true;
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_each_supervisor_gets_its_own_id() {
    let dir = tempfile::tempdir().unwrap();
    let a = ServerProcess::new("a".to_string(), shell_spec(dir.path(), "exit 0"));
    let b = ServerProcess::new("b".to_string(), shell_spec(dir.path(), "exit 0"));

    assert_ne!(a.id(), b.id());
    assert_eq!(a.name(), "a");
}
