//! Integration tests for the `ServerProcess` harness against `sh` mocks.

use std::time::Duration;

use serde_json::json;

use mcp_probe::config::{ServerConfig, StderrMode};
use mcp_probe::stdio::spawner::ServerProcess;
use mcp_probe::AppError;

use super::test_helpers::{sh_server, wait_for_contents, ECHO_SERVER, TEST_DEADLINE};

#[tokio::test]
async fn missing_executable_is_launch_error() {
    let config = ServerConfig {
        command: "/nonexistent/mcp-probe-test-server".to_owned(),
        args: Vec::new(),
        stderr: StderrMode::Piped,
        ..ServerConfig::default()
    };

    match ServerProcess::start(&config) {
        Err(AppError::Launch(msg)) => assert!(msg.contains("failed to spawn server")),
        other => panic!("expected AppError::Launch, got: {other:?}"),
    }
}

/// Lines written by `send` reach the server intact: the echo server sends
/// each one back and it parses to the same message.
#[tokio::test]
async fn sent_lines_round_trip_through_echo_server() {
    let mut server = ServerProcess::start(&sh_server(ECHO_SERVER)).expect("start");

    server
        .send("tools/call", Some(json!({"name": "echo", "arguments": {}})), Some(7))
        .await
        .expect("send");

    let echoed = tokio::time::timeout(TEST_DEADLINE, server.receive())
        .await
        .expect("echo within deadline")
        .expect("receive");

    assert_eq!(
        echoed,
        Some(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {}},
            "id": 7
        }))
    );

    server.shutdown().expect("shutdown");
}

/// A server whose stdout closes right away yields "no result".
#[tokio::test]
async fn stdout_closed_at_spawn_yields_no_result() {
    let mut server = ServerProcess::start(&sh_server("exit 0")).expect("start");

    let result = tokio::time::timeout(TEST_DEADLINE, server.receive())
        .await
        .expect("receive must not block after EOF")
        .expect("receive");

    assert!(result.is_none());
    server.shutdown().expect("shutdown of exited server");
}

/// Noise-only output followed by exit also yields "no result".
#[tokio::test]
async fn noise_then_exit_yields_no_result() {
    let script = "echo 'Server started'; echo 'not json {'; echo '{\"msg\":1}'";
    let mut server = ServerProcess::start(&sh_server(script)).expect("start");

    let result = tokio::time::timeout(TEST_DEADLINE, server.receive())
        .await
        .expect("receive must finish")
        .expect("receive");

    assert!(result.is_none());
}

#[tokio::test]
async fn silent_server_hits_receive_timeout() {
    let mut server = ServerProcess::start(&sh_server("sleep 30"))
        .expect("start")
        .with_receive_timeout(Some(Duration::from_millis(200)));

    match server.receive().await {
        Err(AppError::Timeout(msg)) => assert!(msg.contains("no response")),
        other => panic!("expected AppError::Timeout, got: {other:?}"),
    }

    server.shutdown().expect("shutdown");
}

#[tokio::test]
async fn send_after_close_input_is_protocol_error() {
    let mut server = ServerProcess::start(&sh_server(ECHO_SERVER)).expect("start");
    server.close_input();

    let result = server.send("ping", None, Some(1)).await;
    assert!(matches!(result, Err(AppError::Protocol(_))));

    // The echo loop sees EOF on stdin and exits, closing stdout.
    let tail = tokio::time::timeout(TEST_DEADLINE, server.receive())
        .await
        .expect("receive must finish")
        .expect("receive");
    assert!(tail.is_none());
}

#[tokio::test]
async fn request_ids_are_sequential_from_one() {
    let mut server = ServerProcess::start(&sh_server(ECHO_SERVER)).expect("start");

    assert_eq!(server.next_request_id(), 1);
    assert_eq!(server.next_request_id(), 2);
    assert_eq!(server.next_request_id(), 3);

    server.shutdown().expect("shutdown");
}

/// After shutdown the server reads EOF on stdin and receives SIGTERM: the
/// trap only logs once `cat` has drained stdin to EOF.
#[tokio::test]
async fn shutdown_closes_stdin_and_delivers_sigterm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("signals.log");
    let script = format!(
        r#"
trap 'cat > /dev/null; echo term >> {log}; kill "$sleeper" 2>/dev/null; exit 0' TERM
sleep 30 &
sleeper=$!
printf '%s\n' '{{"jsonrpc":"2.0","method":"ready"}}'
wait
"#,
        log = log.display()
    );
    let mut server = ServerProcess::start(&sh_server(&script)).expect("start");

    let ready = tokio::time::timeout(TEST_DEADLINE, server.receive())
        .await
        .expect("ready within deadline")
        .expect("receive");
    assert_eq!(ready, Some(json!({"jsonrpc": "2.0", "method": "ready"})));

    server.shutdown().expect("shutdown");

    let contents = wait_for_contents(&log, "term").await;
    assert_eq!(contents.trim(), "term", "trap must run once after stdin EOF");
}

/// A server that keeps running is actually gone after shutdown.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn shutdown_terminates_running_server() {
    let server = ServerProcess::start(&sh_server("exec sleep 30")).expect("start");
    let pid = server.id().expect("running server has a pid");

    server.shutdown().expect("shutdown");

    assert!(
        super::test_helpers::wait_for_exit(pid).await,
        "server {pid} still running after shutdown"
    );
}

/// Dropping the harness without shutdown still releases the process.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropped_harness_kills_server() {
    let server = ServerProcess::start(&sh_server("trap '' TERM; exec sleep 30")).expect("start");
    let pid = server.id().expect("running server has a pid");

    drop(server);

    assert!(
        super::test_helpers::wait_for_exit(pid).await,
        "server {pid} still running after drop"
    );
}
