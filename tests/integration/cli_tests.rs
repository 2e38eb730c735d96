//! End-to-end tests of the `mcp-probe` binary.

use std::process::{Command, Output};

use serde_json::{json, Value};

use super::test_helpers::{FAILING_TOOL_SERVER, NOTEBOOK_SERVER};

fn run_probe(extra: &[&str], script: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mcp-probe"))
        .args(extra)
        .args(["--timeout-secs", "20", "--", "sh", "-c", script])
        .env("RUST_LOG", "debug")
        .output()
        .expect("run mcp-probe")
}

#[test]
fn binary_prints_tool_response_to_stdout() {
    let output = run_probe(&[], NOTEBOOK_SERVER);

    assert!(output.status.success(), "exit status: {:?}", output.status);
    assert_eq!(
        String::from_utf8(output.stdout).expect("utf8"),
        "{\n  \"jsonrpc\": \"2.0\",\n  \"id\": 2,\n  \"result\": {\n    \"notebooks\": []\n  }\n}\n"
    );
}

#[test]
fn logs_stay_off_stdout() {
    let output = run_probe(&["--log-format", "json"], NOTEBOOK_SERVER);

    assert!(output.status.success());
    let printed: Value = serde_json::from_slice(&output.stdout).expect("stdout is one JSON doc");
    assert_eq!(printed["id"], json!(2));
    assert!(!output.stderr.is_empty(), "logs go to stderr");
}

#[test]
fn tool_name_and_arguments_come_from_flags() {
    let script = r#"
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*) printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{}}' ;;
    *'"method":"tools/call"'*) printf '{"jsonrpc":"2.0","id":2,"result":{"seen":%s}}\n' "$line" ;;
  esac
done
"#;
    let output = run_probe(
        &["--tool", "notebook_get", "--arguments", r#"{"id":"nb-1"}"#],
        script,
    );

    assert!(output.status.success());
    let printed: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(
        printed["result"]["seen"]["params"],
        json!({"name": "notebook_get", "arguments": {"id": "nb-1"}})
    );
}

#[test]
fn error_response_exits_successfully() {
    let output = run_probe(&[], FAILING_TOOL_SERVER);

    assert!(output.status.success());
    let printed: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(printed["error"]["message"], json!("Unknown tool"));
}

#[test]
fn non_object_arguments_are_rejected_by_cli() {
    let output = run_probe(&["--arguments", "[1,2]"], NOTEBOOK_SERVER);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_server_fails_with_nonzero_exit() {
    let output = Command::new(env!("CARGO_BIN_EXE_mcp-probe"))
        .args(["--", "/nonexistent/mcp-probe-test-server"])
        .output()
        .expect("run mcp-probe");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Launch"));
}

#[test]
fn overlong_output_line_is_skipped_under_line_limit() {
    let script = r#"
noise=$(printf '%0300d' 0)
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' "$noise"
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{}}'
      ;;
    *'"method":"tools/call"'*) printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"ok":true}}' ;;
  esac
done
"#;
    let output = run_probe(&["--max-line-bytes", "128"], script);

    assert!(output.status.success(), "exit status: {:?}", output.status);
    let printed: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(printed["result"], json!({"ok": true}));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line exceeds limit"), "drop is logged: {stderr}");
}
