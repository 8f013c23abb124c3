// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared black-box test harness: spawns the real `bpd` binary against a
//! scratch state directory and drives it over HTTP, the way the teacher's
//! own integration tests spawn its CLI binary and assert on its output —
//! except the surface under test here is the wire, not a terminal.

use std::io::Write;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tempfile::TempDir;

/// Locates a sibling workspace binary. `CARGO_BIN_EXE_<name>` only resolves
/// binaries belonging to the crate under test, so the root `bp-specs`
/// package (whose only job is this test suite) has to find `bpd` itself.
pub fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let mut candidates = vec![manifest_dir.join("target/debug").join(name), manifest_dir.join("target/release").join(name)];
    if let Ok(target_dir) = std::env::var("CARGO_TARGET_DIR") {
        candidates.push(PathBuf::from(&target_dir).join("debug").join(name));
        candidates.push(PathBuf::from(&target_dir).join("release").join(name));
    }
    if let Ok(exe) = std::env::current_exe() {
        // .../target/debug/deps/specs-<hash> -> .../target/debug/<name>
        if let Some(deps_dir) = exe.parent() {
            if let Some(profile_dir) = deps_dir.parent() {
                candidates.push(profile_dir.join(name));
            }
        }
    }
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .unwrap_or_else(|| panic!("could not locate the `{name}` binary; run `cargo build` first"))
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local_addr").port()
}

/// Writes the fake coding-agent double this test suite spawns in place of
/// a real `claude` CLI. It reads the prompt file `bpd` hands it via
/// `--prompt-file`, pulls the literal callback URLs out of the embedded
/// curl instructions the same way a human would copy-paste them, and
/// posts back according to `AGENT_MODE`/`AGENT_EVAL_MODE`.
pub fn write_agent_script(dir: &Path) -> PathBuf {
    let path = dir.join("fake-agent.sh");
    let script = r##"#!/bin/sh
PROMPT_FILE=""
while [ $# -gt 0 ]; do
  case "$1" in
    --prompt-file) PROMPT_FILE="$2"; shift 2 ;;
    --resume) shift 2 ;;
    *) shift ;;
  esac
done
CONTENT=$(cat "$PROMPT_FILE")

url_for() {
  printf '%s' "$CONTENT" | grep -oE "http://[^\"]*$1[^\"]*" | head -1
}

if printf '%s' "$CONTENT" | grep -q "evaluation-callback"; then
  URL=$(url_for "evaluation-callback")
  case "$AGENT_EVAL_MODE" in
    insert_between)
      BODY='{"status":"NEEDS_REFINEMENT","mutations":[{"action":"INSERT_BETWEEN","new_node":{"title":"Add regression tests","description":"Cover the new code path","estimatedMinutes":15}}]}'
      ;;
    add_sibling)
      BODY='{"status":"HAS_BLOCKER","mutations":[{"action":"ADD_SIBLING","new_node":{"title":"Unblock the thing","description":"Resolve the access issue"}}]}'
      ;;
    *)
      BODY='{"status":"COMPLETE","mutations":[]}'
      ;;
  esac
  curl -s -X POST "$URL" -H 'content-type: application/json' -d "$BODY" >/dev/null
  exit 0
fi

REPORT_STATUS_URL=$(url_for "report-status")
TASK_SUMMARY_URL=$(url_for "task-summary")
BLOCKER_URL=$(url_for "report-blocker")

case "$AGENT_MODE" in
  fail)
    curl -s -X POST "$REPORT_STATUS_URL" -H 'content-type: application/json' -d '{"status":"failed","reason":"simulated failure"}' >/dev/null
    echo "the attempt did not succeed"
    ;;
  blocked)
    curl -s -X POST "$BLOCKER_URL" -H 'content-type: application/json' -d '{"type":"missing_dependency","description":"need the staging API key","suggestion":"set STAGING_API_KEY"}' >/dev/null
    curl -s -X POST "$REPORT_STATUS_URL" -H 'content-type: application/json' -d '{"status":"blocked","reason":"missing dependency"}' >/dev/null
    ;;
  reported_status_wins)
    curl -s -X POST "$REPORT_STATUS_URL" -H 'content-type: application/json' -d '{"status":"failed","reason":"actually failed despite plausible-looking output"}' >/dev/null
    echo "this transcript reads like a clean success but the agent knows better and reported failed anyway"
    ;;
  hung_short_output)
    echo "too short"
    ;;
  silent_long_output)
    echo "no callback was made at all but this stdout is long enough to clear the hung-output guard threshold easily"
    ;;
  sleep_then_exit)
    sleep "${AGENT_SLEEP_SECS:-2}"
    ;;
  *)
    curl -s -X POST "$TASK_SUMMARY_URL" -H 'content-type: application/json' -d '{"summary":"did the work described in the prompt"}' >/dev/null
    curl -s -X POST "$REPORT_STATUS_URL" -H 'content-type: application/json' -d '{"status":"done"}' >/dev/null
    echo "completed successfully"
    ;;
esac
exit 0
"##;
    std::fs::write(&path, script).expect("write fake agent script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
    }
    path
}

/// A running `bpd` instance plus the scratch directories backing it.
pub struct TestDaemon {
    pub state_dir: TempDir,
    pub project_dir: TempDir,
    pub base_url: String,
    pub token: String,
    port: u16,
    agent_script: PathBuf,
    extra_env: Vec<(String, String)>,
    child: Child,
    client: reqwest::Client,
}

impl TestDaemon {
    pub async fn start() -> Self {
        Self::start_with_env(&[]).await
    }

    pub async fn start_with_env(extra_env: &[(&str, &str)]) -> Self {
        let state_dir = TempDir::new().expect("state tempdir");
        let project_dir = TempDir::new().expect("project tempdir");
        let agent_script = write_agent_script(state_dir.path());
        let port = free_port();
        let extra_env: Vec<(String, String)> = extra_env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

        let child = spawn_daemon(state_dir.path(), port, &agent_script, &extra_env);
        wait_for_port(port).await;
        let token = std::fs::read_to_string(state_dir.path().join("token")).expect("read token").trim().to_string();

        Self {
            state_dir,
            project_dir,
            base_url: format!("http://127.0.0.1:{port}"),
            token,
            port,
            agent_script,
            extra_env,
            child,
            client: reqwest::Client::new(),
        }
    }

    /// Kills the daemon with SIGKILL, the way a real crash would, leaving
    /// any already-spawned agent subprocess running and reparented.
    pub fn kill9(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Starts a fresh `bpd` pointed at the same state directory and port,
    /// simulating a restart after a crash.
    pub async fn restart(&mut self) {
        self.child = spawn_daemon(self.state_dir.path(), self.port, &self.agent_script, &self.extra_env);
        wait_for_port(self.port).await;
    }

    pub fn project_cwd(&self) -> String {
        self.project_dir.path().to_string_lossy().into_owned()
    }

    pub fn db_path(&self) -> PathBuf {
        self.state_dir.path().join("blueprint.db")
    }

    fn url(&self, path: &str) -> String {
        if path.contains('?') {
            format!("{}{}&auth={}", self.base_url, path, self.token)
        } else {
            format!("{}{}?auth={}", self.base_url, path, self.token)
        }
    }

    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.expect("GET request");
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.expect("POST request");
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post_empty(&self, path: &str) -> (reqwest::StatusCode, Value) {
        self.post(path, json!({})).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let resp = self.client.put(self.url(path)).json(&body).send().await.expect("PUT request");
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn delete(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let resp = self.client.delete(self.url(path)).send().await.expect("DELETE request");
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Polls a blueprint until its status leaves `running`/`draft`-pending
    /// transition, or the deadline passes. The fake agent's curl callbacks
    /// resolve in well under a second, so a few-second ceiling is generous.
    pub async fn wait_for_blueprint_status(&self, blueprint_id: &str, want: &str, timeout: Duration) -> Value {
        let deadline = Instant::now() + timeout;
        loop {
            let (status, body) = self.get(&format!("/blueprints/{blueprint_id}")).await;
            assert_eq!(status, reqwest::StatusCode::OK, "GET blueprint failed: {body:?}");
            if body["status"] == want {
                return body;
            }
            if Instant::now() >= deadline {
                panic!("blueprint {blueprint_id} never reached status {want}; last seen: {body:?}");
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn wait_for_node_status(&self, blueprint_id: &str, node_id: &str, want: &str, timeout: Duration) -> Value {
        let deadline = Instant::now() + timeout;
        loop {
            let (status, body) = self.get(&format!("/blueprints/{blueprint_id}")).await;
            assert_eq!(status, reqwest::StatusCode::OK, "GET blueprint failed: {body:?}");
            if let Some(node) = body["nodes"].as_array().and_then(|nodes| nodes.iter().find(|n| n["id"] == node_id)) {
                if node["status"] == want {
                    return node.clone();
                }
            }
            if Instant::now() >= deadline {
                panic!("node {node_id} never reached status {want}; last seen: {body:?}");
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn create_blueprint(&self, title: &str, project_cwd: Option<&str>) -> Value {
        let (status, body) = self
            .post("/blueprints", json!({ "title": title, "project_cwd": project_cwd }))
            .await;
        assert_eq!(status, reqwest::StatusCode::OK, "create blueprint failed: {body:?}");
        body
    }

    pub async fn create_node(&self, blueprint_id: &str, title: &str, dependencies: &[&str]) -> Value {
        let (status, body) = self
            .post(
                &format!("/blueprints/{blueprint_id}/nodes"),
                json!({ "title": title, "dependencies": dependencies }),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::OK, "create node failed: {body:?}");
        body
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_daemon(state_dir: &Path, port: u16, agent_script: &Path, extra_env: &[(String, String)]) -> Child {
    let mut cmd = Command::new(binary_path("bpd"));
    cmd.env("BP_STATE_DIR", state_dir)
        .env("BP_BIND_ADDR", "127.0.0.1")
        .env("BP_PORT", port.to_string())
        .env("BP_AGENT_BINARY", agent_script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for (k, v) in extra_env {
        cmd.env(k, v);
    }
    cmd.spawn().expect("spawn bpd")
}

async fn wait_for_port(port: u16) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if std::net::TcpStream::connect(("127.0.0.1", port)).is_ok() {
            // give the listener a beat to finish wiring the router/state.
            tokio::time::sleep(Duration::from_millis(30)).await;
            return;
        }
        if Instant::now() >= deadline {
            panic!("bpd never started listening on port {port}");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Opens the daemon's sqlite db directly while the daemon is stopped, for
/// crafting crash-recovery fixtures (a live session id, a stale `running`
/// row) that only ever arise mid-flight in a real daemon incarnation.
pub fn with_db<F: FnOnce(&rusqlite::Connection)>(daemon: &TestDaemon, f: F) {
    let conn = rusqlite::Connection::open(daemon.db_path()).expect("open sqlite db directly");
    f(&conn);
}

#[allow(dead_code)]
pub fn write_session_file(project_dir: &Path, session_id: &str, assistant_text: &str) -> PathBuf {
    let sessions_dir = project_dir.join(".claude").join("sessions");
    std::fs::create_dir_all(&sessions_dir).expect("create sessions dir");
    let path = sessions_dir.join(format!("{session_id}.jsonl"));
    let mut file = std::fs::File::create(&path).expect("create session file");
    let line = json!({
        "type": "assistant",
        "uuid": "a1",
        "timestamp": "2026-01-01T00:00:00Z",
        "message": { "content": [{ "type": "text", "text": assistant_text }] }
    });
    writeln!(file, "{line}").expect("write session line");
    path
}
