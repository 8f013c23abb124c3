// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bpd`'s argv surface and the token-auth middleware gating every route.

use std::process::Command;

use crate::prelude::{binary_path, TestDaemon};

#[test]
fn version_flag_prints_version_and_exits_zero() {
    let output = Command::new(binary_path("bpd")).arg("--version").output().expect("run bpd --version");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("bpd"));
}

#[test]
fn help_flag_prints_usage_and_exits_zero() {
    let output = Command::new(binary_path("bpd")).arg("--help").output().expect("run bpd --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE"));
    assert!(stdout.contains("bpd"));
}

#[test]
fn unknown_argument_is_rejected() {
    let output = Command::new(binary_path("bpd")).arg("--bogus").output().expect("run bpd --bogus");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected argument"));
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let daemon = TestDaemon::start().await;
    let resp = reqwest::Client::new().get(format!("{}/blueprints", daemon.base_url)).send().await.expect("request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let daemon = TestDaemon::start().await;
    let resp = reqwest::Client::new()
        .get(format!("{}/blueprints", daemon.base_url))
        .header("x-blueprint-token", "0000000000000000000000000000000000000000")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_via_header_is_accepted() {
    let daemon = TestDaemon::start().await;
    let resp = reqwest::Client::new()
        .get(format!("{}/blueprints", daemon.base_url))
        .header("x-blueprint-token", &daemon.token)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn valid_token_via_query_param_is_accepted() {
    let daemon = TestDaemon::start().await;
    let resp = reqwest::Client::new()
        .get(format!("{}/blueprints?auth={}", daemon.base_url, daemon.token))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn token_is_persisted_across_restarts() {
    let mut daemon = TestDaemon::start().await;
    let first_token = daemon.token.clone();
    daemon.kill9();
    daemon.restart().await;
    let token_after_restart = std::fs::read_to_string(daemon.state_dir.path().join("token")).expect("read token").trim().to_string();
    assert_eq!(first_token, token_after_restart);
}
