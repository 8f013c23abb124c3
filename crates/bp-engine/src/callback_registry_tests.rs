// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn resolve_delivers_value_to_waiter() {
    let registry = RequestCallbackRegistry::new();
    let (request_id, pending) = registry.register();

    assert!(registry.resolve(request_id, json!({"answer": 42})));

    let value = pending.wait(&registry).await.unwrap();
    assert_eq!(value, json!({"answer": 42}));
}

#[tokio::test]
async fn resolve_unknown_request_id_returns_false() {
    let registry = RequestCallbackRegistry::new();
    assert!(!registry.resolve(Uuid::new_v4(), json!(null)));
}

#[tokio::test]
async fn double_resolve_second_call_returns_false() {
    let registry = RequestCallbackRegistry::new();
    let (request_id, pending) = registry.register();

    assert!(registry.resolve(request_id, json!(1)));
    assert!(!registry.resolve(request_id, json!(2)));

    assert_eq!(pending.wait(&registry).await.unwrap(), json!(1));
}

#[tokio::test]
async fn unresolved_request_frees_slot_on_timeout_path() {
    let registry = RequestCallbackRegistry::new();
    let (_request_id, pending) = registry.register();
    assert_eq!(registry.pending_count(), 1);

    drop(pending);
    // The receiver drop doesn't immediately shrink the map (nothing evicts
    // on drop); only resolve()/forget() do. This documents that the waiting
    // side, not the registry, owns timeout-triggered cleanup.
    assert_eq!(registry.pending_count(), 1);
}

#[test]
fn timeout_constant_is_120_seconds() {
    assert_eq!(REQUEST_CALLBACK_TIMEOUT, std::time::Duration::from_secs(120));
}
