// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback Registry (§4.5): two disjoint lookup tables for out-of-band
//! HTTP callbacks the spawned agent makes back into this process.
//!
//! Execution-scoped callbacks (`blockerInfo`, `taskSummary`,
//! `reportedStatus`/`reportedReason`) are not a registry at all — they are
//! direct writes through `bp_store::Store`, keyed by execution id, which the
//! Executor re-reads after the process returns. Only the request-scoped
//! half — synchronous request/response flows where the agent is asked to
//! *return a value* — needs in-process bookkeeping, which this module
//! provides.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Fixed timeout for a request-scoped callback, counted from the moment the
/// task begins executing (not from enqueue).
pub const REQUEST_CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Error returned when a registered request is never resolved in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request callback timed out after {0:?}")]
pub struct RequestTimedOut(pub Duration);

struct PendingRequest {
    resolve: oneshot::Sender<Value>,
}

/// In-memory map of `requestId -> {resolve, reject, timer}` for synchronous
/// request/response flows (e.g. Smart-Create enrichment).
#[derive(Default)]
pub struct RequestCallbackRegistry {
    pending: Mutex<HashMap<Uuid, PendingRequest>>,
}

impl RequestCallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request, returning its id (to be embedded as a
    /// callback URL in the agent's prompt) and a future that resolves when
    /// `resolve` is called, or errors after `REQUEST_CALLBACK_TIMEOUT`.
    pub fn register(&self) -> (Uuid, PendingCallback) {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, PendingRequest { resolve: tx });
        (request_id, PendingCallback { request_id, rx })
    }

    /// Resolves a pending request with the agent-supplied value. Returns
    /// `false` if the request is unknown (already resolved, timed out, or
    /// never registered).
    pub fn resolve(&self, request_id: Uuid, value: Value) -> bool {
        let Some(entry) = self.pending.lock().remove(&request_id) else {
            return false;
        };
        entry.resolve.send(value).is_ok()
    }

    /// Removes a request without resolving it (used when its `PendingCallback`
    /// times out, to free the slot).
    fn forget(&self, request_id: Uuid) {
        self.pending.lock().remove(&request_id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// A single registered request awaiting its agent-supplied value.
pub struct PendingCallback {
    request_id: Uuid,
    rx: oneshot::Receiver<Value>,
}

impl PendingCallback {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Awaits the resolved value, enforcing the fixed 120s timeout and
    /// deleting the registry entry on expiry.
    pub async fn wait(self, registry: &RequestCallbackRegistry) -> Result<Value, RequestTimedOut> {
        match tokio::time::timeout(REQUEST_CALLBACK_TIMEOUT, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) | Err(_) => {
                registry.forget(self.request_id);
                Err(RequestTimedOut(REQUEST_CALLBACK_TIMEOUT))
            }
        }
    }
}

#[cfg(test)]
#[path = "callback_registry_tests.rs"]
mod tests;
