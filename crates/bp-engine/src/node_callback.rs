// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-scoped callback waiter backing `POST
//! .../nodes/:nodeId/evaluation-callback` (§6): unlike the request-id-keyed
//! `RequestCallbackRegistry`, this route carries no request id in its path,
//! so correlation is by node id alone — correct because at most one
//! evaluation/split/smart-dependencies/reevaluate call is ever in flight for
//! a given node at a time (the node's own blueprint lane serializes them).

use std::collections::HashMap;
use std::time::Duration;

use bp_core::MacroNodeId;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::callback_registry::RequestTimedOut;

struct PendingNode {
    resolve: oneshot::Sender<Value>,
}

#[derive(Default)]
pub struct NodeCallbackRegistry {
    pending: Mutex<HashMap<MacroNodeId, PendingNode>>,
}

impl NodeCallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, node_id: &MacroNodeId) -> PendingNodeCallback {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(node_id.clone(), PendingNode { resolve: tx });
        PendingNodeCallback { node_id: node_id.clone(), rx }
    }

    /// Returns `false` if no call is currently pending for `node_id`.
    pub fn resolve(&self, node_id: &MacroNodeId, value: Value) -> bool {
        let Some(entry) = self.pending.lock().remove(node_id) else {
            return false;
        };
        entry.resolve.send(value).is_ok()
    }

    fn forget(&self, node_id: &MacroNodeId) {
        self.pending.lock().remove(node_id);
    }
}

pub struct PendingNodeCallback {
    node_id: MacroNodeId,
    rx: oneshot::Receiver<Value>,
}

impl PendingNodeCallback {
    pub async fn wait(self, registry: &NodeCallbackRegistry, timeout: Duration) -> Result<Value, RequestTimedOut> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) | Err(_) => {
                registry.forget(&self.node_id);
                Err(RequestTimedOut(timeout))
            }
        }
    }
}

#[cfg(test)]
#[path = "node_callback_tests.rs"]
mod tests;
