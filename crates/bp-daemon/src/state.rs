// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state handed to every route handler.

use std::sync::Arc;

use bp_core::SystemClock;
use bp_engine::{
    BlueprintQueue, NodeCallbackRegistry, NodeExecutor, RecoverySupervisor, RequestCallbackRegistry,
};
use bp_runner::ProcessRunner;
use bp_session::AgentRegistry;
use bp_store::Store;

/// The task value every blueprint lane carries: fire-and-forget operations
/// report their outcome through the Store, not through the queue future, so
/// the lane itself only needs to signal "this task finished".
pub type LaneTask = ();

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub executor: Arc<NodeExecutor>,
    pub queue: Arc<BlueprintQueue<LaneTask>>,
    pub recovery: Arc<RecoverySupervisor>,
    pub request_callbacks: Arc<RequestCallbackRegistry>,
    pub node_callbacks: Arc<NodeCallbackRegistry>,
    pub token: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        agent_binary: impl Into<std::path::PathBuf>,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let token: Arc<str> = Arc::from(token.into().as_str());
        let registry = Arc::new(AgentRegistry::with_claude_code());
        let runner = Arc::new(ProcessRunner::new(agent_binary.into()));
        let request_callbacks = Arc::new(RequestCallbackRegistry::new());
        let node_callbacks = Arc::new(NodeCallbackRegistry::new());
        let executor = Arc::new(NodeExecutor::new(
            store.clone(),
            runner,
            registry.clone(),
            request_callbacks.clone(),
            node_callbacks.clone(),
            Arc::new(SystemClock),
            base_url,
            token.to_string(),
        ));
        let recovery = Arc::new(RecoverySupervisor::new(store.clone(), registry, Arc::new(SystemClock)));
        Self {
            store,
            executor,
            queue: Arc::new(BlueprintQueue::new()),
            recovery,
            request_callbacks,
            node_callbacks,
            token,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
