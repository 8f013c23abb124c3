// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The blueprint orchestration engine (§4.4–§4.7): the per-blueprint task
//! queue, the request-scoped callback registry, failure classification,
//! prompt construction, outcome reconciliation, handoff-artifact
//! generation, graph mutations, the Node Executor that drives a single
//! node through all of the above, and the Recovery Supervisor that
//! reconciles persisted state with reality across a process restart.

mod artifact_gen;
mod callback_registry;
mod classify;
mod graph_mutations;
mod node_callback;
mod node_executor;
mod prompt;
mod queue;
mod reconcile;
mod recovery;
mod session_poll;

pub use artifact_gen::{dependents_of, generate_handoff_artifacts, IdentityReshaper, Reshaper};
pub use callback_registry::{PendingCallback, RequestCallbackRegistry, RequestTimedOut, REQUEST_CALLBACK_TIMEOUT};
pub use node_callback::{NodeCallbackRegistry, PendingNodeCallback};
pub use classify::{classify_failure, ClassifiedFailure};
pub use graph_mutations::{apply_mutation, MutationAction, NewNodeSpec};
pub use node_executor::NodeExecutor;
pub use prompt::{build_continuation_prompt, build_evaluation_prompt, build_node_prompt, build_reshape_prompt, PromptContext};
pub use queue::{BlueprintQueue, GlobalLaneEntry, LaneInfo, TaskHandle, TaskKind, TaskRecord};
pub use reconcile::{reconcile, ReconciliationOutcome, SummarySource, HUNG_STDOUT_THRESHOLD};
pub use recovery::{
    RecoverySupervisor, StartupOutcome, MONITOR_ACTIVE_WINDOW_SECS, MONITOR_CEILING_MINUTES,
    MONITOR_TICK_INTERVAL_SECS, RESTART_LOOKBACK_MINUTES, STARTUP_ACTIVE_WINDOW_SECS,
};
pub use session_poll::{scan_for_new_session, session_file_exists, session_file_path, session_mtime};
