// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node Executor (§4.6): drives one Macro Node from `run`/`retry` through
//! spawn, reconciliation, handoff-artifact generation, and (on a `done`
//! outcome) the post-completion evaluation call that may mutate the graph.
//! `next` is the readiness query the daemon's run-all loop polls after every
//! completion to decide what to enqueue next — the queue-driven loop itself
//! lives in the daemon, not here, the way the teacher keeps `Executor`
//! (single-effect execution) and `Scheduler` (sequencing) as separate
//! concerns.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bp_core::{
    BlueprintId, Clock, EngineError, EngineResult, ExecutionStatus, ExecutionType, MacroNode,
    MacroNodeId, NodeExecution, NodeStatus, SessionId,
};
use bp_runner::ProcessRunner;
use bp_session::{AgentRegistry, HealthReport};
use bp_store::Store;
use serde::Deserialize;
use tracing::Instrument;

use crate::artifact_gen::{self, IdentityReshaper};
use crate::callback_registry::{RequestCallbackRegistry, REQUEST_CALLBACK_TIMEOUT};
use crate::classify;
use crate::graph_mutations::{self, MutationAction, NewNodeSpec};
use crate::node_callback::NodeCallbackRegistry;
use crate::prompt::{self, PromptContext};
use crate::reconcile::{self, ReconciliationOutcome};
use crate::session_poll;

pub struct NodeExecutor {
    store: Arc<Store>,
    runner: Arc<ProcessRunner>,
    registry: Arc<AgentRegistry>,
    request_callbacks: Arc<RequestCallbackRegistry>,
    node_callbacks: Arc<NodeCallbackRegistry>,
    clock: Arc<dyn Clock>,
    base_url: String,
    auth_token: String,
}

impl NodeExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        runner: Arc<ProcessRunner>,
        registry: Arc<AgentRegistry>,
        request_callbacks: Arc<RequestCallbackRegistry>,
        node_callbacks: Arc<NodeCallbackRegistry>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            store,
            runner,
            registry,
            request_callbacks,
            node_callbacks,
            clock,
            base_url: base_url.into(),
            auth_token: auth_token.into(),
        }
    }

    fn evaluation_callback_url(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> String {
        format!(
            "{}/blueprints/{blueprint_id}/nodes/{node_id}/evaluation-callback?auth={}",
            self.base_url, self.auth_token
        )
    }

    /// Runs or retries a node (§4.6.1): preconditions, spawn, reconcile, and
    /// (on `done`) fan out handoff artifacts. Returns the finalized execution.
    pub async fn run(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<NodeExecution> {
        let span = tracing::info_span!("node_executor.run", node_id = %node_id);
        async {
            let start = self.clock.now();
            let result = self.run_inner(blueprint_id, node_id).await;
            let elapsed_ms = (self.clock.now() - start).num_milliseconds().max(0);
            match &result {
                Ok(execution) => tracing::info!(elapsed_ms, status = ?execution.status, "node run finished"),
                Err(err) => tracing::warn!(elapsed_ms, %err, "node run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<NodeExecution> {
        let node = self.load_runnable_node(blueprint_id, node_id)?;
        let blueprint = self
            .store
            .get_blueprint(blueprint_id)?
            .ok_or_else(|| EngineError::not_found(format!("blueprint {blueprint_id}")))?;
        let all_nodes = self.store.list_nodes_for_blueprint(blueprint_id)?;

        let prior_executions = self.store.list_executions_for_node(node_id)?;
        let execution_type = if prior_executions.is_empty() { ExecutionType::Primary } else { ExecutionType::Retry };
        let parent_execution_id = prior_executions.last().map(|e| e.id.clone());
        let resume_session_id = prior_executions.last().and_then(|e| e.session_id.clone());

        self.store.update_node_status(node_id, NodeStatus::Running, None)?;
        let execution = self.store.create_execution(
            node_id,
            blueprint_id,
            execution_type,
            None,
            parent_execution_id.as_ref(),
        )?;

        let cwd = blueprint.project_cwd.as_deref().map(Path::new);
        let prompt = if let Some(session_id) = &resume_session_id {
            tracing::info!(%session_id, "resuming prior session");
            prompt::build_continuation_prompt(blueprint_id, &execution.id, &self.base_url, &self.auth_token)
        } else {
            self.build_fresh_prompt(&blueprint, &node, &all_nodes, &execution.id, cwd)?
        };

        self.spawn_and_reconcile(blueprint_id, &node, &execution, &prompt, resume_session_id.as_ref(), cwd).await
    }

    /// Spawns the agent for an already-created execution and reconciles its
    /// outcome. Shared by `run`/`retry` (§4.6.1) and `resumeSession`
    /// (§4.6.8), which differ only in how the execution row and prompt were
    /// built, not in how the process is run and its result interpreted.
    async fn spawn_and_reconcile(
        &self,
        blueprint_id: &BlueprintId,
        node: &MacroNode,
        execution: &NodeExecution,
        prompt: &str,
        resume_session_id: Option<&SessionId>,
        cwd: Option<&Path>,
    ) -> EngineResult<NodeExecution> {
        let store = self.store.clone();
        let execution_id_for_pid = execution.id.clone();
        let on_pid = move |pid: u32| {
            let _ = store.set_execution_pid(&execution_id_for_pid, pid as i64);
        };

        let run_result = self.runner.run(prompt, cwd, resume_session_id.map(SessionId::as_str), on_pid).await;

        match run_result {
            Ok(output) => self.reconcile_success(blueprint_id, node, &execution.id, &output.stdout, cwd).await,
            Err(err) => self.reconcile_failure(node, &execution.id, &err.to_string(), cwd),
        }?;

        self.store
            .get_execution(&execution.id)?
            .ok_or_else(|| EngineError::not_found(format!("execution {}", execution.id)))
    }

    /// Session resumption (§4.6.8): a dedicated entrypoint for a `failed`
    /// node with a known prior session id, distinct from a plain `retry` —
    /// it always resumes the same session rather than deciding to based on
    /// whether a prior execution exists, and the new execution is typed
    /// `continuation` rather than `retry`.
    pub async fn resume_session(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<NodeExecution> {
        let node = self
            .store
            .get_node(node_id)?
            .ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
        if node.blueprint_id != *blueprint_id {
            return Err(EngineError::bad_request(format!("node {node_id} does not belong to blueprint {blueprint_id}")));
        }
        if node.status != NodeStatus::Failed {
            return Err(EngineError::precondition(format!("node {node_id} is {:?}, not failed", node.status)));
        }
        let prior = self.store.list_executions_for_node(node_id)?;
        let last = prior.last().ok_or_else(|| EngineError::precondition(format!("node {node_id} has no prior execution")))?;
        let session_id = last
            .session_id
            .clone()
            .ok_or_else(|| EngineError::precondition(format!("node {node_id}'s last execution has no known session id")))?;

        let blueprint = self
            .store
            .get_blueprint(blueprint_id)?
            .ok_or_else(|| EngineError::not_found(format!("blueprint {blueprint_id}")))?;
        let cwd = blueprint.project_cwd.as_deref().map(Path::new);

        self.store.update_node_status(node_id, NodeStatus::Running, None)?;
        let execution =
            self.store.create_execution(node_id, blueprint_id, ExecutionType::Continuation, None, Some(&last.id))?;
        let prompt = prompt::build_continuation_prompt(blueprint_id, &execution.id, &self.base_url, &self.auth_token);

        self.spawn_and_reconcile(blueprint_id, &node, &execution, &prompt, Some(&session_id), cwd).await
    }

    fn load_runnable_node(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<MacroNode> {
        let node = self
            .store
            .get_node(node_id)?
            .ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
        if node.blueprint_id != *blueprint_id {
            return Err(EngineError::bad_request(format!("node {node_id} does not belong to blueprint {blueprint_id}")));
        }
        if !node.status.is_runnable() {
            return Err(EngineError::precondition(format!("node {node_id} is {:?}, not runnable", node.status)));
        }
        let siblings = self.store.list_nodes_for_blueprint(blueprint_id)?;
        let status_by_id: HashMap<&MacroNodeId, &NodeStatus> = siblings.iter().map(|n| (&n.id, &n.status)).collect();
        if node.any_dependency_blocked(|id| status_by_id.get(id).copied()) {
            return Err(EngineError::precondition(format!("node {node_id} has a blocked or failed dependency")));
        }
        if !node.dependencies_satisfied(|id| status_by_id.get(id).copied()) {
            return Err(EngineError::precondition(format!("node {node_id} has unsatisfied dependencies")));
        }
        Ok(node)
    }

    fn build_fresh_prompt(
        &self,
        blueprint: &bp_core::Blueprint,
        node: &MacroNode,
        all_nodes: &[MacroNode],
        execution_id: &bp_core::ExecutionId,
        cwd: Option<&Path>,
    ) -> EngineResult<String> {
        let mut dependency_summaries = Vec::new();
        for dep_id in &node.dependencies {
            let Some(dep_node) = all_nodes.iter().find(|n| &n.id == dep_id) else { continue };
            if let Some(artifact) = self.store.latest_input_artifact(dep_id, &node.id)? {
                dependency_summaries.push((dep_node.title.clone(), artifact.content));
            }
        }
        let working_dir = cwd.map(|p| p.to_string_lossy().into_owned()).unwrap_or_else(|| ".".to_string());
        let ctx = PromptContext {
            blueprint,
            node,
            step_index: (node.order + 1) as usize,
            step_count: all_nodes.len(),
            dependency_summaries,
            blueprint_id: &blueprint.id,
            execution_id,
            base_url: &self.base_url,
            auth_token: &self.auth_token,
            working_dir: &working_dir,
        };
        Ok(prompt::build_node_prompt(&ctx))
    }

    async fn reconcile_success(
        &self,
        blueprint_id: &BlueprintId,
        node: &MacroNode,
        execution_id: &bp_core::ExecutionId,
        cleaned_stdout: &str,
        cwd: Option<&Path>,
    ) -> EngineResult<()> {
        let session_id = self.discover_session_id(execution_id, node, cwd)?;
        let health = session_id.as_ref().and_then(|sid| self.health_for(node, sid, cwd));

        let execution = self
            .store
            .get_execution(execution_id)?
            .ok_or_else(|| EngineError::not_found(format!("execution {execution_id}")))?;
        let outcome = reconcile::reconcile(&execution, cleaned_stdout, health.as_ref(), node.prompt.as_deref());

        match outcome {
            ReconciliationOutcome::Done { summary, .. } => {
                self.finalize(execution_id, ExecutionStatus::Done, &summary, None, health.as_ref())?;
                self.store.update_node_status(&node.id, NodeStatus::Done, None)?;
                self.generate_handoff(blueprint_id, node, &summary)?;
                if let Err(err) = self.evaluate_completion(blueprint_id, node).await {
                    tracing::warn!(node_id = %node.id, error = %err, "post-completion evaluation failed");
                }
            }
            ReconciliationOutcome::Blocked { summary, .. } => {
                self.finalize(execution_id, ExecutionStatus::Done, &summary, None, health.as_ref())?;
                self.store.update_node_status(&node.id, NodeStatus::Blocked, None)?;
                self.generate_handoff(blueprint_id, node, &summary)?;
            }
            ReconciliationOutcome::Failed { reason, detail } => {
                self.finalize(execution_id, ExecutionStatus::Failed, &detail, Some(reason), health.as_ref())?;
                self.store.update_node_status(&node.id, NodeStatus::Failed, Some(&detail))?;
            }
        }
        Ok(())
    }

    fn reconcile_failure(&self, node: &MacroNode, execution_id: &bp_core::ExecutionId, error_msg: &str, cwd: Option<&Path>) -> EngineResult<()> {
        let session_id = self.discover_session_id(execution_id, node, cwd)?;
        let health = session_id.as_ref().and_then(|sid| self.health_for(node, sid, cwd));
        let classified = classify::classify_failure(error_msg, None, session_id.as_ref().map(SessionId::as_str), cwd, &node.agent_type, &self.registry);
        self.finalize(execution_id, ExecutionStatus::Failed, &classified.detail, Some(classified.reason), health.as_ref())?;
        self.store.update_node_status(&node.id, NodeStatus::Failed, Some(&classified.detail))
            .map_err(EngineError::from)
    }

    fn finalize(
        &self,
        execution_id: &bp_core::ExecutionId,
        status: ExecutionStatus,
        summary: &str,
        failure_reason: Option<bp_core::FailureReason>,
        health: Option<&HealthReport>,
    ) -> EngineResult<()> {
        self.store
            .finalize_execution(
                execution_id,
                status,
                Some(summary),
                failure_reason,
                health.map(|h| h.compact_count as i64),
                health.map(|h| h.peak_tokens as i64),
                health.map(HealthReport::context_pressure),
            )
            .map_err(EngineError::from)
    }

    fn generate_handoff(&self, blueprint_id: &BlueprintId, node: &MacroNode, summary: &str) -> EngineResult<()> {
        artifact_gen::generate_handoff_artifacts(&self.store, blueprint_id, node, summary, &IdentityReshaper)?;
        Ok(())
    }

    /// Locates the agent's session id: already known for a resumed run, or
    /// discovered by scanning the agent type's `sessions_dir` for the newest
    /// log file created since this execution started (§4.6.1 step 7).
    fn discover_session_id(&self, execution_id: &bp_core::ExecutionId, node: &MacroNode, cwd: Option<&Path>) -> EngineResult<Option<SessionId>> {
        let execution = self.store.get_execution(execution_id)?;
        if let Some(existing) = execution.as_ref().and_then(|e| e.session_id.clone()) {
            return Ok(Some(existing));
        }
        let Some(cwd) = cwd else { return Ok(None) };
        let Some(parser) = self.registry.get(&node.agent_type) else { return Ok(None) };
        let Some(execution) = execution else { return Ok(None) };
        let sessions_dir = parser.sessions_dir(cwd);
        let Some((session_id, _)) = session_poll::scan_for_new_session(&sessions_dir, execution.started_at) else {
            return Ok(None);
        };
        let session_id = SessionId::new(session_id);
        self.store.set_execution_session_id(execution_id, &session_id)?;
        Ok(Some(session_id))
    }

    fn health_for(&self, node: &MacroNode, session_id: &SessionId, cwd: Option<&Path>) -> Option<HealthReport> {
        let cwd = cwd?;
        let parser = self.registry.get(&node.agent_type)?;
        let path = session_poll::session_file_path(&parser.sessions_dir(cwd), session_id.as_str());
        parser.health_analysis(&path).ok()
    }

    /// §4.6.7 `next`: the first node (in display order) that is `pending` or
    /// `queued` with every dependency `done`/`skipped`. If none remain and
    /// every node has reached a terminal done/skipped state, marks the
    /// blueprint `done` as a side effect. `runAll` loops on this until it
    /// returns `None` or a run fails.
    pub fn next(&self, blueprint_id: &BlueprintId) -> EngineResult<Option<MacroNodeId>> {
        let nodes = self.store.list_nodes_for_blueprint(blueprint_id)?;
        let status_by_id: HashMap<&MacroNodeId, &NodeStatus> = nodes.iter().map(|n| (&n.id, &n.status)).collect();

        let candidate = nodes
            .iter()
            .filter(|n| matches!(n.status, NodeStatus::Pending | NodeStatus::Queued))
            .find(|n| n.dependencies_satisfied(|id| status_by_id.get(id).copied()));
        if let Some(node) = candidate {
            return Ok(Some(node.id.clone()));
        }

        if !nodes.is_empty() && nodes.iter().all(|n| n.status.satisfies_dependency()) {
            self.store.set_blueprint_status(blueprint_id, bp_core::BlueprintStatus::Done)?;
        }
        Ok(None)
    }

    /// `runAll` (§4.6.7): pre-marks every node whose dependencies aren't
    /// themselves blocked as `queued` (so the UI reflects the intended plan
    /// immediately), then drains the blueprint by repeatedly running
    /// whatever `next` returns until it's exhausted or a run fails. On
    /// failure, reverts the remaining pre-queued nodes to `pending` and
    /// marks the blueprint `failed`.
    pub async fn run_all(&self, blueprint_id: &BlueprintId) -> EngineResult<()> {
        let nodes = self.store.list_nodes_for_blueprint(blueprint_id)?;
        let status_by_id: HashMap<&MacroNodeId, &NodeStatus> = nodes.iter().map(|n| (&n.id, &n.status)).collect();
        let mut pre_queued = Vec::new();
        for n in &nodes {
            if n.status.is_runnable() && !n.any_dependency_blocked(|id| status_by_id.get(id).copied()) {
                self.store.update_node_status(&n.id, NodeStatus::Queued, None)?;
                pre_queued.push(n.id.clone());
            }
        }

        loop {
            let Some(node_id) = self.next(blueprint_id)? else { break };
            match self.run(blueprint_id, &node_id).await {
                Ok(execution) if execution.status == ExecutionStatus::Failed => {
                    self.revert_pre_queued(&pre_queued)?;
                    self.store.set_blueprint_status(blueprint_id, bp_core::BlueprintStatus::Failed)?;
                    return Ok(());
                }
                Ok(_) => continue,
                Err(err) => {
                    self.revert_pre_queued(&pre_queued)?;
                    self.store.set_blueprint_status(blueprint_id, bp_core::BlueprintStatus::Failed)?;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn revert_pre_queued(&self, pre_queued: &[MacroNodeId]) -> EngineResult<()> {
        for id in pre_queued {
            if let Some(node) = self.store.get_node(id)? {
                if node.status == NodeStatus::Queued {
                    self.store.update_node_status(id, NodeStatus::Pending, None)?;
                }
            }
        }
        Ok(())
    }

    /// Post-completion evaluation (§4.6.6): asks a short-lived agent to judge
    /// whether the just-completed node's work needs a refinement step or has
    /// left a blocker behind, and applies whatever graph mutation it verdicts.
    /// Timing out or failing to spawn is logged and otherwise ignored — a
    /// missed evaluation never blocks the node's own completion.
    async fn evaluate_completion(&self, blueprint_id: &BlueprintId, node: &MacroNode) -> EngineResult<()> {
        if let Err(err) = self.run_evaluation_flow(blueprint_id, node, prompt::build_evaluation_prompt).await {
            tracing::warn!(node_id = %node.id, error = %err, "post-completion evaluation failed");
        }
        Ok(())
    }

    /// `evaluate` (§6 executor operations): the same verdict flow as the
    /// automatic post-completion evaluation, invoked on demand. Precondition:
    /// only `done` nodes may be evaluated (§7).
    pub async fn evaluate(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<()> {
        let node = self.done_node(blueprint_id, node_id)?;
        self.run_evaluation_flow(blueprint_id, &node, prompt::build_evaluation_prompt).await
    }

    /// `reevaluate`: identical flow to `evaluate`, run explicitly rather
    /// than automatically; kept as its own entrypoint since it records a
    /// distinct `RelatedSessionType::Reevaluate` lineage in intent even
    /// though the verdict shape is shared.
    pub async fn reevaluate(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<()> {
        let node = self.done_node(blueprint_id, node_id)?;
        self.run_evaluation_flow(blueprint_id, &node, prompt::build_reevaluate_prompt).await
    }

    /// `split`: asks the agent whether a done node's scope should be broken
    /// into smaller follow-up steps, applying the same `INSERT_BETWEEN`
    /// mutation `evaluate` does.
    pub async fn split(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<()> {
        let node = self.done_node(blueprint_id, node_id)?;
        self.run_evaluation_flow(blueprint_id, &node, |node, handoff, _dependents, callback_url| {
            prompt::build_split_prompt(node, handoff, callback_url)
        })
        .await
    }

    fn done_node(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<MacroNode> {
        let node = self
            .store
            .get_node(node_id)?
            .ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
        if node.blueprint_id != *blueprint_id {
            return Err(EngineError::bad_request(format!("node {node_id} does not belong to blueprint {blueprint_id}")));
        }
        if node.status != NodeStatus::Done {
            return Err(EngineError::precondition(format!("node {node_id} is {:?}, not done", node.status)));
        }
        Ok(node)
    }

    /// Shared tail for `evaluate`/`reevaluate`/`split`/the automatic
    /// post-completion call: spawns an agent with a verdict-soliciting
    /// prompt, awaits the node-scoped callback, and applies whatever graph
    /// mutations the verdict carries.
    async fn run_evaluation_flow(
        &self,
        blueprint_id: &BlueprintId,
        node: &MacroNode,
        build_prompt: impl FnOnce(&MacroNode, &str, &[&MacroNode], &str) -> String,
    ) -> EngineResult<()> {
        let all_nodes = self.store.list_nodes_for_blueprint(blueprint_id)?;
        let dependents = artifact_gen::dependents_of(&all_nodes, &node.id);
        let handoff = self
            .store
            .list_artifacts_for_node(&node.id, bp_store::ArtifactDirection::Output)?
            .last()
            .map(|a| a.content.clone())
            .unwrap_or_default();

        let blueprint = self.store.get_blueprint(blueprint_id)?.ok_or_else(|| EngineError::not_found("blueprint"))?;
        let cwd = blueprint.project_cwd.as_deref().map(Path::new);

        let pending = self.node_callbacks.register(&node.id);
        let callback_url = self.evaluation_callback_url(blueprint_id, &node.id);
        let eval_prompt = build_prompt(node, &handoff, &dependents, &callback_url);

        self.runner.spawn_interactive(&eval_prompt, cwd, None)?;

        let Ok(value) = pending.wait(&self.node_callbacks, REQUEST_CALLBACK_TIMEOUT).await else {
            tracing::debug!(node_id = %node.id, "evaluation callback timed out");
            return Ok(());
        };
        self.apply_verdict(blueprint_id, node, value)
    }

    fn apply_verdict(&self, blueprint_id: &BlueprintId, node: &MacroNode, value: serde_json::Value) -> EngineResult<()> {
        let verdict: EvaluationVerdict =
            serde_json::from_value(value).map_err(|e| EngineError::external(format!("malformed evaluation verdict: {e}")))?;

        for mutation in &verdict.mutations {
            let Some(action) = mutation.action() else {
                tracing::warn!(action = %mutation.action_raw, "unknown graph mutation action");
                continue;
            };
            let spec = NewNodeSpec {
                title: &mutation.new_node.title,
                description: mutation.new_node.description.as_deref(),
                prompt: mutation.new_node.prompt.as_deref(),
                estimated_minutes: mutation.new_node.estimated_minutes,
            };
            graph_mutations::apply_mutation(&self.store, blueprint_id, node, action, &spec)?;
        }
        Ok(())
    }

    /// Delivers a value POSTed to `.../evaluation-callback` to whichever of
    /// `evaluate`/`reevaluate`/`split`/`smartDependencies`/the automatic
    /// post-completion call is currently waiting on this node. Returns
    /// `false` if nothing is pending (late or duplicate callback).
    pub fn resolve_evaluation_callback(&self, node_id: &MacroNodeId, value: serde_json::Value) -> bool {
        self.node_callbacks.resolve(node_id, value)
    }

    /// `smartDependencies`: asks the agent which of a node's siblings it
    /// should depend on, and wires the edges it names.
    pub async fn smart_dependencies(&self, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> EngineResult<()> {
        let node = self
            .store
            .get_node(node_id)?
            .ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
        if node.blueprint_id != *blueprint_id {
            return Err(EngineError::bad_request(format!("node {node_id} does not belong to blueprint {blueprint_id}")));
        }
        let all_nodes = self.store.list_nodes_for_blueprint(blueprint_id)?;
        let siblings: Vec<&MacroNode> = all_nodes.iter().filter(|n| n.id != node.id).collect();

        let blueprint = self.store.get_blueprint(blueprint_id)?.ok_or_else(|| EngineError::not_found("blueprint"))?;
        let cwd = blueprint.project_cwd.as_deref().map(Path::new);

        let pending = self.node_callbacks.register(&node.id);
        let callback_url = self.evaluation_callback_url(blueprint_id, &node.id);
        let prompt = prompt::build_smart_dependencies_prompt(&node, &siblings, &callback_url);

        self.runner.spawn_interactive(&prompt, cwd, None)?;

        let Ok(value) = pending.wait(&self.node_callbacks, REQUEST_CALLBACK_TIMEOUT).await else {
            tracing::debug!(node_id = %node.id, "smart-dependencies callback timed out");
            return Ok(());
        };
        let suggestion: DependencySuggestion =
            serde_json::from_value(value).map_err(|e| EngineError::external(format!("malformed dependency suggestion: {e}")))?;

        let sibling_ids: std::collections::HashSet<&MacroNodeId> = siblings.iter().map(|n| &n.id).collect();
        for dep_id in &suggestion.dependency_node_ids {
            let dep_id = MacroNodeId::new(dep_id.clone());
            if !sibling_ids.contains(&dep_id) {
                tracing::warn!(%dep_id, "smart-dependencies suggested a non-sibling node; ignoring");
                continue;
            }
            self.store.add_node_dependency(&node.id, &dep_id)?;
        }
        Ok(())
    }

    /// `/blueprints/:id/generate`: expands a freeform idea into a full node
    /// plan via the global request-scoped callback registry (this operation
    /// has no node of its own to key off, unlike `evaluate`/`split`).
    pub async fn generate(&self, blueprint_id: &BlueprintId, idea: &str) -> EngineResult<Vec<MacroNode>> {
        let blueprint = self
            .store
            .get_blueprint(blueprint_id)?
            .ok_or_else(|| EngineError::not_found(format!("blueprint {blueprint_id}")))?;
        let cwd = blueprint.project_cwd.as_deref().map(Path::new);

        let (request_id, pending) = self.request_callbacks.register();
        let callback_url = format!("{}/enrichment-callback/{request_id}?auth={}", self.base_url, self.auth_token);
        let gen_prompt = prompt::build_generate_prompt(&blueprint.title, idea, &callback_url);

        self.runner.spawn_interactive(&gen_prompt, cwd, None)?;

        let value = pending
            .wait(&self.request_callbacks)
            .await
            .map_err(|e| EngineError::external(format!("generate timed out: {e}")))?;
        let plan: GeneratedPlan =
            serde_json::from_value(value).map_err(|e| EngineError::external(format!("malformed generated plan: {e}")))?;

        let mut created = Vec::with_capacity(plan.nodes.len());
        for entry in &plan.nodes {
            let dependencies = entry
                .dependencies
                .iter()
                .filter_map(|&idx| created.get(idx).map(|n: &MacroNode| n.id.clone()))
                .collect();
            let node = self.store.create_node(
                blueprint_id,
                &entry.title,
                entry.description.as_deref(),
                None,
                dependencies,
                None,
                entry.estimated_minutes,
                "claude-code",
            )?;
            created.push(node);
        }
        Ok(created)
    }

    /// `reevaluateAll`: runs `reevaluate` over every `done` node in the
    /// blueprint, sequentially, bounded by the 32-minute ceiling (30-minute
    /// agent timeout + 2-minute grace, §5).
    pub async fn reevaluate_all(&self, blueprint_id: &BlueprintId) -> EngineResult<()> {
        const REEVALUATE_ALL_CEILING: std::time::Duration = std::time::Duration::from_secs(32 * 60);
        let nodes = self.store.list_nodes_for_blueprint(blueprint_id)?;
        let done_ids: Vec<MacroNodeId> = nodes.iter().filter(|n| n.status == NodeStatus::Done).map(|n| n.id.clone()).collect();

        let work = async {
            for node_id in &done_ids {
                if let Err(err) = self.reevaluate(blueprint_id, node_id).await {
                    tracing::warn!(%node_id, error = %err, "reevaluate-all: one node's reevaluation failed");
                }
            }
        };
        tokio::time::timeout(REEVALUATE_ALL_CEILING, work)
            .await
            .map_err(|_| EngineError::external("reevaluate-all exceeded its 32-minute ceiling"))
    }
}

#[derive(Debug, Deserialize)]
struct DependencySuggestion {
    #[serde(default)]
    dependency_node_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedPlan {
    nodes: Vec<GeneratedNode>,
}

#[derive(Debug, Deserialize)]
struct GeneratedNode {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dependencies: Vec<usize>,
    #[serde(default, rename = "estimatedMinutes")]
    estimated_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EvaluationVerdict {
    #[allow(dead_code)]
    status: String,
    #[serde(default)]
    mutations: Vec<MutationEntry>,
}

#[derive(Debug, Deserialize)]
struct MutationEntry {
    #[serde(rename = "action")]
    action_raw: String,
    new_node: NewNodeFields,
}

impl MutationEntry {
    fn action(&self) -> Option<MutationAction> {
        match self.action_raw.as_str() {
            "INSERT_BETWEEN" => Some(MutationAction::InsertBetween),
            "ADD_SIBLING" => Some(MutationAction::AddSibling),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewNodeFields {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    estimated_minutes: Option<i64>,
}

#[cfg(test)]
#[path = "node_executor_tests.rs"]
mod tests;
