// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bp_core::{BlueprintId, BlueprintStatus, MacroNodeId, NodeStatus};
use chrono::Utc;

fn blueprint() -> Blueprint {
    Blueprint {
        id: BlueprintId::new("bp1"),
        title: "Ship the thing".to_string(),
        description: Some("Get it out the door".to_string()),
        project_cwd: Some("/tmp/p".to_string()),
        status: BlueprintStatus::Active,
        starred: false,
        archived_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn node() -> MacroNode {
    MacroNode {
        id: MacroNodeId::new("n1"),
        blueprint_id: BlueprintId::new("bp1"),
        order: 0,
        title: "Write the parser".to_string(),
        description: Some("Parse the thing".to_string()),
        prompt: Some("Be thorough".to_string()),
        dependencies: vec![],
        status: NodeStatus::Pending,
        error: None,
        estimated_minutes: None,
        actual_minutes: None,
        parallel_group: None,
        agent_type: "claude-code".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn node_prompt_includes_step_position_and_dependency_summaries() {
    let blueprint = blueprint();
    let node = node();
    let exec_id = ExecutionId::new("e1");
    let ctx = PromptContext {
        blueprint: &blueprint,
        node: &node,
        step_index: 2,
        step_count: 3,
        dependency_summaries: vec![("Step A".to_string(), "did the setup".to_string())],
        blueprint_id: &blueprint.id,
        execution_id: &exec_id,
        base_url: "http://127.0.0.1:4599",
        auth_token: "deadbeef",
        working_dir: "/tmp/p",
    };

    let prompt = build_node_prompt(&ctx);
    assert!(prompt.contains("Step 2/3"));
    assert!(prompt.contains("Ship the thing"));
    assert!(prompt.contains("did the setup"));
    assert!(prompt.contains("Write the parser"));
    assert!(prompt.contains("/tmp/p"));
    assert!(prompt.contains(&format!("blueprints/{}/executions/{exec_id}/report-status", blueprint.id)));
    assert!(prompt.contains("done|failed|blocked"));
}

#[test]
fn node_prompt_with_no_dependencies_omits_prior_work_section() {
    let blueprint = blueprint();
    let node = node();
    let exec_id = ExecutionId::new("e1");
    let ctx = PromptContext {
        blueprint: &blueprint,
        node: &node,
        step_index: 1,
        step_count: 1,
        dependency_summaries: vec![],
        blueprint_id: &blueprint.id,
        execution_id: &exec_id,
        base_url: "http://127.0.0.1:4599",
        auth_token: "deadbeef",
        working_dir: "/tmp/p",
    };

    let prompt = build_node_prompt(&ctx);
    assert!(!prompt.contains("Prior work from dependencies"));
}

#[test]
fn continuation_prompt_embeds_execution_id_and_auth_token() {
    let bp_id = BlueprintId::new("bp1");
    let exec_id = ExecutionId::new("e2");
    let prompt = build_continuation_prompt(&bp_id, &exec_id, "http://127.0.0.1:4599", "deadbeef");
    assert!(prompt.contains("Resume the previous task"));
    assert!(prompt.contains(&exec_id.to_string()));
    assert!(prompt.contains("auth=deadbeef"));
}

#[test]
fn evaluation_prompt_lists_dependents_when_present() {
    let node = node();
    let mut dep = node.clone();
    dep.id = MacroNodeId::new("n2");
    dep.title = "Write the tests".to_string();
    let dependents = vec![&dep];

    let prompt = build_evaluation_prompt(&node, "did the work", &dependents, "http://x/evaluation-callback");
    assert!(prompt.contains("Write the tests"));
    assert!(prompt.contains("NEEDS_REFINEMENT"));
    assert!(prompt.contains("INSERT_BETWEEN"));
}

#[test]
fn evaluation_prompt_notes_absence_of_dependents() {
    let node = node();
    let prompt = build_evaluation_prompt(&node, "did the work", &[], "http://x/evaluation-callback");
    assert!(prompt.contains("no downstream dependents"));
}

#[test]
fn reshape_prompt_names_the_canonical_sections() {
    let prompt = build_reshape_prompt("fixed the bug in parser.rs");
    assert!(prompt.contains("**What was done:**"));
    assert!(prompt.contains("**Files changed:**"));
    assert!(prompt.contains("**Decisions:**"));
    assert!(prompt.contains("fixed the bug in parser.rs"));
}
