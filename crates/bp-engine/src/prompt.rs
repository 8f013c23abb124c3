// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction (§4.6.4): composes the text document handed to the
//! spawned agent and the literal instruction block telling it how to call
//! back into this service.

use bp_core::{Blueprint, BlueprintId, ExecutionId, MacroNode};

/// Context the prompt template needs that isn't already on `MacroNode`.
pub struct PromptContext<'a> {
    pub blueprint: &'a Blueprint,
    pub node: &'a MacroNode,
    pub step_index: usize,
    pub step_count: usize,
    /// Each dependency's handoff summary, in dependency-list order.
    pub dependency_summaries: Vec<(String, String)>,
    pub blueprint_id: &'a BlueprintId,
    pub execution_id: &'a ExecutionId,
    pub base_url: &'a str,
    pub auth_token: &'a str,
    pub working_dir: &'a str,
}

/// Builds the full prompt for a primary or retry run (§4.6.1 step 6).
pub fn build_node_prompt(ctx: &PromptContext) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Step {}/{} of blueprint \"{}\"\n",
        ctx.step_index, ctx.step_count, ctx.blueprint.title
    ));
    if let Some(desc) = &ctx.blueprint.description {
        out.push_str(desc);
        out.push('\n');
    }
    out.push('\n');

    if !ctx.dependency_summaries.is_empty() {
        out.push_str("Prior work from dependencies:\n");
        for (title, summary) in &ctx.dependency_summaries {
            out.push_str(&format!("- {title}:\n{summary}\n\n"));
        }
    }

    out.push_str(&format!("## {}\n", ctx.node.title));
    if let Some(desc) = &ctx.node.description {
        out.push_str(desc);
        out.push('\n');
    }
    if let Some(p) = &ctx.node.prompt {
        out.push('\n');
        out.push_str(p);
        out.push('\n');
    }
    out.push_str(&format!("\nWorking directory: {}\n", ctx.working_dir));
    out.push_str(&callback_instructions(ctx.blueprint_id, ctx.execution_id, ctx.base_url, ctx.auth_token));
    out
}

/// The fixed instruction block every node prompt ends with (§4.6.4 (a)-(c)).
fn callback_instructions(blueprint_id: &BlueprintId, execution_id: &ExecutionId, base_url: &str, auth_token: &str) -> String {
    format!(
        "\n---\n\
         Work autonomously: do not ask for confirmation or wait for further input.\n\
         If you get blocked, report it immediately by running:\n\
         curl -s -X POST \"{base_url}/blueprints/{blueprint_id}/executions/{execution_id}/report-blocker?auth={auth_token}\" \\\n  \
           -H 'content-type: application/json' \\\n  \
           -d '{{\"type\": \"missing_dependency|unclear_requirement|access_issue|technical_limitation\", \"description\": \"...\", \"suggestion\": \"...\"}}'\n\n\
         As your last two actions, in order:\n\
         1. curl -s -X POST \"{base_url}/blueprints/{blueprint_id}/executions/{execution_id}/task-summary?auth={auth_token}\" \\\n  \
              -H 'content-type: application/json' -d '{{\"summary\": \"...\"}}'\n\
         2. curl -s -X POST \"{base_url}/blueprints/{blueprint_id}/executions/{execution_id}/report-status?auth={auth_token}\" \\\n  \
              -H 'content-type: application/json' -d '{{\"status\": \"done|failed|blocked\", \"reason\": \"...\"}}'\n"
    )
}

/// A fixed continuation prompt used when resuming a failed execution's
/// session (§4.6.8). Deliberately short — the agent has its own context.
pub fn build_continuation_prompt(blueprint_id: &BlueprintId, execution_id: &ExecutionId, base_url: &str, auth_token: &str) -> String {
    format!(
        "Resume the previous task from where you left off and finish it.\n{}",
        callback_instructions(blueprint_id, execution_id, base_url, auth_token)
    )
}

/// Prompt for the post-completion evaluation call (§4.6.6): asks the agent
/// to judge whether the completed node's work needs follow-up nodes.
pub fn build_evaluation_prompt(
    node: &MacroNode,
    handoff: &str,
    dependents: &[&MacroNode],
    callback_url: &str,
) -> String {
    let mut out = format!(
        "Node \"{}\" just completed with this handoff summary:\n{}\n\n",
        node.title, handoff
    );
    if dependents.is_empty() {
        out.push_str("It has no downstream dependents.\n");
    } else {
        out.push_str("Its downstream dependents are:\n");
        for d in dependents {
            out.push_str(&format!("- {}\n", d.title));
        }
    }
    out.push_str(&format!(
        "\nDecide whether this work is complete as-is, needs a refinement step \
         inserted before its dependents, or has left behind a blocker that needs \
         its own sibling node. POST your verdict to:\n\
         curl -s -X POST \"{callback_url}\" -H 'content-type: application/json' -d '{{...}}'\n\n\
         Verdict shapes:\n\
         {{\"status\": \"COMPLETE\"}}\n\
         {{\"status\": \"NEEDS_REFINEMENT\", \"mutations\": [{{\"action\": \"INSERT_BETWEEN\", \"new_node\": {{\"title\": \"...\", \"description\": \"...\"}}}}]}}\n\
         {{\"status\": \"HAS_BLOCKER\", \"mutations\": [{{\"action\": \"ADD_SIBLING\", \"new_node\": {{\"title\": \"...\", \"description\": \"...\"}}}}]}}\n"
    ));
    out
}

/// Prompt for the short second agent call that reshapes a raw summary into
/// the canonical handoff form (§4.6.5).
pub fn build_reshape_prompt(raw_summary: &str) -> String {
    format!(
        "Reshape the following task summary into exactly this form, with no \
         preamble:\n\n**What was done:** ...\n**Files changed:** ...\n**Decisions:** ...\n\n\
         Summary to reshape:\n{raw_summary}"
    )
}

/// Prompt for an explicit `split` call: asks the agent to break a node's
/// remaining scope into a chain of smaller follow-up nodes, reusing the
/// same `INSERT_BETWEEN` mutation shape `evaluate` uses.
pub fn build_split_prompt(node: &MacroNode, handoff: &str, callback_url: &str) -> String {
    format!(
        "Node \"{}\" was completed with this handoff summary:\n{}\n\n\
         Decide whether its scope should be broken into smaller follow-up steps. \
         POST your verdict to:\n\
         curl -s -X POST \"{callback_url}\" -H 'content-type: application/json' -d '{{...}}'\n\n\
         Verdict shapes:\n\
         {{\"status\": \"COMPLETE\"}}\n\
         {{\"status\": \"NEEDS_REFINEMENT\", \"mutations\": [{{\"action\": \"INSERT_BETWEEN\", \"new_node\": {{\"title\": \"...\", \"description\": \"...\"}}}}, ...]}}\n",
        node.title, handoff
    )
}

/// Prompt for a `smart-dependencies` call: asks the agent to look at the
/// node's siblings and propose which of them it should depend on.
pub fn build_smart_dependencies_prompt(node: &MacroNode, siblings: &[&MacroNode], callback_url: &str) -> String {
    let mut out = format!(
        "Node \"{}\" is one step of a larger blueprint. Here are its sibling nodes:\n",
        node.title
    );
    for s in siblings {
        out.push_str(&format!("- id={} \"{}\"\n", s.id, s.title));
    }
    out.push_str(&format!(
        "\nWhich of these, if any, must finish before \"{}\" can start? POST your answer to:\n\
         curl -s -X POST \"{callback_url}\" -H 'content-type: application/json' -d '{{...}}'\n\n\
         Verdict shape: {{\"dependency_node_ids\": [\"...\"]}}\n",
        node.title
    ));
    out
}

/// Prompt for a `reevaluate` call — identical in shape to the post-completion
/// evaluation, run on demand instead of automatically after completion.
pub fn build_reevaluate_prompt(node: &MacroNode, handoff: &str, dependents: &[&MacroNode], callback_url: &str) -> String {
    build_evaluation_prompt(node, handoff, dependents, callback_url)
}

/// Prompt for `/blueprints/:id/generate`: turns a freeform idea into a full
/// node plan. Dependencies are expressed as integer indices into `nodes`
/// (the same intra-batch-reference convention as `nodes/batch-create`), not
/// ids, since the nodes don't exist yet.
pub fn build_generate_prompt(blueprint_title: &str, idea: &str, callback_url: &str) -> String {
    format!(
        "Design the macro-node plan for a blueprint titled \"{blueprint_title}\" from this idea:\n{idea}\n\n\
         POST the plan to:\n\
         curl -s -X POST \"{callback_url}\" -H 'content-type: application/json' -d '{{...}}'\n\n\
         Verdict shape: {{\"nodes\": [{{\"title\": \"...\", \"description\": \"...\", \"dependencies\": [0, 1], \"estimatedMinutes\": 30}}, ...]}}\n\
         `dependencies` is a list of 0-based indices into this same `nodes` array, referring only to \
         earlier entries.\n"
    )
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
