//! Recursive Planner integration (§4.6): the `plan_task` payload -> graph mutation.
//!
//! Invoked by the Runner whenever it dispatches the distinguished
//! `plan_task` tool. Two passes are required over `subtasks` because a
//! subtask may depend on a sibling declared later in the list: pass one
//! allocates IDs and binds tags, pass two resolves dependency tags now that
//! every tag is known.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::domain::{GraphError, Priority, Task, TaskDesc, TaskGraph};
use crate::tools::Tool;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("plan_task payload is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("graph error while materializing plan: {0}")]
    Graph(#[from] GraphError),
}

/// The `plan_task` payload (§4.6/§6). Unknown keys are ignored by `serde`
/// (no `deny_unknown_fields`); missing optional keys default to empty.
#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    pub task_tag: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subtasks: Vec<SubtaskPayload>,
}

#[derive(Debug, Deserialize)]
pub struct SubtaskPayload {
    pub task_tag: String,
    #[serde(default)]
    pub description: String,
    pub parent: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tool_require: Vec<String>,
}

/// Materialize a `plan_task` result into new child tasks on `graph`.
///
/// Returns the number of children created. `current_task_id` is the task
/// that dispatched `plan_task`; its tool list and context are what every
/// child inherits (§3: "the child's context is a deep copy of the parent's
/// context at the moment of planning").
pub async fn apply_plan(graph: &TaskGraph, current_task_id: u64, raw_plan: &str) -> Result<usize, PlannerError> {
    let plan: PlanPayload = serde_json::from_str(raw_plan)?;

    let (_, current_tools) = graph.get_task_prompt_and_tools(current_task_id).await?;
    let current_context = graph.context(current_task_id).await?;

    let mut tag_to_id: HashMap<String, u64> = HashMap::new();
    tag_to_id.insert(plan.task_tag.clone(), current_task_id);

    // Pass 1: allocate IDs, bind tags, resolve each subtask's own tool list.
    let mut pending: Vec<(Task, TaskDesc, Vec<String>)> = Vec::with_capacity(plan.subtasks.len());
    for subtask in &plan.subtasks {
        let id = graph.allocate_id();
        tag_to_id.insert(subtask.task_tag.clone(), id);

        let tools = resolve_tools(&current_tools, &subtask.tool_require);
        let task = Task::new(id, subtask.description.clone(), tools);
        let desc = TaskDesc::new(id, Priority::Normal, None, Vec::new(), current_context.clone());
        pending.push((task, desc, subtask.dependencies.clone()));
    }

    // Pass 2: now every tag is bound, resolve `parent` and `dependencies`.
    for ((_, desc, dep_tags), subtask) in pending.iter_mut().zip(&plan.subtasks) {
        desc.parent_id = tag_to_id.get(&subtask.parent).copied();
        if desc.parent_id.is_none() {
            warn!(tag = %subtask.parent, child = subtask.task_tag, "apply_plan: unknown parent tag, leaving rootless");
        }

        let mut resolved_deps = Vec::with_capacity(dep_tags.len());
        for dep_tag in dep_tags.drain(..) {
            match tag_to_id.get(&dep_tag) {
                Some(id) => resolved_deps.push(*id),
                None => warn!(tag = %dep_tag, "apply_plan: unknown dependency tag, skipping edge"),
            }
        }
        desc.dependencies = resolved_deps;
    }

    let count = pending.len();
    let children = pending.into_iter().map(|(task, desc, _)| (task, desc)).collect();
    graph.register_children(children).await;
    Ok(count)
}

/// Resolve `tool_require` names against the *current* task's own tool list
/// (§4.6 step 2); missing tools are warned about and omitted rather than
/// failing the whole plan.
fn resolve_tools(current_tools: &[Arc<dyn Tool>], tool_require: &[String]) -> Vec<Arc<dyn Tool>> {
    tool_require
        .iter()
        .filter_map(|name| {
            let found = current_tools.iter().find(|t| t.name() == name).cloned();
            if found.is_none() {
                warn!(tool = name, "resolve_tools: planner requested a tool unavailable to the parent task");
            }
            found
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use tokio::sync::Notify;

    fn graph() -> TaskGraph {
        TaskGraph::new(Arc::new(Notify::new()))
    }

    #[tokio::test]
    async fn linear_dependency_plan_creates_two_children() {
        let g = graph();
        let root = g.create_task("plan something", vec![], Priority::Normal).await;

        let plan = serde_json::json!({
            "task_tag": "root",
            "description": "demo",
            "subtasks": [
                {"task_tag": "a", "description": "do a", "parent": "root", "dependencies": [], "tool_require": []},
                {"task_tag": "b", "description": "do b", "parent": "root", "dependencies": ["a"], "tool_require": []},
            ],
        });

        let created = apply_plan(&g, root, &plan.to_string()).await.unwrap();
        assert_eq!(created, 2);

        let ready = g.find_ready().await;
        assert_eq!(ready.len(), 1);
        let (a_id, _) = ready[0];
        assert_eq!(g.status(a_id).await.unwrap(), TaskStatus::Ready);
    }

    #[tokio::test]
    async fn empty_subtasks_leaves_graph_unchanged() {
        let g = graph();
        let root = g.create_task("plan something", vec![], Priority::Normal).await;
        let plan = serde_json::json!({"task_tag": "root", "description": "demo", "subtasks": []});
        let created = apply_plan(&g, root, &plan.to_string()).await.unwrap();
        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let g = graph();
        let root = g.create_task("plan something", vec![], Priority::Normal).await;
        let err = apply_plan(&g, root, "not json").await.unwrap_err();
        assert!(matches!(err, PlannerError::MalformedJson(_)));
    }

    #[tokio::test]
    async fn unknown_dependency_tag_is_skipped_not_fatal() {
        let g = graph();
        let root = g.create_task("plan something", vec![], Priority::Normal).await;
        let plan = serde_json::json!({
            "task_tag": "root",
            "subtasks": [
                {"task_tag": "a", "description": "do a", "parent": "root", "dependencies": ["ghost"], "tool_require": []},
            ],
        });
        apply_plan(&g, root, &plan.to_string()).await.unwrap();
        let ready = g.find_ready().await;
        assert_eq!(ready.len(), 1);
    }
}
