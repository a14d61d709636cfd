//! Property-based tests for the Task Graph's universal invariants (§8).
//!
//! Random forward-edge DAGs (node `i` may only depend on nodes `< i`, so
//! acyclicity holds by construction) are drained through a real
//! [`Scheduler`] against a scripted model that always finishes immediately,
//! then checked against the specification's testable properties: every
//! task completes, and every dependency's `end_time` precedes its
//! dependent's `start_time`.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use taskgraph::domain::{Priority, Task, TaskDesc, TaskGraph, TaskStatus};
use taskgraph::llm::{CompletionResponse, MockLlmClient, StopReason, TokenUsage};
use taskgraph::scheduler::{Scheduler, SchedulerConfig};

fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        text: Some(text.to_string()),
        tool_calls: vec![],
        stop_reason: StopReason::EndTurn,
        thinking: None,
        usage: TokenUsage::default(),
    }
}

/// Deterministic pseudo-random bit from `(seed, i, j)`, used to decide
/// whether node `i` depends on node `j < i`.
fn has_edge(seed: u64, i: usize, j: usize) -> bool {
    let mut x = seed ^ ((i as u64) << 32) ^ (j as u64);
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % 3 == 0
}

async fn run_case(n: usize, seed: u64) -> Result<(), TestCaseError> {
    let new_task = Arc::new(tokio::sync::Notify::new());
    let graph = Arc::new(TaskGraph::new(new_task.clone()));

    let root = graph.create_task("n0", vec![], Priority::Normal).await;
    let mut ids = vec![root];
    let mut pending = Vec::new();

    for i in 1..n {
        let id = graph.allocate_id();
        let deps: Vec<u64> = (0..i).filter(|&j| has_edge(seed, i, j)).map(|j| ids[j]).collect();
        pending.push((
            Task::new(id, format!("n{i}"), vec![]),
            TaskDesc::new(id, Priority::Normal, Some(root), deps, Default::default()),
        ));
        ids.push(id);
    }
    graph.register_children(pending).await;

    let responses: Vec<CompletionResponse> = (0..n).map(|_| text_response("done[DONE]")).collect();
    let model = Arc::new(MockLlmClient::new(responses));
    let config = SchedulerConfig { max_concurrent: None, idle_poll: Duration::from_millis(5) };
    let scheduler = Scheduler::new(graph.clone(), model, 20, config, new_task);

    scheduler.drain().await.map_err(|e| TestCaseError::fail(e.to_string()))?;

    for &id in &ids {
        let status = graph.status(id).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(status, TaskStatus::Completed, "task {} should have completed", id);
    }

    for i in 1..n {
        let child = ids[i];
        let (child_start, _) = graph.timing(child).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
        let child_start = child_start.expect("completed task must have a start_time");

        for j in 0..i {
            if has_edge(seed, i, j) {
                let dep = ids[j];
                let (_, dep_end) = graph.timing(dep).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
                let dep_end = dep_end.expect("completed dependency must have an end_time");
                prop_assert!(
                    dep_end <= child_start,
                    "dependency {} ended at {:?} after dependent {} started at {:?}",
                    dep,
                    dep_end,
                    child,
                    child_start
                );
            }
        }
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_forward_dag_completes_respecting_dependency_timing(n in 2usize..8, seed in any::<u64>()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(run_case(n, seed))?;
    }
}
