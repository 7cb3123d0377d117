//! Dependency-ordered execution of every workflow in a document.
//!
//! Workflows are ordered by Kahn's algorithm over `dependsOn`, seeded by
//! declared order so independent workflows keep a stable, reproducible
//! sequence. Unknown dependency ids are tolerated by the sort (the
//! validator reports them) and surface per workflow as unresolved-reference
//! failures, so an otherwise-runnable set still runs.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use chrono::Utc;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use arazzo_types::{Value, Workflow};

use crate::Engine;
use crate::error::EngineError;
use crate::result::{RunResult, WorkflowResult};
use crate::runner::{RunState, run_workflow_scoped};

/// Orders workflows by `dependsOn`, stable by declared order.
///
/// Dependencies that name no workflow in the document do not constrain the
/// sort. An order shorter than the workflow count means a cycle.
pub(crate) fn topological_order(workflows: &[Workflow]) -> Result<Vec<&Workflow>, EngineError> {
    let lookup: IndexMap<&str, &Workflow> = workflows
        .iter()
        .map(|workflow| (workflow.workflow_id.as_str(), workflow))
        .collect();

    let mut in_degrees: IndexMap<&str, usize> = lookup.keys().map(|workflow_id| (*workflow_id, 0)).collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for (workflow_id, workflow) in &lookup {
        for dependency in &workflow.depends_on {
            if !lookup.contains_key(dependency.as_str()) {
                continue;
            }
            if let Some(degree) = in_degrees.get_mut(workflow_id) {
                *degree += 1;
            }
            adjacency.entry(dependency.as_str()).or_default().push(workflow_id);
        }
    }

    let mut queue: VecDeque<&str> = in_degrees
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(workflow_id, _)| *workflow_id)
        .collect();

    let mut ordered = Vec::with_capacity(lookup.len());
    while let Some(workflow_id) = queue.pop_front() {
        ordered.push(lookup[workflow_id]);
        if let Some(children) = adjacency.get(workflow_id) {
            for child in children {
                let degree = in_degrees.get_mut(child).expect("dependent workflow is in the degree map");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if ordered.len() != lookup.len() {
        let mut remaining: Vec<&str> = in_degrees
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(workflow_id, _)| *workflow_id)
            .collect();
        remaining.sort_unstable();
        return Err(EngineError::CircularDependency(format!(
            "cycle detected in workflow dependencies involving: {}",
            remaining.join(", ")
        )));
    }

    Ok(ordered)
}

/// Runs every workflow in dependency order.
///
/// Only a dependency cycle or cancellation observed between workflows
/// returns `Err`; a workflow cancelled mid-run stays in the partial result
/// list and ends the run there.
pub(crate) async fn run_all(
    engine: &Engine,
    cancel: &CancellationToken,
    inputs: &IndexMap<String, IndexMap<String, Value>>,
) -> Result<RunResult, EngineError> {
    let started = Instant::now();
    let started_at = Utc::now();
    let ordered = topological_order(&engine.document.workflows)?;
    info!(workflow_count = ordered.len(), "document run started");

    let mut state = RunState::default();
    let mut results: IndexMap<String, WorkflowResult> = IndexMap::new();

    for workflow in ordered {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        if let Some(failure) = dependency_failure(workflow, &results) {
            warn!(workflow_id = %workflow.workflow_id, error = %failure, "skipping workflow with failed dependency");
            results.insert(workflow.workflow_id.clone(), failed_result(workflow, failure));
            continue;
        }

        let workflow_inputs = inputs.get(&workflow.workflow_id).cloned().unwrap_or_default();
        let result = match run_workflow_scoped(engine, cancel, &mut state, &workflow.workflow_id, workflow_inputs).await {
            Ok(result) => result,
            Err(error) => failed_result(workflow, error),
        };

        let cancelled = matches!(result.error, Some(EngineError::Cancelled));
        results.insert(workflow.workflow_id.clone(), result);
        if cancelled {
            break;
        }
    }

    let success = results.values().all(|result| result.success);
    let duration = started.elapsed();
    info!(success, ?duration, "document run finished");

    Ok(RunResult {
        workflows: results.into_values().collect(),
        success,
        started_at,
        duration,
    })
}

/// A dependency that is missing from the result map or recorded as failed
/// blocks the dependent workflow.
fn dependency_failure(workflow: &Workflow, results: &IndexMap<String, WorkflowResult>) -> Option<EngineError> {
    for dependency in &workflow.depends_on {
        match results.get(dependency) {
            None => return Some(EngineError::UnresolvedWorkflowRef(dependency.clone())),
            Some(result) if !result.success => {
                let cause = result
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "workflow failed".to_string());
                return Some(EngineError::DependencyFailed {
                    workflow_id: workflow.workflow_id.clone(),
                    dependency: dependency.clone(),
                    cause,
                });
            }
            Some(_) => {}
        }
    }
    None
}

fn failed_result(workflow: &Workflow, error: EngineError) -> WorkflowResult {
    WorkflowResult {
        workflow_id: workflow.workflow_id.clone(),
        success: false,
        error: Some(error),
        ..WorkflowResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(workflow_id: &str, depends_on: &[&str]) -> Workflow {
        Workflow {
            workflow_id: workflow_id.into(),
            depends_on: depends_on.iter().map(ToString::to_string).collect(),
            ..Workflow::default()
        }
    }

    #[test]
    fn independent_workflows_keep_declared_order() {
        let workflows = vec![workflow("wf3", &[]), workflow("wf1", &[]), workflow("wf2", &[])];
        let ordered: Vec<&str> = topological_order(&workflows)
            .expect("order")
            .iter()
            .map(|workflow| workflow.workflow_id.as_str())
            .collect();
        assert_eq!(ordered, ["wf3", "wf1", "wf2"]);
    }

    #[test]
    fn dependencies_run_before_dependents() {
        let workflows = vec![workflow("c", &["b"]), workflow("b", &["a"]), workflow("a", &[])];
        let ordered: Vec<&str> = topological_order(&workflows)
            .expect("order")
            .iter()
            .map(|workflow| workflow.workflow_id.as_str())
            .collect();
        assert_eq!(ordered, ["a", "b", "c"]);
    }

    #[test]
    fn unknown_dependencies_do_not_constrain_the_sort() {
        let workflows = vec![workflow("a", &["missing"]), workflow("b", &[])];
        let ordered = topological_order(&workflows).expect("order");
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn cycles_are_reported_with_members() {
        let workflows = vec![workflow("a", &["b"]), workflow("b", &["a"]), workflow("c", &[])];
        let error = topological_order(&workflows).expect_err("cycle");
        match error {
            EngineError::CircularDependency(message) => {
                assert!(message.contains('a') && message.contains('b'), "unexpected message: {message}");
            }
            other => panic!("expected circular dependency, got {other:?}"),
        }
    }
}
