//! The workflow runner.
//!
//! Drives one workflow's step loop: cancellation checks at the top of each
//! iteration, a transition counter bounding goto/retry loops, per-step
//! retry counters, and the recursion guard shared with sub-workflow
//! invocations through [`RunState`]. Sub-workflows re-enter through
//! [`run_workflow_scoped`], which boxes the future to close the recursion
//! cycle with the step executor.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use arazzo_types::{Value, Workflow};

use crate::Engine;
use crate::actions::{Transition, select_failure_transition, select_success_transition};
use crate::context::{EvalContext, WorkflowScope};
use crate::error::{EngineError, StepFailureError};
use crate::expr;
use crate::result::{StepResult, WorkflowResult};
use crate::step::execute_step;

/// Workflow nesting beyond this depth terminates with a circular-dependency
/// error.
pub(crate) const MAX_WORKFLOW_DEPTH: usize = 32;
/// Step transitions beyond this count terminate the workflow; this bounds
/// goto/retry loops.
pub(crate) const MAX_STEP_TRANSITIONS: u32 = 1024;

/// Mutable state shared across one run's workflow invocations.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    /// Workflow ids currently on the invocation stack.
    pub active: Vec<String>,
    /// `{inputs, outputs}` snapshots of completed workflows, visible to
    /// later workflows as `$workflows.<id>.…`.
    pub siblings: IndexMap<String, WorkflowScope>,
}

/// Runs one workflow to completion, recursing for nested invocations.
///
/// `Err` is reserved for conditions that prevent the workflow from running
/// at all: an unresolved id, re-entering a workflow already on the stack,
/// or exceeding the nesting depth. Everything that happens inside the step
/// loop, cancellation included, lands in the returned [`WorkflowResult`].
pub(crate) fn run_workflow_scoped<'run>(
    engine: &'run Engine,
    cancel: &'run CancellationToken,
    state: &'run mut RunState,
    workflow_id: &'run str,
    inputs: IndexMap<String, Value>,
) -> Pin<Box<dyn Future<Output = Result<WorkflowResult, EngineError>> + Send + 'run>> {
    Box::pin(async move {
        if state.active.iter().any(|active| active == workflow_id) {
            let mut path: Vec<&str> = state.active.iter().map(String::as_str).collect();
            path.push(workflow_id);
            return Err(EngineError::CircularDependency(format!(
                "workflow '{}' is already executing: {}",
                workflow_id,
                path.join(" -> ")
            )));
        }
        if state.active.len() + 1 >= MAX_WORKFLOW_DEPTH {
            return Err(EngineError::CircularDependency(format!(
                "exceeded max workflow depth of {MAX_WORKFLOW_DEPTH}"
            )));
        }
        let Some(workflow) = engine.document.workflow(workflow_id) else {
            return Err(EngineError::UnresolvedWorkflowRef(workflow_id.to_string()));
        };

        state.active.push(workflow_id.to_string());
        let result = run_steps(engine, cancel, state, workflow, inputs).await;
        state.active.pop();

        state.siblings.insert(
            workflow_id.to_string(),
            WorkflowScope {
                inputs: result.inputs.clone(),
                outputs: result.outputs.clone(),
            },
        );
        Ok(result)
    })
}

async fn run_steps(
    engine: &Engine,
    cancel: &CancellationToken,
    state: &mut RunState,
    workflow: &Workflow,
    inputs: IndexMap<String, Value>,
) -> WorkflowResult {
    let started = Instant::now();
    info!(
        workflow_id = %workflow.workflow_id,
        step_count = workflow.steps.len(),
        "workflow execution started"
    );

    let mut context = build_context(engine, state, inputs);

    let mut index = 0usize;
    let mut transitions = 0u32;
    let mut retry_counts: IndexMap<String, u32> = IndexMap::new();
    let mut step_results: IndexMap<String, StepResult> = IndexMap::new();
    let mut workflow_error: Option<EngineError> = None;
    let mut ended_by_goto_workflow = false;

    while index < workflow.steps.len() {
        if cancel.is_cancelled() {
            workflow_error = Some(EngineError::Cancelled);
            break;
        }

        transitions += 1;
        if transitions >= MAX_STEP_TRANSITIONS {
            workflow_error = Some(EngineError::CircularDependency(format!(
                "exceeded max step transitions of {MAX_STEP_TRANSITIONS} in workflow '{}'",
                workflow.workflow_id
            )));
            break;
        }

        let step = &workflow.steps[index];
        let retries = retry_counts.get(&step.step_id).copied().unwrap_or(0);
        debug!(step_id = %step.step_id, index, retries, "step execution started");

        let step_started = Instant::now();
        let execution = execute_step(engine, cancel, state, step, &mut context).await;
        let duration = step_started.elapsed();

        // A retried or revisited step keeps one entry reflecting its
        // latest attempt.
        step_results.insert(
            step.step_id.clone(),
            StepResult {
                step_id: step.step_id.clone(),
                success: execution.success,
                status_code: execution.status_code,
                outputs: execution.outputs,
                error: execution.error,
                retries,
                duration,
            },
        );

        if step_results[&step.step_id].success {
            debug!(step_id = %step.step_id, retries, "step execution succeeded");
            retry_counts.insert(step.step_id.clone(), 0);
            match select_success_transition(engine, &context, workflow, step) {
                Ok(Transition::Advance) => index += 1,
                Ok(Transition::Goto(target)) => index = target,
                Ok(Transition::End) => break,
                Ok(Transition::GotoWorkflow(target)) => {
                    match goto_workflow(engine, cancel, state, &context, &target).await {
                        Ok(()) => ended_by_goto_workflow = true,
                        Err(error) => workflow_error = Some(error),
                    }
                    break;
                }
                Ok(Transition::Retry { .. }) => {
                    workflow_error = Some(EngineError::InvalidAction {
                        name: step.step_id.clone(),
                        reason: "retry is not a success action".into(),
                    });
                    break;
                }
                Err(error) => {
                    workflow_error = Some(error);
                    break;
                }
            }
        } else {
            warn!(step_id = %step.step_id, retries, "step execution failed");
            match select_failure_transition(engine, &context, workflow, step, retries) {
                Ok(Transition::Retry { after }) => {
                    if let Some(delay) = after.filter(|delay| !delay.is_zero())
                        && !sleep_cancellable(cancel, delay).await
                    {
                        workflow_error = Some(EngineError::Cancelled);
                        break;
                    }
                    retry_counts.insert(step.step_id.clone(), retries + 1);
                    debug!(step_id = %step.step_id, attempt = retries + 1, "retrying step");
                }
                Ok(Transition::Advance) => index += 1,
                Ok(Transition::Goto(target)) => index = target,
                Ok(Transition::End) => {
                    let step_error = step_results
                        .get_mut(&step.step_id)
                        .and_then(|recorded| recorded.error.take());
                    workflow_error =
                        Some(step_error.unwrap_or_else(|| EngineError::StepFailure(StepFailureError::new(&step.step_id))));
                    break;
                }
                Ok(Transition::GotoWorkflow(target)) => {
                    match goto_workflow(engine, cancel, state, &context, &target).await {
                        Ok(()) => ended_by_goto_workflow = true,
                        Err(error) => workflow_error = Some(error),
                    }
                    break;
                }
                Err(error) => {
                    workflow_error = Some(error);
                    break;
                }
            }
        }
    }

    let any_failed = step_results.values().any(|step_result| !step_result.success);
    let mut success = workflow_error.is_none() && (ended_by_goto_workflow || !any_failed);

    if success {
        for (name, expression) in &workflow.outputs {
            match expr::resolve_expression_string(&engine.caches, &context, expression) {
                Ok(value) => {
                    context.outputs.insert(name.clone(), value);
                }
                Err(error) => {
                    workflow_error = Some(error);
                    success = false;
                    break;
                }
            }
        }
    }

    let duration = started.elapsed();
    if success {
        info!(workflow_id = %workflow.workflow_id, ?duration, "workflow execution succeeded");
    } else {
        warn!(workflow_id = %workflow.workflow_id, ?duration, "workflow execution failed");
    }

    WorkflowResult {
        workflow_id: workflow.workflow_id.clone(),
        success,
        inputs: context.inputs,
        outputs: context.outputs,
        steps: step_results.into_values().collect(),
        error: workflow_error,
        duration,
    }
}

fn build_context(engine: &Engine, state: &RunState, inputs: IndexMap<String, Value>) -> EvalContext {
    let mut context = EvalContext {
        inputs,
        workflows: state.siblings.clone(),
        components: engine.components.clone(),
        ..EvalContext::default()
    };
    for source in &engine.document.source_descriptions {
        context.source_urls.insert(source.name.clone(), source.url.clone());
    }

    // Component inputs may contain expressions and resolve once per run;
    // a failed resolution keeps the raw node so consumption can still
    // happen later (or fail with better context there).
    for (name, raw) in &engine.components.inputs {
        match expr::interpolate_tree(&engine.caches, &context, raw) {
            Ok(resolved) => {
                context.component_inputs.insert(name.clone(), resolved);
            }
            Err(error) => {
                warn!(component_input = %name, error = %error, "component input resolution failed; keeping raw value");
                context.component_inputs.insert(name.clone(), raw.clone());
            }
        }
    }
    context
}

/// Runs a `goto workflowId` target; `Ok` means the current workflow
/// terminates successfully, any failure is a hard error.
async fn goto_workflow(
    engine: &Engine,
    cancel: &CancellationToken,
    state: &mut RunState,
    context: &EvalContext,
    target: &str,
) -> Result<(), EngineError> {
    let mut sub_result = run_workflow_scoped(engine, cancel, state, target, context.inputs.clone()).await?;
    if sub_result.success {
        return Ok(());
    }
    Err(sub_result
        .error
        .take()
        .unwrap_or_else(|| EngineError::StepFailure(StepFailureError::caused(target, "workflow failed"))))
}

/// Sleeps for `delay`, racing the cancellation token; false on preemption.
async fn sleep_cancellable(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
