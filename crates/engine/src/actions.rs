//! Success/failure action selection.
//!
//! After each step the runner asks for a transition decision: the candidate
//! list is the step-level actions followed by the workflow-level ones,
//! reusable references are resolved against the components block, and the
//! first action whose criteria all pass wins. No match falls through to the
//! next step in source order.

use std::time::Duration;

use arazzo_types::{Criterion, Step, Workflow};
use arazzo_util::retry_after_duration;

use crate::Engine;
use crate::context::EvalContext;
use crate::criteria::evaluate_criterion;
use crate::error::EngineError;
use crate::expr::ExpressionKind;

/// The runner's next move after a step completes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transition {
    /// No action matched: continue with the next step in source order.
    Advance,
    /// Terminate the workflow, keeping the triggering step's disposition.
    End,
    /// Jump to the step at this index in the current workflow.
    Goto(usize),
    /// Run the named workflow; its outcome decides the current one.
    GotoWorkflow(String),
    /// Re-execute the current step, optionally after a minimum wait.
    Retry { after: Option<Duration> },
}

pub(crate) fn select_success_transition(
    engine: &Engine,
    context: &EvalContext,
    workflow: &Workflow,
    step: &Step,
) -> Result<Transition, EngineError> {
    let candidates = step.on_success.iter().chain(workflow.success_actions.iter());
    for candidate in candidates {
        let action = match &candidate.reference {
            Some(reference) => resolve_success_reference(engine, reference)?,
            None => candidate,
        };
        if !criteria_match(engine, context, &action.criteria)? {
            continue;
        }
        return match action.kind.as_str() {
            "end" => Ok(Transition::End),
            "goto" => goto_transition(workflow, &action.name, action.workflow_id.as_deref(), action.step_id.as_deref()),
            other => Err(EngineError::InvalidAction {
                name: action.name.clone(),
                reason: format!("'{other}' is not a success action type"),
            }),
        };
    }
    Ok(Transition::Advance)
}

pub(crate) fn select_failure_transition(
    engine: &Engine,
    context: &EvalContext,
    workflow: &Workflow,
    step: &Step,
    retry_count: u32,
) -> Result<Transition, EngineError> {
    let candidates = step.on_failure.iter().chain(workflow.failure_actions.iter());
    for candidate in candidates {
        let action = match &candidate.reference {
            Some(reference) => resolve_failure_reference(engine, reference)?,
            None => candidate,
        };
        if !criteria_match(engine, context, &action.criteria)? {
            continue;
        }
        match action.kind.as_str() {
            "end" => return Ok(Transition::End),
            "goto" => {
                return goto_transition(workflow, &action.name, action.workflow_id.as_deref(), action.step_id.as_deref());
            }
            "retry" => {
                // An exhausted retry falls through to later candidates, so
                // a workflow-level retry can still apply with its own
                // limit against the same per-step counter.
                let limit = action.retry_limit.unwrap_or(1).max(0) as u32;
                if retry_count >= limit {
                    continue;
                }
                return Ok(Transition::Retry {
                    after: action.retry_after.map(retry_after_duration),
                });
            }
            other => {
                return Err(EngineError::InvalidAction {
                    name: action.name.clone(),
                    reason: format!("'{other}' is not a failure action type"),
                });
            }
        }
    }
    Ok(Transition::Advance)
}

fn goto_transition(
    workflow: &Workflow,
    action_name: &str,
    workflow_id: Option<&str>,
    step_id: Option<&str>,
) -> Result<Transition, EngineError> {
    match (workflow_id, step_id) {
        (Some(workflow_id), None) => Ok(Transition::GotoWorkflow(workflow_id.to_string())),
        (None, Some(step_id)) => {
            let index = workflow
                .steps
                .iter()
                .position(|step| step.step_id == step_id)
                .ok_or_else(|| EngineError::StepIdNotInWorkflow {
                    workflow_id: workflow.workflow_id.clone(),
                    step_id: step_id.to_string(),
                })?;
            Ok(Transition::Goto(index))
        }
        _ => Err(EngineError::InvalidAction {
            name: action_name.to_string(),
            reason: "goto requires exactly one of workflowId or stepId".into(),
        }),
    }
}

/// An action matches when every criterion passes; an empty list always
/// matches.
fn criteria_match(engine: &Engine, context: &EvalContext, criteria: &[Criterion]) -> Result<bool, EngineError> {
    for criterion in criteria {
        if !evaluate_criterion(&engine.caches, criterion, context)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn resolve_success_reference<'engine>(
    engine: &'engine Engine,
    reference: &str,
) -> Result<&'engine arazzo_types::SuccessAction, EngineError> {
    let expression = engine.caches.expression(reference)?;
    if let ExpressionKind::Component { kind, name, tail } = expression.kind()
        && kind == "successActions"
        && tail.is_empty()
    {
        return engine
            .components
            .success_actions
            .get(name)
            .ok_or_else(|| EngineError::UnresolvedComponent(reference.to_string()));
    }
    Err(EngineError::UnresolvedComponent(reference.to_string()))
}

fn resolve_failure_reference<'engine>(
    engine: &'engine Engine,
    reference: &str,
) -> Result<&'engine arazzo_types::FailureAction, EngineError> {
    let expression = engine.caches.expression(reference)?;
    if let ExpressionKind::Component { kind, name, tail } = expression.kind()
        && kind == "failureActions"
        && tail.is_empty()
    {
        return engine
            .components
            .failure_actions
            .get(name)
            .ok_or_else(|| EngineError::UnresolvedComponent(reference.to_string()));
    }
    Err(EngineError::UnresolvedComponent(reference.to_string()))
}
