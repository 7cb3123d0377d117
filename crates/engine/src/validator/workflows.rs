//! Per-workflow validation rules: steps, parameters, actions, criteria,
//! and output keys.

use std::collections::HashSet;

use arazzo_types::{ArazzoDocument, Criterion, FailureAction, Step, SuccessAction, Workflow};

use super::document::valid_output_key;
use super::{IssueCode, ValidationResult};
use crate::expr::{self, ExpressionKind};

const JSONPATH_DRAFT_VERSION: &str = "draft-goessner-dispatch-jsonpath-00";
const XPATH_VERSIONS: [&str; 3] = ["xpath-10", "xpath-20", "xpath-30"];

pub(super) fn validate(document: &ArazzoDocument, workflow: &Workflow, index: usize, result: &mut ValidationResult) {
    let workflow_path = format!("workflows[{index}]");

    if workflow.steps.is_empty() {
        result.error(
            IssueCode::MissingSteps,
            format!("{workflow_path}.steps"),
            format!("workflow '{}' has no steps", workflow.workflow_id),
        );
    }

    let mut seen_step_ids = HashSet::new();
    for (step_index, step) in workflow.steps.iter().enumerate() {
        let step_path = format!("{workflow_path}.steps[{step_index}]");
        validate_step_identity(step, &step_path, &mut seen_step_ids, result);
        validate_step_target(document, step, &step_path, result);
        validate_parameters(document, step, &step_path, result);
        validate_success_actions(document, workflow, &step.on_success, &format!("{step_path}.onSuccess"), result);
        validate_failure_actions(document, workflow, &step.on_failure, &format!("{step_path}.onFailure"), result);
        for (criterion_index, criterion) in step.success_criteria.iter().enumerate() {
            validate_criterion(criterion, &format!("{step_path}.successCriteria[{criterion_index}]"), result);
        }
        validate_output_keys(&step.outputs, &format!("{step_path}.outputs"), result);
    }

    validate_success_actions(
        document,
        workflow,
        &workflow.success_actions,
        &format!("{workflow_path}.successActions"),
        result,
    );
    validate_failure_actions(
        document,
        workflow,
        &workflow.failure_actions,
        &format!("{workflow_path}.failureActions"),
        result,
    );
    validate_output_keys(&workflow.outputs, &format!("{workflow_path}.outputs"), result);
}

fn validate_step_identity<'wf>(step: &'wf Step, path: &str, seen: &mut HashSet<&'wf str>, result: &mut ValidationResult) {
    if step.step_id.is_empty() {
        result.error(IssueCode::MissingStepId, format!("{path}.stepId"), "step requires a stepId");
    } else if !seen.insert(step.step_id.as_str()) {
        result.error(
            IssueCode::DuplicateStepId,
            format!("{path}.stepId"),
            format!("duplicate stepId '{}'", step.step_id),
        );
    }
}

fn validate_step_target(document: &ArazzoDocument, step: &Step, path: &str, result: &mut ValidationResult) {
    let targets = [
        step.operation_id.is_some(),
        step.operation_path.is_some(),
        step.workflow_id.is_some(),
    ];
    let target_count = targets.iter().filter(|set| **set).count();
    if target_count != 1 {
        result.error(
            IssueCode::StepMutualExclusion,
            path.to_string(),
            format!(
                "step '{}' must set exactly one of operationId, operationPath, workflowId ({target_count} set)",
                step.step_id
            ),
        );
    }
    if let Some(workflow_id) = &step.workflow_id
        && document.workflow(workflow_id).is_none()
    {
        result.error(
            IssueCode::UnresolvedWorkflowRef,
            format!("{path}.workflowId"),
            format!("'{workflow_id}' does not name a workflow in this document"),
        );
    }
}

fn validate_parameters(document: &ArazzoDocument, step: &Step, step_path: &str, result: &mut ValidationResult) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for (parameter_index, parameter) in step.parameters.iter().enumerate() {
        let path = format!("{step_path}.parameters[{parameter_index}]");
        if let Some(reference) = &parameter.reference {
            validate_parameter_reference(document, reference, &path, result);
            continue;
        }
        if parameter.name.is_empty() {
            result.error(IssueCode::MissingParameterName, format!("{path}.name"), "parameter requires a name");
        }
        if parameter.value.is_none() {
            result.error(
                IssueCode::MissingParameterValue,
                format!("{path}.value"),
                format!("parameter '{}' requires a value", parameter.name),
            );
        }
        if step.workflow_id.is_none() {
            if parameter.location.is_empty() {
                result.error(
                    IssueCode::MissingParameterIn,
                    format!("{path}.in"),
                    format!("parameter '{}' requires an 'in' location", parameter.name),
                );
            } else if !matches!(parameter.location.as_str(), "path" | "query" | "header" | "cookie") {
                result.error(
                    IssueCode::InvalidParameterIn,
                    format!("{path}.in"),
                    format!("'{}' is not one of path, query, header, cookie", parameter.location),
                );
            }
        }
        if !parameter.name.is_empty() && !seen.insert((parameter.name.clone(), parameter.location.clone())) {
            result.error(
                IssueCode::DuplicateParameter,
                format!("{path}.name"),
                format!("duplicate parameter '{}' in '{}'", parameter.name, parameter.location),
            );
        }
    }
}

fn validate_parameter_reference(document: &ArazzoDocument, reference: &str, path: &str, result: &mut ValidationResult) {
    match expr::parse(reference) {
        Ok(expression) => match expression.kind() {
            ExpressionKind::ComponentParameter(name) => {
                let exists = document
                    .components
                    .as_ref()
                    .is_some_and(|components| components.parameters.contains_key(name));
                if !exists {
                    result.error(
                        IssueCode::UnresolvedComponent,
                        format!("{path}.reference"),
                        format!("'{reference}' does not target a component parameter"),
                    );
                }
            }
            _ => result.error(
                IssueCode::InvalidExpression,
                format!("{path}.reference"),
                format!("'{reference}' must use the $components.parameters. prefix"),
            ),
        },
        Err(error) => result.error(IssueCode::InvalidExpression, format!("{path}.reference"), error.to_string()),
    }
}

fn validate_success_actions(
    document: &ArazzoDocument,
    workflow: &Workflow,
    actions: &[SuccessAction],
    list_path: &str,
    result: &mut ValidationResult,
) {
    let mut seen_names = HashSet::new();
    for (action_index, action) in actions.iter().enumerate() {
        let path = format!("{list_path}[{action_index}]");
        if let Some(reference) = &action.reference {
            validate_action_reference(document, reference, "successActions", &path, result);
            continue;
        }
        validate_action_shape(
            document,
            workflow,
            &action.name,
            &action.kind,
            action.workflow_id.as_deref(),
            action.step_id.as_deref(),
            &["end", "goto"],
            IssueCode::InvalidSuccessType,
            &path,
            &mut seen_names,
            result,
        );
        for (criterion_index, criterion) in action.criteria.iter().enumerate() {
            validate_criterion(criterion, &format!("{path}.criteria[{criterion_index}]"), result);
        }
    }
}

fn validate_failure_actions(
    document: &ArazzoDocument,
    workflow: &Workflow,
    actions: &[FailureAction],
    list_path: &str,
    result: &mut ValidationResult,
) {
    let mut seen_names = HashSet::new();
    for (action_index, action) in actions.iter().enumerate() {
        let path = format!("{list_path}[{action_index}]");
        if let Some(reference) = &action.reference {
            validate_action_reference(document, reference, "failureActions", &path, result);
            continue;
        }
        validate_action_shape(
            document,
            workflow,
            &action.name,
            &action.kind,
            action.workflow_id.as_deref(),
            action.step_id.as_deref(),
            &["end", "goto", "retry"],
            IssueCode::InvalidFailureType,
            &path,
            &mut seen_names,
            result,
        );
        if action.retry_after.is_some_and(|after| after < 0.0) {
            result.error(
                IssueCode::NegativeRetryField,
                format!("{path}.retryAfter"),
                "retryAfter must be non-negative",
            );
        }
        if action.retry_limit.is_some_and(|limit| limit < 0) {
            result.error(
                IssueCode::NegativeRetryField,
                format!("{path}.retryLimit"),
                "retryLimit must be non-negative",
            );
        }
        for (criterion_index, criterion) in action.criteria.iter().enumerate() {
            validate_criterion(criterion, &format!("{path}.criteria[{criterion_index}]"), result);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_action_shape<'wf>(
    document: &ArazzoDocument,
    workflow: &Workflow,
    name: &'wf str,
    kind: &str,
    workflow_id: Option<&str>,
    step_id: Option<&str>,
    allowed_kinds: &[&str],
    invalid_kind_code: IssueCode,
    path: &str,
    seen_names: &mut HashSet<&'wf str>,
    result: &mut ValidationResult,
) {
    if name.is_empty() {
        result.error(IssueCode::MissingActionName, format!("{path}.name"), "action requires a name");
    } else if !seen_names.insert(name) {
        result.error(
            IssueCode::DuplicateActionName,
            format!("{path}.name"),
            format!("duplicate action name '{name}' in this list"),
        );
    }

    if kind.is_empty() {
        result.error(IssueCode::MissingActionType, format!("{path}.type"), "action requires a type");
        return;
    }
    if !allowed_kinds.contains(&kind) {
        result.error(
            invalid_kind_code,
            format!("{path}.type"),
            format!("'{kind}' is not one of {}", allowed_kinds.join(", ")),
        );
        return;
    }

    match kind {
        "goto" => match (workflow_id, step_id) {
            (Some(_), Some(_)) => result.error(
                IssueCode::ActionMutualExclusion,
                path.to_string(),
                "goto must set exactly one of workflowId or stepId, not both",
            ),
            (None, None) => result.error(
                IssueCode::GotoRequiresTarget,
                path.to_string(),
                "goto requires a workflowId or stepId target",
            ),
            (Some(target_workflow), None) => {
                if document.workflow(target_workflow).is_none() {
                    result.error(
                        IssueCode::UnresolvedWorkflowRef,
                        format!("{path}.workflowId"),
                        format!("'{target_workflow}' does not name a workflow in this document"),
                    );
                }
            }
            (None, Some(target_step)) => {
                if !workflow.steps.iter().any(|step| step.step_id == target_step) {
                    result.error(
                        IssueCode::StepIdNotInWorkflow,
                        format!("{path}.stepId"),
                        format!("'{target_step}' does not name a step in workflow '{}'", workflow.workflow_id),
                    );
                }
            }
        },
        _ => {
            if workflow_id.is_some() || step_id.is_some() {
                result.error(
                    IssueCode::ActionMutualExclusion,
                    path.to_string(),
                    format!("'{kind}' actions carry neither workflowId nor stepId"),
                );
            }
        }
    }
}

fn validate_action_reference(
    document: &ArazzoDocument,
    reference: &str,
    expected_kind: &str,
    path: &str,
    result: &mut ValidationResult,
) {
    match expr::parse(reference) {
        Ok(expression) => match expression.kind() {
            ExpressionKind::Component { kind, name, tail } if kind == expected_kind && tail.is_empty() => {
                let exists = document.components.as_ref().is_some_and(|components| match expected_kind {
                    "successActions" => components.success_actions.contains_key(name),
                    _ => components.failure_actions.contains_key(name),
                });
                if !exists {
                    result.error(
                        IssueCode::UnresolvedComponent,
                        format!("{path}.reference"),
                        format!("'{reference}' does not target an existing component"),
                    );
                }
            }
            _ => result.error(
                IssueCode::InvalidExpression,
                format!("{path}.reference"),
                format!("'{reference}' must use the $components.{expected_kind}. prefix"),
            ),
        },
        Err(error) => result.error(IssueCode::InvalidExpression, format!("{path}.reference"), error.to_string()),
    }
}

fn validate_criterion(criterion: &Criterion, path: &str, result: &mut ValidationResult) {
    if criterion.condition.is_empty() {
        result.error(IssueCode::MissingCondition, format!("{path}.condition"), "criterion requires a condition");
    }

    let effective_type = criterion.effective_type();
    if !matches!(effective_type, "" | "simple" | "regex" | "jsonpath" | "xpath") {
        result.error(
            IssueCode::InvalidCriterionType,
            format!("{path}.type"),
            format!("'{effective_type}' is not one of simple, regex, jsonpath, xpath"),
        );
    }

    if !matches!(effective_type, "" | "simple") && criterion.context.is_none() {
        result.error(
            IssueCode::MissingCriterionContext,
            format!("{path}.context"),
            format!("'{effective_type}' criteria require a context expression"),
        );
    }

    if let Some(context) = &criterion.context
        && let Some((code, error)) = context_parse_error(context)
    {
        result.error(code, format!("{path}.context"), error);
    }

    if let Some(version) = criterion.declared_version() {
        let known = match effective_type {
            "jsonpath" => version == JSONPATH_DRAFT_VERSION,
            "xpath" => XPATH_VERSIONS.contains(&version),
            _ => false,
        };
        if !known {
            result.error(
                IssueCode::UnknownExpressionVersion,
                format!("{path}.expressionType.version"),
                format!("unknown {effective_type} version '{version}'"),
            );
        }
    }
}

/// A criterion context must be a runtime expression, possibly embedded.
fn context_parse_error(context: &str) -> Option<(IssueCode, String)> {
    let outcome = if context.contains("{$") {
        expr::parse_embedded(context).map(|_| ())
    } else {
        expr::parse(context).map(|_| ())
    };
    outcome.err().map(|error| {
        let code = match &error {
            crate::error::EngineError::UnknownExpressionPrefix(_) => IssueCode::UnknownExpressionPrefix,
            _ => IssueCode::InvalidExpression,
        };
        (code, error.to_string())
    })
}

fn validate_output_keys(outputs: &indexmap::IndexMap<String, String>, path: &str, result: &mut ValidationResult) {
    for key in outputs.keys() {
        if !valid_output_key(key) {
            result.error(
                IssueCode::InvalidOutputKey,
                format!("{path}.{key}"),
                format!("output key '{key}' must match [A-Za-z0-9._-]+"),
            );
        }
    }
}
