//! Single-step execution.
//!
//! A step either invokes a nested workflow (its parameters become the
//! nested inputs) or compiles into an [`ExecutionRequest`] for the injected
//! executor. Either way the evaluation context is updated in place: the
//! transient request/response fields are rebuilt for this step, and the
//! step's `{inputs, outputs}` scope is recorded under its id afterwards.

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use arazzo_types::{Parameter, Step, Value};
use arazzo_util::set_pointer;

use crate::Engine;
use crate::context::{EvalContext, StepScope};
use crate::error::{EngineError, StepFailureError};
use crate::executor::{ExecutionParameter, ExecutionRequest, ParameterLocation};
use crate::expr::{self, ExpressionKind};
use crate::runner::RunState;
use crate::sources;

/// What one execution attempt produced.
#[derive(Debug, Default)]
pub(crate) struct StepExecution {
    pub success: bool,
    pub status_code: Option<i64>,
    pub outputs: IndexMap<String, Value>,
    pub error: Option<EngineError>,
}

impl StepExecution {
    fn failed(error: EngineError) -> Self {
        StepExecution {
            success: false,
            error: Some(error),
            ..StepExecution::default()
        }
    }
}

/// Executes one step against the current context.
///
/// All failures below the action-selection layer surface as a failed
/// [`StepExecution`], never as an `Err`; the runner decides what a step
/// failure means for the workflow.
pub(crate) async fn execute_step(
    engine: &Engine,
    cancel: &CancellationToken,
    state: &mut RunState,
    step: &Step,
    context: &mut EvalContext,
) -> StepExecution {
    context.clear_transient();

    let parameters = match resolve_parameters(engine, context, step) {
        Ok(parameters) => parameters,
        Err(error) => return record_scope(context, step, IndexMap::new(), StepExecution::failed(error)),
    };
    let parameter_scope: IndexMap<String, Value> = parameters
        .iter()
        .map(|parameter| (parameter.name.clone(), parameter.value.clone()))
        .collect();

    let execution = if let Some(sub_workflow_id) = &step.workflow_id {
        execute_sub_workflow(engine, cancel, state, step, context, sub_workflow_id, &parameter_scope).await
    } else {
        execute_operation(engine, cancel, step, context, parameters).await
    };

    record_scope(context, step, parameter_scope, execution)
}

fn record_scope(context: &mut EvalContext, step: &Step, inputs: IndexMap<String, Value>, execution: StepExecution) -> StepExecution {
    context.steps.insert(
        step.step_id.clone(),
        StepScope {
            inputs,
            outputs: execution.outputs.clone(),
        },
    );
    execution
}

async fn execute_sub_workflow(
    engine: &Engine,
    cancel: &CancellationToken,
    state: &mut RunState,
    step: &Step,
    context: &mut EvalContext,
    sub_workflow_id: &str,
    parameter_scope: &IndexMap<String, Value>,
) -> StepExecution {
    debug!(step_id = %step.step_id, workflow_id = %sub_workflow_id, "invoking sub-workflow");
    match crate::runner::run_workflow_scoped(engine, cancel, state, sub_workflow_id, parameter_scope.clone()).await {
        Ok(sub_result) if sub_result.success => {
            // Surface the nested outcome so this step's outputs can select
            // from $workflows.<id>.outputs.*.
            if let Some(scope) = state.siblings.get(sub_workflow_id) {
                context.workflows.insert(sub_workflow_id.to_string(), scope.clone());
            }
            let outputs = match evaluate_outputs(engine, context, step) {
                Ok(outputs) => outputs,
                Err(error) => return StepExecution::failed(error),
            };
            StepExecution {
                success: true,
                status_code: None,
                outputs,
                error: None,
            }
        }
        Ok(mut sub_result) => {
            let error = sub_result
                .error
                .take()
                .unwrap_or_else(|| EngineError::StepFailure(StepFailureError::new(&step.step_id)));
            StepExecution::failed(error)
        }
        Err(error) => StepExecution::failed(error),
    }
}

async fn execute_operation(
    engine: &Engine,
    cancel: &CancellationToken,
    step: &Step,
    context: &mut EvalContext,
    resolved: Vec<ResolvedParameter>,
) -> StepExecution {
    let mut parameters = Vec::with_capacity(resolved.len());
    for parameter in resolved {
        let location = match ParameterLocation::parse(&parameter.location) {
            Ok(location) => location,
            Err(error) => return StepExecution::failed(error),
        };
        // Per-location context maps feed $request.* expressions; cookies
        // stay in the generic parameter list only.
        match location {
            ParameterLocation::Header => {
                context.request_headers.insert(parameter.name.clone(), parameter.value.clone());
            }
            ParameterLocation::Query => {
                context.request_query.insert(parameter.name.clone(), parameter.value.clone());
            }
            ParameterLocation::Path => {
                context.request_path.insert(parameter.name.clone(), parameter.value.clone());
            }
            ParameterLocation::Cookie => {}
        }
        parameters.push(ExecutionParameter {
            name: parameter.name,
            location,
            value: parameter.value,
        });
    }

    let request_body = match resolve_request_body(engine, context, step) {
        Ok(body) => body,
        Err(error) => return StepExecution::failed(error),
    };
    context.request_body = request_body.clone();

    let operation_path = step.operation_path.as_deref();
    let request = ExecutionRequest {
        source: sources::select_source(&engine.sources, &engine.document, operation_path).cloned(),
        operation_id: step.operation_id.clone(),
        operation_path: step.operation_path.clone(),
        method: operation_path
            .and_then(sources::parse_operation_path)
            .map(|reference| reference.method),
        parameters,
        request_body,
        content_type: step.request_body.as_ref().and_then(|body| body.content_type.clone()),
    };

    let Some(executor) = &engine.executor else {
        return StepExecution::failed(EngineError::ExecutorNotConfigured);
    };

    let response = match executor.execute(cancel, request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(step_id = %step.step_id, error = %error, "operation execution failed");
            return StepExecution::failed(EngineError::Executor(error));
        }
    };

    context.status_code = Some(i64::from(response.status_code));
    context.url = Some(response.url);
    context.method = Some(response.method);
    for (name, values) in &response.headers {
        if let Some(first) = values.first() {
            context.response_headers.insert(name.clone(), Value::String(first.clone()));
        }
    }
    context.response_body = Some(response.body);

    let mut execution = StepExecution {
        status_code: context.status_code,
        ..StepExecution::default()
    };

    for (index, criterion) in step.success_criteria.iter().enumerate() {
        match crate::criteria::evaluate_criterion(&engine.caches, criterion, context) {
            Ok(true) => {}
            Ok(false) => {
                execution.error = Some(EngineError::StepFailure(StepFailureError::criterion(&step.step_id, index)));
                return execution;
            }
            Err(error) => {
                execution.error = Some(error);
                return execution;
            }
        }
    }

    match evaluate_outputs(engine, context, step) {
        Ok(outputs) => {
            execution.outputs = outputs;
            execution.success = true;
        }
        Err(error) => {
            execution.error = Some(error);
        }
    }

    if !engine.config.retain_response_bodies {
        context.response_body = None;
    }
    execution
}

/// A parameter with its value evaluated but its location still raw; only
/// operation steps interpret the location, sub-workflow steps ignore it.
#[derive(Debug)]
struct ResolvedParameter {
    name: String,
    location: String,
    value: Value,
}

/// Resolves the step's parameter list: component references overlaid with
/// inline values, expressions evaluated, declaration order kept.
fn resolve_parameters(engine: &Engine, context: &EvalContext, step: &Step) -> Result<Vec<ResolvedParameter>, EngineError> {
    let mut resolved = Vec::with_capacity(step.parameters.len());
    for parameter in &step.parameters {
        resolved.push(resolve_parameter(engine, context, parameter)?);
    }
    Ok(resolved)
}

fn resolve_parameter(engine: &Engine, context: &EvalContext, parameter: &Parameter) -> Result<ResolvedParameter, EngineError> {
    let (definition, override_value) = match &parameter.reference {
        Some(reference) => (component_parameter(engine, reference)?, parameter.value.as_ref()),
        None => (parameter, None),
    };

    let raw_value = match (override_value, &definition.value) {
        (Some(inline), _) => inline,
        (None, Some(component_value)) => component_value,
        (None, None) => &Value::Null,
    };
    let value = expr::interpolate_tree(&engine.caches, context, raw_value)?;

    Ok(ResolvedParameter {
        name: definition.name.clone(),
        location: definition.location.clone(),
        value,
    })
}

fn component_parameter<'engine>(engine: &'engine Engine, reference: &str) -> Result<&'engine Parameter, EngineError> {
    let expression = engine.caches.expression(reference)?;
    if let ExpressionKind::ComponentParameter(name) = expression.kind() {
        return engine
            .components
            .parameters
            .get(name)
            .ok_or_else(|| EngineError::UnresolvedComponent(reference.to_string()));
    }
    Err(EngineError::UnresolvedComponent(reference.to_string()))
}

/// Resolves the request body: payload interpolation followed by
/// JSON-Pointer replacements against a mapping root.
fn resolve_request_body(engine: &Engine, context: &EvalContext, step: &Step) -> Result<Option<Value>, EngineError> {
    let Some(request_body) = &step.request_body else {
        return Ok(None);
    };
    let Some(payload) = &request_body.payload else {
        return Ok(None);
    };

    let mut root = expr::interpolate_tree(&engine.caches, context, payload)?;
    if !request_body.replacements.is_empty() {
        if root.as_mapping().is_none() {
            return Err(EngineError::evaluation(
                "requestBody",
                format!("replacements require an object payload, got {}", root.kind_name()),
            ));
        }
        for replacement in &request_body.replacements {
            let value = expr::interpolate_tree(&engine.caches, context, &replacement.value)?;
            set_pointer(&mut root, &replacement.target, value)
                .map_err(|error| EngineError::evaluation(&replacement.target, error))?;
        }
    }
    Ok(Some(root))
}

fn evaluate_outputs(engine: &Engine, context: &EvalContext, step: &Step) -> Result<IndexMap<String, Value>, EngineError> {
    let mut outputs = IndexMap::with_capacity(step.outputs.len());
    for (name, expression) in &step.outputs {
        let value = expr::resolve_expression_string(&engine.caches, context, expression)?;
        outputs.insert(name.clone(), value);
    }
    Ok(outputs)
}
