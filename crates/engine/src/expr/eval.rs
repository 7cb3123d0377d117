//! Runtime expression evaluation.
//!
//! Resolves a parsed [`Expression`] against the current [`EvalContext`].
//! Header/query/path lookups use exact names (the context stores names as
//! the step builder or transport produced them) and resolve to null when
//! absent; `$inputs` / `$outputs` lookups treat a missing key as an error;
//! body pointers follow RFC 6901 semantics via `arazzo-util`.

use arazzo_types::Value;
use arazzo_util::resolve_pointer;
use indexmap::IndexMap;

use crate::context::EvalContext;
use crate::error::EngineError;
use crate::expr::parser::{EmbeddedSegment, Expression, ExpressionKind};

/// Evaluates one expression against the context.
pub fn evaluate(expression: &Expression, context: &EvalContext) -> Result<Value, EngineError> {
    let raw = expression.raw();
    match expression.kind() {
        ExpressionKind::Url => Ok(context.url.clone().map(Value::String).unwrap_or_default()),
        ExpressionKind::Method => Ok(context.method.clone().map(Value::String).unwrap_or_default()),
        ExpressionKind::StatusCode => Ok(context.status_code.map(Value::Int).unwrap_or_default()),

        ExpressionKind::RequestHeader(name) => Ok(lookup_part(&context.request_headers, name)),
        ExpressionKind::RequestQuery(name) => Ok(lookup_part(&context.request_query, name)),
        ExpressionKind::RequestPath(name) => Ok(lookup_part(&context.request_path, name)),
        ExpressionKind::ResponseHeader(name) => Ok(lookup_part(&context.response_headers, name)),
        ExpressionKind::ResponseQuery(name) => Ok(lookup_part(&context.response_query, name)),
        ExpressionKind::ResponsePath(name) => Ok(lookup_part(&context.response_path, name)),

        ExpressionKind::RequestBody { pointer } => body_value(raw, context.request_body.as_ref(), pointer.as_deref()),
        ExpressionKind::ResponseBody { pointer } => body_value(raw, context.response_body.as_ref(), pointer.as_deref()),

        ExpressionKind::Input(name) => context
            .inputs
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::evaluation(raw, format!("no input named '{name}'"))),
        ExpressionKind::Output(name) => context
            .outputs
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::evaluation(raw, format!("no output named '{name}'"))),

        ExpressionKind::Step { step_id, tail } => {
            let scope = context
                .steps
                .get(step_id)
                .ok_or_else(|| EngineError::evaluation(raw, format!("no executed step named '{step_id}'")))?;
            scoped_lookup(raw, &scope.inputs, &scope.outputs, tail)
        }
        ExpressionKind::Workflow { workflow_id, tail } => {
            let scope = context
                .workflows
                .get(workflow_id)
                .ok_or_else(|| EngineError::evaluation(raw, format!("no completed workflow named '{workflow_id}'")))?;
            scoped_lookup(raw, &scope.inputs, &scope.outputs, tail)
        }
        ExpressionKind::SourceDescription { name, tail } => {
            let url = context
                .source_urls
                .get(name)
                .ok_or_else(|| EngineError::evaluation(raw, format!("no source description named '{name}'")))?;
            match tail.split_first() {
                Some((head, rest)) if head == "url" && rest.is_empty() => Ok(Value::String(url.clone())),
                _ => Err(EngineError::evaluation(raw, "source description expressions must select 'url'")),
            }
        }

        ExpressionKind::ComponentParameter(name) => {
            let parameter = context
                .components
                .parameters
                .get(name)
                .ok_or_else(|| EngineError::UnresolvedComponent(raw.to_string()))?;
            Ok(parameter.value.clone().unwrap_or_default())
        }
        ExpressionKind::Component { kind, name, tail } => component_value(raw, context, kind, name, tail),
    }
}

fn lookup_part(entries: &IndexMap<String, Value>, name: &str) -> Value {
    entries.get(name).cloned().unwrap_or_default()
}

fn body_value(raw: &str, body: Option<&Value>, pointer: Option<&str>) -> Result<Value, EngineError> {
    let root = body.cloned().unwrap_or_default();
    let Some(pointer) = pointer else {
        return Ok(root);
    };
    resolve_pointer(&root, pointer)
        .map(Clone::clone)
        .map_err(|error| EngineError::evaluation(raw, error))
}

/// Resolves a `$steps.…` / `$workflows.…` tail: the first segment selects
/// the inputs or outputs scope, the rest walks into the stored value.
fn scoped_lookup(
    raw: &str,
    inputs: &IndexMap<String, Value>,
    outputs: &IndexMap<String, Value>,
    tail: &[String],
) -> Result<Value, EngineError> {
    let Some((head, rest)) = tail.split_first() else {
        return Err(EngineError::evaluation(raw, "expression must select 'inputs' or 'outputs'"));
    };
    let scope = match head.as_str() {
        "inputs" => inputs,
        "outputs" => outputs,
        other => {
            return Err(EngineError::evaluation(
                raw,
                format!("unsupported selector '{other}'; expected 'inputs' or 'outputs'"),
            ));
        }
    };
    let Some((name, path)) = rest.split_first() else {
        return Err(EngineError::evaluation(raw, format!("missing name after '{head}'")));
    };
    let value = scope
        .get(name)
        .ok_or_else(|| EngineError::evaluation(raw, format!("no {head} entry named '{name}'")))?;
    navigate(raw, value, path)
}

fn component_value(raw: &str, context: &EvalContext, kind: &str, name: &str, tail: &[String]) -> Result<Value, EngineError> {
    let value = match kind {
        "inputs" => context
            .component_inputs
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnresolvedComponent(raw.to_string()))?,
        "parameters" => context
            .components
            .parameters
            .get(name)
            .map(|parameter| parameter.value.clone().unwrap_or_default())
            .ok_or_else(|| EngineError::UnresolvedComponent(raw.to_string()))?,
        "successActions" => context
            .components
            .success_actions
            .get(name)
            .map(structured)
            .ok_or_else(|| EngineError::UnresolvedComponent(raw.to_string()))??,
        "failureActions" => context
            .components
            .failure_actions
            .get(name)
            .map(structured)
            .ok_or_else(|| EngineError::UnresolvedComponent(raw.to_string()))??,
        other => return Err(EngineError::evaluation(raw, format!("unknown component type '{other}'"))),
    };
    navigate(raw, &value, tail)
}

/// Renders a serde-serializable component as a structured value.
fn structured<T: serde::Serialize>(entry: &T) -> Result<Value, EngineError> {
    serde_json::to_value(entry)
        .map(|json| Value::from_json(&json))
        .map_err(|error| EngineError::evaluation("$components", error))
}

/// Walks a dot-separated path into a value: mappings by key, sequences by
/// non-negative index.
fn navigate(raw: &str, value: &Value, path: &[String]) -> Result<Value, EngineError> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Mapping(entries) => entries
                .get(segment.as_str())
                .ok_or_else(|| EngineError::evaluation(raw, format!("no key '{segment}'")))?,
            Value::Sequence(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| EngineError::evaluation(raw, format!("'{segment}' is not a sequence index")))?;
                items
                    .get(index)
                    .ok_or_else(|| EngineError::evaluation(raw, format!("index {index} out of bounds")))?
            }
            scalar => {
                return Err(EngineError::evaluation(
                    raw,
                    format!("cannot descend into {} at '{segment}'", scalar.kind_name()),
                ));
            }
        };
    }
    Ok(current.clone())
}

/// Evaluates a string that may embed `{$…}` expressions.
///
/// A string that is exactly one embedded expression yields the expression's
/// typed value; any mix of literals and expressions concatenates their
/// string renderings.
pub fn evaluate_embedded(segments: &[EmbeddedSegment], context: &EvalContext) -> Result<Value, EngineError> {
    if let [EmbeddedSegment::Expr(expression)] = segments {
        return evaluate(expression, context);
    }
    let mut rendered = String::new();
    for segment in segments {
        match segment {
            EmbeddedSegment::Literal(text) => rendered.push_str(text),
            EmbeddedSegment::Expr(expression) => {
                rendered.push_str(&evaluate(expression, context)?.to_string());
            }
        }
    }
    Ok(Value::String(rendered))
}
