//! Workflow, step, parameter, action, and criterion definitions.
//!
//! These models mirror the authoring shapes of the Arazzo 1.0 specification.
//! Structural invariants (mutual exclusion between `operationId` /
//! `operationPath` / `workflowId`, action target shapes, identifier
//! uniqueness) are enforced by the validator rather than by serde, so a
//! malformed document deserializes and every violation gets reported.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// An ordered set of steps sharing inputs, outputs, and an evaluation
/// context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Identifier unique within the document.
    #[serde(default)]
    pub workflow_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Declared input schema. Kept as an opaque tree; the engine never
    /// schema-validates inputs.
    #[serde(default)]
    pub inputs: Option<Value>,
    /// Identifiers of workflows that must complete before this one runs.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Ordered execution steps; must be non-empty for a valid document.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Workflow-level success actions consulted after step-level ones.
    #[serde(default)]
    pub success_actions: Vec<SuccessAction>,
    /// Workflow-level failure actions consulted after step-level ones.
    #[serde(default)]
    pub failure_actions: Vec<FailureAction>,
    /// Output name to runtime-expression map, evaluated after the step loop.
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

/// One unit of work: an operation call or a nested workflow invocation.
///
/// Exactly one of `operation_id`, `operation_path`, or `workflow_id` must be
/// set (validated, not encoded in the type).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Identifier unique within the enclosing workflow.
    #[serde(default)]
    pub step_id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Operation referenced by its OpenAPI `operationId`.
    #[serde(default)]
    pub operation_id: Option<String>,
    /// Operation referenced by a `{source}#/paths/{path}/{method}` pointer.
    #[serde(default)]
    pub operation_path: Option<String>,
    /// Nested workflow to invoke; step parameters become its inputs.
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    /// Criteria that must all pass for the step to count as successful.
    #[serde(default)]
    pub success_criteria: Vec<Criterion>,
    #[serde(default)]
    pub on_success: Vec<SuccessAction>,
    #[serde(default)]
    pub on_failure: Vec<FailureAction>,
    /// Output name to runtime-expression map, evaluated on step success.
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

/// A request parameter, either inline or a `$components.parameters.<name>`
/// reference with an optional overriding value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    /// Target location: `path`, `query`, `header`, or `cookie`.
    #[serde(default, rename = "in")]
    pub location: String,
    /// Literal value or runtime expression.
    #[serde(default)]
    pub value: Option<Value>,
    /// Reusable component reference of the form
    /// `$components.parameters.<name>`.
    #[serde(default)]
    pub reference: Option<String>,
}

impl Parameter {
    /// Whether this entry is a reusable-component reference.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// Request payload with optional JSON-Pointer targeted replacements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(default)]
    pub content_type: Option<String>,
    /// Payload tree; strings inside may contain `{$…}` expressions.
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub replacements: Vec<PayloadReplacement>,
}

/// A single pointer-targeted substitution applied to a resolved payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadReplacement {
    /// RFC 6901 JSON Pointer into the payload root.
    #[serde(default)]
    pub target: String,
    /// Replacement value or runtime expression.
    #[serde(default)]
    pub value: Value,
}

/// A condition evaluated against the runtime context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    /// Runtime expression selecting the value the condition applies to.
    /// Mandatory for non-simple criterion types.
    #[serde(default)]
    pub context: Option<String>,
    /// The condition itself; interpretation depends on the effective type.
    #[serde(default)]
    pub condition: String,
    /// Shorthand type name: `simple`, `regex`, `jsonpath`, or `xpath`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Long-form type carrying an explicit dialect version.
    #[serde(default)]
    pub expression_type: Option<ExpressionTypeSpec>,
}

impl Criterion {
    /// Effective criterion type: the long form wins over the shorthand, and
    /// an unspecified type means `simple`.
    pub fn effective_type(&self) -> &str {
        if let Some(expression_type) = &self.expression_type {
            return expression_type.kind.as_str();
        }
        self.kind.as_deref().unwrap_or("simple")
    }

    /// Declared dialect version, when the long form was used.
    pub fn declared_version(&self) -> Option<&str> {
        self.expression_type.as_ref().and_then(|declared| declared.version.as_deref())
    }
}

/// Long-form criterion type with its dialect version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionTypeSpec {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Action taken after a successful step: `end` or `goto`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessAction {
    #[serde(default)]
    pub name: String,
    /// `end` or `goto`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Goto target workflow (mutually exclusive with `step_id`).
    #[serde(default)]
    pub workflow_id: Option<String>,
    /// Goto target step within the current workflow.
    #[serde(default)]
    pub step_id: Option<String>,
    /// The action matches only when all criteria pass; an empty list always
    /// matches.
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    /// Reusable reference of the form `$components.successActions.<name>`.
    #[serde(default)]
    pub reference: Option<String>,
}

impl SuccessAction {
    /// Whether this entry is a reusable-component reference.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// Action taken after a failed step: `end`, `goto`, or `retry`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureAction {
    #[serde(default)]
    pub name: String,
    /// `end`, `goto`, or `retry`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub step_id: Option<String>,
    /// Minimum wait before re-executing, in possibly-fractional seconds.
    #[serde(default)]
    pub retry_after: Option<f64>,
    /// Maximum number of retries; signed so a negative authoring mistake is
    /// representable and reportable.
    #[serde(default)]
    pub retry_limit: Option<i64>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    /// Reusable reference of the form `$components.failureActions.<name>`.
    #[serde(default)]
    pub reference: Option<String>,
}

impl FailureAction {
    /// Whether this entry is a reusable-component reference.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}
