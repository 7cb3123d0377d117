//! Per-invocation evaluation state.
//!
//! Each workflow run owns one [`EvalContext`]: its resolved inputs, the
//! output accumulator, per-step scopes, a snapshot of sibling workflow
//! results taken at workflow entry, source URLs, and resolved component
//! inputs. The request/response fields are transient and overwritten at the
//! start of every step execution.

use std::sync::Arc;

use indexmap::IndexMap;

use arazzo_types::{Components, Value};

/// Inputs and outputs recorded for one executed step.
#[derive(Debug, Default, Clone)]
pub struct StepScope {
    pub inputs: IndexMap<String, Value>,
    pub outputs: IndexMap<String, Value>,
}

/// Inputs and outputs snapshotted for one completed workflow.
#[derive(Debug, Default, Clone)]
pub struct WorkflowScope {
    pub inputs: IndexMap<String, Value>,
    pub outputs: IndexMap<String, Value>,
}

/// The state runtime expressions resolve against.
#[derive(Debug, Default, Clone)]
pub struct EvalContext {
    /// Inputs of the current workflow invocation.
    pub inputs: IndexMap<String, Value>,
    /// Workflow-output accumulator, populated after the step loop.
    pub outputs: IndexMap<String, Value>,
    /// Scopes of steps executed so far, keyed by step id.
    pub steps: IndexMap<String, StepScope>,
    /// Sibling-workflow scopes visible to `$workflows.<id>.…`.
    pub workflows: IndexMap<String, WorkflowScope>,
    /// Source description name to URL, in declared order.
    pub source_urls: IndexMap<String, String>,
    /// Component inputs resolved once per run; failed resolutions keep the
    /// raw node.
    pub component_inputs: IndexMap<String, Value>,
    /// Shared handle onto the document's components block; parameters and
    /// actions are referenced in place rather than copied per run.
    pub components: Arc<Components>,

    // Transient request/response state, valid for the current step only.
    pub status_code: Option<i64>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub request_headers: IndexMap<String, Value>,
    pub request_query: IndexMap<String, Value>,
    pub request_path: IndexMap<String, Value>,
    pub request_body: Option<Value>,
    pub response_headers: IndexMap<String, Value>,
    pub response_query: IndexMap<String, Value>,
    pub response_path: IndexMap<String, Value>,
    pub response_body: Option<Value>,
}

impl EvalContext {
    /// Resets the transient request/response fields ahead of a step.
    pub fn clear_transient(&mut self) {
        self.status_code = None;
        self.url = None;
        self.method = None;
        self.request_headers.clear();
        self.request_query.clear();
        self.request_path.clear();
        self.request_body = None;
        self.response_headers.clear();
        self.response_query.clear();
        self.response_path.clear();
        self.response_body = None;
    }
}
