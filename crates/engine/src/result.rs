//! Execution results handed back to the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use arazzo_types::Value;

use crate::error::EngineError;

/// Outcome of one step execution.
///
/// A retried step keeps a single entry that reflects its latest attempt;
/// `retries` counts how many re-executions preceded it.
#[derive(Debug, Default)]
pub struct StepResult {
    pub step_id: String,
    pub success: bool,
    /// Status code of the response, for operation steps that got one.
    pub status_code: Option<i64>,
    pub outputs: IndexMap<String, Value>,
    pub error: Option<EngineError>,
    pub retries: u32,
    pub duration: Duration,
}

/// Outcome of one workflow invocation.
#[derive(Debug, Default)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub success: bool,
    pub inputs: IndexMap<String, Value>,
    pub outputs: IndexMap<String, Value>,
    /// Step results in first-execution order.
    pub steps: Vec<StepResult>,
    pub error: Option<EngineError>,
    pub duration: Duration,
}

impl WorkflowResult {
    /// The recorded result for a step, when it executed.
    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.steps.iter().find(|step| step.step_id == step_id)
    }
}

/// Outcome of a full document run.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Workflow results in topological execution order.
    pub workflows: Vec<WorkflowResult>,
    /// True only when every executed workflow succeeded.
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl RunResult {
    /// The recorded result for a workflow, when it was attempted.
    pub fn workflow(&self, workflow_id: &str) -> Option<&WorkflowResult> {
        self.workflows.iter().find(|workflow| workflow.workflow_id == workflow_id)
    }
}
