//! Engine error taxonomy.
//!
//! Runtime failures carry stable, matchable identities: the scheduler
//! matches on variants to propagate dependency failures, callers match on
//! [`EngineError::Cancelled`], and tests assert on the variant rather than
//! on message text. Validation findings use the separate issue codes in the
//! validator module; this enum is the runtime surface only.

use std::fmt;

/// Error surface of the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An expression failed to parse.
    #[error("invalid runtime expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// An expression began with `$` but no known family matched.
    #[error("unknown expression prefix in '{0}'")]
    UnknownExpressionPrefix(String),

    /// A well-formed expression could not be resolved against the context.
    #[error("expression '{expression}' failed to evaluate: {reason}")]
    Evaluation { expression: String, reason: String },

    /// A `workflowId` reference did not resolve within the document.
    #[error("unresolved workflow reference '{0}'")]
    UnresolvedWorkflowRef(String),

    /// An `operationId` / `operationPath` did not resolve against any
    /// attached source document.
    #[error("unresolved operation reference '{0}'")]
    UnresolvedOperationRef(String),

    /// A `$components.…` reference did not resolve.
    #[error("unresolved component reference '{0}'")]
    UnresolvedComponent(String),

    /// A `goto` named a step that is not part of the current workflow.
    #[error("step '{step_id}' is not part of workflow '{workflow_id}'")]
    StepIdNotInWorkflow { workflow_id: String, step_id: String },

    /// A dependency cycle, recursion-depth overflow, or transition-cap
    /// overflow terminated execution.
    #[error("circular dependency: {0}")]
    CircularDependency(String),

    /// An action was malformed in a way the validator would have rejected.
    #[error("invalid action '{name}': {reason}")]
    InvalidAction { name: String, reason: String },

    /// A step needed the injected executor but none was configured.
    #[error("no operation executor configured")]
    ExecutorNotConfigured,

    /// A source description could not be resolved into a usable document.
    #[error("failed to load source description '{name}': {reason}")]
    SourceDescLoadFailed { name: String, reason: String },

    /// A step failed its success criteria or a sub-workflow invocation.
    #[error(transparent)]
    StepFailure(#[from] StepFailureError),

    /// Transport error from the injected executor, propagated unwrapped.
    #[error(transparent)]
    Executor(anyhow::Error),

    /// A declared dependency of this workflow did not succeed.
    #[error("dependency '{dependency}' of workflow '{workflow_id}' failed: {cause}")]
    DependencyFailed {
        workflow_id: String,
        dependency: String,
        cause: String,
    },

    /// Cooperative cancellation was observed.
    #[error("workflow run cancelled")]
    Cancelled,
}

impl EngineError {
    /// Helper for evaluation failures tied to a specific expression.
    pub(crate) fn evaluation(expression: impl Into<String>, reason: impl fmt::Display) -> Self {
        EngineError::Evaluation {
            expression: expression.into(),
            reason: reason.to_string(),
        }
    }
}

/// A step-level failure pointing at the failing criterion when applicable.
#[derive(Debug, Default, thiserror::Error)]
pub struct StepFailureError {
    /// Identifier of the failing step.
    pub step_id: String,
    /// Index of the first unmet success criterion, when that caused the
    /// failure.
    pub criterion_index: Option<usize>,
    /// Underlying cause, when the failure was not a plain criterion miss.
    pub cause: Option<String>,
}

impl StepFailureError {
    pub fn new(step_id: impl Into<String>) -> Self {
        StepFailureError {
            step_id: step_id.into(),
            ..StepFailureError::default()
        }
    }

    pub fn criterion(step_id: impl Into<String>, index: usize) -> Self {
        StepFailureError {
            step_id: step_id.into(),
            criterion_index: Some(index),
            cause: None,
        }
    }

    pub fn caused(step_id: impl Into<String>, cause: impl fmt::Display) -> Self {
        StepFailureError {
            step_id: step_id.into(),
            criterion_index: None,
            cause: Some(cause.to_string()),
        }
    }
}

impl fmt::Display for StepFailureError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "step '{}' failed", self.step_id)?;
        if let Some(index) = self.criterion_index {
            write!(formatter, ": success criterion {} not met", index)?;
        }
        if let Some(cause) = &self.cause {
            write!(formatter, ": {}", cause)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_display_includes_criterion_index() {
        let plain = StepFailureError::new("s1");
        assert_eq!(plain.to_string(), "step 's1' failed");

        let criterion = StepFailureError::criterion("s1", 2);
        assert_eq!(criterion.to_string(), "step 's1' failed: success criterion 2 not met");

        let caused = StepFailureError::caused("s1", "boom");
        assert_eq!(caused.to_string(), "step 's1' failed: boom");
    }

    #[test]
    fn executor_errors_display_unwrapped() {
        let error = EngineError::Executor(anyhow::anyhow!("connection refused"));
        assert_eq!(error.to_string(), "connection refused");
    }
}
