//! Structural validation of an Arazzo document.
//!
//! The validator is non-fatal: it walks the whole document, collects every
//! violation with a path (and source position when the document factory
//! supplied one), and leaves the decision to proceed to the caller.
//! Execution is conventionally gated on [`ValidationResult::has_errors`].
//!
//! The rule set is split across focused submodules: document-level shape
//! and identity rules, per-workflow rules (steps, parameters, actions,
//! criteria), and operation-reference resolution against attached source
//! documents.

mod document;
mod operations;
mod workflows;

use std::fmt;

use arazzo_types::ArazzoDocument;

use crate::sources::ResolvedSource;

/// Stable identifier of a validation rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    InvalidArazzo,
    MissingArazzoField,
    MissingInfo,
    MissingSourceDescriptions,
    MissingWorkflows,
    MissingSteps,
    MissingWorkflowId,
    DuplicateWorkflowId,
    MissingStepId,
    DuplicateStepId,
    StepMutualExclusion,
    InvalidParameterIn,
    MissingParameterName,
    MissingParameterValue,
    MissingParameterIn,
    DuplicateParameter,
    MissingActionName,
    MissingActionType,
    InvalidSuccessType,
    InvalidFailureType,
    ActionMutualExclusion,
    GotoRequiresTarget,
    StepIdNotInWorkflow,
    DuplicateActionName,
    NegativeRetryField,
    MissingCondition,
    MissingCriterionContext,
    InvalidCriterionType,
    UnknownExpressionVersion,
    UnknownExpressionPrefix,
    InvalidExpression,
    UnresolvedWorkflowRef,
    UnresolvedOperationRef,
    UnresolvedComponent,
    CircularDependency,
    InvalidComponentKey,
    InvalidOutputKey,
    InvalidSourceName,
    InvalidSourceType,
    MissingSourceName,
    MissingSourceUrl,
    DuplicateSourceName,
    UnmatchedSourceDocument,
}

/// One finding, anchored to a document path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub code: IssueCode,
    /// Dotted path into the document, e.g. `workflows[1].steps[0].stepId`.
    pub path: String,
    pub message: String,
    /// Source line, when the document factory recorded positions.
    pub line: Option<usize>,
    /// Source column, when the document factory recorded positions.
    pub column: Option<usize>,
}

impl ValidationIssue {
    pub(crate) fn new(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            code,
            path: path.into(),
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {} ({:?})", self.path, self.message, self.code)
    }
}

/// Everything the validator found, split by severity.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// True when at least one error-severity issue was collected.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn error(&mut self, code: IssueCode, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(code, path, message));
    }

    pub(crate) fn warning(&mut self, code: IssueCode, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(code, path, message));
    }

    /// The collected errors for a specific code, mostly for assertions.
    pub fn errors_with(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(move |issue| issue.code == code)
    }
}

/// Runs the full rule set over a document.
///
/// `sources` carries the host-resolved source documents; operation
/// references are only checked when at least one OpenAPI document is
/// attached.
pub fn validate_document(document: &ArazzoDocument, sources: &[ResolvedSource]) -> ValidationResult {
    let mut result = ValidationResult::default();
    document::validate(document, &mut result);
    for (index, workflow) in document.workflows.iter().enumerate() {
        workflows::validate(document, workflow, index, &mut result);
    }
    operations::validate(document, sources, &mut result);
    tracing::debug!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "document validation finished"
    );
    result
}
