//! Document-level validation rules: version, metadata, identity
//! uniqueness, dependency resolution, and dependency cycles.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use arazzo_types::{ArazzoDocument, Workflow};

use super::{IssueCode, ValidationResult};

static COMPONENT_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("component key pattern compiles"));
static SOURCE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("source name pattern compiles"));

pub(super) fn validate(document: &ArazzoDocument, result: &mut ValidationResult) {
    validate_version(document, result);
    validate_info(document, result);
    validate_source_descriptions(document, result);
    validate_workflow_identity(document, result);
    validate_depends_on(document, result);
    validate_dependency_cycles(document, result);
    validate_component_keys(document, result);
}

fn validate_version(document: &ArazzoDocument, result: &mut ValidationResult) {
    if document.arazzo.is_empty() {
        result.error(IssueCode::MissingArazzoField, "arazzo", "the 'arazzo' version field is required");
        return;
    }
    let mut parts = document.arazzo.splitn(3, '.');
    let major_minor = (parts.next(), parts.next(), parts.next());
    if !matches!(major_minor, (Some("1"), Some("0"), Some(patch)) if patch.chars().all(|c| c.is_ascii_digit()) && !patch.is_empty()) {
        result.error(
            IssueCode::InvalidArazzo,
            "arazzo",
            format!("unsupported arazzo version '{}'; expected 1.0.x", document.arazzo),
        );
    }
}

fn validate_info(document: &ArazzoDocument, result: &mut ValidationResult) {
    let Some(info) = &document.info else {
        result.error(IssueCode::MissingInfo, "info", "the 'info' block is required");
        return;
    };
    if info.title.is_empty() {
        result.error(IssueCode::MissingInfo, "info.title", "info requires a non-empty title");
    }
    if info.version.is_empty() {
        result.error(IssueCode::MissingInfo, "info.version", "info requires a non-empty version");
    }
}

fn validate_source_descriptions(document: &ArazzoDocument, result: &mut ValidationResult) {
    if document.source_descriptions.is_empty() {
        result.error(
            IssueCode::MissingSourceDescriptions,
            "sourceDescriptions",
            "at least one source description is required",
        );
    }

    let mut seen_names = HashSet::new();
    for (index, source) in document.source_descriptions.iter().enumerate() {
        let path = format!("sourceDescriptions[{index}]");
        if source.name.is_empty() {
            result.error(IssueCode::MissingSourceName, format!("{path}.name"), "source description requires a name");
        } else {
            if !seen_names.insert(source.name.as_str()) {
                result.error(
                    IssueCode::DuplicateSourceName,
                    format!("{path}.name"),
                    format!("duplicate source description name '{}'", source.name),
                );
            }
            if !SOURCE_NAME.is_match(&source.name) {
                result.warning(
                    IssueCode::InvalidSourceName,
                    format!("{path}.name"),
                    format!("source name '{}' should match [A-Za-z0-9_-]+", source.name),
                );
            }
        }
        if source.url.is_empty() {
            result.error(IssueCode::MissingSourceUrl, format!("{path}.url"), "source description requires a url");
        }
        if !matches!(source.kind.as_str(), "" | "openapi" | "arazzo") {
            result.error(
                IssueCode::InvalidSourceType,
                format!("{path}.type"),
                format!("source type '{}' must be 'openapi' or 'arazzo'", source.kind),
            );
        }
    }
}

fn validate_workflow_identity(document: &ArazzoDocument, result: &mut ValidationResult) {
    if document.workflows.is_empty() {
        result.error(IssueCode::MissingWorkflows, "workflows", "at least one workflow is required");
    }

    let mut seen_ids = HashSet::new();
    for (index, workflow) in document.workflows.iter().enumerate() {
        let path = format!("workflows[{index}]");
        if workflow.workflow_id.is_empty() {
            result.error(
                IssueCode::MissingWorkflowId,
                format!("{path}.workflowId"),
                "workflow requires a workflowId",
            );
        } else if !seen_ids.insert(workflow.workflow_id.as_str()) {
            result.error(
                IssueCode::DuplicateWorkflowId,
                format!("{path}.workflowId"),
                format!("duplicate workflowId '{}'", workflow.workflow_id),
            );
        }
    }
}

fn validate_depends_on(document: &ArazzoDocument, result: &mut ValidationResult) {
    for (index, workflow) in document.workflows.iter().enumerate() {
        for (dependency_index, dependency) in workflow.depends_on.iter().enumerate() {
            if document.workflow(dependency).is_none() {
                result.error(
                    IssueCode::UnresolvedWorkflowRef,
                    format!("workflows[{index}].dependsOn[{dependency_index}]"),
                    format!("'{}' does not name a workflow in this document", dependency),
                );
            }
        }
    }
}

/// Depth-first cycle search over `dependsOn`, reporting the cycle path.
fn validate_dependency_cycles(document: &ArazzoDocument, result: &mut ValidationResult) {
    let lookup: HashMap<&str, &Workflow> = document
        .workflows
        .iter()
        .map(|workflow| (workflow.workflow_id.as_str(), workflow))
        .collect();

    let mut finished: HashSet<&str> = HashSet::new();
    for workflow in &document.workflows {
        if finished.contains(workflow.workflow_id.as_str()) {
            continue;
        }
        let mut stack = Vec::new();
        if let Some(cycle) = find_cycle(workflow.workflow_id.as_str(), &lookup, &mut stack, &mut finished) {
            result.error(
                IssueCode::CircularDependency,
                "workflows",
                format!("circular workflow dependency: {}", cycle.join(" -> ")),
            );
            return;
        }
    }
}

fn find_cycle<'doc>(
    workflow_id: &'doc str,
    lookup: &HashMap<&'doc str, &'doc Workflow>,
    stack: &mut Vec<&'doc str>,
    finished: &mut HashSet<&'doc str>,
) -> Option<Vec<&'doc str>> {
    if let Some(position) = stack.iter().position(|entry| *entry == workflow_id) {
        let mut cycle: Vec<&str> = stack[position..].to_vec();
        cycle.push(workflow_id);
        return Some(cycle);
    }
    if finished.contains(workflow_id) {
        return None;
    }

    stack.push(workflow_id);
    if let Some(workflow) = lookup.get(workflow_id) {
        for dependency in &workflow.depends_on {
            if lookup.contains_key(dependency.as_str())
                && let Some(cycle) = find_cycle(dependency.as_str(), lookup, stack, finished)
            {
                return Some(cycle);
            }
        }
    }
    stack.pop();
    finished.insert(workflow_id);
    None
}

fn validate_component_keys(document: &ArazzoDocument, result: &mut ValidationResult) {
    let Some(components) = &document.components else {
        return;
    };
    let collections: [(&str, Vec<&String>); 4] = [
        ("components.parameters", components.parameters.keys().collect()),
        ("components.successActions", components.success_actions.keys().collect()),
        ("components.failureActions", components.failure_actions.keys().collect()),
        ("components.inputs", components.inputs.keys().collect()),
    ];
    for (path, keys) in collections {
        for key in keys {
            if !COMPONENT_KEY.is_match(key) {
                result.error(
                    IssueCode::InvalidComponentKey,
                    format!("{path}.{key}"),
                    format!("component key '{key}' must match [A-Za-z0-9._-]+"),
                );
            }
        }
    }
}

/// Shared with the per-workflow rules: output-map keys obey the component
/// key pattern.
pub(super) fn valid_output_key(key: &str) -> bool {
    COMPONENT_KEY.is_match(key)
}
