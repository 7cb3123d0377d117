//! Operation-reference validation against attached source documents.
//!
//! Active only when the host attached at least one resolved OpenAPI
//! document. Declared source descriptions are matched to resolved sources
//! first by normalized URL identity, then by position; a declared OpenAPI
//! source with no match is a warning, not an error.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use arazzo_types::{ArazzoDocument, OpenApiDocument};

use crate::sources::{self, ResolvedSource};

use super::{IssueCode, ValidationResult};

pub(super) fn validate(document: &ArazzoDocument, sources: &[ResolvedSource], result: &mut ValidationResult) {
    let attached: Vec<&ResolvedSource> = sources.iter().filter(|source| source.openapi.is_some()).collect();
    if attached.is_empty() {
        return;
    }

    let matched = match_sources(document, &attached, result);
    let documents: Vec<&Arc<OpenApiDocument>> = attached.iter().filter_map(|source| source.openapi.as_ref()).collect();

    for (workflow_index, workflow) in document.workflows.iter().enumerate() {
        for (step_index, step) in workflow.steps.iter().enumerate() {
            let path = format!("workflows[{workflow_index}].steps[{step_index}]");
            if let Some(operation_id) = &step.operation_id
                && !documents.iter().any(|document| document.contains_operation_id(operation_id))
            {
                result.error(
                    IssueCode::UnresolvedOperationRef,
                    format!("{path}.operationId"),
                    format!("operationId '{operation_id}' not found in any attached OpenAPI document"),
                );
            }
            if let Some(operation_path) = &step.operation_path {
                validate_operation_path(operation_path, &path, &matched, &documents, result);
            }
        }
    }
}

/// Maps declared source-description names to their resolved OpenAPI
/// documents; unmatched OpenAPI sources produce a warning.
fn match_sources<'src>(
    document: &ArazzoDocument,
    attached: &[&'src ResolvedSource],
    result: &mut ValidationResult,
) -> HashMap<String, &'src Arc<OpenApiDocument>> {
    let mut matched = HashMap::new();
    for (index, declared) in document.source_descriptions.iter().enumerate() {
        if declared.kind == "arazzo" {
            continue;
        }
        let by_url = attached
            .iter()
            .find(|source| urls_match(&source.url, &declared.url))
            .or_else(|| attached.get(index));
        match by_url.and_then(|source| source.openapi.as_ref()) {
            Some(openapi) => {
                matched.insert(declared.name.clone(), openapi);
            }
            None => result.warning(
                IssueCode::UnmatchedSourceDocument,
                format!("sourceDescriptions[{index}]"),
                format!("no resolved OpenAPI document matches source '{}'", declared.name),
            ),
        }
    }
    matched
}

fn urls_match(left: &str, right: &str) -> bool {
    match (Url::parse(left), Url::parse(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}

fn validate_operation_path(
    operation_path: &str,
    step_path: &str,
    matched: &HashMap<String, &Arc<OpenApiDocument>>,
    documents: &[&Arc<OpenApiDocument>],
    result: &mut ValidationResult,
) {
    let Some(reference) = sources::parse_operation_path(operation_path) else {
        result.error(
            IssueCode::UnresolvedOperationRef,
            format!("{step_path}.operationPath"),
            format!("'{operation_path}' is not of the form {{source}}#/paths/{{path}}/{{method}}"),
        );
        return;
    };

    let found = match reference.source_name.as_deref().and_then(|name| matched.get(name)) {
        Some(document) => document.operation(&reference.path, &reference.method).is_some(),
        None => documents
            .iter()
            .any(|document| document.operation(&reference.path, &reference.method).is_some()),
    };
    if !found {
        result.error(
            IssueCode::UnresolvedOperationRef,
            format!("{step_path}.operationPath"),
            format!("no operation at '{} {}' in the matched source document", reference.method, reference.path),
        );
    }
}
