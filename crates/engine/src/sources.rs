//! Resolved source descriptions and operation-path references.
//!
//! Source fetching (URL/file retrieval, sandboxing, size caps) is a host
//! collaborator's job; the engine consumes already-resolved results. This
//! module also owns the shared parsing of `operationPath` references,
//! `{$sourceDescriptions.<name>.url}#/paths/<encoded-path>/<method>`, used
//! by both the step executor and the validator.

use std::sync::Arc;

use percent_encoding::percent_decode_str;

use arazzo_types::{ArazzoDocument, OpenApiDocument};
use arazzo_util::unescape_token;

/// One source description resolved into a usable document.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSource {
    /// Name matching the document's source description.
    pub name: String,
    /// URL the document was resolved from.
    pub url: String,
    /// Declared kind: `openapi`, `arazzo`, or empty.
    pub kind: String,
    /// Attached OpenAPI document, when the source is an OpenAPI one.
    pub openapi: Option<Arc<OpenApiDocument>>,
    /// Attached Arazzo document, when the source is an Arazzo one.
    pub arazzo: Option<Arc<ArazzoDocument>>,
}

/// A decomposed `operationPath` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPathRef {
    /// Source description name from the `{$sourceDescriptions.<name>…}`
    /// prefix, when present.
    pub source_name: Option<String>,
    /// Decoded path template, e.g. `/pets/{id}`.
    pub path: String,
    /// Lowercase HTTP method from the final fragment segment.
    pub method: String,
}

/// Parses an `operationPath` into its source, path, and method parts.
///
/// The encoded path segment is percent-decoded and then JSON-Pointer
/// unescaped (`~1` to `/`, `~0` to `~`). Returns `None` for anything that
/// does not follow the `…#/paths/<encoded-path>/<method>` shape.
pub(crate) fn parse_operation_path(operation_path: &str) -> Option<OperationPathRef> {
    let (prefix, fragment) = operation_path.split_once('#')?;
    let rest = fragment.strip_prefix("/paths/")?;
    let (encoded_path, method) = rest.rsplit_once('/')?;
    if encoded_path.is_empty() || method.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(encoded_path).decode_utf8().ok()?;
    Some(OperationPathRef {
        source_name: source_name_in(prefix),
        path: unescape_token(&decoded),
        method: method.to_ascii_lowercase(),
    })
}

/// Extracts the `<name>` out of a `$sourceDescriptions.<name>…` segment.
pub(crate) fn source_name_in(text: &str) -> Option<String> {
    let start = text.find("$sourceDescriptions.")? + "$sourceDescriptions.".len();
    let tail = &text[start..];
    let end = tail.find(['.', '}', '#']).unwrap_or(tail.len());
    let name = &tail[..end];
    (!name.is_empty()).then(|| name.to_string())
}

/// Picks the source an execution request should carry.
///
/// A single resolved source wins outright; otherwise an explicit
/// `$sourceDescriptions.<name>` segment in the operation path selects by
/// name; otherwise the first declared source description that resolved is
/// used; otherwise the request goes out with no source.
pub(crate) fn select_source<'a>(
    sources: &'a [ResolvedSource],
    document: &ArazzoDocument,
    operation_path: Option<&str>,
) -> Option<&'a ResolvedSource> {
    if sources.len() == 1 {
        return sources.first();
    }
    if let Some(name) = operation_path.and_then(source_name_in)
        && let Some(source) = sources.iter().find(|source| source.name == name)
    {
        return Some(source);
    }
    document
        .source_descriptions
        .iter()
        .find_map(|declared| sources.iter().find(|source| source.name == declared.name))
}
