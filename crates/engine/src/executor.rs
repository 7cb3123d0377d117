//! The injected operation executor seam.
//!
//! The engine never talks HTTP itself. Each operation step is compiled into
//! an [`ExecutionRequest`] and handed to the host-provided
//! [`OperationExecutor`], which owns URL construction, header/query/path
//! substitution, the actual transport, and decoding the response body into
//! a structured value.

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use arazzo_types::Value;

use crate::error::EngineError;
use crate::sources::ResolvedSource;

/// Where a request parameter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Parses the document-level `in` string.
    pub fn parse(location: &str) -> Result<Self, EngineError> {
        match location {
            "path" => Ok(ParameterLocation::Path),
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "cookie" => Ok(ParameterLocation::Cookie),
            other => Err(EngineError::evaluation(
                other,
                "parameter location must be one of path, query, header, cookie",
            )),
        }
    }
}

/// One resolved request parameter.
#[derive(Debug, Clone)]
pub struct ExecutionParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub value: Value,
}

/// Everything the executor needs to perform one operation call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// The source document the operation belongs to, when one could be
    /// determined.
    pub source: Option<ResolvedSource>,
    /// OpenAPI `operationId` reference, when the step used one.
    pub operation_id: Option<String>,
    /// Raw `operationPath` reference, when the step used one.
    pub operation_path: Option<String>,
    /// HTTP method, populated when the operation path names it; otherwise
    /// the executor derives it from its OpenAPI document.
    pub method: Option<String>,
    /// Resolved parameters in declaration order.
    pub parameters: Vec<ExecutionParameter>,
    /// Resolved request body, replacements applied.
    pub request_body: Option<Value>,
    /// Declared content type of the body.
    pub content_type: Option<String>,
}

/// What came back from the wire.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResponse {
    pub status_code: u16,
    /// All response headers; the engine exposes the first value per name to
    /// expressions.
    pub headers: IndexMap<String, Vec<String>>,
    /// Response body decoded into a structured value.
    pub body: Value,
    /// Effective URL of the request, after substitution.
    pub url: String,
    /// Effective HTTP method.
    pub method: String,
}

/// Executes operation calls on behalf of the engine.
///
/// Implementations are expected to honor the cancellation token for
/// in-flight I/O; the engine checks it around every suspension point but
/// cannot abort a transport that ignores it.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(&self, cancel: &CancellationToken, request: ExecutionRequest) -> Result<ExecutionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_location_parses_the_four_locations() {
        assert_eq!(ParameterLocation::parse("path").expect("path"), ParameterLocation::Path);
        assert_eq!(ParameterLocation::parse("query").expect("query"), ParameterLocation::Query);
        assert_eq!(ParameterLocation::parse("header").expect("header"), ParameterLocation::Header);
        assert_eq!(ParameterLocation::parse("cookie").expect("cookie"), ParameterLocation::Cookie);
        assert!(ParameterLocation::parse("body").is_err());
    }
}
