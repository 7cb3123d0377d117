//! Runtime expression parsing.
//!
//! Expressions are `$`-prefixed references into the evaluation context
//! (`$inputs.petId`, `$response.body#/id`, `$steps.find.outputs.url`, …).
//! Parsing is dispatch-by-prefix: the family is selected by strict prefix
//! matching after the leading `$`, then the remaining tail is split
//! according to the family's shape. Strings may also embed expressions in
//! `{$…}` markers; [`parse_embedded`] tokenizes those into alternating
//! literal and expression segments.

use crate::error::EngineError;

/// A parsed runtime expression, keeping the raw text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    raw: String,
    kind: ExpressionKind,
}

impl Expression {
    /// The exact source text; `parse(e).raw() == e` for every expression
    /// that parses.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The structural variant.
    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }
}

/// The expression families of the Arazzo runtime expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// `$url`: URL of the most recent request.
    Url,
    /// `$method`: HTTP method of the most recent request.
    Method,
    /// `$statusCode`: status code of the most recent response.
    StatusCode,
    /// `$request.header.<name>`
    RequestHeader(String),
    /// `$request.query.<name>`
    RequestQuery(String),
    /// `$request.path.<name>`
    RequestPath(String),
    /// `$request.body` with an optional `#`-introduced JSON Pointer.
    RequestBody { pointer: Option<String> },
    /// `$response.header.<name>`
    ResponseHeader(String),
    /// `$response.query.<name>`
    ResponseQuery(String),
    /// `$response.path.<name>`
    ResponsePath(String),
    /// `$response.body` with an optional `#`-introduced JSON Pointer.
    ResponseBody { pointer: Option<String> },
    /// `$inputs.<name>`
    Input(String),
    /// `$outputs.<name>`
    Output(String),
    /// `$steps.<stepId>` followed by a dot-separated tail.
    Step { step_id: String, tail: Vec<String> },
    /// `$workflows.<workflowId>` followed by a dot-separated tail.
    Workflow { workflow_id: String, tail: Vec<String> },
    /// `$sourceDescriptions.<name>` followed by a dot-separated tail.
    SourceDescription { name: String, tail: Vec<String> },
    /// `$components.parameters.<name>`, the dedicated parameter form.
    ComponentParameter(String),
    /// `$components.<type>.<name>` followed by a dot-separated tail.
    Component {
        kind: String,
        name: String,
        tail: Vec<String>,
    },
}

/// One token produced by the embedded-expression scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedSegment {
    /// Verbatim text between expression markers.
    Literal(String),
    /// An expression found inside `{$…}`.
    Expr(Expression),
}

fn invalid(raw: &str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidExpression {
        expression: raw.to_string(),
        reason: reason.into(),
    }
}

/// Parses a single runtime expression.
pub fn parse(raw: &str) -> Result<Expression, EngineError> {
    let Some(body) = raw.strip_prefix('$') else {
        return Err(invalid(raw, "expression must start with '$'"));
    };
    if body.is_empty() {
        return Err(invalid(raw, "expression is empty after '$'"));
    }

    let kind = match body {
        "url" => ExpressionKind::Url,
        "method" => ExpressionKind::Method,
        "statusCode" => ExpressionKind::StatusCode,
        _ => parse_family(raw, body)?,
    };

    Ok(Expression {
        raw: raw.to_string(),
        kind,
    })
}

fn parse_family(raw: &str, body: &str) -> Result<ExpressionKind, EngineError> {
    if let Some(tail) = body.strip_prefix("request.") {
        return parse_message_part(raw, tail, true);
    }
    if let Some(tail) = body.strip_prefix("response.") {
        return parse_message_part(raw, tail, false);
    }
    if let Some(name) = body.strip_prefix("inputs.") {
        return named(raw, name, "inputs").map(ExpressionKind::Input);
    }
    if let Some(name) = body.strip_prefix("outputs.") {
        return named(raw, name, "outputs").map(ExpressionKind::Output);
    }
    if let Some(tail) = body.strip_prefix("steps.") {
        let (step_id, tail) = split_head(raw, tail, "steps")?;
        return Ok(ExpressionKind::Step { step_id, tail });
    }
    if let Some(tail) = body.strip_prefix("workflows.") {
        let (workflow_id, tail) = split_head(raw, tail, "workflows")?;
        return Ok(ExpressionKind::Workflow { workflow_id, tail });
    }
    if let Some(tail) = body.strip_prefix("sourceDescriptions.") {
        let (name, tail) = split_head(raw, tail, "sourceDescriptions")?;
        return Ok(ExpressionKind::SourceDescription { name, tail });
    }
    if let Some(tail) = body.strip_prefix("components.") {
        let (kind, rest) = split_head(raw, tail, "components")?;
        let Some((name, tail)) = rest.split_first() else {
            return Err(invalid(raw, format!("component reference '$components.{kind}' is missing a name")));
        };
        if kind == "parameters" && tail.is_empty() {
            return Ok(ExpressionKind::ComponentParameter(name.clone()));
        }
        return Ok(ExpressionKind::Component {
            kind,
            name: name.clone(),
            tail: tail.to_vec(),
        });
    }

    Err(EngineError::UnknownExpressionPrefix(raw.to_string()))
}

/// Parses the tail shared by `$request.…` and `$response.…`.
fn parse_message_part(raw: &str, tail: &str, request: bool) -> Result<ExpressionKind, EngineError> {
    if let Some(name) = tail.strip_prefix("header.") {
        let name = named(raw, name, "header")?;
        if !name.chars().all(is_header_token_char) {
            return Err(invalid(raw, format!("'{name}' is not a valid HTTP header name")));
        }
        return Ok(if request {
            ExpressionKind::RequestHeader(name)
        } else {
            ExpressionKind::ResponseHeader(name)
        });
    }
    if let Some(name) = tail.strip_prefix("query.") {
        let name = named(raw, name, "query")?;
        return Ok(if request {
            ExpressionKind::RequestQuery(name)
        } else {
            ExpressionKind::ResponseQuery(name)
        });
    }
    if let Some(name) = tail.strip_prefix("path.") {
        let name = named(raw, name, "path")?;
        return Ok(if request {
            ExpressionKind::RequestPath(name)
        } else {
            ExpressionKind::ResponsePath(name)
        });
    }
    if tail == "body" {
        return Ok(if request {
            ExpressionKind::RequestBody { pointer: None }
        } else {
            ExpressionKind::ResponseBody { pointer: None }
        });
    }
    if let Some(pointer) = tail.strip_prefix("body#") {
        let pointer = Some(pointer.to_string());
        return Ok(if request {
            ExpressionKind::RequestBody { pointer }
        } else {
            ExpressionKind::ResponseBody { pointer }
        });
    }

    Err(EngineError::UnknownExpressionPrefix(raw.to_string()))
}

fn named(raw: &str, name: &str, family: &str) -> Result<String, EngineError> {
    if name.is_empty() {
        return Err(invalid(raw, format!("missing name after '{family}.'")));
    }
    Ok(name.to_string())
}

fn split_head(raw: &str, tail: &str, family: &str) -> Result<(String, Vec<String>), EngineError> {
    let mut segments = tail.split('.').map(str::to_string);
    let head = segments.next().unwrap_or_default();
    if head.is_empty() {
        return Err(invalid(raw, format!("missing name after '{family}.'")));
    }
    let rest: Vec<String> = segments.collect();
    if rest.iter().any(String::is_empty) {
        return Err(invalid(raw, "empty path segment"));
    }
    Ok((head, rest))
}

/// RFC 7230 `tchar`: the characters legal in an HTTP header field name.
fn is_header_token_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(character)
}

/// Scans a string for `{$…}` markers.
///
/// The first `{$` opens an expression and the next `}` closes it; the
/// scanner is context-free over the brace boundaries and does not honor
/// escaped braces. A `{$` with no closing brace is an error.
pub fn parse_embedded(raw: &str) -> Result<Vec<EmbeddedSegment>, EngineError> {
    let mut segments = Vec::new();
    let mut remaining = raw;
    let mut offset = 0usize;

    while let Some(open) = remaining.find("{$") {
        if open > 0 {
            segments.push(EmbeddedSegment::Literal(remaining[..open].to_string()));
        }
        let after_open = &remaining[open + 1..];
        let Some(close) = after_open.find('}') else {
            return Err(invalid(
                raw,
                format!("embedded expression opened at byte {} has no closing '}}'", offset + open),
            ));
        };
        segments.push(EmbeddedSegment::Expr(parse(&after_open[..close])?));
        let consumed = open + 1 + close + 1;
        offset += consumed;
        remaining = &remaining[consumed..];
    }

    if !remaining.is_empty() {
        segments.push(EmbeddedSegment::Literal(remaining.to_string()));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transient_fields() {
        assert_eq!(parse("$url").expect("url").kind(), &ExpressionKind::Url);
        assert_eq!(parse("$method").expect("method").kind(), &ExpressionKind::Method);
        assert_eq!(parse("$statusCode").expect("status").kind(), &ExpressionKind::StatusCode);
    }

    #[test]
    fn parses_request_and_response_parts() {
        assert_eq!(
            parse("$request.header.X-Api-Key").expect("header").kind(),
            &ExpressionKind::RequestHeader("X-Api-Key".into())
        );
        assert_eq!(
            parse("$response.query.page").expect("query").kind(),
            &ExpressionKind::ResponseQuery("page".into())
        );
        assert_eq!(
            parse("$request.body").expect("body").kind(),
            &ExpressionKind::RequestBody { pointer: None }
        );
        assert_eq!(
            parse("$response.body#/items/0/id").expect("pointer").kind(),
            &ExpressionKind::ResponseBody {
                pointer: Some("/items/0/id".into())
            }
        );
    }

    #[test]
    fn header_names_must_be_rfc7230_tokens() {
        assert!(parse("$request.header.X-Api-Key").is_ok());
        assert!(matches!(
            parse("$request.header.bad name"),
            Err(EngineError::InvalidExpression { .. })
        ));
        assert!(matches!(
            parse("$response.header.caf\u{e9}"),
            Err(EngineError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn parses_named_families_and_tails() {
        assert_eq!(parse("$inputs.petId").expect("input").kind(), &ExpressionKind::Input("petId".into()));
        assert_eq!(
            parse("$steps.find.outputs.url").expect("step").kind(),
            &ExpressionKind::Step {
                step_id: "find".into(),
                tail: vec!["outputs".into(), "url".into()],
            }
        );
        assert_eq!(
            parse("$workflows.setup.outputs.token").expect("workflow").kind(),
            &ExpressionKind::Workflow {
                workflow_id: "setup".into(),
                tail: vec!["outputs".into(), "token".into()],
            }
        );
        assert_eq!(
            parse("$sourceDescriptions.petstore.url").expect("source").kind(),
            &ExpressionKind::SourceDescription {
                name: "petstore".into(),
                tail: vec!["url".into()],
            }
        );
    }

    #[test]
    fn component_parameters_get_the_dedicated_variant() {
        assert_eq!(
            parse("$components.parameters.apiKey").expect("parameter").kind(),
            &ExpressionKind::ComponentParameter("apiKey".into())
        );
        assert_eq!(
            parse("$components.successActions.done").expect("action").kind(),
            &ExpressionKind::Component {
                kind: "successActions".into(),
                name: "done".into(),
                tail: vec![],
            }
        );
    }

    #[test]
    fn rejects_empty_tails_and_unknown_prefixes() {
        assert!(matches!(parse("$inputs."), Err(EngineError::InvalidExpression { .. })));
        assert!(matches!(parse("$steps."), Err(EngineError::InvalidExpression { .. })));
        assert!(matches!(parse("$components.parameters"), Err(EngineError::InvalidExpression { .. })));
        assert!(matches!(parse("$bogus.thing"), Err(EngineError::UnknownExpressionPrefix(_))));
        assert!(matches!(parse("statusCode"), Err(EngineError::InvalidExpression { .. })));
        assert!(matches!(parse("$request.bodyid"), Err(EngineError::UnknownExpressionPrefix(_))));
    }

    #[test]
    fn raw_is_the_left_inverse_of_parse() {
        let expressions = [
            "$url",
            "$statusCode",
            "$request.header.Authorization",
            "$request.path.petId",
            "$response.body#/a~1b/~0c",
            "$inputs.token",
            "$outputs.createdId",
            "$steps.create.outputs.petId",
            "$workflows.setup.inputs.region",
            "$sourceDescriptions.petstore.url",
            "$components.parameters.page",
            "$components.failureActions.retryTwice",
        ];
        for raw in expressions {
            assert_eq!(parse(raw).expect(raw).raw(), raw);
        }
    }

    #[test]
    fn embedded_scanner_alternates_literals_and_expressions() {
        let segments = parse_embedded("Bearer {$inputs.token} for {$steps.find.outputs.id}").expect("scan");
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], EmbeddedSegment::Literal("Bearer ".into()));
        assert!(matches!(&segments[1], EmbeddedSegment::Expr(expression) if expression.raw() == "$inputs.token"));
        assert_eq!(segments[2], EmbeddedSegment::Literal(" for ".into()));
        assert!(matches!(&segments[3], EmbeddedSegment::Expr(expression) if expression.raw() == "$steps.find.outputs.id"));
    }

    #[test]
    fn embedded_scanner_ignores_plain_braces() {
        let segments = parse_embedded("no {braces} here").expect("scan");
        assert_eq!(segments, vec![EmbeddedSegment::Literal("no {braces} here".into())]);
    }

    #[test]
    fn embedded_scanner_requires_a_closing_brace() {
        let error = parse_embedded("prefix {$inputs.name").expect_err("must fail");
        assert!(matches!(error, EngineError::InvalidExpression { .. }));
        assert!(error.to_string().contains("no closing"));
    }
}
