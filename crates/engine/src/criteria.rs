//! Criterion evaluation.
//!
//! A [`Criterion`] gates step success and action selection. Simple criteria
//! are boolean conditions over runtime expressions and literals; regex and
//! JSONPath criteria apply their pattern to a mandatory context expression.
//! XPath is accepted by the validator but has no evaluator, so it fails
//! here with a descriptive error. Compiled regexes, parsed JSONPath
//! queries, and parsed expressions come out of the per-engine caches.

use arazzo_types::{Criterion, Value};

use crate::cache::Caches;
use crate::context::EvalContext;
use crate::error::EngineError;
use crate::expr;

const COMPARISON_OPERATORS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];

/// Evaluates one criterion against the context.
pub(crate) fn evaluate_criterion(caches: &Caches, criterion: &Criterion, context: &EvalContext) -> Result<bool, EngineError> {
    match criterion.effective_type() {
        "" | "simple" => match &criterion.context {
            Some(context_expression) => simple_with_context(caches, context, context_expression, &criterion.condition),
            None => simple_condition(caches, context, &criterion.condition),
        },
        "regex" => regex_criterion(caches, context, criterion),
        "jsonpath" => jsonpath_criterion(caches, context, criterion),
        "xpath" => Err(EngineError::evaluation(
            &criterion.condition,
            "xpath criteria are accepted by the validator but not supported at evaluation time",
        )),
        other => Err(EngineError::evaluation(
            &criterion.condition,
            format!("unknown criterion type '{other}'"),
        )),
    }
}

/// Evaluates a simple condition with no context expression.
///
/// Recognized shapes, in priority order: empty (false), the literals
/// `true` / `false`, `LHS OP RHS`, and a bare expression that must resolve
/// to a boolean.
fn simple_condition(caches: &Caches, context: &EvalContext, condition: &str) -> Result<bool, EngineError> {
    let trimmed = condition.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    if trimmed == "true" {
        return Ok(true);
    }
    if trimmed == "false" {
        return Ok(false);
    }

    if let Some((operator, split_at)) = find_comparison_operator(trimmed) {
        let left_raw = trimmed[..split_at].trim();
        let right_raw = trimmed[split_at + operator.len()..].trim();
        if left_raw.is_empty() || right_raw.is_empty() {
            return Err(EngineError::evaluation(
                condition,
                "comparison must include both left and right operands",
            ));
        }
        let left = evaluate_operand(caches, context, left_raw)?;
        let right = evaluate_operand(caches, context, right_raw)?;
        return compare(condition, operator, &left, &right);
    }

    match evaluate_operand(caches, context, trimmed)? {
        Value::Bool(flag) => Ok(flag),
        other => Err(EngineError::evaluation(
            condition,
            format!("bare condition must evaluate to a boolean, got {}", other.kind_name()),
        )),
    }
}

/// Finds the leftmost comparison operator whose left-hand side is a
/// complete operand.
///
/// The scan skips quoted text. A candidate is rejected when the would-be
/// LHS ends inside a JSON-Pointer reference (it contains a `#` introducer
/// and runs straight into the operator with no separating whitespace), so
/// pointer tails containing `>` or `<` do not split the condition.
fn find_comparison_operator(condition: &str) -> Option<(&'static str, usize)> {
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for (index, character) in condition.char_indices() {
        match character {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                continue;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                continue;
            }
            _ => {}
        }
        if in_single_quote || in_double_quote {
            continue;
        }

        for operator in COMPARISON_OPERATORS {
            if condition[index..].starts_with(operator) && left_side_is_complete(&condition[..index]) {
                return Some((operator, index));
            }
        }
    }
    None
}

fn left_side_is_complete(left: &str) -> bool {
    if left.trim().is_empty() {
        return false;
    }
    if left.ends_with(char::is_whitespace) {
        return true;
    }
    !left.contains('#')
}

/// Resolves one comparison operand: expression, quoted string, boolean,
/// integer, float, or bare string, in that order.
fn evaluate_operand(caches: &Caches, context: &EvalContext, raw: &str) -> Result<Value, EngineError> {
    if raw.starts_with('$') {
        let expression = caches.expression(raw)?;
        return expr::evaluate(&expression, context);
    }
    if let Some(text) = strip_matching_quotes(raw) {
        return Ok(Value::String(text.to_string()));
    }
    Ok(parse_literal(raw))
}

fn strip_matching_quotes(raw: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(&raw[1..raw.len() - 1]);
        }
    }
    None
}

fn parse_literal(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Value::Float(float);
    }
    Value::String(raw.to_string())
}

fn compare(condition: &str, operator: &str, left: &Value, right: &Value) -> Result<bool, EngineError> {
    if let (Some(left_number), Some(right_number)) = (left.as_f64(), right.as_f64()) {
        return Ok(match operator {
            "==" => left_number == right_number,
            "!=" => left_number != right_number,
            ">=" => left_number >= right_number,
            "<=" => left_number <= right_number,
            ">" => left_number > right_number,
            "<" => left_number < right_number,
            _ => false,
        });
    }

    match operator {
        "==" => Ok(left.to_string() == right.to_string()),
        "!=" => Ok(left.to_string() != right.to_string()),
        ordering => match (left, right) {
            (Value::String(left_text), Value::String(right_text)) => Ok(match ordering {
                ">=" => left_text >= right_text,
                "<=" => left_text <= right_text,
                ">" => left_text > right_text,
                _ => left_text < right_text,
            }),
            _ => Err(EngineError::evaluation(
                condition,
                format!(
                    "unsupported operator '{ordering}' for {} and {}",
                    left.kind_name(),
                    right.kind_name()
                ),
            )),
        },
    }
}

/// Simple criterion with a context expression: the resolved context is
/// compared for equality against the condition read as a literal.
fn simple_with_context(
    caches: &Caches,
    context: &EvalContext,
    context_expression: &str,
    condition: &str,
) -> Result<bool, EngineError> {
    let resolved = expr::resolve_expression_string(caches, context, context_expression)?;
    let literal = match strip_matching_quotes(condition.trim()) {
        Some(text) => Value::String(text.to_string()),
        None => parse_literal(condition.trim()),
    };
    if let (Some(left), Some(right)) = (resolved.as_f64(), literal.as_f64()) {
        return Ok(left == right);
    }
    Ok(resolved.to_string() == literal.to_string())
}

fn regex_criterion(caches: &Caches, context: &EvalContext, criterion: &Criterion) -> Result<bool, EngineError> {
    let Some(context_expression) = &criterion.context else {
        return Err(EngineError::evaluation(
            &criterion.condition,
            "regex criterion requires a context expression",
        ));
    };
    let resolved = expr::resolve_expression_string(caches, context, context_expression)?;
    let haystack = resolved.to_string();
    if haystack.is_empty() {
        return Ok(false);
    }
    let regex = caches.regex(&criterion.condition)?;
    Ok(regex.is_match(&haystack))
}

fn jsonpath_criterion(caches: &Caches, context: &EvalContext, criterion: &Criterion) -> Result<bool, EngineError> {
    let Some(context_expression) = &criterion.context else {
        return Err(EngineError::evaluation(
            &criterion.condition,
            "jsonpath criterion requires a context expression",
        ));
    };
    let resolved = expr::resolve_expression_string(caches, context, context_expression)?;
    let document = resolved.to_json();
    let path = caches.json_path(&criterion.condition)?;
    Ok(!path.query(&document).is_empty())
}
