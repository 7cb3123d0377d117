//! Runtime expression language: parsing and evaluation.

pub mod eval;
pub mod parser;

pub use eval::{evaluate, evaluate_embedded};
pub use parser::{EmbeddedSegment, Expression, ExpressionKind, parse, parse_embedded};

use arazzo_types::Value;

use crate::cache::Caches;
use crate::context::EvalContext;
use crate::error::EngineError;

/// Resolves a string that may be a whole expression, contain embedded
/// `{$…}` expressions, or be a plain literal.
pub(crate) fn resolve_expression_string(caches: &Caches, context: &EvalContext, raw: &str) -> Result<Value, EngineError> {
    if raw.starts_with('$') {
        let expression = caches.expression(raw)?;
        return evaluate(&expression, context);
    }
    if raw.contains("{$") {
        let segments = parse_embedded(raw)?;
        return evaluate_embedded(&segments, context);
    }
    Ok(Value::String(raw.to_string()))
}

/// Recursively resolves every string inside a value tree.
///
/// Strings that are whole expressions keep the typed value they resolve to;
/// everything else passes through unchanged.
pub(crate) fn interpolate_tree(caches: &Caches, context: &EvalContext, value: &Value) -> Result<Value, EngineError> {
    match value {
        Value::String(text) => resolve_expression_string(caches, context, text),
        Value::Sequence(items) => items
            .iter()
            .map(|item| interpolate_tree(caches, context, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(entries) => {
            let mut interpolated = indexmap::IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                interpolated.insert(key.clone(), interpolate_tree(caches, context, entry)?);
            }
            Ok(Value::Mapping(interpolated))
        }
        scalar => Ok(scalar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_whole_embedded_and_literal_strings() {
        let caches = Caches::default();
        let mut context = EvalContext::default();
        context.inputs.insert("id".into(), Value::Int(7));

        assert_eq!(
            resolve_expression_string(&caches, &context, "$inputs.id").expect("whole"),
            Value::Int(7)
        );
        assert_eq!(
            resolve_expression_string(&caches, &context, "pet-{$inputs.id}").expect("embedded"),
            Value::String("pet-7".into())
        );
        assert_eq!(
            resolve_expression_string(&caches, &context, "plain").expect("literal"),
            Value::String("plain".into())
        );
    }

    #[test]
    fn interpolates_nested_trees() {
        let caches = Caches::default();
        let mut context = EvalContext::default();
        context.inputs.insert("name".into(), Value::String("Rex".into()));

        let tree: Value = serde_yaml::from_str("{pet: {name: \"$inputs.name\", tags: [\"{$inputs.name}-tag\"]}, count: 2}").expect("tree");
        let resolved = interpolate_tree(&caches, &context, &tree).expect("interpolate");

        let pet = resolved.get("pet").expect("pet");
        assert_eq!(pet.get("name"), Some(&Value::String("Rex".into())));
        assert_eq!(
            pet.get("tags").and_then(|tags| tags.as_sequence()).and_then(|tags| tags.first()),
            Some(&Value::String("Rex-tag".into()))
        );
        assert_eq!(resolved.get("count"), Some(&Value::Int(2)));
    }
}
