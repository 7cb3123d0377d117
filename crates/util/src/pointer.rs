//! RFC 6901 JSON Pointer traversal over [`Value`] trees.
//!
//! Both the read side (`$request.body#/…` / `$response.body#/…` expression
//! tails) and the write side (request-body replacements) live here. Reads
//! fail on any missing or untraversable segment; writes create intermediate
//! mappings as needed but refuse to descend through scalars.

use anyhow::{Result, bail};
use arazzo_types::Value;

/// Decodes one pointer reference token: `~1` becomes `/`, `~0` becomes `~`.
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Encodes a key as a pointer reference token.
pub fn escape_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn split_tokens(pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        bail!("json pointer '{}' must start with '/'", pointer);
    };
    Ok(rest.split('/').map(unescape_token).collect())
}

/// Resolves a pointer against a value tree.
///
/// Mapping segments descend by key; sequence segments descend by
/// non-negative integer index. The empty pointer resolves to the root.
pub fn resolve_pointer<'tree>(root: &'tree Value, pointer: &str) -> Result<&'tree Value> {
    let mut current = root;
    for token in split_tokens(pointer)? {
        current = match current {
            Value::Mapping(entries) => match entries.get(token.as_str()) {
                Some(next) => next,
                None => bail!("json pointer '{}': key '{}' not found", pointer, token),
            },
            Value::Sequence(items) => {
                let index: usize = token
                    .parse()
                    .map_err(|_| anyhow::anyhow!("json pointer '{}': '{}' is not a sequence index", pointer, token))?;
                match items.get(index) {
                    Some(next) => next,
                    None => bail!("json pointer '{}': index {} out of bounds", pointer, index),
                }
            }
            scalar => bail!(
                "json pointer '{}': cannot descend into {} at '{}'",
                pointer,
                scalar.kind_name(),
                token
            ),
        };
    }
    Ok(current)
}

/// Writes `value` at `pointer` inside `root`, creating intermediate
/// mappings for missing segments.
///
/// Sequence segments must name an existing index; a pointer that tries to
/// traverse through a scalar is an error. The empty pointer replaces the
/// root outright.
pub fn set_pointer(root: &mut Value, pointer: &str, value: Value) -> Result<()> {
    let tokens = split_tokens(pointer)?;
    let Some((last, parents)) = tokens.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for token in parents {
        current = match current {
            Value::Mapping(entries) => entries.entry(token.clone()).or_insert_with(|| Value::Mapping(Default::default())),
            Value::Sequence(items) => {
                let index: usize = token
                    .parse()
                    .map_err(|_| anyhow::anyhow!("json pointer '{}': '{}' is not a sequence index", pointer, token))?;
                match items.get_mut(index) {
                    Some(next) => next,
                    None => bail!("json pointer '{}': index {} out of bounds", pointer, index),
                }
            }
            scalar => bail!(
                "json pointer '{}': cannot descend into {} at '{}'",
                pointer,
                scalar.kind_name(),
                token
            ),
        };
    }

    match current {
        Value::Mapping(entries) => {
            entries.insert(last.clone(), value);
        }
        Value::Sequence(items) => {
            let index: usize = last
                .parse()
                .map_err(|_| anyhow::anyhow!("json pointer '{}': '{}' is not a sequence index", pointer, last))?;
            match items.get_mut(index) {
                Some(slot) => *slot = value,
                None => bail!("json pointer '{}': index {} out of bounds", pointer, index),
            }
        }
        scalar => bail!(
            "json pointer '{}': cannot write through {} at '{}'",
            pointer,
            scalar.kind_name(),
            last
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        serde_yaml::from_str(
            r#"
pet:
  name: Rex
  tags: [small, "a/b"]
count: 2
"#,
        )
        .expect("parse sample")
    }

    #[test]
    fn resolves_nested_keys_and_indices() {
        let root = sample();
        assert_eq!(resolve_pointer(&root, "/pet/name").expect("name"), &Value::String("Rex".into()));
        assert_eq!(resolve_pointer(&root, "/pet/tags/0").expect("tag"), &Value::String("small".into()));
        assert_eq!(resolve_pointer(&root, "").expect("root"), &root);
    }

    #[test]
    fn unescapes_slash_and_tilde_tokens() {
        let root: Value = serde_yaml::from_str(r#"{"a/b": {"~x": 1}}"#).expect("parse");
        assert_eq!(resolve_pointer(&root, "/a~1b/~0x").expect("escaped"), &Value::Int(1));
        assert_eq!(escape_token("a/b~c"), "a~1b~0c");
    }

    #[test]
    fn missing_key_and_scalar_descent_are_errors() {
        let root = sample();
        assert!(resolve_pointer(&root, "/pet/age").is_err());
        assert!(resolve_pointer(&root, "/count/deep").is_err());
        assert!(resolve_pointer(&root, "/pet/tags/9").is_err());
        assert!(resolve_pointer(&root, "pet/name").is_err());
    }

    #[test]
    fn set_creates_intermediate_mappings() {
        let mut root = Value::Mapping(Default::default());
        set_pointer(&mut root, "/a/b/c", Value::Int(1)).expect("write");
        assert_eq!(resolve_pointer(&root, "/a/b/c").expect("read back"), &Value::Int(1));
    }

    #[test]
    fn set_overwrites_sequence_slot_but_rejects_growth() {
        let mut root = sample();
        set_pointer(&mut root, "/pet/tags/0", Value::String("large".into())).expect("write");
        assert_eq!(resolve_pointer(&root, "/pet/tags/0").expect("read"), &Value::String("large".into()));
        assert!(set_pointer(&mut root, "/pet/tags/9", Value::Null).is_err());
    }

    #[test]
    fn set_refuses_to_tunnel_through_scalars() {
        let mut root = sample();
        assert!(set_pointer(&mut root, "/count/nested", Value::Null).is_err());
    }

    #[test]
    fn round_trips_written_values() {
        let mut root = Value::Mapping(Default::default());
        let written: Value = serde_yaml::from_str("{id: 7, tags: [x]}").expect("parse");
        set_pointer(&mut root, "/item/payload", written.clone()).expect("write");
        assert_eq!(resolve_pointer(&root, "/item/payload").expect("read"), &written);
    }
}
