//! RFC 6901 JSON Pointer engine.
//!
//! Pure addressing and mutation primitives over [`serde_json::Value`] trees.
//! Writers never touch their input; they hand back a new root.
//!
//! # Path Format
//!
//! - `` (empty) - the whole document
//! - `/` - the key `""` of the root object
//! - `/foo/bar` - nested property
//! - `/items/0` - array element at index 0
//! - `/items/-` - one past the end of an array (append when writing)
//!
//! Inside a token `~1` stands for `/` and `~0` for `~`.

use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

/// How far past the end of an array a write may land. Gaps are padded with
/// `null`, so an unbounded index would let a single message allocate without
/// limit.
const MAX_ARRAY_PADDING: usize = 10_000;

/// Most reference tokens a pointer may carry, the same as serde_json's
/// nesting limit. Walking and writing recurse per token.
pub const MAX_POINTER_DEPTH: usize = 128;

/// Errors raised by pointer parsing.
///
/// These are the only failures the engine reports. Missing keys and
/// out-of-range indices resolve to `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    /// A non-empty pointer that does not begin with `/`.
    #[error("invalid JSON Pointer: \"{pointer}\" (must start with /)")]
    Invalid {
        /// The offending pointer text.
        pointer: String,
    },

    /// A pointer with more than [`MAX_POINTER_DEPTH`] tokens.
    #[error("JSON Pointer too deep: {depth} segments (at most {MAX_POINTER_DEPTH})")]
    TooDeep { depth: usize },
}

/// Split a pointer into its unescaped reference tokens.
///
/// The empty pointer yields no tokens (the root); `/` yields a single empty
/// token.
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>, PointerError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }

    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PointerError::Invalid {
            pointer: pointer.to_string(),
        });
    };

    let depth = pointer_depth(pointer);
    if depth > MAX_POINTER_DEPTH {
        return Err(PointerError::TooDeep { depth });
    }

    Ok(rest.split('/').map(unescape_token).collect())
}

/// Number of reference tokens in a pointer, without parsing it.
pub fn pointer_depth(pointer: &str) -> usize {
    pointer.bytes().filter(|b| *b == b'/').count()
}

/// Escape a raw key so it can be embedded as one pointer token.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Decode `~0` and `~1` in a single left-to-right scan, so `~01` reads as
/// `~1` and not `/`.
fn unescape_token(token: &str) -> String {
    if !token.contains('~') {
        return token.to_string();
    }

    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('0') => {
                chars.next();
                out.push('~');
            }
            Some('1') => {
                chars.next();
                out.push('/');
            }
            _ => out.push('~'),
        }
    }
    out
}

/// Parse an all-digit token as an array index.
fn array_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Whether a token addresses an array slot (digits, or the `-` append marker).
fn is_index_token(token: &str) -> bool {
    token == "-" || array_index(token).is_some()
}

/// The container to create when a missing segment is about to be indexed
/// by `token`.
fn container_for(token: &str) -> Value {
    if is_index_token(token) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Look up the value a pointer addresses.
///
/// Returns `Ok(None)` when any segment is missing, when an intermediate is a
/// scalar or `null`, or when an array index is out of range or not numeric.
/// The `-` marker never resolves to a value.
pub fn resolve_pointer<'a>(data: &'a Value, pointer: &str) -> Result<Option<&'a Value>, PointerError> {
    if pointer.is_empty() {
        return Ok(Some(data));
    }

    let tokens = parse_pointer(pointer)?;
    let mut current = data;
    for token in &tokens {
        let next = match current {
            Value::Array(items) => array_index(token).and_then(|index| items.get(index)),
            Value::Object(map) => map.get(token.as_str()),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}

/// Write `value` at `pointer`, returning the new root.
///
/// Missing intermediates are created: an array when the following token is
/// an index or `-`, otherwise an object. A final `-` against an array
/// appends. Indices past the end pad the gap with `null`. A write that cannot
/// land (a non-numeric token against an array) leaves the tree unchanged.
pub fn set_pointer(data: &Value, pointer: &str, value: Value) -> Result<Value, PointerError> {
    if pointer.is_empty() {
        return Ok(value);
    }

    let tokens = parse_pointer(pointer)?;
    let mut root = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data.clone()
    };

    if write(&mut root, &tokens, value) {
        Ok(root)
    } else {
        debug!("Dropped write to {pointer}: path does not fit the existing tree");
        Ok(data.clone())
    }
}

fn write(node: &mut Value, tokens: &[String], value: Value) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        *node = value;
        return true;
    };

    if !(node.is_object() || node.is_array()) {
        *node = container_for(token);
    }

    let child = match node {
        Value::Array(items) => {
            let index = if token == "-" {
                items.len()
            } else {
                match array_index(token) {
                    Some(index) => index,
                    None => return false,
                }
            };
            if index > items.len() + MAX_ARRAY_PADDING {
                return false;
            }
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        Value::Object(map) => map.entry(token.clone()).or_insert(Value::Null),
        _ => return false,
    };

    write(child, rest, value)
}

/// Concatenate `items` onto the array at `pointer`, returning the new root.
///
/// When the current value is absent or not an array the result at `pointer`
/// is exactly `items`.
pub fn append_at_pointer(data: &Value, pointer: &str, items: Vec<Value>) -> Result<Value, PointerError> {
    let merged = match resolve_pointer(data, pointer)? {
        Some(Value::Array(existing)) => existing.iter().cloned().chain(items).collect(),
        _ => items,
    };
    set_pointer(data, pointer, Value::Array(merged))
}

/// Join raw keys into a pointer, escaping each one.
pub fn build_pointer<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| format!("/{}", escape_token(token.as_ref())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_root_and_slash() {
        assert_eq!(parse_pointer("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_pointer("/").unwrap(), vec![String::new()]);
        assert_eq!(parse_pointer("/a/b/0").unwrap(), vec!["a", "b", "0"]);
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        let err = parse_pointer("no-slash").unwrap_err();
        assert_eq!(
            err,
            PointerError::Invalid {
                pointer: "no-slash".to_string()
            }
        );
        assert!(err.to_string().contains("must start with /"));
    }

    #[test]
    fn test_pointer_depth_is_capped() {
        let at_limit = "/a".repeat(MAX_POINTER_DEPTH);
        let too_deep = "/a".repeat(MAX_POINTER_DEPTH + 1);

        assert_eq!(parse_pointer(&at_limit).unwrap().len(), MAX_POINTER_DEPTH);
        assert_eq!(
            parse_pointer(&too_deep).unwrap_err(),
            PointerError::TooDeep {
                depth: MAX_POINTER_DEPTH + 1
            }
        );
        assert_eq!(pointer_depth(""), 0);
        assert_eq!(pointer_depth("/"), 1);
    }

    #[test]
    fn test_deep_write_is_refused() {
        let data = json!({"keep": 1});
        let path = "/a".repeat(100_000);

        assert!(matches!(
            set_pointer(&data, &path, json!(1)),
            Err(PointerError::TooDeep { depth: 100_000 })
        ));
        assert!(append_at_pointer(&data, &path, vec![json!(1)]).is_err());
        assert!(resolve_pointer(&data, &path).is_err());

        let at_limit = "/a".repeat(MAX_POINTER_DEPTH);
        let updated = set_pointer(&data, &at_limit, json!(1)).unwrap();
        assert_eq!(resolve_pointer(&updated, &at_limit).unwrap(), Some(&json!(1)));
    }

    #[test]
    fn test_unescape_single_pass() {
        assert_eq!(parse_pointer("/a~1b").unwrap(), vec!["a/b"]);
        assert_eq!(parse_pointer("/m~0n").unwrap(), vec!["m~n"]);
        // `~01` is an escaped tilde followed by a literal 1.
        assert_eq!(parse_pointer("/~01").unwrap(), vec!["~1"]);
        assert_eq!(parse_pointer("/~").unwrap(), vec!["~"]);
    }

    #[test]
    fn test_escape_token() {
        assert_eq!(escape_token("a/b~c"), "a~1b~0c");
        assert_eq!(escape_token("~1"), "~01");
        assert_eq!(build_pointer(["users", "a/b"]), "/users/a~1b");
    }

    #[test]
    fn test_resolve_basic() {
        let data = json!({"user": {"name": "Alice"}, "items": [{"id": 1}, {"id": 2}], "": 7});

        assert_eq!(resolve_pointer(&data, "").unwrap(), Some(&data));
        assert_eq!(resolve_pointer(&data, "/user/name").unwrap(), Some(&json!("Alice")));
        assert_eq!(resolve_pointer(&data, "/items/1/id").unwrap(), Some(&json!(2)));
        assert_eq!(resolve_pointer(&data, "/").unwrap(), Some(&json!(7)));
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let data = json!({"a": null, "n": 5, "items": [1, 2]});

        assert_eq!(resolve_pointer(&data, "/missing").unwrap(), None);
        assert_eq!(resolve_pointer(&data, "/a/b").unwrap(), None);
        assert_eq!(resolve_pointer(&data, "/n/b").unwrap(), None);
        assert_eq!(resolve_pointer(&data, "/items/5").unwrap(), None);
        assert_eq!(resolve_pointer(&data, "/items/x").unwrap(), None);
        assert_eq!(resolve_pointer(&data, "/items/-").unwrap(), None);
        assert!(resolve_pointer(&data, "items").is_err());
    }

    #[test]
    fn test_set_does_not_mutate_input() {
        let data = json!({"a": 1});
        let updated = set_pointer(&data, "/b", json!(2)).unwrap();

        assert_eq!(data, json!({"a": 1}));
        assert_eq!(updated, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_set_root_replaces_tree() {
        let data = json!({"a": 1});
        assert_eq!(set_pointer(&data, "", json!([1, 2])).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_set_creates_intermediates() {
        let data = json!({});

        let updated = set_pointer(&data, "/user/profile/name", json!("Bob")).unwrap();
        assert_eq!(updated, json!({"user": {"profile": {"name": "Bob"}}}));

        let updated = set_pointer(&data, "/list/0/name", json!("x")).unwrap();
        assert_eq!(updated, json!({"list": [{"name": "x"}]}));

        let updated = set_pointer(&data, "/list/-", json!("first")).unwrap();
        assert_eq!(updated, json!({"list": ["first"]}));
    }

    #[test]
    fn test_set_replaces_scalar_intermediate() {
        let data = json!({"a": 5});
        let updated = set_pointer(&data, "/a/b", json!(true)).unwrap();
        assert_eq!(updated, json!({"a": {"b": true}}));
    }

    #[test]
    fn test_set_array_append_and_index() {
        let data = json!({"items": [1, 2]});

        assert_eq!(
            set_pointer(&data, "/items/-", json!(3)).unwrap(),
            json!({"items": [1, 2, 3]})
        );
        assert_eq!(
            set_pointer(&data, "/items/0", json!(9)).unwrap(),
            json!({"items": [9, 2]})
        );
        assert_eq!(
            set_pointer(&data, "/items/4", json!(5)).unwrap(),
            json!({"items": [1, 2, null, null, 5]})
        );
    }

    #[test]
    fn test_set_non_numeric_token_on_array_is_dropped() {
        let data = json!({"items": [1, 2]});
        assert_eq!(set_pointer(&data, "/items/name", json!(3)).unwrap(), data);
    }

    #[test]
    fn test_set_huge_index_is_dropped() {
        let data = json!({"items": []});
        assert_eq!(set_pointer(&data, "/items/99999999", json!(1)).unwrap(), data);
    }

    #[test]
    fn test_set_null_root_becomes_object() {
        let updated = set_pointer(&Value::Null, "/x", json!(1)).unwrap();
        assert_eq!(updated, json!({"x": 1}));
    }

    #[test]
    fn test_set_invalid_pointer_errors() {
        assert!(set_pointer(&json!({}), "x", json!(1)).is_err());
    }

    #[test]
    fn test_append_to_existing_array() {
        let data = json!({"events": [{"id": 1}]});
        let updated = append_at_pointer(&data, "/events", vec![json!({"id": 2}), json!({"id": 3})]).unwrap();
        assert_eq!(updated, json!({"events": [{"id": 1}, {"id": 2}, {"id": 3}]}));
        assert_eq!(data, json!({"events": [{"id": 1}]}));
    }

    #[test]
    fn test_append_to_missing_or_scalar() {
        let data = json!({"label": "x"});

        let updated = append_at_pointer(&data, "/events", vec![json!(1)]).unwrap();
        assert_eq!(resolve_pointer(&updated, "/events").unwrap(), Some(&json!([1])));

        let updated = append_at_pointer(&data, "/label", vec![json!(1), json!(2)]).unwrap();
        assert_eq!(resolve_pointer(&updated, "/label").unwrap(), Some(&json!([1, 2])));
    }
}
