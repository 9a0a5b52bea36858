//! JSON pointers over merged config documents (RFC 6901 escaping).

use serde_json::Value;

/// Every scalar leaf as `(pointer, value)`. Empty mappings and lists have
/// no leaves; a scalar document is the single leaf `/`.
pub(crate) fn leaves(doc: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    walk(&mut String::new(), doc, &mut out);
    out
}

fn walk<'a>(path: &mut String, node: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    let depth = path.len();
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                push_token(path, key);
                walk(path, child, out);
                path.truncate(depth);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                push_token(path, &i.to_string());
                walk(path, child, out);
                path.truncate(depth);
            }
        }
        scalar => {
            let p = if path.is_empty() { "/".to_string() } else { path.clone() };
            out.push((p, scalar));
        }
    }
}

fn push_token(path: &mut String, token: &str) {
    path.push('/');
    for c in token.chars() {
        match c {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            c => path.push(c),
        }
    }
}

/// Whole-segment prefix: `/alerts` covers `/alerts` and `/alerts/rules/0`,
/// never `/alertsx`.
pub(crate) fn covers(prefix: &str, pointer: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || pointer == prefix
        || pointer
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
