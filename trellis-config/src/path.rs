// Dotted-path access into nested JSON values

use serde_json::{Map, Value};

/// Look up `path` (`"database.pool.size"`, `"servers.0.host"`).
/// The empty path is the root.
pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Store `value` at `path`, creating intermediate tables. A scalar in the
/// way is replaced by a table.
pub(crate) fn insert(root: &mut Value, path: &str, value: Value) {
    if path.is_empty() {
        *root = value;
        return;
    }
    let mut node = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Remove the value at `path`, returning it.
pub(crate) fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (parent, last),
        None => ("", path),
    };
    let mut node = root;
    if !parent.is_empty() {
        for segment in parent.split('.') {
            node = node.as_object_mut()?.get_mut(segment)?;
        }
    }
    node.as_object_mut()?.remove(last)
}

/// Deep merge: tables merge key by key, anything else in `overlay`
/// replaces what is in `base`.
pub(crate) fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Dotted paths of every leaf value, sorted.
pub(crate) fn leaf_paths(root: &Value) -> Vec<String> {
    fn walk(node: &Value, prefix: &str, out: &mut Vec<String>) {
        match node {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(child, &path, out);
                }
            }
            _ if !prefix.is_empty() => out.push(prefix.to_string()),
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(root, "", &mut out);
    out.sort();
    out
}

/// Parse an environment-style string into the most specific JSON scalar.
pub(crate) fn scalar(raw: &str) -> Value {
    match raw {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_and_arrays() {
        let root = json!({"db": {"hosts": ["a", "b"], "port": 5432}});
        assert_eq!(lookup(&root, "db.port"), Some(&json!(5432)));
        assert_eq!(lookup(&root, "db.hosts.1"), Some(&json!("b")));
        assert_eq!(lookup(&root, "db.missing"), None);
        assert_eq!(lookup(&root, "db.port.deeper"), None);
        assert_eq!(lookup(&root, ""), Some(&root));
    }

    #[test]
    fn test_insert_creates_tables() {
        let mut root = json!({"app": "x"});
        insert(&mut root, "app.name", json!("trellis"));
        insert(&mut root, "cache.ttl", json!(60));
        assert_eq!(root, json!({"app": {"name": "trellis"}, "cache": {"ttl": 60}}));
    }

    #[test]
    fn test_remove() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove(&mut root, "a.b"), Some(json!(1)));
        assert_eq!(remove(&mut root, "a.b"), None);
        assert_eq!(root, json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_deep_merge() {
        let mut base = json!({"db": {"host": "localhost", "port": 5432}, "debug": false});
        merge(&mut base, json!({"db": {"host": "db.internal"}, "debug": true}));
        assert_eq!(
            base,
            json!({"db": {"host": "db.internal", "port": 5432}, "debug": true})
        );
    }

    #[test]
    fn test_leaf_paths() {
        let root = json!({"b": {"y": 1, "x": 2}, "a": true});
        assert_eq!(leaf_paths(&root), vec!["a", "b.x", "b.y"]);
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(scalar("true"), json!(true));
        assert_eq!(scalar("8080"), json!(8080));
        assert_eq!(scalar("0.5"), json!(0.5));
        assert_eq!(scalar("postgres://x"), json!("postgres://x"));
        assert_eq!(scalar("inf"), json!("inf"));
    }
}
