use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Returns the node at `path`, if present.
pub fn child<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, key| node.get(key))
}

/// Replaces the node at `path` with `data`. A `null` payload removes the node.
pub fn apply_put(root: &mut Value, path: &str, data: Value) {
    let keys: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = keys.split_last() else {
        *root = data;
        return;
    };

    let mut node = root;
    for key in parents {
        if data.is_null() && node.get(*key).is_none() {
            return;
        }
        node = ensure_object(node)
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if data.is_null() {
        if let Value::Object(map) = node {
            map.remove(*last);
        }
    } else {
        ensure_object(node).insert((*last).to_string(), data);
    }
}

/// Merges the children of `data` into the node at `path`, one put per child.
pub fn apply_patch(root: &mut Value, path: &str, data: Value) {
    let Value::Object(children) = data else {
        return;
    };

    let base = path.trim_end_matches('/');
    for (key, value) in children {
        apply_put(root, &format!("{}/{}", base, key), value);
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
