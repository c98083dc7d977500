//! Removal of unset values and empty containers.

use crate::types::{Node, Object};

/// Prune a node. Returns `None` when nothing derived from input data is left in it.
///
/// - containers and arrays are pruned recursively and vanish when they end up empty;
/// - typed values survive only when set;
/// - raw JSON survives unless it is `null`.
pub fn prune(node: Node) -> Option<Node> {
    match node {
        Node::Object(map) => {
            let kept: Object = map
                .into_iter()
                .filter_map(|(key, child)| prune(child).map(|child| (key, child)))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Node::Object(kept))
            }
        }
        Node::Array(items) => {
            let kept: Vec<Node> = items.into_iter().filter_map(prune).collect();
            if kept.is_empty() {
                None
            } else {
                Some(Node::Array(kept))
            }
        }
        Node::Value(v) => {
            if v.is_set() {
                Some(Node::Value(v))
            } else {
                None
            }
        }
        Node::Raw(serde_json::Value::Null) => None,
        raw @ Node::Raw(_) => Some(raw),
    }
}

/// Prune a root container; an entirely empty tree becomes an empty container.
pub fn prune_root(root: Object) -> Object {
    match prune(Node::Object(root)) {
        Some(Node::Object(map)) => map,
        _ => Object::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, TypedValue, Value};
    use serde_json::json;

    fn set(v: i64) -> Node {
        Node::Value(TypedValue::set(Value::Int64(v), ""))
    }

    fn unset() -> Node {
        Node::Value(TypedValue::unset(DataType::Int64))
    }

    fn obj(pairs: Vec<(&str, Node)>) -> Node {
        Node::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn sample() -> Node {
        obj(vec![
            ("kept", set(1)),
            ("dropped", unset()),
            ("empty", obj(vec![("inner", unset())])),
            (
                "list",
                Node::Array(vec![obj(vec![]), obj(vec![("x", set(0))]), obj(vec![("y", unset())])]),
            ),
            ("all_unset_list", Node::Array(vec![obj(vec![("y", unset())])])),
            ("raw", Node::Raw(json!("Krios"))),
            ("raw_null", Node::Raw(serde_json::Value::Null)),
        ])
    }

    #[test]
    fn removes_unset_values_and_empty_containers() {
        let pruned = prune(sample()).unwrap();
        assert_eq!(
            pruned.to_json(),
            json!({"kept": 1, "list": [{"x": 0}], "raw": "Krios"})
        );
    }

    #[test]
    fn pruning_is_idempotent() {
        let once = prune(sample());
        let twice = once.clone().and_then(prune);
        assert_eq!(once, twice);
    }

    #[test]
    fn fully_unset_tree_becomes_empty_root() {
        let root = match obj(vec![("a", obj(vec![("b", unset())]))]) {
            Node::Object(map) => map,
            _ => unreachable!(),
        };
        assert!(prune(Node::Object(root.clone())).is_none());
        assert!(prune_root(root).is_empty());
    }

    #[test]
    fn set_zero_values_are_kept() {
        let zero = Node::Value(TypedValue::set(Value::Bool(false), ""));
        assert_eq!(prune(zero.clone()), Some(zero));
    }
}
