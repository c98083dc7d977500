//! Insertion into the nested output tree.

use thiserror::Error;

use crate::types::{Node, Object};

/// Structural conflict while writing into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("cannot descend into '{path}': occupied by a non-container value")]
    Conflict { path: String },
    #[error("'{path}' is occupied by a non-array value")]
    NotAnArray { path: String },
    #[error("empty target path")]
    EmptyPath,
}

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// The last segment is overwritten. Fails if an intermediate segment holds something other
/// than a container.
pub fn insert(tree: &mut Object, path: &[String], value: Node) -> Result<(), TreeError> {
    let (last, parents) = path.split_last().ok_or(TreeError::EmptyPath)?;
    let parent = descend(tree, parents)?;
    parent.insert(last.clone(), value);
    Ok(())
}

/// Write `value` at `element_path` inside element `index` of the array at `array`.
///
/// The array is created if missing and padded with empty containers up to `index`, so an
/// element can be filled in by several rules.
pub fn insert_at_index(
    tree: &mut Object,
    array: &[String],
    index: usize,
    element_path: &[String],
    value: Node,
) -> Result<(), TreeError> {
    let items = array_slot(tree, array)?;
    while items.len() <= index {
        items.push(Node::object());
    }
    match &mut items[index] {
        Node::Object(element) => insert(element, element_path, value),
        _ => Err(TreeError::Conflict {
            path: format!("{}.{index}", array.join(".")),
        }),
    }
}

/// Append `elements` to the array at `array`, creating it (and its parents) if missing.
pub fn append_to_array(tree: &mut Object, array: &[String], elements: Vec<Node>) -> Result<(), TreeError> {
    array_slot(tree, array)?.extend(elements);
    Ok(())
}

fn descend<'t>(mut current: &'t mut Object, path: &[String]) -> Result<&'t mut Object, TreeError> {
    for (depth, segment) in path.iter().enumerate() {
        current = match current.entry(segment.clone()).or_insert_with(Node::object) {
            Node::Object(child) => child,
            _ => {
                return Err(TreeError::Conflict {
                    path: path[..=depth].join("."),
                });
            }
        };
    }
    Ok(current)
}

fn array_slot<'t>(tree: &'t mut Object, array: &[String]) -> Result<&'t mut Vec<Node>, TreeError> {
    let (name, parents) = array.split_last().ok_or(TreeError::EmptyPath)?;
    let parent = descend(tree, parents)?;
    match parent.entry(name.clone()).or_insert_with(|| Node::Array(Vec::new())) {
        Node::Array(items) => Ok(items),
        _ => Err(TreeError::NotAnArray {
            path: array.join("."),
        }),
    }
}
