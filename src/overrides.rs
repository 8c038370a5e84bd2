//! Applying command-line style overrides onto a document.
//!
//! Overrides are a flat map from `::`-separated paths to YAML literals,
//! applied once, before the first factory is created. A path segment of the
//! form `[N]` selects index `N` of a sequence (which must exist); any other
//! segment selects a mapping key, and missing keys are created along the
//! way. The literal is re-parsed as a YAML sub-document and replaces the
//! addressed node wholesale.
//!
//! The node tree is immutable, so application rebuilds the spine from the
//! addressed node up to the root; untouched subtrees keep their identity.

use std::collections::BTreeMap;

use node::Node;
use yaml;
use Error;

/// Applies all overrides to the given root node, in map order.
pub fn apply(root: Node, overrides: &BTreeMap<String, String>) -> Result<Node, Error> {
    let mut current = root;
    for (path, literal) in overrides {
        debug!("overriding {} with {}", path, literal);
        let value = yaml::from_str(literal)?;
        current = replace(&current, path, path, &value)?;
    }
    Ok(current)
}

fn replace(node: &Node, full_path: &str, rest: &str, value: &Node) -> Result<Node, Error> {
    match rest.find("::") {
        None => assign(node, full_path, rest, value),
        Some(split) => {
            let segment = &rest[..split];
            let tail = &rest[split + 2..];

            match sequence_index(segment) {
                Some(index) => {
                    let replaced = replace(element(node, full_path, index)?, full_path, tail, value)?;
                    Ok(with_element(node, index, replaced))
                }
                None => {
                    let child = node.get(segment).cloned().unwrap_or_else(Node::null);
                    let replaced = replace(&child, full_path, tail, value)?;
                    Ok(with_entry(node, segment, replaced))
                }
            }
        }
    }
}

fn assign(node: &Node, full_path: &str, segment: &str, value: &Node) -> Result<Node, Error> {
    match sequence_index(segment) {
        Some(index) => {
            element(node, full_path, index)?;
            Ok(with_element(node, index, value.clone()))
        }
        None => Ok(with_entry(node, segment, value.clone())),
    }
}

/// Parses a `[N]` segment.
fn sequence_index(segment: &str) -> Option<usize> {
    if segment.starts_with('[') && segment.ends_with(']') && segment.len() > 2 {
        segment[1..segment.len() - 1].parse().ok()
    } else {
        None
    }
}

fn element<'a>(node: &'a Node, full_path: &str, index: usize) -> Result<&'a Node, Error> {
    node.items().get(index).ok_or_else(|| Error::OverrideTargetMissing {
        path: full_path.to_string(),
    })
}

/// Returns a copy of a sequence node with one element replaced.
fn with_element(node: &Node, index: usize, replacement: Node) -> Node {
    let mut items = node.items().to_vec();
    items[index] = replacement;
    retag(node, Node::sequence(items))
}

/// Returns a copy of a mapping node with one entry replaced or appended.
/// Null and scalar nodes are treated as empty mappings, extending the
/// document the way missing keys do.
fn with_entry(node: &Node, key: &str, replacement: Node) -> Node {
    let mut entries = node.entries().to_vec();
    match entries.iter().position(|&(ref name, _)| name == key) {
        Some(index) => entries[index].1 = replacement,
        None => entries.push((key.to_string(), replacement)),
    }
    retag(node, Node::mapping(entries))
}

fn retag(original: &Node, rebuilt: Node) -> Node {
    match original.tag() {
        Some(tag) => rebuilt.with_tag(tag),
        None => rebuilt,
    }
}
