//! Reading and writing YAML documents.
//!
//! This is the document collaborator of the crate: it turns YAML text into
//! the [`Node`](::node::Node) model and back. The conversion goes through
//! [`serde_yaml::Value`], which already expands anchors and aliases into
//! structurally equal subtrees; interning the resulting nodes (see
//! [`node::Interner`](::node::Interner)) then restores a shared identity
//! for them. Class-type tags arrive as tagged values and are stored with
//! exactly one leading `!` or `?` sigil stripped.

use std::fs;
use std::path::Path;

use serde::{Serialize, Serializer};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};

use node::{Interner, Node, NodeKind};
use Error;

/// Parses a YAML document into a node tree.
pub fn from_str(document: &str) -> Result<Node, Error> {
    let value: Value =
        serde_yaml::from_str(document).map_err(|err| Error::Parse(err.to_string()))?;
    let mut interner = Interner::new();
    node_from_value(&value, &mut interner)
}

/// Reads and parses a YAML document from a file.
pub fn from_file(path: &Path) -> Result<Node, Error> {
    debug!("reading configuration from {}", path.display());
    let document = fs::read_to_string(path)?;
    from_str(&document)
}

/// Serializes a node tree back into a YAML document.
///
/// Scalars that look like numbers or booleans are emitted in their plain
/// form, so a document round-trips without gaining quotes.
pub fn to_string(node: &Node) -> Result<String, Error> {
    serde_yaml::to_string(&value_from_node(node)).map_err(|err| Error::Msg(err.to_string()))
}

fn node_from_value(value: &Value, interner: &mut Interner) -> Result<Node, Error> {
    let (tag, value) = match *value {
        Value::Tagged(ref tagged) => (Some(strip_sigil(&tagged.tag.to_string())), &tagged.value),
        ref plain => (None, plain),
    };

    let kind = match *value {
        Value::Null => NodeKind::Null,
        Value::Bool(b) => NodeKind::Scalar(b.to_string()),
        Value::Number(ref n) => NodeKind::Scalar(n.to_string()),
        Value::String(ref s) => NodeKind::Scalar(s.clone()),
        Value::Sequence(ref items) => {
            let mut children = Vec::with_capacity(items.len());
            for item in items {
                children.push(node_from_value(item, interner)?);
            }
            NodeKind::Sequence(children)
        }
        Value::Mapping(ref mapping) => {
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, value) in mapping {
                entries.push((scalar_key(key)?, node_from_value(value, interner)?));
            }
            NodeKind::Mapping(entries)
        }
        Value::Tagged(_) => {
            return Err(Error::Parse("nested tags are not supported".to_string()))
        }
    };

    Ok(interner.intern(tag, kind))
}

fn scalar_key(key: &Value) -> Result<String, Error> {
    match *key {
        Value::String(ref s) => Ok(s.clone()),
        Value::Number(ref n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::Parse("mapping keys must be scalars".to_string())),
    }
}

/// Strips exactly one leading `!` or `?` from a tag rendering.
fn strip_sigil(tag: &str) -> String {
    if tag.starts_with('!') || tag.starts_with('?') {
        tag[1..].to_string()
    } else {
        tag.to_string()
    }
}

fn value_from_node(node: &Node) -> Value {
    let value = match *node.kind() {
        NodeKind::Null => Value::Null,
        NodeKind::Scalar(ref scalar) => plain_scalar(scalar),
        NodeKind::Sequence(ref items) => {
            Value::Sequence(items.iter().map(value_from_node).collect())
        }
        NodeKind::Mapping(ref entries) => {
            let mut mapping = Mapping::with_capacity(entries.len());
            for &(ref key, ref value) in entries {
                mapping.insert(Value::String(key.clone()), value_from_node(value));
            }
            Value::Mapping(mapping)
        }
    };

    match node.tag() {
        Some(tag) if !tag.is_empty() => Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        })),
        _ => value,
    }
}

/// Re-infers the plain YAML form of a scalar kept as a string.
fn plain_scalar(scalar: &str) -> Value {
    if let Ok(int) = scalar.parse::<i64>() {
        return Value::Number(int.into());
    }
    let numeric = scalar
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false);
    if numeric {
        if let Ok(float) = scalar.parse::<f64>() {
            return Value::Number(float.into());
        }
    }
    match scalar {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(scalar.to_string()),
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value_from_node(self).serialize(serializer)
    }
}
