//! The immutable configuration-node model.
//!
//! A [`Node`](Node) is one position in a parsed configuration document: a
//! scalar, a sequence, a mapping or an explicit null, optionally carrying a
//! class-type tag. Nodes are cheap to clone (reference counted) and never
//! change after the document has been assembled; the override applier
//! replaces whole sub-nodes instead of mutating them.
//!
//! Equality of nodes is *structural*: two nodes compare equal when their
//! kinds, contents and tags match, regardless of whether they stem from the
//! same document position. Sharing identity (see [`Node::id`](Node::id)) is
//! a separate notion used for usage tracking.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// A single node of a configuration document.
#[derive(Debug, Clone)]
pub struct Node(Rc<NodeData>);

#[derive(Debug)]
struct NodeData {
    tag: Option<String>,
    kind: NodeKind,
}

/// The kind and content of a [`Node`](Node).
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An explicit null value.
    Null,

    /// A scalar value. Scalars are kept as strings and converted on demand.
    Scalar(String),

    /// An ordered sequence of nodes.
    Sequence(Vec<Node>),

    /// An ordered mapping from string keys to nodes. Keys are unique within
    /// a mapping.
    Mapping(Vec<(String, Node)>),
}

impl Node {
    fn from_parts(tag: Option<String>, kind: NodeKind) -> Node {
        Node(Rc::new(NodeData { tag, kind }))
    }

    /// Creates an untagged null node.
    pub fn null() -> Node {
        Node::from_parts(None, NodeKind::Null)
    }

    /// Creates an untagged scalar node.
    pub fn scalar<S: Into<String>>(value: S) -> Node {
        Node::from_parts(None, NodeKind::Scalar(value.into()))
    }

    /// Creates an untagged sequence node.
    pub fn sequence(items: Vec<Node>) -> Node {
        Node::from_parts(None, NodeKind::Sequence(items))
    }

    /// Creates an untagged mapping node. Keys must be unique.
    pub fn mapping(entries: Vec<(String, Node)>) -> Node {
        Node::from_parts(None, NodeKind::Mapping(entries))
    }

    /// Returns a copy of this node carrying the given class-type tag.
    ///
    /// The tag is expected to have its leading `!` or `?` sigil already
    /// stripped.
    pub fn with_tag<S: Into<String>>(&self, tag: S) -> Node {
        Node::from_parts(Some(tag.into()), self.0.kind.clone())
    }

    /// The class-type tag of this node, if any.
    pub fn tag(&self) -> Option<&str> {
        self.0.tag.as_ref().map(|tag| tag.as_str())
    }

    /// The kind and content of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn is_null(&self) -> bool {
        match self.0.kind {
            NodeKind::Null => true,
            _ => false,
        }
    }

    pub fn is_scalar(&self) -> bool {
        match self.0.kind {
            NodeKind::Scalar(_) => true,
            _ => false,
        }
    }

    pub fn is_sequence(&self) -> bool {
        match self.0.kind {
            NodeKind::Sequence(_) => true,
            _ => false,
        }
    }

    pub fn is_mapping(&self) -> bool {
        match self.0.kind {
            NodeKind::Mapping(_) => true,
            _ => false,
        }
    }

    /// The scalar value of this node, or `None` for non-scalars.
    pub fn as_scalar(&self) -> Option<&str> {
        match self.0.kind {
            NodeKind::Scalar(ref value) => Some(value),
            _ => None,
        }
    }

    /// The elements of this node, empty for non-sequences.
    pub fn items(&self) -> &[Node] {
        match self.0.kind {
            NodeKind::Sequence(ref items) => items,
            _ => &[],
        }
    }

    /// The entries of this node in document order, empty for non-mappings.
    pub fn entries(&self) -> &[(String, Node)] {
        match self.0.kind {
            NodeKind::Mapping(ref entries) => entries,
            _ => &[],
        }
    }

    /// Looks up a mapping key. Returns `None` for non-mappings.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self.0.kind {
            NodeKind::Mapping(ref entries) => entries
                .iter()
                .find(|&&(ref name, _)| name == key)
                .map(|&(_, ref value)| value),
            _ => None,
        }
    }

    /// The sharing identity of this node.
    ///
    /// Nodes produced by the document reader are interned, so an anchored
    /// subtree and all of its aliases (as well as structurally identical
    /// subtrees) report the same id. Nodes built directly through the
    /// constructors each get a fresh id.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

/// Builds an untagged node tree from any self-describing `serde` format.
///
/// This is the generic entry point for documents that do not carry class
/// tags or anchors (for example JSON); tagged YAML should go through
/// [`yaml::from_str`](::yaml::from_str) instead, which preserves both.
impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = Node;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a configuration node")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Node, E> {
                Ok(Node::scalar(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Node, E> {
                Ok(Node::scalar(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Node, E> {
                Ok(Node::scalar(value.to_string()))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Node, E> {
                Ok(Node::scalar(value.to_string()))
            }

            fn visit_str<E>(self, value: &str) -> Result<Node, E> {
                Ok(Node::scalar(value))
            }

            fn visit_unit<E>(self) -> Result<Node, E> {
                Ok(Node::null())
            }

            fn visit_none<E>(self) -> Result<Node, E> {
                Ok(Node::null())
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
            where
                D: Deserializer<'de>,
            {
                Node::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Node::sequence(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Node>()? {
                    entries.push((key, value));
                }
                Ok(Node::mapping(entries))
            }
        }

        deserializer.deserialize_any(NodeVisitor)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.0.tag != other.0.tag {
            return false;
        }
        match (&self.0.kind, &other.0.kind) {
            (&NodeKind::Null, &NodeKind::Null) => true,
            (&NodeKind::Scalar(ref a), &NodeKind::Scalar(ref b)) => a == b,
            (&NodeKind::Sequence(ref a), &NodeKind::Sequence(ref b)) => a == b,
            (&NodeKind::Mapping(ref a), &NodeKind::Mapping(ref b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Node {}

/// Hash-consing interner used while assembling a document.
///
/// Interning makes structurally equal subtrees share one allocation, which
/// gives aliases of an anchored subtree a common sharing identity even
/// though the reader hands them over as expanded copies.
pub struct Interner {
    nodes: HashMap<Shape, Node>,
}

/// Structural key of an interned node. Children are referenced by their
/// sharing id, which is sound because they have been interned first.
#[derive(PartialEq, Eq, Hash)]
enum Shape {
    Null(Option<String>),
    Scalar(Option<String>, String),
    Sequence(Option<String>, Vec<usize>),
    Mapping(Option<String>, Vec<(String, usize)>),
}

impl Interner {
    pub fn new() -> Interner {
        Interner {
            nodes: HashMap::new(),
        }
    }

    /// Interns a node assembled from already-interned children.
    pub fn intern(&mut self, tag: Option<String>, kind: NodeKind) -> Node {
        let shape = match kind {
            NodeKind::Null => Shape::Null(tag.clone()),
            NodeKind::Scalar(ref value) => Shape::Scalar(tag.clone(), value.clone()),
            NodeKind::Sequence(ref items) => {
                Shape::Sequence(tag.clone(), items.iter().map(|item| item.id()).collect())
            }
            NodeKind::Mapping(ref entries) => Shape::Mapping(
                tag.clone(),
                entries
                    .iter()
                    .map(|&(ref key, ref value)| (key.clone(), value.id()))
                    .collect(),
            ),
        };

        self.nodes
            .entry(shape)
            .or_insert_with(|| Node::from_parts(tag, kind))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_sharing() {
        let a = Node::mapping(vec![("x".to_string(), Node::scalar("2"))]);
        let b = Node::mapping(vec![("x".to_string(), Node::scalar("2"))]);
        let c = Node::mapping(vec![("x".to_string(), Node::scalar("3"))]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn tags_take_part_in_equality() {
        let plain = Node::scalar("1");
        let tagged = Node::scalar("1").with_tag("demo::One");

        assert_ne!(plain, tagged);
        assert_eq!(tagged, Node::scalar("1").with_tag("demo::One"));
    }

    #[test]
    fn deserializes_from_self_describing_formats() {
        let node: Node = ::serde_yaml::from_str("item: 22\nlist: [a, b]\n").unwrap();

        assert!(node.is_mapping());
        assert_eq!(node.get("item").unwrap().as_scalar(), Some("22"));
        assert_eq!(node.get("list").unwrap().items()[1].as_scalar(), Some("b"));
        assert_eq!(node.tag(), None);
    }

    #[test]
    fn interner_shares_equal_subtrees() {
        let mut interner = Interner::new();

        let x1 = interner.intern(None, NodeKind::Scalar("2".to_string()));
        let x2 = interner.intern(None, NodeKind::Scalar("2".to_string()));
        assert_eq!(x1.id(), x2.id());

        let m1 = interner.intern(None, NodeKind::Mapping(vec![("x".to_string(), x1)]));
        let m2 = interner.intern(None, NodeKind::Mapping(vec![("x".to_string(), x2)]));
        assert_eq!(m1.id(), m2.id());

        let tagged = interner.intern(
            Some("demo::Item".to_string()),
            NodeKind::Scalar("2".to_string()),
        );
        assert_ne!(tagged.id(), interner.intern(None, NodeKind::Scalar("2".to_string())).id());
    }
}
