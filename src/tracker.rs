//! Tracking and re-using instances across factories.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use node::Node;

/// Per-key read counters of one node, shared by every factory over it.
pub type UsageCell = Rc<RefCell<IndexMap<String, u32>>>;

/// Owned by the root factory; child factories hold a weak handle.
///
/// Instances are bucketed per interface and looked up by structural node
/// equality, so aliased references and independently authored but identical
/// subtrees resolve to the same object. Once the root factory is dropped,
/// lookups through the weak handles return nothing and resolution simply
/// proceeds without caching.
pub struct InstanceTracker {
    instances: RefCell<HashMap<TypeId, Vec<(Node, Rc<dyn Any>)>>>,
    usages: RefCell<HashMap<usize, UsageCell>>,
}

impl InstanceTracker {
    pub fn new() -> InstanceTracker {
        InstanceTracker {
            instances: RefCell::new(HashMap::new()),
            usages: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the instance previously stored for a structurally equal node
    /// under the given interface. The last stored instance wins.
    pub fn instance(&self, interface: TypeId, node: &Node) -> Option<Rc<dyn Any>> {
        let instances = self.instances.borrow();
        let bucket = instances.get(&interface)?;
        bucket
            .iter()
            .rev()
            .find(|&&(ref stored, _)| stored == node)
            .map(|&(_, ref instance)| instance.clone())
    }

    /// Stores the instance created for a node under the given interface.
    pub fn set_instance(&self, interface: TypeId, node: Node, instance: Rc<dyn Any>) {
        self.instances
            .borrow_mut()
            .entry(interface)
            .or_insert_with(Vec::new)
            .push((node, instance));
    }

    /// Returns the usage cell of a node, creating it on first sight.
    ///
    /// Cells are keyed by the node's sharing identity, so factories reached
    /// through different aliases of one subtree count their reads together.
    pub fn usage_cell<F>(&self, node: &Node, init: F) -> UsageCell
    where
        F: FnOnce() -> IndexMap<String, u32>,
    {
        self.usages
            .borrow_mut()
            .entry(node.id())
            .or_insert_with(|| Rc::new(RefCell::new(init())))
            .clone()
    }
}
