//! Factories over configuration nodes.
//!
//! A [`Factory`](Factory) is a view over one node of a parsed document. It
//! hands out typed values ([`get`](Factory::get)), child factories
//! ([`child`](Factory::child), [`children`](Factory::children)) and
//! resolved instances ([`build`](Factory::build)), and counts which keys
//! have been read so unused configuration can be reported afterwards
//! ([`unused_values`](Factory::unused_values)).
//!
//! Factories are created lazily while the object graph is built and are
//! memoized per key, so asking twice for the same child returns the same
//! factory. The root factory owns the instance tracker; every descendant
//! holds a weak handle to it.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use de::NodeDeserializer;
use locate::Locate;
use node::{Node, NodeKind};
use overrides;
use registry;
use tracker::{InstanceTracker, UsageCell};
use yaml;
use Error;
use Instance;

/// A view over one configuration node.
pub struct Factory {
    node: Node,
    node_path: String,
    usages: UsageCell,
    all_used: Cell<bool>,
    children: RefCell<IndexMap<String, Rc<Factory>>>,
    tracker: Weak<InstanceTracker>,
    root: Option<Rc<InstanceTracker>>,
    search_paths: Rc<Vec<PathBuf>>,
    weak_self: Weak<Factory>,
}

impl Factory {
    /// Creates a root factory over an already parsed node.
    pub fn from_node(node: Node, search_paths: Vec<PathBuf>) -> Rc<Factory> {
        let tracker = Rc::new(InstanceTracker::new());
        let weak = Rc::downgrade(&tracker);
        Factory::create(
            node,
            "root".to_string(),
            weak,
            Some(tracker),
            Rc::new(search_paths),
        )
    }

    /// Parses a YAML document and creates a root factory over it.
    pub fn from_str(document: &str) -> Result<Rc<Factory>, Error> {
        Ok(Factory::from_node(yaml::from_str(document)?, Vec::new()))
    }

    /// Parses a YAML document, applies overrides and creates a root factory
    /// with the given search paths for file lookups.
    pub fn from_str_with(
        document: &str,
        search_paths: Vec<PathBuf>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Rc<Factory>, Error> {
        let node = overrides::apply(yaml::from_str(document)?, overrides)?;
        Ok(Factory::from_node(node, search_paths))
    }

    /// Reads a YAML document from a file and creates a root factory.
    ///
    /// The directory containing the file is appended to the search paths.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Rc<Factory>, Error> {
        Factory::from_file_with(path, Vec::new(), &BTreeMap::new())
    }

    /// Reads a YAML document from a file, applies overrides and creates a
    /// root factory. The directory containing the file is appended to the
    /// search paths.
    pub fn from_file_with<P: AsRef<Path>>(
        path: P,
        mut search_paths: Vec<PathBuf>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Rc<Factory>, Error> {
        let path = path.as_ref();
        let node = overrides::apply(yaml::from_file(path)?, overrides)?;
        if let Some(parent) = path.parent() {
            search_paths.push(parent.to_path_buf());
        }
        Ok(Factory::from_node(node, search_paths))
    }

    fn create(
        node: Node,
        node_path: String,
        tracker: Weak<InstanceTracker>,
        root: Option<Rc<InstanceTracker>>,
        search_paths: Rc<Vec<PathBuf>>,
    ) -> Rc<Factory> {
        let usages = match tracker.upgrade() {
            Some(shared) => shared.usage_cell(&node, || Factory::initial_usages(&node)),
            None => Rc::new(RefCell::new(Factory::initial_usages(&node))),
        };

        Rc::new_cyclic(|weak_self| Factory {
            node,
            node_path,
            usages,
            all_used: Cell::new(false),
            children: RefCell::new(IndexMap::new()),
            tracker,
            root,
            search_paths,
            weak_self: weak_self.clone(),
        })
    }

    fn self_rc(&self) -> Rc<Factory> {
        self.weak_self
            .upgrade()
            .expect("factories are always reference counted")
    }

    fn initial_usages(node: &Node) -> IndexMap<String, u32> {
        match *node.kind() {
            NodeKind::Mapping(ref entries) => entries
                .iter()
                .map(|&(ref key, _)| (key.clone(), 0))
                .collect(),
            NodeKind::Sequence(ref items) => {
                (0..items.len()).map(|index| (index.to_string(), 0)).collect()
            }
            _ => IndexMap::new(),
        }
    }

    /// The node this factory reads from.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The slash-joined path of this factory's node, starting at `root`.
    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    /// The class type requested by the node's tag, or `""` when untagged.
    pub fn class_type(&self) -> &str {
        self.node.tag().unwrap_or("")
    }

    /// Returns `true` if the node is a mapping containing a non-null value
    /// under the given name.
    pub fn contains(&self, name: &str) -> bool {
        match self.node.get(name) {
            Some(value) => !value.is_null(),
            None => false,
        }
    }

    /// The mapping keys of the node in document order, empty for
    /// non-mappings.
    pub fn keys(&self) -> Vec<String> {
        self.node
            .entries()
            .iter()
            .map(|&(ref key, _)| key.clone())
            .collect()
    }

    /// Returns `true` if both factories read structurally equal nodes.
    pub fn same(&self, other: &Factory) -> bool {
        self.node == other.node
    }

    /// Reads a required typed value.
    ///
    /// Any `Deserialize` type works: scalars, lists, maps, enums and
    /// whole structs. An empty `name` reads this factory's own node and
    /// marks it fully used. Fails with
    /// [`MissingKey`](::Error::MissingKey) when the key is absent or null
    /// and with [`BadConversion`](::Error::BadConversion) when the value
    /// does not parse as `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        match self.parameter(name) {
            Some(node) => self.convert(name, &node),
            None => Err(Error::MissingKey {
                name: name.to_string(),
                path: self.node_path.clone(),
            }),
        }
    }

    /// Reads an optional typed value; absent or null keys yield `None`.
    /// A present value that does not parse still fails.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, Error> {
        match self.parameter(name) {
            Some(node) => self.convert(name, &node).map(Some),
            None => Ok(None),
        }
    }

    /// Reads an optional typed value, substituting `default` when absent.
    pub fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, Error> {
        Ok(self.get_opt(name)?.unwrap_or(default))
    }

    fn parameter(&self, name: &str) -> Option<Node> {
        if name.is_empty() {
            // treat this factory's own node as the item
            Some(self.node.clone())
        } else {
            match self.node.get(name) {
                Some(value) if !value.is_null() => Some(value.clone()),
                _ => None,
            }
        }
    }

    fn convert<T: DeserializeOwned>(&self, name: &str, node: &Node) -> Result<T, Error> {
        if name.is_empty() {
            self.mark_all_used();
        } else {
            self.mark_usage(name);
        }
        T::deserialize(NodeDeserializer::new(node)).map_err(|err| Error::BadConversion {
            name: name.to_string(),
            path: self.node_path.clone(),
            message: err.to_string(),
        })
    }

    fn mark_usage(&self, name: &str) {
        if !name.is_empty() {
            *self
                .usages
                .borrow_mut()
                .entry(name.to_string())
                .or_insert(0) += 1;
        }
    }

    pub(crate) fn mark_all_used(&self) {
        self.all_used.set(true);
    }

    /// Returns the factory over the child node at the given name.
    ///
    /// Child factories are memoized: asking twice for the same name returns
    /// the same factory. An empty `name` returns this factory itself and
    /// marks it fully used.
    pub fn child(&self, name: &str) -> Result<Rc<Factory>, Error> {
        if name.is_empty() {
            self.mark_all_used();
            return Ok(self.self_rc());
        }
        if let Some(existing) = self.children.borrow().get(name) {
            return Ok(existing.clone());
        }

        let node = match self.node.get(name) {
            Some(node) => node.clone(),
            None => {
                return Err(Error::MissingKey {
                    name: name.to_string(),
                    path: self.node_path.clone(),
                })
            }
        };

        self.mark_usage(name);
        let factory = Factory::create(
            node,
            format!("{}/{}", self.node_path, name),
            self.tracker.clone(),
            None,
            self.search_paths.clone(),
        );
        self.children
            .borrow_mut()
            .insert(name.to_string(), factory.clone());
        Ok(factory)
    }

    /// Returns factories over the elements of the sequence at the given
    /// name, memoized per index. An empty `name` uses this factory's own
    /// node and marks it fully used.
    pub fn children(&self, name: &str) -> Result<Vec<Rc<Factory>>, Error> {
        let parameter = if name.is_empty() {
            self.node.clone()
        } else {
            match self.node.get(name) {
                Some(node) => node.clone(),
                None => {
                    return Err(Error::MissingKey {
                        name: name.to_string(),
                        path: self.node_path.clone(),
                    })
                }
            }
        };

        let items = match *parameter.kind() {
            NodeKind::Sequence(ref items) => items.clone(),
            _ => {
                return Err(Error::NotASequence {
                    name: name.to_string(),
                    path: self.node_path.clone(),
                })
            }
        };

        if name.is_empty() {
            self.mark_all_used();
        } else {
            self.mark_usage(name);
        }

        let mut factories = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let key = if name.is_empty() {
                index.to_string()
            } else {
                format!("{}/{}", name, index)
            };
            if let Some(existing) = self.children.borrow().get(&key) {
                factories.push(existing.clone());
                continue;
            }

            let factory = Factory::create(
                item.clone(),
                format!("{}/{}", self.node_path, key),
                self.tracker.clone(),
                None,
                self.search_paths.clone(),
            );
            self.children.borrow_mut().insert(key, factory.clone());
            factories.push(factory);
        }
        Ok(factories)
    }

    /// Resolves the child at the given name into an instance of interface
    /// `I`. See [`registry::resolve`](::resolve) for the resolution rules.
    pub fn build<I: Instance>(&self, name: &str) -> Result<I, Error> {
        let child = self.child(name)?;
        registry::resolve(&child)
    }

    /// Resolves an optional instance; an absent or null key yields `None`.
    pub fn build_opt<I: Instance>(&self, name: &str) -> Result<Option<I>, Error> {
        if !self.contains(name) {
            return Ok(None);
        }
        self.build(name).map(Some)
    }

    /// Resolves every element of the sequence at the given name, in order.
    pub fn build_seq<I: Instance>(&self, name: &str) -> Result<Vec<I>, Error> {
        let mut instances = Vec::new();
        for child in self.children(name)? {
            instances.push(registry::resolve(&child)?);
        }
        Ok(instances)
    }

    /// Like [`build_seq`](Factory::build_seq), but an absent key yields an
    /// empty list.
    pub fn build_seq_opt<I: Instance>(&self, name: &str) -> Result<Vec<I>, Error> {
        if !self.contains(name) {
            return Ok(Vec::new());
        }
        self.build_seq(name)
    }

    /// Resolves every value of the mapping at the given name, keyed by its
    /// mapping key, in document order.
    pub fn build_map<I: Instance>(
        &self,
        name: &str,
    ) -> Result<IndexMap<String, I>, Error> {
        let child = self.child(name)?;
        let mut instances = IndexMap::new();
        for key in child.keys() {
            let value = child.child(&key)?;
            instances.insert(key, registry::resolve(&value)?);
        }
        Ok(instances)
    }

    /// Like [`build_map`](Factory::build_map), but an absent key yields an
    /// empty map.
    pub fn build_map_opt<I: Instance>(
        &self,
        name: &str,
    ) -> Result<IndexMap<String, I>, Error> {
        if !self.contains(name) {
            return Ok(IndexMap::new());
        }
        self.build_map(name)
    }

    /// Resolves the value at the given name into a filesystem path.
    ///
    /// The value is resolved through the [`Locate`](::locate::Locate)
    /// interface (so a tag can select a custom locator; the default is
    /// [`LocalPath`](::locate::LocalPath)) against this factory's search
    /// paths.
    pub fn path(&self, name: &str) -> Result<PathBuf, Error> {
        let child = self.child(name)?;
        let locator: Rc<dyn Locate> = registry::resolve(&child)?;
        Ok(locator.locate(&self.search_paths))
    }

    /// Like [`path`](Factory::path), but an absent key yields `None`.
    pub fn path_opt(&self, name: &str) -> Result<Option<PathBuf>, Error> {
        if !self.contains(name) {
            return Ok(None);
        }
        self.path(name).map(Some)
    }

    /// Returns the full paths of all values in this subtree that have never
    /// been read.
    ///
    /// Unread direct keys of this factory come first in document order,
    /// followed by the unread values of its materialized children in
    /// creation order. An unread key whose subtree was never materialized
    /// is reported as a single path. Counters shared between aliased nodes
    /// are reported only once, under the first factory that was
    /// materialized for them.
    pub fn unused_values(&self) -> Vec<String> {
        let mut unused = Vec::new();
        let mut visited = HashSet::new();
        self.collect_unused(&mut unused, &mut visited);
        unused
    }

    fn collect_unused(&self, unused: &mut Vec<String>, visited: &mut HashSet<usize>) {
        let first_visit = visited.insert(Rc::as_ptr(&self.usages) as usize);
        if first_visit && !self.all_used.get() {
            for (name, count) in self.usages.borrow().iter() {
                if *count == 0 {
                    unused.push(format!("{}/{}", self.node_path, name));
                }
            }
        }
        for child in self.children.borrow().values() {
            child.collect_unused(unused, visited);
        }
    }

    /// Serializes the document below this factory back into YAML, with any
    /// overrides applied.
    pub fn to_yaml(&self) -> Result<String, Error> {
        yaml::to_string(&self.node)
    }

    /// The instance tracker, owned by the root and reached weakly from
    /// everywhere else.
    fn shared_tracker(&self) -> Option<Rc<InstanceTracker>> {
        match self.root {
            Some(ref tracker) => Some(tracker.clone()),
            None => self.tracker.upgrade(),
        }
    }

    pub(crate) fn cached_instance(&self, interface: TypeId) -> Option<Rc<dyn Any>> {
        self.shared_tracker()
            .and_then(|tracker| tracker.instance(interface, &self.node))
    }

    pub(crate) fn store_instance(&self, interface: TypeId, instance: Rc<dyn Any>) {
        if let Some(tracker) = self.shared_tracker() {
            tracker.set_instance(interface, self.node.clone(), instance);
        }
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Factory) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Factory")
            .field("node_path", &self.node_path)
            .field("class_type", &self.class_type())
            .finish()
    }
}
