//! Configuration-driven construction of object graphs with runtime class
//! registration and opinionated defaults.
//!
//! # Overview
//!
//! This crate is roughly divided into two parts:
//!
//! 1. Reading hierarchical configuration documents into a node tree.
//! 2. Construction of a graph of domain objects from that tree.
//!
//! Both aspects can be configured; the document reader, the path locator
//! and the descriptive listing are all replaceable collaborators.
//!
//! Most of the functionality is centered around the
//! [`Factory`](Factory): a view over one node of the document that hands
//! out typed values, child factories and fully resolved instances.
//!
//! ## Registering classes
//!
//! Classes are registered against an *interface* (any `Clone + 'static`
//! type, typically a shared trait object such as `Rc<dyn Shape>`) under a
//! *class type* name, via the [`Registrar`](Registrar). A document selects
//! the class for a slot with a YAML tag (`!demo::Circle`); untagged nodes
//! fall back to the interface's registered default. Every registration is
//! also recorded in the [`listing`](listing) so programs can document
//! their configurable surface.
//!
//! ## Building an object graph
//!
//! A root [`Factory`](Factory) wraps a parsed document. Asking it for an
//! instance looks up the constructor registered for the node's class type,
//! which in turn pulls its arguments (and further instances) from the same
//! factory, recursing through the document. Constructed instances are
//! tracked per interface and re-used whenever a structurally equal node is
//! resolved again, so anchors, aliases and repeated subtrees all yield one
//! shared object.
//!
//! ```
//! use std::rc::Rc;
//! use objconf::{Factory, Registrar, ArgSpec};
//!
//! trait Shape {
//!     fn area(&self) -> f64;
//! }
//!
//! struct Circle {
//!     radius: f64,
//! }
//!
//! impl Shape for Circle {
//!     fn area(&self) -> f64 {
//!         std::f64::consts::PI * self.radius * self.radius
//!     }
//! }
//!
//! Registrar::<Rc<dyn Shape>>::register(
//!     "demo::Circle",
//!     "a circle in the plane",
//!     &[ArgSpec::required::<f64>("radius", "the radius of the circle")],
//!     |factory| {
//!         Ok(Rc::new(Circle {
//!             radius: factory.get("radius")?,
//!         }) as Rc<dyn Shape>)
//!     },
//! )
//! .unwrap();
//!
//! let root = Factory::from_str("shape: !demo::Circle\n  radius: 2.0\n").unwrap();
//! let shape = root.build::<Rc<dyn Shape>>("shape").unwrap();
//! assert!((shape.area() - 12.566).abs() < 1e-3);
//! assert!(root.unused_values().is_empty());
//! ```
//!
//! ## Unused values
//!
//! Factories count every read of a key. After the graph has been built,
//! [`Factory::unused_values`](Factory::unused_values) reports the paths of
//! all configuration the constructors never looked at, usually a typo or
//! a leftover.
//!
//! ## Overrides
//!
//! Individual values can be replaced before construction starts with a
//! flat map of `path::to::value` overrides (see
//! [`overrides`](overrides)), which is convenient for command-line
//! `--set`-style flags.

extern crate indexmap;
extern crate serde;
extern crate serde_yaml;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate failure;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate tracing;

use std::io;

pub mod common;
pub mod listing;
pub mod locate;
pub mod node;
pub mod overrides;
pub mod yaml;

mod de;
mod factory;
mod registry;
mod tracker;

pub use common::{pretty_type_name, ArgSpec};
pub use factory::Factory;
pub use node::{Node, NodeKind};
pub use registry::{resolve, Registrar};

/// Types that can be produced by resolution.
///
/// An interface is any cheaply clonable `'static` type; in practice it is
/// almost always a shared handle such as `Rc<dyn Trait>`, so that the
/// instance tracker can hand out the same object repeatedly.
pub trait Instance: Clone + 'static {}

impl<T: Clone + 'static> Instance for T {}

/// An error that can occur while registering classes or building a graph.
#[derive(Debug, Fail)]
pub enum Error {
    /// A required key is absent (or explicitly null).
    #[fail(display = "unable to locate {} in {}", name, path)]
    MissingKey { name: String, path: String },

    /// A value is present but does not parse as the requested type.
    #[fail(display = "unable to convert {} in {}: {}", name, path, message)]
    BadConversion {
        name: String,
        path: String,
        message: String,
    },

    /// A sequence-shaped request targeted a non-sequence node.
    #[fail(display = "item {} is expected to be a sequence in {}", name, path)]
    NotASequence { name: String, path: String },

    /// A class-type tag has no registered constructor for the interface.
    #[fail(display = "unknown type {} for interface {}", class, interface)]
    UnknownType { class: String, interface: String },

    /// An untagged node was resolved for an interface without a default.
    #[fail(display = "no default class specified for interface {}", interface)]
    NoDefault { interface: String },

    /// The class type is already registered for the interface.
    #[fail(display = "class {} is already registered for interface {}", class, interface)]
    DuplicateClass { class: String, interface: String },

    /// A default class is already set for the interface.
    #[fail(
        display = "the default class for interface {} is already set as {}",
        interface, existing
    )]
    DuplicateDefault { interface: String, existing: String },

    /// An override path addressed a sequence index that does not exist.
    #[fail(display = "override target {} does not exist", path)]
    OverrideTargetMissing { path: String },

    /// The document could not be parsed.
    #[fail(display = "{}", _0)]
    Parse(String),

    /// An IO error.
    #[fail(display = "{}", _0)]
    Io(#[fail(cause)] io::Error),

    /// An unspecified error with a message describing the failure.
    #[fail(display = "{}", _0)]
    Msg(String),
}

impl Error {
    /// Creates a new, unspecified error with the provided message.
    pub fn msg<D>(msg: &D) -> Self
    where
        D: ToString + ?Sized,
    {
        Error::Msg(msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}
