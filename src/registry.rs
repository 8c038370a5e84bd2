//! The process-wide class registry and the resolver.
//!
//! For every *interface* (any `Clone + 'static` type, typically an
//! `Rc<dyn Trait>`), the registry keeps a mapping from class-type tags to
//! constructors, an optional default class, and a list of derived
//! interfaces whose classes may stand in for the interface. Registration is
//! expected to happen at program start, before any resolution; the registry
//! is shared process-wide and guarded by a mutex.
//!
//! Constructors are type-erased to `Rc<dyn Any>` internally; the typed
//! wrappers downcast at the boundary. The cast cannot fail for constructors
//! installed through [`Registrar`](Registrar), since they are stored under
//! the `TypeId` of the interface they produce.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use common::{pretty_type_name, ArgSpec};
use factory::Factory;
use listing;
use listing::{ArgumentEntry, ClassEntry, DerivedEntry};
use locate;
use Error;
use Instance;

pub(crate) type Ctor = Arc<dyn Fn(&Rc<Factory>) -> Result<Rc<dyn Any>, Error> + Send + Sync>;

type Probe = Arc<dyn Fn(&str) -> Option<Ctor> + Send + Sync>;

/// A record stating that instances of a derived interface are legitimate
/// values for this interface. The probe looks a class tag up under the
/// derived interface (an empty tag asks for its default chain) and returns
/// an adapted constructor.
#[derive(Clone)]
struct DerivedLink {
    probe: Probe,
    default: bool,
}

struct InterfaceEntry {
    name: String,
    ctors: BTreeMap<String, Ctor>,
    default_class: Option<String>,
    derived: Vec<DerivedLink>,
}

impl InterfaceEntry {
    fn new(name: String) -> InterfaceEntry {
        InterfaceEntry {
            name,
            ctors: BTreeMap::new(),
            default_class: None,
            derived: Vec::new(),
        }
    }
}

/// The registry state. Public operations go through
/// [`Registrar`](Registrar); this type only exists separately so built-in
/// registrations can run while the global instance is being initialized.
pub(crate) struct Registry {
    interfaces: HashMap<TypeId, InterfaceEntry>,
}

impl Registry {
    fn new() -> Registry {
        Registry {
            interfaces: HashMap::new(),
        }
    }

    fn entry_mut<I: Instance>(&mut self) -> &mut InterfaceEntry {
        self.interfaces
            .entry(TypeId::of::<I>())
            .or_insert_with(|| InterfaceEntry::new(pretty_type_name::<I>()))
    }

    pub(crate) fn register<I, F>(
        &mut self,
        default: bool,
        class: &str,
        description: &str,
        arguments: &[ArgSpec],
        ctor: F,
    ) -> Result<(), Error>
    where
        I: Instance,
        F: Fn(&Rc<Factory>) -> Result<I, Error> + Send + Sync + 'static,
    {
        let entry = self.entry_mut::<I>();

        if entry.ctors.contains_key(class) {
            return Err(Error::DuplicateClass {
                class: class.to_string(),
                interface: entry.name.clone(),
            });
        }
        if default {
            if let Some(ref existing) = entry.default_class {
                return Err(Error::DuplicateDefault {
                    interface: entry.name.clone(),
                    existing: existing.clone(),
                });
            }
        }

        listing::record(ClassEntry {
            interface: entry.name.clone(),
            class_name: class.to_string(),
            description: description.to_string(),
            arguments: arguments
                .iter()
                .map(|spec| ArgumentEntry {
                    name: spec.name.clone(),
                    type_name: spec.type_name.clone(),
                    description: spec.description.clone(),
                    optional: !spec.required,
                })
                .collect(),
            default,
        });
        debug!("registered class {} for interface {}", class, entry.name);

        let erased: Ctor = Arc::new(move |factory| {
            ctor(factory).map(|instance| Rc::new(instance) as Rc<dyn Any>)
        });
        entry.ctors.insert(class.to_string(), erased);
        if default {
            entry.default_class = Some(class.to_string());
        }
        Ok(())
    }

    fn register_derived<I, P, F>(&mut self, default: bool, convert: F)
    where
        I: Instance,
        P: Instance,
        F: Fn(I) -> P + Send + Sync + 'static,
    {
        let convert = Arc::new(convert);
        let probe: Probe = Arc::new(move |class: &str| {
            let ctor = lookup_erased(TypeId::of::<I>(), class)?;
            let convert = convert.clone();
            Some(Arc::new(move |factory: &Rc<Factory>| {
                let instance: I = resolve_with(factory, &ctor)?;
                Ok(Rc::new((convert)(instance)) as Rc<dyn Any>)
            }) as Ctor)
        });

        let derived_name = pretty_type_name::<I>();
        let entry = self.entry_mut::<P>();
        listing::record_derived(DerivedEntry {
            interface: entry.name.clone(),
            class_name: derived_name.clone(),
            default,
        });
        debug!(
            "registered derived interface {} for interface {}",
            derived_name, entry.name
        );
        entry.derived.push(DerivedLink { probe, default });
    }
}

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = {
        let mut registry = Registry::new();
        locate::register_builtin(&mut registry);
        Mutex::new(registry)
    };
}

/// Looks up the constructor for `(interface, class)`. An empty class asks
/// for the default: the registered default class if one is set, otherwise
/// the default chains of the derived interfaces flagged as default.
/// Derived links are probed in registration order.
fn lookup_erased(interface: TypeId, class: &str) -> Option<Ctor> {
    let links = {
        let registry = REGISTRY.lock().expect("registry poisoned");
        let entry = registry.interfaces.get(&interface)?;
        if class.is_empty() {
            if let Some(ref default) = entry.default_class {
                return entry.ctors.get(default).cloned();
            }
            entry
                .derived
                .iter()
                .filter(|link| link.default)
                .cloned()
                .collect::<Vec<_>>()
        } else {
            if let Some(ctor) = entry.ctors.get(class) {
                return Some(ctor.clone());
            }
            entry.derived.clone()
        }
    };

    // probe outside of the lock; derivation chains re-enter the registry
    for link in links {
        if let Some(ctor) = (link.probe)(class) {
            return Some(ctor);
        }
    }
    None
}

/// Resolves the factory's node into an instance of interface `I`.
///
/// The instance tracker is consulted first; a hit marks the factory fully
/// used and returns the stored instance. Otherwise the constructor selected
/// by the node's class type (or the interface default) runs, and its result
/// is stored before being returned, so structurally equal nodes yield the
/// same instance.
pub fn resolve<I: Instance>(factory: &Rc<Factory>) -> Result<I, Error> {
    let interface = TypeId::of::<I>();
    if let Some(instance) = factory.cached_instance(interface) {
        factory.mark_all_used();
        return Ok(downcast::<I>(&instance));
    }

    let class = factory.class_type().to_string();
    trace!(
        "resolving {} with class {:?} as {}",
        factory.node_path(),
        class,
        pretty_type_name::<I>()
    );
    let ctor = match lookup_erased(interface, &class) {
        Some(ctor) => ctor,
        None if class.is_empty() => {
            return Err(Error::NoDefault {
                interface: pretty_type_name::<I>(),
            })
        }
        None => {
            return Err(Error::UnknownType {
                class,
                interface: pretty_type_name::<I>(),
            })
        }
    };

    construct::<I>(factory, interface, &ctor)
}

/// Resolution with a pre-selected constructor, used by derivation probes so
/// the derived interface's own tracker bucket governs the sub-resolution.
fn resolve_with<I: Instance>(factory: &Rc<Factory>, ctor: &Ctor) -> Result<I, Error> {
    let interface = TypeId::of::<I>();
    if let Some(instance) = factory.cached_instance(interface) {
        factory.mark_all_used();
        return Ok(downcast::<I>(&instance));
    }
    construct::<I>(factory, interface, ctor)
}

fn construct<I: Instance>(
    factory: &Rc<Factory>,
    interface: TypeId,
    ctor: &Ctor,
) -> Result<I, Error> {
    let instance = ctor(factory)?;
    factory.store_instance(interface, instance.clone());
    Ok(downcast::<I>(&instance))
}

fn downcast<I: Instance>(instance: &Rc<dyn Any>) -> I {
    instance.downcast_ref::<I>().expect("invalid cast").clone()
}

/// The typed registration facade for one interface.
///
/// Registration is expected to run at program start, before resolution
/// begins; all registrations for a `(interface, class)` pair and the
/// default flag are write-once.
pub struct Registrar<I: Instance> {
    _interface: PhantomData<I>,
}

impl<I: Instance> Registrar<I> {
    /// Registers a constructor for the given class type.
    ///
    /// The argument specifications only feed the descriptive listing; they
    /// have no effect on resolution.
    pub fn register<F>(
        class: &str,
        description: &str,
        arguments: &[ArgSpec],
        ctor: F,
    ) -> Result<(), Error>
    where
        F: Fn(&Rc<Factory>) -> Result<I, Error> + Send + Sync + 'static,
    {
        REGISTRY
            .lock()
            .expect("registry poisoned")
            .register::<I, F>(false, class, description, arguments, ctor)
    }

    /// Registers a constructor and makes it the default for the interface.
    ///
    /// At most one default may be registered per interface; a second
    /// attempt fails with [`DuplicateDefault`](::Error::DuplicateDefault)
    /// and leaves the registry unchanged.
    pub fn register_default<F>(
        class: &str,
        description: &str,
        arguments: &[ArgSpec],
        ctor: F,
    ) -> Result<(), Error>
    where
        F: Fn(&Rc<Factory>) -> Result<I, Error> + Send + Sync + 'static,
    {
        REGISTRY
            .lock()
            .expect("registry poisoned")
            .register::<I, F>(true, class, description, arguments, ctor)
    }

    /// Registers this interface as derived from parent interface `P`.
    ///
    /// Class types registered for `I` then also resolve in slots typed by
    /// `P`; the sub-resolution runs under `I` (sharing its instances) and
    /// the result is upcast with `convert` and recorded under `P` as well,
    /// so both interfaces hand out the same object for one node.
    pub fn register_derived<P, F>(convert: F)
    where
        P: Instance,
        F: Fn(I) -> P + Send + Sync + 'static,
    {
        REGISTRY
            .lock()
            .expect("registry poisoned")
            .register_derived::<I, P, F>(false, convert)
    }

    /// Registers this interface as derived from parent interface `P` and
    /// includes it when searching for `P`'s default class.
    pub fn register_default_derived<P, F>(convert: F)
    where
        P: Instance,
        F: Fn(I) -> P + Send + Sync + 'static,
    {
        REGISTRY
            .lock()
            .expect("registry poisoned")
            .register_derived::<I, P, F>(true, convert)
    }

    /// The name of the default class registered for this interface.
    pub fn default_class() -> Option<String> {
        let registry = REGISTRY.lock().expect("registry poisoned");
        registry
            .interfaces
            .get(&TypeId::of::<I>())
            .and_then(|entry| entry.default_class.clone())
    }

    /// Returns `true` if a constructor is registered directly for the given
    /// class type.
    pub fn is_registered(class: &str) -> bool {
        let registry = REGISTRY.lock().expect("registry poisoned");
        registry
            .interfaces
            .get(&TypeId::of::<I>())
            .map(|entry| entry.ctors.contains_key(class))
            .unwrap_or(false)
    }
}
