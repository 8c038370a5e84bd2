//! The descriptive listing of registered classes.
//!
//! Every registration records what was registered: the interface, the class
//! name, a description and the argument specifications. The listing is a
//! process-wide sink with no effect on resolution; it exists so a program
//! can document all configurable classes (for example as `--help`-style
//! output, via the [`Display`](std::fmt::Display) implementation, or
//! serialized for external tooling). The sink can be replaced, which tests
//! use to observe registrations in isolation.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::Mutex;

/// One recorded constructor argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentEntry {
    pub name: String,
    pub type_name: String,
    pub description: String,
    pub optional: bool,
}

/// One recorded class registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassEntry {
    pub interface: String,
    pub class_name: String,
    pub description: String,
    pub arguments: Vec<ArgumentEntry>,
    pub default: bool,
}

/// One recorded derived-interface registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedEntry {
    pub interface: String,
    pub class_name: String,
    pub default: bool,
}

/// All recorded registrations, grouped by interface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    pub entries: BTreeMap<String, Vec<ClassEntry>>,
    pub derived: BTreeMap<String, Vec<DerivedEntry>>,
}

impl Listing {
    pub fn new() -> Listing {
        Listing::default()
    }

    pub fn record(&mut self, entry: ClassEntry) {
        self.entries
            .entry(entry.interface.clone())
            .or_insert_with(Vec::new)
            .push(entry);
    }

    pub fn record_derived(&mut self, entry: DerivedEntry) {
        self.derived
            .entry(entry.interface.clone())
            .or_insert_with(Vec::new)
            .push(entry);
    }
}

lazy_static! {
    static ref LISTING: Mutex<Listing> = Mutex::new(Listing::new());
}

/// Records a class registration in the process-wide listing.
pub fn record(entry: ClassEntry) {
    LISTING.lock().expect("listing poisoned").record(entry);
}

/// Records a derived-interface registration in the process-wide listing.
pub fn record_derived(entry: DerivedEntry) {
    LISTING
        .lock()
        .expect("listing poisoned")
        .record_derived(entry);
}

/// Returns a copy of the process-wide listing.
pub fn snapshot() -> Listing {
    LISTING.lock().expect("listing poisoned").clone()
}

/// Replaces the process-wide listing, returning the previous one.
pub fn replace(listing: Listing) -> Listing {
    mem::replace(&mut *LISTING.lock().expect("listing poisoned"), listing)
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (interface, classes) in &self.entries {
            writeln!(f, "# {}", interface)?;
            for class in classes {
                write!(f, "{}", class)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "## {}{}",
            self.class_name,
            if self.default { "*" } else { "" }
        )?;
        writeln!(f, "{}", self.description)?;
        writeln!(f)?;
        for argument in &self.arguments {
            write!(f, "{}", argument)?;
        }
        Ok(())
    }
}

impl fmt::Display for ArgumentEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}{}", self.name, if self.optional { "" } else { " (req)" })?;
        writeln!(f, ": ({}) {}", self.type_name, self.description)?;
        writeln!(f)
    }
}

impl fmt::Display for DerivedEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "## {}{}",
            self.class_name,
            if self.default { "*" } else { "" }
        )
    }
}
