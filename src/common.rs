//! Shared registration metadata.

use std::any::type_name;

/// Describes one constructor argument for the descriptive listing.
///
/// Argument specifications are metadata only: they document which values a
/// registered class pulls from its factory and have no effect on
/// resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    /// The key under which the argument is read.
    pub name: String,

    /// A human-readable rendering of the argument type.
    pub type_name: String,

    /// A short description of the argument.
    pub description: String,

    /// Whether the argument must be present in the configuration.
    pub required: bool,
}

impl ArgSpec {
    /// Creates the specification of a required argument of type `T`.
    pub fn required<T>(name: &str, description: &str) -> ArgSpec {
        ArgSpec::new::<T>(name, description, true)
    }

    /// Creates the specification of an optional argument of type `T`.
    pub fn optional<T>(name: &str, description: &str) -> ArgSpec {
        ArgSpec::new::<T>(name, description, false)
    }

    fn new<T>(name: &str, description: &str, required: bool) -> ArgSpec {
        ArgSpec {
            name: name.to_string(),
            type_name: pretty_type_name::<T>(),
            description: description.to_string(),
            required,
        }
    }
}

/// Returns a human-readable name for `T`, used for interfaces and argument
/// types in the descriptive listing and in error messages.
///
/// Module paths are stripped and a handful of common configuration types
/// are given friendlier names.
pub fn pretty_type_name<T: ?Sized>() -> String {
    let simplified = strip_paths(type_name::<T>());
    match simplified.as_str() {
        "String" | "str" | "&str" => "string".to_string(),
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            "int".to_string()
        }
        "f32" | "f64" => "double".to_string(),
        "bool" => "bool".to_string(),
        "PathBuf" | "Path" => "file path or url".to_string(),
        "Vec<String>" => "string list".to_string(),
        "Vec<i32>" | "Vec<i64>" => "int list".to_string(),
        "Vec<f32>" | "Vec<f64>" => "double list".to_string(),
        "BTreeMap<String, String>" | "HashMap<String, String>" | "IndexMap<String, String>" => {
            "argument map".to_string()
        }
        _ => simplified,
    }
}

/// Removes module paths from a `type_name` rendering, keeping only the
/// final segment of every path.
fn strip_paths(raw: &str) -> String {
    let mut out = String::new();
    let mut segment_start = None;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            if let Some(start) = segment_start {
                out.truncate(start);
            }
        } else if c.is_alphanumeric() || c == '_' {
            if segment_start.is_none() {
                segment_start = Some(out.len());
            }
            out.push(c);
        } else {
            segment_start = None;
            out.push(c);
        }
    }

    out
}
