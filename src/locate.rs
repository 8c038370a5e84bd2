//! Locating files referenced by configuration values.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use registry::Registry;

/// Locates a file or resource referenced by a configuration value.
///
/// Locators are resolved through the registry like any other interface, so
/// a tagged node can select a custom implementation (for example one that
/// downloads a remote resource). The registered default is
/// [`LocalPath`](LocalPath).
pub trait Locate {
    /// Resolves the referenced location against the given search paths.
    fn locate(&self, search_paths: &[PathBuf]) -> PathBuf;
}

/// The simplest locator: it hands back the configured path.
///
/// If the path does not exist as given, the search paths are tried in
/// order and the first hit is returned in canonical form; otherwise the
/// path is returned unchanged.
pub struct LocalPath {
    path: String,
}

impl LocalPath {
    pub fn new<S: Into<String>>(path: S) -> LocalPath {
        LocalPath { path: path.into() }
    }
}

impl Locate for LocalPath {
    fn locate(&self, search_paths: &[PathBuf]) -> PathBuf {
        let path = Path::new(&self.path);
        if path.exists() {
            return path.to_path_buf();
        }

        for directory in search_paths {
            let candidate = directory.join(&self.path);
            if candidate.exists() {
                return fs::canonicalize(&candidate).unwrap_or(candidate);
            }
        }

        path.to_path_buf()
    }
}

/// Registers [`LocalPath`](LocalPath) as the default locator. Runs while
/// the global registry is being initialized.
pub(crate) fn register_builtin(registry: &mut Registry) {
    registry
        .register::<Rc<dyn Locate>, _>(
            true,
            "LocalPath",
            "default locator that returns the specified local path",
            &[],
            |factory| Ok(Rc::new(LocalPath::new(factory.get::<String>("")?)) as Rc<dyn Locate>),
        )
        .expect("builtin locator registration failed");
}
