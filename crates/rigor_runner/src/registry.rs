use std::collections::HashSet;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;

/// Paths of units whose dependencies must be resolvable from the default resolver.
///
/// Cloning yields another handle to the same set, so several runners can share one.
/// Adding and removing are idempotent.
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    paths: Arc<Mutex<HashSet<Utf8PathBuf>>>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the path was not registered yet.
    pub fn add_path(&self, path: &Utf8Path) -> bool {
        self.paths.lock().insert(path.to_path_buf())
    }

    /// Returns `true` if the path was registered.
    pub fn remove_path(&self, path: &Utf8Path) -> bool {
        self.paths.lock().remove(path)
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.paths.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }

    /// The registered paths, sorted.
    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<_> = self.paths.lock().iter().cloned().collect();
        paths.sort();
        paths
    }
}

/// The execution boundary drivers are created in.
///
/// The runner only passes it to driver resolution and uses its registry, if any.
#[derive(Debug, Clone)]
pub struct IsolationContext {
    name: String,
    registry: Option<PathRegistry>,
}

impl IsolationContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: None,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: PathRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn registry(&self) -> Option<&PathRegistry> {
        self.registry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_are_idempotent() {
        let registry = PathRegistry::new();
        let path = Utf8Path::new("/work/a.dll");

        assert!(registry.add_path(path));
        assert!(!registry.add_path(path));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove_path(path));
        assert!(!registry.remove_path(path));
        assert!(registry.is_empty());
    }

    #[test]
    fn clones_share_the_same_set() {
        let registry = PathRegistry::new();
        let other = registry.clone();

        other.add_path(Utf8Path::new("/work/b.dll"));
        other.add_path(Utf8Path::new("/work/a.dll"));

        assert!(registry.contains(Utf8Path::new("/work/a.dll")));
        assert_eq!(
            registry.paths(),
            [Utf8PathBuf::from("/work/a.dll"), Utf8PathBuf::from("/work/b.dll")]
        );
    }

    #[test]
    fn concurrent_registration() {
        let registry = PathRegistry::new();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for unit in 0..50 {
                        registry.add_path(Utf8Path::new(&format!("/work/{}.dll", unit % 25)));
                        if worker % 2 == 0 {
                            registry.add_path(Utf8Path::new("/work/shared.dll"));
                        }
                    }
                });
            }
        });

        assert_eq!(registry.len(), 26);
    }
}
