//! Registry of mountable backend kinds.
//!
//! An explicit instance, handed to the command layer, so several namespaces
//! can coexist in one process with different sets of kinds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::local::LocalFs;
use super::memory::MemoryFs;
use super::traits::Backend;

/// Builds a backend of one kind from `mount` arguments.
pub trait BackendFactory: Send + Sync {
    fn kind(&self) -> &str;

    fn describe(&self) -> &str;

    fn create(&self, args: &[String]) -> VfsResult<Arc<dyn Backend>>;
}

/// Name-keyed table of backend factories.
#[derive(Default)]
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `memory` and `local`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MemoryFactory);
        registry.register(LocalFactory);
        registry
    }

    pub fn register(&mut self, factory: impl BackendFactory + 'static) {
        self.factories
            .insert(factory.kind().to_string(), Arc::new(factory));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn BackendFactory>> {
        self.factories.get(kind).cloned()
    }

    /// Sorted kind names.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort();
        kinds
    }

    pub fn create(&self, kind: &str, args: &[String]) -> VfsResult<Arc<dyn Backend>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| VfsError::invalid(format!("unknown backend kind: {kind}")))?;
        factory.create(args)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// `mount memory PATH [LABEL]`
struct MemoryFactory;

impl BackendFactory for MemoryFactory {
    fn kind(&self) -> &str {
        "memory"
    }

    fn describe(&self) -> &str {
        "in-memory store; optional label"
    }

    fn create(&self, args: &[String]) -> VfsResult<Arc<dyn Backend>> {
        let backend = match args.first() {
            Some(label) => MemoryFs::labelled(label.clone()),
            None => MemoryFs::new(),
        };
        Ok(Arc::new(backend))
    }
}

/// `mount local PATH ROOT [ro]`
struct LocalFactory;

impl BackendFactory for LocalFactory {
    fn kind(&self) -> &str {
        "local"
    }

    fn describe(&self) -> &str {
        "host directory; ROOT [ro]"
    }

    fn create(&self, args: &[String]) -> VfsResult<Arc<dyn Backend>> {
        let root = args
            .first()
            .ok_or_else(|| VfsError::invalid("local: missing host root"))?;
        if !std::path::Path::new(root).is_dir() {
            return Err(VfsError::invalid(format!("local: not a directory: {root}")));
        }
        let backend = match args.get(1).map(String::as_str) {
            Some("ro") => LocalFs::read_only(root),
            Some("rw") | None => LocalFs::new(root),
            Some(other) => return Err(VfsError::invalid(format!("local: unknown mode: {other}"))),
        };
        Ok(Arc::new(backend))
    }
}
