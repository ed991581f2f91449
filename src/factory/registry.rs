//! Name-indexed factory registry.

use std::sync::Arc;

use indexmap::IndexMap;

use super::Factory;

/// Factories of one kind, keyed by name, in registration order.
pub struct FactoryRegistry<F: ?Sized> {
    kind: &'static str,
    factories: IndexMap<String, Arc<F>>,
}

impl<F: ?Sized> FactoryRegistry<F> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: IndexMap::new(),
        }
    }

    /// Register under `name`. A later registration replaces an earlier one.
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<F>) {
        let name = name.into();
        if self.factories.contains_key(&name) {
            tracing::warn!(
                kind = self.kind,
                factory = %name,
                "Factory registered twice, later registration wins"
            );
        }
        tracing::debug!(kind = self.kind, factory = %name, "Loaded factory");
        self.factories.insert(name, factory);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<F>> {
        self.factories.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<F: ?Sized + Factory> FactoryRegistry<F> {
    /// Register under the factory's own name.
    pub fn register_factory(&mut self, factory: Arc<F>) {
        let name = factory.name().to_string();
        self.register(name, factory);
    }
}

impl<F: ?Sized> std::fmt::Debug for FactoryRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("kind", &self.kind)
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
