//! In-process plugins, registered by name.

use std::fmt;
use std::sync::Arc;

use crate::builtin::{CompliancePlugin, EchoPlugin};
use crate::provider::CapabilityProvider;

/// Builds a fresh provider instance.
pub type NativeFactory = Arc<dyn Fn() -> Box<dyn CapabilityProvider> + Send + Sync>;

/// Name to factory table for native plugins, in registration order.
#[derive(Clone, Default)]
pub struct NativeCatalog {
    factories: Vec<(String, NativeFactory)>,
}

impl fmt::Debug for NativeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCatalog")
            .field("names", &self.names())
            .finish()
    }
}

impl NativeCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in `echo` and `compliance` plugins.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .with("echo", || Box::new(EchoPlugin::new()))
            .with("compliance", || Box::new(CompliancePlugin::new()))
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn CapabilityProvider> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Register `factory` under `name`. Re-registering a name replaces the
    /// factory but keeps its position.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn CapabilityProvider> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: NativeFactory = Arc::new(factory);
        if let Some(slot) = self.factories.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = factory;
        } else {
            self.factories.push((name, factory));
        }
    }

    /// Build a new instance of `name`.
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Box<dyn CapabilityProvider>> {
        self.factories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory())
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|(n, _)| n == name)
    }

    /// Registered names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.factories.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_in_order() {
        let catalog = NativeCatalog::with_builtins();
        assert_eq!(catalog.names(), vec!["echo", "compliance"]);
        assert_eq!(catalog.create("echo").unwrap().describe().name, "echo");
        assert!(catalog.create("missing").is_none());
    }

    #[test]
    fn reregistering_keeps_position() {
        let catalog = NativeCatalog::with_builtins()
            .with("echo", || Box::new(CompliancePlugin::new()));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names()[0], "echo");
        assert_eq!(
            catalog.create("echo").unwrap().describe().name,
            "compliance"
        );
    }
}
