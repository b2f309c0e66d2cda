//! Capability registry.
//!
//! Maps capability names to the providers that produce them. The registry is
//! filled once at startup and shared read-only by every request.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sigroute_resolve::{CapabilityRegistry, PathParam};
//!
//! struct Database;
//!
//! let registry = CapabilityRegistry::new()
//!     .with("UserId", PathParam::<u64>::new("id"))
//!     .with_shared("Database", Arc::new(Database));
//!
//! assert!(registry.contains("UserId"));
//! assert_eq!(registry.len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::provider::Provider;
use crate::providers::Shared;

/// Capability name to provider map.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` for `capability`, replacing any earlier one.
    pub fn register(&mut self, capability: impl Into<String>, provider: impl Provider + 'static) {
        let capability = capability.into();
        if self
            .providers
            .insert(capability.clone(), Arc::new(provider))
            .is_some()
        {
            tracing::debug!(capability = %capability, "provider replaced");
        }
    }

    /// Registers an application-wide value for `capability`.
    pub fn register_shared<T: Send + Sync + 'static>(
        &mut self,
        capability: impl Into<String>,
        value: Arc<T>,
    ) {
        self.register(capability, Shared::new(value));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, capability: impl Into<String>, provider: impl Provider + 'static) -> Self {
        self.register(capability, provider);
        self
    }

    /// Builder form of [`register_shared`](Self::register_shared).
    pub fn with_shared<T: Send + Sync + 'static>(
        mut self,
        capability: impl Into<String>,
        value: Arc<T>,
    ) -> Self {
        self.register_shared(capability, value);
        self
    }

    /// Returns the provider for `capability`.
    #[must_use]
    pub fn get(&self, capability: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(capability)
    }

    /// Returns true if a provider is registered for `capability`.
    #[must_use]
    pub fn contains(&self, capability: &str) -> bool {
        self.providers.contains_key(capability)
    }

    /// Returns the number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns the registered capability names, sorted.
    pub fn capabilities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::sync_provider;
    use sigroute_core::{RequestContext, Resolution, ResolutionContext, Value};

    #[test]
    fn test_empty_registry() {
        let registry = CapabilityRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("User").is_none());
        assert!(!registry.contains("User"));
    }

    #[test]
    fn test_capabilities_sorted() {
        let registry = CapabilityRegistry::new()
            .with("Tab", sync_provider(|_, _| Resolution::NotFound))
            .with("Org", sync_provider(|_, _| Resolution::NotFound))
            .with("User", sync_provider(|_, _| Resolution::NotFound));
        assert_eq!(registry.capabilities(), vec!["Org", "Tab", "User"]);
        assert!(format!("{registry:?}").contains("Org"));
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mut registry = CapabilityRegistry::new();
        registry.register("Answer", sync_provider(|_, _| Resolution::resolved(1_u32)));
        registry.register("Answer", sync_provider(|_, _| Resolution::resolved(42_u32)));
        assert_eq!(registry.len(), 1);

        let provider = registry.get("Answer").unwrap();
        let resolution = provider
            .provide(&RequestContext::builder().build(), &ResolutionContext::new())
            .await;
        assert_eq!(resolution.value().and_then(Value::downcast_ref::<u32>), Some(&42));
    }

    #[tokio::test]
    async fn test_register_shared() {
        let registry = CapabilityRegistry::new().with_shared("Config", Arc::new(String::from("on")));
        let provider = registry.get("Config").unwrap();
        let resolution = provider
            .provide(&RequestContext::builder().build(), &ResolutionContext::new())
            .await;
        assert_eq!(
            resolution.value().and_then(Value::downcast_ref::<String>).map(String::as_str),
            Some("on")
        );
    }
}
