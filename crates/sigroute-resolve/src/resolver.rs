//! Capability resolution.

use std::sync::Arc;

use sigroute_core::{RequestContext, Resolution, ResolutionContext, ResolutionError};
use sigroute_telemetry::record_resolution;

use crate::registry::CapabilityRegistry;

/// Resolves capabilities against the scope first, then the registry.
///
/// A capability captured by an ancestor node is returned from the scope
/// without calling any provider. Otherwise the registered provider is asked.
/// A capability with neither a capture nor a provider is an error.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    registry: Arc<CapabilityRegistry>,
}

impl DependencyResolver {
    /// Creates a resolver over `registry`.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Returns true if `capability` can be produced without a capture.
    #[must_use]
    pub fn has_provider(&self, capability: &str) -> bool {
        self.registry.contains(capability)
    }

    /// Resolves `capability` for `request`.
    pub async fn resolve(
        &self,
        capability: &str,
        request: &RequestContext,
        scope: &ResolutionContext,
    ) -> Resolution {
        if let Some(captured) = scope.entry(capability) {
            tracing::trace!(
                capability = %capability,
                origin = %captured.origin,
                "capability served from scope"
            );
            record_resolution(capability, "captured");
            return Resolution::Resolved(captured.value.clone());
        }

        let Some(provider) = self.registry.get(capability) else {
            tracing::debug!(capability = %capability, "no provider registered");
            record_resolution(capability, "error");
            return Resolution::Error(ResolutionError::no_provider(capability));
        };

        let resolution = match provider.provide(request, scope).await {
            Resolution::Error(e) => Resolution::Error(e.attribute(capability)),
            other => other,
        };

        tracing::debug!(
            capability = %capability,
            outcome = resolution.outcome(),
            "capability resolved"
        );
        record_resolution(capability, resolution.outcome());
        resolution
    }
}
