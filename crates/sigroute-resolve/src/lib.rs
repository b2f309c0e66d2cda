//! Capability resolution and route admission for sigroute.
//!
//! - [`Provider`] - produces one capability value for a request
//! - [`CapabilityRegistry`] - capability name to provider map, built at startup
//! - [`DependencyResolver`] - scope first, then the registry
//! - [`CapturePropagator`] - writes `Capture` values to the scope and rolls
//!   them back when a node is rejected
//! - [`AdmissionEvaluator`] - resolves a node's signature in declared order
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sigroute_core::{CancelSignal, RequestContext, ResolutionContext, RouteDef, RouteTree};
//! use sigroute_resolve::{AdmissionEvaluator, CapabilityRegistry, DependencyResolver, PathParam};
//!
//! # tokio_test::block_on(async {
//! let tree = RouteTree::builder()
//!     .route(RouteDef::new("show", "user/{id}").required("id", "UserId").action("showUser"))
//!     .build()
//!     .unwrap();
//!
//! let registry = CapabilityRegistry::new().with("UserId", PathParam::<u64>::new("id"));
//! let evaluator = AdmissionEvaluator::new(DependencyResolver::new(Arc::new(registry)));
//!
//! let node = tree.node(tree.roots()[0]);
//! let request = RequestContext::builder().path_param("id", "42").build();
//! let admission = evaluator
//!     .evaluate(node, &request, &mut ResolutionContext::new(), &CancelSignal::new())
//!     .await
//!     .unwrap();
//!
//! assert!(admission.is_admitted());
//! # });
//! ```

mod admission;
mod capture;
mod provider;
mod providers;
mod registry;
mod resolver;

pub use admission::{Admission, AdmissionEvaluator, Rejection};
pub use capture::CapturePropagator;
pub use provider::{lookup, provider_fn, sync_provider, FnProvider, Provider, SyncProvider};
pub use providers::{Header, JsonBody, PathParam, QueryParam, Shared};
pub use registry::CapabilityRegistry;
pub use resolver::DependencyResolver;

/// Re-exported for implementing [`Provider`].
pub use async_trait::async_trait;
