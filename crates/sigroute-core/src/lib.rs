//! Core types for sigroute.
//!
//! This crate holds the data model shared by the resolver and the dispatcher:
//!
//! - [`SignatureDescriptor`] and [`ParameterSpec`] - what a route node needs
//! - [`Resolution`], [`ResolutionContext`] and [`BoundArgs`] - what it got
//! - [`RouteTree`] and [`RouteNode`] - chained routes, built once at startup
//! - [`RequestContext`] - the request as seen by providers and handlers
//! - [`RouteError`], [`ResolutionError`] and [`SignatureError`] - failures
//! - [`CancelSignal`] - per-request cancellation
//!
//! # Example
//!
//! ```
//! use sigroute_core::{RouteDef, RouteTree};
//!
//! let tree = RouteTree::builder()
//!     .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
//!     .route(RouteDef::new("edit", "edit").chained("find_user").action("editUser"))
//!     .build()
//!     .expect("valid tree");
//!
//! assert_eq!(tree.endpoints().count(), 1);
//! ```

mod cancel;
mod context;
mod error;
mod resolution;
mod signature;
mod tree;

pub use cancel::CancelSignal;
pub use context::{RequestContext, RequestContextBuilder, RequestId, REQUEST_ID_HEADER};
pub use error::{
    ErrorCategory, ErrorDetail, ErrorEnvelope, ResolutionError, RouteError, RouteResult,
    SignatureError,
};
pub use resolution::{BoundArg, BoundArgs, Captured, Checkpoint, Resolution, ResolutionContext, Value};
pub use signature::{Modifier, Modifiers, ParameterSpec, SignatureBuilder, SignatureDescriptor};
pub use tree::{NodeId, RouteDef, RouteNode, RouteTree, RouteTreeBuilder};
