//! # sigroute
//!
//! **Declarative request-argument resolution and route admission**
//!
//! Each route declares the typed values it needs as a signature of
//! capability-named parameters. For every request, sigroute:
//!
//! - matches the path against a tree of chained routes
//! - resolves each parameter through a registered provider
//! - admits the route only when every required value exists, otherwise
//!   falls through to the next candidate and finally to a not-found handler
//! - shares `Capture` values with descendant routes without querying twice
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use sigroute::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct User {
//!     name: String,
//! }
//!
//! let users = Arc::new(HashMap::from([(42_u64, User { name: "ada".into() })]));
//!
//! let tree = RouteTree::builder()
//!     .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
//!     .route(RouteDef::new("show", "").chained("find_user").action("showUser"))
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::builder(tree)
//!     .provider(
//!         "User",
//!         lookup("id", move |id: u64| {
//!             let users = Arc::clone(&users);
//!             async move { Ok::<_, std::io::Error>(users.get(&id).cloned()) }
//!         }),
//!     )
//!     .handler("showUser", |_request, args: BoundArgs| async move {
//!         let user = args.require::<User>("user")?;
//!         Ok::<_, RouteError>(user.name.clone())
//!     })
//!     .build()
//!     .unwrap();
//!
//! tokio_test::block_on(async {
//!     let ok = dispatcher
//!         .dispatch(http::Request::get("/user/42").body(bytes::Bytes::new()).unwrap())
//!         .await;
//!     assert_eq!(ok.status(), 200);
//!
//!     let missing = dispatcher
//!         .dispatch(http::Request::get("/user/999").body(bytes::Bytes::new()).unwrap())
//!         .await;
//!     assert_eq!(missing.status(), 404);
//! });
//! ```
//!
//! ## Dispatch
//!
//! ```text
//! Request → Match candidates → Admit chain (resolve, capture) → Handler
//!                  ↓                     ↓ Rejected
//!                 405              next candidate → … → Not-found handler
//! ```
//!
//! A provider failure (as opposed to a missing value) aborts the request
//! with a `500` instead of trying other routes.

#![doc(html_root_url = "https://docs.rs/sigroute/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use sigroute_core as core;

// Re-export path matching
pub use sigroute_router as router;

// Re-export providers and admission
pub use sigroute_resolve as resolve;

// Re-export the dispatcher
pub use sigroute_dispatch as dispatch;

// Re-export configuration
pub use sigroute_config as config;

// Re-export telemetry
pub use sigroute_telemetry as telemetry;

use sigroute_config::SigrouteConfig;
use sigroute_telemetry::TelemetryError;

/// Installs logging and metrics as described by `config`.
///
/// # Errors
///
/// Returns an error if the log filter is invalid or a global subscriber is
/// already installed.
pub fn init_telemetry(config: &SigrouteConfig) -> Result<(), TelemetryError> {
    sigroute_telemetry::init_telemetry(
        &config.logging.to_log_config(),
        &config.metrics.to_metrics_config(),
    )
}

/// Prelude module for convenient imports.
///
/// ```rust
/// use sigroute::prelude::*;
/// ```
pub mod prelude {
    pub use sigroute_core::{
        BoundArgs, CancelSignal, Modifier, Modifiers, ParameterSpec, RequestContext, RequestId,
        Resolution, ResolutionContext, ResolutionError, RouteDef, RouteError, RouteResult,
        RouteTree, SignatureDescriptor, SignatureError, Value,
    };

    pub use sigroute_router::MethodSet;

    pub use sigroute_resolve::{
        async_trait, lookup, provider_fn, sync_provider, CapabilityRegistry, Header, JsonBody,
        PathParam, Provider, QueryParam, Shared,
    };

    pub use sigroute_dispatch::{
        json_response, not_found_handler, Dispatcher, DispatcherBuilder, HandlerRegistry,
    };

    pub use sigroute_config::{ConfigLoader, DispatchConfig, SigrouteConfig};
}
