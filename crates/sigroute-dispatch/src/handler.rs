//! Handler registration.
//!
//! Each endpoint node names an action. The [`HandlerRegistry`] maps actions
//! to type-erased async handlers that receive the request and the endpoint's
//! bound arguments.
//!
//! # Example
//!
//! ```rust
//! use serde::Serialize;
//! use sigroute_core::{BoundArgs, RequestContext, RouteError};
//! use sigroute_dispatch::HandlerRegistry;
//!
//! #[derive(Serialize)]
//! struct Profile {
//!     name: String,
//! }
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register("showUser", |_request: RequestContext, args: BoundArgs| async move {
//!     let name = args.require::<String>("user")?;
//!     Ok::<_, RouteError>(Profile { name: name.to_string() })
//! });
//!
//! assert!(handlers.contains("showUser"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::{Response, StatusCode};
use serde::Serialize;
use sigroute_core::{BoundArgs, RequestContext, RouteError};

use crate::response::json_response;

/// Boxed future returned by an erased handler.
pub type BoxedHandlerResult = Pin<Box<dyn Future<Output = Result<Response<Bytes>, RouteError>> + Send>>;

/// A type-erased endpoint handler.
pub type ErasedHandler = Arc<dyn Fn(RequestContext, BoundArgs) -> BoxedHandlerResult + Send + Sync>;

/// Handler invoked when no candidate route admits the request.
pub type NotFoundHandler = Arc<dyn Fn(RequestContext) -> BoxedHandlerResult + Send + Sync>;

/// Maps actions to handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, ErasedHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler whose result is serialized as a `200` JSON body.
    pub fn register<Res, F, Fut>(&mut self, action: impl Into<String>, handler: F)
    where
        Res: Serialize + Send + 'static,
        F: Fn(RequestContext, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, RouteError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |request: RequestContext, args: BoundArgs| -> BoxedHandlerResult {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let body = handler(request, args).await?;
                json_response(StatusCode::OK, &body)
            })
        });

        self.handlers.insert(action.into(), erased);
    }

    /// Registers a handler that builds its own response.
    pub fn register_raw<F, Fut>(&mut self, action: impl Into<String>, handler: F)
    where
        F: Fn(RequestContext, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Bytes>, RouteError>> + Send + 'static,
    {
        let erased: ErasedHandler =
            Arc::new(move |request: RequestContext, args: BoundArgs| -> BoxedHandlerResult {
                Box::pin(handler(request, args))
            });
        self.handlers.insert(action.into(), erased);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<Res, F, Fut>(mut self, action: impl Into<String>, handler: F) -> Self
    where
        Res: Serialize + Send + 'static,
        F: Fn(RequestContext, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, RouteError>> + Send + 'static,
    {
        self.register(action, handler);
        self
    }

    /// Looks up the handler for `action`.
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&ErasedHandler> {
        self.handlers.get(action)
    }

    /// Returns true if `action` has a handler.
    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the registered actions.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Wraps an async closure as a [`NotFoundHandler`].
pub fn not_found_handler<F, Fut>(handler: F) -> NotFoundHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Bytes>, RouteError>> + Send + 'static,
{
    Arc::new(move |request: RequestContext| -> BoxedHandlerResult { Box::pin(handler(request)) })
}
