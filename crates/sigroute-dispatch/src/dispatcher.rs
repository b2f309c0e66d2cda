//! The request dispatcher.
//!
//! One pass per request:
//!
//! ```text
//! Matching -> Admitted -> Invoking -> Done
//! Matching -> Exhausted -> NotFoundHandling -> Done
//! Matching -> Aborted -> Done
//! ```
//!
//! Candidates are tried in order. A rejected candidate falls through to the
//! next one; a resolution error, a timeout or a cancellation aborts the
//! request. Nodes shared by several candidates are evaluated once per request.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::FutureExt;
use http::{Request, Response};
use serde::Serialize;
use sigroute_config::DispatchConfig;
use sigroute_core::{
    BoundArgs, CancelSignal, Captured, ErrorCategory, NodeId, RequestContext, RequestId,
    ResolutionContext, RouteError, RouteTree, SignatureError,
};
use sigroute_resolve::{
    Admission, AdmissionEvaluator, CapabilityRegistry, DependencyResolver, Provider,
};
use sigroute_telemetry::{record_dispatch, InFlightGuard};
use tracing::Instrument;

use crate::candidate::{match_candidates, Candidate, CandidateSet};
use crate::handler::{HandlerRegistry, NotFoundHandler};
use crate::response::{error_response, tag_request_id};

/// Dispatcher states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Enumerating and evaluating candidate chains.
    Matching,
    /// A candidate was admitted.
    Admitted,
    /// The endpoint handler is running.
    Invoking,
    /// Every candidate was rejected.
    Exhausted,
    /// The not-found handler is running.
    NotFoundHandling,
    /// Hard error, timeout or cancellation.
    Aborted,
    /// A response was produced.
    Done,
}

impl DispatchState {
    /// Returns the snake_case label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Matching => "matching",
            Self::Admitted => "admitted",
            Self::Invoking => "invoking",
            Self::Exhausted => "exhausted",
            Self::NotFoundHandling => "not_found_handling",
            Self::Aborted => "aborted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Handled,
    NotFound,
    MethodNotAllowed,
    ResolutionError,
    HandlerError,
    Timeout,
    Cancelled,
}

impl Outcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::ResolutionError => "resolution_error",
            Self::HandlerError => "handler_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    const fn of_abort(error: &RouteError) -> Self {
        match error.category() {
            ErrorCategory::Cancelled => Self::Cancelled,
            ErrorCategory::Timeout => Self::Timeout,
            _ => Self::ResolutionError,
        }
    }
}

/// Per-request record of an evaluated node.
#[derive(Debug, Clone)]
enum Evaluated {
    Admitted { args: BoundArgs, captures: Vec<Captured> },
    Rejected,
}

struct Pass<'r> {
    request: &'r RequestContext,
    cancel: &'r CancelSignal,
    state: DispatchState,
    evaluated: HashMap<NodeId, Evaluated>,
}

impl Pass<'_> {
    fn advance(&mut self, next: DispatchState) {
        tracing::debug!(from = %self.state, to = %next, "dispatch state");
        self.state = next;
    }
}

/// Dispatches requests over a validated route tree.
///
/// The dispatcher is `Send + Sync` and is usually shared behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use sigroute_core::{BoundArgs, RequestContext, RouteDef, RouteError, RouteTree};
/// use sigroute_dispatch::Dispatcher;
/// use sigroute_resolve::PathParam;
///
/// # tokio_test::block_on(async {
/// let tree = RouteTree::builder()
///     .route(RouteDef::new("show", "user/{id}").required("id", "UserId").action("showUser"))
///     .build()
///     .unwrap();
///
/// let dispatcher = Dispatcher::builder(tree)
///     .provider("UserId", PathParam::<u64>::new("id"))
///     .handler("showUser", |_request: RequestContext, args: BoundArgs| async move {
///         Ok::<_, RouteError>(*args.require::<u64>("id")?)
///     })
///     .build()
///     .unwrap();
///
/// let request = http::Request::get("/user/42").body(Bytes::new()).unwrap();
/// let response = dispatcher.dispatch(request).await;
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body().as_ref(), b"42");
/// # });
/// ```
pub struct Dispatcher {
    tree: Arc<RouteTree>,
    evaluator: AdmissionEvaluator,
    handlers: HandlerRegistry,
    not_found: Option<NotFoundHandler>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Starts building a dispatcher over `tree`.
    pub fn builder(tree: RouteTree) -> DispatcherBuilder {
        DispatcherBuilder::new(tree)
    }

    /// Returns the route tree.
    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    /// Returns the dispatch settings.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Returns the capability registry.
    pub fn registry(&self) -> &CapabilityRegistry {
        self.evaluator.resolver().registry()
    }

    /// Dispatches one request.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        self.dispatch_with_cancel(request, CancelSignal::new()).await
    }

    /// Dispatches one request, stopping early when `cancel` fires.
    ///
    /// A cancelled request answers `503`; a request exceeding the configured
    /// deadline answers `504`. In both cases in-flight providers are dropped
    /// and no handler is invoked afterwards.
    pub async fn dispatch_with_cancel(
        &self,
        request: Request<Bytes>,
        cancel: CancelSignal,
    ) -> Response<Bytes> {
        let _in_flight = InFlightGuard::new();
        let started = Instant::now();
        let request = RequestContext::from_request(request);
        let request_id = request.request_id();

        let span = tracing::info_span!(
            "dispatch",
            request_id = %request_id,
            http.method = %request.method(),
            http.path = %request.path()
        );

        let (outcome, mut response) = self
            .dispatch_within_deadline(&request, &cancel)
            .instrument(span.clone())
            .await;

        tag_request_id(&mut response, request_id);
        let elapsed = started.elapsed();
        record_dispatch(outcome.as_str(), elapsed);
        span.in_scope(|| {
            tracing::info!(
                http.status_code = response.status().as_u16(),
                outcome = outcome.as_str(),
                duration_ms = duration_ms(elapsed),
                "request dispatched"
            );
        });

        response
    }

    async fn dispatch_within_deadline(
        &self,
        request: &RequestContext,
        cancel: &CancelSignal,
    ) -> (Outcome, Response<Bytes>) {
        let Some(deadline) = self.config.request_timeout() else {
            return self.run(request, cancel).await;
        };

        if let Ok(result) = tokio::time::timeout(deadline, self.run(request, cancel)).await {
            result
        } else {
            cancel.cancel();
            tracing::warn!(timeout_ms = duration_ms(deadline), "request deadline exceeded");
            let error = RouteError::timeout(format!(
                "request exceeded its {}ms deadline",
                duration_ms(deadline)
            ));
            (Outcome::Timeout, error_response(&error, request.request_id()))
        }
    }

    async fn run(&self, request: &RequestContext, cancel: &CancelSignal) -> (Outcome, Response<Bytes>) {
        let mut pass = Pass {
            request,
            cancel,
            state: DispatchState::Matching,
            evaluated: HashMap::new(),
        };
        let request_id = request.request_id();

        let candidates = match match_candidates(&self.tree, request.method(), request.path()) {
            CandidateSet::Matched(candidates) => candidates,
            CandidateSet::MethodNotAllowed(allowed) => {
                tracing::debug!(allowed = ?allowed, "path matched but method did not");
                pass.advance(DispatchState::Done);
                let error = RouteError::method_not_allowed(request.method(), allowed);
                return (Outcome::MethodNotAllowed, error_response(&error, request_id));
            }
            CandidateSet::NoMatch => Vec::new(),
        };
        tracing::debug!(candidates = candidates.len(), "candidates matched");

        for candidate in &candidates {
            match self.admit(&mut pass, candidate).await {
                Ok(Some(args)) => {
                    pass.advance(DispatchState::Admitted);
                    return self.invoke(&mut pass, candidate, args).await;
                }
                Ok(None) => {}
                Err(error) => {
                    pass.advance(DispatchState::Aborted);
                    if error.category() == ErrorCategory::Resolution {
                        tracing::error!(error = %error, "capability resolution failed");
                    }
                    pass.advance(DispatchState::Done);
                    return (Outcome::of_abort(&error), error_response(&error, request_id));
                }
            }
        }

        pass.advance(DispatchState::Exhausted);
        self.not_found(&mut pass).await
    }

    /// Evaluates a candidate chain root to endpoint.
    ///
    /// Returns the handler's arguments, or `None` when a node is rejected.
    async fn admit(
        &self,
        pass: &mut Pass<'_>,
        candidate: &Candidate,
    ) -> Result<Option<BoundArgs>, RouteError> {
        let mut scope = ResolutionContext::new();
        let mut chain = Vec::with_capacity(candidate.steps.len());

        for step in &candidate.steps {
            if let Some(evaluated) = pass.evaluated.get(&step.node) {
                match evaluated {
                    Evaluated::Admitted { args, captures } => {
                        for captured in captures {
                            scope.push_capture(captured.clone());
                        }
                        chain.push((args.clone(), captures.clone()));
                        continue;
                    }
                    Evaluated::Rejected => return Ok(None),
                }
            }

            let node = self.tree.node(step.node);
            let node_request = pass.request.with_path_params(step.params.clone());
            let evaluation = AssertUnwindSafe(self.evaluator.evaluate(
                node,
                &node_request,
                &mut scope,
                pass.cancel,
            ))
            .catch_unwind()
            .await;

            let admission = match evaluation {
                Ok(admission) => admission?,
                Err(_) => {
                    tracing::error!(node = %node.name(), "capability provider panicked");
                    return Err(RouteError::internal(format!(
                        "a capability provider of route node '{}' panicked",
                        node.name()
                    )));
                }
            };

            match admission {
                Admission::Admitted { args, captures } => {
                    pass.evaluated.insert(
                        step.node,
                        Evaluated::Admitted {
                            args: args.clone(),
                            captures: captures.clone(),
                        },
                    );
                    chain.push((args, captures));
                }
                Admission::Rejected(rejection) => {
                    tracing::debug!(reason = %rejection, "candidate abandoned");
                    pass.evaluated.insert(step.node, Evaluated::Rejected);
                    return Ok(None);
                }
            }
        }

        Ok(chain_args(&chain))
    }

    async fn invoke(
        &self,
        pass: &mut Pass<'_>,
        candidate: &Candidate,
        args: BoundArgs,
    ) -> (Outcome, Response<Bytes>) {
        let request_id = pass.request.request_id();

        if pass.cancel.is_cancelled() {
            pass.advance(DispatchState::Aborted);
            pass.advance(DispatchState::Done);
            let error = RouteError::cancelled("request cancelled before the handler ran");
            return (Outcome::Cancelled, error_response(&error, request_id));
        }

        let node = self.tree.node(candidate.endpoint);
        let handler = node.action().and_then(|action| self.handlers.get(action));
        let Some(handler) = handler else {
            pass.advance(DispatchState::Done);
            let error = RouteError::internal(format!("route node '{}' has no handler", node.name()));
            return (Outcome::HandlerError, error_response(&error, request_id));
        };

        pass.advance(DispatchState::Invoking);
        tracing::debug!(node = %node.name(), action = ?node.action(), "invoking handler");

        let params = candidate.params().cloned().unwrap_or_default();
        let request = pass.request.with_path_params(params);
        let result = AssertUnwindSafe(handler(request, args)).catch_unwind().await;
        pass.advance(DispatchState::Done);

        match result {
            Ok(Ok(response)) => (Outcome::Handled, response),
            Ok(Err(error)) => {
                log_handler_error(&error);
                (Outcome::HandlerError, error_response(&error, request_id))
            }
            Err(_) => {
                tracing::error!(node = %node.name(), "handler panicked");
                let error = RouteError::internal("handler panicked");
                (Outcome::HandlerError, error_response(&error, request_id))
            }
        }
    }

    async fn not_found(&self, pass: &mut Pass<'_>) -> (Outcome, Response<Bytes>) {
        let request_id = pass.request.request_id();
        pass.advance(DispatchState::NotFoundHandling);

        let response = match &self.not_found {
            Some(handler) => match handler(pass.request.clone()).await {
                Ok(response) => response,
                Err(error) => {
                    log_handler_error(&error);
                    error_response(&error, request_id)
                }
            },
            None => default_not_found(&self.config, request_id),
        };

        pass.advance(DispatchState::Done);
        (Outcome::NotFound, response)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("nodes", &self.tree.len())
            .field("handlers", &self.handlers)
            .field("registry", self.registry())
            .field("custom_not_found", &self.not_found.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Merges the arguments of an admitted chain.
///
/// The endpoint's own arguments come first. Values captured by ancestors follow
/// under their parameter names, nearest ancestor first; a name the endpoint or
/// a nearer ancestor already binds shadows them.
fn chain_args(chain: &[(BoundArgs, Vec<Captured>)]) -> Option<BoundArgs> {
    let ((endpoint, _), ancestors) = chain.split_last()?;
    let mut args = endpoint.clone();

    for (node_args, captures) in ancestors.iter().rev() {
        for arg in node_args.iter() {
            let captured = captures.iter().any(|c| c.capability == arg.capability);
            if captured && !args.names().any(|name| name == arg.name) {
                args.bind(arg.name.clone(), arg.capability.clone(), arg.value.clone());
            }
        }
    }
    Some(args)
}

fn default_not_found(config: &DispatchConfig, request_id: RequestId) -> Response<Bytes> {
    error_response(&RouteError::not_found(config.not_found_message.clone()), request_id)
}

fn log_handler_error(error: &RouteError) {
    if error.status_code().is_server_error() {
        tracing::error!(error = %error, category = error.category().as_str(), "handler failed");
    } else {
        tracing::debug!(error = %error, category = error.category().as_str(), "handler returned an error");
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builds a [`Dispatcher`] and validates the tree against the registries.
pub struct DispatcherBuilder {
    tree: RouteTree,
    registry: CapabilityRegistry,
    handlers: HandlerRegistry,
    not_found: Option<NotFoundHandler>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    /// Starts a builder over `tree`.
    pub fn new(tree: RouteTree) -> Self {
        Self {
            tree,
            registry: CapabilityRegistry::new(),
            handlers: HandlerRegistry::new(),
            not_found: None,
            config: DispatchConfig::default(),
        }
    }

    /// Replaces the capability registry.
    pub fn registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers a provider.
    pub fn provider(mut self, capability: impl Into<String>, provider: impl Provider + 'static) -> Self {
        self.registry.register(capability, provider);
        self
    }

    /// Registers an application-wide value.
    pub fn shared<T: Send + Sync + 'static>(mut self, capability: impl Into<String>, value: Arc<T>) -> Self {
        self.registry.register_shared(capability, value);
        self
    }

    /// Replaces the handler registry.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Registers a JSON handler for `action`.
    pub fn handler<Res, F, Fut>(mut self, action: impl Into<String>, handler: F) -> Self
    where
        Res: Serialize + Send + 'static,
        F: Fn(RequestContext, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Res, RouteError>> + Send + 'static,
    {
        self.handlers.register(action, handler);
        self
    }

    /// Sets the handler invoked when no candidate is admitted.
    pub fn not_found(mut self, handler: NotFoundHandler) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Sets the dispatch settings.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the request deadline; `None` disables it.
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout_ms = timeout.map_or(0, |t| duration_ms(t).max(1));
        self
    }

    /// Validates and builds the dispatcher.
    ///
    /// # Errors
    ///
    /// - `UnresolvableCapability` when a parameter's capability has no provider
    ///   and is not captured by an ancestor
    /// - `UnknownAction` when an endpoint's action has no handler
    pub fn build(self) -> Result<Dispatcher, SignatureError> {
        validate(&self.tree, &self.registry, &self.handlers)?;

        tracing::debug!(
            nodes = self.tree.len(),
            capabilities = self.registry.len(),
            handlers = self.handlers.len(),
            "dispatcher built"
        );

        Ok(Dispatcher {
            tree: Arc::new(self.tree),
            evaluator: AdmissionEvaluator::new(DependencyResolver::new(Arc::new(self.registry))),
            handlers: self.handlers,
            not_found: self.not_found,
            config: self.config,
        })
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("nodes", &self.tree.len())
            .field("registry", &self.registry)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

fn validate(
    tree: &RouteTree,
    registry: &CapabilityRegistry,
    handlers: &HandlerRegistry,
) -> Result<(), SignatureError> {
    for node in tree.nodes() {
        let inherited = tree.ancestor_captures(node.id());

        for spec in node.signature().iter() {
            let capability = spec.capability();
            if !registry.contains(capability) && !inherited.contains(capability) {
                return Err(SignatureError::UnresolvableCapability {
                    node: node.name().to_string(),
                    parameter: spec.name().to_string(),
                    capability: capability.to_string(),
                });
            }
        }

        if let Some(action) = node.action() {
            if !handlers.contains(action) {
                return Err(SignatureError::UnknownAction {
                    node: node.name().to_string(),
                    action: action.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use http::StatusCode;
    use sigroute_core::{Resolution, RouteDef};
    use sigroute_resolve::{provider_fn, sync_provider, PathParam};
    use sigroute_router::MethodSet;

    fn get(path: &str) -> Request<Bytes> {
        Request::get(path).body(Bytes::new()).unwrap()
    }

    fn echo_node_name(name: &'static str) -> impl Fn(RequestContext, BoundArgs) -> std::future::Ready<Result<&'static str, RouteError>>
           + Send
           + Sync
           + 'static {
        move |_request, _args| std::future::ready(Ok(name))
    }

    fn body_json(response: &Response<Bytes>) -> serde_json::Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_admitted_route_invokes_handler() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("show", "user/{id}").required("id", "UserId").action("show"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .provider("UserId", PathParam::<u64>::new("id"))
            .handler("show", |request: RequestContext, args: BoundArgs| async move {
                let id = args.require::<u64>("id")?;
                Ok::<_, RouteError>(serde_json::json!({
                    "id": *id,
                    "raw": request.path_param("id"),
                }))
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/user/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(&response), serde_json::json!({"id": 42, "raw": "42"}));
    }

    #[tokio::test]
    async fn test_rejection_falls_through_to_next_candidate() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("numeric", "item/{key}").required("id", "NumericKey").action("numeric"))
            .route(RouteDef::new("named", "item/{key}").action("named"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .provider("NumericKey", PathParam::<u64>::new("key"))
            .handler("numeric", echo_node_name("numeric"))
            .handler("named", echo_node_name("named"))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/item/7")).await;
        assert_eq!(response.body().as_ref(), br#""numeric""#);

        let response = dispatcher.dispatch(get("/item/seven")).await;
        assert_eq!(response.body().as_ref(), br#""named""#);
    }

    #[tokio::test]
    async fn test_exhausted_uses_default_not_found() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("show", "user/{id}").required("id", "UserId").action("show"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .provider("UserId", PathParam::<u64>::new("id"))
            .handler("show", echo_node_name("show"))
            .build()
            .unwrap();

        for path in ["/user/abc", "/nothing/here"] {
            let response = dispatcher.dispatch(get(path)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let body = body_json(&response);
            assert_eq!(body["error"]["code"], "NOT_FOUND");
            assert!(body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("no route admitted the request"));
        }
    }

    #[tokio::test]
    async fn test_custom_not_found_handler() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("home", "").action("home"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .handler("home", echo_node_name("home"))
            .not_found(crate::handler::not_found_handler(|request: RequestContext| async move {
                crate::response::json_response(StatusCode::NOT_FOUND, &serde_json::json!({
                    "missing": request.path(),
                }))
            }))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/elsewhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&response), serde_json::json!({"missing": "/elsewhere"}));
    }

    #[tokio::test]
    async fn test_shared_prefix_evaluated_once() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&lookups);

        let tree = RouteTree::builder()
            .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
            .route(
                RouteDef::new("admin_edit", "edit")
                    .chained("find_user")
                    .required("admin", "Admin")
                    .action("admin_edit"),
            )
            .route(
                RouteDef::new("edit", "edit")
                    .chained("find_user")
                    .required("user", "User")
                    .action("edit"),
            )
            .build()
            .unwrap();

        let dispatcher = Dispatcher::builder(tree)
            .provider(
                "User",
                sync_provider(move |request, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Resolution::from_option(request.path_param("id").map(str::to_string))
                }),
            )
            .provider("Admin", sync_provider(|_, _| Resolution::NotFound))
            .handler("admin_edit", echo_node_name("admin_edit"))
            .handler("edit", |_request: RequestContext, args: BoundArgs| async move {
                let user = args.require::<String>("user")?;
                Ok::<_, RouteError>(format!("editing {user}"))
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/user/42/edit")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#""editing 42""#);
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_endpoint_reads_ancestor_capture() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
            .route(RouteDef::new("edit", "edit").chained("find_user").action("edit"))
            .route(
                RouteDef::new("rename", "rename")
                    .chained("find_user")
                    .optional("user", "Nickname")
                    .action("rename"),
            )
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .provider("User", PathParam::<u64>::new("id"))
            .provider("Nickname", sync_provider(|_, _| Resolution::NotFound))
            .handler("edit", |_request: RequestContext, args: BoundArgs| async move {
                Ok::<_, RouteError>(*args.require::<u64>("user")?)
            })
            .handler("rename", |_request: RequestContext, args: BoundArgs| async move {
                Ok::<_, RouteError>(args.is_bound("user"))
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/user/42/edit")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"42");

        // The endpoint's own declaration shadows the inherited capture.
        let response = dispatcher.dispatch(get("/user/42/rename")).await;
        assert_eq!(response.body().as_ref(), b"false");
    }

    #[test]
    fn test_chain_args_prefers_nearest_binding() {
        let value = |n: u64| Some(sigroute_core::Value::new(n));
        let captured = |capability: &str, origin: &str, n: u64| Captured {
            capability: capability.to_string(),
            origin: origin.to_string(),
            value: sigroute_core::Value::new(n),
        };

        let mut root = BoundArgs::new();
        root.bind("org", "Org", value(1));
        root.bind("scope", "Scope", value(10));
        root.bind("lookup", "Lookup", value(99));
        let mut middle = BoundArgs::new();
        middle.bind("scope", "Scope", value(20));
        let endpoint = BoundArgs::new();

        let chain = vec![
            (root, vec![captured("Org", "root", 1), captured("Scope", "root", 10)]),
            (middle, vec![captured("Scope", "middle", 20)]),
            (endpoint, Vec::new()),
        ];
        let args = chain_args(&chain).unwrap();
        assert_eq!(args.get::<u64>("org").as_deref(), Some(&1));
        assert_eq!(args.get::<u64>("scope").as_deref(), Some(&20));
        assert!(!args.is_bound("lookup"));
        assert!(chain_args(&[]).is_none());
    }

    #[tokio::test]
    async fn test_provider_panic_is_500() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("boom", "boom").required("boom", "Boom").action("boom"))
            .build()
            .unwrap();
        let dispatcher = Arc::new(
            Dispatcher::builder(tree)
                .provider("Boom", sync_provider(|_, _| -> Resolution { panic!("provider") }))
                .handler("boom", echo_node_name("boom"))
                .build()
                .unwrap(),
        );

        let task = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.dispatch(get("/boom")).await }
        });
        let response = task.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&response)["error"]["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_resolution_error_aborts_without_fallback() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fallback_calls);

        let tree = RouteTree::builder()
            .route(RouteDef::new("primary", "x").required("db", "Database").action("primary"))
            .route(RouteDef::new("fallback", "x").action("fallback"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .provider(
                "Database",
                sync_provider(|_, _| {
                    Resolution::Error(sigroute_core::ResolutionError::failed(std::io::Error::other(
                        "connection refused",
                    )))
                }),
            )
            .handler("primary", echo_node_name("primary"))
            .handler("fallback", move |_request: RequestContext, _args: BoundArgs| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, RouteError>("fallback") }
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/x")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(&response);
        assert_eq!(body["error"]["code"], "RESOLUTION_ERROR");
        assert_eq!(body["error"]["details"]["capability"], "Database");
        assert!(!body.to_string().contains("connection refused"));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let tree = RouteTree::builder()
            .route(
                RouteDef::new("remove", "user/{id}")
                    .action("remove")
                    .methods(MethodSet::new().delete()),
            )
            .route(
                RouteDef::new("replace", "user/{id}")
                    .action("replace")
                    .methods(MethodSet::new().put().delete()),
            )
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .handler("remove", echo_node_name("remove"))
            .handler("replace", echo_node_name("replace"))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/user/1")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[http::header::ALLOW], "DELETE, PUT");
    }

    #[tokio::test]
    async fn test_deadline_answers_504() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("slow", "slow").required("slow", "Slow").action("slow"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .provider("Slow", provider_fn(|_, _| std::future::pending::<Resolution>()))
            .handler("slow", echo_node_name("slow"))
            .request_timeout(Some(Duration::from_millis(20)))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/slow")).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(&response)["error"]["code"], "TIMEOUT");
    }

    #[tokio::test]
    async fn test_cancelled_request_never_invokes_handler() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);

        let tree = RouteTree::builder()
            .route(RouteDef::new("home", "").action("home"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .handler("home", move |_request: RequestContext, _args: BoundArgs| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, RouteError>("home") }
            })
            .build()
            .unwrap();

        let cancel = CancelSignal::new();
        cancel.cancel();
        let response = dispatcher.dispatch_with_cancel(get("/"), cancel).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_panic_is_500() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("boom", "boom").action("boom"))
            .build()
            .unwrap();
        let dispatcher = Dispatcher::builder(tree)
            .handler("boom", |_request: RequestContext, _args: BoundArgs| async move {
                if true {
                    panic!("boom");
                }
                Ok::<_, RouteError>(())
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(get("/boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_build_rejects_unresolvable_capability() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("show", "user/{id}").required("user", "User").action("show"))
            .build()
            .unwrap();
        let err = Dispatcher::builder(tree)
            .handler("show", echo_node_name("show"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SignatureError::UnresolvableCapability { ref capability, .. } if capability == "User"
        ));
    }

    #[test]
    fn test_build_checks_every_node() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
            .route(RouteDef::new("edit", "edit").chained("find_user").required("user", "User").action("edit"))
            .build()
            .unwrap();
        let result = Dispatcher::builder(tree)
            .provider("User", sync_provider(|_, _| Resolution::NotFound))
            .handler("edit", echo_node_name("edit"))
            .build();
        assert!(result.is_ok());

        let tree = RouteTree::builder()
            .route(RouteDef::new("find_user", "user/{id}").capture("user", "User"))
            .route(RouteDef::new("edit", "edit").chained("find_user").required("user", "User").action("edit"))
            .build()
            .unwrap();
        let result = Dispatcher::builder(tree)
            .handler("edit", echo_node_name("edit"))
            .build();
        assert!(matches!(
            result,
            Err(SignatureError::UnresolvableCapability { ref node, .. }) if node == "find_user"
        ));
    }

    #[test]
    fn test_build_rejects_unknown_action() {
        let tree = RouteTree::builder()
            .route(RouteDef::new("show", "show").action("show"))
            .build()
            .unwrap();
        let err = Dispatcher::builder(tree).build().unwrap_err();
        assert!(matches!(err, SignatureError::UnknownAction { ref action, .. } if action == "show"));
    }

    #[test]
    fn test_dispatcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(DispatchState::NotFoundHandling.to_string(), "not_found_handling");
        assert_eq!(Outcome::of_abort(&RouteError::cancelled("x")).as_str(), "cancelled");
        assert_eq!(Outcome::of_abort(&RouteError::timeout("x")).as_str(), "timeout");
    }
}
