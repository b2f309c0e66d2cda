//! Test client for in-memory dispatch.

use std::sync::Arc;

use http::Method;
use sigroute_core::CancelSignal;
use sigroute_dispatch::Dispatcher;

use crate::error::TestError;
use crate::request::TestRequest;
use crate::response::TestResponse;

/// Sends requests straight into a [`Dispatcher`], without a server or socket.
///
/// # Example
///
/// ```
/// use sigroute_core::{RouteDef, RouteTree, RouteError};
/// use sigroute_dispatch::Dispatcher;
/// use sigroute_test::TestClient;
///
/// let tree = RouteTree::builder()
///     .route(RouteDef::new("health", "health").action("health"))
///     .build()
///     .unwrap();
/// let dispatcher = Dispatcher::builder(tree)
///     .handler("health", |_request, _args| async { Ok::<_, RouteError>("ok") })
///     .build()
///     .unwrap();
///
/// let client = TestClient::new(dispatcher);
/// tokio_test::block_on(async {
///     client.get("/health").send().await.assert_status_code(200);
/// });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client owning `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    /// Creates a client over a shared dispatcher.
    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request unless the request sets it.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest {
            client: self,
            request: TestRequest::new(method, uri),
            cancel: None,
        }
    }
}

/// A request being built by a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    request: TestRequest,
    cancel: Option<CancelSignal>,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.request = self.request.content_type(content_type);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request = self.request.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.request = self.request.json(value);
        self
    }

    /// Dispatches under `cancel` instead of a fresh signal.
    pub fn cancel_with(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Dispatches the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built. Use [`try_send`](Self::try_send)
    /// to handle that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("failed to send test request: {e}"),
        }
    }

    /// Dispatches the request, reporting build failures.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let mut request = self.request;
        for (name, value) in &self.client.default_headers {
            request = request.default_header(name, value);
        }
        let request = request.build()?;

        let dispatcher = &self.client.dispatcher;
        let response = match self.cancel {
            Some(cancel) => dispatcher.dispatch_with_cancel(request, cancel).await,
            None => dispatcher.dispatch(request).await,
        };
        Ok(TestResponse::from_http(response))
    }
}
