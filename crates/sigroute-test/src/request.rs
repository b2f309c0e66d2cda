//! Test request building.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

use crate::error::TestError;

/// A request waiting to be dispatched.
///
/// Invalid headers or bodies do not panic while building; the first problem
/// is kept and reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequest {
    /// Creates a request builder for `method` and `uri`.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// Creates a GET request.
    pub fn get(uri: impl AsRef<str>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Creates a POST request.
    pub fn post(uri: impl AsRef<str>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Creates a PUT request.
    pub fn put(uri: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// Creates a PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH, uri)
    }

    /// Creates a DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let parsed = HeaderName::try_from(name)
            .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            .and_then(|n| {
                HeaderValue::try_from(value.as_ref())
                    .map(|v| (n, v))
                    .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            });

        match parsed {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets a header only if it is not present yet.
    pub(crate) fn default_header(self, name: &str, value: &str) -> Self {
        if self.headers.contains_key(name) {
            return self;
        }
        self.header(name, value)
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    ///
    /// # Example
    ///
    /// ```
    /// use sigroute_test::TestRequest;
    ///
    /// let request = TestRequest::post("/users")
    ///     .json(&serde_json::json!({"name": "alice"}))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers()["content-type"], "application/json");
    /// ```
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.content_type("application/json")
            }
            Err(e) => {
                self.fail(TestError::Json(e));
                self
            }
        }
    }

    /// Builds the `http::Request`.
    pub fn build(self) -> Result<http::Request<Bytes>, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI '{}': {e}", self.uri)))?;

        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}
