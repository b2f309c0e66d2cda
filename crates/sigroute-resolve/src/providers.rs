//! Built-in providers.
//!
//! | Provider | Reads | `NotFound` when |
//! |----------|-------|-----------------|
//! | [`PathParam<T>`] | a bound path parameter | missing or not parseable as `T` |
//! | [`QueryParam<T>`] | a query string parameter | missing or not parseable as `T` |
//! | [`Header`] | a request header, as `String` | missing or not valid UTF-8 |
//! | [`JsonBody<T>`] | the request body as JSON | empty or not a valid `T` |
//! | [`Shared<T>`] | an application-wide `Arc<T>` | never |

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sigroute_core::{RequestContext, Resolution, ResolutionContext, Value};

use crate::provider::Provider;

/// Resolves a path parameter parsed with [`FromStr`].
///
/// Only parameters bound by the node being evaluated and its ancestors are
/// visible.
pub struct PathParam<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PathParam<T> {
    /// Reads the path parameter `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PathParam<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathParam")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Provider for PathParam<T>
where
    T: FromStr + Send + Sync + 'static,
{
    async fn provide(&self, request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
        Resolution::from_option(
            request
                .path_param(&self.name)
                .and_then(|raw| raw.parse::<T>().ok()),
        )
    }
}

/// Resolves a query string parameter parsed with [`FromStr`].
///
/// When a parameter repeats, the first occurrence wins.
pub struct QueryParam<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueryParam<T> {
    /// Reads the query parameter `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for QueryParam<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParam")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Provider for QueryParam<T>
where
    T: FromStr + Send + Sync + 'static,
{
    async fn provide(&self, request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
        let Some(query) = request.query_string() else {
            return Resolution::NotFound;
        };
        let Ok(pairs) = serde_urlencoded::from_str::<Vec<(String, String)>>(query) else {
            return Resolution::NotFound;
        };
        Resolution::from_option(
            pairs
                .into_iter()
                .find(|(k, _)| *k == self.name)
                .and_then(|(_, v)| v.parse::<T>().ok()),
        )
    }
}

/// Resolves a request header as a `String`.
#[derive(Debug)]
pub struct Header {
    name: String,
}

impl Header {
    /// Reads the header `name` (case-insensitive).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Provider for Header {
    async fn provide(&self, request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
        Resolution::from_option(request.header(&self.name).map(str::to_string))
    }
}

/// Resolves the request body deserialized from JSON.
pub struct JsonBody<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonBody<T> {
    /// Reads the body as a `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonBody<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonBody<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBody")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Provider for JsonBody<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn provide(&self, request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
        if request.body().is_empty() {
            return Resolution::NotFound;
        }
        match serde_json::from_slice::<T>(request.body()) {
            Ok(value) => Resolution::resolved(value),
            Err(e) => {
                tracing::debug!(error = %e, "request body did not deserialize");
                Resolution::NotFound
            }
        }
    }
}

/// Resolves an application-wide shared value.
///
/// Every request receives a handle to the same allocation.
pub struct Shared<T> {
    value: Arc<T>,
}

impl<T> Shared<T> {
    /// Shares `value`.
    pub fn new(value: Arc<T>) -> Self {
        Self { value }
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Provider for Shared<T>
where
    T: Send + Sync + 'static,
{
    async fn provide(&self, _request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
        Resolution::Resolved(Value::from_arc(Arc::clone(&self.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn scope() -> ResolutionContext {
        ResolutionContext::new()
    }

    #[tokio::test]
    async fn test_path_param() {
        let provider = PathParam::<u64>::new("id");

        let request = RequestContext::builder().path_param("id", "42").build();
        let resolution = provider.provide(&request, &scope()).await;
        assert_eq!(resolution.value().and_then(Value::downcast_ref::<u64>), Some(&42));

        let request = RequestContext::builder().path_param("id", "forty-two").build();
        assert!(provider.provide(&request, &scope()).await.is_not_found());

        let request = RequestContext::builder().build();
        assert!(provider.provide(&request, &scope()).await.is_not_found());
    }

    #[tokio::test]
    async fn test_query_param() {
        let provider = QueryParam::<u32>::new("page");

        let request = RequestContext::builder().uri("/users?page=3&page=9").build();
        let resolution = provider.provide(&request, &scope()).await;
        assert_eq!(resolution.value().and_then(Value::downcast_ref::<u32>), Some(&3));

        let request = RequestContext::builder().uri("/users?limit=3").build();
        assert!(provider.provide(&request, &scope()).await.is_not_found());

        let request = RequestContext::builder().uri("/users").build();
        assert!(provider.provide(&request, &scope()).await.is_not_found());
    }

    #[tokio::test]
    async fn test_query_param_decodes() {
        let provider = QueryParam::<String>::new("q");
        let request = RequestContext::builder().uri("/search?q=hello%20world").build();
        let resolution = provider.provide(&request, &scope()).await;
        assert_eq!(
            resolution.value().and_then(Value::downcast_ref::<String>).map(String::as_str),
            Some("hello world")
        );
    }

    #[tokio::test]
    async fn test_header() {
        let provider = Header::new("X-Tenant");
        let request = RequestContext::builder().header("x-tenant", "acme").build();
        assert!(provider.provide(&request, &scope()).await.is_resolved());
        assert!(provider
            .provide(&RequestContext::builder().build(), &scope())
            .await
            .is_not_found());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
    }

    #[tokio::test]
    async fn test_json_body() {
        let provider = JsonBody::<NewUser>::new();

        let request = RequestContext::builder().body(r#"{"name":"alice"}"#).build();
        let resolution = provider.provide(&request, &scope()).await;
        assert_eq!(
            resolution.value().and_then(Value::downcast_ref::<NewUser>),
            Some(&NewUser {
                name: "alice".to_string()
            })
        );

        let request = RequestContext::builder().body("{not json").build();
        assert!(provider.provide(&request, &scope()).await.is_not_found());

        let request = RequestContext::builder().build();
        assert!(provider.provide(&request, &scope()).await.is_not_found());
    }

    #[tokio::test]
    async fn test_shared_returns_same_allocation() {
        struct Database;

        let db = Arc::new(Database);
        let provider = Shared::new(Arc::clone(&db));
        let request = RequestContext::builder().build();

        let first = provider.provide(&request, &scope()).await;
        let resolved = first.value().and_then(Value::downcast::<Database>).unwrap();
        assert!(Arc::ptr_eq(&db, &resolved));
    }
}
