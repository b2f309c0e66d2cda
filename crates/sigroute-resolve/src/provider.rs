//! The provider trait and closure adapters.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sigroute_core::{RequestContext, Resolution, ResolutionContext, ResolutionError};

/// Produces the value of one capability for a request.
///
/// Providers answer with a three-valued [`Resolution`]:
/// - `Resolved` when the value exists,
/// - `NotFound` when it does not (the route is not admitted),
/// - `Error` when producing it failed (the request is aborted).
///
/// A provider may read the request (path parameters bound so far, query,
/// headers, body) and the values captured by ancestor route nodes.
///
/// # Implementing `Provider`
///
/// ```rust
/// use async_trait::async_trait;
/// use sigroute_core::{RequestContext, Resolution, ResolutionContext};
/// use sigroute_resolve::Provider;
///
/// struct ApiVersion;
///
/// #[async_trait]
/// impl Provider for ApiVersion {
///     async fn provide(&self, request: &RequestContext, _scope: &ResolutionContext) -> Resolution {
///         let version = request
///             .header("x-api-version")
///             .and_then(|v| v.parse::<u32>().ok());
///         Resolution::from_option(version)
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Resolves the capability for `request`.
    async fn provide(&self, request: &RequestContext, scope: &ResolutionContext) -> Resolution;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    async fn provide(&self, request: &RequestContext, scope: &ResolutionContext) -> Resolution {
        (**self).provide(request, scope).await
    }
}

/// Provider backed by an async closure. Created by [`provider_fn`].
pub struct FnProvider<F> {
    f: F,
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Provider for FnProvider<F>
where
    F: Fn(RequestContext, ResolutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Resolution> + Send + 'static,
{
    async fn provide(&self, request: &RequestContext, scope: &ResolutionContext) -> Resolution {
        (self.f)(request.clone(), scope.clone()).await
    }
}

/// Wraps an async closure as a provider.
///
/// The closure receives owned copies of the request and the scope so the
/// returned future can be `'static`.
///
/// ```rust
/// use sigroute_core::Resolution;
/// use sigroute_resolve::provider_fn;
///
/// let tenant = provider_fn(|request, _scope| async move {
///     Resolution::from_option(request.header("x-tenant").map(str::to_string))
/// });
/// # let _ = tenant;
/// ```
pub fn provider_fn<F, Fut>(f: F) -> FnProvider<F>
where
    F: Fn(RequestContext, ResolutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Resolution> + Send + 'static,
{
    FnProvider { f }
}

/// Provider backed by a synchronous closure. Created by [`sync_provider`].
pub struct SyncProvider<F> {
    f: F,
}

impl<F> fmt::Debug for SyncProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Provider for SyncProvider<F>
where
    F: Fn(&RequestContext, &ResolutionContext) -> Resolution + Send + Sync,
{
    async fn provide(&self, request: &RequestContext, scope: &ResolutionContext) -> Resolution {
        (self.f)(request, scope)
    }
}

/// Wraps a synchronous closure as a provider.
///
/// ```rust
/// use sigroute_core::Resolution;
/// use sigroute_resolve::sync_provider;
///
/// #[derive(Debug)]
/// struct Account { owner: String }
///
/// // Derived from a value captured further up the chain.
/// let owner = sync_provider(|_request, scope| {
///     Resolution::from_option(scope.captured::<Account>("Account").map(|a| a.owner.clone()))
/// });
/// # let _ = owner;
/// ```
pub fn sync_provider<F>(f: F) -> SyncProvider<F>
where
    F: Fn(&RequestContext, &ResolutionContext) -> Resolution + Send + Sync,
{
    SyncProvider { f }
}

/// Provider that parses a path parameter and looks the key up.
///
/// - missing or unparseable parameter: `NotFound`
/// - `Ok(Some(value))`: `Resolved`
/// - `Ok(None)`: `NotFound`
/// - `Err(e)`: `Error`
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use sigroute_resolve::lookup;
///
/// #[derive(Debug, Clone)]
/// struct User { id: u64 }
///
/// let users = Arc::new(HashMap::from([(42_u64, User { id: 42 })]));
/// let find_user = lookup("id", move |id: u64| {
///     let users = Arc::clone(&users);
///     async move { Ok::<_, std::io::Error>(users.get(&id).cloned()) }
/// });
/// # let _ = find_user;
/// ```
pub fn lookup<K, T, E, F, Fut>(param: &'static str, f: F) -> impl Provider
where
    K: FromStr + Send + 'static,
    T: Send + Sync + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
{
    provider_fn(move |request: RequestContext, _scope: ResolutionContext| {
        let pending = request
            .path_param(param)
            .and_then(|raw| raw.parse::<K>().ok())
            .map(&f);
        async move {
            let Some(pending) = pending else {
                return Resolution::NotFound;
            };
            match pending.await {
                Ok(found) => Resolution::from_option(found),
                Err(e) => Resolution::Error(ResolutionError::failed(e)),
            }
        }
    })
}
