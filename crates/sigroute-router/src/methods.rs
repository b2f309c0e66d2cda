//! HTTP method filters.
//!
//! A route node may restrict which HTTP methods it serves. [`MethodSet`]
//! holds that restriction; an unrestricted set accepts every method.

use http::Method;

/// The HTTP methods a route node accepts.
///
/// # Example
///
/// ```rust
/// use sigroute_router::MethodSet;
/// use http::Method;
///
/// let methods = MethodSet::new().get().post();
///
/// assert!(methods.allows(&Method::GET));
/// assert!(methods.allows(&Method::POST));
/// assert!(!methods.allows(&Method::DELETE));
/// assert!(MethodSet::any().allows(&Method::DELETE));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    /// `None` accepts every method.
    allowed: Option<Vec<Method>>,
}

impl MethodSet {
    /// Creates an unrestricted method set.
    #[must_use]
    pub fn any() -> Self {
        Self { allowed: None }
    }

    /// Creates an empty restricted set. Add methods with the builder calls.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed: Some(Vec::new()),
        }
    }

    /// Creates a set holding exactly the given methods.
    #[must_use]
    pub fn only(methods: impl IntoIterator<Item = Method>) -> Self {
        methods.into_iter().fold(Self::new(), Self::method)
    }

    /// Adds a method to a restricted set. No-op on an unrestricted set.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        if let Some(allowed) = &mut self.allowed {
            if !allowed.contains(&method) {
                allowed.push(method);
            }
        }
        self
    }

    /// Adds GET.
    #[must_use]
    pub fn get(self) -> Self {
        self.method(Method::GET)
    }

    /// Adds POST.
    #[must_use]
    pub fn post(self) -> Self {
        self.method(Method::POST)
    }

    /// Adds PUT.
    #[must_use]
    pub fn put(self) -> Self {
        self.method(Method::PUT)
    }

    /// Adds PATCH.
    #[must_use]
    pub fn patch(self) -> Self {
        self.method(Method::PATCH)
    }

    /// Adds DELETE.
    #[must_use]
    pub fn delete(self) -> Self {
        self.method(Method::DELETE)
    }

    /// Returns true if `method` is accepted.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        match &self.allowed {
            None => true,
            Some(allowed) => allowed.contains(method),
        }
    }

    /// Returns true if every method is accepted.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.allowed.is_none()
    }

    /// Returns the accepted methods, or `None` for an unrestricted set.
    #[must_use]
    pub fn allowed(&self) -> Option<&[Method]> {
        self.allowed.as_deref()
    }
}
