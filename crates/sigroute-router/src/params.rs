//! Path parameter storage.
//!
//! Parameters bound while matching a chain of route patterns. Uses a
//! small-vector so the common case (1-4 parameters) stays on the stack.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Path parameters bound by a route chain.
///
/// Parameters are stored as (name, value) pairs in the order the chain bound
/// them. Matching a chain pushes parameters segment by segment and truncates
/// back to a mark when a branch fails, so the set never holds values from an
/// abandoned branch.
///
/// # Example
///
/// ```rust
/// use sigroute_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "42");
///
/// let mark = params.len();
/// params.push("action", "edit");
/// params.truncate(mark);
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("action"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter to the set.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    ///
    /// When a name was bound more than once the most recent binding wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a parameter with this name is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Drops every parameter bound after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Returns an iterator over the parameters in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
