//! Resolution results and per-request resolution state.
//!
//! - [`Value`] - a type-erased, shared capability value
//! - [`Resolution`] - the three-valued outcome of resolving one capability
//! - [`ResolutionContext`] - captures visible to the node being evaluated
//! - [`BoundArgs`] - the arguments of an admitted node, in declared order

use crate::error::{ResolutionError, RouteError};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A resolved capability value.
///
/// Values are reference counted, so binding a captured value into several
/// nodes of a chain never clones the underlying object.
///
/// # Example
///
/// ```
/// use sigroute_core::Value;
///
/// #[derive(Debug, PartialEq)]
/// struct User { id: u64 }
///
/// let value = Value::new(User { id: 42 });
/// assert_eq!(value.downcast_ref::<User>(), Some(&User { id: 42 }));
/// assert!(value.downcast::<String>().is_none());
/// ```
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without cloning it.
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns a shared handle to the value if it is a `T`.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Returns a reference to the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns true if the value is a `T`.
    #[must_use]
    pub fn is<T: Send + Sync + 'static>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Returns the Rust type name of the wrapped value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if both handles point at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Outcome of resolving one capability.
///
/// `NotFound` is expected and drives route fallback. `Error` means the value
/// could not be produced at all and aborts the request.
#[derive(Debug)]
pub enum Resolution {
    /// The capability produced a value.
    Resolved(Value),
    /// The capability has no value for this request.
    NotFound,
    /// Producing the value failed.
    Error(ResolutionError),
}

impl Resolution {
    /// Wraps a value as `Resolved`.
    pub fn resolved<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Resolved(Value::new(value))
    }

    /// `Resolved` for `Some`, `NotFound` for `None`.
    pub fn from_option<T: Send + Sync + 'static>(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::resolved)
    }

    /// Returns true for `Resolved`.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Returns true for `NotFound`.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true for `Error`.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the resolved value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::NotFound => "not_found",
            Self::Error(_) => "error",
        }
    }
}

impl From<ResolutionError> for Resolution {
    fn from(err: ResolutionError) -> Self {
        Self::Error(err)
    }
}

/// A captured value together with the node that produced it.
#[derive(Debug, Clone)]
pub struct Captured {
    /// Capability name.
    pub capability: String,
    /// Name of the route node that captured the value.
    pub origin: String,
    /// The value.
    pub value: Value,
}

/// Position in a [`ResolutionContext`] to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Per-request scope of captured values.
///
/// Captures are pushed in chain order. Lookups search from the newest entry
/// so a node deeper in the chain shadows its ancestors. Rolling back to a
/// checkpoint removes everything captured after it, which is how a rejected
/// node or an abandoned chain loses its captures.
///
/// # Example
///
/// ```
/// use sigroute_core::{ResolutionContext, Value};
///
/// let mut scope = ResolutionContext::new();
/// let mark = scope.checkpoint();
/// scope.capture("User", "find_user", Value::new(42_u64));
/// assert_eq!(scope.captured::<u64>("User").as_deref(), Some(&42));
///
/// scope.rollback(mark);
/// assert!(scope.get("User").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    captures: Vec<Captured>,
}

impl ResolutionContext {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a captured value.
    pub fn capture(&mut self, capability: impl Into<String>, origin: impl Into<String>, value: Value) {
        self.push_capture(Captured {
            capability: capability.into(),
            origin: origin.into(),
            value,
        });
    }

    /// Records a capture entry as-is.
    pub fn push_capture(&mut self, captured: Captured) {
        self.captures.push(captured);
    }

    /// Returns the newest value captured for `capability`.
    #[must_use]
    pub fn get(&self, capability: &str) -> Option<&Value> {
        self.entry(capability).map(|c| &c.value)
    }

    /// Returns the newest capture entry for `capability`.
    #[must_use]
    pub fn entry(&self, capability: &str) -> Option<&Captured> {
        self.captures
            .iter()
            .rev()
            .find(|c| c.capability == capability)
    }

    /// Returns the captured value for `capability` as a `T`.
    #[must_use]
    pub fn captured<T: Send + Sync + 'static>(&self, capability: &str) -> Option<Arc<T>> {
        self.get(capability).and_then(Value::downcast)
    }

    /// Returns true if `capability` has been captured.
    #[must_use]
    pub fn contains(&self, capability: &str) -> bool {
        self.entry(capability).is_some()
    }

    /// Marks the current position.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.captures.len())
    }

    /// Drops every capture made after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.captures.truncate(checkpoint.0);
    }

    /// Returns the captures made after `checkpoint`.
    #[must_use]
    pub fn since(&self, checkpoint: Checkpoint) -> &[Captured] {
        self.captures.get(checkpoint.0..).unwrap_or_default()
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Returns true if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Returns the captures in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = &Captured> {
        self.captures.iter()
    }
}

/// One bound argument.
#[derive(Debug, Clone)]
pub struct BoundArg {
    /// Parameter name.
    pub name: String,
    /// Capability the value came from.
    pub capability: String,
    /// The value; `None` for an optional parameter that was not found.
    pub value: Option<Value>,
}

/// Arguments of an admitted node, in declared order.
///
/// # Example
///
/// ```
/// use sigroute_core::{BoundArgs, Value};
///
/// let mut args = BoundArgs::new();
/// args.bind("user", "User", Some(Value::new(String::from("alice"))));
/// args.bind("tab", "Tab", None);
///
/// assert_eq!(args.get::<String>("user").as_deref().map(String::as_str), Some("alice"));
/// assert!(!args.is_bound("tab"));
/// assert!(args.require::<String>("tab").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    args: Vec<BoundArg>,
}

impl BoundArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    pub fn bind(&mut self, name: impl Into<String>, capability: impl Into<String>, value: Option<Value>) {
        self.args.push(BoundArg {
            name: name.into(),
            capability: capability.into(),
            value,
        });
    }

    /// Returns the raw value bound to `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_ref())
    }

    /// Returns the value bound to `name` as a `T`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.value(name).and_then(Value::downcast)
    }

    /// Returns the value bound to `name` as a `T`, or an internal error.
    ///
    /// Handlers use this for required parameters, which are always bound
    /// once a node is admitted; an error here means the handler asked for
    /// the wrong name or type.
    pub fn require<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RouteError> {
        let value = self
            .value(name)
            .ok_or_else(|| RouteError::internal(format!("argument '{name}' is not bound")))?;
        value.downcast::<T>().ok_or_else(|| {
            RouteError::internal(format!(
                "argument '{name}' holds {}, not {}",
                value.type_name(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// Returns true if `name` is bound to a value.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Returns the arguments in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &BoundArg> {
        self.args.iter()
    }

    /// Returns the parameter names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|a| a.name.as_str())
    }

    /// Returns the number of arguments, bound or empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
