//! Error types for sigroute.
//!
//! Three failure families exist and never mix:
//!
//! | Type | When | Handling |
//! |---|---|---|
//! | `Resolution::NotFound` | request time, expected | try the next candidate route |
//! | [`ResolutionError`] | request time, unexpected | abort the request, 500 response |
//! | [`SignatureError`] | build time | refuse to start |
//!
//! [`RouteError`] is the request-level error surfaced by the dispatcher and
//! returned by handlers. It maps to an HTTP status and serializes into an
//! [`ErrorEnvelope`].
//!
//! [`Resolution`]: crate::Resolution

use http::StatusCode;
use serde::{Deserialize, Serialize};
use sigroute_router::PatternError;
use thiserror::Error;

/// Result type alias using [`RouteError`].
pub type RouteResult<T> = Result<T, RouteError>;

/// Failure while producing a capability value.
///
/// Distinct from "not found": a provider that cannot reach its backing store
/// returns this, and the dispatcher aborts the request instead of trying
/// another route.
#[derive(Debug, Error)]
#[error("failed to resolve capability '{capability}': {message}")]
pub struct ResolutionError {
    /// The capability being resolved.
    pub capability: String,
    /// Human-readable error message.
    pub message: String,
    /// The underlying error (not exposed to clients).
    #[source]
    pub source: Option<anyhow::Error>,
}

impl ResolutionError {
    /// Creates a resolution error with a message.
    #[must_use]
    pub fn new(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a resolution error wrapping an underlying error.
    pub fn with_source(
        capability: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            capability: capability.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates the error raised when no provider is registered.
    #[must_use]
    pub fn no_provider(capability: impl Into<String>) -> Self {
        Self::new(capability, "no provider registered")
    }

    /// Wraps a failure raised inside a provider.
    ///
    /// Providers do not know which capability they were registered under; the
    /// resolver fills it in with [`attribute`](Self::attribute).
    pub fn failed(source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        Self {
            capability: String::new(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Sets the capability if it is still unset.
    #[must_use]
    pub fn attribute(mut self, capability: &str) -> Self {
        if self.capability.is_empty() {
            self.capability = capability.to_string();
        }
        self
    }
}

/// Malformed signature or route tree, detected while building.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// A parameter with an empty name.
    #[error("parameter at position {position} has an empty name")]
    EmptyParameterName {
        /// Zero-based position in the signature.
        position: usize,
    },

    /// A parameter with an empty capability.
    #[error("parameter '{parameter}' has an empty capability")]
    EmptyCapability {
        /// The parameter name.
        parameter: String,
    },

    /// Two parameters with the same name in one signature.
    #[error("parameter '{parameter}' is declared more than once")]
    DuplicateParameter {
        /// The repeated parameter name.
        parameter: String,
    },

    /// A parameter marked both `Capture` and `Optional`.
    #[error("parameter '{parameter}' cannot be both Capture and Optional")]
    CaptureAndOptional {
        /// The parameter name.
        parameter: String,
    },

    /// A route node with an empty name.
    #[error("route node at position {position} has an empty name")]
    EmptyNodeName {
        /// Zero-based declaration position.
        position: usize,
    },

    /// Two route nodes with the same name.
    #[error("route node '{node}' is declared more than once")]
    DuplicateNode {
        /// The repeated node name.
        node: String,
    },

    /// A route node chained to a parent that was not declared before it.
    #[error("route node '{node}' is chained to unknown parent '{parent}'")]
    UnknownParent {
        /// The child node.
        node: String,
        /// The missing parent.
        parent: String,
    },

    /// A route node pattern that does not parse.
    #[error("route node '{node}' has an invalid pattern")]
    Pattern {
        /// The node name.
        node: String,
        /// The parse failure.
        #[source]
        source: PatternError,
    },

    /// A wildcard node with children; the wildcard already consumed the path.
    #[error("route node '{node}' ends in a wildcard and cannot have children")]
    WildcardWithChildren {
        /// The node name.
        node: String,
    },

    /// A path parameter already bound by an ancestor node.
    #[error("route node '{node}' rebinds path parameter '{name}'")]
    DuplicatePathParam {
        /// The node name.
        node: String,
        /// The parameter name.
        name: String,
    },

    /// A method restriction on a node that has no action.
    #[error("route node '{node}' restricts methods but has no action")]
    MethodsWithoutAction {
        /// The node name.
        node: String,
    },

    /// A node with neither an action nor children.
    #[error("route node '{node}' has no action and no children")]
    DeadEnd {
        /// The node name.
        node: String,
    },

    /// A capability with neither a provider nor an ancestor capture.
    #[error(
        "parameter '{parameter}' of route node '{node}' needs capability '{capability}', \
         which has no provider and is not captured by an ancestor"
    )]
    UnresolvableCapability {
        /// The node name.
        node: String,
        /// The parameter name.
        parameter: String,
        /// The capability name.
        capability: String,
    },

    /// An action without a registered handler.
    #[error("route node '{node}' invokes action '{action}', which has no handler")]
    UnknownAction {
        /// The node name.
        node: String,
        /// The action (operation id).
        action: String,
    },
}

/// Categories of request-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid input detected by a handler.
    Validation,
    /// No route admitted the request, or a handler found nothing.
    NotFound,
    /// The path matched but not with this method.
    MethodNotAllowed,
    /// Conflict (e.g., concurrent modification).
    Conflict,
    /// Internal server error.
    Internal,
    /// A capability provider failed.
    Resolution,
    /// The request exceeded its deadline.
    Timeout,
    /// The request was cancelled before completing.
    Cancelled,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal | Self::Resolution => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the snake_case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::Resolution => "resolution",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Request-level error.
///
/// # Example
///
/// ```
/// use sigroute_core::{ErrorCategory, RouteError};
///
/// let err = RouteError::not_found_resource("User", "999");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
pub enum RouteError {
    /// Invalid input.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// Nothing to serve.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The type of resource that was not found.
        resource_type: Option<String>,
        /// The identifier of the resource.
        resource_id: Option<String>,
    },

    /// Path matched, method did not.
    #[error("Method not allowed: {message}")]
    MethodNotAllowed {
        /// Human-readable error message.
        message: String,
        /// Methods the path does accept.
        allowed: Vec<String>,
    },

    /// Conflict error.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A capability provider failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Request deadline exceeded.
    #[error("Timeout: {message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Request cancelled.
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Human-readable error message.
        message: String,
    },
}

impl RouteError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
        }
    }

    /// Creates a not found error with resource context.
    #[must_use]
    pub fn not_found_resource(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} with ID '{resource_id}' not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
        }
    }

    /// Creates a method not allowed error.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method, allowed: Vec<String>) -> Self {
        Self::MethodNotAllowed {
            message: format!("{method} is not supported for this path"),
            allowed,
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::Resolution(_) => ErrorCategory::Resolution,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// Server-side failures keep their sources out of the envelope; only the
    /// top-level message is exposed.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.client_message(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::NotFound { message, .. }
            | Self::MethodNotAllowed { message, .. }
            | Self::Conflict { message }
            | Self::Internal { message, .. }
            | Self::Timeout { message }
            | Self::Cancelled { message } => message.clone(),
            Self::Resolution(err) => {
                format!("failed to resolve capability '{}'", err.capability)
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::Resolution(_) => "RESOLUTION_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Cancelled { .. } => "CANCELLED",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound {
                resource_type: Some(rt),
                resource_id: Some(rid),
                ..
            } => Some(serde_json::json!({
                "resource_type": rt,
                "resource_id": rid
            })),
            Self::MethodNotAllowed { allowed, .. } => Some(serde_json::json!({
                "allowed": allowed
            })),
            Self::Resolution(err) => Some(serde_json::json!({
                "capability": err.capability
            })),
            _ => None,
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
