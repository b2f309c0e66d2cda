//! Route admission.
//!
//! A node is admitted when every required parameter of its signature
//! resolves. Parameters are resolved one at a time in declared order, so a
//! provider can rely on the captures of earlier parameters of the same node.

use std::fmt;

use sigroute_core::{
    BoundArgs, CancelSignal, Captured, RequestContext, Resolution, ResolutionContext, RouteError,
    RouteNode,
};
use sigroute_telemetry::record_rejection;

use crate::capture::CapturePropagator;
use crate::resolver::DependencyResolver;

/// Why a node was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Name of the rejected node.
    pub node: String,
    /// The required parameter that did not resolve.
    pub parameter: String,
    /// Its capability.
    pub capability: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node '{}' rejected: no {} for parameter '{}'",
            self.node, self.capability, self.parameter
        )
    }
}

/// Outcome of evaluating one node.
#[derive(Debug)]
pub enum Admission {
    /// Every required parameter resolved.
    Admitted {
        /// The node's arguments in declared order.
        args: BoundArgs,
        /// Values the node captured, already written to the scope.
        captures: Vec<Captured>,
    },
    /// A required parameter was not found. The scope is left untouched.
    Rejected(Rejection),
}

impl Admission {
    /// Returns true for `Admitted`.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Returns the bound arguments of an admitted node.
    #[must_use]
    pub fn args(&self) -> Option<&BoundArgs> {
        match self {
            Self::Admitted { args, .. } => Some(args),
            Self::Rejected(_) => None,
        }
    }
}

/// Evaluates a node's signature against a request.
#[derive(Debug, Clone)]
pub struct AdmissionEvaluator {
    resolver: DependencyResolver,
}

impl AdmissionEvaluator {
    /// Creates an evaluator backed by `resolver`.
    pub fn new(resolver: DependencyResolver) -> Self {
        Self { resolver }
    }

    /// Returns the resolver.
    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Evaluates `node` for `request`.
    ///
    /// On admission the node's captures stay in `scope`. On rejection or error
    /// the scope is rolled back to where it was.
    ///
    /// # Errors
    ///
    /// - `RouteError::Resolution` when a provider fails
    /// - `RouteError::Cancelled` when `cancel` fires before evaluation ends;
    ///   the in-flight provider future is dropped
    pub async fn evaluate(
        &self,
        node: &RouteNode,
        request: &RequestContext,
        scope: &mut ResolutionContext,
        cancel: &CancelSignal,
    ) -> Result<Admission, RouteError> {
        let mut frame = CapturePropagator::enter(scope, node.name());
        let mut args = BoundArgs::new();

        for spec in node.signature().iter() {
            let resolution = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(
                        node = %node.name(),
                        capability = %spec.capability(),
                        "cancelled during resolution"
                    );
                    return Err(RouteError::cancelled(format!(
                        "request cancelled while resolving '{}'",
                        spec.capability()
                    )));
                }
                resolution = self.resolver.resolve(spec.capability(), request, frame.scope()) => resolution,
            };

            match resolution {
                Resolution::Resolved(value) => {
                    frame.propagate(spec, &value);
                    args.bind(spec.name(), spec.capability(), Some(value));
                }
                Resolution::NotFound if spec.is_optional() => {
                    args.bind(spec.name(), spec.capability(), None);
                }
                Resolution::NotFound => {
                    tracing::debug!(
                        node = %node.name(),
                        parameter = %spec.name(),
                        capability = %spec.capability(),
                        "node rejected"
                    );
                    record_rejection(node.name());
                    frame.reject();
                    return Ok(Admission::Rejected(Rejection {
                        node: node.name().to_string(),
                        parameter: spec.name().to_string(),
                        capability: spec.capability().to_string(),
                    }));
                }
                Resolution::Error(e) => return Err(e.into()),
            }
        }

        let captures = frame.commit();
        tracing::debug!(
            node = %node.name(),
            args = args.len(),
            captures = captures.len(),
            "node admitted"
        );
        Ok(Admission::Admitted { args, captures })
    }
}
