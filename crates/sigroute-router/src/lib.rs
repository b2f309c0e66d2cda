//! Path patterns and parameters for sigroute chained routes.
//!
//! A chained route is a sequence of nodes, each owning a pattern fragment.
//! This crate provides the pieces used to match those fragments against a
//! request path:
//!
//! - [`Pattern`] - a parsed fragment (`user/{id}`, `edit`, `files/*path`)
//! - [`Params`] - parameters bound while matching, with truncation on backtrack
//! - [`MethodSet`] - the HTTP methods a node accepts
//!
//! # Example
//!
//! ```rust
//! use sigroute_router::{split_path, Params, Pattern};
//!
//! // find_user -> edit
//! let chain = [
//!     Pattern::parse("user/{id}").unwrap(),
//!     Pattern::parse("edit").unwrap(),
//! ];
//!
//! let path = split_path("/user/42/edit");
//! let mut params = Params::new();
//! let mut offset = 0;
//! for pattern in &chain {
//!     offset = pattern.match_at(&path, offset, &mut params).unwrap();
//! }
//!
//! assert_eq!(offset, path.len());
//! assert_eq!(params.get("id"), Some("42"));
//! ```
//!
//! # Segment priority
//!
//! Patterns do not compete with each other here. Ordering between chains
//! that match the same path is decided by the dispatcher.

mod methods;
mod params;
mod pattern;

pub use methods::MethodSet;
pub use params::Params;
pub use pattern::{split_path, Pattern, PatternError, Segment, SegmentKind};
