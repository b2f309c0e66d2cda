//! Request dispatch for sigroute.
//!
//! The [`Dispatcher`] takes an `http::Request<Bytes>` and produces an
//! `http::Response<Bytes>`:
//!
//! 1. enumerate the candidate chains whose patterns match the path
//! 2. order them (most captures first, then declaration order)
//! 3. evaluate each chain root to endpoint until one is admitted
//! 4. invoke the endpoint's handler, or the not-found handler when every
//!    candidate was rejected
//!
//! Errors leave as JSON error envelopes carrying the request id.

mod candidate;
mod dispatcher;
mod handler;
mod response;

pub use candidate::{match_candidates, Candidate, CandidateSet, Step};
pub use dispatcher::{DispatchState, Dispatcher, DispatcherBuilder};
pub use handler::{
    not_found_handler, BoxedHandlerResult, ErasedHandler, HandlerRegistry, NotFoundHandler,
};
pub use response::{error_response, json_response};
