//! Test utilities for sigroute.
//!
//! Dispatch requests in memory and assert on the responses:
//!
//! - [`TestClient`] wraps a built [`Dispatcher`](sigroute_dispatch::Dispatcher)
//! - [`TestRequest`] builds `http::Request<Bytes>` values
//! - [`TestResponse`] exposes the status, headers and body with `assert_*`
//!   helpers that chain
//!
//! ```
//! use sigroute_core::{RouteDef, RouteTree, RouteError};
//! use sigroute_dispatch::Dispatcher;
//! use sigroute_test::TestClient;
//!
//! let tree = RouteTree::builder()
//!     .route(RouteDef::new("hello", "hello/{name}").action("hello"))
//!     .build()
//!     .unwrap();
//! let client = TestClient::new(
//!     Dispatcher::builder(tree)
//!         .handler("hello", |request, _args| async move {
//!             Ok::<_, RouteError>(format!("hello {}", request.path_param("name").unwrap_or("?")))
//!         })
//!         .build()
//!         .unwrap(),
//! );
//!
//! tokio_test::block_on(async {
//!     client
//!         .get("/hello/ada")
//!         .send()
//!         .await
//!         .assert_success()
//!         .assert_body_contains("hello ada");
//!     client.get("/bye").send().await.assert_error_code("NOT_FOUND");
//! });
//! ```

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequest;
pub use response::TestResponse;
