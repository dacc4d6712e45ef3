//! Testing utilities for Trellis applications.
//!
//! - **TestApp** - router plus container, built for a test
//! - **TestClient** - sends requests through `Router::handle`
//! - **TestContainer** - a child scope with mock overrides
//! - **MockService** - call recording
//! - **Assertions** - response status, header and body checks
//!
//! ## Quick Start
//!
//! ```
//! use trellis_core::{Route, RouteParams};
//! use trellis_testing::*;
//!
//! # tokio_test::block_on(async {
//! let app = TestAppBuilder::new()
//!     .with_route(Route::get("/hello/{name}", |params: RouteParams| async move {
//!         format!("Hello, {}!", params.get("name").unwrap_or("world"))
//!     }))
//!     .unwrap()
//!     .build();
//!
//! let response = app.client().get("/hello/ada").await;
//! assert_status(&response, 200);
//! assert_eq!(response.body_string(), "Hello, ada!");
//! # });
//! ```
//!
//! ## Mocking Services
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{Container, Route};
//! use trellis_testing::*;
//!
//! struct Clock(u64);
//!
//! # tokio_test::block_on(async {
//! let app = TestAppBuilder::new()
//!     .register(|c: &Container| c.singleton(|| Clock(1_700_000_000)))
//!     .with_route(Route::get("/now", |clock: Arc<Clock>| async move { clock.0.to_string() }))
//!     .unwrap()
//!     .build();
//!
//! app.container().mock(Clock(42));
//! let response = app.client().get("/now").await;
//! assert_eq!(response.body_string(), "42");
//! # });
//! ```

mod assertions;
mod mock;
mod test_app;
mod test_client;
mod test_container;

pub use assertions::{
    assert_body_contains, assert_client_error, assert_header, assert_http_status, assert_json,
    assert_json_content_type, assert_server_error, assert_status, assert_success,
};
pub use mock::MockService;
pub use test_app::{TestApp, TestAppBuilder};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
pub use test_container::TestContainer;
