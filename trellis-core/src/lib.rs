//! Core library for the Trellis framework.
//!
//! Dependency injection container, route trie, router and middleware
//! pipeline. Handlers and factories declare their dependencies as
//! parameters:
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{Container, HttpRequest, RouteParams, Router};
//!
//! struct Greeter(&'static str);
//!
//! # tokio_test::block_on(async {
//! let container = Container::new();
//! container.singleton(|| Greeter("Hello"));
//!
//! let mut router = Router::new();
//! router
//!     .get("/hello/{name}", |params: RouteParams, greeter: Arc<Greeter>| async move {
//!         format!("{}, {}!", greeter.0, params.get("name").unwrap_or("world"))
//!     })
//!     .unwrap();
//!
//! let response = router.handle(&container, HttpRequest::new("GET", "/hello/ada")).await;
//! assert_eq!(response.body_str(), "Hello, ada!");
//! # });
//! ```

pub mod container;
pub mod error;
pub mod exception;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod route_registry;
pub mod routing;
pub mod status;

// Used by the route attribute macros and the Injectable derive
#[doc(hidden)]
pub use async_trait::async_trait;
pub use inventory;

// Re-export commonly used types
pub use container::*;
pub use error::*;
pub use exception::{DefaultExceptionHandler, ExceptionHandler};
pub use http::*;
pub use middleware::{FnMiddleware, Middleware, MiddlewareRef, Next, from_fn};
pub use pipeline::{PendingPipeline, Pipeline};
pub use route_registry::RouteEntry;
pub use routing::*;
pub use status::*;
