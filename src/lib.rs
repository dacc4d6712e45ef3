// Trellis - a dependency injection container with a routing trie and
// middleware pipeline for async Rust services.
//
// Route handlers and factories declare what they need as parameters; the
// container resolves them per request scope and tears the scope down when
// the response is produced.

// Re-export core functionality
pub use trellis_core::*;

// Re-export procedural macros
pub use trellis_macro::{Injectable, any, delete, get, head, options, patch, post, put};

#[cfg(feature = "config")]
pub use trellis_config as config;

#[cfg(feature = "testing")]
pub use trellis_testing as testing;

pub use serde;
pub use serde_json;
pub use tokio;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Container, Endpoint, Error, HttpMethod, HttpRequest, HttpResponse, Injectable, Json,
        Lifetime, Middleware, Named, Next, Param, Result, Route, RouteGroup, RouteParams, Router,
        RouterConfig, ScopedContainer, delete, get, patch, post, put,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{ConfigBuilder, ConfigManager};
}
