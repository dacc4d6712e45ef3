// Routing: route definitions, matching trie, groups and the router

mod group;
mod route;
mod router;
mod trie;

pub use group::RouteGroup;
pub use route::{Endpoint, EndpointMarker, IntoEndpoint, Route};
pub use router::{Router, RouterConfig};
pub use trie::{RouteMatch, RouteTrie};
