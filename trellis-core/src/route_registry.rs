//! Route registry for compile-time route collection using inventory
//!
//! The route attribute macros (`#[get]`, `#[post]`, ...) submit a
//! [`RouteEntry`] per handler. [`Router::discover`] walks the entries and
//! registers each route.

use crate::Result;
use crate::routing::Router;

/// Registers one route on a router.
pub type RegisterFn = fn(&mut Router) -> Result<()>;

/// A route entry collected via inventory
pub struct RouteEntry {
    /// HTTP method (GET, POST, etc.)
    pub method: &'static str,
    /// Route pattern (e.g., "/users/{id}")
    pub path: &'static str,
    /// Handler function name (for debugging)
    pub handler_name: &'static str,
    pub register: RegisterFn,
}

inventory::collect!(RouteEntry);

impl RouteEntry {
    pub const fn new(
        method: &'static str,
        path: &'static str,
        handler_name: &'static str,
        register: RegisterFn,
    ) -> Self {
        Self {
            method,
            path,
            handler_name,
            register,
        }
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_name", &self.handler_name)
            .finish()
    }
}

/// Every route submitted in the final binary, sorted by path, then method,
/// then handler name. Link order is not stable, so equal-priority dynamic
/// routes rely on this order for their tie-break.
pub fn registered_routes() -> impl Iterator<Item = &'static RouteEntry> {
    let mut entries: Vec<&'static RouteEntry> = inventory::iter::<RouteEntry>.into_iter().collect();
    entries.sort_by_key(|e| (e.path, e.method, e.handler_name));
    entries.into_iter()
}

/// Submit a route registration to the inventory.
///
/// Used by the route attribute macros; also usable by hand:
///
/// ```ignore
/// fn register_health(router: &mut Router) -> Result<()> {
///     router.get("/health", health)?;
///     Ok(())
/// }
/// register_route!("GET", "/health", "health", register_health);
/// ```
#[macro_export]
macro_rules! register_route {
    ($method:expr, $path:expr, $handler_name:expr, $register:path) => {
        $crate::inventory::submit! {
            $crate::route_registry::RouteEntry::new($method, $path, $handler_name, $register)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ping() -> &'static str {
        "pong"
    }

    fn register_ping(router: &mut Router) -> Result<()> {
        router.get("/registry/ping", ping)?;
        Ok(())
    }

    crate::register_route!("GET", "/registry/ping", "ping", register_ping);

    fn register_nothing(_router: &mut Router) -> Result<()> {
        Ok(())
    }

    crate::register_route!("POST", "/registry/order/b", "order_b", register_nothing);
    crate::register_route!("GET", "/registry/order/b", "order_b_get", register_nothing);
    crate::register_route!("GET", "/registry/order/a", "order_a", register_nothing);

    #[test]
    fn test_registered_route_is_collected() {
        let entry = registered_routes()
            .find(|e| e.path == "/registry/ping")
            .unwrap();
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.handler_name, "ping");
    }

    #[test]
    fn test_registered_routes_are_sorted() {
        let order: Vec<(&str, &str)> = registered_routes()
            .filter(|e| e.path.starts_with("/registry/order/"))
            .map(|e| (e.path, e.method))
            .collect();
        assert_eq!(
            order,
            vec![
                ("/registry/order/a", "GET"),
                ("/registry/order/b", "GET"),
                ("/registry/order/b", "POST"),
            ]
        );

        let all: Vec<_> = registered_routes().map(|e| (e.path, e.method)).collect();
        assert!(all.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_discover_registers_collected_routes() {
        let mut router = Router::new();
        router.discover().unwrap();
        assert!(router.find("GET", "/registry/ping").is_ok());
    }
}
