//! Route groups for organizing routes with shared configuration
//!
//! A group applies to every route registered inside it:
//! - a path prefix
//! - a route name prefix, joined with `.`
//! - middleware, prepended to the route's own
//!
//! Groups nest; the inner group inherits the outer configuration.
//!
//! # Examples
//!
//! ```ignore
//! router.group(RouteGroup::new().prefix("/admin").name("admin"), |r| {
//!     r.add(Route::get("/users", list_users).name("users"))?; // admin.users
//!     Ok(())
//! })?;
//! ```

use crate::middleware::MiddlewareRef;

/// Route group configuration
#[derive(Debug, Clone, Default)]
pub struct RouteGroup {
    /// Path prefix for all routes in this group
    prefix: String,

    /// Name prefix for named routes in this group
    name: Option<String>,

    /// Middleware to apply to all routes
    middleware: Vec<MiddlewareRef>,
}

impl RouteGroup {
    /// Create a new route group
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path prefix for this group
    ///
    /// All routes added to this group will have this prefix prepended.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        // Leading slash, no trailing slash
        let prefix = if !prefix.starts_with('/') {
            format!("/{}", prefix)
        } else {
            prefix
        };
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Set the name prefix for named routes in this group
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim_end_matches('.');
        self.name = (!name.is_empty()).then(|| name.to_string());
        self
    }

    /// Add middleware to this group
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Add multiple middleware to this group
    pub fn with_middleware(mut self, middleware: Vec<MiddlewareRef>) -> Self {
        self.middleware.extend(middleware);
        self
    }

    /// Get the prefix for this group
    pub fn get_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get all middleware for this group
    pub fn get_middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Apply the group's prefix to a path
    pub fn apply_prefix(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            let path = path.trim_start_matches('/');
            if path.is_empty() {
                self.prefix.clone()
            } else {
                format!("{}/{}", self.prefix, path)
            }
        }
    }

    /// Apply the group's name prefix to a route name
    pub fn apply_name(&self, name: Option<&str>) -> Option<String> {
        match (&self.name, name) {
            (Some(prefix), Some(name)) => Some(format!("{}.{}", prefix, name)),
            (None, Some(name)) => Some(name.to_string()),
            (_, None) => None,
        }
    }

    /// Combine this group with a parent group
    ///
    /// Prefixes and names are joined, parent middleware runs first.
    pub fn with_parent(self, parent: &RouteGroup) -> Self {
        let prefix = if self.prefix.is_empty() {
            parent.prefix.clone()
        } else {
            parent.apply_prefix(&self.prefix)
        };
        let name = match self.name.as_deref() {
            Some(name) => parent.apply_name(Some(name)),
            None => parent.name.clone(),
        };
        let mut middleware = parent.middleware.clone();
        middleware.extend(self.middleware);

        Self {
            prefix,
            name,
            middleware,
        }
    }
}
