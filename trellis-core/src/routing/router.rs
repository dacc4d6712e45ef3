// Route registration and request dispatch

use super::group::RouteGroup;
use super::route::{IntoEndpoint, Route};
use super::trie::{RouteMatch, RouteTrie};
use crate::container::{Arguments, Container, Resolver};
use crate::exception::{DefaultExceptionHandler, ExceptionHandler};
use crate::logging::{debug, info};
use crate::middleware::MiddlewareRef;
use crate::pipeline::Pipeline;
use crate::route_registry::registered_routes;
use crate::{HttpRequest, HttpResponse, Result};
use std::sync::Arc;

/// Router behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Render error messages instead of generic reason phrases.
    pub debug: bool,
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Registers routes and dispatches requests to them.
///
/// ```ignore
/// let mut router = Router::new();
/// router.get("/users/{id:\\d+}", show_user)?;
/// router.group(RouteGroup::new().prefix("/admin"), |r| {
///     r.post("/users", create_user)?;
///     Ok(())
/// })?;
///
/// let response = router.handle(&container, HttpRequest::new("GET", "/users/7")).await;
/// ```
#[derive(Default)]
pub struct Router {
    trie: RouteTrie,
    middleware: Vec<MiddlewareRef>,
    groups: Vec<RouteGroup>,
    config: RouterConfig,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Add global middleware, run for every request before route lookup
    /// results are acted on (including 404 and 405 responses).
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Use `handler` instead of the container's `dyn ExceptionHandler`.
    pub fn exception_handler(&mut self, handler: Arc<dyn ExceptionHandler>) -> &mut Self {
        self.exception_handler = Some(handler);
        self
    }

    // ========== Registration ==========

    /// Register a route, applying the enclosing groups.
    pub fn add(&mut self, mut route: Route) -> Result<&mut Self> {
        if let Some(group) = self.groups.last() {
            route.set_path(group.apply_prefix(route.path()));
            route.set_name(group.apply_name(route.get_name()));
            route.prepend_middleware(group.get_middleware());
        }
        debug!(
            methods = ?route.methods(),
            path = route.path(),
            name = ?route.get_name(),
            "Registering route"
        );
        self.trie.insert(route)?;
        Ok(self)
    }

    pub fn route<Args, E, M>(&mut self, methods: impl IntoIterator<Item = M>, path: &str, endpoint: E) -> Result<&mut Self>
    where
        E: IntoEndpoint<Args>,
        M: AsRef<str>,
    {
        self.add(Route::new(methods, path, endpoint))
    }

    pub fn get<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["GET"], path, endpoint)
    }

    pub fn post<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["POST"], path, endpoint)
    }

    pub fn put<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["PUT"], path, endpoint)
    }

    pub fn patch<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["PATCH"], path, endpoint)
    }

    pub fn delete<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["DELETE"], path, endpoint)
    }

    pub fn head<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["HEAD"], path, endpoint)
    }

    pub fn options<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["OPTIONS"], path, endpoint)
    }

    /// Register for every method.
    pub fn any<Args, E: IntoEndpoint<Args>>(&mut self, path: &str, endpoint: E) -> Result<&mut Self> {
        self.route(["*"], path, endpoint)
    }

    /// Register the routes added by `f` inside `group`.
    pub fn group<F>(&mut self, group: RouteGroup, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Router) -> Result<()>,
    {
        let group = match self.groups.last() {
            Some(parent) => group.with_parent(parent),
            None => group,
        };
        self.groups.push(group);
        let outcome = f(self);
        self.groups.pop();
        outcome?;
        Ok(self)
    }

    /// Register every route declared with the route attribute macros.
    pub fn discover(&mut self) -> Result<&mut Self> {
        let mut count = 0usize;
        for entry in registered_routes() {
            debug!(
                method = entry.method,
                path = entry.path,
                handler = entry.handler_name,
                "Discovered route"
            );
            (entry.register)(self)?;
            count += 1;
        }
        info!(routes = count, "Route discovery complete");
        Ok(self)
    }

    // ========== Lookup ==========

    pub fn find(&self, method: &str, path: &str) -> Result<RouteMatch> {
        self.trie.find(method, path)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Route> {
        self.trie.find_by_name(name)
    }

    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        self.trie.url_for(name, params)
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        self.trie.routes()
    }

    // ========== Dispatch ==========

    async fn resolve_exception_handler(&self, container: &Container) -> Arc<dyn ExceptionHandler> {
        if let Some(handler) = &self.exception_handler {
            return handler.clone();
        }
        match container.try_make::<dyn ExceptionHandler>().await {
            Ok(Some(handler)) => handler,
            _ => Arc::new(DefaultExceptionHandler::new(self.config.debug)),
        }
    }

    /// Dispatch `request` in a fresh scope of `container`.
    ///
    /// Global middleware wrap the route lookup result, route middleware
    /// wrap the endpoint. Errors and panics become error responses. The
    /// scope is terminated before returning, and also when the returned
    /// future is dropped early.
    pub async fn handle(&self, container: &Container, mut request: HttpRequest) -> HttpResponse {
        debug!(method = %request.method, path = %request.path, "Dispatching request");

        let lookup = self.trie.find(&request.method, &request.path);
        if let Ok(matched) = &lookup {
            request.path_params = matched.params.0.clone();
        }

        let scope = container.create_scoped_container();
        scope.instance(request.clone());
        let handler = self.resolve_exception_handler(&scope).await;

        let scoped = scope.container().clone();
        let destination = move |request: HttpRequest| async move {
            let RouteMatch { route, params } = lookup?;
            let endpoint_scope = scoped.clone();
            Pipeline::new(scoped)
                .through(route.get_middleware().iter().cloned())
                .send(request)
                .process(move |request: HttpRequest| async move {
                    endpoint_scope.instance(request.clone());
                    let args = Arguments::new().with(request).with(params);
                    route.endpoint().call(Resolver::new(endpoint_scope), args).await
                })
                .await
        };

        let response = Pipeline::new(scope.container().clone())
            .through(self.middleware.iter().cloned())
            .with_exception_handler(handler)
            .send(request)
            .to(destination)
            .await;

        scope.terminate().await;
        debug!(status = response.status, "Request complete");
        response
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.trie.len())
            .field("middleware", &self.middleware)
            .field("config", &self.config)
            .finish()
    }
}
