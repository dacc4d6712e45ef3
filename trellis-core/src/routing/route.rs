// Route definitions and endpoints

use crate::container::{Arguments, Callable, Resolver, SyncCallable};
use crate::http::IntoResponse;
use crate::middleware::MiddlewareRef;
use crate::{HttpResponse, Result};
use futures_util::future::BoxFuture;
use std::sync::Arc;

type EndpointFn = Arc<dyn Fn(Resolver, Arguments) -> BoxFuture<'static, Result<HttpResponse>> + Send + Sync>;

/// A route handler with its parameters injected by the container.
///
/// Handlers may take any [`Dependency`](crate::container::Dependency)
/// parameters (`HttpRequest`, `RouteParams`, `Arc<Service>`, ...) and return
/// anything implementing [`IntoResponse`].
#[derive(Clone)]
pub struct Endpoint(EndpointFn);

impl Endpoint {
    /// Wrap an async handler.
    pub fn new<Args, F>(handler: F) -> Self
    where
        Args: 'static,
        F: Callable<Args>,
        F::Output: IntoResponse,
    {
        Self(Arc::new(
            move |resolver: Resolver, args: Arguments| -> BoxFuture<'static, Result<HttpResponse>> {
                let pending = handler.invoke(&resolver, args);
                Box::pin(async move { pending.await?.into_response() })
            },
        ))
    }

    /// Wrap a synchronous handler; it runs inline on the request task.
    pub fn sync<Args, F>(handler: F) -> Self
    where
        Args: 'static,
        F: SyncCallable<Args>,
        F::Output: IntoResponse,
    {
        Self(Arc::new(
            move |resolver: Resolver, args: Arguments| -> BoxFuture<'static, Result<HttpResponse>> {
                let pending = handler.invoke(&resolver, args);
                Box::pin(async move { pending.await?.into_response() })
            },
        ))
    }

    /// Invoke the handler. `args` carries the request values the handler's
    /// parameters may claim before the container is consulted.
    pub fn call(&self, resolver: Resolver, args: Arguments) -> BoxFuture<'static, Result<HttpResponse>> {
        (self.0)(resolver, args)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Endpoint")
    }
}

/// Conversion into an [`Endpoint`]: async handlers convert directly, an
/// `Endpoint` built with [`Endpoint::sync`] passes through.
pub trait IntoEndpoint<Args> {
    fn into_endpoint(self) -> Endpoint;
}

impl<Args, F> IntoEndpoint<Args> for F
where
    Args: 'static,
    F: Callable<Args>,
    F::Output: IntoResponse,
{
    fn into_endpoint(self) -> Endpoint {
        Endpoint::new(self)
    }
}

#[doc(hidden)]
pub struct EndpointMarker;

impl IntoEndpoint<EndpointMarker> for Endpoint {
    fn into_endpoint(self) -> Endpoint {
        self
    }
}

/// A registered route.
#[derive(Clone, Debug)]
pub struct Route {
    path: String,
    methods: Vec<String>,
    name: Option<String>,
    endpoint: Endpoint,
    middleware: Vec<MiddlewareRef>,
    priority: i32,
}

impl Route {
    /// Methods are upper-cased; `"*"` matches any method.
    pub fn new<Args, E, M>(methods: impl IntoIterator<Item = M>, path: impl Into<String>, endpoint: E) -> Self
    where
        E: IntoEndpoint<Args>,
        M: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for method in methods {
            let method = method.as_ref().to_ascii_uppercase();
            if !normalized.contains(&method) {
                normalized.push(method);
            }
        }
        Self {
            path: path.into(),
            methods: normalized,
            name: None,
            endpoint: endpoint.into_endpoint(),
            middleware: Vec::new(),
            priority: 0,
        }
    }

    pub fn get<Args, E: IntoEndpoint<Args>>(path: impl Into<String>, endpoint: E) -> Self {
        Self::new(["GET"], path, endpoint)
    }

    pub fn post<Args, E: IntoEndpoint<Args>>(path: impl Into<String>, endpoint: E) -> Self {
        Self::new(["POST"], path, endpoint)
    }

    pub fn put<Args, E: IntoEndpoint<Args>>(path: impl Into<String>, endpoint: E) -> Self {
        Self::new(["PUT"], path, endpoint)
    }

    pub fn patch<Args, E: IntoEndpoint<Args>>(path: impl Into<String>, endpoint: E) -> Self {
        Self::new(["PATCH"], path, endpoint)
    }

    pub fn delete<Args, E: IntoEndpoint<Args>>(path: impl Into<String>, endpoint: E) -> Self {
        Self::new(["DELETE"], path, endpoint)
    }

    pub fn any<Args, E: IntoEndpoint<Args>>(path: impl Into<String>, endpoint: E) -> Self {
        Self::new(["*"], path, endpoint)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    pub fn with_middleware(mut self, middleware: Vec<MiddlewareRef>) -> Self {
        self.middleware.extend(middleware);
        self
    }

    /// Tie-break among dynamic segments at the same position: higher
    /// priority is tried first, equal priorities in registration order.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_priority(&self) -> i32 {
        self.priority
    }

    pub fn get_middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether this route answers `method`.
    pub fn allows(&self, method: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m == "*" || m.eq_ignore_ascii_case(method))
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn prepend_middleware(&mut self, middleware: &[MiddlewareRef]) {
        if middleware.is_empty() {
            return;
        }
        let mut combined = middleware.to_vec();
        combined.append(&mut self.middleware);
        self.middleware = combined;
    }
}
