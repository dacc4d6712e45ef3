// Middleware system for request/response processing

use crate::container::Container;
use crate::logging::trace;
use crate::{HttpRequest, HttpResponse, Result};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The remainder of the chain; calling it runs the inner layers.
pub type Next = Box<dyn FnOnce(HttpRequest) -> BoxFuture<'static, Result<HttpResponse>> + Send>;

/// Middleware wraps the rest of the pipeline. Code before `next(req)` runs
/// on the way in, code after it on the way out.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse>;
}

/// Middleware backed by a closure, see [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

/// Build middleware from an async closure taking `(request, next)`.
///
/// ```ignore
/// let tagged = from_fn(|req, next| async move {
///     let res = next(req).await?;
///     Ok::<_, Error>(res.with_header("X-Handled", "1"))
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse>> + Send,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse>> + Send,
{
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        (self.f)(req, next).await
    }
}

type ResolveFn = Arc<dyn Fn(&Container) -> BoxFuture<'static, Result<Arc<dyn Middleware>>> + Send + Sync>;

/// A middleware entry on a route, group, router or pipeline.
///
/// Either a ready instance, or a reference resolved from the request's
/// scoped container each time the pipeline runs.
#[derive(Clone)]
pub enum MiddlewareRef {
    Instance {
        name: Arc<str>,
        middleware: Arc<dyn Middleware>,
    },
    Deferred {
        name: Arc<str>,
        resolve: ResolveFn,
    },
}

impl MiddlewareRef {
    pub fn new<M: Middleware + 'static>(middleware: M) -> Self {
        Self::Instance {
            name: std::any::type_name::<M>().into(),
            middleware: Arc::new(middleware),
        }
    }

    pub fn shared(middleware: Arc<dyn Middleware>) -> Self {
        Self::Instance {
            name: "dyn Middleware".into(),
            middleware,
        }
    }

    /// Resolve `M` from the container when the pipeline runs.
    pub fn resolve<M: Middleware + 'static>() -> Self {
        Self::Deferred {
            name: std::any::type_name::<M>().into(),
            resolve: Arc::new(|container: &Container| -> BoxFuture<'static, Result<Arc<dyn Middleware>>> {
                let container = container.clone();
                Box::pin(async move {
                    let middleware: Arc<M> = container.make::<M>().await?;
                    Ok(middleware as Arc<dyn Middleware>)
                })
            }),
        }
    }

    /// Resolve the `dyn Middleware` bound under the string abstract `name`.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        let key = name.clone();
        Self::Deferred {
            name,
            resolve: Arc::new(move |container: &Container| -> BoxFuture<'static, Result<Arc<dyn Middleware>>> {
                let container = container.clone();
                let key = key.clone();
                Box::pin(async move { container.make_named::<dyn Middleware>(&key).await })
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Instance { name, .. } | Self::Deferred { name, .. } => name,
        }
    }

    /// The middleware instance to run for a request handled in `container`.
    pub async fn instantiate(&self, container: &Container) -> Result<Arc<dyn Middleware>> {
        match self {
            Self::Instance { middleware, .. } => Ok(middleware.clone()),
            Self::Deferred { name, resolve } => {
                trace!(middleware = %name, "Resolving deferred middleware");
                resolve(container).await
            }
        }
    }
}

impl<M: Middleware + 'static> From<M> for MiddlewareRef {
    fn from(middleware: M) -> Self {
        Self::new(middleware)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::shared(middleware)
    }
}

impl std::fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance { name, .. } => f.debug_tuple("Instance").field(name).finish(),
            Self::Deferred { name, .. } => f.debug_tuple("Deferred").field(name).finish(),
        }
    }
}
