//! Ordered middleware around a terminal handler
//!
//! The pipe list is folded right-to-left, so the first pipe is the
//! outermost layer: given `[A, B, C]` around `H` the observed order is
//! `A-before, B-before, C-before, H, C-after, B-after, A-after`.
//!
//! ```ignore
//! let response = Pipeline::new(scope.container().clone())
//!     .through(vec![MiddlewareRef::new(Cors), MiddlewareRef::named("auth")])
//!     .send(request)
//!     .to(|req| async move { Ok(HttpResponse::ok()) })
//!     .await;
//! ```

use crate::container::Container;
use crate::exception::{DefaultExceptionHandler, ExceptionHandler, panic_to_error};
use crate::logging::{debug, trace};
use crate::middleware::{MiddlewareRef, Next};
use crate::{HttpRequest, HttpResponse, Result};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// A middleware pipeline bound to the container middleware are resolved from.
pub struct Pipeline {
    container: Container,
    pipes: Vec<MiddlewareRef>,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
}

impl Pipeline {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            pipes: Vec::new(),
            exception_handler: None,
        }
    }

    /// Replace the pipe list.
    pub fn through(mut self, pipes: impl IntoIterator<Item = MiddlewareRef>) -> Self {
        self.pipes = pipes.into_iter().collect();
        self
    }

    /// Append one pipe.
    pub fn pipe(mut self, pipe: impl Into<MiddlewareRef>) -> Self {
        self.pipes.push(pipe.into());
        self
    }

    /// Use `handler` instead of the container's `dyn ExceptionHandler`.
    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Set the request the pipeline will carry.
    pub fn send(self, request: HttpRequest) -> PendingPipeline {
        PendingPipeline {
            pipeline: self,
            request,
        }
    }

    async fn exception_handler(&self) -> Arc<dyn ExceptionHandler> {
        if let Some(handler) = &self.exception_handler {
            return handler.clone();
        }
        match self.container.try_make::<dyn ExceptionHandler>().await {
            Ok(Some(handler)) => handler,
            _ => Arc::new(DefaultExceptionHandler::default()),
        }
    }

    fn compose(&self, destination: Next) -> Next {
        self.pipes.iter().rev().fold(destination, |next, pipe| {
            let pipe = pipe.clone();
            let container = self.container.clone();
            let layer: Next = Box::new(
                move |request: HttpRequest| -> BoxFuture<'static, Result<HttpResponse>> {
                    Box::pin(async move {
                        let middleware = pipe.instantiate(&container).await?;
                        trace!(middleware = pipe.name(), "Entering middleware");
                        middleware.handle(request, next).await
                    })
                },
            );
            layer
        })
    }
}

/// A pipeline with its request, waiting for a destination.
pub struct PendingPipeline {
    pipeline: Pipeline,
    request: HttpRequest,
}

impl PendingPipeline {
    /// Run the chain into `destination` without the error boundary.
    pub async fn process<F, Fut>(self, destination: F) -> Result<HttpResponse>
    where
        F: FnOnce(HttpRequest) -> Fut + Send + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        let terminal: Next = Box::new(
            move |request: HttpRequest| -> BoxFuture<'static, Result<HttpResponse>> {
                Box::pin(destination(request))
            },
        );
        debug!(
            middleware_count = self.pipeline.len(),
            method = %self.request.method,
            path = %self.request.path,
            "Executing pipeline"
        );
        let chain = self.pipeline.compose(terminal);
        chain(self.request).await
    }

    /// Run the chain into `destination`. Errors and panics are reported to
    /// the exception handler and rendered; this never fails.
    pub async fn to<F, Fut>(self, destination: F) -> HttpResponse
    where
        F: FnOnce(HttpRequest) -> Fut + Send + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        let request = self.request.clone();
        let handler = self.pipeline.exception_handler().await;

        let outcome = AssertUnwindSafe(self.process(destination))
            .catch_unwind()
            .await;
        let err = match outcome {
            Ok(Ok(response)) => return response,
            Ok(Err(err)) => err,
            Err(panic) => panic_to_error(panic),
        };
        handler.report(&err);
        handler.render(&request, &err)
    }
}
