// Test Application Builder

use crate::{TestClient, TestContainer};
use std::sync::Arc;
use trellis_core::{Container, Result, Route, Router};

/// A router plus the container its requests are dispatched against.
pub struct TestApp {
    router: Arc<Router>,
    container: TestContainer,
}

impl TestApp {
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The test scope; register mocks here before sending requests.
    pub fn container(&self) -> &TestContainer {
        &self.container
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(self.router.clone(), self.container.container().clone())
    }
}

/// Builder for test applications
pub struct TestAppBuilder {
    container: Container,
    router: Router,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            container: Container::new(),
            router: Router::new(),
        }
    }

    /// Register bindings on the application container
    pub fn register<F: FnOnce(&Container)>(self, f: F) -> Self {
        f(&self.container);
        self
    }

    pub fn with_route(mut self, route: Route) -> Result<Self> {
        self.router.add(route)?;
        Ok(self)
    }

    pub fn with_container(self, container: Container) -> Self {
        Self { container, ..self }
    }

    pub fn with_router(self, router: Router) -> Self {
        Self { router, ..self }
    }

    /// Freeze the router and layer a [`TestContainer`] over the container
    pub fn build(self) -> TestApp {
        TestApp {
            router: Arc::new(self.router),
            container: TestContainer::over(&self.container),
        }
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::RouteParams;

    #[tokio::test]
    async fn test_built_app_serves_routes() {
        let app = TestAppBuilder::new()
            .with_route(Route::get("/ping/{n}", |params: RouteParams| async move {
                format!("pong {}", params.get("n").unwrap_or_default())
            }))
            .unwrap()
            .build();

        let response = app.client().get("/ping/3").await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.body_string(), "pong 3");
        assert_eq!(app.router().routes().len(), 1);
    }
}
