// Test container with mock overrides

use std::ops::Deref;
use std::sync::Arc;
use trellis_core::{Container, ScopedContainer};

/// A child scope of an application container for swapping in mocks.
///
/// Mocks are registered as instances of the child, so they shadow the
/// parent's bindings for anything resolved through this container while
/// the parent stays untouched. Singletons already owned by the parent keep
/// the dependencies they were built with.
pub struct TestContainer {
    scope: ScopedContainer,
}

impl TestContainer {
    /// Wrap a fresh, empty container
    pub fn new() -> Self {
        Self::over(&Container::new())
    }

    /// Layer a test scope over an existing container
    pub fn over(base: &Container) -> Self {
        Self {
            scope: base.create_scoped_container(),
        }
    }

    /// Replace `T` with `mock`
    pub fn mock<T: Send + Sync + 'static>(&self, mock: T) -> &Self {
        self.scope.instance(mock);
        self
    }

    /// Replace an abstract (usually a trait object) with `mock`
    pub fn mock_shared<T: ?Sized + Send + Sync + 'static>(&self, mock: Arc<T>) -> &Self {
        self.scope.instance_shared(mock);
        self
    }

    pub fn mock_named<T: Send + Sync + 'static>(&self, name: &str, mock: T) -> &Self {
        self.scope.instance_named(name, mock);
        self
    }

    pub fn container(&self) -> &Container {
        self.scope.container()
    }

    /// Run the test scope's terminating callbacks now instead of on drop.
    pub async fn terminate(self) {
        self.scope.terminate().await;
    }
}

impl Default for TestContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        self.scope.container()
    }
}
