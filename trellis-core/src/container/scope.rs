// Scoped container guard

use super::Container;
use std::ops::Deref;

/// A child container for one unit of work.
///
/// Dereferences to [`Container`]. Teardown runs exactly once: on
/// [`terminate`](Self::terminate), or when the guard is dropped (early
/// return, panic unwinding, or a cancelled future holding it).
pub struct ScopedContainer {
    container: Container,
}

impl ScopedContainer {
    pub(crate) fn new(container: Container) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Run the terminating callbacks in registration order.
    pub async fn terminate(self) {
        self.container.terminate().await;
    }
}

impl Deref for ScopedContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl Drop for ScopedContainer {
    fn drop(&mut self) {
        self.container.terminate_on_drop();
    }
}

impl std::fmt::Debug for ScopedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ScopedContainer").field(&self.container).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_drop_runs_sync_callbacks_in_order() {
        let root = Container::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let scope = root.create_scoped_container();
            let first = log.clone();
            scope.terminating(move |_| first.lock().push("first"));
            let second = log.clone();
            scope.terminating(move |_| second.lock().push("second"));
        }
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_drop_without_runtime_blocks_on_async_callbacks() {
        let root = Container::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let scope = root.create_scoped_container();
            let first = log.clone();
            scope.terminating_async(move |_| async move { first.lock().push("async") });
            let second = log.clone();
            scope.terminating(move |_| second.lock().push("sync"));
        }
        assert_eq!(*log.lock(), vec!["async", "sync"]);
    }

    #[tokio::test]
    async fn test_terminate_then_drop_runs_once() {
        let root = Container::new();
        let log = Arc::new(Mutex::new(0usize));
        let scope = root.create_scoped_container();
        let seen = log.clone();
        scope.terminating(move |_| *seen.lock() += 1);
        let handle = scope.container().clone();
        scope.terminate().await;
        assert!(handle.is_terminated());
        assert_eq!(*log.lock(), 1);
    }
}
