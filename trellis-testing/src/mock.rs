// Mock utilities for testing

use parking_lot::Mutex;
use std::sync::Arc;

/// Records calls and hands out a canned return value.
///
/// Clones share the same call log, so a clone registered in a
/// [`TestContainer`](crate::TestContainer) can be inspected from the test.
pub struct MockService<T> {
    calls: Arc<Mutex<Vec<String>>>,
    return_value: Arc<Mutex<Option<T>>>,
}

impl<T> MockService<T> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            return_value: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_return(self, value: T) -> Self {
        *self.return_value.lock() = Some(value);
        self
    }

    pub fn record_call(&self, method: &str) {
        self.calls.lock().push(method.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls.lock().iter().any(|call| call == method)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn get_return(&self) -> Option<T>
    where
        T: Clone,
    {
        self.return_value.lock().clone()
    }
}

impl<T> Clone for MockService<T> {
    fn clone(&self) -> Self {
        Self {
            calls: self.calls.clone(),
            return_value: self.return_value.clone(),
        }
    }
}

impl<T> Default for MockService<T> {
    fn default() -> Self {
        Self::new()
    }
}
