use std::sync::Arc;

use parking_lot::Mutex;

/// Single-writer publication slot for an immutable value.
///
/// The lock only guards the pointer swap. Readers leave with their own
/// `Arc`, which keeps the value they saw alive after later publications.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    current: Mutex<Arc<T>>,
}

impl<T> SnapshotCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: Mutex::new(Arc::new(value)),
        }
    }

    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.lock())
    }

    /// Replace the published value, returning the previous one.
    pub fn publish(&self, value: T) -> Arc<T> {
        self.publish_arc(Arc::new(value))
    }

    pub fn publish_arc(&self, value: Arc<T>) -> Arc<T> {
        std::mem::replace(&mut *self.current.lock(), value)
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
