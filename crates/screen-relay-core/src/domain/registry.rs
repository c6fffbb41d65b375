//! Thread-safe set of connected viewers.
//!
//! The transport registers one [`ViewerSink`] per connection and gets back a
//! fresh [`ViewerId`].  Identity is the id, never the sink's contents, and ids
//! are random UUIDs so a handle is never reused after it was removed.
//!
//! The broadcast loop calls [`ClientRegistry::snapshot`] and iterates the
//! copy, so a viewer connecting or disconnecting in the middle of a fan-out
//! cannot disturb the iteration or deadlock against the transport's
//! connect/close handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use super::frame::Frame;

/// Opaque viewer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerId(Uuid);

impl ViewerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a frame could not be handed to a viewer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("viewer connection is gone")]
    Disconnected,
    #[error("viewer transport failed: {0}")]
    Transport(String),
}

/// The outbound half of one viewer connection.
///
/// `deliver` must not block on network I/O: implementations hand the frame
/// to the connection's own writer and return.
#[cfg_attr(test, mockall::automock)]
pub trait ViewerSink: Send + Sync {
    fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError>;
}

/// All currently connected viewers.
#[derive(Default)]
pub struct ClientRegistry {
    viewers: Mutex<HashMap<ViewerId, Arc<dyn ViewerSink>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a viewer and returns its new handle.
    pub fn add(&self, sink: Arc<dyn ViewerSink>) -> ViewerId {
        let id = ViewerId::new();
        self.lock().insert(id, sink);
        id
    }

    /// Removes a viewer.  Returns `false` if it was already gone.
    pub fn remove(&self, id: ViewerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Point-in-time copy of the registered viewers.
    pub fn snapshot(&self) -> Vec<(ViewerId, Arc<dyn ViewerSink>)> {
        self.lock()
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect()
    }

    pub fn contains(&self, id: ViewerId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ViewerId, Arc<dyn ViewerSink>>> {
        self.viewers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("viewers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepting_sink() -> Arc<dyn ViewerSink> {
        let mut sink = MockViewerSink::new();
        sink.expect_deliver().returning(|_| Ok(()));
        Arc::new(sink)
    }

    #[test]
    fn test_add_returns_distinct_ids_for_equal_sinks() {
        let registry = ClientRegistry::new();
        let sink = accepting_sink();

        let a = registry.add(Arc::clone(&sink));
        let b = registry.add(sink);

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ClientRegistry::new();
        let id = registry.add(accepting_sink());

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_removal() {
        // Arrange
        let registry = ClientRegistry::new();
        let a = registry.add(accepting_sink());
        let _b = registry.add(accepting_sink());

        // Act: take a snapshot, then remove one viewer
        let snapshot = registry.snapshot();
        registry.remove(a);

        // Assert: the copy still holds both; the registry only one
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(!registry.snapshot().iter().any(|(id, _)| *id == a));
    }

    #[test]
    fn test_snapshot_sinks_are_callable() {
        let registry = ClientRegistry::new();
        registry.add(accepting_sink());

        let frame = Frame::new(vec![1, 2, 3]);
        for (_, sink) in registry.snapshot() {
            assert_eq!(sink.deliver(&frame), Ok(()));
        }
    }

    #[test]
    fn test_concurrent_add_and_remove() {
        let registry = Arc::new(ClientRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let id = registry.add(accepting_sink());
                        let _ = registry.snapshot();
                        assert!(registry.remove(id));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
