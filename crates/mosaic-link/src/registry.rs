use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mosaic_frame::DecodedMessage;
use tracing::{error, warn};

use crate::error::HandlerError;

/// Result returned by a message handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&DecodedMessage) -> HandlerResult + Send + Sync>;

/// Token returned by [`CallbackRegistry::insert`], used to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Entry {
    id: HandlerId,
    handler: Handler,
}

#[derive(Default)]
struct Handlers {
    next_id: u64,
    by_identifier: HashMap<String, Vec<Entry>>,
}

/// Handlers keyed by message identifier.
///
/// Registration may happen from any thread, including from inside a handler.
/// Dispatch snapshots the handler list and runs it without holding the lock.
/// Handlers for one identifier run in registration order. A handler that
/// returns an error or panics is logged and does not stop the rest.
#[derive(Default)]
pub struct CallbackRegistry {
    inner: Mutex<Handlers>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers(&self) -> MutexGuard<'_, Handlers> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `handler` to the list for `identifier`.
    pub fn insert<F>(&self, identifier: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&DecodedMessage) -> HandlerResult + Send + Sync + 'static,
    {
        let mut handlers = self.handlers();
        let id = HandlerId(handlers.next_id);
        handlers.next_id += 1;
        handlers
            .by_identifier
            .entry(identifier.into())
            .or_default()
            .push(Entry {
                id,
                handler: Arc::new(handler),
            });
        id
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers();
        let mut removed = false;
        handlers.by_identifier.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            removed |= entries.len() != before;
            !entries.is_empty()
        });
        removed
    }

    /// Number of handlers registered for `identifier`.
    pub fn count(&self, identifier: &str) -> usize {
        self.handlers()
            .by_identifier
            .get(identifier)
            .map_or(0, Vec::len)
    }

    /// Identifiers with at least one handler, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.handlers().by_identifier.keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    pub fn is_empty(&self) -> bool {
        self.handlers().by_identifier.is_empty()
    }

    /// Invoke every handler registered for the message's identifier.
    ///
    /// Returns how many handlers were invoked.
    pub fn dispatch(&self, message: &DecodedMessage) -> usize {
        let snapshot: Vec<Handler> = self
            .handlers()
            .by_identifier
            .get(&message.identifier)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.handler)).collect())
            .unwrap_or_default();

        for (position, handler) in snapshot.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(
                        identifier = %message.identifier,
                        position,
                        error = %err,
                        "handler failed"
                    );
                }
                Err(payload) => {
                    error!(
                        identifier = %message.identifier,
                        position,
                        panic = panic_message(payload.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }
        snapshot.len()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers();
        let mut map = f.debug_map();
        for (identifier, entries) in &handlers.by_identifier {
            map.entry(identifier, &entries.len());
        }
        map.finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
