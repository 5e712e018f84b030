use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifies one registration. Never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Handlers<E> {
    next_id: u64,
    by_event: HashMap<String, Vec<(HandlerId, Handler<E>)>>,
}

/// Named event handlers, invoked in registration order.
///
/// Dispatch runs over a snapshot of the handler list, so handlers may register or unsubscribe
/// (themselves included) while being dispatched to; the change applies from the next dispatch.
/// A panicking handler is logged and skipped, the remaining handlers still run.
pub struct EventRegistry<E> {
    handlers: Mutex<Handlers<E>>,
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Handlers {
                next_id: 0,
                by_event: HashMap::new(),
            }),
        }
    }
}

impl<E> fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = handlers
            .by_event
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventRegistry")
            .field("handlers", &counts)
            .finish_non_exhaustive()
    }
}

impl<E: 'static> EventRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    ///
    /// The returned handle removes exactly this registration. Dropping it without calling
    /// [`Unsubscribe::unsubscribe`] leaves the handler registered.
    pub fn on<S, F>(self: &Arc<Self>, event: S, handler: F) -> Unsubscribe
    where
        S: Into<String>,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let event = event.into();
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);

        let id = HandlerId(handlers.next_id);
        handlers.next_id = handlers.next_id.saturating_add(1);
        handlers
            .by_event
            .entry(event.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        drop(handlers);

        Unsubscribe {
            registry: Arc::downgrade(self) as Weak<dyn Unregister>,
            event,
            id,
            done: AtomicBool::new(false),
        }
    }

    /// Invoke every handler registered for `event`, returning how many ran to completion.
    pub fn dispatch(&self, event: &str, payload: &E) -> usize {
        let snapshot: Vec<(HandlerId, Handler<E>)> = {
            let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
            match handlers.by_event.get(event) {
                Some(list) => list.clone(),
                None => return 0,
            }
        };

        let mut completed = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        event,
                        handler = id.0,
                        panic = panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                    #[cfg(not(feature = "tracing"))]
                    let _ = (&id, panic_message(panic.as_ref()));
                }
            }
        }

        completed
    }

    /// Forget every registration for every event.
    pub fn clear(&self) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_event
            .clear();
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_event
            .get(event)
            .map_or(0, Vec::len)
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, event: &str, id: HandlerId);
}

impl<E: 'static> Unregister for EventRegistry<E> {
    fn unregister(&self, event: &str, id: HandlerId) {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = handlers.by_event.get_mut(event) {
            list.retain(|(registered, _)| *registered != id);
            if list.is_empty() {
                handlers.by_event.remove(event);
            }
        }
    }
}

/// Handle returned by [`EventRegistry::on`].
///
/// Calling [`Unsubscribe::unsubscribe`] more than once, or after the registry was cleared or
/// dropped, does nothing. Dropping the handle does not unregister the handler.
#[must_use = "dropping the handle keeps the handler registered"]
pub struct Unsubscribe {
    registry: Weak<dyn Unregister>,
    event: String,
    id: HandlerId,
    done: AtomicBool,
}

impl Unsubscribe {
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.event, self.id);
        }
    }

    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("event", &self.event)
            .field("id", &self.id)
            .field("done", &self.done.load(Ordering::Acquire))
            .finish()
    }
}

pub(super) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
