//! Multi-subscriber event emitter
//!
//! Handlers are registered either for every event (`on_any`) or for a single
//! event name (`on` / `once`). Dispatch happens on the caller's task, in
//! registration order, over a snapshot of the listener list. Listeners added
//! while an event is being dispatched see the next event; listeners removed
//! meanwhile are skipped. Emitting from another thread or from inside a
//! handler is allowed. A handler is never re-entered: a nested emit skips the
//! handler that raised it.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

/// An event with a stable wire/display name used for filtered subscriptions
pub trait Event {
    fn name(&self) -> &'static str;
}

/// Handle returned by a subscription, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// Serializes calls into one handler across threads
type Slot<E> = Arc<ReentrantMutex<RefCell<Handler<E>>>>;

struct Listener<E> {
    id: ListenerId,
    filter: Option<&'static str>,
    once: bool,
    handler: Slot<E>,
}

impl<E: Event> Listener<E> {
    fn matches(&self, event: &E) -> bool {
        self.filter.map_or(true, |name| name == event.name())
    }
}

struct Inner<E> {
    listeners: Vec<Listener<E>>,
    next_id: u64,
}

/// Cloneable emitter; clones share the same listener list
pub struct Emitter<E> {
    inner: Arc<Mutex<Inner<E>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Event> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Emitter<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn register(
        &self,
        filter: Option<&'static str>,
        once: bool,
        handler: Handler<E>,
    ) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            filter,
            once,
            handler: Arc::new(ReentrantMutex::new(RefCell::new(handler))),
        });
        id
    }

    /// Subscribe to every event
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.register(None, false, Box::new(handler))
    }

    /// Subscribe to every event named `name`
    pub fn on<F>(&self, name: &'static str, handler: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.register(Some(name), false, Box::new(handler))
    }

    /// Subscribe to the next event named `name` only
    pub fn once<F>(&self, name: &'static str, handler: F) -> ListenerId
    where
        F: FnOnce(&E) + Send + 'static,
    {
        let mut handler = Some(handler);
        self.register(
            Some(name),
            true,
            Box::new(move |event: &E| {
                if let Some(f) = handler.take() {
                    f(event);
                }
            }),
        )
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        match inner.listeners.iter().position(|l| l.id == id) {
            Some(pos) => {
                inner.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every listener (and whatever their closures own)
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut self.inner.lock().listeners);
        drop(dropped);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Deliver `event` to every matching listener. Returns how many ran.
    pub fn emit(&self, event: &E) -> usize {
        let batch: Vec<(ListenerId, bool, Slot<E>)> = self
            .inner
            .lock()
            .listeners
            .iter()
            .filter(|l| l.matches(event))
            .map(|l| (l.id, l.once, l.handler.clone()))
            .collect();

        let mut delivered = 0;
        for (id, once, slot) in batch {
            if !self.claim(id, once) {
                continue;
            }
            let guard = slot.lock();
            let Ok(mut handler) = guard.try_borrow_mut() else {
                // Raised from inside this handler
                continue;
            };
            (*handler)(event);
            delivered += 1;
        }
        delivered
    }

    /// Whether a snapshotted listener may still run. A `once` listener is
    /// taken out by the first dispatch that claims it.
    fn claim(&self, id: ListenerId, once: bool) -> bool {
        let mut inner = self.inner.lock();
        let Some(pos) = inner.listeners.iter().position(|l| l.id == id) else {
            return false;
        };
        if once {
            inner.listeners.remove(pos);
        }
        true
    }
}
