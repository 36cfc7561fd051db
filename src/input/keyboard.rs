//! Local keyboard input

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::emitter::{Emitter, Event, ListenerId};

use super::{ActionHandler, InputSource, KeyAction};

/// Raw key transition delivered by the window/terminal layer. Key-repeat
/// shows up as repeated `Down` events for the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardEvent {
    Down(String),
    Up(String),
}

impl KeyboardEvent {
    pub fn key(&self) -> &str {
        match self {
            KeyboardEvent::Down(key) | KeyboardEvent::Up(key) => key,
        }
    }
}

impl Event for KeyboardEvent {
    fn name(&self) -> &'static str {
        match self {
            KeyboardEvent::Down(_) => "keydown",
            KeyboardEvent::Up(_) => "keyup",
        }
    }
}

/// Event target for raw key transitions, fed by whatever owns the window
#[derive(Clone, Default)]
pub struct Keyboard {
    events: Emitter<KeyboardEvent>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, key: &str) {
        self.events.emit(&KeyboardEvent::Down(key.to_string()));
    }

    pub fn key_up(&self, key: &str) {
        self.events.emit(&KeyboardEvent::Up(key.to_string()));
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    fn add_listener<F>(&self, name: &'static str, handler: F) -> ListenerId
    where
        F: FnMut(&KeyboardEvent) + Send + 'static,
    {
        self.events.on(name, handler)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }
}

/// One physical key. Reports `Press` on the first down transition only, so
/// auto-repeat never re-triggers, and `Release` when the key goes back up.
pub struct Key {
    keyboard: Keyboard,
    value: String,
    /// Listeners this instance attached to the keyboard
    listeners: Vec<ListenerId>,
}

impl Key {
    pub fn new(keyboard: &Keyboard, value: impl Into<String>) -> Self {
        Self {
            keyboard: keyboard.clone(),
            value: value.into(),
            listeners: Vec::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_subscribed(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl InputSource for Key {
    fn subscribe(&mut self, handler: ActionHandler) {
        self.unsubscribe();

        let is_down = Arc::new(AtomicBool::new(false));
        let handler = Arc::new(Mutex::new(handler));

        let down = {
            let value = self.value.clone();
            let is_down = is_down.clone();
            let handler = handler.clone();
            self.keyboard.add_listener("keydown", move |event| {
                if event.key() == value && !is_down.swap(true, Ordering::SeqCst) {
                    (*handler.lock())(KeyAction::Press);
                }
            })
        };

        let up = {
            let value = self.value.clone();
            self.keyboard.add_listener("keyup", move |event| {
                if event.key() == value && is_down.swap(false, Ordering::SeqCst) {
                    (*handler.lock())(KeyAction::Release);
                }
            })
        };

        self.listeners = vec![down, up];
    }

    fn unsubscribe(&mut self) {
        for id in self.listeners.drain(..) {
            self.keyboard.remove_listener(id);
        }
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
