//! Aggregates one source per input into named press/release events.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::emitter::{Emitter, Event, ListenerId};

use super::{Input, InputSource, KeyAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Press(Input),
    Release(Input),
}

impl ControllerEvent {
    pub fn input(&self) -> Input {
        match self {
            ControllerEvent::Press(input) | ControllerEvent::Release(input) => *input,
        }
    }
}

impl Event for ControllerEvent {
    fn name(&self) -> &'static str {
        match self {
            ControllerEvent::Press(Input::Up) => "up:press",
            ControllerEvent::Press(Input::Right) => "right:press",
            ControllerEvent::Press(Input::Left) => "left:press",
            ControllerEvent::Release(Input::Up) => "up:release",
            ControllerEvent::Release(Input::Right) => "right:release",
            ControllerEvent::Release(Input::Left) => "left:release",
        }
    }
}

pub struct Controller {
    events: Emitter<ControllerEvent>,
    pressed: Arc<Mutex<HashSet<Input>>>,
    sources: Vec<(Input, Box<dyn InputSource>)>,
}

impl Controller {
    pub fn new(mut sources: Vec<(Input, Box<dyn InputSource>)>) -> Self {
        let events = Emitter::new();
        let pressed = Arc::new(Mutex::new(HashSet::new()));

        for (input, source) in sources.iter_mut() {
            let input = *input;
            let events = events.clone();
            let pressed = pressed.clone();
            source.subscribe(Box::new(move |action| {
                // Listeners see the event before the pressed state flips
                match action {
                    KeyAction::Press => {
                        events.emit(&ControllerEvent::Press(input));
                        pressed.lock().insert(input);
                    }
                    KeyAction::Release => {
                        events.emit(&ControllerEvent::Release(input));
                        pressed.lock().remove(&input);
                    }
                }
            }));
        }

        Self {
            events,
            pressed,
            sources,
        }
    }

    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: FnMut(&ControllerEvent) + Send + 'static,
    {
        self.events.on_any(handler)
    }

    /// Subscribe to one event, e.g. `"left:release"`
    pub fn on<F>(&self, name: &'static str, handler: F) -> ListenerId
    where
        F: FnMut(&ControllerEvent) + Send + 'static,
    {
        self.events.on(name, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn is_pressed(&self, input: Input) -> bool {
        self.pressed.lock().contains(&input)
    }

    /// Detach from every source. The controller emits nothing afterwards.
    pub fn release_sources(&mut self) {
        for (_, source) in self.sources.iter_mut() {
            source.unsubscribe();
        }
        self.pressed.lock().clear();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.release_sources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyBindings, Keyboard};

    #[test]
    fn test_named_events_and_pressed_state() {
        let keyboard = Keyboard::new();
        let controller = Controller::new(KeyBindings::wasd().keys(&keyboard));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        controller.on("left:press", move |event| s.lock().push(*event));

        keyboard.key_down("a");
        keyboard.key_down("d");

        assert_eq!(*seen.lock(), vec![ControllerEvent::Press(Input::Left)]);
        assert!(controller.is_pressed(Input::Left));
        assert!(controller.is_pressed(Input::Right));
        assert!(!controller.is_pressed(Input::Up));

        keyboard.key_up("a");
        assert!(!controller.is_pressed(Input::Left));
    }

    #[test]
    fn test_listener_sees_state_before_update() {
        let keyboard = Keyboard::new();
        let controller = Controller::new(KeyBindings::arrows().keys(&keyboard));
        let observed = Arc::new(Mutex::new(None));

        let pressed = controller.pressed.clone();
        let o = observed.clone();
        controller.on("up:press", move |_| {
            *o.lock() = Some(pressed.lock().contains(&Input::Up));
        });

        keyboard.key_down("ArrowUp");

        assert_eq!(*observed.lock(), Some(false));
        assert!(controller.is_pressed(Input::Up));
    }

    #[test]
    fn test_drop_detaches_from_keyboard() {
        let keyboard = Keyboard::new();
        let controller = Controller::new(KeyBindings::arrows().keys(&keyboard));
        assert_eq!(keyboard.listener_count(), 6);

        drop(controller);

        assert_eq!(keyboard.listener_count(), 0);
    }
}
