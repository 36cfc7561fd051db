//! Input sources and the controller that aggregates them
//!
//! A source is anything that produces press/release transitions: a physical
//! key ([`Key`]) or the opponent's key relayed over the network
//! ([`RemoteKey`]). The [`Controller`] only sees the [`InputSource`] trait,
//! so a fighter is driven the same way whether its player is local or remote.

pub mod controller;
pub mod keyboard;
pub mod remote;

pub use controller::{Controller, ControllerEvent};
pub use keyboard::{Key, Keyboard, KeyboardEvent};
pub use remote::{InputProxy, RemoteKey};

use std::fmt;

/// A press/release transition reported by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// Callback a source reports its transitions to
pub type ActionHandler = Box<dyn FnMut(KeyAction) + Send>;

/// Something that reports press/release transitions
pub trait InputSource: Send {
    /// Start reporting to `handler`, replacing any previous subscription
    fn subscribe(&mut self, handler: ActionHandler);

    /// Stop reporting. Safe to call when not subscribed.
    fn unsubscribe(&mut self);
}

/// Named inputs a fighter reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Up,
    Right,
    Left,
}

impl Input {
    pub const ALL: [Input; 3] = [Input::Up, Input::Right, Input::Left];

    /// Wire name, as carried in `KeyEvent::key`
    pub fn as_str(&self) -> &'static str {
        match self {
            Input::Up => "up",
            Input::Right => "right",
            Input::Left => "left",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|input| input.as_str() == name)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical key values bound to each input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub up: String,
    pub right: String,
    pub left: String,
}

impl KeyBindings {
    pub fn arrows() -> Self {
        Self {
            up: "ArrowUp".into(),
            right: "ArrowRight".into(),
            left: "ArrowLeft".into(),
        }
    }

    pub fn wasd() -> Self {
        Self {
            up: "w".into(),
            right: "d".into(),
            left: "a".into(),
        }
    }

    pub fn key_for(&self, input: Input) -> &str {
        match input {
            Input::Up => &self.up,
            Input::Right => &self.right,
            Input::Left => &self.left,
        }
    }

    /// One fresh [`Key`] per input, attached to `keyboard`
    pub fn keys(&self, keyboard: &Keyboard) -> Vec<(Input, Box<dyn InputSource>)> {
        Input::ALL
            .into_iter()
            .map(|input| {
                let key: Box<dyn InputSource> = Box::new(Key::new(keyboard, self.key_for(input)));
                (input, key)
            })
            .collect()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::arrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_names_round_trip() {
        for input in Input::ALL {
            assert_eq!(Input::from_name(input.as_str()), Some(input));
        }
        assert_eq!(Input::from_name("down"), None);
    }
}
