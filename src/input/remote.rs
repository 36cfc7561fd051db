//! Network-driven input: the opponent's keys, and forwarding of our own

use tracing::warn;

use crate::client::TransportClient;
use crate::util::emitter::ListenerId;
use crate::ws::protocol::{ClientMsg, KeyEvent, ServerMsg};

use super::{ActionHandler, Input, InputSource, KeyAction};

/// A key held by the opponent, reported through the relay. Only events whose
/// game, player and key all match are reported.
pub struct RemoteKey {
    client: TransportClient,
    game_id: String,
    player_id: String,
    input: Input,
    listener: Option<ListenerId>,
}

impl RemoteKey {
    pub fn new(
        client: &TransportClient,
        game_id: impl Into<String>,
        player_id: impl Into<String>,
        input: Input,
    ) -> Self {
        Self {
            client: client.clone(),
            game_id: game_id.into(),
            player_id: player_id.into(),
            input,
            listener: None,
        }
    }

    /// One remote key per input for the given opponent
    pub fn all(
        client: &TransportClient,
        game_id: &str,
        player_id: &str,
    ) -> Vec<(Input, Box<dyn InputSource>)> {
        Input::ALL
            .into_iter()
            .map(|input| {
                let key: Box<dyn InputSource> =
                    Box::new(RemoteKey::new(client, game_id, player_id, input));
                (input, key)
            })
            .collect()
    }
}

fn addressed_to(event: &KeyEvent, game_id: &str, player_id: &str, input: Input) -> bool {
    event.game_id == game_id && event.player_id == player_id && event.key == input.as_str()
}

impl InputSource for RemoteKey {
    fn subscribe(&mut self, mut handler: ActionHandler) {
        self.unsubscribe();

        let game_id = self.game_id.clone();
        let player_id = self.player_id.clone();
        let input = self.input;
        let id = self.client.on_any(move |msg| match msg {
            ServerMsg::PlayerKeyPress(event) if addressed_to(event, &game_id, &player_id, input) => {
                handler(KeyAction::Press)
            }
            ServerMsg::PlayerKeyRelease(event) if addressed_to(event, &game_id, &player_id, input) => {
                handler(KeyAction::Release)
            }
            _ => {}
        });
        self.listener = Some(id);
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.listener.take() {
            self.client.off(id);
        }
    }
}

impl Drop for RemoteKey {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Forwards local key transitions to the relay as `cmd:key:press` /
/// `cmd:key:release`. Local to network only.
pub struct InputProxy {
    sources: Vec<(Input, Box<dyn InputSource>)>,
}

impl InputProxy {
    pub fn new(
        client: &TransportClient,
        game_id: &str,
        player_id: &str,
        mut sources: Vec<(Input, Box<dyn InputSource>)>,
    ) -> Self {
        for (input, source) in sources.iter_mut() {
            let client = client.clone();
            let game_id = game_id.to_string();
            let player_id = player_id.to_string();
            let input = *input;

            source.subscribe(Box::new(move |action| {
                let event = KeyEvent {
                    game_id: game_id.clone(),
                    player_id: player_id.clone(),
                    key: input.as_str().to_string(),
                };
                let msg = match action {
                    KeyAction::Press => ClientMsg::KeyPress(event),
                    KeyAction::Release => ClientMsg::KeyRelease(event),
                };
                if let Err(e) = client.send(&msg) {
                    warn!(input = %input, error = %e, "Failed to forward key");
                }
            }));
        }

        Self { sources }
    }

    /// Stop forwarding
    pub fn detach(&mut self) {
        for (_, source) in self.sources.iter_mut() {
            source.unsubscribe();
        }
    }
}

impl Drop for InputProxy {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_filter_requires_all_fields() {
        let event = KeyEvent {
            game_id: "g".into(),
            player_id: "p".into(),
            key: "up".into(),
        };
        assert!(addressed_to(&event, "g", "p", Input::Up));
        assert!(!addressed_to(&event, "other", "p", Input::Up));
        assert!(!addressed_to(&event, "g", "q", Input::Up));
        assert!(!addressed_to(&event, "g", "p", Input::Left));
    }

    #[test]
    fn test_unsubscribe_without_subscription_is_noop() {
        let client = TransportClient::new();
        let mut key = RemoteKey::new(&client, "g", "p", Input::Up);
        key.unsubscribe();
        key.subscribe(Box::new(|_| {}));
        key.unsubscribe();
        key.unsubscribe();
    }
}
