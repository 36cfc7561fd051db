//! Fight wiring: arena plus the controllers that drive it

use tracing::info;

use crate::game::{bind_controller, Arena, ArenaEvent, GameRules, SharedArena, Side};
use crate::input::{Controller, InputProxy, KeyBindings, Keyboard, RemoteKey};

use super::lobby::Matchup;
use super::transport::TransportClient;

/// A running fight. Dropping it detaches every input source.
pub struct Fight {
    arena: SharedArena,
    local_side: Side,
    controllers: Vec<Controller>,
    proxy: Option<InputProxy>,
}

impl Fight {
    /// Networked fight. The host plays the left side; the opponent's
    /// fighter is driven by the keys the relay forwards.
    pub fn networked(
        keyboard: &Keyboard,
        client: &TransportClient,
        matchup: &Matchup,
        bindings: &KeyBindings,
        rules: GameRules,
    ) -> Self {
        let arena = Arena::shared(rules);
        let local_side = if matchup.is_host { Side::Left } else { Side::Right };

        let local = Controller::new(bindings.keys(keyboard));
        let remote = Controller::new(RemoteKey::all(client, &matchup.game_id, &matchup.opponent_id));
        bind_controller(&local, arena.clone(), local_side);
        bind_controller(&remote, arena.clone(), local_side.opposite());

        let proxy = InputProxy::new(client, &matchup.game_id, &matchup.player_id, bindings.keys(keyboard));

        info!(
            game_id = %matchup.game_id,
            player_id = %matchup.player_id,
            side = ?local_side,
            "Fight started"
        );

        Self {
            arena,
            local_side,
            controllers: vec![local, remote],
            proxy: Some(proxy),
        }
    }

    /// Two players on one keyboard
    pub fn local(keyboard: &Keyboard, left: &KeyBindings, right: &KeyBindings, rules: GameRules) -> Self {
        let arena = Arena::shared(rules);

        let left = Controller::new(left.keys(keyboard));
        let right = Controller::new(right.keys(keyboard));
        bind_controller(&left, arena.clone(), Side::Left);
        bind_controller(&right, arena.clone(), Side::Right);

        Self {
            arena,
            local_side: Side::Left,
            controllers: vec![left, right],
            proxy: None,
        }
    }

    pub fn arena(&self) -> SharedArena {
        self.arena.clone()
    }

    pub fn local_side(&self) -> Side {
        self.local_side
    }

    /// One render-loop frame
    pub fn tick(&self, delta: f32) -> Vec<ArenaEvent> {
        self.arena.lock().tick(delta)
    }

    /// Stop reacting to input; the arena keeps its last state
    pub fn detach(&mut self) {
        if let Some(mut proxy) = self.proxy.take() {
            proxy.detach();
        }
        for controller in self.controllers.iter_mut() {
            controller.release_sources();
        }
    }
}
