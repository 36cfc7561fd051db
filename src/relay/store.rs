//! Session storage

use std::collections::HashMap;

use crate::ws::protocol::Session;

/// Storage for live sessions, owned by the relay
pub trait SessionStore: Send {
    /// Insert a session, returning the one it replaced (if any)
    fn insert(&mut self, session: Session) -> Option<Session>;

    fn get(&self, game_id: &str) -> Option<&Session>;

    fn get_mut(&mut self, game_id: &str) -> Option<&mut Session>;

    fn remove(&mut self, game_id: &str) -> Option<Session>;

    /// Ids of every session the player occupies a slot in
    fn sessions_of(&self, player_id: &str) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: HashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&mut self, session: Session) -> Option<Session> {
        self.sessions.insert(session.game_id.clone(), session)
    }

    fn get(&self, game_id: &str) -> Option<&Session> {
        self.sessions.get(game_id)
    }

    fn get_mut(&mut self, game_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(game_id)
    }

    fn remove(&mut self, game_id: &str) -> Option<Session> {
        self.sessions.remove(game_id)
    }

    fn sessions_of(&self, player_id: &str) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.has_player(player_id))
            .map(|s| s.game_id.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::PlayerSlot;

    #[test]
    fn test_insert_replaces_existing() {
        let mut store = InMemorySessionStore::new();
        assert!(store.insert(Session::new("g", "a")).is_none());

        let replaced = store.insert(Session::new("g", "b")).unwrap();
        assert_eq!(replaced.player1.id, "a");
        assert_eq!(store.get("g").unwrap().player1.id, "b");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_of_checks_both_slots() {
        let mut store = InMemorySessionStore::new();
        let mut joined = Session::new("g1", "a");
        joined.player2 = Some(PlayerSlot::new("b"));
        store.insert(joined);
        store.insert(Session::new("g2", "c"));

        assert_eq!(store.sessions_of("b"), vec!["g1".to_string()]);
        assert!(store.sessions_of("z").is_empty());

        store.remove("g1");
        assert!(store.sessions_of("a").is_empty());
    }
}
