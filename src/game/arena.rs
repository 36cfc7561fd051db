//! Simulation tick driver and round-reset watcher
//!
//! The render loop calls [`Arena::tick`] once per frame. Each tick fully
//! resolves the left fighter, then the right one; while a fighter is being
//! resolved it only reads its opponent. Kills are applied by the arena
//! between the two halves, so the left fighter wins a simultaneous trade.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::combat::CombatSystem;
use super::fighter::Fighter;
use super::physics::MovementSystem;
use super::rules::GameRules;
use super::{Animation, Side};

/// Arena shared between the render loop and the controller bindings
pub type SharedArena = Arc<Mutex<Arena>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaPhase {
    Fighting,
    /// A life was lost; both fighters reset once `remaining` runs out
    Respawning { remaining: f32 },
    /// Terminal. `None` when both fighters ran out on the same tick.
    Over { winner: Option<Side> },
}

/// What happened during a tick, for the renderer's HUD
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaEvent {
    /// A fighter entered a new animation
    StateChanged { side: Side, animation: Animation },
    Hit { attacker: Side },
    LifeLost { side: Side, remaining: u32 },
    RoundReset,
    MatchOver { winner: Option<Side> },
}

#[derive(Debug, Default)]
struct TickOutcome {
    landed: bool,
    life_lost: bool,
}

#[derive(Debug, Clone)]
pub struct Arena {
    rules: GameRules,
    left: Fighter,
    right: Fighter,
    phase: ArenaPhase,
    /// Last animation reported per side, `[left, right]`
    reported: [Animation; 2],
}

impl Arena {
    pub fn new(rules: GameRules) -> Self {
        let left = Fighter::new(Side::Left, &rules);
        let right = Fighter::new(Side::Right, &rules);
        Self {
            reported: [left.animation(), right.animation()],
            rules,
            left,
            right,
            phase: ArenaPhase::Fighting,
        }
    }

    pub fn shared(rules: GameRules) -> SharedArena {
        Arc::new(Mutex::new(Self::new(rules)))
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn phase(&self) -> ArenaPhase {
        self.phase
    }

    pub fn fighter(&self, side: Side) -> &Fighter {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn fighter_mut(&mut self, side: Side) -> &mut Fighter {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Advance the simulation by `delta` (1.0 at the nominal frame rate)
    pub fn tick(&mut self, delta: f32) -> Vec<ArenaEvent> {
        let mut events = Vec::new();
        if let ArenaPhase::Over { .. } = self.phase {
            return events;
        }

        for fighter in [&mut self.left, &mut self.right] {
            if !fighter.is_visible() {
                fighter.show();
            }
        }

        let left = Self::tick_fighter(&self.rules, &mut self.left, &self.right, delta);
        if left.landed && self.right.kill() {
            events.push(ArenaEvent::Hit { attacker: Side::Left });
        }

        let right = Self::tick_fighter(&self.rules, &mut self.right, &self.left, delta);
        if right.landed && self.left.kill() {
            events.push(ArenaEvent::Hit { attacker: Side::Right });
        }

        for (side, outcome) in [(Side::Left, &left), (Side::Right, &right)] {
            if outcome.life_lost {
                events.push(ArenaEvent::LifeLost {
                    side,
                    remaining: self.fighter(side).remaining_lives(),
                });
            }
        }
        if left.life_lost || right.life_lost {
            self.on_life_lost(&mut events);
        }

        if let ArenaPhase::Respawning { remaining } = self.phase {
            let remaining = remaining - delta;
            if remaining <= 0.0 {
                self.reset_round();
                events.push(ArenaEvent::RoundReset);
            } else {
                self.phase = ArenaPhase::Respawning { remaining };
            }
        }

        self.report_state_changes(&mut events);
        events
    }

    /// Resolve one fighter against a read-only view of its opponent
    fn tick_fighter(rules: &GameRules, me: &mut Fighter, opponent: &Fighter, delta: f32) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        me.advance_animation(delta);

        if me.animation() == Animation::Run {
            let x = MovementSystem::step(rules, me.side(), me.position().x, me.direction(), opponent.position().x);
            me.set_x(x);
        }

        outcome.landed = CombatSystem::resolve(rules, me, opponent);

        if me.animation() == Animation::Die {
            me.fall(rules.fall_step);
        }

        // Hold the killing-blow frame for the tick the hit landed on
        if me.animation() == Animation::Attack && me.animation_finished() && !outcome.landed {
            me.finish_attack();
        }

        if me.animation() == Animation::Die && me.animation_finished() {
            outcome.life_lost = me.finish_dying();
        }

        outcome
    }

    fn on_life_lost(&mut self, events: &mut Vec<ArenaEvent>) {
        let left_out = self.left.remaining_lives() == 0;
        let right_out = self.right.remaining_lives() == 0;

        if left_out || right_out {
            let winner = match (left_out, right_out) {
                (true, false) => Some(Side::Right),
                (false, true) => Some(Side::Left),
                _ => None,
            };
            info!(winner = ?winner, "Match over");
            self.phase = ArenaPhase::Over { winner };
            events.push(ArenaEvent::MatchOver { winner });
            return;
        }

        // A second death during the countdown keeps the running timer
        if self.phase == ArenaPhase::Fighting {
            self.phase = ArenaPhase::Respawning {
                remaining: self.rules.respawn_delay,
            };
        }
    }

    fn reset_round(&mut self) {
        for fighter in [&mut self.left, &mut self.right] {
            fighter.hide();
            fighter.respawn();
        }
        self.phase = ArenaPhase::Fighting;
        info!(
            left_lives = self.left.remaining_lives(),
            right_lives = self.right.remaining_lives(),
            "Round reset"
        );
    }

    fn report_state_changes(&mut self, events: &mut Vec<ArenaEvent>) {
        for (i, side) in [Side::Left, Side::Right].into_iter().enumerate() {
            let animation = self.fighter(side).animation();
            if self.reported[i] != animation {
                self.reported[i] = animation;
                events.push(ArenaEvent::StateChanged { side, animation });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::AnimationSpec;
    use crate::game::Direction;
    use crate::input::{ControllerEvent, Input};

    /// Whole-number speeds keep frame boundaries exact
    fn rules() -> GameRules {
        let mut rules = GameRules::default();
        rules.animations.attack = AnimationSpec::new(8, 1.0, false);
        rules.animations.die = AnimationSpec::new(7, 1.0, false);
        rules.respawn_delay = 5.0;
        rules
    }

    /// Left fighter close enough to land an attack on the right one
    fn close_quarters(rules: GameRules) -> Arena {
        let mut arena = Arena::new(rules);
        arena.fighter_mut(Side::Left).set_x(0.0);
        arena.fighter_mut(Side::Right).set_x(100.0);
        arena
    }

    fn kill_right(arena: &mut Arena) -> Vec<ArenaEvent> {
        arena.fighter_mut(Side::Left).handle_input(ControllerEvent::Press(Input::Up));
        let mut events = Vec::new();
        for _ in 0..20 {
            events.extend(arena.tick(1.0));
            if arena.fighter(Side::Right).animation() == Animation::Dead {
                break;
            }
        }
        events
    }

    #[test]
    fn test_running_fighter_advances_each_tick() {
        let rules = GameRules {
            run_step: 10.0,
            ..GameRules::default()
        };
        let mut arena = Arena::new(rules);
        arena.fighter_mut(Side::Left).set_x(100.0);
        arena.fighter_mut(Side::Left).handle_input(ControllerEvent::Press(Input::Right));

        for _ in 0..3 {
            arena.tick(1.0);
        }

        let left = arena.fighter(Side::Left);
        assert_eq!(left.direction(), Direction::Right);
        assert_eq!(left.position().x, 130.0);
    }

    #[test]
    fn test_kill_lands_on_active_frame_not_before() {
        let mut arena = close_quarters(rules());
        arena.fighter_mut(Side::Left).handle_input(ControllerEvent::Press(Input::Up));

        for tick in 1..6 {
            let events = arena.tick(1.0);
            assert!(!events.contains(&ArenaEvent::Hit { attacker: Side::Left }), "tick {}", tick);
            assert_eq!(arena.fighter(Side::Right).animation(), Animation::Idle);
        }

        let events = arena.tick(1.0);
        assert_eq!(arena.fighter(Side::Left).frame(), 6);
        assert!(events.contains(&ArenaEvent::Hit { attacker: Side::Left }));
        assert_eq!(arena.fighter(Side::Right).animation(), Animation::Die);
        assert!(arena.fighter(Side::Right).is_dead());
    }

    #[test]
    fn test_killing_blow_on_last_attack_frame_is_held_one_tick() {
        // Active frame is also the terminal frame of the swing
        let mut arena = close_quarters(GameRules {
            active_attack_frame: 7,
            ..rules()
        });
        arena.fighter_mut(Side::Left).handle_input(ControllerEvent::Press(Input::Up));

        for _ in 1..7 {
            arena.tick(1.0);
        }
        assert!(!arena.fighter(Side::Right).is_dead());

        let events = arena.tick(1.0);
        let left = arena.fighter(Side::Left);
        assert!(events.contains(&ArenaEvent::Hit { attacker: Side::Left }));
        assert_eq!(left.frame(), 7);
        assert!(left.animation_finished());
        assert_eq!(left.animation(), Animation::Attack);

        let events = arena.tick(1.0);
        assert_eq!(arena.fighter(Side::Left).animation(), Animation::Idle);
        assert!(events.contains(&ArenaEvent::StateChanged {
            side: Side::Left,
            animation: Animation::Idle
        }));
    }

    #[test]
    fn test_out_of_reach_attack_misses() {
        let mut arena = Arena::new(rules());
        arena.fighter_mut(Side::Left).handle_input(ControllerEvent::Press(Input::Up));

        for _ in 0..10 {
            arena.tick(1.0);
        }

        assert!(!arena.fighter(Side::Right).is_dead());
        assert_eq!(arena.fighter(Side::Left).animation(), Animation::Idle);
    }

    #[test]
    fn test_dying_fighter_falls_and_loses_one_life() {
        let mut arena = close_quarters(rules());
        let events = kill_right(&mut arena);

        let right = arena.fighter(Side::Right);
        assert_eq!(right.animation(), Animation::Dead);
        assert_eq!(right.remaining_lives(), 2);
        assert!(right.position().y > 350.0);
        let lost: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ArenaEvent::LifeLost { .. }))
            .collect();
        assert_eq!(lost, vec![&ArenaEvent::LifeLost { side: Side::Right, remaining: 2 }]);
        assert!(matches!(arena.phase(), ArenaPhase::Respawning { .. }));
    }

    #[test]
    fn test_round_resets_after_delay() {
        let mut arena = close_quarters(rules());
        kill_right(&mut arena);

        let mut reset = false;
        for _ in 0..10 {
            if arena.tick(1.0).contains(&ArenaEvent::RoundReset) {
                reset = true;
                break;
            }
        }
        assert!(reset);
        assert_eq!(arena.phase(), ArenaPhase::Fighting);

        let right = arena.fighter(Side::Right);
        assert_eq!(right.animation(), Animation::Idle);
        assert_eq!(right.position().x, 912.0);
        assert_eq!(right.position().y, 350.0);
        assert!(!right.is_dead());
        assert!(!right.is_visible());
        assert_eq!(right.remaining_lives(), 2);

        arena.tick(1.0);
        assert!(arena.fighter(Side::Right).is_visible());
    }

    #[test]
    fn test_last_life_ends_the_match() {
        let mut arena = close_quarters(GameRules { lives: 1, ..rules() });
        let events = kill_right(&mut arena);

        assert!(events.contains(&ArenaEvent::MatchOver { winner: Some(Side::Left) }));
        assert_eq!(arena.phase(), ArenaPhase::Over { winner: Some(Side::Left) });
        assert!(arena.tick(1.0).is_empty());
    }

    #[test]
    fn test_state_changes_are_reported_once() {
        let mut arena = Arena::new(rules());
        arena.fighter_mut(Side::Right).handle_input(ControllerEvent::Press(Input::Left));

        let first = arena.tick(1.0);
        let second = arena.tick(1.0);

        assert_eq!(
            first,
            vec![ArenaEvent::StateChanged { side: Side::Right, animation: Animation::Run }]
        );
        assert!(second.is_empty());
    }
}
