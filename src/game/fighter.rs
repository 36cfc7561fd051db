//! Per-fighter state machine

use tracing::debug;

use crate::input::{ControllerEvent, Input};

use super::animation::{AnimationClock, AnimationTable};
use super::rules::GameRules;
use super::{Animation, Direction, Position, Side};

/// One fighter. `dead` is set exactly while the animation is `Die` or `Dead`.
#[derive(Debug, Clone)]
pub struct Fighter {
    side: Side,
    spawn: Position,
    position: Position,
    direction: Direction,
    clock: AnimationClock,
    animations: AnimationTable,
    remaining_lives: u32,
    dead: bool,
    visible: bool,
}

impl Fighter {
    pub fn new(side: Side, rules: &GameRules) -> Self {
        let spawn = Position {
            x: match side {
                Side::Left => 0.0,
                Side::Right => rules.max_x(),
            },
            y: rules.floor_y,
        };
        Self {
            side,
            spawn,
            position: spawn,
            direction: facing(side),
            clock: AnimationClock::new(Animation::Idle),
            animations: rules.animations,
            remaining_lives: rules.lives,
            dead: false,
            visible: true,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_x(&mut self, x: f32) {
        self.position.x = x;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn animation(&self) -> Animation {
        self.clock.animation()
    }

    /// Current frame of the current animation
    pub fn frame(&self) -> u32 {
        self.clock.frame(&self.animations)
    }

    pub fn remaining_lives(&self) -> u32 {
        self.remaining_lives
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Apply a controller event. Ignored while dead. Returns whether the
    /// fighter changed state.
    pub fn handle_input(&mut self, event: ControllerEvent) -> bool {
        if self.dead {
            return false;
        }

        match event {
            ControllerEvent::Press(Input::Up) => {
                if self.animation() == Animation::Attack {
                    return false;
                }
                self.clock.play(Animation::Attack);
            }
            ControllerEvent::Press(Input::Right) => self.run(Direction::Right),
            ControllerEvent::Press(Input::Left) => self.run(Direction::Left),
            ControllerEvent::Release(Input::Right) => return self.stop(Direction::Right),
            ControllerEvent::Release(Input::Left) => return self.stop(Direction::Left),
            ControllerEvent::Release(Input::Up) => return false,
        }
        true
    }

    fn run(&mut self, direction: Direction) {
        self.direction = direction;
        if self.animation() != Animation::Run {
            self.clock.play(Animation::Run);
        }
    }

    fn stop(&mut self, direction: Direction) -> bool {
        if self.animation() == Animation::Run && self.direction == direction {
            self.clock.play(Animation::Idle);
            return true;
        }
        false
    }

    /// Enter `Die` from any state. No effect if already dead.
    pub fn kill(&mut self) -> bool {
        if self.dead {
            return false;
        }
        debug!(side = ?self.side, "Fighter killed");
        self.clock.play(Animation::Die);
        self.dead = true;
        true
    }

    pub(crate) fn advance_animation(&mut self, delta: f32) {
        self.clock.advance(&self.animations, delta);
    }

    pub(crate) fn animation_finished(&self) -> bool {
        self.clock.is_finished(&self.animations)
    }

    pub(crate) fn fall(&mut self, step: f32) {
        self.position.y += step;
    }

    /// Attack played out
    pub(crate) fn finish_attack(&mut self) {
        if self.animation() == Animation::Attack {
            self.clock.play(Animation::Idle);
        }
    }

    /// `Die` played out: freeze on `Dead` and lose a life. Only the first
    /// call after a kill has an effect.
    pub(crate) fn finish_dying(&mut self) -> bool {
        if self.animation() != Animation::Die {
            return false;
        }
        self.clock.play(Animation::Dead);
        self.remaining_lives = self.remaining_lives.saturating_sub(1);
        true
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Back to the spawn point for a new round. Lives and visibility are kept.
    pub fn respawn(&mut self) {
        self.position = self.spawn;
        self.direction = facing(self.side);
        self.clock.play(Animation::Idle);
        self.dead = false;
    }
}

fn facing(side: Side) -> Direction {
    match side {
        Side::Left => Direction::Right,
        Side::Right => Direction::Left,
    }
}
