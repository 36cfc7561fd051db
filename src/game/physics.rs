//! Fighter geometry and movement constraints

use super::rules::GameRules;
use super::{Direction, Side};

/// Body and hitbox dimensions, measured from the body's left edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyGeometry {
    /// Full sprite width
    pub width: f32,
    /// Gap between the body's back edge and the hitbox
    pub hitbox_offset: f32,
    /// Width of the vulnerable region
    pub hitbox_width: f32,
}

impl Default for BodyGeometry {
    fn default() -> Self {
        Self {
            width: 288.0,
            hitbox_offset: 27.0,
            hitbox_width: 120.0,
        }
    }
}

/// Horizontal extent of a hitbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub left: f32,
    pub right: f32,
}

impl BodyGeometry {
    /// The right-side fighter is mirrored, so its hitbox hugs the body's
    /// right edge instead of the left.
    pub fn hitbox(&self, side: Side, x: f32) -> Hitbox {
        match side {
            Side::Left => {
                let left = x + self.hitbox_offset;
                Hitbox {
                    left,
                    right: left + self.hitbox_width,
                }
            }
            Side::Right => {
                let right = x + self.width - self.hitbox_offset;
                Hitbox {
                    left: right - self.hitbox_width,
                    right,
                }
            }
        }
    }

    /// Distance from the body's x to the hitbox edge facing the opponent
    fn front_edge(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.hitbox_offset + self.hitbox_width,
            Side::Right => self.width - self.hitbox_offset - self.hitbox_width,
        }
    }
}

/// Movement system for running fighters
pub struct MovementSystem;

impl MovementSystem {
    /// Next x of a running fighter. The bound toward the opponent is taken
    /// from the opponent's current hitbox, so it has to be recomputed every
    /// tick.
    pub fn step(rules: &GameRules, side: Side, x: f32, direction: Direction, opponent_x: f32) -> f32 {
        let body = &rules.body;
        let opponent = body.hitbox(side.opposite(), opponent_x);

        match direction {
            Direction::Right => {
                let bound = match side {
                    Side::Left => (opponent.left - body.front_edge(side)).min(rules.max_x()),
                    Side::Right => rules.max_x(),
                };
                (x + rules.run_step).min(bound)
            }
            Direction::Left => {
                let bound = match side {
                    Side::Right => (opponent.right - body.front_edge(side)).max(0.0),
                    Side::Left => 0.0,
                };
                (x - rules.run_step).max(bound)
            }
        }
    }
}
