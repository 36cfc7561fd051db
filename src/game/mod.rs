//! Fighter simulation: state machine, movement, combat and the tick driver

pub mod animation;
pub mod arena;
pub mod binding;
pub mod combat;
pub mod fighter;
pub mod physics;
pub mod rules;

pub use animation::{AnimationClock, AnimationSpec, AnimationTable};
pub use arena::{Arena, ArenaEvent, ArenaPhase, SharedArena};
pub use binding::bind_controller;
pub use fighter::Fighter;
pub use rules::GameRules;

/// Which half of the stage a fighter starts on. The host plays `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Facing/running direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Fighter state; also selects the renderer's frame sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Animation {
    Idle,
    Run,
    Attack,
    Die,
    Dead,
}

impl Animation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::Idle => "IDLE",
            Animation::Run => "RUN",
            Animation::Attack => "ATTACK",
            Animation::Die => "DIE",
            Animation::Dead => "DEAD",
        }
    }
}

/// World position in stage units; `y` grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}
