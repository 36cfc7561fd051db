//! Tuning constants for a bout

use super::animation::AnimationTable;
use super::physics::BodyGeometry;

#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    /// Stage width; fighters stay within `[0, stage_width - body.width]`
    pub stage_width: f32,
    /// Spawn height of both fighters
    pub floor_y: f32,
    pub body: BodyGeometry,
    /// Horizontal distance covered per tick while running
    pub run_step: f32,
    /// How far past the attacker's hitbox edge the weapon reaches
    pub weapon_reach: f32,
    /// Inset from the defender's hitbox edge that must be crossed to land
    pub hit_offset: f32,
    /// First ATTACK frame on which the weapon can land
    pub active_attack_frame: u32,
    /// Downward drift per tick while dying
    pub fall_step: f32,
    /// Delay between a lost life and the round reset, in tick-delta units
    pub respawn_delay: f32,
    pub lives: u32,
    pub animations: AnimationTable,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            stage_width: 1200.0,
            floor_y: 350.0,
            body: BodyGeometry::default(),
            run_step: 15.0,
            weapon_reach: 140.0,
            hit_offset: 20.0,
            active_attack_frame: 6,
            fall_step: 4.0,
            respawn_delay: 120.0,
            lives: 3,
            animations: AnimationTable::default(),
        }
    }
}

impl GameRules {
    /// Rightmost x a fighter's body may occupy
    pub fn max_x(&self) -> f32 {
        self.stage_width - self.body.width
    }
}
