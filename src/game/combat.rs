//! Combat system - attack windows and reach

use super::fighter::Fighter;
use super::rules::GameRules;
use super::{Animation, Side};

/// Combat system for melee hit detection
pub struct CombatSystem;

impl CombatSystem {
    /// Whether the attacker's weapon is in its active frames
    pub fn is_active(rules: &GameRules, attacker: &Fighter) -> bool {
        attacker.animation() == Animation::Attack && attacker.frame() >= rules.active_attack_frame
    }

    /// Whether a weapon swung from `attacker_x` crosses the defender's hit line.
    /// Attacks always point at the opposite side of the stage.
    pub fn reaches(rules: &GameRules, attacker_side: Side, attacker_x: f32, defender_x: f32) -> bool {
        let own = rules.body.hitbox(attacker_side, attacker_x);
        let target = rules.body.hitbox(attacker_side.opposite(), defender_x);

        match attacker_side {
            Side::Left => {
                let reach = own.right + rules.weapon_reach;
                let hit_x = target.left + rules.hit_offset;
                reach >= hit_x
            }
            Side::Right => {
                let reach = own.left - rules.weapon_reach;
                let hit_x = target.right - rules.hit_offset;
                reach <= hit_x
            }
        }
    }

    /// A hit lands when the weapon is active, in range, and the defender is
    /// still alive. Once the defender is dead this keeps returning false, so
    /// the active frames cannot kill twice.
    pub fn resolve(rules: &GameRules, attacker: &Fighter, defender: &Fighter) -> bool {
        !defender.is_dead()
            && Self::is_active(rules, attacker)
            && Self::reaches(rules, attacker.side(), attacker.position().x, defender.position().x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reach_left_attacker() {
        let rules = GameRules::default();
        // Left hitbox right edge = x + 147, reach = x + 287.
        // Right hitbox left edge = ox + 141, hit line = ox + 161.
        assert!(CombatSystem::reaches(&rules, Side::Left, 0.0, 126.0));
        assert!(!CombatSystem::reaches(&rules, Side::Left, 0.0, 127.0));
    }

    #[test]
    fn test_reach_right_attacker() {
        let rules = GameRules::default();
        // Right hitbox left edge = x + 141, reach = x + 1.
        // Left hitbox right edge = ox + 147, hit line = ox + 127.
        assert!(CombatSystem::reaches(&rules, Side::Right, 500.0, 374.0));
        assert!(!CombatSystem::reaches(&rules, Side::Right, 500.0, 373.0));
    }

    #[test]
    fn test_idle_fighter_never_hits() {
        let rules = GameRules::default();
        let attacker = Fighter::new(Side::Left, &rules);
        let defender = Fighter::new(Side::Right, &rules);
        let mut defender_close = defender.clone();
        defender_close.set_x(100.0);

        assert!(!CombatSystem::resolve(&rules, &attacker, &defender_close));
    }
}
