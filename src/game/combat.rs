//! Hit validation rules: attack speed, reach, blocking and health math

use std::time::Duration;

use crate::gamedata::{Bounds, GameData, GlobalSetting, RecordData, UNARMED_WEAPON_ID};
use crate::ws::protocol::HitData;

use super::form::{clamp_percentage, Form, MAX_PLAYER_BASE_ID};
use super::inventory::{Equipment, Worn};
use super::math::Vec3;

/// Width of an exterior cell in world units
pub const EXTERIOR_CELL_WIDTH: f32 = 4096.0;

/// Reach used for bow and crossbow shots instead of the melee radius
pub const RANGED_REACH: f32 = EXTERIOR_CELL_WIDTH * 2.0;

/// Missing reach component between the aggressor's bounds and its weapon
const BOUNDS_PATCH: f32 = 15.0;

/// Largest angle, in radians, between a target's view and its aggressor that still blocks
const BLOCK_CONE: f32 = 1.0;

/// What a hit's source turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSource {
    /// An equipped spell
    Spell,
    /// An equipped weapon, or bare hands
    Weapon { unarmed: bool },
    /// Nothing the aggressor has equipped
    Unknown,
}

/// Combat rules shared by the hit and spell handlers
pub struct CombatRules;

impl CombatRules {
    pub fn is_unarmed(source: u32) -> bool {
        source == UNARMED_WEAPON_ID
    }

    pub fn classify_source(data: &dyn GameData, equipment: &Equipment, source: u32) -> HitSource {
        let is_spell = matches!(data.lookup(source).map(|r| &r.data), Some(RecordData::Spell(_)));
        if is_spell && equipment.is_spell_equipped(source) {
            return HitSource::Spell;
        }
        let unarmed = Self::is_unarmed(source);
        if unarmed || equipment.inv.has_item(source) {
            return HitSource::Weapon { unarmed };
        }
        HitSource::Unknown
    }

    /// Shortest time between two accepted hits with a weapon of the given speed, in seconds
    pub fn min_attack_interval(speed: f32) -> f32 {
        let base = 1.1 * (1.0 / speed);
        let cut = if speed <= 0.75 { 0.45 } else { 0.3 };
        base - base * cut
    }

    /// `elapsed` is the time since the aggressor's last accepted hit, if any
    pub fn can_hit(speed: f32, elapsed: Option<Duration>) -> bool {
        match elapsed {
            Some(elapsed) => elapsed.as_secs_f32() >= Self::min_attack_interval(speed),
            None => true,
        }
    }

    /// Bow or crossbow shot that isn't a bash
    pub fn is_ranged_shot(data: &dyn GameData, hit: &HitData) -> bool {
        !hit.is_bash_attack
            && data
                .weapon(hit.source)
                .is_some_and(|weapon| weapon.anim_type.is_ranged())
    }

    /// Creature bounds are unreliable, so reach is only enforced between player-like actors
    pub fn reach_hotfix_mult(aggressor_base: u32, target_base: u32) -> f32 {
        if aggressor_base <= MAX_PLAYER_BASE_ID && target_base <= MAX_PLAYER_BASE_ID {
            1.0
        } else {
            f32::INFINITY
        }
    }

    /// Melee reach of `source` in the aggressor's hands, before the hotfix multiplier
    pub fn reach(data: &dyn GameData, aggressor: &Form, source: u32) -> f32 {
        if Self::is_unarmed(source) {
            return aggressor
                .as_actor()
                .and_then(|a| data.race(a.race_id))
                .map(|race| race.unarmed_reach)
                .unwrap_or(0.0);
        }
        let weapon_reach = data.weapon(source).map(|w| w.reach).unwrap_or(0.0);
        weapon_reach * data.global(GlobalSetting::CombatDistance)
    }

    pub fn bounds_of(data: &dyn GameData, form: &Form) -> Bounds {
        data.npc(form.base_id).map(|npc| npc.bounds).unwrap_or_default()
    }

    /// Squared distance from the aggressor's weapon tip to the target's
    /// rotated bounding box; 0 when inside.
    pub fn sqr_distance_to_bounds(
        aggressor_pos: Vec3,
        aggressor_rot: Vec3,
        aggressor_bounds: &Bounds,
        target_pos: Vec3,
        target_rot: Vec3,
        target_bounds: &Bounds,
    ) -> f32 {
        // "Y" is the face of a character
        let angle_z = 90.0 - target_rot.z;

        let tip = Vec3::new(
            BOUNDS_PATCH + f32::from(aggressor_bounds.pos2[1]),
            0.0,
            f32::from(aggressor_bounds.pos2[2]),
        );
        let mut relative = aggressor_pos - target_pos;
        relative += tip.rotate_z(aggressor_rot.z);
        let pos = relative.rotate_z(angle_z);

        let mut sqr = 0.0;
        for axis in 0..3 {
            let lo = f32::from(target_bounds.pos1[axis]);
            let hi = f32::from(target_bounds.pos2[axis]);
            let value = pos[axis];
            if lo <= value && value <= hi {
                continue;
            }
            let corner = if value > 0.0 { hi } else { lo };
            sqr += (value - corner) * (value - corner);
        }
        sqr
    }

    /// Whether the target is close enough for the hit. Ranged shots only
    /// need to land within two cells.
    pub fn is_distance_valid(data: &dyn GameData, aggressor: &Form, target: &Form, hit: &HitData) -> bool {
        let sqr_distance = Self::sqr_distance_to_bounds(
            aggressor.pos,
            aggressor.rot,
            &Self::bounds_of(data, aggressor),
            target.pos,
            target.rot,
            &Self::bounds_of(data, target),
        );

        if Self::is_ranged_shot(data, hit) {
            return RANGED_REACH * RANGED_REACH > sqr_distance;
        }

        let mult = Self::reach_hotfix_mult(aggressor.base_id, target.base_id);
        if mult.is_infinite() {
            return true;
        }
        let reach = mult * Self::reach(data, aggressor, hit.source);
        reach * reach > sqr_distance
    }

    /// Aggressor stands in front of the target, within the block cone
    pub fn should_be_blocked(aggressor_pos: Vec3, target_pos: Vec3, target_rot: Vec3) -> bool {
        let view = Vec3::view_direction(&target_rot);
        let to_aggressor = aggressor_pos - target_pos;
        let dot = view.dot(&to_aggressor);
        if dot <= 0.0 {
            return false;
        }
        let angle = (dot / (view.length() * to_aggressor.length())).acos();
        angle < BLOCK_CONE
    }

    /// A worn armor piece occupies the shield slot
    pub fn is_blocking_by_shield(data: &dyn GameData, equipment: &Equipment) -> bool {
        equipment
            .inv
            .entries
            .iter()
            .filter(|e| e.worn != Worn::None)
            .filter_map(|e| data.armor(e.base_id))
            .any(|armor| armor.is_shield())
    }

    /// Ranged attacks pass a melee block unless the target holds a shield
    pub fn resolve_block(data: &dyn GameData, aggressor: &Form, target: &Form, hit: &HitData) -> bool {
        let Some(target_actor) = target.as_actor() else {
            return false;
        };
        if !target_actor.block_active || !Self::should_be_blocked(aggressor.pos, target.pos, target.rot) {
            return false;
        }
        !Self::is_ranged_shot(data, hit) || Self::is_blocking_by_shield(data, &target_actor.equipment)
    }

    /// New health percentage after `damage`. A record without base health takes no damage.
    pub fn health_after_damage(current: f32, damage: f32, base_health: f32) -> f32 {
        if base_health <= 0.0 || base_health.is_nan() {
            return clamp_percentage(current);
        }
        clamp_percentage(current - damage / base_health)
    }
}
