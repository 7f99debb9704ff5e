//! Damage model for weapon and spell hits

use crate::gamedata::{GameData, UNARMED_WEAPON_ID};
use crate::ws::protocol::{HitData, SpellCastData};

use super::form::Form;
use super::inventory::Worn;

const POWER_ATTACK_MULT: f32 = 2.0;
const SNEAK_ATTACK_MULT: f32 = 3.0;
/// Fraction of damage that passes through a block
const BLOCKED_DAMAGE_MULT: f32 = 0.3;
const ARMOR_SCALING_FACTOR: f32 = 0.12;
/// Armor reduction cap, in percent
const MAX_ARMOR_REDUCTION: f32 = 80.0;

/// Computes raw damage for a hit; the caller clamps and applies it
pub trait DamageModel: Send + Sync {
    fn weapon_damage(&self, data: &dyn GameData, aggressor: &Form, target: &Form, hit: &HitData) -> f32;

    fn spell_damage(
        &self,
        data: &dyn GameData,
        aggressor: &Form,
        target: &Form,
        cast: &SpellCastData,
    ) -> f32;
}

/// Record-driven damage with power/sneak/block multipliers and worn armor reduction
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDamageModel;

impl DefaultDamageModel {
    fn armor_reduction(data: &dyn GameData, target: &Form) -> f32 {
        let Some(actor) = target.as_actor() else {
            return 0.0;
        };
        let rating: f32 = actor
            .equipment
            .inv
            .entries
            .iter()
            .filter(|e| e.worn != Worn::None)
            .filter_map(|e| data.armor(e.base_id))
            .map(|a| a.rating)
            .sum();
        (rating * ARMOR_SCALING_FACTOR).min(MAX_ARMOR_REDUCTION) / 100.0
    }
}

impl DamageModel for DefaultDamageModel {
    fn weapon_damage(&self, data: &dyn GameData, aggressor: &Form, target: &Form, hit: &HitData) -> f32 {
        let base = if hit.source == UNARMED_WEAPON_ID {
            aggressor
                .as_actor()
                .and_then(|a| data.race(a.race_id))
                .map(|r| r.unarmed_damage)
                .unwrap_or(0.0)
        } else {
            data.weapon(hit.source).map(|w| w.damage).unwrap_or(0.0)
        };

        let mut damage = base;
        if hit.is_power_attack {
            damage *= POWER_ATTACK_MULT;
        }
        if hit.is_sneak_attack {
            damage *= SNEAK_ATTACK_MULT;
        }
        if hit.is_hit_blocked {
            damage *= BLOCKED_DAMAGE_MULT;
        }
        damage * (1.0 - Self::armor_reduction(data, target))
    }

    fn spell_damage(
        &self,
        data: &dyn GameData,
        _aggressor: &Form,
        _target: &Form,
        cast: &SpellCastData,
    ) -> f32 {
        match data.lookup(cast.spell).map(|r| &r.data) {
            Some(crate::gamedata::RecordData::Spell(spell)) => spell.damage,
            _ => 0.0,
        }
    }
}
