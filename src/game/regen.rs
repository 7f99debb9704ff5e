//! Regeneration-aware cropping of client-reported actor values

use std::time::Duration;

use crate::gamedata::BaseActorValues;

use super::form::{clamp_percentage, ActorValue, ActorValues};
use super::math::is_nearly_equal;

/// Outcome of cropping a `changeValues` claim
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedValues {
    /// Values to store
    pub values: ActorValues,
    /// Values whose claim differed from the stored one
    pub changed: Vec<ActorValue>,
    /// The stored values differ from the claim, so clients must be corrected
    pub needs_push: bool,
}

/// Seconds of regeneration a client may claim since the last stored update.
///
/// Damage, respawn and accepted claims all stamp the update time, so `None`
/// only happens while an actor still holds its spawn values. Those are not
/// limited: there is nothing the client could have lost yet.
pub fn period_after_last_regen(elapsed: Option<Duration>) -> f32 {
    elapsed.map_or(f32::INFINITY, |e| e.as_secs_f32())
}

/// Allow a claimed value to rise at most by what `regen_percent` per second
/// could restore in `seconds`; drops are always allowed.
///
/// The per-value rate is the only damping applied. Each of health, magicka
/// and stamina uses its own base regen rate, so a fast stamina regen never
/// lets health climb faster. No separate cooldown is kept between claims.
pub fn crop_regeneration(claimed: f32, old: f32, seconds: f32, regen_percent: f32) -> f32 {
    if seconds.is_infinite() {
        return clamp_percentage(claimed);
    }
    let max_allowed = old + seconds.max(0.0) * regen_percent.max(0.0) / 100.0;
    clamp_percentage(claimed.min(max_allowed))
}

/// Crop every changed value of `claimed` against `current`
pub fn crop_actor_values(
    claimed: ActorValues,
    current: ActorValues,
    base: &BaseActorValues,
    seconds: f32,
) -> CroppedValues {
    let mut values = current;
    let mut changed = Vec::new();

    let mut crop = |av: ActorValue, slot: &mut f32, claim: f32, regen: f32| {
        if !is_nearly_equal(*slot, claim) {
            changed.push(av);
            *slot = crop_regeneration(claim, *slot, seconds, regen);
        }
    };
    crop(
        ActorValue::Health,
        &mut values.health_percentage,
        claimed.health_percentage,
        base.health_regen,
    );
    crop(
        ActorValue::Magicka,
        &mut values.magicka_percentage,
        claimed.magicka_percentage,
        base.magicka_regen,
    );
    crop(
        ActorValue::Stamina,
        &mut values.stamina_percentage,
        claimed.stamina_percentage,
        base.stamina_regen,
    );

    let needs_push = !is_nearly_equal(values.health_percentage, claimed.health_percentage)
        || !is_nearly_equal(values.magicka_percentage, claimed.magicka_percentage)
        || !is_nearly_equal(values.stamina_percentage, claimed.stamina_percentage);

    CroppedValues {
        values,
        changed,
        needs_push,
    }
}
