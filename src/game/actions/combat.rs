use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::gamedata::base_actor_values;
use crate::game::combat::{CombatRules, HitSource, EXTERIOR_CELL_WIDTH};
use crate::game::error::ActionError;
use crate::game::events::ScriptValue;
use crate::game::form::{ActorValue, SELF_FORM_ID};
use crate::game::sessions::UserId;
use crate::game::GameServer;
use crate::ws::protocol::{CastHand, HitData, SpellCastData};

const HEALTH_ONLY: [ActorValue; 1] = [ActorValue::Health];

impl GameServer {
    /// Resolve a client-relative actor id: 0x14 and the user's own actor
    /// both mean "me"; anything else must be hosted by me.
    fn resolve_acting_actor(&self, my_actor: u32, claimed: u32) -> Result<Option<u32>, ActionError> {
        if claimed == SELF_FORM_ID || claimed == my_actor {
            return Ok(Some(my_actor));
        }
        let form = self
            .world
            .lookup_by_id(claimed)
            .ok_or(ActionError::FormNotFound(claimed))?;
        if !form.is_actor() {
            return Err(ActionError::NotAnActor(claimed));
        }
        if self.world.hoster_of(claimed) != Some(my_actor) {
            return Ok(None);
        }
        Ok(Some(claimed))
    }

    pub(super) fn on_hit(&mut self, user_id: UserId, mut hit: HitData, now: Instant) -> Result<(), ActionError> {
        let my_actor = self.actor_by_user(user_id).ok_or(ActionError::NoActorAttached {
            context: "Unable to hit",
            user_id,
        })?;

        let Some(aggressor_id) = self.resolve_acting_actor(my_actor, hit.aggressor)? else {
            error!(
                user_id,
                aggressor = %format_args!("{:x}", hit.aggressor),
                "No permission to send OnHit with this aggressor"
            );
            return Ok(());
        };
        hit.aggressor = aggressor_id;
        if hit.target == SELF_FORM_ID {
            hit.target = my_actor;
        }

        let data = Arc::clone(&self.game_data);
        let (Some(aggressor), Some(target)) = (
            self.world.lookup_by_id(aggressor_id),
            self.world.lookup_by_id(hit.target),
        ) else {
            error!(target = %format_args!("{:x}", hit.target), "Hit target doesn't exist");
            return Ok(());
        };

        if aggressor.cell_or_world != target.cell_or_world {
            error!(
                aggressor = %format_args!("{:x}", aggressor_id),
                target = %format_args!("{:x}", hit.target),
                aggressor_cell = %format_args!("{:x}", aggressor.cell_or_world),
                target_cell = %format_args!("{:x}", target.cell_or_world),
                "Aggressor and target are in different cells or worlds"
            );
            return Ok(());
        }

        if !CombatRules::is_ranged_shot(&*data, &hit)
            && (aggressor.pos - target.pos).sqr_length() > EXTERIOR_CELL_WIDTH * EXTERIOR_CELL_WIDTH
        {
            error!(
                aggressor = %format_args!("{:x}", aggressor_id),
                target = %format_args!("{:x}", hit.target),
                "Aggressor and target are too distant"
            );
            return Ok(());
        }

        let Some(aggressor_actor) = aggressor.as_actor() else {
            return Err(ActionError::NotAnActor(aggressor_id));
        };
        if aggressor_actor.is_dead {
            debug!(
                aggressor = %format_args!("{:x}", aggressor_id),
                "Dead actor can't attack, requesting respawn"
            );
            self.request_respawn(aggressor_id, now);
            return Ok(());
        }

        match CombatRules::classify_source(&*data, &aggressor_actor.equipment, hit.source) {
            HitSource::Spell => self.on_spell_hit(hit, now),
            HitSource::Weapon { .. } => self.on_weapon_hit(hit, now),
            HitSource::Unknown => {
                debug!(
                    aggressor = %format_args!("{:x}", aggressor_id),
                    source = %format_args!("{:x}", hit.source),
                    has_item = aggressor.inventory.has_item(hit.source),
                    "Hit source is not equipped"
                );
                Ok(())
            }
        }
    }

    fn on_weapon_hit(&mut self, mut hit: HitData, now: Instant) -> Result<(), ActionError> {
        let data = Arc::clone(&self.game_data);
        let (Some(aggressor), Some(target)) = (
            self.world.lookup_by_id(hit.aggressor),
            self.world.lookup_by_id(hit.target),
        ) else {
            return Ok(());
        };
        let Some(target_actor) = target.as_actor() else {
            // Nothing to damage
            self.send_on_hit_event(&hit);
            return Ok(());
        };

        let speed = data
            .weapon(hit.source)
            .map(|w| w.speed)
            .ok_or(ActionError::MissingRecord {
                id: hit.source,
                kind: "WEAP",
            })?;
        let elapsed = aggressor
            .as_actor()
            .and_then(|a| a.last_hit_time)
            .map(|last| now.saturating_duration_since(last));
        if !CombatRules::can_hit(speed, elapsed) {
            debug!(
                target = %format_args!("{:x}", hit.target),
                source = %format_args!("{:x}", hit.source),
                elapsed = ?elapsed,
                expected = CombatRules::min_attack_interval(speed),
                "Target is not available for attack due to fast attack speed"
            );
            return Ok(());
        }

        if !CombatRules::is_distance_valid(&*data, aggressor, target, &hit) {
            debug!(
                aggressor = %format_args!("{:x}", hit.aggressor),
                target = %format_args!("{:x}", hit.target),
                reach = CombatRules::reach(&*data, aggressor, hit.source),
                "Target is out of reach"
            );
            return Ok(());
        }

        if CombatRules::resolve_block(&*data, aggressor, target, &hit) {
            hit.is_hit_blocked = true;
        }

        let damage = self
            .damage_model
            .weapon_damage(&*data, aggressor, target, &hit)
            .max(0.0);
        let base_health = base_actor_values(&*data, target.base_id, target_actor.race_id, &target_actor.template_chain).health;
        let was = target_actor.values.health_percentage;
        let mut values = target_actor.values;
        values.health_percentage = CombatRules::health_after_damage(was, damage, base_health);

        self.net_set_percentages(hit.target, values, Some(hit.aggressor), &HEALTH_ONLY, now);
        if let Some(aggressor) = self
            .world
            .lookup_by_id_mut(hit.aggressor)
            .and_then(|f| f.as_actor_mut())
        {
            aggressor.last_hit_time = Some(now);
        }

        debug!(
            target = %format_args!("{:x}", hit.target),
            damage,
            was,
            health = values.health_percentage,
            base_health,
            "Weapon hit"
        );
        self.send_on_hit_event(&hit);
        Ok(())
    }

    fn on_spell_hit(&mut self, hit: HitData, now: Instant) -> Result<(), ActionError> {
        let data = Arc::clone(&self.game_data);
        let (Some(aggressor), Some(target)) = (
            self.world.lookup_by_id(hit.aggressor),
            self.world.lookup_by_id(hit.target),
        ) else {
            return Ok(());
        };
        let Some(target_actor) = target.as_actor() else {
            self.send_on_hit_event(&hit);
            return Ok(());
        };

        let cast = SpellCastData {
            caster: hit.aggressor,
            target: hit.target,
            spell: hit.source,
            is_dual_casting: false,
            is_interrupt_cast: false,
            cast_hand: CastHand::Left,
        };
        let damage = self
            .damage_model
            .spell_damage(&*data, aggressor, target, &cast)
            .max(0.0);
        let base_health = base_actor_values(&*data, target.base_id, target_actor.race_id, &target_actor.template_chain).health;
        let mut values = target_actor.values;
        values.health_percentage = CombatRules::health_after_damage(values.health_percentage, damage, base_health);

        self.net_set_percentages(hit.target, values, Some(hit.aggressor), &HEALTH_ONLY, now);

        info!(
            target = %format_args!("{:x}", hit.target),
            spell = %format_args!("{:x}", hit.source),
            caster = %format_args!("{:x}", hit.aggressor),
            damage,
            "Spell hit"
        );
        self.send_on_hit_event(&hit);
        Ok(())
    }

    /// Script `OnHit` on the target: aggressor, source, projectile, then the four flags
    fn send_on_hit_event(&self, hit: &HitData) {
        let args = [
            ScriptValue::ObjectRef(hit.aggressor),
            ScriptValue::Record(hit.source),
            ScriptValue::None,
            ScriptValue::Bool(hit.is_power_attack),
            ScriptValue::Bool(hit.is_sneak_attack),
            ScriptValue::Bool(hit.is_bash_attack),
            ScriptValue::Bool(hit.is_hit_blocked),
        ];
        self.events.send_script_event(hit.target, "OnHit", &args);
    }

    pub(super) fn on_spell_cast(
        &mut self,
        user_id: UserId,
        raw: &[u8],
        mut cast: SpellCastData,
        now: Instant,
    ) -> Result<(), ActionError> {
        let my_actor = self.actor_by_user(user_id).ok_or(ActionError::NoActorAttached {
            context: "Unable to cast",
            user_id,
        })?;

        let Some(caster_id) = self.resolve_acting_actor(my_actor, cast.caster)? else {
            error!(
                user_id,
                caster = %format_args!("{:x}", cast.caster),
                "No permission to send OnSpellCast with this caster"
            );
            return Ok(());
        };
        cast.caster = caster_id;
        if cast.target == SELF_FORM_ID {
            cast.target = my_actor;
        }

        let Some(caster) = self.world.lookup_by_id(caster_id) else {
            return Err(ActionError::FormNotFound(caster_id));
        };
        let Some(caster_actor) = caster.as_actor() else {
            return Err(ActionError::NotAnActor(caster_id));
        };
        if caster_actor.is_dead {
            info!(
                caster = %format_args!("{:x}", caster_id),
                "Dead actor can't cast, requesting respawn"
            );
            self.request_respawn(caster_id, now);
            return Ok(());
        }
        if !caster_actor.equipment.is_spell_equipped(cast.spell) {
            info!(spell = %format_args!("{:x}", cast.spell), "Cast spell is not equipped");
            return Ok(());
        }

        let Some(my_idx) = self.world.lookup_by_id(my_actor).map(|f| f.idx) else {
            return Err(ActionError::FormNotFound(my_actor));
        };
        self.send_to_neighbours(user_id, my_idx, raw, false);

        if cast.is_interrupt_cast {
            return Ok(());
        }

        self.events
            .send_script_event(caster_id, "OnSpellCast", &[ScriptValue::Record(cast.spell)]);

        if self.world.lookup_by_id(cast.target).is_none() {
            info!(target = %format_args!("{:x}", cast.target), "Spell cast target doesn't exist");
        }
        Ok(())
    }
}
