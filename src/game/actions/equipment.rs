use tracing::debug;

use crate::gamedata::RecordData;
use crate::game::error::ActionError;
use crate::game::events::GameEvent;
use crate::game::sessions::UserId;
use crate::game::GameServer;
use crate::ws::protocol::{UpdateAppearanceMsg, UpdateEquipmentMsg};

impl GameServer {
    /// Appearance changes are only taken while the race menu is open
    pub(super) fn on_update_appearance(
        &mut self,
        user_id: UserId,
        raw: &[u8],
        msg: UpdateAppearanceMsg,
    ) -> Result<(), ActionError> {
        let Some(actor_id) = self.actor_by_user(user_id) else {
            return Ok(());
        };
        let Some(actor) = self
            .world
            .lookup_by_id_mut(actor_id)
            .and_then(|f| f.as_actor_mut())
        else {
            return Ok(());
        };

        let allowed = actor.race_menu_open;
        if allowed {
            actor.race_menu_open = false;
            if msg.data.race_id != 0 {
                actor.race_id = msg.data.race_id;
            }
            actor.appearance = Some(msg.data.clone());
            self.send_to_neighbours(user_id, msg.idx, raw, true);
        } else {
            debug!(user_id, "Appearance update outside of race menu");
        }

        self.events.fire(GameEvent::UpdateAppearanceAttempt {
            actor: actor_id,
            appearance: msg.data,
            allowed,
        });
        Ok(())
    }

    /// Every equipped spell must be learned and every item owned
    pub(super) fn on_update_equipment(
        &mut self,
        user_id: UserId,
        raw: &[u8],
        msg: UpdateEquipmentMsg,
    ) -> Result<(), ActionError> {
        let Some(actor_id) = self.actor_by_user(user_id) else {
            return Ok(());
        };
        let Some(form) = self.world.lookup_by_id(actor_id) else {
            return Ok(());
        };
        let Some(actor) = form.as_actor() else {
            return Ok(());
        };

        let equipment = msg.data;
        let mut allowed = true;

        for spell in equipment.spells() {
            if !actor.is_spell_learned(spell) {
                debug!(spell = %format_args!("{:x}", spell), "Equipment refused, spell not learned");
                allowed = false;
            }
        }

        if let Some(missing) = equipment
            .inv
            .entries
            .iter()
            .find(|e| !form.inventory.has_item(e.base_id))
        {
            debug!(
                base_id = %format_args!("{:x}", missing.base_id),
                "Equipment refused, item not in inventory"
            );
            allowed = false;
        }

        if allowed {
            self.send_to_neighbours(user_id, msg.idx, raw, true);
            if let Some(actor) = self
                .world
                .lookup_by_id_mut(actor_id)
                .and_then(|f| f.as_actor_mut())
            {
                actor.equipment = equipment.clone();
            }
        }

        self.events.fire(GameEvent::UpdateEquipmentAttempt {
            actor: actor_id,
            equipment,
            allowed,
        });
        Ok(())
    }

    /// Item use: potions are drunk here, anything else goes to the item service
    pub(super) fn on_equip(&mut self, user_id: UserId, base_id: u32) -> Result<(), ActionError> {
        let actor_id = self.actor_by_user(user_id).ok_or(ActionError::NoActorAttached {
            context: "Unable to equip",
            user_id,
        })?;
        let is_potion = matches!(
            self.game_data.lookup(base_id).map(|r| &r.data),
            Some(RecordData::Potion)
        );
        let Some(form) = self.world.lookup_by_id_mut(actor_id) else {
            return Err(ActionError::FormNotFound(actor_id));
        };

        if !form.inventory.has_item(base_id) {
            debug!(
                actor = %format_args!("{:x}", actor_id),
                base_id = %format_args!("{:x}", base_id),
                "Equip of an item not in inventory"
            );
            return Ok(());
        }

        if is_potion {
            form.inventory.remove_item(base_id, 1);
            self.events.fire(GameEvent::EatItem {
                actor: actor_id,
                base_id,
            });
        } else {
            self.services.use_item(actor_id, base_id);
        }
        Ok(())
    }
}
