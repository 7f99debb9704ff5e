//! Per-message handlers. Every inbound message is processed to completion
//! against the world before the next one is looked at.
//!
//! Missing-actor policy differs by kind: activate, finishSpSnippet, onEquip,
//! changeValues, onHit, updateAnimVariables, spellCast and host return
//! [`ActionError::NoActorAttached`]; every other kind logs and ignores.

mod combat;
mod equipment;
mod items;
mod movement;
mod scripting;
mod values;

use tracing::{debug, error, trace};

use crate::ws::protocol::ClientMsg;

use super::authority::HostOutcome;
use super::error::ActionError;
use super::sessions::UserId;
use super::{GameServer, InboundMessage};

impl GameServer {
    /// Apply one inbound message
    pub fn handle(&mut self, input: InboundMessage) -> Result<(), ActionError> {
        let InboundMessage {
            user_id,
            msg,
            raw,
            received_at: now,
        } = input;
        trace!(user_id, kind = msg.kind(), "Inbound message");

        match msg {
            ClientMsg::UpdateMovement(m) => self.on_update_movement(user_id, &raw, m, now),
            ClientMsg::UpdateAnimation(m) => self.on_update_animation(user_id, &raw, m),
            ClientMsg::UpdateAppearance(m) => self.on_update_appearance(user_id, &raw, m),
            ClientMsg::UpdateEquipment(m) => self.on_update_equipment(user_id, &raw, m),
            ClientMsg::Activate(m) => self.on_activate(user_id, m.data),
            ClientMsg::PutItem(m) => self.on_put_item(user_id, m),
            ClientMsg::TakeItem(m) => self.on_take_item(user_id, m, now),
            ClientMsg::DropItem(m) => self.on_drop_item(user_id, m),
            ClientMsg::PlayerBowShot(m) => self.on_player_bow_shot(user_id, m),
            ClientMsg::FinishSpSnippet(m) => self.on_finish_sp_snippet(user_id, m),
            ClientMsg::OnEquip(m) => self.on_equip(user_id, m.base_id),
            ClientMsg::ConsoleCommand(m) => self.on_console_command(user_id, m.data),
            ClientMsg::CraftItem(m) => self.on_craft_item(user_id, m.data),
            ClientMsg::Host(m) => self.on_host_attempt(user_id, m.remote_id, now),
            ClientMsg::CustomEvent(m) => self.on_custom_event(user_id, m),
            ClientMsg::CustomPacket(m) => self.on_custom_packet(user_id, m.content),
            ClientMsg::ChangeValues(m) => self.on_change_values(user_id, m.data, now),
            ClientMsg::OnHit(m) => self.on_hit(user_id, m.data, now),
            ClientMsg::UpdateAnimVariables(_) => self.on_update_anim_variables(user_id, &raw),
            ClientMsg::SpellCast(m) => self.on_spell_cast(user_id, &raw, m.data, now),
            ClientMsg::Unknown => {
                error!(user_id, message = %String::from_utf8_lossy(&raw), "Got unhandled message");
                Ok(())
            }
        }
    }

    fn on_host_attempt(
        &mut self,
        user_id: UserId,
        remote_id: u32,
        now: std::time::Instant,
    ) -> Result<(), ActionError> {
        match self.request_host(user_id, remote_id, now)? {
            HostOutcome::Granted { .. } => {}
            outcome => debug!(
                user_id,
                remote = %format_args!("{:x}", remote_id),
                ?outcome,
                "Host attempt denied"
            ),
        }
        Ok(())
    }
}
