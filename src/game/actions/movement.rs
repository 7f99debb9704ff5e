use std::time::Instant;

use tracing::debug;

use crate::game::error::ActionError;
use crate::game::form::{ActorState, AnimationData, AnimationFlags, BLOCK_RESET_COUNT};
use crate::game::math::Vec3;
use crate::game::movement::{MovementValidator, MovementVerdict};
use crate::game::sessions::UserId;
use crate::game::GameServer;
use crate::ws::protocol::{ServerMsg, UpdateAnimationMsg, UpdateMovementMsg};

const STANDING_RUN_MODE: &str = "Standing";

/// Update block stance from animation graph events
fn process_animation(actor: &mut ActorState, data: &AnimationData) {
    if data.anim_event_name.eq_ignore_ascii_case("blockStart") {
        actor.block_active = true;
        actor.reset_block_count();
    } else if data.anim_event_name.eq_ignore_ascii_case("blockStop") {
        actor.block_active = false;
    }
}

impl GameServer {
    pub(super) fn on_update_movement(
        &mut self,
        user_id: UserId,
        raw: &[u8],
        msg: UpdateMovementMsg,
        now: Instant,
    ) -> Result<(), ActionError> {
        let Some(form_id) = self.send_to_neighbours(user_id, msg.idx, raw, false) else {
            return Ok(());
        };
        let is_me = self.actor_by_user(user_id) == Some(form_id);
        let elapsed = self
            .world
            .last_movement(msg.idx)
            .map(|last| now.saturating_duration_since(last));
        let max_speed = self.settings.max_movement_speed;
        let data = msg.data;

        let Some(form) = self.world.lookup_by_id_mut(form_id) else {
            return Ok(());
        };
        let (idx, current_pos, current_rot, current_cell) =
            (form.idx, form.pos, form.rot, form.cell_or_world);
        let Some(actor) = form.as_actor_mut() else {
            return Ok(());
        };

        let teleport_flag = std::mem::take(&mut actor.teleport_flag);
        let claimed_pos = if teleport_flag { Vec3::REALLY_WRONG } else { data.pos };
        let verdict = MovementValidator::validate(
            current_pos,
            current_cell,
            claimed_pos,
            data.world_or_cell,
            elapsed,
            max_speed,
        );

        if let MovementVerdict::Rejected(reason) = verdict {
            debug!(
                user_id,
                form_id = %format_args!("{:x}", form_id),
                %reason,
                "Movement rejected"
            );
            // Bystanders never see the correction
            if is_me {
                self.send_msg(
                    user_id,
                    &ServerMsg::Teleport {
                        idx,
                        pos: current_pos,
                        rot: current_rot,
                        world_or_cell: current_cell,
                    },
                    true,
                );
            }
            return Ok(());
        }

        if data.is_blocking {
            actor.reset_block_count();
        } else {
            actor.increase_block_count();
        }
        actor.anim = AnimationFlags {
            in_jump_state: data.is_in_jump_state,
            weap_drawn: data.is_weap_drawn,
            is_blocking: data.is_blocking,
        };
        if actor.block_count == BLOCK_RESET_COUNT {
            actor.block_active = false;
            actor.reset_block_count();
        }
        if data.run_mode != STANDING_RUN_MODE {
            // Otherwise people slide in animations after leaving furniture
            actor.last_anim_event = None;
        }

        let accepted = verdict == MovementVerdict::Accepted;
        if accepted {
            form.pos = data.pos;
            form.rot = data.rot;
        }

        self.world.touch_movement(idx, now);
        if accepted {
            self.world
                .update_neighbours(form_id, self.settings.neighbour_radius);
        }
        Ok(())
    }

    pub(super) fn on_update_animation(
        &mut self,
        user_id: UserId,
        raw: &[u8],
        msg: UpdateAnimationMsg,
    ) -> Result<(), ActionError> {
        let Some(my_actor) = self.actor_by_user(user_id) else {
            return Ok(());
        };
        let Some(target) = self.send_to_neighbours(user_id, msg.idx, raw, false) else {
            return Ok(());
        };

        // Hosted actors only get the relay
        if target != my_actor {
            return Ok(());
        }

        if let Some(actor) = self
            .world
            .lookup_by_id_mut(target)
            .and_then(|f| f.as_actor_mut())
        {
            process_animation(actor, &msg.data);
            actor.last_anim_event = Some(msg.data);
        }
        Ok(())
    }

    pub(super) fn on_update_anim_variables(&mut self, user_id: UserId, raw: &[u8]) -> Result<(), ActionError> {
        let idx = self
            .actor_by_user(user_id)
            .and_then(|id| self.world.lookup_by_id(id))
            .map(|f| f.idx)
            .ok_or(ActionError::NoActorAttached {
                context: "Unable to update animation variables",
                user_id,
            })?;
        self.send_to_neighbours(user_id, idx, raw, false);
        Ok(())
    }
}
