//! Relaying inbound messages to the users listening to an actor

use tracing::{error, trace, warn};

use super::sessions::UserId;
use super::GameServer;

/// Outbound transport capability; sends are fire-and-forget
pub trait SendTarget: Send + Sync {
    fn send(&self, user_id: UserId, data: &[u8], reliable: bool);
}

impl GameServer {
    /// Relay `raw` unmodified to every connected listener of the actor at `idx`.
    ///
    /// The sender must own or host the actor; otherwise nothing is relayed,
    /// the sender is told to stop hosting, and `None` is returned.
    pub fn send_to_neighbours(
        &mut self,
        user_id: UserId,
        idx: u32,
        raw: &[u8],
        reliable: bool,
    ) -> Option<u32> {
        if self.actor_by_user(user_id).is_none() {
            warn!(user_id, "SendToNeighbours - No actor assigned to user");
            return None;
        }

        let Some(form_id) = self
            .world
            .lookup_by_idx(idx)
            .filter(|f| f.is_actor())
            .map(|f| f.form_id)
        else {
            error!(user_id, idx, "SendToNeighbours - Target actor doesn't exist");
            return None;
        };

        if !self.enforce_authority(user_id, form_id) {
            return None;
        }

        let Some(form) = self.world.lookup_by_id(form_id) else {
            return None;
        };
        let mut relayed = 0usize;
        for listener in form.listeners() {
            if let Some(target_user) = self.sessions.user_by_actor(listener) {
                self.send_target.send(target_user, raw, reliable);
                relayed += 1;
            }
        }
        trace!(
            user_id,
            form_id = %format_args!("{:x}", form_id),
            relayed,
            "Relayed to neighbours"
        );

        Some(form_id)
    }
}
