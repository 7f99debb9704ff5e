//! Who may mutate which entity: direct control, hosting, and host handoff

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::ws::protocol::ServerMsg;

use super::error::ActionError;
use super::form::Form;
use super::sessions::UserId;
use super::timers::DeferredTask;
use super::GameServer;

/// A hosted form whose hoster hasn't moved it for this long may be taken over
pub const HOST_RESET_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before pushing current percentages to a new hoster
pub const HOST_RESYNC_DELAY: Duration = Duration::from_secs(1);

/// Result of checking a user's right to mutate a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// The form is the user's own actor
    SelfControlled,
    /// The user's actor is the form's hoster
    Hosted,
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoActor,
    /// Another user directly controls the form
    ControlledByOther(UserId),
    /// The form is hosted by someone else, or by nobody
    NotHoster { hoster: Option<u32> },
}

/// Result of a host request. Denials are silent for the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOutcome {
    Granted { previous: Option<u32> },
    AlreadyHosted { hoster: u32 },
    AlreadyDirectlyControlled,
}

impl GameServer {
    pub fn check_authority(&self, user_id: UserId, form_id: u32) -> Authority {
        let Some(my_actor) = self.actor_by_user(user_id) else {
            return Authority::Denied(DenyReason::NoActor);
        };
        if form_id == my_actor {
            return Authority::SelfControlled;
        }
        if let Some(owner) = self.sessions.user_by_actor(form_id) {
            return Authority::Denied(DenyReason::ControlledByOther(owner));
        }
        match self.world.hoster_of(form_id) {
            Some(hoster) if hoster == my_actor => Authority::Hosted,
            hoster => Authority::Denied(DenyReason::NotHoster { hoster }),
        }
    }

    pub fn can_mutate(&self, user_id: UserId, form_id: u32) -> bool {
        matches!(
            self.check_authority(user_id, form_id),
            Authority::SelfControlled | Authority::Hosted
        )
    }

    /// `can_mutate` plus corrective signals on denial: the requester is told to
    /// stop hosting, and a binding on a directly controlled form is dropped.
    pub(crate) fn enforce_authority(&mut self, user_id: UserId, form_id: u32) -> bool {
        match self.check_authority(user_id, form_id) {
            Authority::SelfControlled | Authority::Hosted => true,
            Authority::Denied(DenyReason::NoActor) => {
                warn!(user_id, "No actor assigned to user");
                false
            }
            Authority::Denied(DenyReason::ControlledByOther(owner)) => {
                error!(
                    user_id,
                    form_id = %format_args!("{:x}", form_id),
                    owner,
                    "No permission to update actor (already owned by another user)"
                );
                self.send_host_stop(user_id, form_id);
                self.world.clear_hoster(form_id);
                false
            }
            Authority::Denied(DenyReason::NotHoster { hoster }) => {
                error!(
                    user_id,
                    form_id = %format_args!("{:x}", form_id),
                    hoster = %format_args!("{:x}", hoster.unwrap_or(0)),
                    "No permission to update actor (not a hoster)"
                );
                self.send_host_stop(user_id, form_id);
                false
            }
        }
    }

    /// Hand simulation of `remote_id` to the user's actor if nobody controls it
    /// directly and its current hoster (if any) has gone quiet.
    pub fn request_host(
        &mut self,
        user_id: UserId,
        remote_id: u32,
        now: Instant,
    ) -> Result<HostOutcome, ActionError> {
        let me = self
            .actor_by_user(user_id)
            .ok_or(ActionError::NoActorAttached {
                context: "Unable to host",
                user_id,
            })?;

        let remote = self
            .world
            .lookup_by_id(remote_id)
            .ok_or(ActionError::FormNotFound(remote_id))?;
        let remote_idx = remote.idx;
        let remote_is_actor = remote.is_actor();

        if self.sessions.user_by_actor(remote_id).is_some() {
            return Ok(HostOutcome::AlreadyDirectlyControlled);
        }

        let previous = self.world.hoster_of(remote_id);
        let last_update = self.world.last_movement(remote_idx);
        let timed_out = last_update
            .map(|last| now.saturating_duration_since(last) > HOST_RESET_TIMEOUT)
            .unwrap_or(true);

        if let Some(hoster) = previous {
            if !timed_out {
                return Ok(HostOutcome::AlreadyHosted { hoster });
            }
        }

        info!(
            remote = %format_args!("{:x}", remote_id),
            from = %format_args!("{:x}", previous.unwrap_or(0)),
            to = %format_args!("{:x}", me),
            "Hoster changed"
        );
        self.world.set_hoster(remote_id, me);

        // Prevents too fast host switch
        self.world.touch_movement(remote_idx, now);

        if remote_is_actor {
            self.equip_best_weapon(remote_id);
        }

        let target = self.long_form_id_of(remote_id);
        self.send_msg(user_id, &ServerMsg::HostStart { target }, true);

        if remote_is_actor {
            self.world.timers.schedule(
                now,
                HOST_RESYNC_DELAY,
                DeferredTask::ResyncPercentages { form_id: remote_id },
            );
        }

        let previous_user = previous
            .filter(|prev| self.world.lookup_by_id(*prev).is_some_and(Form::is_actor))
            .and_then(|prev| self.sessions.user_by_actor(prev))
            .filter(|prev_user| *prev_user != user_id);
        if let Some(previous_user) = previous_user {
            self.send_msg(previous_user, &ServerMsg::HostStop { target }, true);
        }

        Ok(HostOutcome::Granted { previous })
    }
}
