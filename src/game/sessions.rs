//! User ↔ controlled actor bindings

use std::collections::HashMap;

/// Connection identifier assigned by the transport
pub type UserId = u16;

/// Bidirectional map of users and the actors they directly control
#[derive(Debug, Default)]
pub struct Sessions {
    user_to_actor: HashMap<UserId, u32>,
    actor_to_user: HashMap<u32, UserId>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor_by_user(&self, user_id: UserId) -> Option<u32> {
        self.user_to_actor.get(&user_id).copied()
    }

    pub fn user_by_actor(&self, form_id: u32) -> Option<UserId> {
        self.actor_to_user.get(&form_id).copied()
    }

    /// Bind `user_id` to `form_id`, dropping whatever either side was bound to.
    /// Returns the user that previously controlled the actor, if it was someone else.
    pub fn attach(&mut self, user_id: UserId, form_id: u32) -> Option<UserId> {
        self.detach_user(user_id);
        let previous = self.actor_to_user.remove(&form_id);
        if let Some(previous) = previous {
            self.user_to_actor.remove(&previous);
        }
        self.user_to_actor.insert(user_id, form_id);
        self.actor_to_user.insert(form_id, user_id);
        previous.filter(|p| *p != user_id)
    }

    pub fn detach_user(&mut self, user_id: UserId) -> Option<u32> {
        let form_id = self.user_to_actor.remove(&user_id)?;
        self.actor_to_user.remove(&form_id);
        Some(form_id)
    }

    pub fn len(&self) -> usize {
        self.user_to_actor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_to_actor.is_empty()
    }
}
