use std::time::Instant;

use tracing::{error, trace};

use crate::gamedata::base_actor_values;
use crate::game::error::ActionError;
use crate::game::form::ActorValues;
use crate::game::regen::{crop_actor_values, period_after_last_regen};
use crate::game::sessions::UserId;
use crate::game::GameServer;
use crate::ws::protocol::ChangeValuesData;

impl GameServer {
    /// Client-reported percentages of the user's own actor. Increases are
    /// cropped to what regeneration allows since the last update.
    pub(super) fn on_change_values(
        &mut self,
        user_id: UserId,
        data: ChangeValuesData,
        now: Instant,
    ) -> Result<(), ActionError> {
        let (Some(health), Some(magicka), Some(stamina)) = (data.health, data.magicka, data.stamina) else {
            error!(
                user_id,
                health = ?data.health,
                magicka = ?data.magicka,
                stamina = ?data.stamina,
                "Partial changeValues are not supported"
            );
            return Ok(());
        };
        let claimed = ActorValues {
            health_percentage: health,
            magicka_percentage: magicka,
            stamina_percentage: stamina,
        };

        let form_id = self.actor_by_user(user_id).ok_or(ActionError::NoActorAttached {
            context: "Unable to change values",
            user_id,
        })?;
        let form = self
            .world
            .lookup_by_id(form_id)
            .ok_or(ActionError::FormNotFound(form_id))?;
        let actor = form.as_actor().ok_or(ActionError::NotAnActor(form_id))?;

        if actor.should_skip_restoration() {
            trace!(user_id, "Skipping changeValues of a dead actor");
            return Ok(());
        }

        let seconds = period_after_last_regen(
            actor
                .last_percentages_update
                .map(|last| now.saturating_duration_since(last)),
        );
        let base = base_actor_values(&*self.game_data, form.base_id, actor.race_id, &actor.template_chain);
        let cropped = crop_actor_values(claimed, actor.values, &base, seconds);

        if cropped.needs_push {
            self.net_send_change_values(form_id, &cropped.values, &cropped.changed);
        }
        if let Some(actor) = self
            .world
            .lookup_by_id_mut(form_id)
            .and_then(|f| f.as_actor_mut())
        {
            actor.set_percentages(cropped.values, now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::game::error::ActionError;
    use crate::game::form::ActorValues;
    use crate::game::testing::TestHarness;
    use crate::ws::protocol::ServerMsg;

    fn change_values(h: f32, m: f32, s: f32) -> String {
        format!(r#"{{"t":"changeValues","data":{{"health":{h},"magicka":{m},"stamina":{s}}}}}"#)
    }

    fn set_values(h: &mut TestHarness, form_id: u32, values: ActorValues) {
        let start = h.start;
        h.actor_mut(form_id).set_percentages(values, start);
    }

    #[test]
    fn unchanged_values_are_not_pushed() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);

        let msg = h.inbound(1, &change_values(1.0, 1.0, 1.0), h.start);
        h.server.handle(msg).unwrap();

        assert!(h.sent_to(1).is_empty());
        assert_eq!(h.actor(me).last_percentages_update, Some(h.start));
    }

    #[test]
    fn instant_self_heal_is_cropped_and_corrected() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        set_values(
            &mut h,
            me,
            ActorValues {
                health_percentage: 0.2,
                magicka_percentage: 1.0,
                stamina_percentage: 1.0,
            },
        );

        let msg = h.inbound(1, &change_values(1.0, 1.0, 1.0), h.start + Duration::from_secs(1));
        h.server.handle(msg).unwrap();

        let health = h.actor(me).values.health_percentage;
        assert!((health - 0.207).abs() < 1e-4, "health {health}");
        let sent = h.sent_to(1);
        let [ServerMsg::ChangeValues { data, .. }] = sent.as_slice() else {
            panic!("expected one changeValues, got {sent:?}");
        };
        assert!(data.health.is_some());
        assert_eq!(data.magicka, None);
        assert_eq!(data.stamina, None);
    }

    #[test]
    fn drops_are_accepted_silently() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        set_values(&mut h, me, ActorValues::full());

        let msg = h.inbound(1, &change_values(1.0, 0.4, 0.9), h.start + Duration::from_millis(200));
        h.server.handle(msg).unwrap();

        assert!(h.sent_to(1).is_empty());
        let values = h.actor(me).values;
        assert_eq!(values.magicka_percentage, 0.4);
        assert_eq!(values.stamina_percentage, 0.9);
    }

    #[test]
    fn dead_actor_values_are_skipped() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        {
            let actor = h.actor_mut(me);
            actor.is_dead = true;
            actor.values.health_percentage = 0.0;
        }

        let msg = h.inbound(1, &change_values(1.0, 1.0, 1.0), h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.actor(me).values.health_percentage, 0.0);
    }

    #[test]
    fn partial_update_is_ignored() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let msg = h.inbound(1, r#"{"t":"changeValues","data":{"health":0.1}}"#, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.actor(me).values, ActorValues::full());
    }

    #[test]
    fn change_values_without_actor_is_a_fault() {
        let mut h = TestHarness::new();
        let msg = h.inbound(1, &change_values(1.0, 1.0, 1.0), h.start);
        assert!(matches!(
            h.server.handle(msg),
            Err(ActionError::NoActorAttached { .. })
        ));
    }
}
