use serde_json::Value;
use tracing::debug;

use crate::game::error::ActionError;
use crate::game::events::{GameEvent, ScriptValue};
use crate::game::form::SELF_FORM_ID;
use crate::game::sessions::UserId;
use crate::game::GameServer;
use crate::ws::protocol::{ActivateData, ConsoleCommandData, CustomEventMsg, FinishSpSnippetMsg};

/// Custom event names starting with this are meant for server-side scripts
const INTERNAL_EVENT_PREFIX: char = '_';

/// Convert a snippet return value. Only integers, booleans and null are understood.
fn script_value_from_json(value: &Value) -> Result<ScriptValue, ActionError> {
    match value {
        Value::Null => Ok(ScriptValue::None),
        Value::Bool(b) => Ok(ScriptValue::Bool(*b)),
        Value::Number(n) if n.is_i64() || n.is_u64() => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(ScriptValue::Int)
            .ok_or_else(|| ActionError::UnsupportedReturnValue(format!("integer {n}"))),
        Value::Number(_) => Err(ActionError::UnsupportedReturnValue("float".into())),
        Value::String(_) => Err(ActionError::UnsupportedReturnValue("string".into())),
        Value::Array(_) => Err(ActionError::UnsupportedReturnValue("array".into())),
        Value::Object(_) => Err(ActionError::UnsupportedReturnValue("object".into())),
    }
}

impl GameServer {
    pub(super) fn on_activate(&mut self, user_id: UserId, data: ActivateData) -> Result<(), ActionError> {
        if !self.has_game_data() {
            return Err(ActionError::NoGameData);
        }
        let my_actor = self.actor_by_user(user_id).ok_or(ActionError::NoActorAttached {
            context: "Unable to activate",
            user_id,
        })?;

        let hoster = self.world.hoster_of(data.caster);
        let caster = if data.caster == SELF_FORM_ID {
            my_actor
        } else {
            data.caster
        };
        if caster != my_actor && hoster != Some(my_actor) {
            return Err(ActionError::BadHoster {
                caster: data.caster,
                expected: my_actor,
                found: hoster.unwrap_or(0),
            });
        }

        if self.world.lookup_by_id(data.target).is_none() {
            debug!(target = %format_args!("{:x}", data.target), "Activation target doesn't exist");
            return Ok(());
        }

        self.services
            .activate(caster, data.target, data.is_second_activation);

        let caster_is_actor = self
            .world
            .lookup_by_id(caster)
            .is_some_and(|f| f.is_actor());
        if hoster.is_some() && caster_is_actor {
            self.equip_best_weapon(caster);
        }
        Ok(())
    }

    pub(super) fn on_finish_sp_snippet(
        &mut self,
        user_id: UserId,
        msg: FinishSpSnippetMsg,
    ) -> Result<(), ActionError> {
        let actor = self.actor_by_user(user_id).ok_or(ActionError::NoActorAttached {
            context: "Unable to finish snippet",
            user_id,
        })?;
        let value = script_value_from_json(&msg.return_value)?;
        self.services.resolve_snippet(actor, msg.snippet_idx, value);
        Ok(())
    }

    pub(super) fn on_console_command(
        &mut self,
        user_id: UserId,
        data: ConsoleCommandData,
    ) -> Result<(), ActionError> {
        if let Some(actor) = self.actor_by_user(user_id) {
            self.services
                .execute_console_command(actor, &data.command_name, &data.args);
        }
        Ok(())
    }

    pub(super) fn on_custom_event(&mut self, user_id: UserId, msg: CustomEventMsg) -> Result<(), ActionError> {
        let Some(actor) = self.actor_by_user(user_id) else {
            return Ok(());
        };
        if !msg.event_name.starts_with(INTERNAL_EVENT_PREFIX) {
            return Ok(());
        }
        self.events.fire(GameEvent::Custom {
            actor,
            name: msg.event_name,
            args: msg.args,
        });
        Ok(())
    }

    pub(super) fn on_custom_packet(&mut self, user_id: UserId, content: Value) -> Result<(), ActionError> {
        self.events.fire(GameEvent::CustomPacket { user_id, content });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::game::testing::{ServiceCall, TestHarness, IRON_SWORD, STEEL_DAGGER};

    #[test]
    fn snippet_values() {
        assert_eq!(script_value_from_json(&json!(null)).unwrap(), ScriptValue::None);
        assert_eq!(script_value_from_json(&json!(true)).unwrap(), ScriptValue::Bool(true));
        assert_eq!(script_value_from_json(&json!(-42)).unwrap(), ScriptValue::Int(-42));
        assert!(matches!(
            script_value_from_json(&json!("text")),
            Err(ActionError::UnsupportedReturnValue(kind)) if kind == "string"
        ));
        assert!(script_value_from_json(&json!(1.5)).is_err());
        assert!(script_value_from_json(&json!(5_000_000_000u64)).is_err());
    }

    #[test]
    fn finish_snippet_resolves_through_service() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let msg = h.inbound(1, r#"{"t":"finishSpSnippet","snippetIdx":3,"returnValue":7}"#, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(
            *h.services.calls.lock(),
            vec![ServiceCall::ResolveSnippet {
                actor: me,
                snippet_idx: 3,
                value: ScriptValue::Int(7)
            }]
        );
    }

    #[test]
    fn finish_snippet_rejects_objects() {
        let mut h = TestHarness::new();
        h.server.connect_user(1);
        let msg = h.inbound(1, r#"{"t":"finishSpSnippet","snippetIdx":3,"returnValue":{"a":1}}"#, h.start);
        assert!(matches!(
            h.server.handle(msg),
            Err(ActionError::UnsupportedReturnValue(_))
        ));
        assert!(h.services.calls.lock().is_empty());
    }

    #[test]
    fn activate_as_self() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = h.spawn_chest(0x5000);

        let json = format!(r#"{{"t":"activate","data":{{"caster":20,"target":{chest}}}}}"#);
        let msg = h.inbound(1, &json, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(
            *h.services.calls.lock(),
            vec![ServiceCall::Activate {
                caster: me,
                target: chest,
                is_second_activation: false
            }]
        );
    }

    #[test]
    fn activate_by_hosted_actor_equips_best_weapon() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let npc = h.spawn_npc(0x1000);
        let chest = h.spawn_chest(0x5000);
        h.server.world.set_hoster(npc, me);
        h.form_mut(npc).inventory.add_item(STEEL_DAGGER, 1);
        h.form_mut(npc).inventory.add_item(IRON_SWORD, 1);

        let json = format!(r#"{{"t":"activate","data":{{"caster":{npc},"target":{chest},"isSecondActivation":true}}}}"#);
        let msg = h.inbound(1, &json, h.start);
        h.server.handle(msg).unwrap();

        assert_eq!(
            *h.services.calls.lock(),
            vec![ServiceCall::Activate {
                caster: npc,
                target: chest,
                is_second_activation: true
            }]
        );
        assert!(h.actor(npc).equipment.inv.has_item(IRON_SWORD));
    }

    #[test]
    fn activate_by_foreign_actor_is_a_fault() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let npc = h.spawn_npc(0x1000);
        let chest = h.spawn_chest(0x5000);

        let json = format!(r#"{{"t":"activate","data":{{"caster":{npc},"target":{chest}}}}}"#);
        let msg = h.inbound(1, &json, h.start);
        let err = h.server.handle(msg).unwrap_err();
        assert!(matches!(
            err,
            ActionError::BadHoster { caster: 0x1000, expected, found: 0 } if expected == me
        ));
        assert!(h.services.calls.lock().is_empty());
    }

    #[test]
    fn activate_needs_game_data() {
        let mut h = TestHarness::with_game_data_loaded(false);
        h.server.connect_user(1);
        let msg = h.inbound(1, r#"{"t":"activate","data":{"caster":20,"target":1}}"#, h.start);
        assert!(matches!(h.server.handle(msg), Err(ActionError::NoGameData)));
    }

    #[test]
    fn activate_of_missing_target_is_ignored() {
        let mut h = TestHarness::new();
        h.server.connect_user(1);
        let msg = h.inbound(1, r#"{"t":"activate","data":{"caster":20,"target":12345}}"#, h.start);
        h.server.handle(msg).unwrap();
        assert!(h.services.calls.lock().is_empty());
    }

    #[test]
    fn only_internal_custom_events_are_forwarded() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);

        let msg = h.inbound(1, r#"{"t":"customEvent","eventName":"publicThing","args":[1]}"#, h.start);
        h.server.handle(msg).unwrap();
        let msg = h.inbound(1, r#"{"t":"customEvent","eventName":"_onQuest","args":[1,"a"]}"#, h.start);
        h.server.handle(msg).unwrap();

        assert_eq!(
            *h.events.events.lock(),
            vec![GameEvent::Custom {
                actor: me,
                name: "_onQuest".into(),
                args: json!([1, "a"])
            }]
        );
    }

    #[test]
    fn console_command_without_actor_is_ignored() {
        let mut h = TestHarness::new();
        let msg = h.inbound(1, r#"{"t":"consoleCommand","data":{"commandName":"tp","args":[]}}"#, h.start);
        h.server.handle(msg).unwrap();
        assert!(h.services.calls.lock().is_empty());

        let me = h.server.connect_user(1);
        let msg = h.inbound(1, r#"{"t":"consoleCommand","data":{"commandName":"tp","args":[]}}"#, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(
            *h.services.calls.lock(),
            vec![ServiceCall::ConsoleCommand {
                actor: me,
                command: "tp".into()
            }]
        );
    }

    #[test]
    fn custom_packets_reach_the_event_bus() {
        let mut h = TestHarness::new();
        let msg = h.inbound(7, r#"{"t":"customPacket","content":{"x":1}}"#, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(
            *h.events.events.lock(),
            vec![GameEvent::CustomPacket {
                user_id: 7,
                content: json!({"x": 1})
            }]
        );
    }
}
