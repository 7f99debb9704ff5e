//! Hooks into game logic living outside the core

use serde_json::Value;
use tracing::{debug, info};

use super::form::Appearance;
use super::inventory::{Equipment, Inventory};
use super::sessions::UserId;

/// Events fired for game-logic listeners
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    UpdateAppearanceAttempt {
        actor: u32,
        appearance: Appearance,
        allowed: bool,
    },
    UpdateEquipmentAttempt {
        actor: u32,
        equipment: Equipment,
        allowed: bool,
    },
    EatItem {
        actor: u32,
        base_id: u32,
    },
    /// Internal (underscore-prefixed) custom event from a client
    Custom {
        actor: u32,
        name: String,
        args: Value,
    },
    CustomPacket {
        user_id: UserId,
        content: Value,
    },
}

/// Argument passed to a script event
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    None,
    Bool(bool),
    Int(i32),
    /// A live reference in the world
    ObjectRef(u32),
    /// A static game record
    Record(u32),
}

/// Event bus and script event sink
pub trait EventBus: Send + Sync {
    fn fire(&self, event: GameEvent);

    /// Deliver a named script event to the scripts attached to `form_id`
    fn send_script_event(&self, form_id: u32, name: &str, args: &[ScriptValue]);
}

/// Services the core delegates to without inspecting their result
pub trait WorldServices: Send + Sync {
    fn activate(&self, caster: u32, target: u32, is_second_activation: bool);

    fn execute_console_command(&self, actor: u32, command: &str, args: &[Value]);

    fn craft_item(&self, user_id: UserId, input: &Inventory, workbench: u32, result_object: u32);

    fn resolve_snippet(&self, actor: u32, snippet_idx: u32, value: ScriptValue);

    /// Item use for records the core doesn't consume itself
    fn use_item(&self, actor: u32, base_id: u32);
}

/// Event bus that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventBus;

impl EventBus for LogEventBus {
    fn fire(&self, event: GameEvent) {
        debug!(?event, "Game event");
    }

    fn send_script_event(&self, form_id: u32, name: &str, args: &[ScriptValue]) {
        debug!(form_id = %format_args!("{:x}", form_id), name, ?args, "Script event");
    }
}

/// World services that only log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogServices;

impl WorldServices for LogServices {
    fn activate(&self, caster: u32, target: u32, is_second_activation: bool) {
        info!(
            caster = %format_args!("{:x}", caster),
            target = %format_args!("{:x}", target),
            is_second_activation,
            "Activate"
        );
    }

    fn execute_console_command(&self, actor: u32, command: &str, args: &[Value]) {
        info!(actor = %format_args!("{:x}", actor), command, ?args, "Console command");
    }

    fn craft_item(&self, user_id: UserId, input: &Inventory, workbench: u32, result_object: u32) {
        info!(
            user_id,
            inputs = input.entries.len(),
            workbench = %format_args!("{:x}", workbench),
            result_object = %format_args!("{:x}", result_object),
            "Craft item"
        );
    }

    fn resolve_snippet(&self, actor: u32, snippet_idx: u32, value: ScriptValue) {
        debug!(actor = %format_args!("{:x}", actor), snippet_idx, ?value, "Snippet resolved");
    }

    fn use_item(&self, actor: u32, base_id: u32) {
        debug!(
            actor = %format_args!("{:x}", actor),
            base_id = %format_args!("{:x}", base_id),
            "Use item"
        );
    }
}
