//! In-memory fakes shared by unit tests

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use crate::gamedata::{
    AnimType, ArmorData, Bounds, NpcData, RaceData, Record, RecordData, SpellData,
    StaticGameData, WeaponData, UNARMED_WEAPON_ID,
};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::broadcast::SendTarget;
use super::events::{EventBus, GameEvent, ScriptValue, WorldServices};
use super::form::{ActorState, Form};
use super::inventory::Inventory;
use super::math::Vec3;
use super::sessions::UserId;
use super::{GameServer, InboundMessage};

pub const TEST_RACE: u32 = 0x13746;
pub const PLAYER_BASE: u32 = 0x7;
pub const NPC_BASE: u32 = 0x2000;
pub const IRON_SWORD: u32 = 0x12eb7;
pub const STEEL_DAGGER: u32 = 0x13986;
pub const HUNTING_BOW: u32 = 0x13985;
pub const IRON_ARROW: u32 = 0x1397d;
pub const STEEL_SHIELD: u32 = 0x13955;
pub const IRON_HELMET: u32 = 0x12e4d;
pub const FIREBALL: u32 = 0x1c789;
pub const HEALING_POTION: u32 = 0x3eadd;
pub const GOLD: u32 = 0xf;
pub const CANT_DROP_KEYWORD: u32 = 0x0700_0001;
pub const QUEST_ITEM: u32 = 0x0700_0002;
pub const CHEST_BASE: u32 = 0x20;
pub const CELL: u32 = 0x3c;

fn record(id: u32, editor_id: &str, keywords: Vec<u32>, data: RecordData) -> Record {
    Record {
        id,
        editor_id: editor_id.to_string(),
        keywords,
        data,
    }
}

fn weapon(speed: f32, reach: f32, damage: f32, anim_type: AnimType) -> RecordData {
    RecordData::Weapon(WeaponData {
        speed,
        reach,
        damage,
        anim_type,
    })
}

fn npc(race: u32) -> RecordData {
    RecordData::Npc(NpcData {
        race,
        health_offset: 0.0,
        magicka_offset: 0.0,
        stamina_offset: 0.0,
        template: None,
        uses_template_stats: false,
        bounds: Bounds::default(),
    })
}

/// Small record set covering every record kind the handlers look at
pub fn sample_game_data() -> StaticGameData {
    let mut data = StaticGameData::default();
    data.insert(record(
        TEST_RACE,
        "NordRace",
        vec![],
        RecordData::Race(RaceData {
            health: 100.0,
            magicka: 100.0,
            stamina: 100.0,
            health_regen: 0.7,
            magicka_regen: 3.0,
            stamina_regen: 3.0,
            unarmed_reach: 100.0,
            unarmed_damage: 4.0,
        }),
    ));
    data.insert(record(PLAYER_BASE, "Player", vec![], npc(TEST_RACE)));
    data.insert(record(NPC_BASE, "Bandit", vec![], npc(TEST_RACE)));
    data.insert(record(IRON_SWORD, "IronSword", vec![], weapon(1.0, 1.0, 10.0, AnimType::OneHandSword)));
    data.insert(record(STEEL_DAGGER, "SteelDagger", vec![], weapon(1.3, 0.7, 5.0, AnimType::OneHandDagger)));
    data.insert(record(HUNTING_BOW, "HuntingBow", vec![], weapon(0.5625, 1.0, 7.0, AnimType::Bow)));
    data.insert(record(UNARMED_WEAPON_ID, "Unarmed", vec![], weapon(1.0, 0.0, 0.0, AnimType::HandToHand)));
    data.insert(record(IRON_ARROW, "IronArrow", vec![], RecordData::Ammo));
    data.insert(record(
        STEEL_SHIELD,
        "ArmorSteelShield",
        vec![],
        RecordData::Armor(ArmorData {
            equip_slot_id: 1,
            rating: 50.0,
        }),
    ));
    data.insert(record(
        IRON_HELMET,
        "ArmorIronHelmet",
        vec![],
        RecordData::Armor(ArmorData {
            equip_slot_id: 0,
            rating: 15.0,
        }),
    ));
    data.insert(record(FIREBALL, "Fireball", vec![], RecordData::Spell(SpellData { damage: 40.0 })));
    data.insert(record(HEALING_POTION, "RestoreHealth01", vec![], RecordData::Potion));
    data.insert(record(GOLD, "Gold001", vec![], RecordData::Misc));
    data.insert(record(CANT_DROP_KEYWORD, "SweetCantDrop", vec![], RecordData::Keyword));
    data.insert(record(QUEST_ITEM, "QuestAmulet", vec![CANT_DROP_KEYWORD], RecordData::Misc));
    data.insert(record(CHEST_BASE, "Chest", vec![], RecordData::Container));
    data
}

/// Captures every outbound packet
#[derive(Default)]
pub struct RecordingSendTarget {
    sent: Mutex<Vec<(UserId, Vec<u8>, bool)>>,
}

impl RecordingSendTarget {
    /// Drain everything sent so far
    pub fn take(&self) -> Vec<(UserId, Vec<u8>, bool)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Drain the packets addressed to one user, keeping the rest
    pub fn take_for(&self, user_id: UserId) -> Vec<Vec<u8>> {
        let mut sent = self.sent.lock();
        let (mine, rest): (Vec<_>, Vec<_>) = sent.drain(..).partition(|(user, _, _)| *user == user_id);
        *sent = rest;
        mine.into_iter().map(|(_, data, _)| data).collect()
    }
}

impl SendTarget for RecordingSendTarget {
    fn send(&self, user_id: UserId, data: &[u8], reliable: bool) {
        self.sent.lock().push((user_id, data.to_vec(), reliable));
    }
}

#[derive(Default)]
pub struct RecordingEventBus {
    pub events: Mutex<Vec<GameEvent>>,
    pub script_events: Mutex<Vec<(u32, String, Vec<ScriptValue>)>>,
}

impl RecordingEventBus {
    pub fn script_event_names(&self, form_id: u32) -> Vec<String> {
        self.script_events
            .lock()
            .iter()
            .filter(|(id, _, _)| *id == form_id)
            .map(|(_, name, _)| name.clone())
            .collect()
    }
}

impl EventBus for RecordingEventBus {
    fn fire(&self, event: GameEvent) {
        self.events.lock().push(event);
    }

    fn send_script_event(&self, form_id: u32, name: &str, args: &[ScriptValue]) {
        self.script_events
            .lock()
            .push((form_id, name.to_string(), args.to_vec()));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Activate { caster: u32, target: u32, is_second_activation: bool },
    ConsoleCommand { actor: u32, command: String },
    CraftItem { user_id: UserId, workbench: u32, result_object: u32 },
    ResolveSnippet { actor: u32, snippet_idx: u32, value: ScriptValue },
    UseItem { actor: u32, base_id: u32 },
}

#[derive(Default)]
pub struct RecordingServices {
    pub calls: Mutex<Vec<ServiceCall>>,
}

impl WorldServices for RecordingServices {
    fn activate(&self, caster: u32, target: u32, is_second_activation: bool) {
        self.calls.lock().push(ServiceCall::Activate {
            caster,
            target,
            is_second_activation,
        });
    }

    fn execute_console_command(&self, actor: u32, command: &str, _args: &[Value]) {
        self.calls.lock().push(ServiceCall::ConsoleCommand {
            actor,
            command: command.to_string(),
        });
    }

    fn craft_item(&self, user_id: UserId, _input: &Inventory, workbench: u32, result_object: u32) {
        self.calls.lock().push(ServiceCall::CraftItem {
            user_id,
            workbench,
            result_object,
        });
    }

    fn resolve_snippet(&self, actor: u32, snippet_idx: u32, value: ScriptValue) {
        self.calls.lock().push(ServiceCall::ResolveSnippet {
            actor,
            snippet_idx,
            value,
        });
    }

    fn use_item(&self, actor: u32, base_id: u32) {
        self.calls.lock().push(ServiceCall::UseItem { actor, base_id });
    }
}

/// A server wired to recording collaborators
pub struct TestHarness {
    pub server: GameServer,
    pub sent: Arc<RecordingSendTarget>,
    pub events: Arc<RecordingEventBus>,
    pub services: Arc<RecordingServices>,
    pub start: Instant,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_game_data_loaded(true)
    }

    pub fn with_game_data_loaded(loaded: bool) -> Self {
        let sent = Arc::new(RecordingSendTarget::default());
        let events = Arc::new(RecordingEventBus::default());
        let services = Arc::new(RecordingServices::default());
        let server = GameServer::new(Arc::new(sample_game_data()), sent.clone())
            .with_event_bus(events.clone())
            .with_services(services.clone())
            .with_game_data_loaded(loaded);
        Self {
            server,
            sent,
            events,
            services,
            start: Instant::now(),
        }
    }

    /// Place an NPC at the origin of the test cell
    pub fn spawn_npc(&mut self, form_id: u32) -> u32 {
        self.spawn_npc_at(form_id, Vec3::ZERO)
    }

    pub fn spawn_npc_at(&mut self, form_id: u32, pos: Vec3) -> u32 {
        let form = Form::new_actor(form_id, NPC_BASE, TEST_RACE, pos, Vec3::ZERO, CELL);
        self.server.world.add_form(form);
        form_id
    }

    pub fn spawn_chest(&mut self, form_id: u32) -> u32 {
        let form = Form::new_object(form_id, CHEST_BASE, Vec3::ZERO, Vec3::ZERO, CELL);
        self.server.world.add_form(form);
        form_id
    }

    pub fn idx_of(&self, form_id: u32) -> u32 {
        self.server
            .world
            .lookup_by_id(form_id)
            .map(|f| f.idx)
            .expect("form exists")
    }

    pub fn form(&self, form_id: u32) -> &Form {
        self.server.world.lookup_by_id(form_id).expect("form exists")
    }

    pub fn form_mut(&mut self, form_id: u32) -> &mut Form {
        self.server
            .world
            .lookup_by_id_mut(form_id)
            .expect("form exists")
    }

    pub fn actor(&self, form_id: u32) -> &ActorState {
        self.form(form_id).as_actor().expect("form is an actor")
    }

    pub fn actor_mut(&mut self, form_id: u32) -> &mut ActorState {
        self.form_mut(form_id)
            .as_actor_mut()
            .expect("form is an actor")
    }

    /// Drain the control messages sent to `user_id`, skipping raw relays
    pub fn sent_to(&self, user_id: UserId) -> Vec<ServerMsg> {
        self.sent
            .take_for(user_id)
            .iter()
            .filter_map(|data| serde_json::from_slice(data).ok())
            .collect()
    }

    /// Drain every packet sent to `user_id`
    pub fn raw_sent_to(&self, user_id: UserId) -> Vec<Vec<u8>> {
        self.sent.take_for(user_id)
    }

    /// Parse `json` and dispatch it as if `user_id` sent it at `at`
    pub fn inbound(&self, user_id: UserId, json: &str, at: Instant) -> InboundMessage {
        let msg: ClientMsg = serde_json::from_str(json).expect("valid client message");
        InboundMessage {
            user_id,
            msg,
            raw: Bytes::copy_from_slice(json.as_bytes()),
            received_at: at,
        }
    }
}
