//! World entities: object references and actors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use super::inventory::{Equipment, Inventory};
use super::math::Vec3;

/// Form id a client uses to mean "my own actor"
pub const SELF_FORM_ID: u32 = 0x14;

/// Base ids at or below this are player-like NPC records
pub const MAX_PLAYER_BASE_ID: u32 = 0x7;

/// Form ids generated at runtime start here
pub const FIRST_DYNAMIC_FORM_ID: u32 = 0xff00_0000;

/// Health/magicka/stamina as fractions of their maximum, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorValues {
    pub health_percentage: f32,
    pub magicka_percentage: f32,
    pub stamina_percentage: f32,
}

impl Default for ActorValues {
    fn default() -> Self {
        Self::full()
    }
}

impl ActorValues {
    pub fn full() -> Self {
        Self {
            health_percentage: 1.0,
            magicka_percentage: 1.0,
            stamina_percentage: 1.0,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            health_percentage: clamp_percentage(self.health_percentage),
            magicka_percentage: clamp_percentage(self.magicka_percentage),
            stamina_percentage: clamp_percentage(self.stamina_percentage),
        }
    }

    pub fn get(&self, av: ActorValue) -> f32 {
        match av {
            ActorValue::Health => self.health_percentage,
            ActorValue::Magicka => self.magicka_percentage,
            ActorValue::Stamina => self.stamina_percentage,
        }
    }
}

/// Clamp to [0, 1]; NaN becomes 0
pub fn clamp_percentage(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorValue {
    Health,
    Magicka,
    Stamina,
}

/// Last animation event reported by the controlling client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationData {
    #[serde(default)]
    pub num_changes: u32,
    pub anim_event_name: String,
}

/// Character appearance as produced by the race menu
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    #[serde(default)]
    pub race_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Animation graph booleans mirrored from movement updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationFlags {
    pub in_jump_state: bool,
    pub weap_drawn: bool,
    pub is_blocking: bool,
}

/// Where a dead actor comes back
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub pos: Vec3,
    pub rot: Vec3,
    pub cell_or_world: u32,
}

/// Number of non-blocking movement updates after which a stale block stance is dropped
pub const BLOCK_RESET_COUNT: u32 = 5;

/// Actor-only state
#[derive(Debug, Clone)]
pub struct ActorState {
    pub race_id: u32,
    pub template_chain: Vec<u32>,
    pub equipment: Equipment,
    pub appearance: Option<Appearance>,
    pub values: ActorValues,
    pub learned_spells: HashSet<u32>,
    pub anim: AnimationFlags,
    pub last_anim_event: Option<AnimationData>,
    pub is_dead: bool,
    pub respawn_pending: bool,
    pub teleport_flag: bool,
    pub race_menu_open: bool,
    pub block_active: bool,
    pub block_count: u32,
    pub last_hit_time: Option<Instant>,
    pub last_percentages_update: Option<Instant>,
    pub spawn_point: SpawnPoint,
}

impl ActorState {
    pub fn new(race_id: u32, spawn_point: SpawnPoint) -> Self {
        Self {
            race_id,
            template_chain: Vec::new(),
            equipment: Equipment::default(),
            appearance: None,
            values: ActorValues::full(),
            learned_spells: HashSet::new(),
            anim: AnimationFlags::default(),
            last_anim_event: None,
            is_dead: false,
            respawn_pending: false,
            teleport_flag: false,
            race_menu_open: false,
            block_active: false,
            block_count: 0,
            last_hit_time: None,
            last_percentages_update: None,
            spawn_point,
        }
    }

    pub fn is_spell_learned(&self, spell_id: u32) -> bool {
        self.learned_spells.contains(&spell_id)
    }

    pub fn increase_block_count(&mut self) {
        self.block_count += 1;
    }

    pub fn reset_block_count(&mut self) {
        self.block_count = 0;
    }

    /// Dead or about to respawn; percentage pushes from the client are ignored
    pub fn should_skip_restoration(&self) -> bool {
        self.is_dead || self.respawn_pending
    }

    pub fn set_percentages(&mut self, values: ActorValues, now: Instant) {
        self.values = values.clamped();
        self.last_percentages_update = Some(now);
    }
}

#[derive(Debug, Clone)]
pub enum FormKind {
    Actor(Box<ActorState>),
    Object,
}

/// A placed reference in the world
#[derive(Debug, Clone)]
pub struct Form {
    pub form_id: u32,
    pub idx: u32,
    pub base_id: u32,
    pub pos: Vec3,
    pub rot: Vec3,
    pub cell_or_world: u32,
    pub inventory: Inventory,
    /// Contents a looted container is restored to
    pub(crate) initial_inventory: Option<Inventory>,
    pub(crate) reloot_pending: bool,
    /// Actors (by form id) interested in updates of this reference
    pub(crate) listeners: BTreeSet<u32>,
    kind: FormKind,
}

impl Form {
    pub fn new_object(form_id: u32, base_id: u32, pos: Vec3, rot: Vec3, cell_or_world: u32) -> Self {
        Self {
            form_id,
            idx: 0,
            base_id,
            pos,
            rot,
            cell_or_world,
            inventory: Inventory::default(),
            initial_inventory: None,
            reloot_pending: false,
            listeners: BTreeSet::new(),
            kind: FormKind::Object,
        }
    }

    pub fn new_actor(
        form_id: u32,
        base_id: u32,
        race_id: u32,
        pos: Vec3,
        rot: Vec3,
        cell_or_world: u32,
    ) -> Self {
        let spawn_point = SpawnPoint {
            pos,
            rot,
            cell_or_world,
        };
        Self {
            kind: FormKind::Actor(Box::new(ActorState::new(race_id, spawn_point))),
            ..Self::new_object(form_id, base_id, pos, rot, cell_or_world)
        }
    }

    pub fn is_actor(&self) -> bool {
        matches!(self.kind, FormKind::Actor(_))
    }

    pub fn as_actor(&self) -> Option<&ActorState> {
        match &self.kind {
            FormKind::Actor(actor) => Some(actor),
            FormKind::Object => None,
        }
    }

    pub fn as_actor_mut(&mut self) -> Option<&mut ActorState> {
        match &mut self.kind {
            FormKind::Actor(actor) => Some(actor),
            FormKind::Object => None,
        }
    }

    pub fn listeners(&self) -> impl Iterator<Item = u32> + '_ {
        self.listeners.iter().copied()
    }
}

/// Encode a form id for outbound 64-bit fields; actors below the dynamic range are offset
pub fn long_form_id(form_id: u32, is_actor: bool) -> u64 {
    let id = form_id as u64;
    if is_actor && form_id < FIRST_DYNAMIC_FORM_ID {
        id + 0x1_0000_0000
    } else {
        id
    }
}
