//! Static game record definitions

use serde::{Deserialize, Serialize};

/// Form id of the built-in "unarmed" weapon record
pub const UNARMED_WEAPON_ID: u32 = 0x1f4;

/// A static game record with its common header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: u32,
    #[serde(default)]
    pub editor_id: String,
    /// Ids of keyword records attached to this record
    #[serde(default)]
    pub keywords: Vec<u32>,
    pub data: RecordData,
}

/// Record payload by record type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordData {
    Weapon(WeaponData),
    Ammo,
    Armor(ArmorData),
    Spell(SpellData),
    Potion,
    Race(RaceData),
    Npc(NpcData),
    Keyword,
    Container,
    /// Gold, keys and other inventory-only items
    Misc,
}

impl RecordData {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Weapon(_) => "WEAP",
            Self::Ammo => "AMMO",
            Self::Armor(_) => "ARMO",
            Self::Spell(_) => "SPEL",
            Self::Potion => "ALCH",
            Self::Race(_) => "RACE",
            Self::Npc(_) => "NPC_",
            Self::Keyword => "KYWD",
            Self::Container => "CONT",
            Self::Misc => "MISC",
        }
    }
}

/// Weapon animation family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimType {
    HandToHand,
    OneHandSword,
    OneHandDagger,
    OneHandAxe,
    OneHandMace,
    TwoHandSword,
    TwoHandAxe,
    Bow,
    Staff,
    Crossbow,
}

impl AnimType {
    pub fn is_ranged(self) -> bool {
        matches!(self, Self::Bow | Self::Crossbow)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponData {
    /// Attack speed multiplier (1.0 is a regular one-handed weapon)
    pub speed: f32,
    /// Reach multiplier, scaled by fCombatDistance
    pub reach: f32,
    pub damage: f32,
    pub anim_type: AnimType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArmorData {
    /// Non-zero for pieces worn in the shield slot
    #[serde(default)]
    pub equip_slot_id: u32,
    #[serde(default)]
    pub rating: f32,
}

impl ArmorData {
    pub fn is_shield(&self) -> bool {
        self.equip_slot_id > 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpellData {
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RaceData {
    pub health: f32,
    pub magicka: f32,
    pub stamina: f32,
    /// Regeneration in percent of the maximum per second
    #[serde(default = "default_health_regen")]
    pub health_regen: f32,
    #[serde(default = "default_regen")]
    pub magicka_regen: f32,
    #[serde(default = "default_regen")]
    pub stamina_regen: f32,
    pub unarmed_reach: f32,
    #[serde(default = "default_unarmed_damage")]
    pub unarmed_damage: f32,
}

fn default_health_regen() -> f32 {
    0.7
}

fn default_regen() -> f32 {
    3.0
}

fn default_unarmed_damage() -> f32 {
    4.0
}

/// Object bounds, in local (unrotated) space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub pos1: [i16; 3],
    pub pos2: [i16; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            pos1: [-22, -14, 0],
            pos2: [22, 14, 128],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NpcData {
    pub race: u32,
    #[serde(default)]
    pub health_offset: f32,
    #[serde(default)]
    pub magicka_offset: f32,
    #[serde(default)]
    pub stamina_offset: f32,
    /// Template NPC, if this record inherits from another
    #[serde(default)]
    pub template: Option<u32>,
    /// Take actor values from the template instead of this record
    #[serde(default)]
    pub uses_template_stats: bool,
    #[serde(default)]
    pub bounds: Bounds,
}

/// Named game settings consulted by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalSetting {
    CombatDistance,
}

impl GlobalSetting {
    pub fn editor_id(self) -> &'static str {
        match self {
            Self::CombatDistance => "fCombatDistance",
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            Self::CombatDistance => 141.0,
        }
    }
}

/// Maximum health/magicka/stamina and regeneration of an actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseActorValues {
    pub health: f32,
    pub magicka: f32,
    pub stamina: f32,
    pub health_regen: f32,
    pub magicka_regen: f32,
    pub stamina_regen: f32,
}

impl Default for BaseActorValues {
    fn default() -> Self {
        Self {
            health: 100.0,
            magicka: 100.0,
            stamina: 100.0,
            health_regen: default_health_regen(),
            magicka_regen: default_regen(),
            stamina_regen: default_regen(),
        }
    }
}
