//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::form::{AnimationData, Appearance};
use crate::game::inventory::{Entry, Equipment, Inventory};
use crate::game::math::Vec3;

/// Messages sent from client to server, tagged by `"t"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ClientMsg {
    UpdateMovement(UpdateMovementMsg),
    UpdateAnimation(UpdateAnimationMsg),
    UpdateAppearance(UpdateAppearanceMsg),
    UpdateEquipment(UpdateEquipmentMsg),
    Activate(ActivateMsg),
    PutItem(ContainerItemMsg),
    TakeItem(ContainerItemMsg),
    DropItem(DropItemMsg),
    PlayerBowShot(BowShotMsg),
    FinishSpSnippet(FinishSpSnippetMsg),
    OnEquip(OnEquipMsg),
    ConsoleCommand(ConsoleCommandMsg),
    CraftItem(CraftItemMsg),
    Host(HostMsg),
    CustomEvent(CustomEventMsg),
    CustomPacket(CustomPacketMsg),
    ChangeValues(ChangeValuesMsg),
    OnHit(OnHitMsg),
    UpdateAnimVariables(UpdateAnimVariablesMsg),
    SpellCast(SpellCastMsg),
    #[serde(other)]
    Unknown,
}

impl ClientMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateMovement(_) => "updateMovement",
            Self::UpdateAnimation(_) => "updateAnimation",
            Self::UpdateAppearance(_) => "updateAppearance",
            Self::UpdateEquipment(_) => "updateEquipment",
            Self::Activate(_) => "activate",
            Self::PutItem(_) => "putItem",
            Self::TakeItem(_) => "takeItem",
            Self::DropItem(_) => "dropItem",
            Self::PlayerBowShot(_) => "playerBowShot",
            Self::FinishSpSnippet(_) => "finishSpSnippet",
            Self::OnEquip(_) => "onEquip",
            Self::ConsoleCommand(_) => "consoleCommand",
            Self::CraftItem(_) => "craftItem",
            Self::Host(_) => "host",
            Self::CustomEvent(_) => "customEvent",
            Self::CustomPacket(_) => "customPacket",
            Self::ChangeValues(_) => "changeValues",
            Self::OnHit(_) => "onHit",
            Self::UpdateAnimVariables(_) => "updateAnimVariables",
            Self::SpellCast(_) => "spellCast",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementData {
    pub pos: Vec3,
    pub rot: Vec3,
    pub world_or_cell: u32,
    #[serde(default = "default_run_mode")]
    pub run_mode: String,
    #[serde(default)]
    pub is_in_jump_state: bool,
    #[serde(default)]
    pub is_weap_drawn: bool,
    #[serde(default)]
    pub is_blocking: bool,
}

fn default_run_mode() -> String {
    "Standing".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMovementMsg {
    pub idx: u32,
    pub data: MovementData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAnimationMsg {
    pub idx: u32,
    pub data: AnimationData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppearanceMsg {
    pub idx: u32,
    pub data: Appearance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEquipmentMsg {
    pub idx: u32,
    pub data: Equipment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateData {
    pub caster: u32,
    pub target: u32,
    #[serde(default)]
    pub is_second_activation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateMsg {
    pub data: ActivateData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerItemMsg {
    pub target: u32,
    pub entry: Entry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropItemMsg {
    pub base_id: u32,
    pub entry: Entry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BowShotMsg {
    pub weapon_id: u32,
    pub ammo_id: u32,
    #[serde(default)]
    pub power: f32,
    #[serde(default)]
    pub is_sun_gazing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishSpSnippetMsg {
    pub snippet_idx: u32,
    #[serde(default)]
    pub return_value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnEquipMsg {
    pub base_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleCommandData {
    pub command_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleCommandMsg {
    pub data: ConsoleCommandData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftItemData {
    pub workbench: u32,
    pub result_object_id: u32,
    #[serde(default)]
    pub crafted_items: Inventory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftItemMsg {
    pub data: CraftItemData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMsg {
    pub remote_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventMsg {
    pub event_name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPacketMsg {
    #[serde(default)]
    pub content: Value,
}

/// Optional percentages; used both inbound and outbound
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeValuesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magicka: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamina: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeValuesMsg {
    #[serde(default)]
    pub idx: u32,
    pub data: ChangeValuesData,
}

/// One melee, ranged or spell hit as reported by the attacking side
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitData {
    pub aggressor: u32,
    pub target: u32,
    pub source: u32,
    #[serde(default)]
    pub is_power_attack: bool,
    #[serde(default)]
    pub is_sneak_attack: bool,
    #[serde(default)]
    pub is_bash_attack: bool,
    #[serde(default)]
    pub is_hit_blocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnHitMsg {
    pub data: HitData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAnimVariablesMsg {
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CastHand {
    #[default]
    Left,
    Right,
    Voice,
    Instant,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellCastData {
    pub caster: u32,
    pub target: u32,
    pub spell: u32,
    #[serde(default)]
    pub is_dual_casting: bool,
    #[serde(default)]
    pub is_interrupt_cast: bool,
    #[serde(default)]
    pub cast_hand: CastHand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellCastMsg {
    pub data: SpellCastData,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// The receiving client now simulates `target`
    HostStart { target: u64 },

    /// The receiving client must stop simulating `target`
    HostStop { target: u64 },

    /// Authoritative actor value percentages
    ChangeValues { idx: u32, data: ChangeValuesData },

    /// Move the client's copy of a reference to the authoritative placement
    Teleport {
        idx: u32,
        pos: Vec3,
        rot: Vec3,
        #[serde(rename = "worldOrCell")]
        world_or_cell: u32,
    },
}
