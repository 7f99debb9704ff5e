//! In-memory game data loaded from a JSON export

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::game::inventory::Entry;
use crate::game::math::Vec3;

use super::{GameData, GlobalSetting, Record};

#[derive(Debug, thiserror::Error)]
pub enum GameDataError {
    #[error("Failed to read game data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse game data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate record id {0:#x}")]
    DuplicateRecord(u32),
}

/// What a placed reference spawns as on world load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Actor,
    Object,
}

/// A reference placed in the world by the data files
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceSpawn {
    pub form_id: u32,
    pub base_id: u32,
    pub kind: ReferenceKind,
    #[serde(default)]
    pub pos: Vec3,
    #[serde(default)]
    pub rot: Vec3,
    pub cell_or_world: u32,
    #[serde(default)]
    pub inventory: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct GameDataFile {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    globals: HashMap<String, f32>,
    #[serde(default)]
    references: Vec<ReferenceSpawn>,
}

/// Game data held entirely in memory
#[derive(Debug, Default)]
pub struct StaticGameData {
    records: HashMap<u32, Record>,
    globals: HashMap<String, f32>,
    references: Vec<ReferenceSpawn>,
}

impl StaticGameData {
    pub fn from_json(json: &str) -> Result<Self, GameDataError> {
        let file: GameDataFile = serde_json::from_str(json)?;

        let mut records = HashMap::with_capacity(file.records.len());
        for record in file.records {
            let id = record.id;
            if records.insert(id, record).is_some() {
                return Err(GameDataError::DuplicateRecord(id));
            }
        }

        Ok(Self {
            records,
            globals: file.globals,
            references: file.references,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GameDataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let data = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            records = data.records.len(),
            references = data.references.len(),
            "Loaded game data"
        );
        Ok(data)
    }

    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.id, record);
    }

    pub fn set_global(&mut self, setting: GlobalSetting, value: f32) {
        self.globals.insert(setting.editor_id().to_string(), value);
    }

    pub fn references(&self) -> &[ReferenceSpawn] {
        &self.references
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GameData for StaticGameData {
    fn lookup(&self, id: u32) -> Option<&Record> {
        self.records.get(&id)
    }

    fn global(&self, setting: GlobalSetting) -> f32 {
        self.globals
            .get(setting.editor_id())
            .copied()
            .unwrap_or_else(|| setting.default_value())
    }
}
