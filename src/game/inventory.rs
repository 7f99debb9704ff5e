//! Inventories and equipment

use serde::{Deserialize, Serialize};

/// Where an inventory entry is worn, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Worn {
    #[default]
    None,
    Worn,
    WornLeft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub base_id: u32,
    pub count: u32,
    #[serde(default)]
    pub worn: Worn,
}

impl Entry {
    pub fn new(base_id: u32, count: u32) -> Self {
        Self {
            base_id,
            count,
            worn: Worn::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Inventory {
    pub fn has_item(&self, base_id: u32) -> bool {
        self.count_of(base_id) > 0
    }

    pub fn count_of(&self, base_id: u32) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.base_id == base_id)
            .map(|e| e.count)
            .sum()
    }

    pub fn add_item(&mut self, base_id: u32, count: u32) {
        if count == 0 {
            return;
        }
        match self
            .entries
            .iter_mut()
            .find(|e| e.base_id == base_id && e.worn == Worn::None)
        {
            Some(entry) => entry.count += count,
            None => self.entries.push(Entry::new(base_id, count)),
        }
    }

    /// Remove `count` items; returns false (and changes nothing) if there are fewer
    pub fn remove_item(&mut self, base_id: u32, count: u32) -> bool {
        if self.count_of(base_id) < count {
            return false;
        }

        let mut remaining = count;
        // Unworn stacks go first
        self.entries.sort_by_key(|e| e.worn != Worn::None);
        for entry in self.entries.iter_mut().filter(|e| e.base_id == base_id) {
            let taken = entry.count.min(remaining);
            entry.count -= taken;
            remaining -= taken;
            if remaining == 0 {
                break;
            }
        }
        self.entries.retain(|e| e.count > 0);
        true
    }
}

/// Currently equipped items and spells of an actor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    #[serde(default)]
    pub inv: Inventory,
    #[serde(default)]
    pub left_spell: u32,
    #[serde(default)]
    pub right_spell: u32,
    #[serde(default)]
    pub voice_spell: u32,
    #[serde(default)]
    pub instant_spell: u32,
}

impl Equipment {
    pub fn is_spell_equipped(&self, spell_id: u32) -> bool {
        spell_id != 0
            && [
                self.left_spell,
                self.right_spell,
                self.voice_spell,
                self.instant_spell,
            ]
            .contains(&spell_id)
    }

    /// Non-zero spell slots
    pub fn spells(&self) -> impl Iterator<Item = u32> {
        [
            self.left_spell,
            self.right_spell,
            self.voice_spell,
            self.instant_spell,
        ]
        .into_iter()
        .filter(|id| *id != 0)
    }
}
