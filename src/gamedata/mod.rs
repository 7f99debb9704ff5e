//! Read-only game data lookups (weapons, races, armor, settings)

pub mod loader;
pub mod records;

pub use loader::{GameDataError, ReferenceKind, ReferenceSpawn, StaticGameData};
pub use records::{
    AnimType, ArmorData, BaseActorValues, Bounds, GlobalSetting, NpcData, RaceData, Record,
    RecordData, SpellData, WeaponData, UNARMED_WEAPON_ID,
};

/// Upper bound on template chain walks, guards against cyclic templates
const MAX_TEMPLATE_DEPTH: usize = 16;

/// Lookup capability over the loaded game records
pub trait GameData: Send + Sync {
    fn lookup(&self, id: u32) -> Option<&Record>;

    fn global(&self, setting: GlobalSetting) -> f32;

    fn weapon(&self, id: u32) -> Option<&WeaponData> {
        match self.lookup(id).map(|r| &r.data) {
            Some(RecordData::Weapon(w)) => Some(w),
            _ => None,
        }
    }

    fn armor(&self, id: u32) -> Option<&ArmorData> {
        match self.lookup(id).map(|r| &r.data) {
            Some(RecordData::Armor(a)) => Some(a),
            _ => None,
        }
    }

    fn race(&self, id: u32) -> Option<&RaceData> {
        match self.lookup(id).map(|r| &r.data) {
            Some(RecordData::Race(r)) => Some(r),
            _ => None,
        }
    }

    fn npc(&self, id: u32) -> Option<&NpcData> {
        match self.lookup(id).map(|r| &r.data) {
            Some(RecordData::Npc(n)) => Some(n),
            _ => None,
        }
    }

    /// Case-insensitive keyword check by keyword editor id
    fn has_keyword(&self, base_id: u32, keyword: &str) -> bool {
        let Some(record) = self.lookup(base_id) else {
            return false;
        };
        record.keywords.iter().any(|kw| {
            self.lookup(*kw)
                .map(|k| k.editor_id.eq_ignore_ascii_case(keyword))
                .unwrap_or(false)
        })
    }
}

/// Resolve maximum actor values from the base NPC, its race and template chain.
///
/// The last template in `template_chain` that has an NPC record wins over
/// `base_id`; a record with `uses_template_stats` defers to its own template.
pub fn base_actor_values(
    data: &dyn GameData,
    base_id: u32,
    race_id: u32,
    template_chain: &[u32],
) -> BaseActorValues {
    let mut npc_id = template_chain
        .iter()
        .rev()
        .copied()
        .find(|id| data.npc(*id).is_some())
        .unwrap_or(base_id);

    for _ in 0..MAX_TEMPLATE_DEPTH {
        match data.npc(npc_id) {
            Some(npc) if npc.uses_template_stats => match npc.template {
                Some(template) if data.npc(template).is_some() => npc_id = template,
                _ => break,
            },
            _ => break,
        }
    }

    let npc = data.npc(npc_id);
    let race_id = if race_id != 0 {
        race_id
    } else {
        npc.map(|n| n.race).unwrap_or(0)
    };

    let Some(race) = data.race(race_id) else {
        return BaseActorValues::default();
    };

    let (health_offset, magicka_offset, stamina_offset) = npc
        .map(|n| (n.health_offset, n.magicka_offset, n.stamina_offset))
        .unwrap_or_default();

    BaseActorValues {
        health: race.health + health_offset,
        magicka: race.magicka + magicka_offset,
        stamina: race.stamina + stamina_offset,
        health_regen: race.health_regen,
        magicka_regen: race.magicka_regen,
        stamina_regen: race.stamina_regen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "records": [
            { "id": 1000, "data": { "type": "race", "health": 50, "magicka": 60, "stamina": 70, "unarmed_reach": 90 } },
            { "id": 2000, "data": { "type": "npc", "race": 1000, "health_offset": 10 } },
            { "id": 2001, "data": { "type": "npc", "race": 1000, "health_offset": 200, "template": 2000, "uses_template_stats": true } },
            { "id": 2002, "data": { "type": "npc", "race": 1000, "health_offset": 40 } },
            { "id": 3000, "editor_id": "SweetCantDrop", "data": { "type": "keyword" } },
            { "id": 4000, "keywords": [3000], "data": { "type": "potion" } }
        ]
    }"#;

    #[test]
    fn base_values_from_race_and_npc() {
        let data = StaticGameData::from_json(DATA).unwrap();
        let values = base_actor_values(&data, 2000, 0, &[]);
        assert_eq!(values.health, 60.0);
        assert_eq!(values.magicka, 60.0);
        assert_eq!(values.stamina, 70.0);
    }

    #[test]
    fn base_values_follow_template_stats() {
        let data = StaticGameData::from_json(DATA).unwrap();
        assert_eq!(base_actor_values(&data, 2001, 0, &[]).health, 60.0);
        assert_eq!(base_actor_values(&data, 2000, 0, &[2002]).health, 90.0);
    }

    #[test]
    fn unknown_race_uses_defaults() {
        let data = StaticGameData::from_json(DATA).unwrap();
        assert_eq!(
            base_actor_values(&data, 9999, 0, &[]),
            BaseActorValues::default()
        );
    }

    #[test]
    fn keyword_lookup_ignores_case() {
        let data = StaticGameData::from_json(DATA).unwrap();
        assert!(data.has_keyword(4000, "sweetcantdrop"));
        assert!(!data.has_keyword(4000, "Other"));
        assert!(!data.has_keyword(1000, "SweetCantDrop"));
    }
}
