use std::time::Instant;

use tracing::{debug, error};

use crate::gamedata::RecordData;
use crate::game::error::ActionError;
use crate::game::form::Form;
use crate::game::sessions::UserId;
use crate::game::GameServer;
use crate::ws::protocol::{BowShotMsg, ContainerItemMsg, CraftItemData, DropItemMsg};

/// Keyword marking items that must never leave their owner
const CANT_DROP_KEYWORD: &str = "SweetCantDrop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    /// Actor to container
    Put,
    /// Container to actor
    Take,
}

impl GameServer {
    pub(super) fn on_put_item(&mut self, user_id: UserId, msg: ContainerItemMsg) -> Result<(), ActionError> {
        self.transfer_item(user_id, msg, Transfer::Put)?;
        Ok(())
    }

    /// Taking from a container starts its reloot timer
    pub(super) fn on_take_item(
        &mut self,
        user_id: UserId,
        msg: ContainerItemMsg,
        now: Instant,
    ) -> Result<(), ActionError> {
        let container = msg.target;
        if self.transfer_item(user_id, msg, Transfer::Take)? {
            self.request_reloot(container, now);
        }
        Ok(())
    }

    fn transfer_item(
        &mut self,
        user_id: UserId,
        msg: ContainerItemMsg,
        direction: Transfer,
    ) -> Result<bool, ActionError> {
        let Some(actor_id) = self.actor_by_user(user_id) else {
            return Ok(false);
        };
        if self.world.lookup_by_id(msg.target).is_none() {
            return Err(ActionError::FormNotFound(msg.target));
        }

        let base_id = msg.entry.base_id;
        if self.game_data.has_keyword(base_id, CANT_DROP_KEYWORD) {
            return Err(ActionError::ItemNotDroppable {
                actor: actor_id,
                base_id,
            });
        }

        let (from, to) = match direction {
            Transfer::Put => (actor_id, msg.target),
            Transfer::Take => (msg.target, actor_id),
        };
        let count = msg.entry.count;

        let removed = self
            .world
            .lookup_by_id_mut(from)
            .map(|f| f.inventory.remove_item(base_id, count))
            .unwrap_or(false);
        if !removed {
            debug!(
                from = %format_args!("{:x}", from),
                base_id = %format_args!("{:x}", base_id),
                count,
                ?direction,
                "Not enough items to transfer"
            );
            return Ok(false);
        }

        if let Some(dest) = self.world.lookup_by_id_mut(to) {
            dest.inventory.add_item(base_id, count);
        }
        debug!(
            from = %format_args!("{:x}", from),
            to = %format_args!("{:x}", to),
            base_id = %format_args!("{:x}", base_id),
            count,
            "Item transferred"
        );
        Ok(true)
    }

    /// Drop from the actor's inventory into the world as a new reference
    pub(super) fn on_drop_item(&mut self, user_id: UserId, msg: DropItemMsg) -> Result<(), ActionError> {
        let Some(actor_id) = self.actor_by_user(user_id) else {
            error!(user_id, "Unable to drop item, no actor attached");
            return Ok(());
        };

        let base_id = msg.entry.base_id;
        if self.game_data.has_keyword(base_id, CANT_DROP_KEYWORD) {
            return Err(ActionError::ItemNotDroppable {
                actor: actor_id,
                base_id,
            });
        }

        let Some(actor) = self.world.lookup_by_id_mut(actor_id) else {
            return Err(ActionError::FormNotFound(actor_id));
        };
        let count = msg.entry.count;
        if !actor.inventory.remove_item(base_id, count) {
            debug!(
                actor = %format_args!("{:x}", actor_id),
                base_id = %format_args!("{:x}", base_id),
                count,
                "Not enough items to drop"
            );
            return Ok(());
        }
        let (pos, rot, cell) = (actor.pos, actor.rot, actor.cell_or_world);

        let dropped_id = self.world.generate_form_id();
        let mut dropped = Form::new_object(dropped_id, base_id, pos, rot, cell);
        dropped.inventory.add_item(base_id, count);
        self.world.add_form(dropped);
        self.world
            .update_neighbours(actor_id, self.settings.neighbour_radius);

        debug!(
            actor = %format_args!("{:x}", actor_id),
            dropped = %format_args!("{:x}", dropped_id),
            base_id = %format_args!("{:x}", base_id),
            count,
            "Item dropped"
        );
        Ok(())
    }

    /// One arrow is spent per shot
    pub(super) fn on_player_bow_shot(&mut self, user_id: UserId, msg: BowShotMsg) -> Result<(), ActionError> {
        let Some(actor_id) = self.actor_by_user(user_id) else {
            error!(user_id, "Unable to shoot, no actor attached");
            return Ok(());
        };

        match self.game_data.lookup(msg.ammo_id).map(|r| &r.data) {
            Some(RecordData::Ammo) => {}
            Some(other) => {
                error!(
                    ammo_id = %format_args!("{:x}", msg.ammo_id),
                    kind = other.type_name(),
                    "Bow shot with a non-ammo record"
                );
                return Ok(());
            }
            None => {
                error!(ammo_id = %format_args!("{:x}", msg.ammo_id), "Bow shot with unknown ammo");
                return Ok(());
            }
        }

        if let Some(actor) = self.world.lookup_by_id_mut(actor_id) {
            if !actor.inventory.remove_item(msg.ammo_id, 1) {
                debug!(
                    actor = %format_args!("{:x}", actor_id),
                    ammo_id = %format_args!("{:x}", msg.ammo_id),
                    "Bow shot without ammo in inventory"
                );
            }
        }
        Ok(())
    }

    pub(super) fn on_craft_item(&mut self, user_id: UserId, data: CraftItemData) -> Result<(), ActionError> {
        self.services
            .craft_item(user_id, &data.crafted_items, data.workbench, data.result_object_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::game::error::ActionError;
    use crate::game::form::FIRST_DYNAMIC_FORM_ID;
    use crate::game::inventory::Entry;
    use crate::game::math::Vec3;
    use crate::game::testing::{
        ServiceCall, TestHarness, CELL, CHEST_BASE, GOLD, IRON_ARROW, IRON_SWORD, QUEST_ITEM,
    };
    use crate::gamedata::{ReferenceKind, ReferenceSpawn};

    fn entry(base_id: u32, count: u32) -> String {
        format!(r#"{{"baseId":{base_id},"count":{count}}}"#)
    }

    #[test]
    fn put_and_take_move_items_between_inventories() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = h.spawn_chest(0x5000);
        h.form_mut(me).inventory.add_item(GOLD, 10);

        let put = format!(r#"{{"t":"putItem","target":{chest},"entry":{}}}"#, entry(GOLD, 4));
        let msg = h.inbound(1, &put, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.form(me).inventory.count_of(GOLD), 6);
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 4);

        let take = format!(r#"{{"t":"takeItem","target":{chest},"entry":{}}}"#, entry(GOLD, 3));
        let msg = h.inbound(1, &take, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.form(me).inventory.count_of(GOLD), 9);
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 1);
    }

    fn sorted_entries(h: &TestHarness, form_id: u32) -> Vec<Entry> {
        let mut entries = h.form(form_id).inventory.entries.clone();
        entries.sort_by_key(|e| (e.base_id, e.count));
        entries
    }

    #[test]
    fn putting_then_taking_the_same_stack_restores_both_inventories() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = h.spawn_chest(0x5000);
        h.form_mut(me).inventory.add_item(GOLD, 10);
        h.form_mut(me).inventory.add_item(IRON_SWORD, 1);
        h.form_mut(chest).inventory.add_item(IRON_ARROW, 5);
        let my_start = sorted_entries(&h, me);
        let chest_start = sorted_entries(&h, chest);

        let put = format!(r#"{{"t":"putItem","target":{chest},"entry":{}}}"#, entry(GOLD, 10));
        let msg = h.inbound(1, &put, h.start);
        h.server.handle(msg).unwrap();
        assert!(h.form(me).inventory.entries.iter().all(|e| e.base_id != GOLD));
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 10);

        let take = format!(r#"{{"t":"takeItem","target":{chest},"entry":{}}}"#, entry(GOLD, 10));
        let msg = h.inbound(1, &take, h.start);
        h.server.handle(msg).unwrap();

        assert_eq!(sorted_entries(&h, me), my_start);
        assert_eq!(sorted_entries(&h, chest), chest_start);
        assert!(h.form(chest).inventory.entries.iter().all(|e| e.base_id != GOLD));
    }

    fn placed_chest(h: &mut TestHarness, form_id: u32, gold: u32) -> u32 {
        let reference = ReferenceSpawn {
            form_id,
            base_id: CHEST_BASE,
            kind: ReferenceKind::Object,
            pos: Vec3::ZERO,
            rot: Vec3::ZERO,
            cell_or_world: CELL,
            inventory: vec![Entry::new(GOLD, gold)],
        };
        h.server.spawn_reference(&reference);
        form_id
    }

    #[test]
    fn looted_container_refills_after_its_reloot_time() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = placed_chest(&mut h, 0x5000, 5);

        let take = format!(r#"{{"t":"takeItem","target":{chest},"entry":{}}}"#, entry(GOLD, 3));
        let msg = h.inbound(1, &take, h.start);
        h.server.handle(msg).unwrap();
        let msg = h.inbound(1, &take, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.form(me).inventory.count_of(GOLD), 3);
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 2);
        assert_eq!(h.server.world.timers.len(), 1);

        h.server.tick_timers(h.start + Duration::from_secs(60 * 60 - 1));
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 2);

        h.server.tick_timers(h.start + Duration::from_secs(60 * 60));
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 5);
        assert_eq!(h.form(me).inventory.count_of(GOLD), 3);
        assert!(!h.form(chest).reloot_pending);
    }

    #[test]
    fn reloot_skips_a_container_placed_again_under_the_same_id() {
        let mut h = TestHarness::new();
        h.server.connect_user(1);
        let chest = placed_chest(&mut h, 0x5000, 5);

        let take = format!(r#"{{"t":"takeItem","target":{chest},"entry":{}}}"#, entry(GOLD, 5));
        let msg = h.inbound(1, &take, h.start);
        h.server.handle(msg).unwrap();

        h.server.world.remove_form(chest);
        placed_chest(&mut h, chest, 1);
        h.form_mut(chest).inventory.remove_item(GOLD, 1);

        h.server.tick_timers(h.start + Duration::from_secs(60 * 60));
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 0);
    }

    #[test]
    fn putting_into_a_container_does_not_start_reloot() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = placed_chest(&mut h, 0x5000, 5);
        h.form_mut(me).inventory.add_item(IRON_SWORD, 1);

        let put = format!(r#"{{"t":"putItem","target":{chest},"entry":{}}}"#, entry(IRON_SWORD, 1));
        let msg = h.inbound(1, &put, h.start);
        h.server.handle(msg).unwrap();
        assert!(h.server.world.timers.is_empty());
    }

    #[test]
    fn taking_more_than_available_changes_nothing() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = h.spawn_chest(0x5000);
        h.form_mut(chest).inventory.add_item(GOLD, 2);

        let take = format!(r#"{{"t":"takeItem","target":{chest},"entry":{}}}"#, entry(GOLD, 3));
        let msg = h.inbound(1, &take, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.form(me).inventory.count_of(GOLD), 0);
        assert_eq!(h.form(chest).inventory.count_of(GOLD), 2);
    }

    #[test]
    fn missing_container_is_a_fault() {
        let mut h = TestHarness::new();
        h.server.connect_user(1);
        let put = format!(r#"{{"t":"putItem","target":{},"entry":{}}}"#, 0x5000, entry(GOLD, 1));
        let msg = h.inbound(1, &put, h.start);
        assert!(matches!(h.server.handle(msg), Err(ActionError::FormNotFound(0x5000))));
    }

    #[test]
    fn quest_items_cannot_leave_the_actor() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        let chest = h.spawn_chest(0x5000);
        h.form_mut(me).inventory.add_item(QUEST_ITEM, 1);

        let put = format!(r#"{{"t":"putItem","target":{chest},"entry":{}}}"#, entry(QUEST_ITEM, 1));
        let msg = h.inbound(1, &put, h.start);
        assert!(matches!(
            h.server.handle(msg),
            Err(ActionError::ItemNotDroppable { base_id: QUEST_ITEM, .. })
        ));

        let drop = format!(r#"{{"t":"dropItem","baseId":{QUEST_ITEM},"entry":{}}}"#, entry(QUEST_ITEM, 1));
        let msg = h.inbound(1, &drop, h.start);
        assert!(h.server.handle(msg).is_err());
        assert_eq!(h.form(me).inventory.count_of(QUEST_ITEM), 1);
    }

    #[test]
    fn dropping_spawns_a_reference_next_to_the_actor() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        h.form_mut(me).inventory.add_item(IRON_SWORD, 1);
        let forms_before = h.server.world.len();

        let drop = format!(r#"{{"t":"dropItem","baseId":{IRON_SWORD},"entry":{}}}"#, entry(IRON_SWORD, 1));
        let msg = h.inbound(1, &drop, h.start);
        h.server.handle(msg).unwrap();

        assert_eq!(h.form(me).inventory.count_of(IRON_SWORD), 0);
        assert_eq!(h.server.world.len(), forms_before + 1);
        let dropped = h
            .server
            .world
            .forms()
            .find(|f| f.base_id == IRON_SWORD)
            .expect("dropped reference");
        assert!(dropped.form_id >= FIRST_DYNAMIC_FORM_ID);
        assert_eq!(dropped.pos, h.form(me).pos);
        assert_eq!(dropped.cell_or_world, h.form(me).cell_or_world);
        assert!(!dropped.is_actor());
    }

    #[test]
    fn bow_shot_spends_one_arrow() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        h.form_mut(me).inventory.add_item(IRON_ARROW, 12);

        let shot = format!(r#"{{"t":"playerBowShot","weaponId":1,"ammoId":{IRON_ARROW},"power":1.0}}"#);
        let msg = h.inbound(1, &shot, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.form(me).inventory.count_of(IRON_ARROW), 11);
    }

    #[test]
    fn bow_shot_with_non_ammo_is_ignored() {
        let mut h = TestHarness::new();
        let me = h.server.connect_user(1);
        h.form_mut(me).inventory.add_item(GOLD, 5);

        let shot = format!(r#"{{"t":"playerBowShot","weaponId":1,"ammoId":{GOLD}}}"#);
        let msg = h.inbound(1, &shot, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(h.form(me).inventory.count_of(GOLD), 5);
    }

    #[test]
    fn craft_goes_to_the_crafting_service() {
        let mut h = TestHarness::new();
        h.server.connect_user(1);
        let craft = r#"{"t":"craftItem","data":{"workbench":4096,"resultObjectId":77,"craftedItems":{"entries":[]}}}"#;
        let msg = h.inbound(1, craft, h.start);
        h.server.handle(msg).unwrap();
        assert_eq!(
            *h.services.calls.lock(),
            vec![ServiceCall::CraftItem {
                user_id: 1,
                workbench: 4096,
                result_object: 77
            }]
        );
    }
}
