//! The world context every action handler runs against

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gamedata::{GameData, ReferenceKind, ReferenceSpawn, StaticGameData};
use crate::ws::protocol::{ChangeValuesData, ServerMsg};

use super::broadcast::SendTarget;
use super::damage::{DamageModel, DefaultDamageModel};
use super::events::{EventBus, LogEventBus, LogServices, ScriptValue, WorldServices};
use super::form::{long_form_id, ActorValue, ActorValues, Form, SpawnPoint, MAX_PLAYER_BASE_ID};
use super::math::Vec3;
use super::sessions::{Sessions, UserId};
use super::timers::DeferredTask;
use super::world::World;

/// Tunables of the action core
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub neighbour_radius: f32,
    pub max_movement_speed: f32,
    pub respawn_delay: Duration,
    pub spawn_point: SpawnPoint,
    pub player_race: u32,
    /// Reloot delay by container record type (`CONT`, ...). Types without an entry never reloot.
    pub reloot_times: HashMap<String, Duration>,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            neighbour_radius: 8192.0,
            max_movement_speed: 4096.0,
            respawn_delay: Duration::from_secs(5),
            spawn_point: SpawnPoint {
                pos: Vec3::ZERO,
                rot: Vec3::ZERO,
                cell_or_world: 0x3c,
            },
            player_race: 0x13746,
            reloot_times: HashMap::from([("CONT".to_string(), Duration::from_secs(60 * 60))]),
        }
    }
}

impl From<&Config> for CoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            neighbour_radius: config.neighbour_radius,
            max_movement_speed: config.max_movement_speed,
            respawn_delay: config.respawn_delay,
            spawn_point: SpawnPoint {
                pos: config.spawn_pos,
                rot: Vec3::ZERO,
                cell_or_world: config.spawn_cell,
            },
            player_race: config.player_race,
            reloot_times: config.reloot_times.clone(),
        }
    }
}

/// Authoritative world state plus the collaborators handlers talk to.
/// Owned by a single task; every message is processed to completion.
pub struct GameServer {
    pub world: World,
    pub sessions: Sessions,
    pub settings: CoreSettings,
    pub(crate) game_data: Arc<dyn GameData>,
    pub(crate) send_target: Arc<dyn SendTarget>,
    pub(crate) events: Arc<dyn EventBus>,
    pub(crate) services: Arc<dyn WorldServices>,
    pub(crate) damage_model: Box<dyn DamageModel>,
    has_game_data: bool,
}

impl GameServer {
    pub fn new(game_data: Arc<dyn GameData>, send_target: Arc<dyn SendTarget>) -> Self {
        Self {
            world: World::new(),
            sessions: Sessions::new(),
            settings: CoreSettings::default(),
            game_data,
            send_target,
            events: Arc::new(LogEventBus),
            services: Arc::new(LogServices),
            damage_model: Box::new(DefaultDamageModel),
            has_game_data: true,
        }
    }

    pub fn with_settings(mut self, settings: CoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_services(mut self, services: Arc<dyn WorldServices>) -> Self {
        self.services = services;
        self
    }

    pub fn with_damage_model(mut self, model: Box<dyn DamageModel>) -> Self {
        self.damage_model = model;
        self
    }

    /// Mark whether real data files are attached; activation refuses to run without them
    pub fn with_game_data_loaded(mut self, loaded: bool) -> Self {
        self.has_game_data = loaded;
        self
    }

    pub fn has_game_data(&self) -> bool {
        self.has_game_data
    }

    pub fn game_data(&self) -> &dyn GameData {
        &*self.game_data
    }

    /// Spawn the references placed by the data files
    pub fn load_references(&mut self, data: &StaticGameData) {
        for reference in data.references() {
            self.spawn_reference(reference);
        }
        info!(forms = self.world.len(), "World loaded");
    }

    pub fn spawn_reference(&mut self, reference: &ReferenceSpawn) -> u32 {
        let mut form = match reference.kind {
            ReferenceKind::Actor => {
                let race = self
                    .game_data
                    .npc(reference.base_id)
                    .map(|npc| npc.race)
                    .unwrap_or(0);
                Form::new_actor(
                    reference.form_id,
                    reference.base_id,
                    race,
                    reference.pos,
                    reference.rot,
                    reference.cell_or_world,
                )
            }
            ReferenceKind::Object => Form::new_object(
                reference.form_id,
                reference.base_id,
                reference.pos,
                reference.rot,
                reference.cell_or_world,
            ),
        };
        for entry in &reference.inventory {
            form.inventory.add_item(entry.base_id, entry.count);
        }
        if !form.is_actor() && !form.inventory.entries.is_empty() {
            form.initial_inventory = Some(form.inventory.clone());
        }
        self.world.add_form(form)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn actor_by_user(&self, user_id: UserId) -> Option<u32> {
        self.sessions.actor_by_user(user_id)
    }

    /// Give `user_id` direct control of `form_id`. Direct control outranks hosting,
    /// so any binding on the actor is revoked and its hoster told to stop.
    pub fn set_user_actor(&mut self, user_id: UserId, form_id: u32) {
        if let Some(previous_hoster) = self.world.clear_hoster(form_id) {
            if let Some(hoster_user) = self.sessions.user_by_actor(previous_hoster) {
                if hoster_user != user_id {
                    self.send_host_stop(hoster_user, form_id);
                }
            }
        }
        if let Some(previous_user) = self.sessions.attach(user_id, form_id) {
            warn!(
                user_id,
                previous_user,
                form_id = %format_args!("{:x}", form_id),
                "Actor control taken over from another user"
            );
        }
    }

    /// Create a player actor at the spawn point and attach it to the user
    pub fn connect_user(&mut self, user_id: UserId) -> u32 {
        let form_id = self.world.generate_form_id();
        let spawn = self.settings.spawn_point;
        let form = Form::new_actor(
            form_id,
            MAX_PLAYER_BASE_ID,
            self.settings.player_race,
            spawn.pos,
            spawn.rot,
            spawn.cell_or_world,
        );
        let idx = self.world.add_form(form);
        self.set_user_actor(user_id, form_id);
        self.world
            .update_neighbours(form_id, self.settings.neighbour_radius);
        info!(user_id, form_id = %format_args!("{:x}", form_id), idx, "User connected");
        form_id
    }

    /// Detach and despawn the user's actor. Bindings it hosts stay until re-hosted.
    pub fn disconnect_user(&mut self, user_id: UserId) {
        match self.sessions.detach_user(user_id) {
            Some(form_id) => {
                self.world.remove_form(form_id);
                info!(user_id, form_id = %format_args!("{:x}", form_id), "User disconnected");
            }
            None => debug!(user_id, "Disconnected user had no actor"),
        }
    }

    // ------------------------------------------------------------------
    // Outbound helpers
    // ------------------------------------------------------------------

    pub(crate) fn send_msg(&self, user_id: UserId, msg: &ServerMsg, reliable: bool) {
        match serde_json::to_vec(msg) {
            Ok(bytes) => self.send_target.send(user_id, &bytes, reliable),
            Err(e) => error!(user_id, error = %e, "Failed to serialize server message"),
        }
    }

    pub(crate) fn long_form_id_of(&self, form_id: u32) -> u64 {
        let is_actor = self
            .world
            .lookup_by_id(form_id)
            .map(Form::is_actor)
            .unwrap_or(false);
        long_form_id(form_id, is_actor)
    }

    pub(crate) fn send_host_stop(&self, user_id: UserId, form_id: u32) {
        let target = self.long_form_id_of(form_id);
        self.send_msg(user_id, &ServerMsg::HostStop { target }, true);
    }

    /// User that simulates the form: its controller, or the user of its hoster
    pub(crate) fn simulating_user(&self, form_id: u32) -> Option<UserId> {
        self.sessions.user_by_actor(form_id).or_else(|| {
            self.world
                .hoster_of(form_id)
                .and_then(|hoster| self.sessions.user_by_actor(hoster))
        })
    }

    /// Users that should see state changes of `form_id`: simulator plus listeners
    fn interested_users(&self, form_id: u32) -> Vec<UserId> {
        let mut users = Vec::new();
        if let Some(user) = self.simulating_user(form_id) {
            users.push(user);
        }
        if let Some(form) = self.world.lookup_by_id(form_id) {
            for listener in form.listeners() {
                if let Some(user) = self.sessions.user_by_actor(listener) {
                    if !users.contains(&user) {
                        users.push(user);
                    }
                }
            }
        }
        users
    }

    /// Send the filtered actor values of `form_id` to everyone interested
    pub(crate) fn net_send_change_values(&self, form_id: u32, values: &ActorValues, filter: &[ActorValue]) {
        let Some(form) = self.world.lookup_by_id(form_id) else {
            return;
        };
        let pick = |av| filter.contains(&av).then(|| values.get(av));
        let msg = ServerMsg::ChangeValues {
            idx: form.idx,
            data: ChangeValuesData {
                health: pick(ActorValue::Health),
                magicka: pick(ActorValue::Magicka),
                stamina: pick(ActorValue::Stamina),
            },
        };
        for user in self.interested_users(form_id) {
            self.send_msg(user, &msg, true);
        }
    }

    /// Store new percentages, broadcast them, and kill the actor if health ran out
    pub(crate) fn net_set_percentages(
        &mut self,
        form_id: u32,
        values: ActorValues,
        aggressor: Option<u32>,
        filter: &[ActorValue],
        now: Instant,
    ) {
        let Some(actor) = self
            .world
            .lookup_by_id_mut(form_id)
            .and_then(Form::as_actor_mut)
        else {
            return;
        };
        actor.set_percentages(values, now);
        let values = actor.values;
        let died = values.health_percentage <= 0.0 && !actor.is_dead;
        if died {
            actor.is_dead = true;
        }

        self.net_send_change_values(form_id, &values, filter);

        if died {
            info!(
                form_id = %format_args!("{:x}", form_id),
                killer = %format_args!("{:x}", aggressor.unwrap_or(0)),
                "Actor died"
            );
            let killer = aggressor.map(ScriptValue::ObjectRef).unwrap_or(ScriptValue::None);
            self.events.send_script_event(form_id, "OnDeath", &[killer]);
        }
    }

    /// Equip the highest-damage weapon from the actor's inventory
    pub(crate) fn equip_best_weapon(&mut self, form_id: u32) {
        let data = &*self.game_data;
        let Some(form) = self.world.lookup_by_id_mut(form_id) else {
            return;
        };

        let best = form
            .inventory
            .entries
            .iter()
            .filter_map(|e| data.weapon(e.base_id).map(|w| (e.base_id, w.damage)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);

        let (Some(best), Some(actor)) = (best, form.as_actor_mut()) else {
            return;
        };

        let inv = &mut actor.equipment.inv;
        inv.entries.retain(|e| data.weapon(e.base_id).is_none());
        inv.entries.push(crate::game::inventory::Entry {
            base_id: best,
            count: 1,
            worn: crate::game::inventory::Worn::Worn,
        });
        debug!(
            form_id = %format_args!("{:x}", form_id),
            weapon = %format_args!("{:x}", best),
            "Equipped best weapon"
        );
    }

    /// Schedule a respawn; repeated requests while one is pending are coalesced
    pub(crate) fn request_respawn(&mut self, form_id: u32, now: Instant) {
        let Some(actor) = self.world.lookup_by_id(form_id).and_then(Form::as_actor) else {
            return;
        };
        if actor.respawn_pending {
            return;
        }
        let delay = self.settings.respawn_delay;
        if !self
            .world
            .timers
            .schedule(now, delay, DeferredTask::Respawn { form_id })
        {
            return;
        }
        if let Some(actor) = self
            .world
            .lookup_by_id_mut(form_id)
            .and_then(Form::as_actor_mut)
        {
            actor.respawn_pending = true;
        }
    }

    /// Schedule a container refill after the delay configured for its record type
    pub(crate) fn request_reloot(&mut self, form_id: u32, now: Instant) {
        let Some(form) = self.world.lookup_by_id(form_id) else {
            return;
        };
        if form.reloot_pending || form.initial_inventory.is_none() {
            return;
        }
        let idx = form.idx;
        let Some(record_type) = self.game_data.lookup(form.base_id).map(|r| r.data.type_name()) else {
            return;
        };
        let Some(delay) = self.settings.reloot_times.get(record_type).copied() else {
            debug!(
                form_id = %format_args!("{:x}", form_id),
                record_type,
                "No reloot time for record type"
            );
            return;
        };
        if !self
            .world
            .timers
            .schedule(now, delay, DeferredTask::Reloot { form_id, idx })
        {
            return;
        }
        if let Some(form) = self.world.lookup_by_id_mut(form_id) {
            form.reloot_pending = true;
        }
    }

    // ------------------------------------------------------------------
    // Deferred tasks
    // ------------------------------------------------------------------

    /// Run every deferred task due at `now`
    pub fn tick_timers(&mut self, now: Instant) {
        for task in self.world.timers.drain_due(now) {
            match task {
                DeferredTask::ResyncPercentages { form_id } => self.resync_percentages(form_id),
                DeferredTask::Respawn { form_id } => self.respawn(form_id, now),
                DeferredTask::Reloot { form_id, idx } => self.reloot(form_id, idx),
            }
        }
    }

    fn resync_percentages(&self, form_id: u32) {
        let Some(form) = self.world.lookup_by_id(form_id) else {
            debug!(form_id = %format_args!("{:x}", form_id), "Resync target is gone");
            return;
        };
        let Some(actor) = form.as_actor() else {
            return;
        };
        let Some(user) = self.simulating_user(form_id) else {
            debug!(form_id = %format_args!("{:x}", form_id), "Resync target has no simulating user");
            return;
        };
        let msg = ServerMsg::ChangeValues {
            idx: form.idx,
            data: ChangeValuesData {
                health: Some(actor.values.health_percentage),
                magicka: Some(actor.values.magicka_percentage),
                stamina: Some(actor.values.stamina_percentage),
            },
        };
        self.send_msg(user, &msg, true);
    }

    fn reloot(&mut self, form_id: u32, idx: u32) {
        let Some(form) = self
            .world
            .lookup_by_id_mut(form_id)
            .filter(|f| f.idx == idx)
        else {
            debug!(form_id = %format_args!("{:x}", form_id), "Reloot target is gone");
            return;
        };
        form.reloot_pending = false;
        if let Some(initial) = &form.initial_inventory {
            form.inventory = initial.clone();
            info!(form_id = %format_args!("{:x}", form_id), "Container relooted");
        }
    }

    fn respawn(&mut self, form_id: u32, now: Instant) {
        let Some(form) = self.world.lookup_by_id_mut(form_id) else {
            debug!(form_id = %format_args!("{:x}", form_id), "Respawn target is gone");
            return;
        };
        let idx = form.idx;
        let Some(actor) = form.as_actor_mut() else {
            return;
        };
        let spawn = actor.spawn_point;
        actor.is_dead = false;
        actor.respawn_pending = false;
        actor.teleport_flag = true;
        actor.set_percentages(ActorValues::full(), now);
        form.pos = spawn.pos;
        form.rot = spawn.rot;
        form.cell_or_world = spawn.cell_or_world;

        info!(form_id = %format_args!("{:x}", form_id), "Actor respawned");

        if let Some(user) = self.simulating_user(form_id) {
            self.send_msg(
                user,
                &ServerMsg::Teleport {
                    idx,
                    pos: spawn.pos,
                    rot: spawn.rot,
                    world_or_cell: spawn.cell_or_world,
                },
                true,
            );
        }
        self.net_send_change_values(
            form_id,
            &ActorValues::full(),
            &[ActorValue::Health, ActorValue::Magicka, ActorValue::Stamina],
        );
        self.world
            .update_neighbours(form_id, self.settings.neighbour_radius);
    }
}
