//! Entity directory: forms by id and by index, hosting bindings, movement timestamps

use std::collections::HashMap;
use std::time::Instant;

use super::form::{Form, FIRST_DYNAMIC_FORM_ID};
use super::timers::TimerQueue;

/// All live forms plus the per-form tables the action core keeps
#[derive(Debug)]
pub struct World {
    forms: HashMap<u32, Form>,
    /// Form id at each index; indices are never reused
    refr_by_idx: Vec<Option<u32>>,
    /// Non-controlled form id → form id of the actor simulating it
    hosters: HashMap<u32, u32>,
    /// Last accepted movement per index, grown lazily
    last_mov_update_by_idx: Vec<Option<Instant>>,
    pub timers: TimerQueue,
    next_dynamic_id: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            forms: HashMap::new(),
            refr_by_idx: Vec::new(),
            hosters: HashMap::new(),
            last_mov_update_by_idx: Vec::new(),
            timers: TimerQueue::new(),
            next_dynamic_id: FIRST_DYNAMIC_FORM_ID,
        }
    }

    /// Insert a form and assign it the next index. Replaces a form with the same id.
    pub fn add_form(&mut self, mut form: Form) -> u32 {
        if self.forms.contains_key(&form.form_id) {
            self.remove_form(form.form_id);
        }
        let idx = self.refr_by_idx.len() as u32;
        form.idx = idx;
        self.refr_by_idx.push(Some(form.form_id));
        self.forms.insert(form.form_id, form);
        idx
    }

    /// Remove a form and every listener relation it took part in
    pub fn remove_form(&mut self, form_id: u32) -> Option<Form> {
        let form = self.forms.remove(&form_id)?;
        if let Some(slot) = self.refr_by_idx.get_mut(form.idx as usize) {
            *slot = None;
        }
        for other in self.forms.values_mut() {
            other.listeners.remove(&form_id);
        }
        self.hosters.remove(&form_id);
        Some(form)
    }

    pub fn generate_form_id(&mut self) -> u32 {
        while self.forms.contains_key(&self.next_dynamic_id) {
            self.next_dynamic_id = self.next_dynamic_id.wrapping_add(1).max(FIRST_DYNAMIC_FORM_ID);
        }
        let id = self.next_dynamic_id;
        self.next_dynamic_id = self.next_dynamic_id.wrapping_add(1).max(FIRST_DYNAMIC_FORM_ID);
        id
    }

    pub fn lookup_by_id(&self, form_id: u32) -> Option<&Form> {
        self.forms.get(&form_id)
    }

    pub fn lookup_by_id_mut(&mut self, form_id: u32) -> Option<&mut Form> {
        self.forms.get_mut(&form_id)
    }

    pub fn lookup_by_idx(&self, idx: u32) -> Option<&Form> {
        let form_id = (*self.refr_by_idx.get(idx as usize)?)?;
        self.forms.get(&form_id).filter(|f| f.idx == idx)
    }

    pub fn forms(&self) -> impl Iterator<Item = &Form> {
        self.forms.values()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn hoster_of(&self, form_id: u32) -> Option<u32> {
        self.hosters.get(&form_id).copied()
    }

    /// Set the hoster, returning the previous one
    pub fn set_hoster(&mut self, form_id: u32, hoster: u32) -> Option<u32> {
        self.hosters.insert(form_id, hoster)
    }

    pub fn clear_hoster(&mut self, form_id: u32) -> Option<u32> {
        self.hosters.remove(&form_id)
    }

    pub fn last_movement(&self, idx: u32) -> Option<Instant> {
        self.last_mov_update_by_idx.get(idx as usize).copied().flatten()
    }

    pub fn touch_movement(&mut self, idx: u32, now: Instant) {
        let idx = idx as usize;
        if self.last_mov_update_by_idx.len() <= idx {
            self.last_mov_update_by_idx.resize(idx + 1, None);
        }
        self.last_mov_update_by_idx[idx] = Some(now);
    }

    /// Make `listener` receive relays of `subject`
    pub fn add_listener(&mut self, subject: u32, listener: u32) -> bool {
        if subject == listener || !self.forms.contains_key(&listener) {
            return false;
        }
        match self.forms.get_mut(&subject) {
            Some(form) => form.listeners.insert(listener),
            None => false,
        }
    }

    pub fn remove_listener(&mut self, subject: u32, listener: u32) -> bool {
        self.forms
            .get_mut(&subject)
            .map(|f| f.listeners.remove(&listener))
            .unwrap_or(false)
    }

    /// Recompute mutual interest between an actor and every other actor:
    /// same cell/world and within `radius` means both listen to each other.
    pub fn update_neighbours(&mut self, form_id: u32, radius: f32) {
        let Some(moved) = self.forms.get(&form_id).filter(|f| f.is_actor()) else {
            return;
        };
        let (cell, pos) = (moved.cell_or_world, moved.pos);
        let sqr_radius = radius * radius;

        let mut near = Vec::new();
        let mut far = Vec::new();
        for other in self.forms.values() {
            if other.form_id == form_id || !other.is_actor() {
                continue;
            }
            if other.cell_or_world == cell && (other.pos - pos).sqr_length() <= sqr_radius {
                near.push(other.form_id);
            } else {
                far.push(other.form_id);
            }
        }

        for other in near {
            self.add_listener(form_id, other);
            self.add_listener(other, form_id);
        }
        for other in far {
            self.remove_listener(form_id, other);
            self.remove_listener(other, form_id);
        }
    }
}
