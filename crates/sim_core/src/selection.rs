//! Selection state (§6 command schema: `select`/`select_at_tile`/
//! `toggle_selection`/`select_area`). A thin ascending-sorted id set; the
//! command executor resolves tiles/areas to entity ids before touching this.

use bevy_ecs::prelude::Resource;

use crate::entity::EntityId;

#[derive(Resource, Default)]
pub struct Selection {
    selected: Vec<EntityId>,
}

impl Selection {
    pub fn ids(&self) -> &[EntityId] {
        &self.selected
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replaces the selection wholesale, de-duplicated and sorted ascending.
    pub fn set(&mut self, mut ids: Vec<EntityId>) {
        ids.sort_unstable();
        ids.dedup();
        self.selected = ids;
    }

    pub fn add(&mut self, id: EntityId) {
        if !self.selected.contains(&id) {
            self.selected.push(id);
            self.selected.sort_unstable();
        }
    }

    pub fn remove(&mut self, id: EntityId) {
        self.selected.retain(|&s| s != id);
    }

    pub fn toggle(&mut self, id: EntityId) {
        if self.contains(id) {
            self.remove(id);
        } else {
            self.add(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_deduplicates_and_sorts() {
        let mut sel = Selection::default();
        sel.set(vec![EntityId(3), EntityId(1), EntityId(1)]);
        assert_eq!(sel.ids(), &[EntityId(1), EntityId(3)]);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut sel = Selection::default();
        sel.toggle(EntityId(5));
        assert!(sel.contains(EntityId(5)));
        sel.toggle(EntityId(5));
        assert!(!sel.contains(EntityId(5)));
    }
}
