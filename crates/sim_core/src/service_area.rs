//! Per-hub circular service areas (§4.11): coverage queries used by the
//! fulfillment matcher and dispatcher. Hubs are indexed by player in
//! `by_player` so `hubs_serving`/`hubs_serving_both`/`nearest_hub` scan only
//! that player's hubs (O(k) in the number of hubs owned by the player being
//! queried) rather than every hub in the game.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::config::DEFAULT_SERVICE_RADIUS;
use crate::entity::EntityId;
use crate::hex::hex_distance;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ServiceArea {
    pub hub_id: EntityId,
    pub center_x: i32,
    pub center_y: i32,
    pub radius: f64,
    pub player: u32,
}

impl ServiceArea {
    pub fn serves_position(&self, x: i32, y: i32) -> bool {
        hex_distance(self.center_x, self.center_y, x, y) <= self.radius
    }
}

#[derive(Resource, Default)]
pub struct ServiceAreaIndex {
    areas: HashMap<EntityId, ServiceArea>,
    by_player: HashMap<u32, Vec<EntityId>>,
}

impl ServiceAreaIndex {
    pub fn register(&mut self, hub_id: EntityId, center_x: i32, center_y: i32, player: u32) {
        if let Some(existing) = self.areas.get(&hub_id) {
            if existing.player != player {
                self.remove_from_bucket(existing.player, hub_id);
            }
        }
        self.areas.insert(
            hub_id,
            ServiceArea {
                hub_id,
                center_x,
                center_y,
                radius: DEFAULT_SERVICE_RADIUS,
                player,
            },
        );
        let bucket = self.by_player.entry(player).or_default();
        if !bucket.contains(&hub_id) {
            bucket.push(hub_id);
        }
    }

    pub fn remove(&mut self, hub_id: EntityId) {
        if let Some(area) = self.areas.remove(&hub_id) {
            self.remove_from_bucket(area.player, hub_id);
        }
    }

    fn remove_from_bucket(&mut self, player: u32, hub_id: EntityId) {
        if let Some(bucket) = self.by_player.get_mut(&player) {
            bucket.retain(|&id| id != hub_id);
        }
    }

    pub fn get(&self, hub_id: EntityId) -> Option<&ServiceArea> {
        self.areas.get(&hub_id)
    }

    fn bucket(&self, player: u32) -> &[EntityId] {
        self.by_player.get(&player).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hubs owned by `player` whose service area covers `(x, y)`, ascending
    /// by id.
    pub fn hubs_serving(&self, x: i32, y: i32, player: u32) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = self
            .bucket(player)
            .iter()
            .filter_map(|id| self.areas.get(id))
            .filter(|a| a.serves_position(x, y))
            .map(|a| a.hub_id)
            .collect();
        out.sort_unstable();
        out
    }

    /// Hubs owned by `player` covering both positions (§4.15 step 3,
    /// filtered by player), ascending by id.
    pub fn hubs_serving_both(&self, x1: i32, y1: i32, x2: i32, y2: i32, player: u32) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = self
            .bucket(player)
            .iter()
            .filter_map(|id| self.areas.get(id))
            .filter(|a| a.serves_position(x1, y1) && a.serves_position(x2, y2))
            .map(|a| a.hub_id)
            .collect();
        out.sort_unstable();
        out
    }

    /// Nearest hub owned by `player` to `(x, y)`, by hex distance; ties break
    /// toward the lower entity id.
    pub fn nearest_hub(&self, x: i32, y: i32, player: u32) -> Option<EntityId> {
        self.bucket(player)
            .iter()
            .filter_map(|id| self.areas.get(id))
            .map(|a| (a.hub_id, hex_distance(a.center_x, a.center_y, x, y)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }
}
