//! Registry of server-simulated entities keyed by client identity.
//!
//! Owns the creation-on-first-command and removal-on-disconnect lifecycle,
//! including reconciliation against the transport layer's authoritative
//! connection set.

use crate::command::ClientId;
use crate::scene::{CharacterController, EntityHandle, SceneFactory, SpawnPose};
use crate::simulator::PhysicalState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// One server-simulated entity: physical state plus the scene representation
/// it was spawned with.
pub struct Entity {
    /// Physical state mutated by the simulator each tick
    pub state: PhysicalState,
    /// Handle to the renderable/collidable representation
    pub handle: EntityHandle,
    /// Controller performing position integration for this entity
    pub controller: Box<dyn CharacterController>,
}

/// Tracks the set of server-simulated entities.
///
/// Exactly one entity exists per connected, input-producing client. Removal
/// destroys the scene representation and drops the physical state; a later
/// command for the same id creates a brand-new entity at the spawn pose with
/// zero velocity, never resurrecting old state.
pub struct EntityRegistry {
    entities: HashMap<ClientId, Entity>,
    factory: Arc<dyn SceneFactory>,
    spawn_pose: SpawnPose,
}

impl EntityRegistry {
    /// Creates an empty registry spawning through `factory` at `spawn_pose`.
    pub fn new(factory: Arc<dyn SceneFactory>, spawn_pose: SpawnPose) -> Self {
        Self {
            entities: HashMap::new(),
            factory,
            spawn_pose,
        }
    }

    /// Resolves the entity for a client, creating it at the spawn pose on
    /// first sight. Idempotent for already-known clients.
    pub fn get_or_create(&mut self, client_id: ClientId) -> &mut Entity {
        let factory = &self.factory;
        let spawn_pose = &self.spawn_pose;
        self.entities.entry(client_id).or_insert_with(|| {
            let spawned = factory.spawn(client_id, spawn_pose);
            info!(
                "Spawned server entity for {} at {:?}",
                client_id, spawn_pose.position
            );
            Entity {
                state: PhysicalState::at(spawn_pose.position, spawn_pose.yaw),
                handle: spawned.handle,
                controller: spawned.controller,
            }
        })
    }

    /// Removes a client's entity, destroying its scene representation.
    /// No-op for unknown clients.
    pub fn remove(&mut self, client_id: ClientId) {
        if let Some(entity) = self.entities.remove(&client_id) {
            self.factory.despawn(entity.handle);
            info!("Removed server entity for {}", client_id);
        }
    }

    /// Removes every entity whose client id is absent from the live
    /// connection set. Returns the ids that were pruned.
    pub fn prune_stale(&mut self, connected: &HashSet<ClientId>) -> Vec<ClientId> {
        let stale: Vec<ClientId> = self
            .entities
            .keys()
            .filter(|id| !connected.contains(id))
            .copied()
            .collect();
        for id in &stale {
            self.remove(*id);
        }
        stale
    }

    /// Whether an entity exists for a client.
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.entities.contains_key(&client_id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities are live.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over live entities in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &Entity)> {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::FlatGroundScene;
    use glam::Vec3;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(Arc::new(FlatGroundScene::new(0.0)), SpawnPose::default())
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut registry = registry();
        let id = ClientId(7);

        let handle = registry.get_or_create(id).handle;
        assert_eq!(registry.len(), 1);

        // Second resolution returns the same entity, not a new spawn.
        assert_eq!(registry.get_or_create(id).handle, handle);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn new_entity_starts_at_spawn_pose_with_zero_velocity() {
        let mut registry = registry();
        let entity = registry.get_or_create(ClientId(7));
        assert_eq!(entity.state.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(entity.state.velocity, Vec3::ZERO);
        assert_eq!(entity.state.yaw, 0.0);
    }

    #[test]
    fn removal_drops_state_and_recreation_starts_fresh() {
        let mut registry = registry();
        let id = ClientId(1);

        registry.get_or_create(id).state.position = Vec3::new(50.0, 0.0, 50.0);
        registry.remove(id);
        assert!(!registry.contains(id));

        // Re-creation gets default spawn state, not the old position.
        let entity = registry.get_or_create(id);
        assert_eq!(entity.state.position, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn prune_removes_exactly_the_disconnected() {
        let mut registry = registry();
        registry.get_or_create(ClientId(1));
        registry.get_or_create(ClientId(2));
        registry.get_or_create(ClientId(3));

        let connected: HashSet<ClientId> = [ClientId(1), ClientId(3)].into_iter().collect();
        let mut pruned = registry.prune_stale(&connected);
        pruned.sort();
        assert_eq!(pruned, vec![ClientId(2)]);
        assert!(registry.contains(ClientId(1)));
        assert!(!registry.contains(ClientId(2)));
        assert!(registry.contains(ClientId(3)));
    }

    #[test]
    fn remove_unknown_client_is_a_no_op() {
        let mut registry = registry();
        registry.remove(ClientId(99));
        assert!(registry.is_empty());
    }
}
