//! Scene factory and character controller seams.
//!
//! The core never renders anything and never resolves collisions itself. The
//! host engine supplies both capabilities through the traits in this module:
//! a [`SceneFactory`] that materializes a collidable representation for a
//! newly seen client, and a [`CharacterController`] that performs position
//! integration and collision resolution for that representation.
//!
//! A flat-ground implementation is included so the server runs headless in
//! tests and standalone deployments.

use crate::command::ClientId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Pose and tagging applied to a freshly spawned server entity.
///
/// The label distinguishes the server-authoritative representation from any
/// client-local visual copy of the same player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPose {
    /// World-space spawn position
    pub position: Vec3,
    /// Initial yaw in degrees
    pub yaw: f32,
    /// Tag the factory applies to mark the object as server-owned
    pub label: String,
}

impl Default for SpawnPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            yaw: 0.0,
            label: "Server".to_string(),
        }
    }
}

/// Opaque handle to a spawned scene representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// Position integration and collision resolution for one entity.
///
/// Owned by the entity it was spawned with and driven once per tick by the
/// simulation loop. Ground contact reported here gates whether the simulator
/// recomputes horizontal translation intent on the next tick.
pub trait CharacterController: Send {
    /// Integrates `velocity` over `dt` from `position`, resolves collisions,
    /// and returns the resolved position.
    fn move_and_collide(&mut self, position: Vec3, velocity: Vec3, dt: f32) -> Vec3;

    /// Whether the last resolution ended with ground contact.
    fn is_grounded(&self) -> bool;
}

/// A spawned representation: the scene handle plus its controller.
pub struct SpawnedEntity {
    /// Handle for later despawning
    pub handle: EntityHandle,
    /// Controller bound to the spawned representation
    pub controller: Box<dyn CharacterController>,
}

/// Materializes and destroys scene representations for server entities.
pub trait SceneFactory: Send + Sync {
    /// Spawns a collidable representation at `pose` for `client_id` and
    /// attaches a character controller to it.
    fn spawn(&self, client_id: ClientId, pose: &SpawnPose) -> SpawnedEntity;

    /// Destroys a previously spawned representation.
    fn despawn(&self, handle: EntityHandle);
}

/// Built-in scene: an infinite ground plane at a fixed height.
///
/// Suitable for headless operation and tests. Real deployments inject an
/// engine-backed factory instead.
#[derive(Debug)]
pub struct FlatGroundScene {
    ground_height: f32,
    next_handle: AtomicU64,
}

impl FlatGroundScene {
    /// Creates a flat ground plane at `ground_height`.
    pub fn new(ground_height: f32) -> Self {
        Self {
            ground_height,
            next_handle: AtomicU64::new(1),
        }
    }
}

impl SceneFactory for FlatGroundScene {
    fn spawn(&self, client_id: ClientId, pose: &SpawnPose) -> SpawnedEntity {
        let handle = EntityHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        trace!(
            "Spawned '{} {}' at {:?} as {:?}",
            pose.label,
            client_id,
            pose.position,
            handle
        );
        SpawnedEntity {
            handle,
            controller: Box::new(FlatGroundController {
                ground_height: self.ground_height,
                grounded: pose.position.y <= self.ground_height,
            }),
        }
    }

    fn despawn(&self, handle: EntityHandle) {
        trace!("Despawned {:?}", handle);
    }
}

/// Controller for [`FlatGroundScene`]: clamps vertical motion at the plane.
#[derive(Debug)]
pub struct FlatGroundController {
    ground_height: f32,
    grounded: bool,
}

impl CharacterController for FlatGroundController {
    fn move_and_collide(&mut self, position: Vec3, velocity: Vec3, dt: f32) -> Vec3 {
        let mut next = position + velocity * dt;
        if next.y <= self.ground_height {
            next.y = self.ground_height;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
        next
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_ground_clamps_and_reports_contact() {
        let mut controller = FlatGroundController {
            ground_height: 0.0,
            grounded: false,
        };

        // Falling through the plane clamps to it and restores contact.
        let pos = controller.move_and_collide(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, -10.0, 0.0), 0.1);
        assert_eq!(pos.y, 0.0);
        assert!(controller.is_grounded());

        // Upward motion leaves the plane and clears contact.
        let pos = controller.move_and_collide(pos, Vec3::new(0.0, 8.0, 0.0), 0.1);
        assert!(pos.y > 0.0);
        assert!(!controller.is_grounded());
    }

    #[test]
    fn factory_hands_out_distinct_handles() {
        let scene = FlatGroundScene::new(0.0);
        let pose = SpawnPose::default();
        let a = scene.spawn(ClientId(1), &pose);
        let b = scene.spawn(ClientId(2), &pose);
        assert_ne!(a.handle, b.handle);
    }

    #[test]
    fn spawn_above_ground_starts_airborne() {
        let scene = FlatGroundScene::new(0.0);
        let spawned = scene.spawn(ClientId(1), &SpawnPose::default());
        assert!(!spawned.controller.is_grounded());
    }
}
