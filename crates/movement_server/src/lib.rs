//! # Movement Server - Authoritative Movement Pipeline
//!
//! The server-side authoritative movement core of a networked multiplayer
//! simulation. It consumes buffered per-client input commands, advances each
//! client's simulated entity deterministically, and periodically broadcasts
//! the resulting world state to all connected clients.
//!
//! ## Architecture
//!
//! * **Command buffering** - a fixed-capacity set of recent commands per
//!   client with a globally clocked read cursor
//! * **Movement simulator** - a pure, deterministic state-transition function
//! * **Entity registry** - creation-on-first-command and
//!   removal-on-disconnect lifecycle, reconciled against the transport's
//!   live connection set
//! * **Simulation loop** - the fixed-step driver that decouples simulation
//!   cadence from both input arrival and broadcast cadence
//!
//! ## Data Flow
//!
//! 1. The transport layer installs per-client command batches into the
//!    shared [`CommandStore`]
//! 2. Once per tick the [`SimulationLoop`] pulls the due command per client
//!    and runs the [`MovementSimulator`] against registry-owned state
//! 3. On an independent timer the loop projects every live entity into a
//!    [`SnapshotBatch`] and hands it to the [`SnapshotSink`]
//!
//! ## Failure Semantics
//!
//! The running loop has no fatal errors. Buffer exhaustion replays the last
//! command, stale clients are pruned, and disconnect races resolve at the
//! start of the next tick; all three surface only as `tracing` diagnostics.
//!
//! ## Collaborators
//!
//! Rendering, input capture, collision resolution, and wire framing live
//! behind injected traits: [`Transport`], [`SceneFactory`],
//! [`CharacterController`], and [`SnapshotSink`].

// Re-export core types for easy access
pub use command::{ClientId, CommandSet, CommandStore, CursorClock, InputCommand};
pub use config::{MovementTuning, SimulationConfig};
pub use error::SimError;
pub use registry::{Entity, EntityRegistry};
pub use scene::{
    CharacterController, EntityHandle, FlatGroundController, FlatGroundScene, SceneFactory,
    SpawnPose, SpawnedEntity,
};
pub use simulator::{MovementSimulator, PhysicalState};
pub use snapshot::{ChannelSink, SnapshotBatch, SnapshotSink, StateSnapshot};
pub use tick::{LoopStats, LoopStatsSnapshot, SimulationLoop, TickPhase};
pub use transport::{InMemoryTransport, Transport};

// Public module declarations
pub mod command;
pub mod config;
pub mod error;
pub mod registry;
pub mod scene;
pub mod simulator;
pub mod snapshot;
pub mod tick;
pub mod transport;
