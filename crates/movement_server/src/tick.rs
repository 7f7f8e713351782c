//! The fixed-step simulation loop.
//!
//! Exactly one iteration runs to completion before the next begins: queued
//! disconnects are applied, the global cursor-advance decision is made, every
//! client with pending commands is simulated, and on an independent timer a
//! snapshot batch is assembled and handed to the broadcast channel. The loop
//! is driven by its own ticker, decoupled from any rendering frame rate.

use crate::command::{ClientId, CommandStore, CursorClock};
use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::registry::EntityRegistry;
use crate::scene::SceneFactory;
use crate::simulator::MovementSimulator;
use crate::snapshot::{SnapshotBatch, SnapshotSink, StateSnapshot};
use crate::transport::Transport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Phase of the current loop iteration.
///
/// A single tick transitions `Idle -> Simulating -> (Broadcasting | Idle)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// Between iterations
    Idle,
    /// Applying commands to entities
    Simulating,
    /// Handing a non-empty snapshot batch to the sink
    Broadcasting,
}

/// Counters describing loop activity, shared with monitoring tasks.
#[derive(Debug, Default)]
pub struct LoopStats {
    ticks: AtomicU64,
    commands_applied: AtomicU64,
    batches_sent: AtomicU64,
    exhaustion_events: AtomicU64,
    pruned_clients: AtomicU64,
}

impl LoopStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot of the counters for reporting.
    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            exhaustion_events: self.exhaustion_events.load(Ordering::Relaxed),
            pruned_clients: self.pruned_clients.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatsSnapshot {
    /// Iterations executed
    pub ticks: u64,
    /// Commands applied through the simulator
    pub commands_applied: u64,
    /// Non-empty snapshot batches handed to the sink
    pub batches_sent: u64,
    /// Cursor advances that found the buffer exhausted
    pub exhaustion_events: u64,
    /// Clients pruned because the transport no longer reported them
    pub pruned_clients: u64,
}

/// The authoritative movement pipeline driver.
///
/// Single-threaded and cooperative: it owns all entity state exclusively and
/// only ever reads immutable snapshots into the broadcast path. The command
/// store and connection set are populated by the transport layer between
/// ticks.
pub struct SimulationLoop {
    config: SimulationConfig,
    simulator: MovementSimulator,
    registry: EntityRegistry,
    commands: Arc<CommandStore>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn SnapshotSink>,
    disconnects: mpsc::UnboundedReceiver<ClientId>,
    cursor_clock: CursorClock,
    broadcast_interval: Duration,
    last_broadcast: Duration,
    sequence: u64,
    phase: TickPhase,
    stats: Arc<LoopStats>,
}

impl SimulationLoop {
    /// Creates a loop over the injected collaborators.
    ///
    /// Validates the configuration up front; this is the only fallible step,
    /// the running loop itself never propagates errors.
    pub fn new(
        config: SimulationConfig,
        transport: Arc<dyn Transport>,
        commands: Arc<CommandStore>,
        disconnects: mpsc::UnboundedReceiver<ClientId>,
        factory: Arc<dyn SceneFactory>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let cursor_clock = CursorClock::new(
            config.input_sampling_rate_hz,
            config.command_set_capacity,
        );
        let registry = EntityRegistry::new(factory, config.spawn.clone());
        let simulator = MovementSimulator::new(config.movement);
        let broadcast_interval = config.broadcast_interval();
        Ok(Self {
            config,
            simulator,
            registry,
            commands,
            transport,
            sink,
            disconnects,
            cursor_clock,
            broadcast_interval,
            last_broadcast: Duration::ZERO,
            sequence: 0,
            phase: TickPhase::Idle,
            stats: Arc::new(LoopStats::default()),
        })
    }

    /// Shared handle to the loop counters, for monitoring tasks.
    pub fn stats(&self) -> Arc<LoopStats> {
        Arc::clone(&self.stats)
    }

    /// Current iteration phase.
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Sequence number the next non-empty broadcast will carry.
    pub fn next_sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    /// Runs one loop iteration at `now` (elapsed since loop start) with a
    /// simulated timestep of `dt` seconds.
    pub async fn tick(&mut self, now: Duration, dt: f32) {
        self.phase = TickPhase::Simulating;
        LoopStats::bump(&self.stats.ticks);

        // Disconnects queued since the previous tick are applied before any
        // simulation, never mid-tick.
        while let Ok(client_id) = self.disconnects.try_recv() {
            self.commands.remove(client_id);
            self.registry.remove(client_id);
        }

        // One global cursor decision per tick, applied uniformly.
        let advance = self.cursor_clock.should_advance(now);
        let connected = self.transport.connected_clients();

        for client_id in self.commands.client_ids() {
            if !connected.contains(&client_id) {
                // The host never delivered a disconnect for this id.
                warn!(
                    "Discarding commands for {}: no longer in the live connection set",
                    client_id
                );
                self.commands.remove(client_id);
                LoopStats::bump(&self.stats.pruned_clients);
                continue;
            }

            let Some((cmd, exhausted)) = self.commands.due_command(client_id, advance) else {
                continue;
            };
            if exhausted {
                // Rate mismatch between sampling and set replacement; the
                // last command replays until a fresh batch arrives.
                warn!("Ran out of commands to use for {}", client_id);
                LoopStats::bump(&self.stats.exhaustion_events);
            }

            let entity = self.registry.get_or_create(client_id);
            let grounded = entity.controller.is_grounded();
            self.simulator.step(&mut entity.state, &cmd, grounded, dt);
            entity.state.position =
                entity
                    .controller
                    .move_and_collide(entity.state.position, entity.state.velocity, dt);
            LoopStats::bump(&self.stats.commands_applied);
        }

        // Entities whose clients vanished without either a disconnect
        // notification or pending commands.
        for client_id in self.registry.prune_stale(&connected) {
            warn!("Pruned stale entity for {}", client_id);
            LoopStats::bump(&self.stats.pruned_clients);
        }

        self.broadcast_if_due(now).await;
        self.phase = TickPhase::Idle;
    }

    /// Assembles and sends a snapshot batch when the broadcast interval has
    /// elapsed. Empty batches are suppressed and consume no sequence number.
    async fn broadcast_if_due(&mut self, now: Duration) {
        if self.last_broadcast + self.broadcast_interval > now {
            return;
        }
        self.last_broadcast = now;

        let states: Vec<StateSnapshot> = self
            .registry
            .iter()
            .map(|(client_id, entity)| StateSnapshot::of(*client_id, &entity.state))
            .collect();
        if states.is_empty() {
            return;
        }

        self.phase = TickPhase::Broadcasting;
        let batch = SnapshotBatch {
            sequence: self.sequence,
            states,
        };
        self.sequence += 1;
        LoopStats::bump(&self.stats.batches_sent);
        if let Err(e) = self.sink.broadcast(batch).await {
            // Fire-and-forget: a failed broadcast never halts the loop.
            error!("Broadcast failed: {}", e);
        }
    }

    /// Drives the loop from its own ticker until `shutdown` flips to true.
    ///
    /// Returns the final counter values.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> LoopStatsSnapshot {
        let tick_interval = self.config.tick_interval();
        let dt = tick_interval.as_secs_f32();
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let start = tokio::time::Instant::now();

        info!(
            "Simulation loop running: {} Hz ticks, {} Hz broadcasts, cursor advance every {:?}",
            self.config.tick_rate_hz,
            self.config.broadcast_rate_hz,
            self.cursor_clock.interval()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = start.elapsed();
                    self.tick(now, dt).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let stats = self.stats.snapshot();
        info!(
            "Simulation loop stopped after {} ticks ({} batches sent)",
            stats.ticks, stats.batches_sent
        );
        stats
    }
}
