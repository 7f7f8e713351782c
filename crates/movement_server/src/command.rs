//! Per-client input command buffering.
//!
//! The transport layer delivers whole batches of sampled input commands for
//! each client. This module owns the buffered representation of those batches
//! and the cursor-advance policy that decides when the simulation moves on to
//! the next buffered command.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity of a connected client, assigned by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// One discrete sampled input record from a client.
///
/// Produced by the client's input sampler at a fixed rate and immutable once
/// received. Axis values are the raw input sign in `[-1, 1]`; values outside
/// that range are tolerated because the simulator re-clamps its smoothed axes
/// every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputCommand {
    /// Raw horizontal axis input (turn / strafe left-right)
    pub horizontal: f32,
    /// Raw vertical axis input (forward / backward)
    pub vertical: f32,
    /// Strafe modifier - switches horizontal input from turning to strafing
    pub strafe: bool,
    /// Run modifier - scales ground movement by the run multiplier
    pub run: bool,
    /// Jump request - sets vertical velocity to the jump speed while grounded
    pub jump: bool,
    /// Primary action - combined with strafe it forces full forward input
    pub primary: bool,
}

/// The current batch of commands for one client plus a read cursor.
///
/// Not a wraparound ring: the transport layer replaces the whole set when a
/// fresh batch arrives, which resets the cursor to 0. The simulation side only
/// ever advances a read position into the current set.
#[derive(Debug, Clone)]
pub struct CommandSet {
    commands: Vec<InputCommand>,
    cursor: usize,
}

impl CommandSet {
    /// Wraps a freshly received batch with the cursor at the first command.
    pub fn new(commands: Vec<InputCommand>) -> Self {
        Self { commands, cursor: 0 }
    }

    /// Current read position into the set.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of buffered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the set holds no commands at all.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Advances the cursor to the next command.
    ///
    /// Returns `false` when the set is exhausted: the cursor clamps at the
    /// last valid index and that command replays until a new set arrives.
    pub fn advance(&mut self) -> bool {
        let last = self.commands.len().saturating_sub(1);
        if self.cursor < last {
            self.cursor += 1;
            true
        } else {
            self.cursor = last;
            false
        }
    }

    /// The command at the current cursor, if the set is non-empty.
    pub fn current(&self) -> Option<InputCommand> {
        self.commands.get(self.cursor).copied()
    }
}

/// Global clock that decides when every client's cursor advances.
///
/// The simulation tick rate and the upstream input sampling rate are
/// independent, so the cursor cannot simply advance once per tick. The policy
/// advances once every `sample_interval / (capacity / 2)` seconds, trading
/// exact replay for a lower chance of exhausting the buffer before the next
/// batch arrives: trailing commands in a set may never be consumed.
#[derive(Debug, Clone, Copy)]
pub struct CursorClock {
    interval: Duration,
    last_advance: Duration,
}

impl CursorClock {
    /// Derives the advance interval from the upstream sampling rate and the
    /// configured command set capacity.
    pub fn new(sampling_rate_hz: f32, capacity: usize) -> Self {
        let sample_interval = 1.0 / sampling_rate_hz;
        let interval = sample_interval / (capacity as f32 / 2.0);
        Self {
            interval: Duration::from_secs_f32(interval),
            last_advance: Duration::ZERO,
        }
    }

    /// The derived cursor-advance interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns whether the cursor is due to advance at `now`, measured from
    /// loop start. The decision is global: one answer per tick, applied
    /// uniformly to every client with a pending set.
    pub fn should_advance(&mut self, now: Duration) -> bool {
        if self.last_advance + self.interval <= now {
            self.last_advance = now;
            true
        } else {
            false
        }
    }
}

/// Concurrent keyed store of pending command sets, one per client.
///
/// The transport layer installs replacement sets between ticks; the
/// simulation loop reads a snapshot of the known client ids at the start of
/// each tick and pulls the due command per client. Batches longer than the
/// configured capacity are truncated on install.
#[derive(Debug)]
pub struct CommandStore {
    sets: DashMap<ClientId, CommandSet>,
    capacity: usize,
}

impl CommandStore {
    /// Creates an empty store that truncates installed batches to `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            sets: DashMap::new(),
            capacity,
        }
    }

    /// Maximum number of commands retained per installed batch.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Installs a freshly received batch for a client, replacing any previous
    /// set and resetting the read cursor to 0.
    pub fn install(&self, client_id: ClientId, mut commands: Vec<InputCommand>) {
        commands.truncate(self.capacity);
        self.sets.insert(client_id, CommandSet::new(commands));
    }

    /// Drops any pending commands for a client.
    pub fn remove(&self, client_id: ClientId) {
        self.sets.remove(&client_id);
    }

    /// Whether a client currently has a pending set.
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.sets.contains_key(&client_id)
    }

    /// Number of clients with pending sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no client has pending commands.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Snapshot of the client ids with pending sets, taken once per tick.
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.sets.iter().map(|entry| *entry.key()).collect()
    }

    /// Pulls the due command for a client, advancing the cursor first when
    /// `advance` is set. The second element reports exhaustion: an advance was
    /// requested but the cursor was already clamped at the last command.
    ///
    /// Returns `None` when the client has no pending set or the set is empty.
    pub fn due_command(&self, client_id: ClientId, advance: bool) -> Option<(InputCommand, bool)> {
        let mut set = self.sets.get_mut(&client_id)?;
        let exhausted = advance && !set.advance();
        set.current().map(|cmd| (cmd, exhausted))
    }

    /// Read cursor position for a client's pending set, if any.
    pub fn cursor(&self, client_id: ClientId) -> Option<usize> {
        self.sets.get(&client_id).map(|set| set.cursor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward() -> InputCommand {
        InputCommand {
            vertical: 1.0,
            ..InputCommand::default()
        }
    }

    #[test]
    fn cursor_clamps_at_last_command() {
        let mut set = CommandSet::new(vec![forward(); 3]);
        assert!(set.advance());
        assert!(set.advance());
        assert_eq!(set.cursor(), 2);

        // Exhausted from here on: the last command replays.
        assert!(!set.advance());
        assert!(!set.advance());
        assert_eq!(set.cursor(), 2);
        assert_eq!(set.current(), Some(forward()));
    }

    #[test]
    fn empty_set_has_no_current_command() {
        let mut set = CommandSet::new(vec![]);
        assert!(set.is_empty());
        assert!(!set.advance());
        assert_eq!(set.current(), None);
    }

    #[test]
    fn install_resets_cursor() {
        let store = CommandStore::new(10);
        let id = ClientId(1);
        store.install(id, vec![forward(); 5]);
        store.due_command(id, true);
        store.due_command(id, true);
        assert_eq!(store.cursor(id), Some(2));

        store.install(id, vec![forward(); 5]);
        assert_eq!(store.cursor(id), Some(0));
    }

    #[test]
    fn install_truncates_to_capacity() {
        let store = CommandStore::new(4);
        let id = ClientId(7);
        store.install(id, vec![forward(); 32]);
        for _ in 0..3 {
            let (_, exhausted) = store.due_command(id, true).unwrap();
            assert!(!exhausted);
        }
        let (_, exhausted) = store.due_command(id, true).unwrap();
        assert!(exhausted);
        assert_eq!(store.cursor(id), Some(3));
    }

    #[test]
    fn advance_interval_follows_half_capacity_policy() {
        // 100 Hz sampling with capacity 10 advances every 2 ms.
        let clock = CursorClock::new(100.0, 10);
        assert_eq!(clock.interval(), Duration::from_secs_f32(0.002));
    }

    #[test]
    fn cursor_stays_in_bounds_at_any_rate_combination() {
        // Tick far faster than the advance interval would ever allow and make
        // sure the cursor never leaves [0, capacity - 1].
        let store = CommandStore::new(10);
        let mut clock = CursorClock::new(100.0, 10);
        let id = ClientId(3);
        store.install(id, vec![forward(); 10]);

        let tick = Duration::from_secs_f64(1.0 / 240.0);
        let mut now = Duration::ZERO;
        for _ in 0..1000 {
            now += tick;
            let advance = clock.should_advance(now);
            store.due_command(id, advance);
            let cursor = store.cursor(id).unwrap();
            assert!(cursor <= 9);
        }
    }

    #[test]
    fn nominal_rates_do_not_exhaust_before_replacement() {
        // Capacity 10 at 100 Hz sampling advances every 2 ms, so the cursor
        // reaches index 9 after 18 ms of tick time, well before a typical
        // 50 ms set-replacement window. With 60 Hz ticks and replacement
        // every 50 ms no exhaustion may occur.
        let store = CommandStore::new(10);
        let mut clock = CursorClock::new(100.0, 10);
        let id = ClientId(4);
        store.install(id, vec![forward(); 10]);

        let tick = Duration::from_secs_f64(1.0 / 60.0);
        let replacement = Duration::from_millis(50);
        let mut now = Duration::ZERO;
        let mut last_install = Duration::ZERO;
        for _ in 0..600 {
            now += tick;
            if last_install + replacement <= now {
                store.install(id, vec![forward(); 10]);
                last_install = now;
            }
            let advance = clock.should_advance(now);
            if let Some((_, exhausted)) = store.due_command(id, advance) {
                assert!(!exhausted, "buffer exhausted at {now:?}");
            }
        }
    }
}
