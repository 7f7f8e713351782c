//! State snapshots and the broadcast seam.
//!
//! At broadcast time the loop projects every live entity's physical state
//! into an immutable [`StateSnapshot`], batches them with a sequence number,
//! and hands the batch to a [`SnapshotSink`]. The sink only ever sees these
//! read-only projections, never the live state, so there is nothing to tear.

use crate::command::ClientId;
use crate::error::SimError;
use crate::simulator::PhysicalState;
use async_trait::async_trait;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Read-only projection of one entity's state at broadcast time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Client the state belongs to
    pub client_id: ClientId,
    /// World-space position
    pub position: Vec3,
    /// Yaw orientation in degrees
    pub yaw: f32,
}

impl StateSnapshot {
    /// Projects a client's physical state.
    pub fn of(client_id: ClientId, state: &PhysicalState) -> Self {
        Self {
            client_id,
            position: state.position,
            yaw: state.yaw,
        }
    }
}

/// An ordered set of snapshots emitted at most once per broadcast interval.
///
/// Sequence numbers start at 0 and increase by one with each successive
/// non-empty broadcast; suppressed empty batches never consume a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBatch {
    /// Monotonically increasing broadcast sequence number
    pub sequence: u64,
    /// One snapshot per live entity
    pub states: Vec<StateSnapshot>,
}

/// Channel capable of delivering a snapshot batch to all connected peers.
///
/// Fire-and-forget from the loop's perspective: no acknowledgment is awaited
/// and a failed broadcast is logged, never fatal.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Sends `batch` to every connected peer.
    async fn broadcast(&self, batch: SnapshotBatch) -> Result<(), SimError>;
}

/// Broadcast sink that fans JSON-encoded batches out to subscribers over a
/// `tokio::sync::broadcast` channel.
///
/// Each connection handler subscribes and forwards payloads to its peer; a
/// send with no subscribers is not an error, the batch is simply dropped.
#[derive(Debug)]
pub struct ChannelSink {
    sender: broadcast::Sender<Vec<u8>>,
}

impl ChannelSink {
    /// Creates a sink with the given channel buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new receiver for broadcast payloads.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl SnapshotSink for ChannelSink {
    async fn broadcast(&self, batch: SnapshotBatch) -> Result<(), SimError> {
        let payload =
            serde_json::to_vec(&batch).map_err(|e| SimError::Broadcast(e.to_string()))?;
        match self.sender.send(payload) {
            Ok(receivers) => {
                debug!(
                    "Broadcast batch seq={} ({} states) to {} receivers",
                    batch.sequence,
                    batch.states.len(),
                    receivers
                );
            }
            Err(_) => {
                debug!("No receivers for batch seq={}, dropped", batch.sequence);
            }
        }
        Ok(())
    }
}
