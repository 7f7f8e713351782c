//! Transport layer seam.
//!
//! The core never owns wire framing, ordering, or retransmission. It only
//! needs three things from a transport: per-client command batches pushed
//! into the [`CommandStore`](crate::command::CommandStore), disconnect
//! notifications, and the authoritative set of currently connected clients
//! used for stale-entity pruning.

use crate::command::{ClientId, CommandStore, InputCommand};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// The connection-set view the simulation loop needs from a transport.
pub trait Transport: Send + Sync {
    /// Snapshot of the clients the transport currently considers connected.
    fn connected_clients(&self) -> HashSet<ClientId>;
}

/// In-process transport for embedding and tests.
///
/// Holds the live connection set, feeds command batches into the shared
/// store, and queues disconnect notifications for the simulation loop to
/// drain at the start of its next tick. All mutations are atomic between
/// ticks, which is the visibility precondition the loop depends on.
#[derive(Debug)]
pub struct InMemoryTransport {
    connected: DashMap<ClientId, ()>,
    commands: Arc<CommandStore>,
    disconnects: mpsc::UnboundedSender<ClientId>,
}

impl InMemoryTransport {
    /// Creates a transport around a shared command store.
    ///
    /// Returns the transport and the receiver the simulation loop drains for
    /// disconnect notifications.
    pub fn new(commands: Arc<CommandStore>) -> (Arc<Self>, mpsc::UnboundedReceiver<ClientId>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            connected: DashMap::new(),
            commands,
            disconnects: sender,
        });
        (transport, receiver)
    }

    /// Marks a client as connected.
    pub fn connect(&self, client_id: ClientId) {
        self.connected.insert(client_id, ());
        info!("Client connected: {}", client_id);
    }

    /// Marks a client as disconnected and queues the notification for the
    /// loop. Pending commands are left in place; the loop discards them when
    /// it processes the notification.
    pub fn disconnect(&self, client_id: ClientId) {
        self.connected.remove(&client_id);
        // Receiver dropping just means the loop already stopped.
        let _ = self.disconnects.send(client_id);
        info!("Client disconnected: {}", client_id);
    }

    /// Installs a freshly received command batch for a client, replacing any
    /// previous set and resetting its cursor.
    pub fn submit_commands(&self, client_id: ClientId, commands: Vec<InputCommand>) {
        self.commands.install(client_id, commands);
    }

    /// The shared command store this transport feeds.
    pub fn command_store(&self) -> Arc<CommandStore> {
        Arc::clone(&self.commands)
    }
}

impl Transport for InMemoryTransport {
    fn connected_clients(&self) -> HashSet<ClientId> {
        self.connected.iter().map(|entry| *entry.key()).collect()
    }
}
