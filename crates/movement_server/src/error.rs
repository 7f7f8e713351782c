//! Error types for the movement server core.
//!
//! The simulation loop itself has no fatal failure modes: rate mismatches,
//! stale entities, and disconnect races are all self-healing diagnostics.
//! These types cover the edges where the core meets its collaborators.

/// Enumeration of possible simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A snapshot batch could not be handed to the broadcast channel
    #[error("Broadcast error: {0}")]
    Broadcast(String),

    /// Invalid configuration values detected before the loop starts
    #[error("Configuration error: {0}")]
    Config(String),
}
