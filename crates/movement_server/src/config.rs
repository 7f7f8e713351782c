//! Simulation configuration types and defaults.
//!
//! This module contains the configuration structure and default values used
//! to initialize the simulation loop, the cursor-advance policy, and the
//! movement tuning constants.

use crate::error::SimError;
use crate::scene::SpawnPose;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default simulation tick rate for serde deserialization
fn default_tick_rate() -> f32 {
    60.0
}

/// Default state broadcast rate
fn default_broadcast_rate() -> f32 {
    20.0
}

/// Default upstream input sampling rate
fn default_sampling_rate() -> f32 {
    100.0
}

/// Default command set capacity
fn default_capacity() -> usize {
    10
}

/// Configuration for the authoritative movement simulation.
///
/// Controls the three independent cadences of the pipeline (tick rate,
/// broadcast rate, and upstream input sampling rate), the per-client command
/// buffer capacity, the spawn pose for new entities, and the movement tuning
/// constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulation tick rate in Hz
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f32,

    /// State broadcast rate in Hz; broadcasts never run more often than this
    #[serde(default = "default_broadcast_rate")]
    pub broadcast_rate_hz: f32,

    /// Rate at which the upstream client sampler produces commands, used to
    /// derive the cursor-advance interval
    #[serde(default = "default_sampling_rate")]
    pub input_sampling_rate_hz: f32,

    /// Maximum commands retained per client batch
    #[serde(default = "default_capacity")]
    pub command_set_capacity: usize,

    /// Pose applied to newly created entities
    #[serde(default)]
    pub spawn: SpawnPose,

    /// Movement tuning constants
    #[serde(default)]
    pub movement: MovementTuning,
}

/// Movement tuning constants applied by the simulator each tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    /// Yaw rotation in degrees per tick at full horizontal input
    pub turn_speed: f32,
    /// Base ground movement speed in units per second
    pub move_speed: f32,
    /// Multiplier applied to ground movement while the run modifier is held
    pub run_multiplier: f32,
    /// Vertical velocity applied when a grounded jump is requested
    pub jump_speed: f32,
    /// Downward acceleration in units per second squared
    pub gravity: f32,
    /// Per-tick increment when ramping a smoothed axis toward its input sign
    pub axis_smoothing_step: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            turn_speed: 3.0,
            move_speed: 8.0,
            run_multiplier: 10.0,
            jump_speed: 8.0,
            gravity: 20.0,
            axis_smoothing_step: 0.005,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate(),
            broadcast_rate_hz: default_broadcast_rate(),
            input_sampling_rate_hz: default_sampling_rate(),
            command_set_capacity: default_capacity(),
            spawn: SpawnPose::default(),
            movement: MovementTuning::default(),
        }
    }
}

impl SimulationConfig {
    /// Interval between simulation ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_rate_hz)
    }

    /// Minimum gap between two successive broadcasts.
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.broadcast_rate_hz)
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.tick_rate_hz > 0.0) {
            return Err(SimError::Config("tick_rate_hz must be positive".to_string()));
        }
        if !(self.broadcast_rate_hz > 0.0) {
            return Err(SimError::Config(
                "broadcast_rate_hz must be positive".to_string(),
            ));
        }
        if !(self.input_sampling_rate_hz > 0.0) {
            return Err(SimError::Config(
                "input_sampling_rate_hz must be positive".to_string(),
            ));
        }
        if self.command_set_capacity == 0 {
            return Err(SimError::Config(
                "command_set_capacity must be greater than 0".to_string(),
            ));
        }
        if !(self.movement.axis_smoothing_step > 0.0) {
            return Err(SimError::Config(
                "movement.axis_smoothing_step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_rate_hz, 60.0);
        assert_eq!(config.broadcast_rate_hz, 20.0);
        assert_eq!(config.input_sampling_rate_hz, 100.0);
        assert_eq!(config.command_set_capacity, 10);
    }

    #[test]
    fn default_tuning_constants() {
        let tuning = MovementTuning::default();
        assert_eq!(tuning.turn_speed, 3.0);
        assert_eq!(tuning.move_speed, 8.0);
        assert_eq!(tuning.run_multiplier, 10.0);
        assert_eq!(tuning.jump_speed, 8.0);
        assert_eq!(tuning.gravity, 20.0);
        assert_eq!(tuning.axis_smoothing_step, 0.005);
    }

    #[test]
    fn validation_rejects_bad_rates() {
        let mut config = SimulationConfig::default();
        config.tick_rate_hz = 0.0;
        assert!(config.validate().is_err());

        config.tick_rate_hz = 60.0;
        config.broadcast_rate_hz = -1.0;
        assert!(config.validate().is_err());

        config.broadcast_rate_hz = 20.0;
        config.command_set_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn broadcast_interval_matches_rate() {
        let config = SimulationConfig::default();
        assert_eq!(config.broadcast_interval(), Duration::from_secs_f32(0.05));
    }
}
