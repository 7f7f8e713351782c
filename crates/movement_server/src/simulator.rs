//! Deterministic movement simulation.
//!
//! [`MovementSimulator::step`] is a pure function from (physical state, one
//! input command, ground contact, elapsed time) to updated physical state. It
//! performs no I/O, keeps no hidden state, and cannot fail: axis inputs
//! outside `[-1, 1]` are tolerated because the smoothed axes are re-clamped
//! every tick. Position integration is not performed here; the loop hands the
//! resulting velocity to the entity's character controller.

use crate::command::InputCommand;
use crate::config::MovementTuning;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Physical state of one server-simulated entity.
///
/// Mutated exclusively by the simulator, once per tick, for exactly one
/// client at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalState {
    /// World-space position
    pub position: Vec3,
    /// Yaw orientation in degrees
    pub yaw: f32,
    /// Current velocity vector in units per second
    pub velocity: Vec3,
    /// Smoothed horizontal axis in [-1, 1]
    pub smoothed_horizontal: f32,
    /// Smoothed vertical axis in [-1, 1]
    pub smoothed_vertical: f32,
}

impl PhysicalState {
    /// State at rest at the given pose.
    pub fn at(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            velocity: Vec3::ZERO,
            smoothed_horizontal: 0.0,
            smoothed_vertical: 0.0,
        }
    }

    /// Orientation as a rotation about the world Y axis.
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw.to_radians())
    }
}

/// Pure, deterministic mapping from input commands to physical state updates.
#[derive(Debug, Clone, Copy)]
pub struct MovementSimulator {
    tuning: MovementTuning,
}

impl MovementSimulator {
    /// Creates a simulator with the given tuning constants.
    pub fn new(tuning: MovementTuning) -> Self {
        Self { tuning }
    }

    /// Advances `state` by one tick under `cmd`.
    ///
    /// Smoothed axes ramp toward the commanded sign and snap to zero on zero
    /// input, producing gradual turn and strafe acceleration. Yaw rotates
    /// every tick regardless of ground contact. Translation intent is only
    /// recomputed while grounded; airborne entities keep their horizontal
    /// velocity while gravity keeps accumulating.
    pub fn step(&self, state: &mut PhysicalState, cmd: &InputCommand, grounded: bool, dt: f32) {
        let step = self.tuning.axis_smoothing_step;
        state.smoothed_horizontal = smooth_axis(state.smoothed_horizontal, cmd.horizontal, step);
        state.smoothed_vertical = smooth_axis(state.smoothed_vertical, cmd.vertical, step);

        state.yaw += state.smoothed_horizontal * self.tuning.turn_speed;

        if grounded {
            let local = if cmd.strafe {
                if cmd.primary {
                    // Both modifiers held: force full forward input.
                    state.smoothed_vertical = 1.0;
                }
                Vec3::new(state.smoothed_horizontal, 0.0, state.smoothed_vertical)
            } else {
                Vec3::new(0.0, 0.0, state.smoothed_vertical)
            };

            let mut direction = state.orientation() * local * self.tuning.move_speed;
            if cmd.run {
                direction *= self.tuning.run_multiplier;
            }
            if cmd.jump {
                direction.y = self.tuning.jump_speed;
            }
            state.velocity = direction;
        }

        state.velocity.y -= self.tuning.gravity * dt;
    }
}

/// Ramps a smoothed axis toward the raw input sign by a fixed increment,
/// snapping to zero when the raw input is exactly zero.
fn smooth_axis(current: f32, raw: f32, step: f32) -> f32 {
    let next = if raw > 0.0 {
        current + step
    } else if raw < 0.0 {
        current - step
    } else {
        0.0
    };
    next.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn simulator() -> MovementSimulator {
        MovementSimulator::new(MovementTuning::default())
    }

    fn rest() -> PhysicalState {
        PhysicalState::at(Vec3::ZERO, 0.0)
    }

    #[test]
    fn axes_ramp_and_snap_to_zero() {
        let sim = simulator();
        let mut state = rest();
        let cmd = InputCommand {
            horizontal: 1.0,
            vertical: -1.0,
            ..InputCommand::default()
        };

        sim.step(&mut state, &cmd, true, DT);
        assert_eq!(state.smoothed_horizontal, 0.005);
        assert_eq!(state.smoothed_vertical, -0.005);

        sim.step(&mut state, &cmd, true, DT);
        assert_eq!(state.smoothed_horizontal, 0.010);

        sim.step(&mut state, &InputCommand::default(), true, DT);
        assert_eq!(state.smoothed_horizontal, 0.0);
        assert_eq!(state.smoothed_vertical, 0.0);
    }

    #[test]
    fn axes_clamp_even_with_out_of_range_input() {
        let sim = simulator();
        let mut state = rest();
        state.smoothed_horizontal = 0.999;
        let cmd = InputCommand {
            horizontal: 50.0,
            ..InputCommand::default()
        };

        for _ in 0..10 {
            sim.step(&mut state, &cmd, true, DT);
        }
        assert_eq!(state.smoothed_horizontal, 1.0);
    }

    #[test]
    fn yaw_turns_even_while_airborne() {
        let sim = simulator();
        let mut state = rest();
        state.smoothed_horizontal = 1.0;
        let cmd = InputCommand {
            horizontal: 1.0,
            ..InputCommand::default()
        };

        sim.step(&mut state, &cmd, false, DT);
        assert_eq!(state.yaw, 3.0);
    }

    #[test]
    fn forward_movement_follows_facing_direction() {
        let sim = simulator();
        let mut state = rest();
        state.smoothed_vertical = 1.0;
        let cmd = InputCommand {
            vertical: 1.0,
            ..InputCommand::default()
        };

        sim.step(&mut state, &cmd, true, DT);
        // Facing +Z at yaw 0, full forward input moves at move_speed.
        assert!(state.velocity.z > 7.9);
        assert!(state.velocity.x.abs() < 1e-4);
    }

    #[test]
    fn strafe_with_primary_forces_full_forward() {
        let sim = simulator();
        let mut state = rest();
        let cmd = InputCommand {
            strafe: true,
            primary: true,
            ..InputCommand::default()
        };

        sim.step(&mut state, &cmd, true, DT);
        assert_eq!(state.smoothed_vertical, 1.0);
        assert!(state.velocity.z > 7.9);
    }

    #[test]
    fn run_modifier_scales_ground_speed() {
        let sim = simulator();
        let mut walk = rest();
        walk.smoothed_vertical = 1.0;
        let mut run = walk;

        let cmd = InputCommand {
            vertical: 1.0,
            ..InputCommand::default()
        };
        let run_cmd = InputCommand { run: true, ..cmd };

        sim.step(&mut walk, &cmd, true, DT);
        sim.step(&mut run, &run_cmd, true, DT);
        assert!((run.velocity.z / walk.velocity.z - 10.0).abs() < 1e-3);
    }

    #[test]
    fn jump_sets_vertical_velocity_only_when_grounded() {
        let sim = simulator();
        let cmd = InputCommand {
            jump: true,
            ..InputCommand::default()
        };

        let mut grounded = rest();
        sim.step(&mut grounded, &cmd, true, DT);
        assert!((grounded.velocity.y - (8.0 - 20.0 * DT)).abs() < 1e-5);

        let mut airborne = rest();
        sim.step(&mut airborne, &cmd, false, DT);
        assert!(airborne.velocity.y < 0.0);
    }

    #[test]
    fn gravity_accumulates_while_airborne_without_new_intent() {
        let sim = simulator();
        let mut state = rest();
        state.velocity = Vec3::new(4.0, 0.0, 4.0);
        let cmd = InputCommand {
            vertical: -1.0,
            ..InputCommand::default()
        };

        sim.step(&mut state, &cmd, false, DT);
        sim.step(&mut state, &cmd, false, DT);
        // Horizontal velocity untouched, gravity applied twice.
        assert_eq!(state.velocity.x, 4.0);
        assert_eq!(state.velocity.z, 4.0);
        assert!((state.velocity.y + 2.0 * 20.0 * DT).abs() < 1e-5);
    }

    #[test]
    fn step_is_deterministic() {
        let sim = simulator();
        let cmd = InputCommand {
            horizontal: 0.4,
            vertical: 1.0,
            run: true,
            ..InputCommand::default()
        };
        let start = PhysicalState::at(Vec3::new(1.0, 2.0, 3.0), 45.0);

        let mut a = start;
        let mut b = start;
        for _ in 0..100 {
            sim.step(&mut a, &cmd, true, DT);
            sim.step(&mut b, &cmd, true, DT);
        }
        assert_eq!(a, b);
    }
}
