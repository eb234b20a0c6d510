//! # Flight control library.
//!
//! This library holds every module of the quadrotor flight-control core, so that the executables
//! in this crate and the benches can share them.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Obstacle avoidance - repulsive acceleration and blend weight from nearby bodies
pub mod avoidance;

/// Blender - the actuation core, turns accelerations into RC override frames
pub mod blender;

/// Control laws - PID (with autotune) and load transport
pub mod ctrl;

/// Permission gate - safety interlock driven by the security guard
pub mod permission;

/// Potential field generator shared by the leader trajectory and obstacle avoidance
pub mod potential;

/// Kinematic samples and the last-write-wins cells they are exchanged through
pub mod sample;

/// Point mass simulation used to close the loop on the bench
pub mod sim;

/// Trajectory generation - kinematic profiles and trajectory modes
pub mod traj_gen;
