//! # Blender module
//!
//! The Blender is the actuation core of the flight software. Every tick it
//!
//! 1. reads the latest measured and target samples,
//! 2. computes the control law acceleration (plus gravity compensation for the PID law),
//! 3. blends the horizontal axes with obstacle avoidance,
//! 4. maps the result to an RC override frame,
//! 5. dispatches the frame if the security guard permits it.
//!
//! Until the first target arrives a minimal throttle safe frame is sent instead. Once permission
//! is revoked the loop stops for good.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod actuation;
mod exec;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::bus::BusError;

pub use exec::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tilt the pitch and roll gains are expressed for.
///
/// Units: degrees
pub const GAIN_REFERENCE_ANGLE_DEG: f64 = 20.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BlenderError {
    #[error("The Blender has not been initialised")]
    NotInitialised,

    #[error("Could not dispatch the RC override: {0}")]
    PublishError(#[from] BusError),
}
