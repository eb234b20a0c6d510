//! # Control law module
//!
//! The control law turns the current and target samples into a commanded acceleration in the lab
//! frame. Two variants exist, selected by configuration:
//!
//! - `PID` - one PID per axis, with an embedded autotune state machine,
//! - `load_transport` - a carrier PID perturbed by the payload tracking error.
//!
//! Switching variant replaces the whole law instance, between two ticks.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod autotune;
mod gains;
mod load_transport;
mod params;
mod pid;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
pub use gains::*;
pub use load_transport::*;
pub use params::*;
pub use pid::*;

use crate::sample::{KinematicSample, TargetSample};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Gravity compensation added on the vertical axis.
///
/// Units: meters/second^2
pub const GRAVITY_MSS: f64 = 9.8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Samples the law is computed from.
#[derive(Debug, Clone, Copy, Default)]
pub struct LawInput {
    pub current: KinematicSample,
    pub target: TargetSample,

    /// Payload sample, only used by the load transport law.
    pub payload: Option<KinematicSample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A lab axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug)]
pub enum ControlLaw {
    Pid(PidLaw),
    LoadTransport(LoadTransportLaw),
}

#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("Unknown gain \"{0}\"")]
    UnknownGain(String),

    #[error("Invalid value {1} for gain \"{0}\"")]
    InvalidGain(String, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl ControlLaw {
    /// Build a fresh law of the given type.
    pub fn new(controller_type: ControllerType, params: &CtrlParams, period_s: f64) -> Self {
        let pid = PidLaw::new(params.pid, period_s, params.autotune);

        match controller_type {
            ControllerType::Pid => ControlLaw::Pid(pid),
            ControllerType::LoadTransport => {
                ControlLaw::LoadTransport(LoadTransportLaw::new(pid, params.load_transport))
            }
        }
    }

    pub fn controller_type(&self) -> ControllerType {
        match self {
            ControlLaw::Pid(_) => ControllerType::Pid,
            ControlLaw::LoadTransport(_) => ControllerType::LoadTransport,
        }
    }

    /// Commanded acceleration in the lab frame.
    ///
    /// The PID variant does not compensate gravity, see [`ControlLaw::gravity_bias`].
    pub fn compute_acceleration(&mut self, input: &LawInput) -> Vector3<f64> {
        match self {
            ControlLaw::Pid(law) => law.compute_acceleration(&input.current, &input.target.sample),
            ControlLaw::LoadTransport(law) => {
                // Without a payload measurement the payload is taken to be on the carrier
                let payload = match input.payload {
                    Some(p) => p,
                    None => {
                        debug!("No payload sample, using the carrier");
                        input.current
                    }
                };
                law.compute_acceleration(&payload, &input.current, &input.target)
            }
        }
    }

    /// Gravity compensation to add to the law's output.
    pub fn gravity_bias(&self) -> Vector3<f64> {
        match self {
            ControlLaw::Pid(_) => Vector3::z() * GRAVITY_MSS,
            ControlLaw::LoadTransport(_) => Vector3::zeros(),
        }
    }

    /// Clear all controller state, at every (re)start of tracking.
    pub fn reset(&mut self) {
        self.pid_mut().reset();
    }

    /// Apply new parameters to the running law, keeping its state.
    ///
    /// Gains are only replaced if they differ from `prev`, so gains set by autotune survive a
    /// reload which does not touch them.
    pub fn reconfigure(&mut self, prev: &CtrlParams, params: &CtrlParams) {
        if let ControlLaw::LoadTransport(law) = self {
            law.set_params(params.load_transport);
        }

        let pid = self.pid_mut();
        if params.pid != prev.pid {
            pid.replace_gains(params.pid);
        }
        pid.set_relay_params(params.autotune);
    }

    /// The PID law, or the carrier PID of the load transport law.
    pub fn pid(&self) -> &PidLaw {
        match self {
            ControlLaw::Pid(law) => law,
            ControlLaw::LoadTransport(law) => law.carrier(),
        }
    }

    pub fn pid_mut(&mut self) -> &mut PidLaw {
        match self {
            ControlLaw::Pid(law) => law,
            ControlLaw::LoadTransport(law) => law.carrier_mut(),
        }
    }
}
