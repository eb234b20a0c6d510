//! # Load transport law
//!
//! Cascaded law for a carrier quadrotor transporting a payload. The carrier tracks the payload
//! target shifted by the configured carrier offset with a PID law, and the payload tracking error
//! perturbs that command:
//!
//! ```text
//! u = PID(carrier, p* + o) + g z + K_load (e_p - e_c) + D_load (v_carrier - v_payload)
//! ```
//!
//! With the payload on the carrier and no offset both corrections vanish and the law is the PID
//! law plus gravity compensation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use util::params::Validate;

// Internal
use super::{PidLaw, GRAVITY_MSS};
use crate::sample::{KinematicSample, TargetSample};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTransportParams {
    /// Gain on the difference between the payload and carrier position errors
    pub k_load: f64,

    /// Gain on the carrier to payload relative velocity
    pub d_load: f64,
}

#[derive(Debug)]
pub struct LoadTransportLaw {
    carrier: PidLaw,
    params: LoadTransportParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LoadTransportParams {
    fn default() -> Self {
        Self {
            k_load: 0.5,
            d_load: 0.2,
        }
    }
}

impl Validate for LoadTransportParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        if !self.k_load.is_finite() {
            self.k_load = def.k_load;
            reset.push("k_load");
        }
        if !self.d_load.is_finite() {
            self.d_load = def.d_load;
            reset.push("d_load");
        }

        reset
    }
}

impl LoadTransportLaw {
    pub fn new(carrier: PidLaw, params: LoadTransportParams) -> Self {
        Self { carrier, params }
    }

    /// Commanded acceleration of the carrier, including gravity compensation.
    pub fn compute_acceleration(
        &mut self,
        payload: &KinematicSample,
        carrier: &KinematicSample,
        target: &TargetSample,
    ) -> Vector3<f64> {
        let payload_target = target.sample.pos_m;
        let carrier_target = KinematicSample {
            pos_m: payload_target + target.carrier_offset_m,
            ..target.sample
        };

        let u_carrier = self.carrier.compute_acceleration(carrier, &carrier_target);

        let e_payload = payload_target - payload.pos_m;
        let e_carrier = carrier_target.pos_m - carrier.pos_m;

        let correction = (e_payload - e_carrier) * self.params.k_load
            + (carrier.vel_ms - payload.vel_ms) * self.params.d_load;

        trace!("Load transport correction: {:?}", correction.as_slice());

        u_carrier + Vector3::z() * GRAVITY_MSS + correction
    }

    pub fn set_params(&mut self, params: LoadTransportParams) {
        self.params = params;
    }

    pub fn carrier(&self) -> &PidLaw {
        &self.carrier
    }

    pub fn carrier_mut(&mut self) -> &mut PidLaw {
        &mut self.carrier
    }
}
