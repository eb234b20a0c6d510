//! # Autotune
//!
//! An autotune session identifies the ultimate point of one axis and synthesises new gains from
//! it. Sessions are owned by the PID law while it is identifying and consumed once they have an
//! outcome.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod relay;
mod synthesis;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use relay::*;
pub use synthesis::*;

use super::{Axis, ControlGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Which axis to tune and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutotuneRequest {
    pub axis: Axis,
    pub identification: IdentificationMethod,
    pub synthesis: SynthesisMethod,
}

/// A running autotune session.
#[derive(Debug)]
pub struct AutotuneSession {
    pub request: AutotuneRequest,
    identification: RelayIdentification,
}

/// Outcome of a successful session, saved to the session directory.
#[derive(Debug, Clone, Serialize)]
pub struct AutotuneRecord {
    /// RFC 3339 UTC time the session completed at
    pub completed_at: String,

    pub request: AutotuneRequest,
    pub ultimate: UltimatePoint,
    pub gains: ControlGains,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationMethod {
    /// Relay feedback with hysteresis
    Relay,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AutotuneRecord {
    /// Record a session completing now.
    pub fn new(request: AutotuneRequest, ultimate: UltimatePoint, gains: ControlGains) -> Self {
        Self {
            completed_at: Utc::now().to_rfc3339(),
            request,
            ultimate,
            gains,
        }
    }
}

impl AutotuneSession {
    pub fn new(request: AutotuneRequest, relay: RelayParams, period_s: f64, u0: f64) -> Self {
        let identification = match request.identification {
            IdentificationMethod::Relay => RelayIdentification::new(relay, period_s, u0),
        };

        Self {
            request,
            identification,
        }
    }

    /// Feed one tick of the tuned axis error, returning the command for that axis.
    pub fn step(&mut self, error: f64) -> f64 {
        self.identification.step(error)
    }

    /// `None` while identification is running.
    pub fn outcome(&self) -> Option<Result<UltimatePoint, IdentificationError>> {
        self.identification.outcome()
    }
}
