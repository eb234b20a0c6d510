//! Control law parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::params::Validate;

use super::{autotune::RelayParams, ControlGains, LoadTransportParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters shared by every control law variant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CtrlParams {
    /// Gains of the PID law, also used by the carrier of the load transport law.
    pub pid: ControlGains,

    /// Relay experiment used by autotune.
    pub autotune: RelayParams,

    pub load_transport: LoadTransportParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Control law variant selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerType {
    #[serde(rename = "PID")]
    Pid,

    #[serde(rename = "load_transport")]
    LoadTransport,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ControllerType {
    fn default() -> Self {
        ControllerType::Pid
    }
}

impl Validate for CtrlParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = self.pid.validate();
        reset.extend(self.autotune.validate());
        reset.extend(self.load_transport.validate());
        reset
    }
}
