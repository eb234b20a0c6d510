//! PID gains

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::params::Validate;

use super::CtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of a setpoint-weighted PID controller with filtered derivative.
///
/// Field names in parameter files follow the usual control notation (`K`, `Ti`, `Td`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlGains {
    /// Proportional gain
    #[serde(rename = "K")]
    pub k: f64,

    /// Integral time.
    ///
    /// Units: seconds
    #[serde(rename = "Ti")]
    pub ti: f64,

    /// Derivative time.
    ///
    /// Units: seconds
    #[serde(rename = "Td")]
    pub td: f64,

    /// Setpoint weight of the proportional branch
    pub b: f64,

    /// Setpoint weight of the derivative branch
    pub c: f64,

    /// Derivative filter coefficient
    #[serde(rename = "N")]
    pub n: f64,

    /// Output bias
    pub u0: f64,

    /// Magnitude of the integral branch beyond which the accumulator freezes
    #[serde(rename = "I_lim")]
    pub i_lim: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlGains {
    /// Set a single gain by its parameter name.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), CtrlError> {
        let gain = match name {
            "K" => &mut self.k,
            "Ti" => &mut self.ti,
            "Td" => &mut self.td,
            "b" => &mut self.b,
            "c" => &mut self.c,
            "N" => &mut self.n,
            "u0" => &mut self.u0,
            "I_lim" => &mut self.i_lim,
            _ => return Err(CtrlError::UnknownGain(name.to_string())),
        };

        // An infinite integral time switches the integral branch off
        let valid = value.is_finite() || (name == "Ti" && value == f64::INFINITY);
        if !valid {
            return Err(CtrlError::InvalidGain(name.to_string(), value));
        }

        *gain = value;
        Ok(())
    }
}

impl Default for ControlGains {
    fn default() -> Self {
        Self {
            k: 0.05,
            ti: 10000.0,
            td: 0.0,
            b: 1.0,
            c: 1.0,
            n: 100.0,
            u0: 0.0,
            i_lim: 10000.0,
        }
    }
}

impl Validate for ControlGains {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        // Ti may be infinite, which disables the integral branch
        if !(self.ti > 0.0) {
            self.ti = def.ti;
            reset.push("Ti");
        }

        let mut check = |field: &mut f64, default: f64, valid: fn(f64) -> bool, name: &'static str| {
            if !(field.is_finite() && valid(*field)) {
                *field = default;
                reset.push(name);
            }
        };

        check(&mut self.k, def.k, |_| true, "K");
        check(&mut self.td, def.td, |v| v >= 0.0, "Td");
        check(&mut self.b, def.b, |_| true, "b");
        check(&mut self.c, def.c, |_| true, "c");
        check(&mut self.n, def.n, |v| v > 0.0, "N");
        check(&mut self.u0, def.u0, |_| true, "u0");
        check(&mut self.i_lim, def.i_lim, |v| v > 0.0, "I_lim");

        reset
    }
}
