//! Gain synthesis from the ultimate point

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::UltimatePoint;
use crate::ctrl::ControlGains;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMethod {
    /// Classic Ziegler-Nichols PID
    ZieglerNichols,

    /// Ziegler-Nichols PI
    ZieglerNicholsPi,

    /// Tyreus-Luyben, less aggressive than Ziegler-Nichols
    TyreusLuyben,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SynthesisMethod {
    /// New gains from the ultimate point.
    ///
    /// Only `K`, `Ti` and `Td` are synthesised, the other gains are taken from `base`.
    pub fn synthesise(&self, ultimate: &UltimatePoint, base: &ControlGains) -> ControlGains {
        let ku = ultimate.ku;
        let tu = ultimate.tu_s;

        let (k, ti, td) = match self {
            SynthesisMethod::ZieglerNichols => (0.6 * ku, tu / 2.0, tu / 8.0),
            SynthesisMethod::ZieglerNicholsPi => (0.45 * ku, tu / 1.2, 0.0),
            SynthesisMethod::TyreusLuyben => (ku / 2.2, 2.2 * tu, tu / 6.3),
        };

        ControlGains { k, ti, td, ..*base }
    }
}
