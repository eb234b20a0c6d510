//! # Flight Controller Commands
//!
//! RC override frames sent to the flight controller interface.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of channels in an RC override frame.
pub const NUM_RC_CHANNELS: usize = 8;

/// Index of the roll channel.
pub const CH_ROLL: usize = 0;

/// Index of the pitch channel.
pub const CH_PITCH: usize = 1;

/// Index of the throttle channel.
pub const CH_THROTTLE: usize = 2;

/// Index of the yaw rate channel.
pub const CH_YAW_RATE: usize = 3;

/// Index of the auxiliary channel (channel 6 of the transmitter).
pub const CH_AUX: usize = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An RC override frame.
///
/// Each channel is a pulse width in microseconds. A value of zero releases the channel back to
/// the transmitter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RcOverride {
    pub channels: [u16; NUM_RC_CHANNELS],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RcOverride {
    pub fn roll(&self) -> u16 {
        self.channels[CH_ROLL]
    }

    pub fn pitch(&self) -> u16 {
        self.channels[CH_PITCH]
    }

    pub fn throttle(&self) -> u16 {
        self.channels[CH_THROTTLE]
    }

    pub fn yaw_rate(&self) -> u16 {
        self.channels[CH_YAW_RATE]
    }

    pub fn aux(&self) -> u16 {
        self.channels[CH_AUX]
    }
}
