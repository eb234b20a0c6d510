//! # Communications interface crate.
//!
//! Provides the messages exchanged between the flight-control core and the
//! rest of the lab over the publish/subscribe bus, and the [`bus::Publisher`]
//! seam through which the core sends them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for equipment (motion capture, flight controller, safety guard)
pub mod eqpt;

/// Publishing side of the bus
pub mod bus;
