//! Utility library for the quadrotor flight-control software
//!
//! Everything an executable needs around the control core: the session directory, logging,
//! parameter files, fixed-rate timing and the shutdown flag.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod shutdown;
pub mod time;
