//! # Equipment Interface
//!
//! This module defines the interface structures which are sent to or received from the lab
//! equipment over the bus.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod fc;
pub mod guard;
pub mod mocap;
