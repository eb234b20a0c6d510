//! # Permission gate
//!
//! The security guard publishes a boolean permission. The gate turns that signal into a three
//! state interlock:
//!
//! - `NotStarted` -> `Running` on the first granted signal,
//! - `Running` -> `Halted` as soon as a denial is seen,
//! - `Halted` is terminal.
//!
//! A denial received before the first grant has no effect.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info};
use serde::Serialize;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermissionState {
    NotStarted,
    Running,
    Halted,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cloneable handle to the gate. The bus callback calls `on_signal`, the control loop reads
/// `state` when it is about to dispatch.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    state: Arc<Mutex<PermissionState>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PermissionState::NotStarted)),
        }
    }

    /// Feed a permission signal into the gate, returning the resulting state.
    pub fn on_signal(&self, granted: bool) -> PermissionState {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        *state = match (*state, granted) {
            (PermissionState::NotStarted, true) => {
                info!("Permission granted by security guard");
                PermissionState::Running
            }
            (PermissionState::Running, false) => {
                error!("Permission revoked by security guard");
                PermissionState::Halted
            }
            (s, _) => s,
        };

        *state
    }

    pub fn state(&self) -> PermissionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}
