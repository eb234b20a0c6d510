//! # Kinematic samples
//!
//! Samples arrive asynchronously from the bus and are consumed by fixed-rate loops. Each stream
//! is carried by a [`SampleCell`]: the bus callback replaces the content, the loop copies the
//! latest value out at the start of its tick. Neither side ever waits on the other beyond the
//! copy of a few floats.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    bus::{BusError, Publisher},
    eqpt::mocap::{QuadSample, QuadSampleExt},
};
use nalgebra::Vector3;
use serde::Serialize;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position, velocity, acceleration and yaw of a rigid body in the lab frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct KinematicSample {
    pub pos_m: Vector3<f64>,
    pub vel_ms: Vector3<f64>,
    pub acc_mss: Vector3<f64>,

    /// Units: degrees
    pub yaw_deg: f64,
}

/// A target for the control law.
///
/// The carrier offset is only used by the load transport law, it is zero for single-body
/// targets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TargetSample {
    pub sample: KinematicSample,
    pub carrier_offset_m: Vector3<f64>,
}

/// Single-writer, single-reader, last-write-wins cell for samples.
///
/// The cell starts empty; `latest` returns `None` until the first sample has been written, which
/// is how consumers know the stream is not meaningful yet.
#[derive(Debug)]
pub struct SampleCell<T> {
    inner: Arc<Mutex<Option<T>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicSample {
    /// A stationary sample at the given position.
    pub fn hold(pos_m: Vector3<f64>, yaw_deg: f64) -> Self {
        Self {
            pos_m,
            yaw_deg,
            ..Default::default()
        }
    }
}

impl From<QuadSample> for KinematicSample {
    fn from(s: QuadSample) -> Self {
        Self {
            pos_m: Vector3::from(s.pos_m),
            vel_ms: Vector3::from(s.vel_ms),
            acc_mss: Vector3::from(s.acc_mss),
            yaw_deg: s.yaw_deg,
        }
    }
}

impl From<KinematicSample> for QuadSample {
    fn from(s: KinematicSample) -> Self {
        Self {
            pos_m: s.pos_m.into(),
            vel_ms: s.vel_ms.into(),
            acc_mss: s.acc_mss.into(),
            yaw_deg: s.yaw_deg,
        }
    }
}

impl From<KinematicSample> for TargetSample {
    fn from(sample: KinematicSample) -> Self {
        Self {
            sample,
            carrier_offset_m: Vector3::zeros(),
        }
    }
}

impl From<QuadSample> for TargetSample {
    fn from(s: QuadSample) -> Self {
        KinematicSample::from(s).into()
    }
}

impl From<QuadSampleExt> for TargetSample {
    fn from(s: QuadSampleExt) -> Self {
        Self {
            sample: s.payload.into(),
            carrier_offset_m: Vector3::from(s.carrier_offset_m),
        }
    }
}

impl<T: Copy> SampleCell<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the content of the cell. This is the bus callback side.
    pub fn update(&self, sample: T) {
        // A poisoned lock only means a writer panicked mid-copy of a `Copy` value, the content is
        // still a whole sample.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(sample);
    }

    /// Update from any message convertible into the cell's sample type.
    pub fn update_from<M: Into<T>>(&self, msg: M) {
        self.update(msg.into())
    }

    /// Copy of the latest sample, or `None` if no sample has been received yet.
    pub fn latest(&self) -> Option<T> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True once the first sample has been received.
    pub fn has_first(&self) -> bool {
        self.latest().is_some()
    }
}

impl<T> Clone for SampleCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Copy> Default for SampleCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process topic: publishing writes straight into the cell.
impl<T: Copy, M: Copy + Into<T>> Publisher<M> for SampleCell<T> {
    fn publish(&mut self, msg: &M) -> Result<(), BusError> {
        self.update_from(*msg);
        Ok(())
    }
}
