//! Trajectory generation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use util::params::Validate;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default acceleration bound of straight line trajectories.
///
/// Units: meters/second^2
pub const STRAIGHT_LINE_A_MAX_MSS: f64 = 9.81 / 3.0;

/// Default acceleration bound of leader trajectories, 0.6 m/s around a 0.8 m circle.
///
/// Units: meters/second^2
pub const LEADER_A_MAX_MSS: f64 = 0.6 * 0.6 / 0.8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the trajectory generator executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajGenParams {
    /// Trajectories to run, in order.
    pub trajectories: Vec<TrajectorySpec>,

    /// Time to keep holding the last target after the sequence completes.
    ///
    /// Units: seconds
    pub hold_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightLineParams {
    /// Units: meters
    pub start_m: [f64; 3],

    /// Units: meters
    pub end_m: [f64; 3],

    /// Units: meters/second^2
    pub a_max_mss: f64,

    /// Yaw held along the line.
    ///
    /// Units: degrees
    pub yaw_deg: f64,

    /// Carrier position relative to the target, for load transport.
    ///
    /// Units: meters
    pub carrier_offset_m: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderParams {
    /// Centre of the leader's circle.
    ///
    /// Units: meters
    pub mid_m: [f64; 3],

    /// Start point of the leader, also the initial target position.
    ///
    /// Units: meters
    pub start_m: [f64; 3],

    /// Initial velocity of the leader. Only its component tangential to the circle gives the
    /// direction of travel, its magnitude gives the requested speed.
    ///
    /// Units: meters/second
    pub velocity_ms: [f64; 3],

    /// Angle travelled around the circle before completion.
    ///
    /// Units: radians
    pub angle_rad: f64,

    /// Units: meters/second^2
    pub a_max_mss: f64,

    /// Gain of the attractive field towards the leader.
    pub field_gain: f64,

    /// Saturation of the attractive field.
    ///
    /// Units: meters/second^2
    pub field_max_acc_mss: f64,

    /// Units: degrees
    pub yaw_deg: f64,

    /// Carrier position relative to the target, for load transport.
    ///
    /// Units: meters
    pub carrier_offset_m: [f64; 3],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Description of one trajectory in the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrajectorySpec {
    StraightLine(StraightLineParams),
    LeaderFollower(LeaderParams),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectorySpec {
    /// Carrier offset published with every target of this trajectory.
    pub fn carrier_offset_m(&self) -> [f64; 3] {
        match self {
            TrajectorySpec::StraightLine(p) => p.carrier_offset_m,
            TrajectorySpec::LeaderFollower(p) => p.carrier_offset_m,
        }
    }
}

impl TrajGenParams {
    /// Point on the floor below the start of the first trajectory.
    pub fn take_off_point(&self) -> [f64; 3] {
        let start = match self.trajectories.first() {
            Some(TrajectorySpec::StraightLine(p)) => p.start_m,
            Some(TrajectorySpec::LeaderFollower(p)) => p.start_m,
            None => [0.0; 3],
        };

        [start[0], start[1], 0.0]
    }
}

impl Default for TrajGenParams {
    fn default() -> Self {
        Self {
            trajectories: vec![TrajectorySpec::StraightLine(StraightLineParams::default())],
            hold_s: 2.0,
        }
    }
}

impl Default for StraightLineParams {
    fn default() -> Self {
        Self {
            start_m: [0.0, 0.0, 0.2],
            end_m: [0.0, 0.0, 0.6],
            a_max_mss: STRAIGHT_LINE_A_MAX_MSS,
            yaw_deg: 0.0,
            carrier_offset_m: [0.0; 3],
        }
    }
}

impl Default for LeaderParams {
    fn default() -> Self {
        Self {
            mid_m: [0.0, 0.0, 0.6],
            start_m: [0.8, 0.0, 0.6],
            velocity_ms: [0.0, 0.5, 0.0],
            angle_rad: 2.0 * PI,
            a_max_mss: LEADER_A_MAX_MSS,
            field_gain: 1.0,
            field_max_acc_mss: LEADER_A_MAX_MSS,
            yaw_deg: 0.0,
            carrier_offset_m: [0.0; 3],
        }
    }
}

impl Validate for TrajGenParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];

        if !(self.hold_s.is_finite() && self.hold_s >= 0.0) {
            self.hold_s = Self::default().hold_s;
            reset.push("hold_s");
        }

        for spec in self.trajectories.iter_mut() {
            match spec {
                TrajectorySpec::StraightLine(p) => reset.extend(p.validate()),
                TrajectorySpec::LeaderFollower(p) => reset.extend(p.validate()),
            }
        }

        reset
    }
}

impl Validate for StraightLineParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        if !all_finite(&self.start_m) {
            self.start_m = def.start_m;
            reset.push("start_m");
        }
        if !all_finite(&self.end_m) {
            self.end_m = def.end_m;
            reset.push("end_m");
        }
        if !positive(self.a_max_mss) {
            self.a_max_mss = def.a_max_mss;
            reset.push("a_max_mss");
        }
        if !self.yaw_deg.is_finite() {
            self.yaw_deg = def.yaw_deg;
            reset.push("yaw_deg");
        }
        if !all_finite(&self.carrier_offset_m) {
            self.carrier_offset_m = def.carrier_offset_m;
            reset.push("carrier_offset_m");
        }

        reset
    }
}

impl Validate for LeaderParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        if !all_finite(&self.mid_m) {
            self.mid_m = def.mid_m;
            reset.push("mid_m");
        }
        if !all_finite(&self.start_m) {
            self.start_m = def.start_m;
            reset.push("start_m");
        }
        if !all_finite(&self.velocity_ms) {
            self.velocity_ms = def.velocity_ms;
            reset.push("velocity_ms");
        }
        if !(self.angle_rad.is_finite() && self.angle_rad >= 0.0) {
            self.angle_rad = def.angle_rad;
            reset.push("angle_rad");
        }
        if !positive(self.a_max_mss) {
            self.a_max_mss = def.a_max_mss;
            reset.push("a_max_mss");
        }
        if !(self.field_gain.is_finite() && self.field_gain >= 0.0) {
            self.field_gain = def.field_gain;
            reset.push("field_gain");
        }
        if !positive(self.field_max_acc_mss) {
            self.field_max_acc_mss = def.field_max_acc_mss;
            reset.push("field_max_acc_mss");
        }
        if !self.yaw_deg.is_finite() {
            self.yaw_deg = def.yaw_deg;
            reset.push("yaw_deg");
        }
        if !all_finite(&self.carrier_offset_m) {
            self.carrier_offset_m = def.carrier_offset_m;
            reset.push("carrier_offset_m");
        }

        reset
    }
}

fn all_finite(v: &[f64; 3]) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
