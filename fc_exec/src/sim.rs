//! # Point mass simulation
//!
//! A bench plant for closing the loop without hardware. The RC override frame is turned back into
//! a lab frame acceleration by inverting the actuation mapping, and a point mass is integrated
//! with it:
//!
//! - throttle gives the thrust norm, `9.8 (thr / CANCEL_GRAVITY)^2`,
//! - pitch and roll give the tilt of the thrust in the yaw frame,
//! - the yaw rate channel gives the yaw rate directly.
//!
//! The floor is at `z = 0`, the body cannot go below it.
//!
//! [`BenchParams`] describe the rest of the bench: the simulation rate, static obstacles placed
//! in the lab, and how much history is kept of each recorded stream.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::fc::RcOverride;
use log::{info, trace};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    avoidance::ObstacleAvoidance,
    blender::{actuation, BlenderParams},
    ctrl::GRAVITY_MSS,
    sample::KinematicSample,
};
use util::{maths::rem_euclid, params::Validate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of a bench run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchParams {
    /// Units: Hertz
    pub sim_frequency_hz: f64,

    /// Positions of static obstacles in the lab.
    ///
    /// Units: meters
    pub obstacles_m: Vec<[f64; 3]>,

    /// Number of samples kept of each recorded stream, the oldest are dropped first.
    pub history_len: usize,
}

/// Simulated quadrotor.
#[derive(Debug, Clone)]
pub struct PointMassSim {
    params: BlenderParams,
    state: KinematicSample,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BenchParams {
    /// Track every static obstacle, returning how many were placed.
    pub fn place_obstacles(&self, avoidance: &mut ObstacleAvoidance) -> usize {
        for pos_m in self.obstacles_m.iter() {
            info!("Static obstacle at {:?}", pos_m);
            avoidance
                .add_obstacle()
                .update(KinematicSample::hold(Vector3::from(*pos_m), 0.0));
        }

        self.obstacles_m.len()
    }
}

impl Default for BenchParams {
    fn default() -> Self {
        Self {
            sim_frequency_hz: 100.0,
            obstacles_m: Vec::new(),
            history_len: 6000,
        }
    }
}

impl Validate for BenchParams {
    fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = vec![];
        let def = Self::default();

        if !(self.sim_frequency_hz.is_finite() && self.sim_frequency_hz > 0.0) {
            self.sim_frequency_hz = def.sim_frequency_hz;
            reset.push("sim_frequency_hz");
        }

        let num_obstacles = self.obstacles_m.len();
        self.obstacles_m.retain(|o| o.iter().all(|x| x.is_finite()));
        if self.obstacles_m.len() != num_obstacles {
            reset.push("obstacles_m");
        }

        reset
    }
}

impl PointMassSim {
    /// Start at rest at the given position.
    pub fn new(params: BlenderParams, pos_m: Vector3<f64>, yaw_deg: f64) -> Self {
        Self {
            params,
            state: KinematicSample::hold(pos_m, yaw_deg),
        }
    }

    pub fn state(&self) -> &KinematicSample {
        &self.state
    }

    /// Integrate the plant over `dt_s` under the given command.
    pub fn step(&mut self, cmd: &RcOverride, dt_s: f64) -> KinematicSample {
        let mut acc = acceleration_from_command(cmd, self.state.yaw_deg, &self.params);

        let s = &mut self.state;

        // Sitting on the floor: no downward motion
        if s.pos_m[2] <= 0.0 && acc[2] < 0.0 {
            acc[2] = 0.0;
        }

        s.vel_ms += acc * dt_s;
        s.pos_m += s.vel_ms * dt_s;
        s.acc_mss = acc;

        if s.pos_m[2] < 0.0 {
            s.pos_m[2] = 0.0;
            s.vel_ms[2] = s.vel_ms[2].max(0.0);
        }

        let yaw_rate_degs = yaw_rate_from_command(cmd, &self.params).to_degrees();
        s.yaw_deg = rem_euclid(s.yaw_deg + yaw_rate_degs * dt_s + 180.0, 360.0) - 180.0;

        trace!(
            "Sim state: pos {:?}, vel {:?}, yaw {:.2}",
            s.pos_m.as_slice(),
            s.vel_ms.as_slice(),
            s.yaw_deg
        );

        *s
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Lab frame acceleration produced by a command, gravity included.
pub fn acceleration_from_command(
    cmd: &RcOverride,
    yaw_deg: f64,
    params: &BlenderParams,
) -> Vector3<f64> {
    let neutral = params.control_neutral;

    let norm = GRAVITY_MSS * (cmd.throttle() as f64 / params.control_cancel_gravity).powi(2);
    let rx = norm * ((neutral - cmd.pitch() as f64) / params.ktt_per_rad()).sin();
    let ry = norm * ((neutral - cmd.roll() as f64) / params.kphi_per_rad()).sin();
    let rz = (norm * norm - rx * rx - ry * ry).max(0.0).sqrt();

    actuation::yaw_to_lab_frame(&Vector3::new(rx, ry, rz), yaw_deg)
        - Vector3::new(0.0, 0.0, GRAVITY_MSS)
}

/// Yaw rate produced by a command.
///
/// Units: radians/second
pub fn yaw_rate_from_command(cmd: &RcOverride, params: &BlenderParams) -> f64 {
    (params.control_neutral - cmd.yaw_rate() as f64) / params.n_yaw * params.w_inf
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hover_is_balanced() {
        let params = BlenderParams::default();
        let cmd = actuation::to_rc_override(
            &Vector3::new(0.0, 0.0, GRAVITY_MSS),
            0.0,
            0.0,
            &params,
            0,
        );

        let acc = acceleration_from_command(&cmd, 0.0, &params);
        assert!(acc.norm() < 1e-9);

        let mut sim = PointMassSim::new(params, Vector3::new(0.0, 0.0, 1.0), 0.0);
        for _ in 0..100 {
            sim.step(&cmd, 0.01);
        }
        assert!((sim.state().pos_m - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_inverts_small_tilt() {
        let params = BlenderParams::default();

        // Forward and sideways at a yaw of 30 degrees
        let wanted = Vector3::new(0.4, -0.3, GRAVITY_MSS);
        let cmd = actuation::to_rc_override(&wanted, 30.0, 30.0, &params, 0);
        let acc = acceleration_from_command(&cmd, 30.0, &params);

        // Pulses are rounded to the microsecond
        let expected = wanted - Vector3::new(0.0, 0.0, GRAVITY_MSS);
        assert!((acc - expected).norm() < 0.05, "acc = {:?}", acc);
    }

    #[test]
    fn test_floor() {
        let params = BlenderParams::default();
        let mut sim = PointMassSim::new(params, Vector3::zeros(), 0.0);

        let idle = actuation::safe_command(&params);
        for _ in 0..10 {
            sim.step(&idle, 0.1);
        }

        assert_eq!(sim.state().pos_m, Vector3::zeros());
        assert_eq!(sim.state().vel_ms, Vector3::zeros());
    }

    #[test]
    fn test_static_obstacles_take_authority() {
        let mut bench = BenchParams {
            obstacles_m: vec![[0.3, 0.0, 1.0], [5.0, 5.0, f64::NAN]],
            ..Default::default()
        };
        assert_eq!(bench.validate(), vec!["obstacles_m"]);
        assert_eq!(bench.obstacles_m, vec![[0.3, 0.0, 1.0]]);

        let mut avoidance = ObstacleAvoidance::new(true, BlenderParams::default().avoidance);
        assert_eq!(bench.place_obstacles(&mut avoidance), 1);

        avoidance.update(&Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(avoidance.blend_weight(), 1.0);
        assert!(avoidance.acceleration()[0] < 0.0);
    }

    #[test]
    fn test_yaw_rate_sign() {
        let params = BlenderParams::default();
        let hover = Vector3::new(0.0, 0.0, GRAVITY_MSS);

        // Behind the target, the sim turns towards it
        let cmd = actuation::to_rc_override(&hover, -10.0, 0.0, &params, 0);
        assert!(yaw_rate_from_command(&cmd, &params) > 0.0);

        let mut sim = PointMassSim::new(params, Vector3::new(0.0, 0.0, 1.0), -10.0);
        sim.step(&cmd, 0.1);
        assert!(sim.state().yaw_deg > -10.0);
    }
}
