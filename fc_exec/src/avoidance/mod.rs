//! # Obstacle avoidance module
//!
//! Every tracked obstacle pushes the quadrotor away through a repulsive potential field. Only
//! the horizontal plane is considered: obstacles are other bodies flying in the lab, and the
//! vertical axis stays with the control law.
//!
//! Alongside the repulsion a blend weight is computed, which the Blender uses to hand horizontal
//! authority over from the control law to avoidance as the nearest obstacle closes in.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector3;

// Internal
pub use params::*;

use crate::{
    potential::PotentialField,
    sample::{KinematicSample, SampleCell},
};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct ObstacleAvoidance {
    enabled: bool,
    params: AvoidanceParams,
    field: PotentialField,

    /// One cell per tracked obstacle body
    obstacles: Vec<SampleCell<KinematicSample>>,

    acceleration: Vector3<f64>,
    weight: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleAvoidance {
    pub fn new(enabled: bool, params: AvoidanceParams) -> Self {
        Self {
            enabled,
            params,
            field: Self::field(&params),
            obstacles: Vec::new(),
            acceleration: Vector3::zeros(),
            weight: 0.0,
        }
    }

    /// Start tracking a new obstacle, returning the cell its samples should be written to.
    pub fn add_obstacle(&mut self) -> SampleCell<KinematicSample> {
        let cell = SampleCell::new();
        self.obstacles.push(cell.clone());
        cell
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            debug!("Obstacle avoidance {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn set_params(&mut self, params: AvoidanceParams) {
        self.params = params;
        self.field = Self::field(&params);
    }

    /// Recompute the repulsion and blend weight from the latest obstacle positions.
    pub fn update(&mut self, own_pos_m: &Vector3<f64>) {
        let mut acc = Vector3::zeros();
        let mut min_dist = f64::INFINITY;

        // Obstacles which have not been seen yet are skipped
        for obstacle in self.obstacles.iter().filter_map(|o| o.latest()) {
            let mut away = own_pos_m - obstacle.pos_m;
            away[2] = 0.0;

            let dist = away.norm();
            min_dist = min_dist.min(dist);
            acc += self.field.acceleration(dist, &away);
        }

        // Saturate the sum, not only each contribution
        let norm = acc.norm();
        if norm > self.params.max_acc_mss {
            acc *= self.params.max_acc_mss / norm;
        }

        self.acceleration = acc;
        self.weight = self.weight_at(min_dist);

        trace!(
            "Avoidance: acc {:?}, weight {:.3}, nearest {:.3} m",
            acc.as_slice(),
            self.weight,
            min_dist
        );
    }

    /// Last repulsive acceleration, zero on the vertical axis.
    pub fn acceleration(&self) -> Vector3<f64> {
        self.acceleration
    }

    /// Share of horizontal authority given to avoidance, in `[0, 1]`. Always zero when disabled.
    pub fn blend_weight(&self) -> f64 {
        if self.enabled {
            self.weight
        } else {
            0.0
        }
    }

    /// Linear ramp from 0 at the influence radius to 1 at the safety radius.
    fn weight_at(&self, dist_m: f64) -> f64 {
        let band = self.params.influence_radius_m - self.params.safety_radius_m;
        if !(band > 0.0) {
            return if dist_m <= self.params.safety_radius_m { 1.0 } else { 0.0 };
        }

        clamp((self.params.influence_radius_m - dist_m) / band, 0.0, 1.0)
    }

    fn field(params: &AvoidanceParams) -> PotentialField {
        PotentialField::repulsive(params.gain, params.max_acc_mss, params.influence_radius_m)
    }
}
