//! # Blender state
//!
//! One Blender tick: run the control law, blend with obstacle avoidance, then map the result to
//! an RC override frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::fc::RcOverride;
use log::{info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{actuation, BlenderError, BlenderParams};
use crate::{
    avoidance::ObstacleAvoidance,
    ctrl::{ControlLaw, ControllerType, LawInput},
    sample::KinematicSample,
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The Blender module.
pub struct Blender {
    params: BlenderParams,

    /// Sample period of the control law, fixed for the lifetime of the loop
    period_s: f64,

    law: Option<ControlLaw>,
    avoidance: ObstacleAvoidance,
}

/// Input data of one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub law: LawInput,

    /// Value of the auxiliary channel
    pub aux: u16,
}

/// Status report of one tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub controller_type: ControllerType,

    /// Control law output, gravity compensation included
    pub ctrl_acc_mss: Vector3<f64>,

    pub avoid_acc_mss: Vector3<f64>,
    pub blend_weight: f64,

    /// Acceleration the frame was built from
    pub blended_acc_mss: Vector3<f64>,

    pub identifying: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Blender {
    pub fn new() -> Self {
        let params = BlenderParams::default();

        Self {
            params,
            period_s: params.period_s(),
            law: None,
            avoidance: ObstacleAvoidance::new(params.obstacle_avoidance, params.avoidance),
        }
    }

    pub fn params(&self) -> &BlenderParams {
        &self.params
    }

    pub fn law(&self) -> Option<&ControlLaw> {
        self.law.as_ref()
    }

    pub fn law_mut(&mut self) -> Option<&mut ControlLaw> {
        self.law.as_mut()
    }

    pub fn avoidance_mut(&mut self) -> &mut ObstacleAvoidance {
        &mut self.avoidance
    }

    /// Reset the control law, at every (re)start of tracking.
    pub fn reset(&mut self) {
        if let Some(law) = self.law.as_mut() {
            law.reset();
        }
    }

    /// Apply new parameters between two ticks.
    ///
    /// A change of controller type replaces the law with a fresh instance, otherwise the running
    /// law is reconfigured in place. The loop frequency cannot change while running.
    pub fn reconfigure(&mut self, mut params: BlenderParams) {
        if params.controller_frequency_hz != self.params.controller_frequency_hz {
            warn!(
                "CONTROLLER_FREQUENCY change to {} Hz only applies on restart, keeping {} Hz",
                params.controller_frequency_hz, self.params.controller_frequency_hz
            );
            params.controller_frequency_hz = self.params.controller_frequency_hz;
        }

        match self.law.as_mut() {
            Some(law) if law.controller_type() == params.controller_type => {
                law.reconfigure(&self.params.ctrl, &params.ctrl);
            }
            _ => {
                info!("Switching to the {:?} control law", params.controller_type);
                self.law = Some(ControlLaw::new(
                    params.controller_type,
                    &params.ctrl,
                    self.period_s,
                ));
            }
        }

        self.avoidance.set_enabled(params.obstacle_avoidance);
        self.avoidance.set_params(params.avoidance);
        self.params = params;

        info!("Blender parameters reloaded");
    }
}

impl Default for Blender {
    fn default() -> Self {
        Self::new()
    }
}

impl State for Blender {
    type InitData = BlenderParams;
    type InitError = BlenderError;

    type InputData = TickInput;
    type OutputData = RcOverride;
    type StatusReport = StatusReport;
    type ProcError = BlenderError;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        self.params = init_data;
        self.period_s = init_data.period_s();
        self.law = Some(ControlLaw::new(
            init_data.controller_type,
            &init_data.ctrl,
            self.period_s,
        ));
        self.avoidance.set_enabled(init_data.obstacle_avoidance);
        self.avoidance.set_params(init_data.avoidance);

        info!(
            "Blender initialised: {:?} law at {} Hz, obstacle avoidance {}",
            init_data.controller_type,
            init_data.controller_frequency_hz,
            if init_data.obstacle_avoidance { "on" } else { "off" }
        );

        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let law = match self.law.as_mut() {
            Some(l) => l,
            None => return Err(BlenderError::NotInitialised),
        };

        let current: &KinematicSample = &input_data.law.current;
        let target = &input_data.law.target.sample;

        let ctrl_acc = law.compute_acceleration(&input_data.law) + law.gravity_bias();

        self.avoidance.update(&current.pos_m);
        let avoid_acc = self.avoidance.acceleration();
        let weight = self.avoidance.blend_weight();

        let blended = actuation::blend(&ctrl_acc, &avoid_acc, weight);

        let cmd = actuation::to_rc_override(
            &blended,
            current.yaw_deg,
            target.yaw_deg,
            &self.params,
            input_data.aux,
        );

        trace!("Blender command: {:?}", cmd.channels);

        let report = StatusReport {
            controller_type: law.controller_type(),
            ctrl_acc_mss: ctrl_acc,
            avoid_acc_mss: avoid_acc,
            blend_weight: weight,
            blended_acc_mss: blended,
            identifying: law.pid().is_identifying(),
        };

        Ok((cmd, report))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sample::TargetSample;

    fn blender(params: BlenderParams) -> Blender {
        let mut b = Blender::new();
        b.init(params).unwrap();
        b
    }

    fn input(current: [f64; 3], target: [f64; 3]) -> TickInput {
        TickInput {
            law: LawInput {
                current: KinematicSample::hold(Vector3::from(current), 0.0),
                target: TargetSample::from(KinematicSample::hold(Vector3::from(target), 0.0)),
                payload: None,
            },
            aux: 0,
        }
    }

    #[test]
    fn test_not_initialised() {
        let mut b = Blender::new();
        assert!(matches!(
            b.proc(&input([0.0; 3], [0.0; 3])),
            Err(BlenderError::NotInitialised)
        ));
    }

    #[test]
    fn test_hover_on_target() {
        let mut b = blender(BlenderParams::default());
        let (cmd, report) = b.proc(&input([0.0, 0.0, 1.0], [0.0, 0.0, 1.0])).unwrap();

        assert_eq!(cmd.throttle(), 1400);
        assert_eq!(cmd.pitch(), 1500);
        assert_eq!(cmd.roll(), 1500);
        assert_eq!(report.blend_weight, 0.0);
        assert!((report.ctrl_acc_mss[2] - 9.8).abs() < 1e-12);
    }

    #[test]
    fn test_climbs_towards_target() {
        let mut b = blender(BlenderParams::default());
        let (cmd, _) = b.proc(&input([0.0, 0.0, 0.2], [0.0, 0.0, 0.6])).unwrap();
        assert!(cmd.throttle() > 1400);
    }

    #[test]
    fn test_avoidance_takes_over_horizontal() {
        let mut params = BlenderParams::default();
        params.obstacle_avoidance = true;
        let mut b = blender(params);
        let obstacle = b.avoidance_mut().add_obstacle();

        // Obstacle inside the safety radius, in front along +x
        obstacle.update(KinematicSample::hold(Vector3::new(0.2, 0.0, 1.0), 0.0));

        let (cmd, report) = b.proc(&input([0.0, 0.0, 1.0], [5.0, 0.0, 1.0])).unwrap();

        assert_eq!(report.blend_weight, 1.0);
        assert!(report.blended_acc_mss[0] < 0.0);
        assert_eq!(report.blended_acc_mss[2], report.ctrl_acc_mss[2]);

        // Pushed backwards: pitch above neutral
        assert!(cmd.pitch() > 1500);
    }

    #[test]
    fn test_reconfigure_swaps_law() {
        let mut b = blender(BlenderParams::default());

        let mut params = *b.params();
        params.controller_type = ControllerType::LoadTransport;
        params.controller_frequency_hz = 100.0;
        b.reconfigure(params);

        assert_eq!(
            b.law().map(|l| l.controller_type()),
            Some(ControllerType::LoadTransport)
        );
        assert_eq!(b.params().controller_frequency_hz, 30.0);
    }
}
