//! # Leader follower trajectory
//!
//! A virtual leader travels at constant speed around a circle. The target is not the leader
//! itself: it is pulled towards the leader by an attractive potential field and integrated
//! forward, so the quadrotor follows the leader smoothly from wherever it actually is.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector3;

// Internal
use super::{
    geometry::{distance, CircleFrame},
    LeaderParams, RunExit, Trajectory, TrajectoryError, TrajectoryIo,
};
use crate::{
    potential::{self, unit_or_zero, PotentialField},
    sample::{KinematicSample, SampleCell},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Frequency of the leader loop
pub const LEADER_FREQUENCY_HZ: f64 = 20.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct LeaderFollower {
    mid: Vector3<f64>,
    start: Vector3<f64>,
    frame: CircleFrame,
    radius_m: f64,

    /// Requested speed, before clamping
    requested_speed_ms: f64,

    /// Speed of the leader, clamped in `begin`
    speed_ms: f64,

    /// Angle to travel
    angle_rad: f64,

    a_max_mss: f64,
    field: PotentialField,
    yaw_deg: f64,

    /// Measured state of the quadrotor following the leader
    own: SampleCell<KinematicSample>,

    done: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LeaderFollower {
    /// Build the trajectory from its parameters.
    ///
    /// Fails if the start point is the circle centre or if the initial velocity has no component
    /// tangential to the circle.
    pub fn new(
        params: &LeaderParams,
        own: SampleCell<KinematicSample>,
    ) -> Result<Self, TrajectoryError> {
        let mid = Vector3::from(params.mid_m);
        let start = Vector3::from(params.start_m);
        let velocity = Vector3::from(params.velocity_ms);

        let radius_m = distance(&mid, &start);
        let frame = CircleFrame::new(&(start - mid), &velocity).ok_or(
            TrajectoryError::DegenerateGeometry(
                "the start must differ from the midpoint and the velocity must be tangential",
            ),
        )?;

        let mut leader = Self {
            mid,
            start,
            frame,
            radius_m,
            requested_speed_ms: velocity.norm(),
            speed_ms: velocity.norm(),
            angle_rad: params.angle_rad,
            a_max_mss: params.a_max_mss,
            field: PotentialField::attractive(params.field_gain, params.field_max_acc_mss),
            yaw_deg: params.yaw_deg,
            own,
            done: false,
        };
        leader.begin();

        Ok(leader)
    }

    /// Largest speed around the circle which respects the acceleration bound.
    pub fn max_speed_ms(&self) -> f64 {
        (self.radius_m * self.a_max_mss).sqrt()
    }

    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }

    /// Angular rate of the leader around the circle.
    ///
    /// Units: radians/second
    pub fn angular_rate_rads(&self) -> f64 {
        self.speed_ms / self.radius_m
    }

    /// Position of the leader after travelling `angle_rad` around the circle.
    pub fn leader_position(&self, angle_rad: f64) -> Vector3<f64> {
        self.frame.point(&self.mid, self.radius_m, angle_rad)
    }

    pub fn frame(&self) -> &CircleFrame {
        &self.frame
    }
}

impl Trajectory for LeaderFollower {
    fn name(&self) -> &'static str {
        "leader follower"
    }

    fn frequency_hz(&self) -> f64 {
        LEADER_FREQUENCY_HZ
    }

    fn begin(&mut self) {
        let v_max = self.max_speed_ms();
        self.speed_ms = if self.requested_speed_ms > v_max {
            warn!(
                "Leader speed {:.3} m/s exceeds the {:.3} m/s allowed by the acceleration bound, \
                clamping",
                self.requested_speed_ms, v_max
            );
            v_max
        } else {
            self.requested_speed_ms
        };
        self.done = false;
    }

    fn run(
        &mut self,
        start_time_s: f64,
        io: &mut TrajectoryIo,
    ) -> Result<RunExit, TrajectoryError> {
        let period_s = 1.0 / LEADER_FREQUENCY_HZ;
        let rate = self.angular_rate_rads();

        info!(
            "Leader follower around {:?}, radius {:.3} m, {:.3} rad at {:.3} m/s",
            self.mid.as_slice(),
            self.radius_m,
            self.angle_rad,
            self.speed_ms
        );

        // Integrated target, starting on the circle and moving with the leader
        let mut pos = self.start;
        let mut vel = self.frame.e_t * self.speed_ms;

        let mut num_ticks: u64 = 0;

        loop {
            if io.shutdown.is_requested() {
                debug!("Leader follower interrupted by shutdown");
                return Ok(RunExit::Shutdown);
            }

            let progress_rad = rate * (start_time_s + num_ticks as f64 * period_s);
            let last = progress_rad >= self.angle_rad;
            let leader = self.leader_position(progress_rad.min(self.angle_rad));

            // Without a measurement yet the target follows its own integration
            let own_pos = self.own.latest().map(|s| s.pos_m).unwrap_or(pos);

            let separation = leader - own_pos;
            let acc = self
                .field
                .acceleration(separation.norm(), &unit_or_zero(&separation));
            vel = potential::velocity(&vel, &acc, period_s);
            pos = potential::position(&pos, &vel, period_s);

            trace!("Leader at {:?}, target at {:?}", leader.as_slice(), pos.as_slice());

            io.send(&KinematicSample {
                pos_m: pos,
                vel_ms: vel,
                acc_mss: acc,
                yaw_deg: self.yaw_deg,
            })?;

            if last {
                self.done = true;
                info!("Leader follower complete after {:.3} rad", self.angle_rad);
                return Ok(RunExit::Completed);
            }

            io.ticker.wait();
            num_ticks += 1;
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_gen::{test_util::CountingTicker, LEADER_A_MAX_MSS};
    use comms_if::{
        bus::Recorder,
        eqpt::{guard::Permission, mocap::QuadSample},
    };
    use std::f64::consts::PI;
    use util::shutdown::Shutdown;

    fn params(angle_rad: f64, speed_ms: f64) -> LeaderParams {
        LeaderParams {
            mid_m: [0.0, 0.0, 0.6],
            start_m: [0.8, 0.0, 0.6],
            velocity_ms: [0.0, speed_ms, 0.0],
            angle_rad,
            ..Default::default()
        }
    }

    #[test]
    fn test_speed_clamped() {
        let leader = LeaderFollower::new(&params(PI, 5.0), SampleCell::new()).unwrap();
        let v_max = (0.8 * LEADER_A_MAX_MSS).sqrt();
        assert!((leader.speed_ms() - v_max).abs() < 1e-12);
        assert!((leader.angular_rate_rads() - v_max / 0.8).abs() < 1e-12);

        let leader = LeaderFollower::new(&params(PI, 0.1), SampleCell::new()).unwrap();
        assert_eq!(leader.speed_ms(), 0.1);
    }

    #[test]
    fn test_degenerate_geometry() {
        let mut p = params(PI, 0.5);
        p.start_m = p.mid_m;
        assert!(LeaderFollower::new(&p, SampleCell::new()).is_err());

        let mut p = params(PI, 0.5);
        p.velocity_ms = [1.0, 0.0, 0.0];
        assert!(LeaderFollower::new(&p, SampleCell::new()).is_err());
    }

    #[test]
    fn test_terminates_at_angle() {
        let angle = PI / 2.0;
        let own = SampleCell::new();
        let mut leader = LeaderFollower::new(&params(angle, 0.5), own.clone()).unwrap();

        // Quad measured sitting on the start point
        own.update(KinematicSample::hold(Vector3::new(0.8, 0.0, 0.6), 0.0));

        let mut ticker = CountingTicker::new(LEADER_FREQUENCY_HZ);
        let targets = Recorder::<QuadSample>::new();
        let mut target_pub = targets.clone();
        let mut handoff_pub = Recorder::<Permission>::new();
        let shutdown = Shutdown::new();

        let exit = leader
            .run(
                0.0,
                &mut TrajectoryIo {
                    ticker: &mut ticker,
                    shutdown: &shutdown,
                    target: &mut target_pub,
                    handoff: &mut handoff_pub,
                },
            )
            .unwrap();

        assert_eq!(exit, RunExit::Completed);
        assert!(leader.is_done());

        // One frame per tick until the angle is reached, the final one included
        let step = leader.angular_rate_rads() / LEADER_FREQUENCY_HZ;
        let expected = (angle / step).ceil() as usize + 1;
        assert_eq!(targets.len(), expected);
        assert_eq!(ticker.num_waits, expected - 1);
        assert_eq!(handoff_pub.len(), expected);

        // Targets stay in the plane of the circle
        assert!(targets.msgs().iter().all(|t| (t.pos_m[2] - 0.6).abs() < 1e-9));
    }

    #[test]
    fn test_pulled_towards_leader() {
        let own = SampleCell::new();
        let mut leader = LeaderFollower::new(&params(PI, 0.5), own.clone()).unwrap();

        // Quad lagging at the centre, the first target is pulled outwards towards the start
        own.update(KinematicSample::hold(Vector3::new(0.0, 0.0, 0.6), 0.0));

        let mut ticker = CountingTicker::new(LEADER_FREQUENCY_HZ);
        let targets = Recorder::<QuadSample>::new();
        let mut target_pub = targets.clone();
        let mut handoff_pub = Recorder::<Permission>::new();
        let shutdown = Shutdown::new();
        leader
            .run(
                0.0,
                &mut TrajectoryIo {
                    ticker: &mut ticker,
                    shutdown: &shutdown,
                    target: &mut target_pub,
                    handoff: &mut handoff_pub,
                },
            )
            .unwrap();

        let first = targets.msgs()[0];
        assert!(first.acc_mss[0] > 0.0);
        assert_eq!(first.acc_mss[2], 0.0);
    }
}
