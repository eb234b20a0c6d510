//! # Straight line trajectory
//!
//! Point to point motion along a straight line, following the kinematic profile scaled onto the
//! unit direction from start to end.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use nalgebra::Vector3;

// Internal
use super::{
    geometry::unit_or_zero, profile::Profile, RunExit, StraightLineParams, Trajectory,
    TrajectoryError, TrajectoryIo,
};
use crate::sample::KinematicSample;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Frequency of the straight line loop
pub const STRAIGHT_LINE_FREQUENCY_HZ: f64 = 10.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StraightLine {
    start: Vector3<f64>,
    end: Vector3<f64>,
    a_max_mss: f64,
    yaw_deg: f64,
    done: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StraightLine {
    pub fn new(start: Vector3<f64>, end: Vector3<f64>, a_max_mss: f64, yaw_deg: f64) -> Self {
        Self {
            start,
            end,
            a_max_mss,
            yaw_deg,
            done: false,
        }
    }

    pub fn from_params(params: &StraightLineParams) -> Self {
        Self::new(
            Vector3::from(params.start_m),
            Vector3::from(params.end_m),
            params.a_max_mss,
            params.yaw_deg,
        )
    }

    /// Sample of the line at the given elapsed time.
    fn sample_at(&self, profile: &Profile, direction: &Vector3<f64>, t: f64) -> KinematicSample {
        KinematicSample {
            pos_m: self.start + direction * profile.s(t),
            vel_ms: direction * profile.s_dot(t),
            acc_mss: direction * profile.s_ddot(t),
            yaw_deg: self.yaw_deg,
        }
    }
}

impl Trajectory for StraightLine {
    fn name(&self) -> &'static str {
        "straight line"
    }

    fn frequency_hz(&self) -> f64 {
        STRAIGHT_LINE_FREQUENCY_HZ
    }

    fn begin(&mut self) {
        self.done = false;
    }

    fn run(
        &mut self,
        start_time_s: f64,
        io: &mut TrajectoryIo,
    ) -> Result<RunExit, TrajectoryError> {
        // Geometry and profile are fixed for the whole run
        let delta = self.end - self.start;
        let direction = unit_or_zero(&delta);
        let profile = Profile::new(delta.norm(), self.a_max_mss);
        let period_s = 1.0 / STRAIGHT_LINE_FREQUENCY_HZ;

        info!(
            "Straight line from {:?} to {:?}, duration {:.3} s",
            self.start.as_slice(),
            self.end.as_slice(),
            profile.duration_s()
        );

        let mut num_ticks: u64 = 0;

        loop {
            if io.shutdown.is_requested() {
                debug!("Straight line interrupted by shutdown");
                return Ok(RunExit::Shutdown);
            }

            // Elapsed time is derived from the tick count so it never drifts
            let elapsed_s = start_time_s + num_ticks as f64 * period_s;

            if num_ticks > 0 && elapsed_s >= profile.duration_s() {
                io.send(&KinematicSample::hold(self.end, self.yaw_deg))?;
                self.done = true;
                info!("Straight line complete, holding at {:?}", self.end.as_slice());
                return Ok(RunExit::Completed);
            }

            let sample = self.sample_at(&profile, &direction, elapsed_s);
            trace!("Straight line target: {:?}", sample.pos_m.as_slice());
            io.send(&sample)?;

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
    use crate::traj_gen::test_util::CountingTicker;
    use comms_if::{
        bus::Recorder,
        eqpt::{guard::Permission, mocap::QuadSample},
    };
    use util::shutdown::Shutdown;

    fn run_line(
        line: &mut StraightLine,
        shutdown: &Shutdown,
    ) -> (RunExit, Vec<QuadSample>, Vec<Permission>) {
        let mut ticker = CountingTicker::new(line.frequency_hz());
        let targets = Recorder::<QuadSample>::new();
        let handoffs = Recorder::<Permission>::new();
        let mut target_pub = targets.clone();
        let mut handoff_pub = handoffs.clone();

        let exit = {
            let mut io = TrajectoryIo {
                ticker: &mut ticker,
                shutdown,
                target: &mut target_pub,
                handoff: &mut handoff_pub,
            };
            line.run(0.0, &mut io).unwrap()
        };

        (exit, targets.msgs(), handoffs.msgs())
    }

    #[test]
    fn test_vertical_line() {
        let mut line = StraightLine::from_params(&StraightLineParams::default());
        let (exit, targets, handoffs) = run_line(&mut line, &Shutdown::new());

        assert_eq!(exit, RunExit::Completed);
        assert!(line.is_done());
        assert!(targets.len() > 2);
        assert_eq!(targets.len(), handoffs.len());
        assert!(handoffs.iter().all(|h| !h.permission));

        // First frame at the start, at rest
        assert!((targets[0].pos_m[2] - 0.2).abs() < 1e-12);
        assert_eq!(targets[0].vel_ms, [0.0; 3]);

        // Strictly climbing along z only until the final hold
        let moving = &targets[..targets.len() - 1];
        for pair in moving.windows(2) {
            assert!(pair[1].pos_m[2] > pair[0].pos_m[2]);
            assert_eq!(pair[1].pos_m[0], 0.0);
            assert_eq!(pair[1].pos_m[1], 0.0);
        }

        // Hold frame
        let hold = targets.last().unwrap();
        assert_eq!(hold.pos_m, [0.0, 0.0, 0.6]);
        assert_eq!(hold.vel_ms, [0.0; 3]);
        assert_eq!(hold.acc_mss, [0.0; 3]);
    }

    #[test]
    fn test_frame_count_follows_duration() {
        let params = StraightLineParams::default();
        let t_f = Profile::new(0.4, params.a_max_mss).duration_s();
        let mut line = StraightLine::from_params(&params);
        let (_, targets, _) = run_line(&mut line, &Shutdown::new());

        // One frame per tick while elapsed < t_f, plus the hold frame
        let expected = (t_f * STRAIGHT_LINE_FREQUENCY_HZ).ceil() as usize + 1;
        assert_eq!(targets.len(), expected);
    }

    #[test]
    fn test_zero_length_line() {
        let p = Vector3::new(1.0, 1.0, 1.0);
        let mut line = StraightLine::new(p, p, 1.0, 0.0);
        let (exit, targets, _) = run_line(&mut line, &Shutdown::new());

        assert_eq!(exit, RunExit::Completed);
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.pos_m == [1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_shutdown_and_restart() {
        let mut line = StraightLine::from_params(&StraightLineParams::default());
        let shutdown = Shutdown::new();
        shutdown.request();

        let (exit, targets, _) = run_line(&mut line, &shutdown);
        assert_eq!(exit, RunExit::Shutdown);
        assert!(targets.is_empty());
        assert!(!line.is_done());

        let (exit, _, _) = run_line(&mut line, &Shutdown::new());
        assert_eq!(exit, RunExit::Completed);
        line.begin();
        assert!(!line.is_done());
    }
}
