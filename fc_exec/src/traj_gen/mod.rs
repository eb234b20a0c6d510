//! # Trajectory generation module
//!
//! Trajectory modes produce one target sample per tick until they complete, then publish a hold
//! sample. Each mode runs its own blocking fixed-rate loop, suspending only in the ticker, and
//! checks the shutdown flag every iteration.
//!
//! Alongside each target a hand-off signal is published, telling the security guard whether it
//! would be safe to give control to another source. The modes here always publish "not yet".

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod geometry;
mod leader;
mod params;
pub mod profile;
mod straight_line;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::{
    bus::{BusError, Publisher},
    eqpt::{
        guard::Permission,
        mocap::{QuadSample, QuadSampleExt},
    },
};
use log::info;
use util::{shutdown::Shutdown, time::Ticker};

// Internal
pub use leader::*;
pub use params::*;
pub use straight_line::*;

use crate::sample::{KinematicSample, SampleCell};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trajectory mode.
pub trait Trajectory {
    /// Name of the mode, used in logs.
    fn name(&self) -> &'static str;

    /// Nominal frequency of the mode's loop.
    fn frequency_hz(&self) -> f64;

    /// Clear the completion state so the trajectory can be run again.
    fn begin(&mut self);

    /// Run the trajectory to completion (or until shutdown is requested).
    ///
    /// `start_time_s` offsets the elapsed time the first tick is computed at, it is normally
    /// zero.
    fn run(&mut self, start_time_s: f64, io: &mut TrajectoryIo)
        -> Result<RunExit, TrajectoryError>;

    /// True once the trajectory has published its final sample.
    fn is_done(&self) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Publishes each target as an extended target with a fixed carrier offset.
struct ExtendedTarget<'a> {
    inner: &'a mut dyn Publisher<QuadSampleExt>,
    carrier_offset_m: [f64; 3],
}

/// Everything a trajectory loop talks to.
pub struct TrajectoryIo<'a> {
    /// Suspends the loop between ticks. Should run at the mode's `frequency_hz`.
    pub ticker: &'a mut dyn Ticker,

    pub shutdown: &'a Shutdown,

    /// Target samples for the control law
    pub target: &'a mut dyn Publisher<QuadSample>,

    /// Hand-off signal for the security guard
    pub handoff: &'a mut dyn Publisher<Permission>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Why a trajectory loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Completed,
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("Could not publish the trajectory: {0}")]
    PublishError(#[from] BusError),

    #[error("Invalid trajectory geometry: {0}")]
    DegenerateGeometry(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Publisher<QuadSample> for ExtendedTarget<'a> {
    fn publish(&mut self, msg: &QuadSample) -> Result<(), BusError> {
        self.inner.publish(&QuadSampleExt {
            payload: *msg,
            carrier_offset_m: self.carrier_offset_m,
        })
    }
}

impl<'a> TrajectoryIo<'a> {
    /// Publish a target along with the "not yet safe to hand off" signal.
    pub fn send(&mut self, sample: &KinematicSample) -> Result<(), TrajectoryError> {
        self.target.publish(&QuadSample::from(*sample))?;
        self.handoff.publish(&Permission::from(false))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the trajectory described by a spec.
///
/// Leader modes read their own measured position from `own`.
pub fn build(
    spec: &TrajectorySpec,
    own: &SampleCell<KinematicSample>,
) -> Result<Box<dyn Trajectory + Send>, TrajectoryError> {
    Ok(match spec {
        TrajectorySpec::StraightLine(p) => Box::new(StraightLine::from_params(p)),
        TrajectorySpec::LeaderFollower(p) => Box::new(LeaderFollower::new(p, own.clone())?),
    })
}

/// Run a sequence of trajectories one after the other.
///
/// Each trajectory gets its own ticker, built by `make_ticker` from the trajectory's frequency.
/// Targets are published with the carrier offset of the trajectory which produced them. The
/// sequence stops early if shutdown is requested.
pub fn run_sequence<T, F>(
    specs: &[TrajectorySpec],
    own: &SampleCell<KinematicSample>,
    mut make_ticker: F,
    shutdown: &Shutdown,
    target: &mut dyn Publisher<QuadSampleExt>,
    handoff: &mut dyn Publisher<Permission>,
) -> Result<RunExit, TrajectoryError>
where
    T: Ticker,
    F: FnMut(f64) -> T,
{
    for (i, spec) in specs.iter().enumerate() {
        let mut traj = build(spec, own)?;
        let mut ticker = make_ticker(traj.frequency_hz());

        info!(
            "Starting trajectory {}/{}: {}",
            i + 1,
            specs.len(),
            traj.name()
        );

        traj.begin();
        let mut ext_target = ExtendedTarget {
            inner: &mut *target,
            carrier_offset_m: spec.carrier_offset_m(),
        };
        let mut io = TrajectoryIo {
            ticker: &mut ticker,
            shutdown,
            target: &mut ext_target,
            handoff: &mut *handoff,
        };

        if traj.run(0.0, &mut io)? == RunExit::Shutdown {
            return Ok(RunExit::Shutdown);
        }
    }

    info!("Trajectory sequence complete");
    Ok(RunExit::Completed)
}

#[cfg(test)]
mod test {
    use super::test_util::CountingTicker;
    use super::*;
    use crate::sample::TargetSample;
    use comms_if::bus::{NullPublisher, Recorder};

    #[test]
    fn test_sequence_chains_modes() {
        let specs = vec![
            TrajectorySpec::StraightLine(StraightLineParams::default()),
            TrajectorySpec::StraightLine(StraightLineParams {
                start_m: [0.0, 0.0, 0.6],
                end_m: [0.5, 0.0, 0.6],
                ..Default::default()
            }),
        ];
        let targets = Recorder::<QuadSampleExt>::new();
        let mut frequencies = vec![];

        let exit = run_sequence(
            &specs,
            &SampleCell::new(),
            |f| {
                frequencies.push(f);
                CountingTicker::new(f)
            },
            &Shutdown::new(),
            &mut targets.clone(),
            &mut NullPublisher,
        )
        .unwrap();

        assert_eq!(exit, RunExit::Completed);
        assert_eq!(frequencies, vec![STRAIGHT_LINE_FREQUENCY_HZ; 2]);

        // Ends on the hold frame of the second line
        let last = targets.last().unwrap();
        assert_eq!(last.payload.pos_m, [0.5, 0.0, 0.6]);
        assert_eq!(last.payload.vel_ms, [0.0; 3]);
    }

    #[test]
    fn test_sequence_carries_offsets() {
        let specs = vec![
            TrajectorySpec::StraightLine(StraightLineParams::default()),
            TrajectorySpec::StraightLine(StraightLineParams {
                start_m: [0.0, 0.0, 0.6],
                end_m: [0.0, 0.0, 0.3],
                carrier_offset_m: [0.0, 0.0, 0.5],
                ..Default::default()
            }),
        ];
        let targets = Recorder::<QuadSampleExt>::new();

        run_sequence(
            &specs,
            &SampleCell::new(),
            CountingTicker::new,
            &Shutdown::new(),
            &mut targets.clone(),
            &mut NullPublisher,
        )
        .unwrap();

        let msgs = targets.msgs();
        let first_offset = msgs.iter().position(|m| m.carrier_offset_m[2] == 0.5).unwrap();
        assert!(first_offset > 0);
        assert!(msgs[..first_offset].iter().all(|m| m.carrier_offset_m == [0.0; 3]));
        assert!(msgs[first_offset..]
            .iter()
            .all(|m| m.carrier_offset_m == [0.0, 0.0, 0.5]));

        // The control law input keeps the offset
        let last = TargetSample::from(*msgs.last().unwrap());
        assert_eq!(last.carrier_offset_m, nalgebra::Vector3::new(0.0, 0.0, 0.5));
        assert_eq!(last.sample.pos_m[2], 0.3);
    }

    #[test]
    fn test_sequence_stops_on_shutdown() {
        let specs = vec![TrajectorySpec::StraightLine(StraightLineParams::default())];
        let shutdown = Shutdown::new();
        shutdown.request();
        let targets = Recorder::<QuadSampleExt>::new();

        let exit = run_sequence(
            &specs,
            &SampleCell::new(),
            CountingTicker::new,
            &shutdown,
            &mut targets.clone(),
            &mut NullPublisher,
        )
        .unwrap();

        assert_eq!(exit, RunExit::Shutdown);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_degenerate_leader_is_an_error() {
        let specs = vec![TrajectorySpec::LeaderFollower(LeaderParams {
            velocity_ms: [0.8, 0.0, 0.0],
            ..Default::default()
        })];

        let res = run_sequence(
            &specs,
            &SampleCell::new(),
            CountingTicker::new,
            &Shutdown::new(),
            &mut NullPublisher,
            &mut NullPublisher,
        );
        assert!(matches!(res, Err(TrajectoryError::DegenerateGeometry(_))));
    }
}
