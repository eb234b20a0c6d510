//! Main flight-control executable entry point.
//!
//! # Architecture
//!
//! The executable runs the flight-control core on the bench, closing the loop through the point
//! mass simulation instead of the motion capture and flight controller:
//!
//!     - Trajectory thread: runs the trajectory sequence from `traj_gen.toml`, publishing
//!       targets, then holds for `hold_s` and requests shutdown.
//!     - Simulation thread: integrates the last dispatched RC override at the frequency set in
//!       `bench.toml` and publishes the measured state.
//!     - Main thread: the Blender loop at `CONTROLLER_FREQUENCY`.
//!
//! The bench grants permission as soon as everything is started. Samples are exchanged through
//! last-write-wins cells, so no loop ever blocks on another. Static obstacles from `bench.toml`
//! are fed to the Blender's obstacle avoidance. Recorded streams keep the last `history_len`
//! samples.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use comms_if::{
    bus::{NullPublisher, Publisher, Recorder},
    eqpt::fc::RcOverride,
};
use log::{error, info, warn};
use nalgebra::Vector3;
use std::thread::{self, JoinHandle};

// Internal
use fc_lib::{
    blender::{Blender, BlenderHandle, BlenderIo, BlenderParams, LoopExit},
    permission::PermissionGate,
    sample::{KinematicSample, SampleCell, TargetSample},
    sim::{BenchParams, PointMassSim},
    traj_gen::{self, TrajGenParams},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    shutdown::Shutdown,
    time::{FixedRate, Ticker},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Frequency the end of run hold is polled at.
const HOLD_POLL_FREQUENCY_HZ: f64 = 10.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new("fc_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Quadrotor Flight Control Executable\n");
    info!("Running on: {}", host::get_host_description());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let blender_params: BlenderParams = util::params::load_or_default("blender.toml");
    let traj_params: TrajGenParams = util::params::load_or_default("traj_gen.toml");
    let bench_params: BenchParams = util::params::load_or_default("bench.toml");

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut blender = Blender::new();
    blender
        .init(blender_params)
        .wrap_err("Failed to initialise the Blender")?;

    let num_obstacles = bench_params.place_obstacles(blender.avoidance_mut());
    if num_obstacles > 0 && !blender_params.obstacle_avoidance {
        warn!(
            "{} static obstacle(s) placed but obstacle avoidance is disabled",
            num_obstacles
        );
    }

    let shutdown = Shutdown::new();
    let handle = BlenderHandle::new(shutdown.clone());
    let gate = PermissionGate::new();

    let current = SampleCell::<KinematicSample>::new();
    let target = SampleCell::<TargetSample>::new();
    let rc = SampleCell::<RcOverride>::new();
    let diagnostic = Recorder::<f64>::bounded(bench_params.history_len);
    let states = Recorder::<KinematicSample>::bounded(bench_params.history_len);

    info!("Module initialisation complete\n");

    // ---- START THREADS ----

    let sim_thread = spawn_sim(
        blender_params,
        bench_params.sim_frequency_hz,
        Vector3::from(traj_params.take_off_point()),
        rc.clone(),
        current.clone(),
        states.clone(),
        shutdown.clone(),
    );
    let traj_thread = spawn_traj(traj_params, current.clone(), target.clone(), shutdown.clone());

    info!("Bench run, granting permission");
    gate.on_signal(true);

    // ---- MAIN LOOP ----

    let mut rc_topic = rc.clone();
    let mut diag_topic = diagnostic.clone();
    let mut io = BlenderIo {
        current,
        target,
        payload: SampleCell::new(),
        gate,
        rc: &mut rc_topic,
        diagnostic: Some(&mut diag_topic),
    };

    let result = blender.run(
        &mut io,
        &mut FixedRate::new(blender_params.controller_frequency_hz),
        &handle,
    );

    match result {
        Ok(LoopExit::Shutdown) => info!("Blender loop complete"),
        Ok(LoopExit::PermissionRevoked) => warn!("Blender loop ended by permission revocation"),
        Err(ref e) => error!("Blender loop failed: {}", e),
    }

    // ---- SHUTDOWN ----

    shutdown.request();

    match traj_thread.join() {
        Ok(Ok(())) => (),
        Ok(Err(e)) => error!("Trajectory thread failed: {}", e),
        Err(_) => error!("Trajectory thread panicked"),
    }
    if sim_thread.join().is_err() {
        error!("Simulation thread panicked");
    }

    session.save("sim/states.json", states.msgs());

    session.save("blender/derivative_z.json", diagnostic.msgs());

    info!("End of execution");
    session.exit();

    result.map(|_| ()).wrap_err("Blender loop error")
}

/// Start the simulation thread.
///
/// Every state produced is also published on `states`.
fn spawn_sim(
    params: BlenderParams,
    frequency_hz: f64,
    start_m: Vector3<f64>,
    rc: SampleCell<RcOverride>,
    current: SampleCell<KinematicSample>,
    mut states: Recorder<KinematicSample>,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut sim = PointMassSim::new(params, start_m, 0.0);
        let mut ticker = FixedRate::new(frequency_hz);
        let mut num_steps = 0usize;

        current.update(*sim.state());

        while !shutdown.is_requested() {
            ticker.wait();

            // Motors idle until the first frame
            if let Some(cmd) = rc.latest() {
                let state = sim.step(&cmd, ticker.period_s());
                current.update(state);
                states.publish(&state).ok();
                num_steps += 1;
            }
        }

        info!("Simulation stopped after {} steps", num_steps);
    })
}

/// Start the trajectory thread.
fn spawn_traj(
    params: TrajGenParams,
    current: SampleCell<KinematicSample>,
    target: SampleCell<TargetSample>,
    shutdown: Shutdown,
) -> JoinHandle<Result<(), traj_gen::TrajectoryError>> {
    thread::spawn(move || {
        let mut target_topic = target;

        let exit = traj_gen::run_sequence(
            &params.trajectories,
            &current,
            FixedRate::new,
            &shutdown,
            &mut target_topic,
            &mut NullPublisher,
        );

        // Hold on the last target before ending the run
        if let Ok(traj_gen::RunExit::Completed) = exit {
            info!("Holding for {} s", params.hold_s);

            let mut ticker = FixedRate::new(HOLD_POLL_FREQUENCY_HZ);
            let num_ticks = (params.hold_s * HOLD_POLL_FREQUENCY_HZ).ceil() as usize;
            for _ in 0..num_ticks {
                if shutdown.is_requested() {
                    break;
                }
                ticker.wait();
            }
        }

        shutdown.request();
        exit.map(|_| ())
    })
}
