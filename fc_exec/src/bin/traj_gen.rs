//! # Trajectory generator
//!
//! Runs the trajectory sequence on its own, at the real rate of each mode, and saves every
//! target it produced into the session. Leader modes have no measured position here, so they
//! follow their own integrated position.
//!
//! Usage: `traj_gen [PARAM_FILE]`, where the parameter file is relative to the `params`
//! directory and defaults to `traj_gen.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use comms_if::{
    bus::Recorder,
    eqpt::{guard::Permission, mocap::QuadSampleExt},
};
use log::info;
use std::env;

use fc_lib::{
    sample::SampleCell,
    traj_gen::{self, RunExit, TrajGenParams},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    shutdown::Shutdown,
    time::FixedRate,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let session = Session::new("traj_gen", "sessions").wrap_err("Failed to create the session")?;
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    let args: Vec<String> = env::args().collect();
    let param_file = match args.len() {
        1 => "traj_gen.toml",
        2 => &args[1],
        n => return Err(eyre!("Expected at most one argument, found {}", n - 1)),
    };

    let params: TrajGenParams = util::params::load_or_default(param_file);
    info!(
        "Loaded {} trajectories from \"{}\"",
        params.trajectories.len(),
        param_file
    );

    let targets = Recorder::<QuadSampleExt>::new();
    let handoffs = Recorder::<Permission>::new();

    let exit = traj_gen::run_sequence(
        &params.trajectories,
        &SampleCell::new(),
        FixedRate::new,
        &Shutdown::new(),
        &mut targets.clone(),
        &mut handoffs.clone(),
    )
    .wrap_err("Trajectory generation failed")?;

    if exit == RunExit::Completed {
        info!("Generated {} targets", targets.len());
    }

    session.save("traj_gen/targets.json", targets.msgs());
    session.save("traj_gen/handoff.json", handoffs.msgs());
    session.exit();

    Ok(())
}
