//! # Blender loop
//!
//! Fixed-rate loop driving the Blender. Samples are read from last-write-wins cells at the start
//! of each tick, and the permission gate is checked just before dispatch.
//!
//! Administrative requests (reload, gain updates, autotune) are queued on a [`BlenderHandle`]
//! and applied between two ticks. The handle also carries a snapshot of the law's gains, updated
//! after every tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::{bus::Publisher, eqpt::fc::RcOverride};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU16, Ordering},
    Arc, Mutex,
};

// Internal
use super::{actuation, Blender, BlenderError, BlenderParams, TickInput};
use crate::{
    ctrl::{autotune::AutotuneRequest, Axis, ControlGains, ControlLaw, LawInput},
    permission::{PermissionGate, PermissionState},
    sample::{KinematicSample, SampleCell, TargetSample},
};
use util::{module::State, shutdown::Shutdown, time::Ticker};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Administrative handle to a running Blender loop.
///
/// Clones control the same loop and may be used from any thread.
#[derive(Debug, Clone)]
pub struct BlenderHandle {
    pending_reload: Arc<Mutex<Option<BlenderParams>>>,
    pending_cmds: Arc<Mutex<Vec<AdminCommand>>>,
    snapshot: Arc<Mutex<Option<LawSnapshot>>>,
    aux: Arc<AtomicU16>,
    shutdown: Shutdown,
}

/// State of the control law as seen from outside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LawSnapshot {
    /// Gains of the X, Y and Z axes
    pub gains: [ControlGains; 3],

    pub identifying: bool,
}

/// Everything the Blender loop talks to.
pub struct BlenderIo<'a> {
    /// Measured state of the controlled body
    pub current: SampleCell<KinematicSample>,

    pub target: SampleCell<TargetSample>,

    /// Measured state of the payload, load transport only
    pub payload: SampleCell<KinematicSample>,

    pub gate: PermissionGate,

    pub rc: &'a mut dyn Publisher<RcOverride>,

    /// Vertical derivative branch output, published after each dispatch
    pub diagnostic: Option<&'a mut dyn Publisher<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Request applied to the PID law between two ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    /// Start an autotune session, or cancel the running one
    Autotune(AutotuneRequest),

    /// Update gains by name on every axis
    SetGains(Vec<(String, f64)>),
}

/// Why the Blender loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    PermissionRevoked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BlenderHandle {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            pending_reload: Arc::new(Mutex::new(None)),
            pending_cmds: Arc::new(Mutex::new(Vec::new())),
            snapshot: Arc::new(Mutex::new(None)),
            aux: Arc::new(AtomicU16::new(0)),
            shutdown,
        }
    }

    /// Ask the loop to apply new parameters at the start of its next tick.
    ///
    /// Only the latest request is kept if several arrive within one tick.
    pub fn request_reload(&self, params: BlenderParams) {
        *self
            .pending_reload
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(params);
    }

    /// Toggle autotuning at the start of the next tick.
    ///
    /// Starts a session for the requested axis while tracking, cancels the running session while
    /// identifying.
    pub fn request_autotune(&self, request: AutotuneRequest) {
        self.queue(AdminCommand::Autotune(request));
    }

    /// Update named gains at the start of the next tick. Unknown names are ignored with a
    /// warning when applied.
    pub fn set_gains(&self, updates: &[(&str, f64)]) {
        self.queue(AdminCommand::SetGains(
            updates.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        ));
    }

    /// Gains of an axis as of the last tick, `None` before the loop has started.
    pub fn gains(&self, axis: Axis) -> Option<ControlGains> {
        self.snapshot().map(|s| s.gains[axis.index()])
    }

    /// True while an autotune session was running at the last tick.
    pub fn is_identifying(&self) -> bool {
        self.snapshot().map(|s| s.identifying).unwrap_or(false)
    }

    pub fn snapshot(&self) -> Option<LawSnapshot> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the value echoed on the auxiliary channel.
    pub fn set_aux_channel(&self, value: u16) {
        self.aux.store(value, Ordering::Relaxed);
    }

    pub fn aux_channel(&self) -> u16 {
        self.aux.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn take_reload(&self) -> Option<BlenderParams> {
        self.pending_reload
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn queue(&self, cmd: AdminCommand) {
        self.pending_cmds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cmd);
    }

    fn take_commands(&self) -> Vec<AdminCommand> {
        std::mem::take(&mut *self.pending_cmds.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn publish_snapshot(&self, law: &ControlLaw) {
        let pid = law.pid();
        let snapshot = LawSnapshot {
            gains: [pid.gains(Axis::X), pid.gains(Axis::Y), pid.gains(Axis::Z)],
            identifying: pid.is_identifying(),
        };

        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }
}

impl Blender {
    /// Run the Blender loop until shutdown or permission revocation.
    ///
    /// Nothing is dispatched before the security guard has granted permission. While no target
    /// (or no measurement) has been received, the minimal throttle safe frame is dispatched.
    pub fn run(
        &mut self,
        io: &mut BlenderIo,
        ticker: &mut dyn Ticker,
        handle: &BlenderHandle,
    ) -> Result<LoopExit, BlenderError> {
        let shutdown = handle.shutdown();

        info!("Waiting for permission from the security guard");
        loop {
            match io.gate.state() {
                PermissionState::Running => break,
                PermissionState::Halted => return Ok(revoked()),
                PermissionState::NotStarted => {
                    if shutdown.is_requested() {
                        return Ok(LoopExit::Shutdown);
                    }
                    ticker.wait();
                }
            }
        }

        self.reset();
        self.publish_snapshot(handle);
        info!("Blender running");

        loop {
            if shutdown.is_requested() {
                info!("Blender stopped by shutdown");
                return Ok(LoopExit::Shutdown);
            }

            if let Some(params) = handle.take_reload() {
                self.reconfigure(params);
            }
            for cmd in handle.take_commands() {
                self.apply_command(cmd);
            }

            let (current, target) = match (io.current.latest(), io.target.latest()) {
                (Some(c), Some(t)) => (c, t),
                _ => {
                    match self.hold_until_first_samples(io, ticker, shutdown)? {
                        Some(exit) => return Ok(exit),
                        None => continue,
                    }
                }
            };

            let input = TickInput {
                law: LawInput {
                    current,
                    target,
                    payload: io.payload.latest(),
                },
                aux: handle.aux_channel(),
            };

            let (cmd, _report) = self.proc(&input)?;
            self.publish_snapshot(handle);

            match io.gate.state() {
                PermissionState::Running => {
                    io.rc.publish(&cmd)?;
                    self.publish_diagnostic(io);
                }
                PermissionState::Halted => return Ok(revoked()),
                // Not reachable once running, the gate never goes back
                PermissionState::NotStarted => (),
            }

            ticker.wait();
        }
    }

    /// Dispatch the safe frame every tick until both the target and the measurement have been
    /// received, then reset the law.
    ///
    /// Returns the loop exit if the loop must stop while holding.
    fn hold_until_first_samples(
        &mut self,
        io: &mut BlenderIo,
        ticker: &mut dyn Ticker,
        shutdown: &Shutdown,
    ) -> Result<Option<LoopExit>, BlenderError> {
        info!("Waiting for the first target and measurement, holding at minimum throttle");

        while !(io.current.has_first() && io.target.has_first()) {
            if shutdown.is_requested() {
                return Ok(Some(LoopExit::Shutdown));
            }

            match io.gate.state() {
                PermissionState::Halted => return Ok(Some(revoked())),
                _ => io.rc.publish(&actuation::safe_command(self.params()))?,
            }

            ticker.wait();
        }

        info!("First target received, tracking");
        self.reset();

        Ok(None)
    }

    /// Apply an administrative command to the PID law (the carrier PID for load transport).
    pub fn apply_command(&mut self, cmd: AdminCommand) {
        let pid = match self.law_mut() {
            Some(law) => law.pid_mut(),
            None => {
                warn!("No control law, ignoring {:?}", cmd);
                return;
            }
        };

        debug!("Applying {:?}", cmd);
        match cmd {
            AdminCommand::Autotune(request) => {
                pid.autotune(request);
            }
            AdminCommand::SetGains(updates) => {
                let updates: Vec<(&str, f64)> =
                    updates.iter().map(|(n, v)| (n.as_str(), *v)).collect();
                pid.set_gains(&updates);
            }
        }
    }

    fn publish_snapshot(&self, handle: &BlenderHandle) {
        if let Some(law) = self.law() {
            handle.publish_snapshot(law);
        }
    }

    fn publish_diagnostic(&self, io: &mut BlenderIo) {
        if let (Some(law), Some(diag)) = (self.law(), io.diagnostic.as_mut()) {
            if let Err(e) = diag.publish(&law.pid().derivative_diagnostic()) {
                warn!("Could not publish the derivative diagnostic: {}", e);
            }
        }
    }
}

fn revoked() -> LoopExit {
    error!("Permission revoked, stopping the Blender");
    LoopExit::PermissionRevoked
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::autotune::{IdentificationMethod, SynthesisMethod};
    use comms_if::bus::{BusError, Recorder};
    use nalgebra::Vector3;

    /// Ticker which calls back with the number of waits so far.
    struct ScriptedTicker<F: FnMut(usize)> {
        num_waits: usize,
        on_wait: F,
    }

    impl<F: FnMut(usize)> ScriptedTicker<F> {
        fn new(on_wait: F) -> Self {
            Self {
                num_waits: 0,
                on_wait,
            }
        }
    }

    impl<F: FnMut(usize)> Ticker for ScriptedTicker<F> {
        fn wait(&mut self) {
            self.num_waits += 1;
            (self.on_wait)(self.num_waits);
        }

        fn period_s(&self) -> f64 {
            1.0 / 30.0
        }
    }

    struct Rig {
        current: SampleCell<KinematicSample>,
        target: SampleCell<TargetSample>,
        gate: PermissionGate,
        shutdown: Shutdown,
        handle: BlenderHandle,
        frames: Recorder<RcOverride>,
    }

    impl Rig {
        fn new() -> Self {
            let shutdown = Shutdown::new();
            Self {
                current: SampleCell::new(),
                target: SampleCell::new(),
                gate: PermissionGate::new(),
                handle: BlenderHandle::new(shutdown.clone()),
                shutdown,
                frames: Recorder::new(),
            }
        }

        fn set_samples(&self, current: [f64; 3], target: [f64; 3]) {
            self.current
                .update(KinematicSample::hold(Vector3::from(current), 0.0));
            self.target
                .update(KinematicSample::hold(Vector3::from(target), 0.0).into());
        }

        fn run(
            &self,
            blender: &mut Blender,
            rc: &mut dyn Publisher<RcOverride>,
            ticker: &mut dyn Ticker,
        ) -> Result<LoopExit, BlenderError> {
            let mut io = BlenderIo {
                current: self.current.clone(),
                target: self.target.clone(),
                payload: SampleCell::new(),
                gate: self.gate.clone(),
                rc,
                diagnostic: None,
            };
            blender.run(&mut io, ticker, &self.handle)
        }
    }

    fn p_only_params() -> BlenderParams {
        let mut params = BlenderParams::default();
        params.ctrl.pid.ti = f64::INFINITY;
        params
    }

    fn blender(params: BlenderParams) -> Blender {
        let mut b = Blender::new();
        b.init(params).unwrap();
        b
    }

    fn input(current: [f64; 3], target: [f64; 3]) -> TickInput {
        TickInput {
            law: LawInput {
                current: KinematicSample::hold(Vector3::from(current), 0.0),
                target: KinematicSample::hold(Vector3::from(target), 0.0).into(),
                payload: None,
            },
            aux: 0,
        }
    }

    /// Ticker requesting shutdown on its `n`th wait
    fn stop_after(n: usize, shutdown: Shutdown) -> ScriptedTicker<impl FnMut(usize)> {
        ScriptedTicker::new(move |i| {
            if i == n {
                shutdown.request();
            }
        })
    }

    #[test]
    fn test_permission_sequence() {
        let rig = Rig::new();
        rig.set_samples([0.0, 0.0, 0.5], [0.0, 0.0, 0.5]);

        let signals = [false, false, true, false];
        let gate = rig.gate.clone();
        let shutdown = rig.shutdown.clone();
        let mut ticker = ScriptedTicker::new(move |n| {
            if let Some(&granted) = signals.get(n - 1) {
                gate.on_signal(granted);
            }
            if n > 20 {
                shutdown.request();
            }
        });

        let mut b = blender(BlenderParams::default());
        let mut rc = rig.frames.clone();
        let exit = rig.run(&mut b, &mut rc, &mut ticker).unwrap();

        assert_eq!(exit, LoopExit::PermissionRevoked);
        assert_eq!(rig.frames.len(), 1);
        assert_eq!(ticker.num_waits, 4);
    }

    #[test]
    fn test_shutdown_before_grant() {
        let rig = Rig::new();
        let shutdown = rig.shutdown.clone();
        let mut ticker = ScriptedTicker::new(move |n| {
            if n == 3 {
                shutdown.request()
            }
        });

        let mut b = blender(BlenderParams::default());
        let mut rc = rig.frames.clone();
        let exit = rig.run(&mut b, &mut rc, &mut ticker).unwrap();

        assert_eq!(exit, LoopExit::Shutdown);
        assert!(rig.frames.is_empty());
    }

    #[test]
    fn test_safe_frames_until_first_target() {
        let rig = Rig::new();
        rig.gate.on_signal(true);
        rig.current
            .update(KinematicSample::hold(Vector3::new(0.0, 0.0, 0.2), 0.0));

        let target = rig.target.clone();
        let shutdown = rig.shutdown.clone();
        let mut ticker = ScriptedTicker::new(move |n| {
            if n == 3 {
                target.update(KinematicSample::hold(Vector3::new(0.0, 0.0, 0.6), 0.0).into());
            }
            if n == 5 {
                shutdown.request();
            }
        });

        let mut b = blender(BlenderParams::default());
        let mut rc = rig.frames.clone();
        let exit = rig.run(&mut b, &mut rc, &mut ticker).unwrap();
        assert_eq!(exit, LoopExit::Shutdown);

        let frames = rig.frames.msgs();
        let safe = actuation::safe_command(&BlenderParams::default());
        assert_eq!(frames.len(), 5);
        assert!(frames[..3].iter().all(|f| *f == safe));

        // Tracking: climbing towards the target
        assert!(frames[3..].iter().all(|f| f.throttle() > 1400));
    }

    /// Publisher which requests a reload while the first frame is being dispatched
    struct ReloadingPublisher {
        inner: Recorder<RcOverride>,
        handle: BlenderHandle,
        reload: Option<BlenderParams>,
    }

    impl Publisher<RcOverride> for ReloadingPublisher {
        fn publish(&mut self, msg: &RcOverride) -> Result<(), BusError> {
            if let Some(params) = self.reload.take() {
                self.handle.request_reload(params);
            }
            self.inner.publish(msg)
        }
    }

    #[test]
    fn test_reload_applies_next_tick() {
        let rig = Rig::new();
        rig.gate.on_signal(true);
        rig.set_samples([0.0, 0.0, 0.5], [1.0, 0.0, 0.5]);

        let old = p_only_params();
        let mut new = old;
        new.ctrl.pid.k = 1.0;

        let shutdown = rig.shutdown.clone();
        let mut ticker = ScriptedTicker::new(move |n| {
            if n == 3 {
                shutdown.request();
            }
        });

        let mut rc = ReloadingPublisher {
            inner: rig.frames.clone(),
            handle: rig.handle.clone(),
            reload: Some(new),
        };
        let mut b = blender(old);
        rig.run(&mut b, &mut rc, &mut ticker).unwrap();

        // Reference frames computed by Blenders which never reload
        let input = input([0.0, 0.0, 0.5], [1.0, 0.0, 0.5]);
        let (old_frame, _) = blender(old).proc(&input).unwrap();
        let (new_frame, _) = blender(new).proc(&input).unwrap();
        assert_ne!(old_frame, new_frame);

        let frames = rig.frames.msgs();
        assert_eq!(frames, vec![old_frame, new_frame, new_frame]);
        assert_eq!(b.law().map(|l| l.pid().gains(Axis::X).k), Some(1.0));
    }

    #[test]
    fn test_autotune_through_handle() {
        let rig = Rig::new();
        rig.gate.on_signal(true);
        rig.set_samples([0.0, 0.0, 0.5], [0.0, 0.0, 1.0]);

        let request = AutotuneRequest {
            axis: Axis::Z,
            identification: IdentificationMethod::Relay,
            synthesis: SynthesisMethod::ZieglerNichols,
        };
        rig.handle.request_autotune(request);
        assert!(!rig.handle.is_identifying());

        let mut ticker = stop_after(2, rig.shutdown.clone());
        let mut b = blender(p_only_params());
        let mut rc = rig.frames.clone();
        rig.run(&mut b, &mut rc, &mut ticker).unwrap();

        assert!(rig.handle.is_identifying());
        assert_eq!(b.law().map(|l| l.pid().is_identifying()), Some(true));

        // The first dispatched frame already comes from the relay
        let input = input([0.0, 0.0, 0.5], [0.0, 0.0, 1.0]);
        let mut relay = blender(p_only_params());
        relay.apply_command(AdminCommand::Autotune(request));
        let (relay_frame, _) = relay.proc(&input).unwrap();
        let (tracking_frame, _) = blender(p_only_params()).proc(&input).unwrap();
        assert_ne!(relay_frame, tracking_frame);

        let frames = rig.frames.msgs();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], relay_frame);

        // A second request cancels the session
        rig.handle.request_autotune(request);
        let rig_shutdown = Shutdown::new();
        let handle = BlenderHandle {
            shutdown: rig_shutdown.clone(),
            ..rig.handle.clone()
        };
        let mut rc = rig.frames.clone();
        let mut io = BlenderIo {
            current: rig.current.clone(),
            target: rig.target.clone(),
            payload: SampleCell::new(),
            gate: rig.gate.clone(),
            rc: &mut rc,
            diagnostic: None,
        };
        b.run(&mut io, &mut stop_after(1, rig_shutdown), &handle)
            .unwrap();
        assert!(!rig.handle.is_identifying());
        assert_eq!(rig.frames.last(), Some(tracking_frame));
    }

    #[test]
    fn test_set_gains_through_handle() {
        let rig = Rig::new();
        rig.gate.on_signal(true);
        rig.set_samples([0.0, 0.0, 0.5], [1.0, 0.0, 0.5]);

        rig.handle.set_gains(&[("K", 1.0), ("Kq", 3.0)]);
        assert_eq!(rig.handle.gains(Axis::X), None);

        let mut ticker = stop_after(1, rig.shutdown.clone());
        let mut b = blender(p_only_params());
        let mut rc = rig.frames.clone();
        rig.run(&mut b, &mut rc, &mut ticker).unwrap();

        let mut expected = p_only_params();
        expected.ctrl.pid.k = 1.0;
        assert_eq!(rig.handle.gains(Axis::X), Some(expected.ctrl.pid));
        assert_eq!(rig.handle.gains(Axis::Z), Some(expected.ctrl.pid));

        let (frame, _) = blender(expected)
            .proc(&input([0.0, 0.0, 0.5], [1.0, 0.0, 0.5]))
            .unwrap();
        assert_eq!(rig.frames.msgs(), vec![frame]);
    }

    #[test]
    fn test_obstacle_changes_dispatch() {
        let mut params = p_only_params();
        params.obstacle_avoidance = true;
        params.ctrl.pid.k = 1.0;

        let dispatched = |obstacle: Option<[f64; 3]>| {
            let rig = Rig::new();
            rig.gate.on_signal(true);
            rig.set_samples([0.0, 0.0, 1.0], [1.0, 0.0, 1.0]);

            let mut b = blender(params);
            if let Some(pos_m) = obstacle {
                b.avoidance_mut()
                    .add_obstacle()
                    .update(KinematicSample::hold(Vector3::from(pos_m), 0.0));
            }

            let mut ticker = stop_after(1, rig.shutdown.clone());
            let mut rc = rig.frames.clone();
            rig.run(&mut b, &mut rc, &mut ticker).unwrap();
            rig.frames.last().unwrap()
        };

        // Target ahead along +x, obstacle inside the safety radius on the same side
        let clear = dispatched(None);
        let blocked = dispatched(Some([0.3, 0.0, 1.0]));

        assert!(clear.pitch() < 1500);
        assert!(blocked.pitch() > 1500);
    }

    #[test]
    fn test_aux_channel_echoed() {
        let rig = Rig::new();
        rig.gate.on_signal(true);
        rig.set_samples([0.0; 3], [0.0; 3]);
        rig.handle.set_aux_channel(1800);

        let shutdown = rig.shutdown.clone();
        let mut ticker = ScriptedTicker::new(move |_| shutdown.request());

        let mut b = blender(BlenderParams::default());
        let mut rc = rig.frames.clone();
        rig.run(&mut b, &mut rc, &mut ticker).unwrap();

        assert_eq!(rig.frames.last().map(|f| f.aux()), Some(1800));
    }

    #[test]
    fn test_publish_failure_is_error() {
        let rig = Rig::new();
        rig.gate.on_signal(true);
        rig.set_samples([0.0; 3], [0.0; 3]);

        let (mut tx, rx) = std::sync::mpsc::channel::<RcOverride>();
        drop(rx);

        let mut ticker = ScriptedTicker::new(|_| ());
        let mut b = blender(BlenderParams::default());
        assert!(matches!(
            rig.run(&mut b, &mut tx, &mut ticker),
            Err(BlenderError::PublishError(_))
        ));
    }
}
