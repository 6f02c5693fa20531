//! Connection supervisor — one worker thread per target.
//!
//! The supervisor owns the target's [`Transport`] and current [`Link`] on a
//! dedicated worker thread fed by a job queue. Callers never block on I/O:
//! they flip the shared [`Phase`] and enqueue work. The worker runs connect
//! sequences (bounded by [`ReconnectConfig`]), writes frames in queue order,
//! and turns send failures into a queued re-initialise.
//!
//! ```text
//!   Idle ──initialise──▶ Connecting ──connected──▶ Connected
//!    ▲                       │                         │
//!    └──── budget spent ─────┘                         │
//!    └──────────── send failure / disconnect ──────────┘
//! ```

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::reconnect::{NextAttempt, ReconnectConfig, ReconnectState};
use crate::target::TargetId;
use crate::transport::{Cancel, Link, Transport};


/// Connection phase of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    /// A connect sequence is queued or running. Doubles as the init-lock.
    Connecting,
    Connected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Connecting => write!(f, "connecting"),
            Phase::Connected => write!(f, "connected"),
        }
    }
}

/// Notifications for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEvent {
    /// The retry budget was spent without connecting.
    ConnectionLost(TargetId),
}

/// Frames the supervisor sends on its own after a connect sequence.
pub trait SessionHooks: Send {
    /// Power-on command, sent when a power-on was deferred until reconnection.
    fn power_on(&self) -> Vec<u8>;

    /// Frame that puts the hardware into the currently selected effect.
    fn effect_sync(&self) -> Option<Vec<u8>>;
}

/// Supervisor timing and recovery policy.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub reconnect: ReconnectConfig,
    pub connect_timeout: Duration,
    /// Pause after a deferred power-on before other frames go out.
    pub power_on_settle: Duration,
    /// Re-initialise automatically after a send failure.
    pub auto_recover: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            connect_timeout: Duration::from_secs(5),
            power_on_settle: Duration::from_secs(2),
            auto_recover: true,
        }
    }
}

enum Job {
    Connect,
    /// Close the stale link, wake the transport, then connect.
    Resume,
    Send(Vec<u8>),
    Disconnect,
    Shutdown,
}

struct State {
    phase: Phase,
    power_on_pending: bool,
    /// Raised by every initialise; the effect is re-applied once the sequence connects.
    effect_sync_pending: bool,
}

struct Shared {
    state: Mutex<State>,
    stopping: Cancel,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }

    /// Enter `Connecting` and queue a connect sequence.
    ///
    /// Returns `false` (no-op) if a sequence is already pending, unless `force`.
    fn begin_connect(&self, jobs: &Sender<Job>, target: TargetId, force: bool) -> bool {
        {
            let mut st = self.lock();
            if st.phase == Phase::Connecting && !force {
                log::debug!("{target}: initialise skipped, connect already in progress");
                return false;
            }
            st.phase = Phase::Connecting;
            st.effect_sync_pending = true;
        }
        if jobs.send(Job::Connect).is_err() {
            self.lock().phase = Phase::Idle;
            return false;
        }
        true
    }
}

/// Per-target connection supervisor.
pub struct Supervisor {
    target: TargetId,
    auto_recover: bool,
    shared: Arc<Shared>,
    jobs: Sender<Job>,
    worker: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Start the worker thread. The target stays `Idle` until [`initialise`](Self::initialise).
    pub fn spawn(
        target: TargetId,
        transport: Box<dyn Transport>,
        config: SupervisorConfig,
        hooks: Box<dyn SessionHooks>,
        events: Option<Sender<TargetEvent>>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                phase: Phase::Idle,
                power_on_pending: false,
                effect_sync_pending: false,
            }),
            stopping: Cancel::new(),
        });
        let (tx, rx) = mpsc::channel();
        let worker = Worker {
            target,
            transport,
            link: None,
            config,
            hooks,
            events,
            shared: shared.clone(),
            jobs: tx.clone(),
        };
        let handle = std::thread::Builder::new()
            .name(format!("{target}-supervisor"))
            .spawn(move || worker.run(rx))?;
        Ok(Supervisor {
            target,
            auto_recover: config.auto_recover,
            shared,
            jobs: tx,
            worker: Some(handle),
        })
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// `false` while a connect sequence is pending.
    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Connected
    }

    /// Queue a connect sequence. No-op while one is pending unless `force`.
    pub fn initialise(&self, force: bool) -> bool {
        self.shared.begin_connect(&self.jobs, self.target, force)
    }

    /// Like [`initialise`](Self::initialise), but only if auto-recovery is on or `force`.
    pub fn reinitialise(&self, force: bool) -> bool {
        if !(self.auto_recover || force) {
            log::debug!("{}: re-initialise skipped, auto-recovery disabled", self.target);
            return false;
        }
        self.initialise(force)
    }

    /// Queue a frame. Dropped (returns `false`) unless connected.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.jobs.send(Job::Send(frame)).is_ok()
    }

    /// Host resumed from standby: drop the stale link and reconnect.
    ///
    /// With `power_on`, the power-on frame goes out once the new link is up.
    pub fn resume(&self, power_on: bool) {
        {
            let mut st = self.shared.lock();
            st.power_on_pending |= power_on;
            st.effect_sync_pending = true;
            st.phase = Phase::Connecting;
        }
        if self.jobs.send(Job::Resume).is_err() {
            self.shared.lock().phase = Phase::Idle;
        }
    }

    /// Close the link. A pending connect sequence still runs.
    pub fn disconnect(&self) {
        let _ = self.jobs.send(Job::Disconnect);
    }

    /// Close the link, stop the worker and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.stopping.cancel();
        let _ = self.jobs.send(Job::Shutdown);
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            log::warn!("{}: supervisor worker panicked", self.target);
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Worker ──

struct Worker {
    target: TargetId,
    transport: Box<dyn Transport>,
    link: Option<Box<dyn Link>>,
    config: SupervisorConfig,
    hooks: Box<dyn SessionHooks>,
    events: Option<Sender<TargetEvent>>,
    shared: Arc<Shared>,
    /// For queueing its own re-initialise after a send failure.
    jobs: Sender<Job>,
}

impl Worker {
    fn run(mut self, rx: Receiver<Job>) {
        while let Ok(job) = rx.recv() {
            match job {
                Job::Connect => self.connect_sequence(),
                Job::Resume => {
                    self.close_link();
                    if let Err(e) = self.transport.wake(&self.shared.stopping) {
                        log::warn!("{}: wake failed: {e}", self.target);
                    }
                    self.connect_sequence();
                }
                Job::Send(frame) => self.write(&frame),
                Job::Disconnect => {
                    self.close_link();
                    let mut st = self.shared.lock();
                    if st.phase == Phase::Connected {
                        st.phase = Phase::Idle;
                    }
                }
                Job::Shutdown => break,
            }
        }
        self.close_link();
        self.shared.lock().phase = Phase::Idle;
    }

    fn link_alive(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.is_connected())
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
    }

    fn connect_sequence(&mut self) {
        self.shared.lock().phase = Phase::Connecting;
        if self.link_alive() {
            log::debug!("{}: already connected", self.target);
            self.finish_sequence();
            return;
        }
        if let Err(e) = self.transport.prepare(&self.shared.stopping) {
            log::error!("{}: {e}", self.target);
            let mut st = self.shared.lock();
            st.phase = Phase::Idle;
            st.effect_sync_pending = false;
            st.power_on_pending = false;
            return;
        }

        let endpoint = self.transport.endpoint();
        let mut retry = ReconnectState::new(self.config.reconnect);
        while !self.link_alive() && !self.shared.stopping() {
            self.close_link();
            match self.transport.connect(self.config.connect_timeout) {
                Ok(link) => {
                    retry.record_success();
                    log::info!("{}: connected to {endpoint}", self.target);
                    self.link = Some(link);
                }
                Err(e) => match retry.record_failure() {
                    NextAttempt::RetryAfter(delay) => {
                        log::warn!(
                            "{}: {e} (attempt {}/{}, retry in {:.1}s)",
                            self.target,
                            retry.consecutive_failures(),
                            retry.total_attempts(),
                            delay.as_secs_f64()
                        );
                        self.pause(delay);
                    }
                    NextAttempt::GiveUp => {
                        log::error!(
                            "{}: giving up on {endpoint} after {} attempts: {e}",
                            self.target,
                            retry.consecutive_failures()
                        );
                        if let Some(tx) = &self.events {
                            let _ = tx.send(TargetEvent::ConnectionLost(self.target));
                        }
                        break;
                    }
                },
            }
        }
        self.finish_sequence();
    }

    /// Release the init-lock, then run the deferred power-on and effect sync.
    fn finish_sequence(&mut self) {
        let connected = self.link_alive();
        let (power_on, effect_sync) = {
            let mut st = self.shared.lock();
            st.phase = if connected {
                Phase::Connected
            } else {
                Phase::Idle
            };
            (
                std::mem::take(&mut st.power_on_pending),
                std::mem::take(&mut st.effect_sync_pending),
            )
        };
        if !connected {
            return;
        }
        if power_on {
            log::info!("{}: powering on", self.target);
            let frame = self.hooks.power_on();
            self.write(&frame);
            self.pause(self.config.power_on_settle);
        }
        if effect_sync && let Some(frame) = self.hooks.effect_sync() {
            self.write(&frame);
        }
    }

    fn write(&mut self, frame: &[u8]) {
        let Some(link) = self.link.as_mut() else {
            log::debug!("{}: no link, dropping frame", self.target);
            return;
        };
        let res = if link.is_connected() {
            link.send(frame)
        } else {
            Err(crate::transport::TransportError::Closed)
        };
        if let Err(e) = res {
            log::warn!("{}: {e}", self.target);
            self.close_link();
            self.shared.lock().phase = Phase::Idle;
            if self.config.auto_recover {
                self.shared.begin_connect(&self.jobs, self.target, false);
            }
        }
    }

    /// Sleep for `total`, returning early if the supervisor is shutting down.
    fn pause(&self, total: Duration) {
        self.shared.stopping.pause(total);
    }
}
