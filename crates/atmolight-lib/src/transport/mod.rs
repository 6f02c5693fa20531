//! Transports — point-to-point channels to lighting hardware.
//!
//! A [`Transport`] knows how to reach one target and produces an owned
//! [`Link`] per successful connect. Links are never reused across reconnects:
//! the supervisor drops the stale one and asks the transport for a fresh link.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

mod helper;
mod serial;
mod tcp;

pub use helper::{HelperLaunch, HelperTransport};
pub use serial::{PortWake, SerialTransport};
pub use tcp::TcpTransport;

// ── Error type ──

/// Transport errors.
///
/// String payloads follow **"context: details"** where *context* names the
/// endpoint (e.g. `"127.0.0.1:20123"`, `"COM3"`).
#[derive(Debug)]
pub enum TransportError {
    /// Could not establish a link.
    ConnectFailed(String),
    /// Writing to an established link failed.
    SendFailed(String),
    /// The link was closed or dropped by the peer.
    Closed,
    /// The endpoint cannot be prepared (helper missing, launch disabled).
    /// Not retried.
    Setup(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed(e) => write!(f, "Connect failed: {e}"),
            TransportError::SendFailed(e) => write!(f, "Send failed: {e}"),
            TransportError::Closed => write!(f, "Link closed"),
            TransportError::Setup(e) => write!(f, "Setup failed: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

pub type Result<T> = std::result::Result<T, TransportError>;

// ── Cancellation ──

/// Sleep granularity for [`Cancel::pause`].
const PAUSE_SLICE: Duration = Duration::from_millis(20);

/// Shutdown signal shared by a supervisor and the pauses its transport takes.
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `total` in short slices.
    ///
    /// Returns `false` if cancelled before the full delay elapsed.
    pub fn pause(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(PAUSE_SLICE));
        }
    }
}

// ── Traits ──

/// An established connection to a target.
pub trait Link: Send {
    /// Write one command frame.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Whether the link is still usable.
    fn is_connected(&self) -> bool;

    /// Close the link. Idempotent.
    fn close(&mut self);
}

/// Factory for links to one target.
pub trait Transport: Send {
    /// Human-readable endpoint, used in log messages.
    fn endpoint(&self) -> String;

    /// Open a fresh link, giving up after `timeout`.
    fn connect(&mut self, timeout: Duration) -> Result<Box<dyn Link>>;

    /// One-time preparation before a connect sequence (e.g. launching a helper).
    ///
    /// A [`TransportError::Setup`] aborts the sequence without retries.
    /// Settle delays go through `cancel` so shutdown can cut them short.
    fn prepare(&mut self, _cancel: &Cancel) -> Result<()> {
        Ok(())
    }

    /// Recovery step after the host resumes from standby.
    fn wake(&mut self, _cancel: &Cancel) -> Result<()> {
        Ok(())
    }
}

// ── Mock transport for testing ──

/// Scriptable in-memory transport for unit and integration tests.
///
/// The transport is moved into a supervisor worker thread, so all state
/// lives behind an `Arc<Mutex<_>>` shared with a [`MockHandle`](mock::MockHandle).
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard};
    use std::time::Instant;

    /// Shared mock state. Counters record calls; `fail_*` fields inject errors.
    #[derive(Debug, Default)]
    pub struct MockState {
        pub connects: usize,
        pub prepares: usize,
        pub wakes: usize,
        pub closes: usize,
        /// Every frame written to any link, in order.
        pub sent: Vec<Vec<u8>>,
        /// If true, every connect fails.
        pub always_fail: bool,
        /// Number of upcoming connects that fail.
        pub fail_connects: usize,
        /// Number of upcoming sends that fail.
        pub fail_sends: usize,
        /// If set, `prepare` fails with `Setup(msg)`.
        pub prepare_error: Option<String>,
        /// Bumped by `drop_links`; links from an older generation are dead.
        generation: u64,
    }

    /// Test-side view of a [`MockTransport`].
    #[derive(Clone, Default)]
    pub struct MockHandle {
        state: Arc<Mutex<MockState>>,
    }

    impl MockHandle {
        pub fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn connects(&self) -> usize {
            self.state().connects
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.state().sent.clone()
        }

        /// Sent frames decoded as ASCII.
        pub fn sent_strings(&self) -> Vec<String> {
            self.state()
                .sent
                .iter()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .collect()
        }

        pub fn clear_sent(&self) {
            self.state().sent.clear();
        }

        pub fn set_always_fail(&self, fail: bool) {
            self.state().always_fail = fail;
        }

        pub fn fail_next_connects(&self, n: usize) {
            self.state().fail_connects = n;
        }

        pub fn fail_next_sends(&self, n: usize) {
            self.state().fail_sends = n;
        }

        pub fn set_prepare_error(&self, msg: Option<&str>) {
            self.state().prepare_error = msg.map(String::from);
        }

        /// Simulate the peer dropping every open link.
        pub fn drop_links(&self) {
            self.state().generation += 1;
        }

        /// Poll until `pred` holds or `timeout` elapses.
        pub fn wait_until(&self, timeout: Duration, pred: impl Fn(&MockState) -> bool) -> bool {
            let deadline = Instant::now() + timeout;
            loop {
                if pred(&*self.state()) {
                    return true;
                }
                if Instant::now() >= deadline {
                    return false;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    pub struct MockTransport {
        handle: MockHandle,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            MockTransport {
                handle: MockHandle::default(),
            }
        }

        pub fn handle(&self) -> MockHandle {
            self.handle.clone()
        }
    }

    impl Transport for MockTransport {
        fn endpoint(&self) -> String {
            "mock://target".into()
        }

        fn connect(&mut self, _timeout: Duration) -> Result<Box<dyn Link>> {
            let mut st = self.handle.state();
            st.connects += 1;
            if st.always_fail {
                return Err(TransportError::ConnectFailed("mock: refused".into()));
            }
            if st.fail_connects > 0 {
                st.fail_connects -= 1;
                return Err(TransportError::ConnectFailed("mock: refused".into()));
            }
            Ok(Box::new(MockLink {
                handle: self.handle.clone(),
                generation: st.generation,
                open: true,
            }))
        }

        fn prepare(&mut self, _cancel: &Cancel) -> Result<()> {
            let mut st = self.handle.state();
            st.prepares += 1;
            match &st.prepare_error {
                Some(msg) => Err(TransportError::Setup(msg.clone())),
                None => Ok(()),
            }
        }

        fn wake(&mut self, _cancel: &Cancel) -> Result<()> {
            self.handle.state().wakes += 1;
            Ok(())
        }
    }

    pub struct MockLink {
        handle: MockHandle,
        generation: u64,
        open: bool,
    }

    impl Link for MockLink {
        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            if !self.is_connected() {
                return Err(TransportError::Closed);
            }
            let mut st = self.handle.state();
            if st.fail_sends > 0 {
                st.fail_sends -= 1;
                return Err(TransportError::SendFailed("mock: broken pipe".into()));
            }
            st.sent.push(bytes.to_vec());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.open && self.handle.state().generation == self.generation
        }

        fn close(&mut self) {
            if self.open {
                self.open = false;
                self.handle.state().closes += 1;
            }
        }
    }
}
