//! Helper-process transport — a link served by a local helper executable.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{Cancel, Link, Result, Transport, TransportError};
use crate::process::ProcessHost;

/// Executable name used when no helper path is configured.
pub const DEFAULT_HELPER_EXE: &str = "AtmoHue.exe";

/// How the helper executable is located and launched.
#[derive(Debug, Clone)]
pub struct HelperLaunch {
    /// Full path to the helper executable.
    pub path: PathBuf,
    /// Launch the helper if it is not running.
    pub auto_start: bool,
    /// The helper runs on another machine; never launch it locally.
    pub remote: bool,
    /// Wait after launching before the first connect attempt.
    pub settle: Duration,
}

impl HelperLaunch {
    /// Process name to look for in the process table.
    pub fn process_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_HELPER_EXE.to_string())
    }
}

/// Wraps a transport whose peer is a helper process that may need launching.
pub struct HelperTransport {
    inner: Box<dyn Transport>,
    host: Arc<dyn ProcessHost>,
    launch: HelperLaunch,
}

impl HelperTransport {
    pub fn new(inner: Box<dyn Transport>, host: Arc<dyn ProcessHost>, launch: HelperLaunch) -> Self {
        HelperTransport {
            inner,
            host,
            launch,
        }
    }
}

impl Transport for HelperTransport {
    fn endpoint(&self) -> String {
        self.inner.endpoint()
    }

    fn connect(&mut self, timeout: Duration) -> Result<Box<dyn Link>> {
        self.inner.connect(timeout)
    }

    fn prepare(&mut self, cancel: &Cancel) -> Result<()> {
        if self.launch.remote {
            return self.inner.prepare(cancel);
        }
        let name = self.launch.process_name();
        if !self.host.is_process_running(&name) {
            if !self.launch.auto_start {
                return Err(TransportError::Setup(format!(
                    "{name} is not running and auto-start is disabled"
                )));
            }
            log::info!("starting {}", self.launch.path.display());
            self.host
                .start_process(&self.launch.path, &[], false)
                .map_err(|e| TransportError::Setup(format!("{name}: {e}")))?;
            cancel.pause(self.launch.settle);
        }
        self.inner.prepare(cancel)
    }

    fn wake(&mut self, cancel: &Cancel) -> Result<()> {
        self.inner.wake(cancel)
    }
}
