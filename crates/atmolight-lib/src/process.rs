//! Process/OS layer — helper process checks and launches, USB port toggling.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use sysinfo::{ProcessesToUpdate, System};

/// Process layer errors.
#[derive(Debug)]
pub enum ProcessError {
    /// The executable does not exist.
    NotFound(PathBuf),
    /// The process could not be started.
    SpawnFailed(String),
    /// The process did not exit within the allowed time and was killed.
    Timeout(String),
    /// The process exited unsuccessfully.
    Failed(String),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::NotFound(p) => write!(f, "Executable not found: {}", p.display()),
            ProcessError::SpawnFailed(e) => write!(f, "Failed to start process: {e}"),
            ProcessError::Timeout(e) => write!(f, "Process timed out: {e}"),
            ProcessError::Failed(e) => write!(f, "Process failed: {e}"),
        }
    }
}

impl std::error::Error for ProcessError {}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Maximum time to wait for a process started with `wait_for_exit`.
pub const WAIT_FOR_EXIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval when waiting for a process to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Operations the target handlers need from the host OS.
pub trait ProcessHost: Send + Sync {
    /// Whether a process with this executable name is running (case-insensitive).
    fn is_process_running(&self, name: &str) -> bool;

    /// Start `path` with `args`, optionally waiting (bounded) for it to exit.
    fn start_process(&self, path: &Path, args: &[&str], wait_for_exit: bool) -> Result<()>;

    /// Detach the USB device behind a COM port.
    fn disable_device_by_port(&self, port: &str) -> Result<()>;

    /// Re-attach the USB device behind a COM port.
    fn enable_device_by_port(&self, port: &str) -> Result<()>;
}

/// Whether the host OS is 64-bit, including 32-bit builds running under WOW64.
pub fn is_64bit_os() -> bool {
    cfg!(target_pointer_width = "64") || std::env::var_os("PROCESSOR_ARCHITEW6432").is_some()
}

/// Default location of the USBDeview tool shipped with MediaPortal.
pub fn default_usbdeview_path() -> PathBuf {
    if is_64bit_os() {
        PathBuf::from(r"C:\Program Files (x86)\Team MediaPortal\MediaPortal\USBDeview.exe")
    } else {
        PathBuf::from(r"C:\Program Files\Team MediaPortal\MediaPortal\USBDeview-x86.exe")
    }
}

/// Process layer backed by the real OS.
///
/// Port toggling shells out to USBDeview (`/disable_by_drive`, `/enable_by_drive`).
pub struct SystemProcessHost {
    usbdeview: PathBuf,
    sys: Mutex<System>,
}

impl SystemProcessHost {
    pub fn new(usbdeview: PathBuf) -> Self {
        Self {
            usbdeview,
            sys: Mutex::new(System::new()),
        }
    }

    fn toggle_port(&self, switch: &str, port: &str) -> Result<()> {
        self.start_process(&self.usbdeview, &[switch, port], true)
    }
}

impl Default for SystemProcessHost {
    fn default() -> Self {
        Self::new(default_usbdeview_path())
    }
}

impl ProcessHost for SystemProcessHost {
    fn is_process_running(&self, name: &str) -> bool {
        let Ok(mut sys) = self.sys.lock() else {
            log::warn!("process table mutex poisoned");
            return false;
        };
        sys.refresh_processes(ProcessesToUpdate::All, true);
        sys.processes()
            .values()
            .any(|p| p.name().to_string_lossy().eq_ignore_ascii_case(name))
    }

    fn start_process(&self, path: &Path, args: &[&str], wait_for_exit: bool) -> Result<()> {
        if !path.exists() {
            return Err(ProcessError::NotFound(path.to_path_buf()));
        }
        let mut cmd = std::process::Command::new(path);
        cmd.args(args);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed(format!("{}: {e}", path.display())))?;
        log::debug!("started {} {}", path.display(), args.join(" "));
        if !wait_for_exit {
            return Ok(());
        }
        let status = wait_with_timeout(&mut child, WAIT_FOR_EXIT_TIMEOUT)
            .map_err(|e| ProcessError::Failed(format!("{}: {e}", path.display())))?;
        match status {
            Some(s) if s.success() => Ok(()),
            Some(s) => Err(ProcessError::Failed(format!(
                "{} exited with {s}",
                path.display()
            ))),
            None => Err(ProcessError::Timeout(format!(
                "{} did not exit within {WAIT_FOR_EXIT_TIMEOUT:?}",
                path.display()
            ))),
        }
    }

    fn disable_device_by_port(&self, port: &str) -> Result<()> {
        self.toggle_port("/disable_by_drive", port)
    }

    fn enable_device_by_port(&self, port: &str) -> Result<()> {
        self.toggle_port("/enable_by_drive", port)
    }
}

/// Wait for `child` to exit. Kills and reaps it on timeout, returning `None`.
fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let max_polls = (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1) as u64;
    for _ in 0..max_polls {
        match child.try_wait()? {
            Some(status) => return Ok(Some(status)),
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
    let _ = child.kill();
    child.wait()?; // reap zombie
    Ok(None)
}

// ── Mock process layer for testing ──

/// In-memory process layer for unit and integration tests.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;

    /// Records every call; `running` decides `is_process_running`.
    #[derive(Default)]
    pub struct MockProcessHost {
        /// Lower-cased names of "running" processes.
        pub running: Mutex<HashSet<String>>,
        /// Recorded calls, e.g. `"start C:\\AtmoHue\\AtmoHue.exe"`, `"disable COM3"`.
        pub calls: Mutex<Vec<String>>,
        /// If true, starting a process marks it running.
        pub start_marks_running: bool,
        /// If true, `start_process` fails.
        pub fail_start: bool,
    }

    impl MockProcessHost {
        pub fn new() -> Self {
            Self {
                start_marks_running: true,
                ..Default::default()
            }
        }

        pub fn set_running(&self, name: &str) {
            if let Ok(mut r) = self.running.lock() {
                r.insert(name.to_lowercase());
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn record(&self, call: String) {
            if let Ok(mut c) = self.calls.lock() {
                c.push(call);
            }
        }
    }

    impl ProcessHost for MockProcessHost {
        fn is_process_running(&self, name: &str) -> bool {
            self.running
                .lock()
                .map(|r| r.contains(&name.to_lowercase()))
                .unwrap_or(false)
        }

        fn start_process(&self, path: &Path, args: &[&str], _wait_for_exit: bool) -> Result<()> {
            let mut call = format!("start {}", path.display());
            for a in args {
                call.push(' ');
                call.push_str(a);
            }
            self.record(call);
            if self.fail_start {
                return Err(ProcessError::SpawnFailed("mock: start failure injected".into()));
            }
            if self.start_marks_running
                && let Some(name) = path.file_name()
            {
                self.set_running(&name.to_string_lossy());
            }
            Ok(())
        }

        fn disable_device_by_port(&self, port: &str) -> Result<()> {
            self.record(format!("disable {port}"));
            Ok(())
        }

        fn enable_device_by_port(&self, port: &str) -> Result<()> {
            self.record(format!("enable {port}"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockProcessHost;
    use super::*;

    #[test]
    fn start_missing_executable_is_not_found() {
        let host = SystemProcessHost::default();
        let err = host
            .start_process(Path::new("/no/such/helper.exe"), &[], false)
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn unknown_process_is_not_running() {
        let host = SystemProcessHost::default();
        assert!(!host.is_process_running("definitely-not-running-atmolight.exe"));
    }

    #[cfg(unix)]
    #[test]
    fn start_and_wait_succeeds() {
        let host = SystemProcessHost::default();
        assert!(host.start_process(Path::new("/bin/sh"), &["-c", "true"], true).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn start_and_wait_reports_failure_status() {
        let host = SystemProcessHost::default();
        let err = host
            .start_process(Path::new("/bin/sh"), &["-c", "exit 3"], true)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Failed(_)), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn wait_with_timeout_kills_long_running_child() {
        let mut child = std::process::Command::new("sleep").arg("60").spawn().unwrap();
        let status = wait_with_timeout(&mut child, Duration::from_millis(200)).unwrap();
        assert!(status.is_none());
    }

    #[test]
    fn default_usbdeview_path_names_the_tool() {
        let p = default_usbdeview_path();
        let name = p.to_string_lossy().to_lowercase();
        assert!(name.contains("usbdeview"), "got: {name}");
    }

    #[test]
    fn mock_records_port_toggles() {
        let host = MockProcessHost::new();
        host.disable_device_by_port("COM3").unwrap();
        host.enable_device_by_port("COM3").unwrap();
        assert_eq!(host.calls(), vec!["disable COM3", "enable COM3"]);
    }

    #[test]
    fn mock_start_marks_running_case_insensitive() {
        let host = MockProcessHost::new();
        assert!(!host.is_process_running("atmohue.exe"));
        host.start_process(Path::new("AtmoHue.exe"), &[], false).unwrap();
        assert!(host.is_process_running("atmohue.exe"));
    }
}
