//! Serial transport for COM/tty attached controllers.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serialport::SerialPort;

use super::{Cancel, Link, Result, Transport, TransportError};
use crate::process::ProcessHost;

/// Power-cycles the USB device behind a port on resume.
///
/// Some USB-serial controllers come back from standby with a dead COM port;
/// detaching and re-attaching the device brings it back.
#[derive(Clone)]
pub struct PortWake {
    pub host: Arc<dyn ProcessHost>,
    /// Pause after each detach/attach step.
    pub settle: Duration,
}

pub struct SerialTransport {
    port: String,
    baud_rate: u32,
    wake: Option<PortWake>,
}

impl SerialTransport {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        SerialTransport {
            port: port.into(),
            baud_rate,
            wake: None,
        }
    }

    /// Enable the resume-time port power cycle.
    pub fn with_wake(mut self, wake: PortWake) -> Self {
        self.wake = Some(wake);
        self
    }
}

impl Transport for SerialTransport {
    fn endpoint(&self) -> String {
        format!("{}@{}", self.port, self.baud_rate)
    }

    fn connect(&mut self, timeout: Duration) -> Result<Box<dyn Link>> {
        let port = serialport::new(&self.port, self.baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {e}", self.port)))?;
        Ok(Box::new(SerialLink {
            port: Some(port),
            name: self.port.clone(),
        }))
    }

    fn wake(&mut self, cancel: &Cancel) -> Result<()> {
        let Some(wake) = &self.wake else {
            return Ok(());
        };
        log::info!("power cycling USB device on {}", self.port);
        wake.host
            .disable_device_by_port(&self.port)
            .map_err(|e| TransportError::Setup(format!("{}: {e}", self.port)))?;
        // Re-enable even when cancelled; never leave the device detached.
        cancel.pause(wake.settle);
        wake.host
            .enable_device_by_port(&self.port)
            .map_err(|e| TransportError::Setup(format!("{}: {e}", self.port)))?;
        cancel.pause(wake.settle);
        Ok(())
    }
}

struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl Link for SerialLink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(port) = self.port.as_mut() else {
            return Err(TransportError::Closed);
        };
        if let Err(e) = port.write_all(bytes).and_then(|_| port.flush()) {
            self.port = None;
            return Err(TransportError::SendFailed(format!("{}: {e}", self.name)));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        self.port = None;
    }
}
