//! TCP transport — used for the Hue helper's command socket.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{Link, Result, Transport, TransportError};

/// Connects to `host:port` with bounded connect, read and write timeouts.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    io_timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16, io_timeout: Duration) -> Self {
        TcpTransport {
            host: host.into(),
            port,
            io_timeout,
        }
    }
}

impl Transport for TcpTransport {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&mut self, timeout: Duration) -> Result<Box<dyn Link>> {
        let endpoint = self.endpoint();
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::ConnectFailed(format!("{endpoint}: {e}")))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    // A zero timeout is rejected by std; treat it as "block"
                    let io = Some(self.io_timeout).filter(|d| !d.is_zero());
                    stream
                        .set_write_timeout(io)
                        .and_then(|_| stream.set_read_timeout(io))
                        .and_then(|_| stream.set_nodelay(true))
                        .map_err(|e| TransportError::ConnectFailed(format!("{endpoint}: {e}")))?;
                    return Ok(Box::new(TcpLink {
                        stream: Some(stream),
                        endpoint,
                    }));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(TransportError::ConnectFailed(match last_err {
            Some(e) => format!("{endpoint}: {e}"),
            None => format!("{endpoint}: no address resolved"),
        }))
    }
}

struct TcpLink {
    stream: Option<TcpStream>,
    endpoint: String,
}

impl Link for TcpLink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Closed);
        };
        let res = stream.write_all(bytes).and_then(|_| stream.flush());
        if let Err(e) = res {
            // A failed write leaves the stream in an unknown state
            self.close();
            return Err(TransportError::SendFailed(format!("{}: {e}", self.endpoint)));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
    }
}
