//! Unified error type for the atmolight-lib crate.
//!
//! [`AtmoError`] wraps boundary-specific errors (`TransportError`,
//! `ProcessError`, `SettingsError`, `FrameError`) and domain-specific error
//! kinds (`Config`, `Color`). `From` impls allow `?` to propagate across module
//! boundaries seamlessly.

use std::fmt;

use crate::color::FrameError;
use crate::process::ProcessError;
use crate::settings::SettingsError;
use crate::transport::TransportError;

/// Unified error type for atmolight-lib operations.
#[derive(Debug)]
pub enum AtmoError {
    /// Target transport error (connect, send, helper setup).
    Transport(TransportError),
    /// Process/OS layer error (helper launch, port toggling).
    Process(ProcessError),
    /// Helper settings file error.
    Settings(SettingsError),
    /// Malformed capture frame.
    Frame(FrameError),
    /// Standard I/O error (config persistence).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Color parsing error.
    Color(String),
}

impl fmt::Display for AtmoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtmoError::Transport(e) => write!(f, "{e}"),
            AtmoError::Process(e) => write!(f, "{e}"),
            AtmoError::Settings(e) => write!(f, "{e}"),
            AtmoError::Frame(e) => write!(f, "{e}"),
            AtmoError::Io(e) => write!(f, "I/O error: {e}"),
            AtmoError::Config(e) => write!(f, "Config error: {e}"),
            AtmoError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for AtmoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AtmoError::Transport(e) => Some(e),
            AtmoError::Process(e) => Some(e),
            AtmoError::Settings(e) => Some(e),
            AtmoError::Frame(e) => Some(e),
            AtmoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for AtmoError {
    fn from(e: TransportError) -> Self {
        AtmoError::Transport(e)
    }
}

impl From<ProcessError> for AtmoError {
    fn from(e: ProcessError) -> Self {
        AtmoError::Process(e)
    }
}

impl From<SettingsError> for AtmoError {
    fn from(e: SettingsError) -> Self {
        AtmoError::Settings(e)
    }
}

impl From<FrameError> for AtmoError {
    fn from(e: FrameError) -> Self {
        AtmoError::Frame(e)
    }
}

impl From<std::io::Error> for AtmoError {
    fn from(e: std::io::Error) -> Self {
        AtmoError::Io(e)
    }
}

/// Crate-level Result alias using [`AtmoError`].
pub type Result<T> = std::result::Result<T, AtmoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_transport_error() {
        let e: AtmoError = TransportError::Closed.into();
        assert!(matches!(e, AtmoError::Transport(TransportError::Closed)));
    }

    #[test]
    fn from_process_error() {
        let e: AtmoError = ProcessError::SpawnFailed("test".into()).into();
        assert!(matches!(e, AtmoError::Process(ProcessError::SpawnFailed(_))));
    }

    #[test]
    fn from_frame_error() {
        let e: AtmoError = FrameError::UnsupportedBytesPerPixel(2).into();
        assert!(matches!(e, AtmoError::Frame(_)));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: AtmoError = io_err.into();
        assert!(matches!(e, AtmoError::Io(_)));
    }

    #[test]
    fn display_transport_error() {
        let e = AtmoError::Transport(TransportError::Closed);
        assert_eq!(e.to_string(), "Link closed");
    }

    #[test]
    fn display_config_error() {
        let e = AtmoError::Config("invalid input".into());
        assert_eq!(e.to_string(), "Config error: invalid input");
    }

    #[test]
    fn display_color_error() {
        let e = AtmoError::Color("bad hex".into());
        assert_eq!(e.to_string(), "Color error: bad hex");
    }

    #[test]
    fn source_chains_transport_error() {
        let e = AtmoError::Transport(TransportError::SendFailed("timeout".into()));
        let source = std::error::Error::source(&e).unwrap();
        assert!(source.to_string().contains("timeout"));
    }

    #[test]
    fn source_none_for_string_variants() {
        let e = AtmoError::Config("test".into());
        assert!(std::error::Error::source(&e).is_none());
    }

    #[test]
    fn question_mark_propagation_transport_to_atmo() {
        fn inner() -> crate::transport::Result<()> {
            Err(TransportError::ConnectFailed("refused".into()))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        let err = outer().unwrap_err();
        assert!(matches!(
            err,
            AtmoError::Transport(TransportError::ConnectFailed(_))
        ));
    }

    #[test]
    fn question_mark_propagation_io_to_atmo() {
        fn inner() -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        let err = outer().unwrap_err();
        assert!(matches!(err, AtmoError::Io(_)));
    }
}
