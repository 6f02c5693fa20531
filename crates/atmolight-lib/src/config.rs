//! Application configuration — TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::{DEFAULT_MIN_DIVERSION, Rgb, parse_color};
use crate::reconnect::ReconnectConfig;
use crate::supervisor::SupervisorConfig;
use crate::transport::HelperLaunch;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# AtmoLight configuration — changes made outside the app may be overwritten.\n\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ── Hue helper ──
    /// Address of the AtmoHue helper. Default: "127.0.0.1".
    #[serde(default = "default_hue_ip")]
    pub hue_ip: String,

    /// TCP port of the AtmoHue helper. Default: 20123.
    #[serde(default = "default_hue_port")]
    pub hue_port: u16,

    /// Path to AtmoHue.exe. Its directory also holds `settings.xml`.
    #[serde(default)]
    pub hue_path: String,

    /// Launch the helper if it is not running.
    #[serde(default = "default_true")]
    pub hue_start: bool,

    /// The helper runs on another machine; never launch it locally.
    #[serde(default)]
    pub hue_is_remote_machine: bool,

    /// Retries after the first failed connect. Default: 5.
    #[serde(default = "default_reconnect_attempts")]
    pub hue_reconnect_attempts: u32,

    /// Pause between connect attempts, in milliseconds. Default: 10000.
    #[serde(default = "default_reconnect_delay_ms")]
    pub hue_reconnect_delay_ms: u64,

    /// Per-channel change needed before a new frame color is sent. 0 = send every frame.
    #[serde(default = "default_min_color_difference")]
    pub hue_min_color_difference: u8,

    /// Pixels whose channels all lie within this distance are ignored as gray.
    #[serde(default = "default_min_diversion")]
    pub min_diversion: u8,

    /// Power the bridge on after resuming from standby.
    #[serde(default)]
    pub hue_bridge_enable_on_resume: bool,

    /// Power the bridge off when the host suspends.
    #[serde(default)]
    pub hue_bridge_disable_on_suspend: bool,

    /// Reconnect automatically after a send failure.
    #[serde(default = "default_true")]
    pub reinit_on_error: bool,

    /// Color used by the static color effect (hex, name or "r,g,b").
    #[serde(default = "default_static_color")]
    pub static_color: String,

    // ── Timing ──
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Wait after launching the helper before connecting.
    #[serde(default = "default_helper_settle_ms")]
    pub helper_settle_ms: u64,

    /// Wait after a resume power-on before other commands.
    #[serde(default = "default_power_on_settle_ms")]
    pub power_on_settle_ms: u64,

    // ── Serial controller ──
    #[serde(default = "default_atmowin_port")]
    pub atmowin_port: String,

    #[serde(default = "default_atmowin_baud_rate")]
    pub atmowin_baud_rate: u32,

    /// Power cycle the USB device behind the port on resume.
    #[serde(default)]
    pub atmowin_wake_helper: bool,

    /// USBDeview executable used for port power cycling.
    #[serde(default = "default_usbdeview_path")]
    pub usbdeview_path: String,

    /// Wait after each port disable/enable step.
    #[serde(default = "default_port_settle_ms")]
    pub port_settle_ms: u64,
}

fn default_hue_ip() -> String {
    "127.0.0.1".into()
}
fn default_hue_port() -> u16 {
    20123
}
fn default_true() -> bool {
    true
}
fn default_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_delay_ms() -> u64 {
    10_000
}
fn default_min_color_difference() -> u8 {
    20
}
fn default_min_diversion() -> u8 {
    DEFAULT_MIN_DIVERSION
}
fn default_static_color() -> String {
    "#FFFFFF".into()
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_helper_settle_ms() -> u64 {
    5000
}
fn default_power_on_settle_ms() -> u64 {
    2000
}
fn default_atmowin_port() -> String {
    "COM1".into()
}
fn default_atmowin_baud_rate() -> u32 {
    115_200
}
fn default_usbdeview_path() -> String {
    crate::process::default_usbdeview_path()
        .to_string_lossy()
        .into_owned()
}
fn default_port_settle_ms() -> u64 {
    1500
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hue_ip: default_hue_ip(),
            hue_port: default_hue_port(),
            hue_path: String::new(),
            hue_start: true,
            hue_is_remote_machine: false,
            hue_reconnect_attempts: default_reconnect_attempts(),
            hue_reconnect_delay_ms: default_reconnect_delay_ms(),
            hue_min_color_difference: default_min_color_difference(),
            min_diversion: default_min_diversion(),
            hue_bridge_enable_on_resume: false,
            hue_bridge_disable_on_suspend: false,
            reinit_on_error: true,
            static_color: default_static_color(),
            connect_timeout_ms: default_connect_timeout_ms(),
            helper_settle_ms: default_helper_settle_ms(),
            power_on_settle_ms: default_power_on_settle_ms(),
            atmowin_port: default_atmowin_port(),
            atmowin_baud_rate: default_atmowin_baud_rate(),
            atmowin_wake_helper: false,
            usbdeview_path: default_usbdeview_path(),
            port_settle_ms: default_port_settle_ms(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The `static_color` field could not be parsed as a valid color.
    InvalidColor(String),
    /// `hue_port` is zero.
    InvalidPort,
    /// The helper should be launched but `hue_path` is empty.
    EmptyHelperPath,
    /// `atmowin_port` is empty or whitespace-only.
    EmptySerialPort,
    /// `atmowin_baud_rate` is zero.
    InvalidBaudRate,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidColor(e) => write!(f, "Invalid static color: {e}"),
            ValidationError::InvalidPort => write!(f, "Hue port cannot be 0"),
            ValidationError::EmptyHelperPath => {
                write!(f, "hue_path is required when hue_start is enabled")
            }
            ValidationError::EmptySerialPort => write!(f, "Serial port cannot be empty"),
            ValidationError::InvalidBaudRate => write!(f, "Baud rate cannot be 0"),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            dirs::config_dir().map(|p| p.join("AtmoLight"))
        }
        #[cfg(not(windows))]
        {
            dirs::config_dir().map(|p| p.join("atmolight"))
        }
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = parse_color(&self.static_color) {
            errors.push(ValidationError::InvalidColor(e.to_string()));
        }
        if self.hue_port == 0 {
            errors.push(ValidationError::InvalidPort);
        }
        if self.hue_start && !self.hue_is_remote_machine && self.hue_path.trim().is_empty() {
            errors.push(ValidationError::EmptyHelperPath);
        }
        if self.atmowin_port.trim().is_empty() {
            errors.push(ValidationError::EmptySerialPort);
        }
        if self.atmowin_baud_rate == 0 {
            errors.push(ValidationError::InvalidBaudRate);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The configured static color, falling back to white if it does not parse.
    pub fn static_rgb(&self) -> Rgb {
        parse_color(&self.static_color).unwrap_or_else(|e| {
            log::warn!("{e}, using white");
            Rgb::WHITE
        })
    }

    /// Connect/retry policy shared by all targets.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            reconnect: ReconnectConfig {
                max_attempts: self.hue_reconnect_attempts,
                delay: Duration::from_millis(self.hue_reconnect_delay_ms),
            },
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            power_on_settle: Duration::from_millis(self.power_on_settle_ms),
            auto_recover: self.reinit_on_error,
        }
    }

    /// How to find and launch the Hue helper.
    pub fn hue_launch(&self) -> HelperLaunch {
        HelperLaunch {
            path: PathBuf::from(self.hue_path.trim()),
            auto_start: self.hue_start,
            remote: self.hue_is_remote_machine,
            settle: Duration::from_millis(self.helper_settle_ms),
        }
    }
}
