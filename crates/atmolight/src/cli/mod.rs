//! CLI subcommands — target control, helper settings, offline frame colors.

mod config_cmd;
mod control;
mod frame;
mod settings_cmd;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use atmolight_lib::AtmoError;
pub(super) use atmolight_lib::color::{self, Rgb};
pub(super) use atmolight_lib::config::Config;
pub(super) use atmolight_lib::error::Result;
pub(super) use atmolight_lib::handler::{SharedEffect, TargetHandler};
pub(super) use atmolight_lib::supervisor::{Phase, TargetEvent};
pub(super) use atmolight_lib::target::{ContentEffect, TargetId};

use atmolight_lib::process::{ProcessHost, SystemProcessHost};
use atmolight_lib::transport::TransportError;

const PADDING: usize = 2;

/// Poll interval while waiting on a connect sequence.
const PHASE_POLL: Duration = Duration::from_millis(50);

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{key:<width$}{value}", width = w);
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AtmoError::Config(format!("cannot serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

// ── Config and target wiring ──

/// Load the config from `custom` or the default location, logging warnings.
pub(super) fn load_config(custom: Option<&Path>) -> Config {
    let (config, warnings) = match custom {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("[config] {w}");
    }
    config
}

/// Config file location: `custom` if given, else the platform default.
pub(super) fn config_path(custom: Option<&Path>) -> Option<PathBuf> {
    custom.map(Path::to_path_buf).or_else(Config::path)
}

/// Which target a command talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// Hue bridge through the AtmoHue helper (TCP)
    Hue,
    /// Serial controller on `atmowin_port`
    Atmowin,
}

impl From<TargetArg> for TargetId {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::Hue => TargetId::Hue,
            TargetArg::Atmowin => TargetId::AtmoWin,
        }
    }
}

/// Build a handler for `target`, backed by the real process layer.
pub(super) fn open_target(
    config: &Config,
    target: TargetArg,
    effect: &SharedEffect,
    events: Option<Sender<TargetEvent>>,
) -> Result<TargetHandler> {
    let host: Arc<dyn ProcessHost> = Arc::new(SystemProcessHost::new(PathBuf::from(
        &config.usbdeview_path,
    )));
    let effect = Arc::new(effect.clone());
    match target {
        TargetArg::Hue => TargetHandler::hue(config, host, effect, events),
        TargetArg::Atmowin => TargetHandler::atmowin(config, host, effect, events),
    }
}

/// Start a connect sequence and block until it settles.
///
/// Fails if the target ends up idle (retries spent or setup error) or if
/// Ctrl+C interrupts the wait.
pub(super) fn connect_and_wait(handler: &TargetHandler) -> Result<()> {
    handler.initialise(false);
    while RUNNING.load(Ordering::SeqCst) && handler.phase() == Phase::Connecting {
        std::thread::sleep(PHASE_POLL);
    }
    if handler.is_connected() {
        Ok(())
    } else {
        Err(AtmoError::Transport(TransportError::ConnectFailed(format!(
            "{}: not connected",
            handler.id()
        ))))
    }
}

/// Parse an effect name as accepted on the command line.
pub(super) fn parse_effect(name: &str) -> Result<ContentEffect> {
    name.parse()
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
}

#[derive(Serialize)]
pub(super) struct ValidateOutput {
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct NamesOutput {
    pub settings_file: String,
    pub count: usize,
    pub names: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct FrameOutput {
    pub effect: String,
    pub strategy: String,
    pub color: Option<String>,
    pub rgb: Option<Rgb>,
    pub command: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration and file path (default)
    Show,
    /// Print the config file path
    Path,
    /// Check the configuration for errors
    Validate,
    /// Write the config file with every key filled in
    Init {
        /// Rewrite an existing file, keeping its values
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect to a target and hold the connection until Ctrl+C
    Connect {
        #[arg(long, value_enum, default_value_t = TargetArg::Hue)]
        target: TargetArg,
        /// Effect applied after each connect (e.g. static-color, leds-disabled)
        #[arg(long, default_value = "static-color")]
        effect: String,
    },

    /// Send a color (hex, name or "r,g,b")
    Color {
        color: String,
        /// Command priority
        #[arg(long, default_value_t = atmolight_lib::command::STATIC_COLOR_PRIORITY)]
        priority: u8,
        /// Brightness (0 = leave unchanged)
        #[arg(long, default_value_t = 0)]
        brightness: u8,
        #[arg(long, value_enum, default_value_t = TargetArg::Hue)]
        target: TargetArg,
    },

    /// Apply an effect (static-color, leds-disabled, live-mode, ...)
    Effect {
        effect: String,
        #[arg(long, value_enum, default_value_t = TargetArg::Hue)]
        target: TargetArg,
    },

    /// Power the bridge on or off
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },

    /// Make a helper light group the only active one
    Group { name: String },

    /// Switch a helper light group to a named static color
    GroupColor { group: String, color: String },

    /// Select a helper room
    Room { name: String },

    /// List light groups from the helper settings
    Groups,

    /// List named static colors from the helper settings
    StaticColors,

    /// Show, locate or validate the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Compute the color of a raw BGR(X) frame file (no hardware required)
    Frame {
        /// Raw pixel file, rows top to bottom
        file: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// Bytes per row (default: width * bpp)
        #[arg(long)]
        stride: Option<usize>,
        /// Bytes per pixel (3 or 4)
        #[arg(long, default_value_t = 4)]
        bpp: usize,
        /// Effect whose extraction strategy is used
        #[arg(long, default_value = "live-mode")]
        effect: String,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    if json
        && !matches!(
            cmd,
            Command::Config { .. } | Command::Groups | Command::StaticColors | Command::Frame { .. }
        )
    {
        warn_json_unsupported(cmd.name());
    }
    match cmd {
        Command::Connect { target, effect } => {
            control::cmd_connect(config_path, target, parse_effect(&effect)?)
        }
        Command::Color {
            color,
            priority,
            brightness,
            target,
        } => control::cmd_color(config_path, target, &color, priority, brightness),
        Command::Effect { effect, target } => {
            control::cmd_effect(config_path, target, parse_effect(&effect)?)
        }
        Command::Power { state } => control::cmd_power(config_path, state == PowerState::On),
        Command::Group { name } => control::cmd_group(config_path, &name),
        Command::GroupColor { group, color } => {
            control::cmd_group_color(config_path, &group, &color)
        }
        Command::Room { name } => control::cmd_room(config_path, &name),
        Command::Groups => settings_cmd::cmd_groups(config_path, json),
        Command::StaticColors => settings_cmd::cmd_static_colors(config_path, json),
        Command::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => config_cmd::cmd_config(json, config_path),
            ConfigAction::Path => config_cmd::cmd_config_path(config_path),
            ConfigAction::Validate => config_cmd::cmd_validate(json, config_path),
            ConfigAction::Init { force } => config_cmd::cmd_config_init(config_path, force),
        },
        Command::Frame {
            file,
            width,
            height,
            stride,
            bpp,
            effect,
        } => frame::cmd_frame(
            config_path,
            &file,
            frame::FrameShape {
                width,
                height,
                stride,
                bpp,
            },
            parse_effect(&effect)?,
            json,
        ),
    }
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::Color { .. } => "color",
            Command::Effect { .. } => "effect",
            Command::Power { .. } => "power",
            Command::Group { .. } => "group",
            Command::GroupColor { .. } => "group-color",
            Command::Room { .. } => "room",
            Command::Groups => "groups",
            Command::StaticColors => "static-colors",
            Command::Config { .. } => "config",
            Command::Frame { .. } => "frame",
        }
    }
}
