//! Target handler — the uniform contract the orchestrator drives.
//!
//! A [`TargetHandler`] glues a [`Supervisor`] (connection lifecycle), a
//! [`ColorPipeline`] (frame to color) and [`ApiCommand`] encoding for one
//! target. Every method returns immediately: network I/O happens on the
//! supervisor's worker thread.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::color::{ColorPipeline, Frame, Rgb, Strategy};
use crate::command::{ApiCommand, ColorCommand, GroupAction, STATIC_COLOR_PRIORITY};
use crate::config::Config;
use crate::error::Result;
use crate::process::ProcessHost;
use crate::settings;
use crate::supervisor::{Phase, SessionHooks, Supervisor, SupervisorConfig, TargetEvent};
use crate::target::{ContentEffect, PowerMode, TargetId, TargetInfo};
use crate::transport::{HelperTransport, PortWake, SerialTransport, TcpTransport, Transport};

// ── Effect source ──

/// Where the handler learns which effect is currently selected.
pub trait EffectSource: Send + Sync {
    fn current_effect(&self) -> ContentEffect;
}

/// A shareable, settable effect cell.
#[derive(Debug, Clone, Default)]
pub struct SharedEffect(Arc<Mutex<ContentEffect>>);

impl SharedEffect {
    pub fn new(effect: ContentEffect) -> Self {
        SharedEffect(Arc::new(Mutex::new(effect)))
    }

    pub fn set(&self, effect: ContentEffect) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = effect;
    }
}

impl EffectSource for SharedEffect {
    fn current_effect(&self) -> ContentEffect {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The color that puts a target into `effect`.
///
/// Static color sends the configured color; everything else sends black at
/// the lowest priority. Frame-driven effects then take over via frames.
pub fn effect_command(effect: ContentEffect, static_color: Rgb) -> ColorCommand {
    match effect {
        ContentEffect::StaticColor => ColorCommand::new(static_color, STATIC_COLOR_PRIORITY, 0),
        _ => ColorCommand::off(),
    }
}

struct EffectHooks {
    effect: Arc<dyn EffectSource>,
    static_color: Rgb,
}

impl SessionHooks for EffectHooks {
    fn power_on(&self) -> Vec<u8> {
        ApiCommand::Power(true).encode()
    }

    fn effect_sync(&self) -> Option<Vec<u8>> {
        let cmd = effect_command(self.effect.current_effect(), self.static_color);
        Some(ApiCommand::Color(cmd).encode())
    }
}

// ── Handler ──

/// Per-target behavior switches.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub min_diversion: u8,
    pub min_color_difference: u8,
    pub static_color: Rgb,
    /// Defer a power-on until the link is back after resume.
    pub power_on_resume: bool,
    /// Send a power-off on suspend (only if connected).
    pub power_off_suspend: bool,
    /// Helper executable whose directory holds `settings.xml`.
    pub helper_path: Option<PathBuf>,
}

impl HandlerSettings {
    /// Settings for the Hue target.
    pub fn hue(config: &Config) -> Self {
        let path = config.hue_path.trim();
        HandlerSettings {
            min_diversion: config.min_diversion,
            min_color_difference: config.hue_min_color_difference,
            static_color: config.static_rgb(),
            power_on_resume: config.hue_bridge_enable_on_resume,
            power_off_suspend: config.hue_bridge_disable_on_suspend,
            helper_path: (!path.is_empty()).then(|| PathBuf::from(path)),
        }
    }

    /// Settings for the serial target. It has no bridge and no helper settings.
    pub fn atmowin(config: &Config) -> Self {
        HandlerSettings {
            power_on_resume: false,
            power_off_suspend: false,
            helper_path: None,
            ..Self::hue(config)
        }
    }
}

/// One lighting target: connection, color pipeline and command encoding.
pub struct TargetHandler {
    info: TargetInfo,
    supervisor: Supervisor,
    pipeline: Mutex<ColorPipeline>,
    effect: Arc<dyn EffectSource>,
    settings: HandlerSettings,
}

impl TargetHandler {
    /// Build a handler around an arbitrary transport. Starts `Idle`.
    pub fn new(
        info: TargetInfo,
        transport: Box<dyn Transport>,
        supervisor: SupervisorConfig,
        settings: HandlerSettings,
        effect: Arc<dyn EffectSource>,
        events: Option<Sender<TargetEvent>>,
    ) -> Result<Self> {
        let hooks = EffectHooks {
            effect: effect.clone(),
            static_color: settings.static_color,
        };
        let supervisor =
            Supervisor::spawn(info.id, transport, supervisor, Box::new(hooks), events)?;
        Ok(TargetHandler {
            pipeline: Mutex::new(ColorPipeline::new(
                settings.min_diversion,
                settings.min_color_difference,
            )),
            info,
            supervisor,
            effect,
            settings,
        })
    }

    /// The Hue bridge, reached over TCP through the AtmoHue helper.
    pub fn hue(
        config: &Config,
        host: Arc<dyn ProcessHost>,
        effect: Arc<dyn EffectSource>,
        events: Option<Sender<TargetEvent>>,
    ) -> Result<Self> {
        let supervisor = config.supervisor_config();
        let tcp = TcpTransport::new(
            config.hue_ip.clone(),
            config.hue_port,
            supervisor.connect_timeout,
        );
        let transport = HelperTransport::new(Box::new(tcp), host, config.hue_launch());
        Self::new(
            TargetInfo::hue(),
            Box::new(transport),
            supervisor,
            HandlerSettings::hue(config),
            effect,
            events,
        )
    }

    /// A serial controller on `atmowin_port`.
    pub fn atmowin(
        config: &Config,
        host: Arc<dyn ProcessHost>,
        effect: Arc<dyn EffectSource>,
        events: Option<Sender<TargetEvent>>,
    ) -> Result<Self> {
        let mut serial = SerialTransport::new(config.atmowin_port.trim(), config.atmowin_baud_rate);
        if config.atmowin_wake_helper {
            serial = serial.with_wake(PortWake {
                host,
                settle: std::time::Duration::from_millis(config.port_settle_ms),
            });
        }
        Self::new(
            TargetInfo::atmowin(),
            Box::new(serial),
            config.supervisor_config(),
            HandlerSettings::atmowin(config),
            effect,
            events,
        )
    }

    pub fn info(&self) -> &TargetInfo {
        &self.info
    }

    pub fn id(&self) -> TargetId {
        self.info.id
    }

    pub fn phase(&self) -> Phase {
        self.supervisor.phase()
    }

    pub fn is_connected(&self) -> bool {
        self.supervisor.is_connected()
    }

    // ── Lifecycle ──

    /// Start connecting. No-op while a connect is in progress unless `force`.
    pub fn initialise(&self, force: bool) -> bool {
        self.supervisor.initialise(force)
    }

    /// Reconnect if auto-recovery is enabled or `force`.
    pub fn reinitialise(&self, force: bool) -> bool {
        self.supervisor.reinitialise(force)
    }

    pub fn power_mode_changed(&self, mode: PowerMode) {
        match mode {
            PowerMode::Resume => {
                log::info!("{}: resuming", self.id());
                self.supervisor.resume(self.settings.power_on_resume);
            }
            PowerMode::Suspend => {
                if self.settings.power_off_suspend && self.is_connected() {
                    log::info!("{}: powering off for suspend", self.id());
                    self.power(false);
                }
            }
        }
    }

    /// Close the link and stop the worker.
    pub fn dispose(&mut self) {
        self.supervisor.shutdown();
    }

    // ── Colors and effects ──

    pub fn change_color(&self, cmd: ColorCommand) -> bool {
        self.dispatch(ApiCommand::Color(cmd))
    }

    /// Put the target into `effect`. Returns `false` if not connected.
    pub fn change_effect(&self, effect: ContentEffect) -> bool {
        if !self.is_connected() {
            return false;
        }
        if !self.info.supports(effect) {
            log::debug!("{}: {effect} not supported, turning lights off", self.id());
        }
        self.change_color(effect_command(effect, self.settings.static_color))
    }

    /// Derive a color from a raw BGR(X) frame and send it if it changed enough.
    ///
    /// Malformed geometry is logged and the frame skipped.
    pub fn change_image(
        &self,
        data: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        bytes_per_pixel: usize,
    ) -> bool {
        match Frame::new(data, width, height, stride, bytes_per_pixel) {
            Ok(frame) => self.change_frame(&frame),
            Err(e) => {
                log::warn!("{}: skipping frame: {e}", self.id());
                false
            }
        }
    }

    /// Like [`change_image`](Self::change_image) for an already validated frame.
    ///
    /// Returns `false` if nothing was queued (not connected, invalid average or
    /// below the change threshold); color memory is left as it was.
    pub fn change_frame(&self, frame: &Frame<'_>) -> bool {
        let strategy = Strategy::for_effect(self.effect.current_effect());
        let mut pipeline = self.pipeline();
        let Some(cmd) = pipeline.evaluate(strategy, frame) else {
            return false;
        };
        // Memory only moves for colors that were actually queued.
        if !self.change_color(cmd) {
            return false;
        }
        pipeline.commit(strategy, cmd.color);
        true
    }

    /// Last frame color sent with `strategy`.
    pub fn last_sent(&self, strategy: Strategy) -> Rgb {
        self.pipeline().last_sent(strategy)
    }

    // ── Helper actions ──

    pub fn set_active_group(&self, group: &str) -> bool {
        self.dispatch(ApiCommand::Group(GroupAction::OnlyActivate(group.to_string())))
    }

    pub fn set_group_static_color(&self, group: &str, color: &str) -> bool {
        self.dispatch(ApiCommand::Group(GroupAction::SetStaticColor {
            group: group.to_string(),
            color: color.to_string(),
        }))
    }

    pub fn set_room(&self, room: &str) -> bool {
        self.dispatch(ApiCommand::Room(room.to_string()))
    }

    pub fn power(&self, on: bool) -> bool {
        self.dispatch(ApiCommand::Power(on))
    }

    /// Group names from the helper's `settings.xml`.
    pub fn load_groups(&self) -> Vec<String> {
        self.settings
            .helper_path
            .as_deref()
            .map(settings::load_groups)
            .unwrap_or_default()
    }

    /// Static color names from the helper's `settings.xml`.
    pub fn load_static_colors(&self) -> Vec<String> {
        self.settings
            .helper_path
            .as_deref()
            .map(settings::load_static_colors)
            .unwrap_or_default()
    }

    fn dispatch(&self, cmd: ApiCommand) -> bool {
        log::debug!("{}: {cmd}", self.id());
        self.supervisor.send(cmd.encode())
    }

    fn pipeline(&self) -> MutexGuard<'_, ColorPipeline> {
        self.pipeline.lock().unwrap_or_else(|e| e.into_inner())
    }
}
