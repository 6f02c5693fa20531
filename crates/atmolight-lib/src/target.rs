//! Target identity and capability descriptors.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Stable identifier of a lighting target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetId {
    /// Philips Hue bridge, reached through the local AtmoHue helper.
    Hue,
    /// AtmoWin-style serial/USB controller.
    AtmoWin,
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Hue => write!(f, "Hue"),
            TargetId::AtmoWin => write!(f, "AtmoWin"),
        }
    }
}

/// How a target is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportKind {
    Network,
    Serial,
    LocalProcess,
}

/// Visual effects a target can be driven with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ContentEffect {
    #[default]
    Undefined,
    GifReader,
    LedsDisabled,
    LiveMode,
    StaticColor,
    VuMeter,
    VuMeterRainbow,
}

impl ContentEffect {
    pub const ALL: [ContentEffect; 7] = [
        ContentEffect::Undefined,
        ContentEffect::GifReader,
        ContentEffect::LedsDisabled,
        ContentEffect::LiveMode,
        ContentEffect::StaticColor,
        ContentEffect::VuMeter,
        ContentEffect::VuMeterRainbow,
    ];

    /// Whether the effect is driven per frame through `change_image`.
    pub fn is_frame_driven(&self) -> bool {
        matches!(
            self,
            ContentEffect::GifReader
                | ContentEffect::LiveMode
                | ContentEffect::VuMeter
                | ContentEffect::VuMeterRainbow
        )
    }

    /// Kebab-case name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ContentEffect::Undefined => "undefined",
            ContentEffect::GifReader => "gif-reader",
            ContentEffect::LedsDisabled => "leds-disabled",
            ContentEffect::LiveMode => "live-mode",
            ContentEffect::StaticColor => "static-color",
            ContentEffect::VuMeter => "vu-meter",
            ContentEffect::VuMeterRainbow => "vu-meter-rainbow",
        }
    }
}

impl fmt::Display for ContentEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentEffect {
    type Err = crate::AtmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ContentEffect::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| crate::AtmoError::Config(format!("Unknown effect: {s}")))
    }
}

/// Host power-state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Resume,
    Suspend,
}

/// Immutable capability descriptor of a target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetInfo {
    pub id: TargetId,
    pub transport: TransportKind,
    pub supported_effects: Vec<ContentEffect>,
    /// Whether the target tolerates queued/delayed commands.
    pub allow_delay: bool,
}

impl TargetInfo {
    /// The Hue bridge via the AtmoHue helper.
    pub fn hue() -> Self {
        TargetInfo {
            id: TargetId::Hue,
            transport: TransportKind::Network,
            supported_effects: vec![
                ContentEffect::GifReader,
                ContentEffect::LedsDisabled,
                ContentEffect::LiveMode,
                ContentEffect::StaticColor,
                ContentEffect::VuMeter,
                ContentEffect::VuMeterRainbow,
            ],
            allow_delay: false,
        }
    }

    /// A serial controller on a COM/tty port.
    pub fn atmowin() -> Self {
        TargetInfo {
            id: TargetId::AtmoWin,
            transport: TransportKind::Serial,
            supported_effects: vec![
                ContentEffect::GifReader,
                ContentEffect::LedsDisabled,
                ContentEffect::LiveMode,
                ContentEffect::StaticColor,
            ],
            allow_delay: true,
        }
    }

    pub fn supports(&self, effect: ContentEffect) -> bool {
        self.supported_effects.contains(&effect)
    }
}
