//! Wire commands for lighting helpers.
//!
//! Commands are plain ASCII, comma-separated, and start with the application
//! tag: `ATMOLIGHT,<type>,<field...>`. The helper splits on commas, so group
//! and color names must not contain them.
//!
//! | Type    | Fields                                    |
//! |---------|-------------------------------------------|
//! | `Color` | `R,G,B,priority,brightness` (decimal)     |
//! | `Group` | `OnlyActivate,<group>` or `SetStaticColor,<group>,<color>` |
//! | `Power` | `ON` or `OFF`                             |
//! | `Room`  | `<room>`                                  |

use std::fmt;

use crate::color::Rgb;

/// Application tag prefixed to every command.
pub const APP_TAG: &str = "ATMOLIGHT";

/// Priority of the configured static color.
pub const STATIC_COLOR_PRIORITY: u8 = 10;

/// Priority of the "LEDs off" black.
pub const DISABLED_PRIORITY: u8 = 1;

/// A color sample ready to be sent: RGB plus precedence and brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCommand {
    pub color: Rgb,
    pub priority: u8,
    pub brightness: u8,
}

impl ColorCommand {
    pub fn new(color: Rgb, priority: u8, brightness: u8) -> Self {
        ColorCommand {
            color,
            priority,
            brightness,
        }
    }

    /// Black at the lowest priority; turns the lights off.
    pub fn off() -> Self {
        ColorCommand::new(Rgb::BLACK, DISABLED_PRIORITY, 0)
    }
}

/// Helper group actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAction {
    /// Make `group` the only active group.
    OnlyActivate(String),
    /// Switch `group` to the named static color from the helper settings.
    SetStaticColor { group: String, color: String },
}

/// A command understood by the lighting helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCommand {
    Color(ColorCommand),
    Group(GroupAction),
    Power(bool),
    Room(String),
}

impl ApiCommand {
    /// Command type keyword as sent on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiCommand::Color(_) => "Color",
            ApiCommand::Group(_) => "Group",
            ApiCommand::Power(_) => "Power",
            ApiCommand::Room(_) => "Room",
        }
    }

    /// Encode as the ASCII bytes written to the transport.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ApiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{APP_TAG},{}", self.kind())?;
        match self {
            ApiCommand::Color(c) => write!(
                f,
                ",{},{},{},{},{}",
                c.color.r, c.color.g, c.color.b, c.priority, c.brightness
            ),
            ApiCommand::Group(GroupAction::OnlyActivate(group)) => {
                write!(f, ",OnlyActivate,{group}")
            }
            ApiCommand::Group(GroupAction::SetStaticColor { group, color }) => {
                write!(f, ",SetStaticColor,{group},{color}")
            }
            ApiCommand::Power(on) => write!(f, ",{}", if *on { "ON" } else { "OFF" }),
            ApiCommand::Room(room) => write!(f, ",{room}"),
        }
    }
}
