//! Color handling — RGB values, frame views, extraction and hysteresis.

mod extract;
mod frame;
mod pipeline;
mod rgb;

pub use extract::{DEFAULT_MIN_DIVERSION, average_color, edge_color, is_gray};
pub use frame::{Frame, FrameError};
pub use pipeline::{
    ColorMemory, ColorPipeline, FRAME_PRIORITY, Strategy, exceeds_threshold,
};
pub use rgb::{Rgb, format_color, parse_color};
