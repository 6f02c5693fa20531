//! `frame` subcommand — run a raw frame file through the color pipeline offline.

use std::path::Path;

use atmolight_lib::color::{ColorPipeline, Frame, FrameError, Strategy};
use atmolight_lib::command::ApiCommand;

use super::{
    ContentEffect, FrameOutput, Result, color, kv, kv_width, load_config, print_json,
};

/// Geometry of a raw frame file.
#[derive(Debug, Clone, Copy)]
pub(super) struct FrameShape {
    pub width: usize,
    pub height: usize,
    pub stride: Option<usize>,
    pub bpp: usize,
}

fn strategy_name(s: Strategy) -> &'static str {
    match s {
        Strategy::Average => "average",
        Strategy::Edge => "edge",
    }
}

pub(super) fn cmd_frame(
    config_path: Option<&Path>,
    file: &Path,
    shape: FrameShape,
    effect: ContentEffect,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path);
    let data = std::fs::read(file)?;
    let stride = match shape.stride {
        Some(s) => s,
        None => shape
            .width
            .checked_mul(shape.bpp)
            .ok_or(FrameError::GeometryOverflow)?,
    };
    let frame = Frame::new(&data, shape.width, shape.height, stride, shape.bpp)?;

    if !effect.is_frame_driven() {
        log::warn!("{effect} does not consume frames; showing the live-mode result");
    }
    let strategy = Strategy::for_effect(effect);
    let mut pipeline = ColorPipeline::new(config.min_diversion, config.hue_min_color_difference);
    let candidate = pipeline.candidate(strategy, &frame);
    // Memory starts at black, as on a fresh handler
    let command = pipeline
        .process(strategy, &frame)
        .map(|c| ApiCommand::Color(c).to_string());

    if json {
        return print_json(&FrameOutput {
            effect: effect.to_string(),
            strategy: strategy_name(strategy).into(),
            color: candidate.map(color::format_color),
            rgb: candidate,
            command,
        });
    }

    let w = kv_width(&["Frame:", "Strategy:", "Color:", "Command:"], &[]);
    kv(
        "Frame:",
        format_args!(
            "{}x{} ({} bytes/pixel, stride {stride})",
            shape.width, shape.height, shape.bpp
        ),
        w,
    );
    kv(
        "Strategy:",
        format_args!("{} ({effect})", strategy_name(strategy)),
        w,
    );
    match candidate {
        Some(c) => kv("Color:", format_args!("{} {c}", color::format_color(c)), w),
        None => kv("Color:", "(no chromatic pixels)", w),
    }
    match &command {
        Some(c) => kv("Command:", c, w),
        None => kv("Command:", "(not sent)", w),
    }
    Ok(())
}
