//! Frame-to-color pipeline — extraction plus hysteresis, decoupled from I/O.
//!
//! The `ColorPipeline` turns a captured frame into at most one color command.
//! It keeps one memory cell per extraction strategy so switching between the
//! live and VU meter effects never compares against the other strategy's
//! last color.

use crate::command::ColorCommand;
use crate::target::ContentEffect;

use super::extract::{average_color, edge_color};
use super::{Frame, Rgb};

/// Priority attached to colors derived from frames.
pub const FRAME_PRIORITY: u8 = 200;

/// Which extraction strategy drives a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Full-frame average of chromatic pixels.
    Average,
    /// First non-black edge pixel (VU meter).
    Edge,
}

impl Strategy {
    /// The strategy used for frames while `effect` is active.
    pub fn for_effect(effect: ContentEffect) -> Self {
        match effect {
            ContentEffect::VuMeter | ContentEffect::VuMeterRainbow => Strategy::Edge,
            _ => Strategy::Average,
        }
    }
}

/// Whether `next` differs enough from `prev` to be sent.
///
/// A zero threshold disables suppression entirely.
pub fn exceeds_threshold(prev: Rgb, next: Rgb, threshold: u8) -> bool {
    threshold == 0 || prev.max_channel_diff(next) > threshold
}

/// Last color sent per strategy. Starts at black and is never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorMemory {
    live: Rgb,
    vu: Rgb,
}

impl ColorMemory {
    pub fn get(&self, strategy: Strategy) -> Rgb {
        match strategy {
            Strategy::Average => self.live,
            Strategy::Edge => self.vu,
        }
    }

    fn set(&mut self, strategy: Strategy, color: Rgb) {
        match strategy {
            Strategy::Average => self.live = color,
            Strategy::Edge => self.vu = color,
        }
    }
}

/// Frame-to-color state machine for one target.
#[derive(Debug, Clone)]
pub struct ColorPipeline {
    min_diversion: u8,
    min_color_difference: u8,
    memory: ColorMemory,
}

impl ColorPipeline {
    pub fn new(min_diversion: u8, min_color_difference: u8) -> Self {
        Self {
            min_diversion,
            min_color_difference,
            memory: ColorMemory::default(),
        }
    }

    /// Extract the candidate color without consulting or touching memory.
    pub fn candidate(&self, strategy: Strategy, frame: &Frame<'_>) -> Option<Rgb> {
        match strategy {
            Strategy::Average => average_color(frame, self.min_diversion),
            Strategy::Edge => Some(edge_color(frame)),
        }
    }

    /// Run a frame through extraction and hysteresis without touching memory.
    ///
    /// Returns the command to dispatch, or `None` if the frame is invalid or
    /// too close to the last sent color. Call [`commit`](Self::commit) once
    /// the command was actually queued.
    pub fn evaluate(&self, strategy: Strategy, frame: &Frame<'_>) -> Option<ColorCommand> {
        let color = self.candidate(strategy, frame)?;
        if !exceeds_threshold(self.memory.get(strategy), color, self.min_color_difference) {
            return None;
        }
        Some(ColorCommand::new(color, FRAME_PRIORITY, 0))
    }

    /// Record `color` as the last one sent for `strategy`.
    pub fn commit(&mut self, strategy: Strategy, color: Rgb) {
        self.memory.set(strategy, color);
    }

    /// [`evaluate`](Self::evaluate) followed by an unconditional commit.
    pub fn process(&mut self, strategy: Strategy, frame: &Frame<'_>) -> Option<ColorCommand> {
        let cmd = self.evaluate(strategy, frame)?;
        self.commit(strategy, cmd.color);
        Some(cmd)
    }

    /// Last color dispatched for `strategy`.
    pub fn last_sent(&self, strategy: Strategy) -> Rgb {
        self.memory.get(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra(pixels: &[Rgb]) -> Vec<u8> {
        pixels.iter().flat_map(|p| [p.b, p.g, p.r, 0]).collect()
    }

    fn solid(color: Rgb) -> Vec<u8> {
        bgra(&[color; 4])
    }

    fn frame(data: &[u8]) -> Frame<'_> {
        Frame::packed(data, 2, 2, 4).unwrap()
    }

    // ── Strategy ──

    #[test]
    fn vu_effects_use_edge_sampling() {
        assert_eq!(Strategy::for_effect(ContentEffect::VuMeter), Strategy::Edge);
        assert_eq!(
            Strategy::for_effect(ContentEffect::VuMeterRainbow),
            Strategy::Edge
        );
    }

    #[test]
    fn other_effects_use_average() {
        assert_eq!(
            Strategy::for_effect(ContentEffect::LiveMode),
            Strategy::Average
        );
        assert_eq!(
            Strategy::for_effect(ContentEffect::GifReader),
            Strategy::Average
        );
    }

    // ── exceeds_threshold ──

    #[test]
    fn zero_threshold_always_sends() {
        let c = Rgb::new(5, 5, 5);
        assert!(exceeds_threshold(c, c, 0));
    }

    #[test]
    fn threshold_is_strict() {
        let prev = Rgb::new(100, 100, 100);
        assert!(!exceeds_threshold(prev, Rgb::new(110, 100, 100), 10));
        assert!(exceeds_threshold(prev, Rgb::new(111, 100, 100), 10));
        assert!(exceeds_threshold(prev, Rgb::new(100, 100, 89), 10));
    }

    // ── process ──

    #[test]
    fn first_chromatic_frame_is_sent_with_frame_priority() {
        let mut p = ColorPipeline::new(15, 20);
        let data = solid(Rgb::new(200, 0, 0));
        let cmd = p.process(Strategy::Average, &frame(&data)).unwrap();
        assert_eq!(cmd, ColorCommand::new(Rgb::new(200, 0, 0), 200, 0));
        assert_eq!(p.last_sent(Strategy::Average), Rgb::new(200, 0, 0));
    }

    #[test]
    fn evaluate_leaves_memory_until_commit() {
        let mut p = ColorPipeline::new(15, 20);
        let data = solid(Rgb::new(200, 0, 0));
        let cmd = p.evaluate(Strategy::Average, &frame(&data)).unwrap();
        assert_eq!(p.last_sent(Strategy::Average), Rgb::BLACK);
        // Not committed, so the same frame is still new
        assert!(p.evaluate(Strategy::Average, &frame(&data)).is_some());
        p.commit(Strategy::Average, cmd.color);
        assert!(p.evaluate(Strategy::Average, &frame(&data)).is_none());
    }

    #[test]
    fn near_identical_frame_is_suppressed() {
        let mut p = ColorPipeline::new(15, 20);
        let a = solid(Rgb::new(200, 0, 0));
        let b = solid(Rgb::new(190, 10, 0));
        assert!(p.process(Strategy::Average, &frame(&a)).is_some());
        assert!(p.process(Strategy::Average, &frame(&b)).is_none());
        assert_eq!(p.last_sent(Strategy::Average), Rgb::new(200, 0, 0));
    }

    #[test]
    fn zero_threshold_resends_identical_frames() {
        let mut p = ColorPipeline::new(15, 0);
        let a = solid(Rgb::new(200, 0, 0));
        assert!(p.process(Strategy::Average, &frame(&a)).is_some());
        assert!(p.process(Strategy::Average, &frame(&a)).is_some());
    }

    #[test]
    fn gray_frame_sends_nothing_and_keeps_memory() {
        let mut p = ColorPipeline::new(15, 0);
        let red = solid(Rgb::new(200, 0, 0));
        let gray = solid(Rgb::new(128, 128, 128));
        p.process(Strategy::Average, &frame(&red));
        assert!(p.process(Strategy::Average, &frame(&gray)).is_none());
        assert_eq!(p.last_sent(Strategy::Average), Rgb::new(200, 0, 0));
    }

    #[test]
    fn strategies_keep_separate_memory() {
        let mut p = ColorPipeline::new(15, 20);
        let red = solid(Rgb::new(200, 0, 0));
        assert!(p.process(Strategy::Average, &frame(&red)).is_some());
        // Same color through the VU path is still new for that strategy
        assert!(p.process(Strategy::Edge, &frame(&red)).is_some());
        assert_eq!(p.last_sent(Strategy::Edge), Rgb::new(200, 0, 0));
    }

    #[test]
    fn memory_persists_across_strategy_switches() {
        let mut p = ColorPipeline::new(15, 20);
        let red = solid(Rgb::new(200, 0, 0));
        p.process(Strategy::Average, &frame(&red));
        p.process(Strategy::Edge, &frame(&solid(Rgb::new(0, 0, 200))));
        // Back to live: the old live memory still suppresses the same color
        assert!(p.process(Strategy::Average, &frame(&red)).is_none());
    }

    #[test]
    fn black_edge_frame_after_color_is_sent_once() {
        let mut p = ColorPipeline::new(15, 20);
        let green = solid(Rgb::new(0, 200, 0));
        let black = solid(Rgb::BLACK);
        assert!(p.process(Strategy::Edge, &frame(&green)).is_some());
        let cmd = p.process(Strategy::Edge, &frame(&black)).unwrap();
        assert_eq!(cmd.color, Rgb::BLACK);
        assert!(p.process(Strategy::Edge, &frame(&black)).is_none());
    }

    #[test]
    fn black_edge_frame_matches_initial_memory() {
        let mut p = ColorPipeline::new(15, 20);
        let black = solid(Rgb::BLACK);
        assert!(p.process(Strategy::Edge, &frame(&black)).is_none());
    }
}
