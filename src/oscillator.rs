//! Programmable wave sources.
//!
//! Each engine carries a fixed bank of nine oscillator slots. An active
//! oscillator overwrites the height of its target cells with a sine sample
//! once per simulation step and zeroes their velocity, turning them into
//! driven boundary cells.
//!
//! # Source Kinds
//!
//! | Kind | Behavior |
//! |------|----------|
//! | [`SourceKind::Point`] | Drives the single cell under anchor A |
//! | [`SourceKind::Line`] | Drives every cell along the segment A→B |
//! | [`SourceKind::MovingPoint`] | Drives one cell sweeping from A to B every `move_period` ticks |
//!
//! Point and line sources precompute their target indices; a moving point
//! derives its single live index from the current tick instead.
//!
//! # Example
//!
//! ```no_run
//! use wavepool::{Engine, SourceKind, Vec2};
//!
//! let engine = Engine::builder()
//!     .with_size(200)
//!     .with_oscillator(0, |o| {
//!         o.active(true)
//!             .source(SourceKind::Line)
//!             .anchors(Vec2::new(20.0, 100.0), Vec2::new(60.0, 100.0))
//!             .period(24)
//!             .amplitude(8.0);
//!     })
//!     .build()
//!     .expect("spawn engine threads");
//! # drop(engine);
//! ```

use glam::Vec2;
use std::f32::consts::TAU;

/// Number of oscillator slots per engine.
pub const OSCILLATOR_SLOTS: usize = 9;

/// Spacing of the floor-samples taken along a line source, in cells.
const LINE_STEP: f32 = 0.5;

/// Geometry of an oscillating source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// A single driven cell at anchor A.
    #[default]
    Point,
    /// A driven segment from anchor A to anchor B.
    Line,
    /// A single driven cell travelling from A to B, wrapping around
    /// every `move_period` ticks.
    MovingPoint,
}

/// One oscillator slot.
///
/// Fields can be edited directly or through the chainable setters; the
/// engine recomputes the slot's target indices after every edit.
#[derive(Clone, Debug, PartialEq)]
pub struct Oscillator {
    /// Whether this slot drives the surface.
    pub active: bool,
    /// Source geometry.
    pub kind: SourceKind,
    /// Oscillation period in ticks; at least 1.
    pub period: u32,
    /// Phase offset in degrees.
    pub phase: f32,
    /// Peak displacement written to driven cells.
    pub amplitude: f32,
    /// Ticks for a moving point to travel from A to B; at least 1.
    pub move_period: u32,
    /// First anchor, in cell coordinates.
    pub anchor_a: Vec2,
    /// Second anchor, in cell coordinates.
    pub anchor_b: Vec2,
    indices: Vec<usize>,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            active: false,
            kind: SourceKind::Point,
            period: 30,
            phase: 0.0,
            amplitude: 1.0,
            move_period: 800,
            anchor_a: Vec2::ZERO,
            anchor_b: Vec2::ZERO,
            indices: Vec::new(),
        }
    }
}

impl Oscillator {
    /// Create an inactive point source with default timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the slot.
    pub fn active(&mut self, on: bool) -> &mut Self {
        self.active = on;
        self
    }

    /// Set the source geometry.
    pub fn source(&mut self, kind: SourceKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Set the oscillation period in ticks. Zero is rejected and leaves
    /// the current period in place.
    pub fn period(&mut self, ticks: u32) -> &mut Self {
        if ticks >= 1 {
            self.period = ticks;
        }
        self
    }

    /// Set the phase offset in degrees.
    pub fn phase_degrees(&mut self, degrees: f32) -> &mut Self {
        self.phase = degrees;
        self
    }

    /// Set the peak displacement.
    pub fn amplitude(&mut self, amplitude: f32) -> &mut Self {
        self.amplitude = amplitude;
        self
    }

    /// Set the travel period of a moving point in ticks. Zero is rejected
    /// and leaves the current travel period in place.
    pub fn move_period(&mut self, ticks: u32) -> &mut Self {
        if ticks >= 1 {
            self.move_period = ticks;
        }
        self
    }

    /// Set both anchors, in cell coordinates.
    pub fn anchors(&mut self, a: Vec2, b: Vec2) -> &mut Self {
        self.anchor_a = a;
        self.anchor_b = b;
        self
    }

    /// The precomputed target indices. Empty for moving points, which
    /// derive their live index from the tick instead.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Restore the period invariants after direct field edits.
    pub(crate) fn sanitize(&mut self) {
        self.period = self.period.max(1);
        self.move_period = self.move_period.max(1);
    }

    /// Scale both anchors, used when the pool is resized.
    pub(crate) fn rescale_anchors(&mut self, ratio: f32) {
        self.anchor_a *= ratio;
        self.anchor_b *= ratio;
    }

    /// Recompute the target indices for a grid of the given edge length.
    ///
    /// Point sources target the cell under anchor A when it is in bounds.
    /// Line sources floor-sample the segment A→B at half-cell spacing,
    /// keeping in-bounds samples only; duplicate indices from flooring are
    /// kept. Zero-length segments and moving points yield no indices.
    pub fn recompute(&mut self, size: usize) {
        self.indices.clear();
        match self.kind {
            SourceKind::Point => {
                if let Some(i) = cell_index(self.anchor_a, size) {
                    self.indices.push(i);
                }
            }
            SourceKind::Line => {
                let delta = self.anchor_b - self.anchor_a;
                let length = delta.length();
                if length == 0.0 {
                    return;
                }
                let dir = delta / length;
                let mut travelled = 0.0f32;
                while travelled <= length {
                    if let Some(i) = cell_index(self.anchor_a + dir * travelled, size) {
                        self.indices.push(i);
                    }
                    travelled += LINE_STEP;
                }
            }
            SourceKind::MovingPoint => {}
        }
    }

    /// Displacement sample for the given tick.
    pub fn sample(&self, tick: u64) -> f32 {
        let cycle = (tick % self.period as u64) as f32 / self.period as f32;
        self.amplitude * (self.phase.to_radians() + TAU * cycle).sin()
    }

    /// Current cell of a moving point at the given tick, if in bounds.
    pub fn live_index(&self, size: usize, tick: u64) -> Option<usize> {
        let r = (tick % self.move_period as u64) as f32 / self.move_period as f32;
        cell_index(self.anchor_a.lerp(self.anchor_b, r), size)
    }

    /// Overwrite the driven cells for this tick: height takes the sine
    /// sample, velocity is zeroed.
    pub(crate) fn drive(&self, height: &mut [f32], velocity: &mut [f32], size: usize, tick: u64) {
        if !self.active {
            return;
        }
        let value = self.sample(tick);
        match self.kind {
            SourceKind::MovingPoint => {
                if let Some(i) = self.live_index(size, tick) {
                    height[i] = value;
                    velocity[i] = 0.0;
                }
            }
            _ => {
                for &i in &self.indices {
                    height[i] = value;
                    velocity[i] = 0.0;
                }
            }
        }
    }
}

/// Floor a point to its containing cell, if inside the grid.
fn cell_index(p: Vec2, size: usize) -> Option<usize> {
    let x = p.x.floor();
    let y = p.y.floor();
    if x >= 0.0 && y >= 0.0 && (x as usize) < size && (y as usize) < size {
        Some(x as usize + size * y as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Index Precomputation Tests ==========

    #[test]
    fn test_point_source_single_index() {
        let mut osc = Oscillator::new();
        osc.anchors(Vec2::new(3.7, 5.2), Vec2::ZERO);
        osc.recompute(16);
        assert_eq!(osc.indices(), &[3 + 16 * 5]);
    }

    #[test]
    fn test_point_source_out_of_bounds_is_empty() {
        let mut osc = Oscillator::new();
        osc.anchors(Vec2::new(-1.0, 3.0), Vec2::ZERO);
        osc.recompute(16);
        assert!(osc.indices().is_empty());

        osc.anchors(Vec2::new(16.0, 3.0), Vec2::ZERO);
        osc.recompute(16);
        assert!(osc.indices().is_empty());
    }

    #[test]
    fn test_line_source_floor_samples_with_duplicates() {
        let n = 16;
        let mut osc = Oscillator::new();
        osc.source(SourceKind::Line)
            .anchors(Vec2::new(10.0, 10.0), Vec2::new(13.0, 10.0));
        osc.recompute(n);
        let row = 10 * n;
        assert_eq!(
            osc.indices(),
            &[10 + row, 10 + row, 11 + row, 11 + row, 12 + row, 12 + row, 13 + row]
        );
    }

    #[test]
    fn test_line_source_clips_to_bounds() {
        let n = 8;
        let mut osc = Oscillator::new();
        osc.source(SourceKind::Line)
            .anchors(Vec2::new(6.0, 2.0), Vec2::new(10.0, 2.0));
        osc.recompute(n);
        assert!(osc.indices().iter().all(|&i| i < n * n));
        assert!(osc.indices().contains(&(6 + 2 * n)));
        assert!(osc.indices().contains(&(7 + 2 * n)));
    }

    #[test]
    fn test_zero_length_line_is_empty() {
        let mut osc = Oscillator::new();
        osc.source(SourceKind::Line)
            .anchors(Vec2::new(4.0, 4.0), Vec2::new(4.0, 4.0));
        osc.recompute(16);
        assert!(osc.indices().is_empty());
    }

    #[test]
    fn test_moving_point_precomputes_nothing() {
        let mut osc = Oscillator::new();
        osc.source(SourceKind::MovingPoint)
            .anchors(Vec2::ZERO, Vec2::new(15.0, 15.0));
        osc.recompute(16);
        assert!(osc.indices().is_empty());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut osc = Oscillator::new();
        osc.source(SourceKind::Line)
            .anchors(Vec2::new(1.0, 1.0), Vec2::new(9.5, 7.25));
        osc.recompute(16);
        let first = osc.indices().to_vec();
        osc.recompute(16);
        assert_eq!(osc.indices(), &first[..]);
    }

    // ========== Moving Point Tests ==========

    #[test]
    fn test_moving_point_sweeps_diagonal() {
        let n = 32;
        let mut osc = Oscillator::new();
        osc.source(SourceKind::MovingPoint)
            .anchors(Vec2::ZERO, Vec2::new((n - 1) as f32, (n - 1) as f32))
            .move_period(4);

        let expect = |r: f32| {
            let c = (r * (n - 1) as f32).floor() as usize;
            c * (n + 1)
        };
        assert_eq!(osc.live_index(n, 0), Some(0));
        assert_eq!(osc.live_index(n, 1), Some(expect(0.25)));
        assert_eq!(osc.live_index(n, 2), Some(expect(0.5)));
        assert_eq!(osc.live_index(n, 3), Some(expect(0.75)));
        // The sweep wraps instead of reaching B exactly.
        assert_eq!(osc.live_index(n, 4), Some(0));
    }

    // ========== Sampling Tests ==========

    #[test]
    fn test_sample_follows_sine_cycle() {
        let mut osc = Oscillator::new();
        osc.period(20).amplitude(2.0);
        assert!(osc.sample(0).abs() < 1e-6);
        assert!((osc.sample(5) - 2.0).abs() < 1e-5);
        assert!((osc.sample(15) + 2.0).abs() < 1e-5);
        assert!((osc.sample(20) - osc.sample(0)).abs() < 1e-6);
    }

    #[test]
    fn test_phase_offset_in_degrees() {
        let mut osc = Oscillator::new();
        osc.period(100).phase_degrees(90.0).amplitude(1.0);
        assert!((osc.sample(0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_drive_writes_sample_and_stills_velocity() {
        let n = 8;
        let mut osc = Oscillator::new();
        osc.active(true)
            .anchors(Vec2::new(3.0, 3.0), Vec2::ZERO)
            .period(4)
            .phase_degrees(90.0)
            .amplitude(5.0);
        osc.recompute(n);

        let mut height = vec![0.0; n * n];
        let mut velocity = vec![1.0; n * n];
        osc.drive(&mut height, &mut velocity, n, 0);
        let i = 3 + 3 * n;
        assert!((height[i] - 5.0).abs() < 1e-5);
        assert_eq!(velocity[i], 0.0);
        assert_eq!(velocity[i + 1], 1.0);
    }

    #[test]
    fn test_inactive_slot_does_not_drive() {
        let n = 4;
        let mut osc = Oscillator::new();
        osc.anchors(Vec2::new(1.0, 1.0), Vec2::ZERO).amplitude(5.0);
        osc.recompute(n);

        let mut height = vec![0.0; n * n];
        let mut velocity = vec![0.0; n * n];
        osc.drive(&mut height, &mut velocity, n, 5);
        assert!(height.iter().all(|&h| h == 0.0));
    }

    // ========== Configuration Tests ==========

    #[test]
    fn test_zero_periods_are_rejected() {
        let mut osc = Oscillator::new();
        osc.period(0).move_period(0);
        assert_eq!(osc.period, 30);
        assert_eq!(osc.move_period, 800);

        osc.period(1);
        assert_eq!(osc.period, 1);
    }

    #[test]
    fn test_sanitize_restores_period_floor() {
        let mut osc = Oscillator::new();
        osc.period = 0;
        osc.move_period = 0;
        osc.sanitize();
        assert_eq!(osc.period, 1);
        assert_eq!(osc.move_period, 1);
    }

    #[test]
    fn test_anchor_rescale_tracks_resize() {
        let mut osc = Oscillator::new();
        osc.anchors(Vec2::new(10.0, 20.0), Vec2::new(30.0, 40.0));
        osc.rescale_anchors(2.0);
        assert_eq!(osc.anchor_a, Vec2::new(20.0, 40.0));
        assert_eq!(osc.anchor_b, Vec2::new(60.0, 80.0));
    }
}
