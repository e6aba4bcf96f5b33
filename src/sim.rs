//! The simulation state and the canonical step sequence.
//!
//! [`Simulation`] bundles the particle pool with the oscillator bank and
//! the physics/display configuration, and defines what one simulation
//! step means: snapshot, force stencil, oscillator drive, move, optional
//! drift removal. The threaded engine fans the force/move/color work out
//! to its worker pool over disjoint ranges, but because the stencil reads
//! neighbor heights from the snapshot the outcome is identical to the
//! single-threaded [`Simulation::step`].
//!
//! Drive a `Simulation` directly when you want deterministic, synchronous
//! stepping with no threads involved:
//!
//! ```
//! use wavepool::sim::Simulation;
//! use wavepool::Vec2;
//!
//! let mut sim = Simulation::new(64);
//! sim.oscillators[0]
//!     .active(true)
//!     .anchors(Vec2::new(32.0, 32.0), Vec2::ZERO)
//!     .amplitude(4.0);
//! sim.oscillators[0].recompute(64);
//!
//! for _ in 0..100 {
//!     sim.step();
//! }
//! sim.paint();
//! assert_eq!(sim.tick, 100);
//! ```

use crate::absorber::{self, AbsorberConfig};
use crate::color::{self, RenderOptions};
use crate::kernel;
use crate::oscillator::{Oscillator, OSCILLATOR_SLOTS};
use crate::pool::Pool;

/// Complete simulation state: pool, sources, and configuration.
///
/// Fields are public for direct inspection and scripted setups; prefer
/// [`Simulation::resize`] over resizing the pool by hand so the loss
/// field and oscillator indices stay consistent.
#[derive(Clone, Debug)]
pub struct Simulation {
    pub pool: Pool,
    pub oscillators: [Oscillator; OSCILLATOR_SLOTS],
    /// Pool-wide base loss in `[0, 1]`.
    pub base_loss: f32,
    pub absorber: AbsorberConfig,
    pub visuals: RenderOptions,
    /// Remove DC drift after every step.
    pub shifting: bool,
    /// Completed force+move cycles since creation.
    pub tick: u64,
}

impl Simulation {
    pub fn new(size: usize) -> Self {
        let mut state = Self {
            pool: Pool::new(size),
            oscillators: Default::default(),
            base_loss: 0.0,
            absorber: AbsorberConfig::default(),
            visuals: RenderOptions::default(),
            shifting: true,
            tick: 0,
        };
        state.rebuild_loss();
        state
    }

    /// Rebuild the loss field from the base loss and absorber settings.
    pub fn rebuild_loss(&mut self) {
        let size = self.pool.size();
        absorber::build_loss(&mut self.pool.loss, size, self.base_loss, &self.absorber);
    }

    /// Resize the pool, rescaling oscillator anchors with it.
    pub fn resize(&mut self, new_size: usize) {
        let new_size = new_size.max(1);
        let ratio = new_size as f32 / self.pool.size() as f32;
        self.pool.resize(new_size);
        for osc in &mut self.oscillators {
            osc.rescale_anchors(ratio);
            osc.recompute(new_size);
        }
        self.absorber.sanitize(new_size);
        self.rebuild_loss();
    }

    /// Drive every active oscillator for the current tick.
    pub fn drive_oscillators(&mut self) {
        let size = self.pool.size();
        for osc in &self.oscillators {
            osc.drive(&mut self.pool.height, &mut self.pool.velocity, size, self.tick);
        }
    }

    /// Run one complete simulation step single-threaded.
    pub fn step(&mut self) {
        let size = self.pool.size();
        self.pool.snapshot_heights();
        kernel::step_range(
            &self.pool.prev,
            &self.pool.mass,
            &self.pool.loss,
            &self.pool.fixity,
            &mut self.pool.height,
            &mut self.pool.velocity,
            size,
            0,
        );
        self.drive_oscillators();
        kernel::advance_range(&mut self.pool.height, &self.pool.velocity);
        if self.shifting {
            kernel::shift_to_origin(&mut self.pool.height);
        }
        self.tick += 1;
    }

    /// Paint the whole frame buffer single-threaded.
    pub fn paint(&mut self) {
        color::colorize_range(
            &self.pool.height,
            &self.pool.mass,
            &self.pool.fixity,
            &mut self.pool.rgb,
            &self.visuals,
        );
    }
}
