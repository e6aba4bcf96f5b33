//! # wavepool - a multithreaded shallow-wave surface simulator
//!
//! A square grid of particles evolves under a discrete wave equation with
//! per-cell mass and loss, bounded by an absorbing frame, driven by up to
//! nine programmable oscillators, and periodically rendered to an RGB
//! bitmap. A conductor thread paces simulation steps and frame paints
//! independently and fans the heavy phases out to a pool of worker
//! threads over disjoint grid ranges.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wavepool::{Engine, Vec2};
//!
//! let engine = Engine::builder()
//!     .with_size(300)
//!     .with_threads(4)
//!     .with_ips(100)
//!     .with_fps(25)
//!     .with_oscillator(0, |o| {
//!         o.active(true)
//!             .anchors(Vec2::new(150.0, 150.0), Vec2::ZERO)
//!             .period(30)
//!             .amplitude(6.0);
//!     })
//!     .on_frame(|rgb| {
//!         // rgb is the finished frame: R,G,B byte triples, row-major.
//!         let _ = rgb;
//!     })
//!     .build()
//!     .expect("spawn engine threads");
//!
//! engine.start();
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! Every cell of the grid carries five attributes: height, velocity,
//! mass, loss, and fixity. Mass slows wave propagation (refraction
//! media), loss drains energy (the absorbing boundary is just a loss
//! ramp), and non-zero fixity freezes a cell into an obstacle. The raw
//! arrays are reachable through [`Engine::lock`], which pauses the
//! conductor for the lifetime of the guard:
//!
//! ```no_run
//! use wavepool::{Engine, ParticleAttribute};
//!
//! let engine = Engine::builder().with_size(64).build().unwrap();
//! {
//!     let mut access = engine.lock();
//!     let center = access.index(32, 32);
//!     access.attribute_mut(ParticleAttribute::Height)[center] = 1.0;
//! } // the guard drops, the conductor resumes
//! engine.start();
//! ```
//!
//! ### Oscillators
//!
//! Nine slots of programmable sources: a fixed point, a line segment, or
//! a point sweeping between two anchors. An active oscillator overwrites
//! the height of its cells with a sine sample every step.
//!
//! ### Scheduling
//!
//! The conductor rate-limits iterations (IPS) and frame paints (FPS)
//! independently; either can be unlimited. Each simulation step runs as
//! a force phase and a move phase separated by a barrier across all
//! workers, so no worker ever observes a half-updated field.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`Pool`] | The particle arrays and the frame buffer |
//! | [`Oscillator`] | One programmable source slot |
//! | [`AbsorberConfig`] | Boundary loss ramp |
//! | [`RenderOptions`] | Colorization settings |
//! | [`Simulation`] | Deterministic single-threaded core |
//! | [`Engine`] | Conductor thread, worker pool, public surface |

pub mod absorber;
pub mod color;
mod engine;
mod error;
pub mod kernel;
pub mod oscillator;
pub mod pacing;
pub mod pool;
pub mod sim;
mod workers;

pub use absorber::AbsorberConfig;
pub use color::{Rgb, RenderOptions};
pub use engine::{Engine, EngineBuilder, FrameCallback, PoolAccess};
pub use error::EngineError;
pub use glam::Vec2;
pub use oscillator::{Oscillator, SourceKind, OSCILLATOR_SLOTS};
pub use pool::{ParticleAttribute, Pool};
pub use sim::Simulation;

/// Convenient re-exports for common usage.
///
/// ```no_run
/// use wavepool::prelude::*;
///
/// let engine = Engine::builder().with_size(128).build().unwrap();
/// engine.start();
/// ```
pub mod prelude {
    pub use crate::absorber::AbsorberConfig;
    pub use crate::color::{Rgb, RenderOptions};
    pub use crate::engine::{Engine, EngineBuilder, PoolAccess};
    pub use crate::error::EngineError;
    pub use crate::oscillator::{Oscillator, SourceKind};
    pub use crate::pool::ParticleAttribute;
    pub use crate::Vec2;
}
