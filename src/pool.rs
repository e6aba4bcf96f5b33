//! Particle pool: the square grid of wave particles and its frame buffer.
//!
//! The pool stores one `f32` per cell for each physical attribute, in
//! parallel arrays indexed by `x + size·y` (row-major). Alongside the
//! physics arrays it owns the RGB frame buffer the colorizer paints into
//! and a previous-height scratch buffer the stencil reads neighbor values
//! from, which keeps concurrent grid partitions write-exclusive.
//!
//! | Attribute | Meaning |
//! |-----------|---------|
//! | Height    | Vertical displacement of the cell |
//! | Velocity  | Vertical velocity of the cell |
//! | Mass      | Inertia; higher mass slows wave propagation |
//! | Loss      | Per-step energy loss fraction in `[0, 1]` |
//! | Fixity    | Non-zero marks the cell as an immovable obstacle |

use crate::color::Rgb;

/// Default grid edge length.
pub const DEFAULT_SIZE: usize = 300;

/// Selects one of the per-particle attribute arrays for raw access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleAttribute {
    Height,
    Velocity,
    Loss,
    Mass,
    Fixity,
}

/// The square grid of wave particles.
#[derive(Clone, Debug)]
pub struct Pool {
    size: usize,
    pub(crate) height: Vec<f32>,
    pub(crate) velocity: Vec<f32>,
    pub(crate) mass: Vec<f32>,
    pub(crate) loss: Vec<f32>,
    pub(crate) fixity: Vec<f32>,
    pub(crate) prev: Vec<f32>,
    pub(crate) rgb: Vec<Rgb>,
}

impl Pool {
    /// Create a flat pool of `size × size` particles.
    ///
    /// Heights and velocities start at zero, mass at 1.0, and every cell
    /// is dynamic. Sizes below 1 are raised to 1.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let cells = size * size;
        Self {
            size,
            height: vec![0.0; cells],
            velocity: vec![0.0; cells],
            mass: vec![1.0; cells],
            loss: vec![0.0; cells],
            fixity: vec![0.0; cells],
            prev: vec![0.0; cells],
            rgb: vec![Rgb::BLACK; cells],
        }
    }

    /// Grid edge length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (`size²`).
    #[inline]
    pub fn cells(&self) -> usize {
        self.size * self.size
    }

    /// Row-major index of the cell at `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        x + self.size * y
    }

    /// Resize the grid, keeping the medium but resetting the wave.
    ///
    /// Mass and fixity are rescaled with nearest-neighbor sampling so
    /// obstacles and refraction media keep their shape; height and
    /// velocity are zeroed. Resizing to the current size leaves mass and
    /// fixity bit-identical. The loss field is left for the caller to
    /// rebuild from its absorber configuration.
    pub fn resize(&mut self, new_size: usize) {
        let new_size = new_size.max(1);
        let old_size = self.size;
        let cells = new_size * new_size;

        let mut mass = vec![1.0; cells];
        let mut fixity = vec![0.0; cells];
        for y in 0..new_size {
            let sy = y * old_size / new_size;
            for x in 0..new_size {
                let sx = x * old_size / new_size;
                mass[x + new_size * y] = self.mass[sx + old_size * sy];
                fixity[x + new_size * y] = self.fixity[sx + old_size * sy];
            }
        }

        self.size = new_size;
        self.mass = mass;
        self.fixity = fixity;
        self.height = vec![0.0; cells];
        self.velocity = vec![0.0; cells];
        self.loss = vec![0.0; cells];
        self.prev = vec![0.0; cells];
        self.rgb = vec![Rgb::BLACK; cells];
    }

    /// Copy the current heights into the scratch buffer the stencil reads
    /// neighbor values from. Called once before every force phase.
    pub(crate) fn snapshot_heights(&mut self) {
        self.prev.copy_from_slice(&self.height);
    }

    /// Shared view of one attribute array.
    pub fn attribute(&self, attr: ParticleAttribute) -> &[f32] {
        match attr {
            ParticleAttribute::Height => &self.height,
            ParticleAttribute::Velocity => &self.velocity,
            ParticleAttribute::Loss => &self.loss,
            ParticleAttribute::Mass => &self.mass,
            ParticleAttribute::Fixity => &self.fixity,
        }
    }

    /// Exclusive view of one attribute array.
    ///
    /// Writes take effect on the next simulation step. Values are taken
    /// as-is; callers are expected to keep loss within `[0, 1]` and mass
    /// strictly positive.
    pub fn attribute_mut(&mut self, attr: ParticleAttribute) -> &mut [f32] {
        match attr {
            ParticleAttribute::Height => &mut self.height,
            ParticleAttribute::Velocity => &mut self.velocity,
            ParticleAttribute::Loss => &mut self.loss,
            ParticleAttribute::Mass => &mut self.mass,
            ParticleAttribute::Fixity => &mut self.fixity,
        }
    }

    /// The frame buffer as raw `R,G,B` byte triples, row-major.
    pub fn frame(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rgb)
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}
