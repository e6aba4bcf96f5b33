//! Absorbing boundary frame.
//!
//! Outgoing waves reflect off the grid edges unless the cells near the
//! boundary eat their energy first. The absorber builds a per-cell loss
//! field that ramps linearly from a high loss at the very edge down to
//! the pool-wide base loss at `thickness` cells in, which attenuates
//! waves gradually enough to suppress visible reflections.
//!
//! The field is rebuilt whenever the base loss, the absorber settings,
//! or the grid size change.

/// Absorbing-frame configuration.
///
/// `max_loss` is the loss applied at the outermost cells; it fades to the
/// base loss over `thickness` cells. Disabling the absorber (or setting
/// `max_loss` below the base loss) leaves the whole field at the base
/// loss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbsorberConfig {
    /// Whether the absorbing frame is applied at all.
    pub enabled: bool,
    /// Frame depth in cells, measured inward from each edge.
    pub thickness: usize,
    /// Loss at the outermost cells, in `[0, 1]`.
    pub max_loss: f32,
}

impl Default for AbsorberConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thickness: 25,
            max_loss: 0.3,
        }
    }
}

impl AbsorberConfig {
    /// Create an absorber configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the absorbing frame.
    pub fn enabled(&mut self, on: bool) -> &mut Self {
        self.enabled = on;
        self
    }

    /// Set the frame depth in cells. The engine additionally caps the
    /// depth at half the grid size when the configuration is applied.
    pub fn thickness(&mut self, cells: usize) -> &mut Self {
        self.thickness = cells;
        self
    }

    /// Set the edge loss; clamped to `[0, 1]`.
    pub fn max_loss(&mut self, loss: f32) -> &mut Self {
        self.max_loss = loss.clamp(0.0, 1.0);
        self
    }

    pub(crate) fn sanitize(&mut self, size: usize) {
        self.max_loss = self.max_loss.clamp(0.0, 1.0);
        self.thickness = self.thickness.min(size / 2);
    }
}

/// Fill the loss field from the base loss and the absorber configuration.
///
/// Four edge passes run in fixed order (top, bottom, left, right); the top
/// pass walks outside-in with a decreasing ramp, the other three walk
/// inside-out with an increasing ramp. Later passes overwrite the corner
/// strips, so corner cells carry the value of the last edge that touched
/// them. Downstream consumers probe corner values, so the order is part of
/// the contract.
pub fn build_loss(loss: &mut [f32], size: usize, base_loss: f32, cfg: &AbsorberConfig) {
    if loss.len() != size * size {
        return;
    }
    loss.fill(base_loss);

    let depth = cfg.thickness.min((size / 2).saturating_sub(1));
    if !cfg.enabled || cfg.max_loss < base_loss || depth == 0 {
        return;
    }
    let step = (cfg.max_loss - base_loss) / depth as f32;

    // Top edge, outside in.
    let mut cur = cfg.max_loss;
    for row in 0..=depth {
        loss[row * size..(row + 1) * size].fill(cur);
        cur -= step;
    }

    // Bottom edge, inside out.
    let mut cur = base_loss;
    for off in (0..=depth).rev() {
        let row = size - 1 - off;
        loss[row * size..(row + 1) * size].fill(cur);
        cur += step;
    }

    // Left edge, inside out.
    let mut cur = base_loss;
    for col in (0..=depth).rev() {
        for y in 0..size {
            loss[col + size * y] = cur;
        }
        cur += step;
    }

    // Right edge, inside out.
    let mut cur = base_loss;
    for off in (0..=depth).rev() {
        let col = size - 1 - off;
        for y in 0..size {
            loss[col + size * y] = cur;
        }
        cur += step;
    }
}
