//! Frame colorization for the wave surface.
//!
//! The colorizer turns the raw particle arrays into an RGB bitmap. Two
//! display modes are available, selected by [`RenderOptions`]:
//!
//! - **Wave mode** (default): each cell is interpolated between a trough
//!   color and a crest color according to its displacement. Static cells
//!   are painted with a dedicated obstacle color.
//! - **Mass map**: each cell is painted with a six-band thermal palette
//!   according to its mass, ignoring displacement entirely. Useful for
//!   inspecting refraction media drawn into the mass field.
//!
//! Rendering options never affect the physics.
//!
//! # Example
//!
//! ```no_run
//! use wavepool::{Engine, Rgb};
//!
//! let engine = Engine::builder()
//!     .with_visuals(|v| {
//!         v.crest_color(Rgb::from_hex(0x00ccff))
//!             .trough_color(Rgb::from_hex(0x001020))
//!             .amplitude_multiplier(12.0);
//!     })
//!     .build()
//!     .expect("spawn engine threads");
//! # drop(engine);
//! ```

use bytemuck::{Pod, Zeroable};

/// A packed 24-bit RGB pixel.
///
/// The frame buffer is a contiguous slice of these; because the type is
/// plain-old-data it can be reinterpreted as raw `R,G,B` byte triples for
/// delivery to the host without copying.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);

    /// Create a pixel from individual channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a pixel from a `0xRRGGBB` integer.
    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    /// Per-channel integer average of two pixels.
    pub fn midpoint(self, other: Rgb) -> Rgb {
        Rgb {
            r: ((self.r as u16 + other.r as u16) / 2) as u8,
            g: ((self.g as u16 + other.g as u16) / 2) as u8,
            b: ((self.b as u16 + other.b as u16) / 2) as u8,
        }
    }

    /// Per-channel linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 * t + b as f32 * (1.0 - t)) as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

/// Display configuration for the colorizer.
///
/// Pure view state: changing any of these fields repaints the next frame
/// differently but leaves the simulation untouched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Color of fully raised cells.
    pub crest: Rgb,
    /// Color of fully depressed cells.
    pub trough: Rgb,
    /// Color of static (obstacle) cells in wave mode.
    pub static_color: Rgb,
    /// Paint every cell with pure crest/trough color by displacement sign.
    pub extreme_contrast: bool,
    /// Gain applied to displacement before interpolation.
    pub amplitude_multiplier: f32,
    /// Paint the mass field instead of the wave.
    pub mass_map: bool,
    /// Mass mapped to the cold end of the thermal palette.
    pub mass_low: f32,
    /// Mass mapped to the hot end of the thermal palette.
    pub mass_high: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            crest: Rgb::WHITE,
            trough: Rgb::BLACK,
            static_color: Rgb::YELLOW,
            extreme_contrast: false,
            amplitude_multiplier: 20.0,
            mass_map: false,
            mass_low: 1.0,
            mass_high: 5.0,
        }
    }
}

impl RenderOptions {
    /// Create render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the crest color.
    pub fn crest_color(&mut self, color: Rgb) -> &mut Self {
        self.crest = color;
        self
    }

    /// Set the trough color.
    pub fn trough_color(&mut self, color: Rgb) -> &mut Self {
        self.trough = color;
        self
    }

    /// Set the color used for static cells in wave mode.
    pub fn static_color(&mut self, color: Rgb) -> &mut Self {
        self.static_color = color;
        self
    }

    /// Paint cells with pure crest/trough colors by displacement sign.
    ///
    /// Cells at exactly zero displacement get the per-channel average of
    /// crest and trough.
    pub fn extreme_contrast(&mut self, on: bool) -> &mut Self {
        self.extreme_contrast = on;
        self
    }

    /// Set the displacement gain; negative values are floored at zero.
    pub fn amplitude_multiplier(&mut self, gain: f32) -> &mut Self {
        self.amplitude_multiplier = gain.max(0.0);
        self
    }

    /// Toggle mass-map mode.
    pub fn mass_map(&mut self, on: bool) -> &mut Self {
        self.mass_map = on;
        self
    }

    /// Set the mass range for mass-map mode; negative bounds are floored
    /// at zero. An empty or inverted range paints black.
    pub fn mass_range(&mut self, low: f32, high: f32) -> &mut Self {
        self.mass_low = low.max(0.0);
        self.mass_high = high.max(0.0);
        self
    }

    pub(crate) fn sanitize(&mut self) {
        self.amplitude_multiplier = self.amplitude_multiplier.max(0.0);
        self.mass_low = self.mass_low.max(0.0);
        self.mass_high = self.mass_high.max(0.0);
    }
}

/// Paint one contiguous run of cells into the matching run of pixels.
///
/// All slices are sub-slices over the same cell range, so the caller can
/// fan disjoint runs out to worker threads. Mismatched lengths are a no-op.
pub fn colorize_range(
    height: &[f32],
    mass: &[f32],
    fixity: &[f32],
    rgb: &mut [Rgb],
    opts: &RenderOptions,
) {
    if height.len() != rgb.len() || mass.len() != rgb.len() || fixity.len() != rgb.len() {
        return;
    }
    if opts.mass_map {
        let range = opts.mass_high - opts.mass_low;
        for (m, px) in mass.iter().zip(rgb.iter_mut()) {
            *px = if range <= 0.0 {
                Rgb::BLACK
            } else {
                thermal_band(((m.clamp(opts.mass_low, opts.mass_high) - opts.mass_low) / range
                    * (THERMAL_STEPS - 1) as f32) as i32)
            };
        }
    } else {
        for i in 0..rgb.len() {
            rgb[i] = if fixity[i] != 0.0 {
                opts.static_color
            } else {
                wave_pixel(height[i], opts)
            };
        }
    }
}

/// Number of distinct levels in the thermal palette (`128·5 − 4`).
const THERMAL_STEPS: i32 = 128 * 5 - 4;

fn wave_pixel(v: f32, opts: &RenderOptions) -> Rgb {
    if opts.extreme_contrast {
        if v > 0.0 {
            opts.crest
        } else if v < 0.0 {
            opts.trough
        } else {
            opts.crest.midpoint(opts.trough)
        }
    } else {
        let t = ((v * opts.amplitude_multiplier).clamp(-1.0, 1.0) + 1.0) / 2.0;
        opts.crest.lerp(opts.trough, t)
    }
}

/// Map a level in `[0, THERMAL_STEPS)` onto the six-band thermal palette
/// running black, blue, magenta, orange, yellow, white.
fn thermal_band(c: i32) -> Rgb {
    let low = (c & 127) as u8;
    if c < 128 {
        Rgb::new(0, 0, c as u8)
    } else if c < 256 {
        Rgb::new(low, 0, 127)
    } else if c < 384 {
        Rgb::new(128 + low, low, 127 - low)
    } else if c < 512 {
        Rgb::new(255, 128 + low, low)
    } else {
        Rgb::new(255, 255, 128 + low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint_one(h: f32, m: f32, fx: f32, opts: &RenderOptions) -> Rgb {
        let mut px = [Rgb::BLACK];
        colorize_range(&[h], &[m], &[fx], &mut px, opts);
        px[0]
    }

    // ========== Rgb Tests ==========

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex(0xff8001), Rgb::new(255, 128, 1));
        assert_eq!(Rgb::from_hex(0x000000), Rgb::BLACK);
        assert_eq!(Rgb::from_hex(0xffff00), Rgb::YELLOW);
    }

    #[test]
    fn test_rgb_midpoint() {
        assert_eq!(Rgb::WHITE.midpoint(Rgb::BLACK), Rgb::new(127, 127, 127));
        assert_eq!(Rgb::new(10, 20, 30).midpoint(Rgb::new(10, 20, 30)), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_rgb_lerp_endpoints() {
        let a = Rgb::new(200, 100, 50);
        let b = Rgb::new(10, 20, 30);
        assert_eq!(a.lerp(b, 1.0), a);
        assert_eq!(a.lerp(b, 0.0), b);
    }

    #[test]
    fn test_rgb_is_raw_bytes() {
        let px = [Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)];
        let bytes: &[u8] = bytemuck::cast_slice(&px);
        assert_eq!(bytes, &[1, 2, 3, 4, 5, 6]);
    }

    // ========== RenderOptions Tests ==========

    #[test]
    fn test_render_options_defaults() {
        let opts = RenderOptions::default();
        assert_eq!(opts.crest, Rgb::WHITE);
        assert_eq!(opts.trough, Rgb::BLACK);
        assert_eq!(opts.static_color, Rgb::YELLOW);
        assert!(!opts.extreme_contrast);
        assert!((opts.amplitude_multiplier - 20.0).abs() < 0.001);
        assert!(!opts.mass_map);
        assert!((opts.mass_low - 1.0).abs() < 0.001);
        assert!((opts.mass_high - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_render_options_clamping() {
        let mut opts = RenderOptions::new();
        opts.amplitude_multiplier(-3.0);
        assert_eq!(opts.amplitude_multiplier, 0.0);

        opts.mass_range(-1.0, -2.0);
        assert_eq!(opts.mass_low, 0.0);
        assert_eq!(opts.mass_high, 0.0);
    }

    // ========== Wave Mode Tests ==========

    #[test]
    fn test_flat_surface_paints_midpoint() {
        let opts = RenderOptions::default();
        // t = 0.5 lands between crest and trough.
        assert_eq!(paint_one(0.0, 1.0, 0.0, &opts), Rgb::new(127, 127, 127));

        let mut extreme = RenderOptions::default();
        extreme.extreme_contrast(true);
        assert_eq!(paint_one(0.0, 1.0, 0.0, &extreme), Rgb::WHITE.midpoint(Rgb::BLACK));
    }

    #[test]
    fn test_extreme_contrast_sign_split() {
        let mut opts = RenderOptions::default();
        opts.extreme_contrast(true);
        assert_eq!(paint_one(0.001, 1.0, 0.0, &opts), opts.crest);
        assert_eq!(paint_one(-0.001, 1.0, 0.0, &opts), opts.trough);
    }

    #[test]
    fn test_saturated_displacement_hits_endpoints() {
        let opts = RenderOptions::default();
        // 1.0 * 20 saturates the clamp on both sides.
        assert_eq!(paint_one(1.0, 1.0, 0.0, &opts), opts.crest);
        assert_eq!(paint_one(-1.0, 1.0, 0.0, &opts), opts.trough);
    }

    #[test]
    fn test_static_cells_get_static_color() {
        let opts = RenderOptions::default();
        assert_eq!(paint_one(0.7, 1.0, 1.0, &opts), opts.static_color);
    }

    // ========== Mass Map Tests ==========

    #[test]
    fn test_mass_map_overrides_fixity() {
        let mut opts = RenderOptions::default();
        opts.mass_map(true);
        // Static cells show their mass like everything else.
        assert_eq!(paint_one(0.0, 1.0, 1.0, &opts), paint_one(0.0, 1.0, 0.0, &opts));
    }

    #[test]
    fn test_mass_map_range_endpoints() {
        let mut opts = RenderOptions::default();
        opts.mass_map(true).mass_range(1.0, 5.0);
        // Bottom of the range is the cold end of the palette.
        assert_eq!(paint_one(0.0, 1.0, 0.0, &opts), Rgb::new(0, 0, 0));
        // Top of the range maps to level 635 in the hottest band.
        assert_eq!(paint_one(0.0, 5.0, 0.0, &opts), Rgb::new(255, 255, 128 + 123));
        // Out-of-range masses clamp to the endpoints.
        assert_eq!(paint_one(0.0, 99.0, 0.0, &opts), paint_one(0.0, 5.0, 0.0, &opts));
    }

    #[test]
    fn test_mass_map_degenerate_range_is_black() {
        let mut opts = RenderOptions::default();
        opts.mass_map(true).mass_range(5.0, 5.0);
        assert_eq!(paint_one(0.0, 3.0, 0.0, &opts), Rgb::BLACK);

        opts.mass_range(5.0, 2.0);
        assert_eq!(paint_one(0.0, 3.0, 0.0, &opts), Rgb::BLACK);
    }

    #[test]
    fn test_thermal_band_boundaries() {
        assert_eq!(thermal_band(0), Rgb::new(0, 0, 0));
        assert_eq!(thermal_band(127), Rgb::new(0, 0, 127));
        assert_eq!(thermal_band(128), Rgb::new(0, 0, 127));
        assert_eq!(thermal_band(255), Rgb::new(127, 0, 127));
        assert_eq!(thermal_band(256), Rgb::new(128, 0, 127));
        assert_eq!(thermal_band(383), Rgb::new(255, 127, 0));
        assert_eq!(thermal_band(384), Rgb::new(255, 128, 0));
        assert_eq!(thermal_band(511), Rgb::new(255, 255, 127));
        assert_eq!(thermal_band(512), Rgb::new(255, 255, 128));
        assert_eq!(thermal_band(635), Rgb::new(255, 255, 251));
    }

    #[test]
    fn test_colorize_range_length_mismatch_is_noop() {
        let mut px = [Rgb::new(9, 9, 9); 2];
        colorize_range(&[0.0], &[1.0], &[0.0], &mut px, &RenderOptions::default());
        assert_eq!(px, [Rgb::new(9, 9, 9); 2]);
    }
}
