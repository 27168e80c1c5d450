//! Tone adjustment: brightness/contrast/saturation from a single slider.
//!
//! The three adjustments compose into one affine color matrix so the
//! resample pass applies them in a single step per pixel, in the order
//! brightness → contrast → saturate (CSS filter semantics, Rec.709 luma).

/// Rec.709 luma weights used by the saturation matrix.
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// Multipliers derived from the tone slider value `t ∈ [-100, 100]`.
///
/// `t = 0` is exactly the identity transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneFilter {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl ToneFilter {
    pub const IDENTITY: ToneFilter = ToneFilter {
        brightness: 1.0,
        contrast: 1.0,
        saturation: 1.0,
    };

    /// Map a tone slider value to the three multipliers.
    pub fn from_tone(tone: f64) -> Self {
        let t = (tone.clamp(-100.0, 100.0) / 100.0) as f32;
        Self {
            brightness: 1.0 + 0.25 * t,
            contrast: 1.0 + 0.15 * t,
            saturation: 1.0 + 0.18 * t,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compose the three adjustments into a single affine matrix.
    pub fn color_matrix(&self) -> ColorMatrix {
        ColorMatrix::brightness(self.brightness)
            .then(ColorMatrix::contrast(self.contrast))
            .then(ColorMatrix::saturate(self.saturation))
    }
}

impl Default for ToneFilter {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A 3×3 matrix plus offset acting on normalized RGB.
///
/// `out = m · rgb + offset`, channels in `[0, 1]`, output clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    /// Row-major 3×3 coefficients.
    pub m: [[f32; 3]; 3],
    /// Per-channel additive offset.
    pub offset: [f32; 3],
}

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        offset: [0.0; 3],
    };

    /// Uniform channel scale.
    pub fn brightness(b: f32) -> Self {
        Self {
            m: [[b, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, b]],
            offset: [0.0; 3],
        }
    }

    /// Scale around mid-gray: `out = (in - 0.5) * c + 0.5`.
    pub fn contrast(c: f32) -> Self {
        let o = 0.5 * (1.0 - c);
        Self {
            m: [[c, 0.0, 0.0], [0.0, c, 0.0], [0.0, 0.0, c]],
            offset: [o, o, o],
        }
    }

    /// Blend each channel between luma (`s = 0`) and itself (`s = 1`);
    /// `s > 1` oversaturates.
    pub fn saturate(s: f32) -> Self {
        let inv = 1.0 - s;
        Self {
            m: [
                [LUMA_R * inv + s, LUMA_G * inv, LUMA_B * inv],
                [LUMA_R * inv, LUMA_G * inv + s, LUMA_B * inv],
                [LUMA_R * inv, LUMA_G * inv, LUMA_B * inv + s],
            ],
            offset: [0.0; 3],
        }
    }

    /// Compose so that `self` runs first, `after` second.
    pub fn then(self, after: ColorMatrix) -> ColorMatrix {
        let mut m = [[0.0f32; 3]; 3];
        let mut offset = [0.0f32; 3];
        for row in 0..3 {
            for col in 0..3 {
                m[row][col] = (0..3).map(|k| after.m[row][k] * self.m[k][col]).sum();
            }
            offset[row] = (0..3)
                .map(|k| after.m[row][k] * self.offset[k])
                .sum::<f32>()
                + after.offset[row];
        }
        ColorMatrix { m, offset }
    }

    /// Apply to a normalized RGB triple; output clamped to `[0, 1]`.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for (row, o) in out.iter_mut().enumerate() {
            *o = (self.m[row][0] * rgb[0]
                + self.m[row][1] * rgb[1]
                + self.m[row][2] * rgb[2]
                + self.offset[row])
                .clamp(0.0, 1.0);
        }
        out
    }
}
