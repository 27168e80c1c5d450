//! The face compositor: crop rectangle → tone-filtered, soft-masked texture.
//!
//! One pass per recompute: the persistent output buffer is cleared, the
//! crop rectangle is bilinearly resampled into it with the tone color
//! matrix applied per texel, and a radial alpha mask fades the square into
//! a soft circular face cutout.

use rayon::prelude::*;
use tracing::debug;

use chibiface_core::{CropRect, ToneFilter};

use crate::buffer::PixelBuffer;
use crate::error::RenderError;

/// Output texture side length in texels.
pub const FACE_TEXTURE_SIZE: u32 = 512;

/// Radial mask: fully opaque inside this fraction of the canvas size.
const MASK_INNER: f64 = 0.35;
/// Radial mask: fully transparent beyond this fraction of the canvas size.
const MASK_OUTER: f64 = 0.52;
/// Mid gradient stop: at 70% of the inner→outer span alpha is still 90%.
const MASK_MID_POS: f32 = 0.7;
const MASK_MID_ALPHA: f32 = 0.9;

/// Renders the cropped, tone-adjusted face region into a persistent square
/// texture. The same buffer is reused on every call and fully overwritten,
/// so no state accumulates across recomputes.
pub struct FaceCompositor {
    buffer: PixelBuffer,
}

impl FaceCompositor {
    pub fn new() -> Self {
        Self {
            buffer: PixelBuffer::new(FACE_TEXTURE_SIZE, FACE_TEXTURE_SIZE),
        }
    }

    /// A compositor with a non-default texture size (tests, thumbnails).
    pub fn with_size(size: u32) -> crate::Result<Self> {
        if size == 0 {
            return Err(RenderError::InvalidDimensions {
                width: size,
                height: size,
            });
        }
        Ok(Self {
            buffer: PixelBuffer::new(size, size),
        })
    }

    pub fn size(&self) -> u32 {
        self.buffer.width
    }

    /// The current face texture (valid after the first [`compose`](Self::compose)).
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Rebuild the face texture from scratch.
    ///
    /// Resamples `rect` out of `source` (bilinear, texel centres aligned),
    /// applies the tone matrix in the same pass, then multiplies alpha by
    /// the radial mask. Color channels are untouched by the mask, matching
    /// `destination-in` compositing.
    pub fn compose(
        &mut self,
        source: &PixelBuffer,
        rect: CropRect,
        tone: ToneFilter,
    ) -> crate::Result<()> {
        if source.width == 0 || source.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: source.width,
                height: source.height,
            });
        }

        self.buffer.clear();

        let size = self.buffer.width;
        let sizef = size as f64;
        let step = rect.size / sizef;
        let matrix = tone.color_matrix();

        let half = sizef * 0.5;
        let r_inner = (sizef * MASK_INNER) as f32;
        let r_outer = (sizef * MASK_OUTER) as f32;

        self.buffer
            .pixels
            .par_chunks_mut(size as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                let dy = (y as f64 + 0.5) - half;
                // Source y for this output row (texel-centre aligned).
                let sy = rect.y + (y as f64 + 0.5) * step - 0.5;
                for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                    let sx = rect.x + (x as f64 + 0.5) * step - 0.5;
                    let [r, g, b, a] = source.sample_bilinear(sx, sy);
                    let rgb = matrix.apply([r / 255.0, g / 255.0, b / 255.0]);

                    let dx = (x as f64 + 0.5) - half;
                    let dist = ((dx * dx + dy * dy) as f32).sqrt();
                    let alpha = a / 255.0 * mask_alpha(dist, r_inner, r_outer);

                    texel[0] = (rgb[0] * 255.0).round() as u8;
                    texel[1] = (rgb[1] * 255.0).round() as u8;
                    texel[2] = (rgb[2] * 255.0).round() as u8;
                    texel[3] = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            });

        debug!(
            crop_x = rect.x,
            crop_y = rect.y,
            crop_size = rect.size,
            "Composed face texture"
        );
        Ok(())
    }
}

impl Default for FaceCompositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Radial mask weight at `dist` pixels from the canvas centre.
///
/// 1.0 inside `r_inner`, 0.0 beyond `r_outer`, piecewise linear between:
/// still 90% at 70% of the span (the gradient's middle stop).
fn mask_alpha(dist: f32, r_inner: f32, r_outer: f32) -> f32 {
    if dist <= r_inner {
        return 1.0;
    }
    if dist >= r_outer {
        return 0.0;
    }
    let t = (dist - r_inner) / (r_outer - r_inner);
    if t <= MASK_MID_POS {
        1.0 - (t / MASK_MID_POS) * (1.0 - MASK_MID_ALPHA)
    } else {
        MASK_MID_ALPHA * (1.0 - (t - MASK_MID_POS) / (1.0 - MASK_MID_POS))
    }
}
