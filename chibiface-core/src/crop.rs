use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CoreError;

/// Normalized focus point inside the source image.
///
/// `(0, 0)` is the top-left corner, `(1, 1)` the bottom-right. Defaults to
/// the image center and is replaced by preview clicks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    pub const CENTER: FocusPoint = FocusPoint { x: 0.5, y: 0.5 };

    /// Create a focus point, clamping both coordinates to `[0, 1]`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

impl Default for FocusPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// User-adjustable crop and tone parameters.
///
/// All three are bounded by the UI sliders; [`CropParams::clamped`] is the
/// second line of defense when values come from a preferences file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropParams {
    /// Zoom factor. The crop box side is `min(w, h) / scale`.
    pub scale: f64,

    /// Vertical offset in percent. Shifts the sampled box relative to the
    /// focus point, scaled by the crop size so the visual effect is
    /// consistent at any zoom.
    pub v_offset: f64,

    /// Signed tone percentage driving brightness/contrast/saturation.
    pub tone: f64,
}

impl CropParams {
    pub const SCALE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=3.0;
    pub const V_OFFSET_RANGE: std::ops::RangeInclusive<f64> = -40.0..=40.0;
    pub const TONE_RANGE: std::ops::RangeInclusive<f64> = -100.0..=100.0;

    /// Return a copy with every field clamped to its slider range.
    pub fn clamped(self) -> Self {
        Self {
            scale: self
                .scale
                .clamp(*Self::SCALE_RANGE.start(), *Self::SCALE_RANGE.end()),
            v_offset: self
                .v_offset
                .clamp(*Self::V_OFFSET_RANGE.start(), *Self::V_OFFSET_RANGE.end()),
            tone: self
                .tone
                .clamp(*Self::TONE_RANGE.start(), *Self::TONE_RANGE.end()),
        }
    }
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            scale: 1.4,
            v_offset: 0.0,
            tone: 0.0,
        }
    }
}

/// A square crop rectangle in source-image pixel space.
///
/// Always derived, never stored: recomputed from the focus point, crop
/// parameters and image dimensions on every parameter change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    /// Left edge in source pixels.
    pub x: f64,
    /// Top edge in source pixels.
    pub y: f64,
    /// Side length in source pixels.
    pub size: f64,
}

impl CropRect {
    /// Compute the crop rectangle for an image of `width`×`height`.
    ///
    /// The box is centred on the focus point (shifted vertically by the
    /// offset percentage) and clamped so it stays inside the image. When
    /// `scale < 1` makes the box larger than a dimension the box is pinned
    /// to the image origin on that axis; the resample pass handles the
    /// overflow. That is an accepted edge case, not an error.
    pub fn compute(
        width: u32,
        height: u32,
        params: &CropParams,
        focus: FocusPoint,
    ) -> crate::Result<CropRect> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        if !(params.scale > 0.0) || !params.scale.is_finite() {
            return Err(CoreError::InvalidCropScale(params.scale));
        }

        let w = width as f64;
        let h = height as f64;
        let size = w.min(h) / params.scale;

        let center_x = clamp_pin(focus.x * w, size * 0.5, w - size * 0.5);
        let y_offset = (params.v_offset / 100.0) * size * 0.6;
        let center_y = clamp_pin(focus.y * h + y_offset, size * 0.5, h - size * 0.5);

        let x = clamp_pin(center_x - size * 0.5, 0.0, (w - size).max(0.0));
        let y = clamp_pin(center_y - size * 0.5, 0.0, (h - size).max(0.0));

        trace!(x, y, size, "Computed crop rectangle");
        Ok(CropRect { x, y, size })
    }

    /// Center of the rectangle in source pixels.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.size * 0.5, self.y + self.size * 0.5)
    }

    /// Whether the rectangle lies fully inside an image of `width`×`height`.
    pub fn contained_in(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.size <= width as f64 + 1e-9
            && self.y + self.size <= height as f64 + 1e-9
    }
}

/// Clamp with possibly inverted bounds: when `lo > hi` (crop box larger than
/// the image) the result pins to `hi`, matching the pin-to-origin contract.
#[inline]
fn clamp_pin(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn rect(w: u32, h: u32, scale: f64, fx: f64, fy: f64, v_offset: f64) -> CropRect {
        let params = CropParams {
            scale,
            v_offset,
            tone: 0.0,
        };
        CropRect::compute(w, h, &params, FocusPoint::new(fx, fy)).unwrap()
    }

    #[test]
    fn centered_default() {
        let r = rect(200, 200, 2.0, 0.5, 0.5, 0.0);
        assert!((r.size - 100.0).abs() < EPSILON);
        let (cx, cy) = r.center();
        assert!((cx - 100.0).abs() < EPSILON);
        assert!((cy - 100.0).abs() < EPSILON);
    }

    #[test]
    fn always_contained_and_square() {
        // Sweep a grid of inputs; the box must never leave the image.
        for &(w, h) in &[(200u32, 200u32), (640, 480), (480, 640), (31, 977)] {
            for &s in &[1.0, 1.4, 2.0, 3.0] {
                for &fx in &[0.0, 0.25, 0.5, 1.0] {
                    for &fy in &[0.0, 0.5, 0.9, 1.0] {
                        for &p in &[-40.0, 0.0, 40.0] {
                            let r = rect(w, h, s, fx, fy, p);
                            assert!(
                                r.contained_in(w, h),
                                "{w}x{h} s={s} f=({fx},{fy}) p={p} -> {r:?}"
                            );
                            assert!((r.size - w.min(h) as f64 / s).abs() < EPSILON);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn size_shrinks_as_scale_grows() {
        let mut last = f64::INFINITY;
        for s in [1.0, 1.2, 1.5, 2.0, 2.5, 3.0] {
            let r = rect(640, 480, s, 0.5, 0.5, 0.0);
            assert!(r.size < last);
            last = r.size;
        }
    }

    #[test]
    fn extreme_focus_pins_to_edges() {
        let r = rect(200, 200, 2.0, 0.0, 0.0, 0.0);
        assert!((r.x - 0.0).abs() < EPSILON);
        assert!((r.y - 0.0).abs() < EPSILON);

        let r = rect(200, 200, 2.0, 1.0, 1.0, 0.0);
        assert!((r.x - 100.0).abs() < EPSILON);
        assert!((r.y - 100.0).abs() < EPSILON);
    }

    #[test]
    fn offset_scales_with_crop_size() {
        // +50% offset at crop size 100 shifts the centre down by 30px.
        let base = rect(400, 400, 4.0, 0.5, 0.5, 0.0);
        let moved = rect(400, 400, 4.0, 0.5, 0.5, 50.0);
        let shift = moved.center().1 - base.center().1;
        assert!((shift - 0.5 * base.size * 0.6).abs() < EPSILON);
    }

    #[test]
    fn oversize_box_pins_to_origin() {
        // scale < 1 produces a box bigger than the image; it must pin at 0.
        let r = rect(100, 50, 0.4, 0.5, 0.5, 0.0);
        assert!((r.size - 125.0).abs() < EPSILON);
        assert!((r.x - 0.0).abs() < EPSILON);
        assert!((r.y - 0.0).abs() < EPSILON);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let params = CropParams {
            scale: 0.0,
            ..CropParams::default()
        };
        assert!(CropRect::compute(100, 100, &params, FocusPoint::CENTER).is_err());
        assert!(
            CropRect::compute(0, 100, &CropParams::default(), FocusPoint::CENTER).is_err()
        );
    }

    #[test]
    fn params_clamp_to_slider_ranges() {
        let p = CropParams {
            scale: 99.0,
            v_offset: -500.0,
            tone: 101.0,
        }
        .clamped();
        assert_eq!(p.scale, 3.0);
        assert_eq!(p.v_offset, -40.0);
        assert_eq!(p.tone, 100.0);
    }

    #[test]
    fn focus_constructor_clamps() {
        let f = FocusPoint::new(-0.5, 1.5);
        assert_eq!(f.x, 0.0);
        assert_eq!(f.y, 1.0);
    }
}
