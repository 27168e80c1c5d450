use crate::crop::FocusPoint;
use crate::error::CoreError;

/// Fraction of the preview canvas the fitted image may occupy.
const FIT_MARGIN: f64 = 0.9;

/// The affine mapping (uniform scale + offset) from source-image pixel
/// space to preview-canvas pixel space.
///
/// Recomputed on every preview redraw; its only consumer beyond drawing is
/// the inverse mapping that turns a click back into a normalized focus
/// point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewTransform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl PreviewTransform {
    /// Fit an image into a canvas with a 90% margin, centred, aspect
    /// preserved.
    pub fn fit(
        image_w: u32,
        image_h: u32,
        canvas_w: f64,
        canvas_h: f64,
    ) -> crate::Result<Self> {
        if image_w == 0 || image_h == 0 {
            return Err(CoreError::InvalidDimensions {
                width: image_w,
                height: image_h,
            });
        }
        let iw = image_w as f64;
        let ih = image_h as f64;
        let scale = (canvas_w / iw).min(canvas_h / ih) * FIT_MARGIN;
        Ok(Self {
            offset_x: (canvas_w - iw * scale) * 0.5,
            offset_y: (canvas_h - ih * scale) * 0.5,
            scale,
        })
    }

    /// Map a source-image point to preview-canvas coordinates.
    #[inline]
    pub fn image_to_canvas(&self, ix: f64, iy: f64) -> (f64, f64) {
        (
            self.offset_x + ix * self.scale,
            self.offset_y + iy * self.scale,
        )
    }

    /// Map a preview-canvas point back to source-image coordinates.
    #[inline]
    pub fn canvas_to_image(&self, px: f64, py: f64) -> (f64, f64) {
        (
            (px - self.offset_x) / self.scale,
            (py - self.offset_y) / self.scale,
        )
    }

    /// Invert a click into a normalized focus point, clamped to `[0, 1]`.
    pub fn click_to_focus(&self, px: f64, py: f64, image_w: u32, image_h: u32) -> FocusPoint {
        let (ix, iy) = self.canvas_to_image(px, py);
        FocusPoint::new(ix / image_w as f64, iy / image_h as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn fit_is_centred_with_margin() {
        let t = PreviewTransform::fit(100, 100, 400.0, 400.0).unwrap();
        assert!((t.scale - 3.6).abs() < EPSILON); // 400/100 * 0.9
        assert!((t.offset_x - 20.0).abs() < EPSILON);
        assert!((t.offset_y - 20.0).abs() < EPSILON);
    }

    #[test]
    fn fit_preserves_aspect() {
        // Wide image in a square canvas: width-limited scale.
        let t = PreviewTransform::fit(200, 100, 400.0, 400.0).unwrap();
        assert!((t.scale - 1.8).abs() < EPSILON);
        // Vertically centred.
        assert!((t.offset_y - (400.0 - 100.0 * 1.8) * 0.5).abs() < EPSILON);
    }

    #[test]
    fn click_round_trip() {
        let t = PreviewTransform::fit(640, 480, 500.0, 400.0).unwrap();
        for &(ix, iy) in &[(0.0, 0.0), (320.0, 240.0), (639.0, 479.0), (17.3, 401.9)] {
            let (px, py) = t.image_to_canvas(ix, iy);
            let (bx, by) = t.canvas_to_image(px, py);
            assert!((bx - ix).abs() < EPSILON);
            assert!((by - iy).abs() < EPSILON);
        }
    }

    #[test]
    fn click_to_focus_clamps_outside_image() {
        let t = PreviewTransform::fit(100, 100, 400.0, 400.0).unwrap();
        // Click in the canvas margin, left of the drawn image.
        let f = t.click_to_focus(0.0, 200.0, 100, 100);
        assert_eq!(f.x, 0.0);
        assert!(f.y > 0.0 && f.y < 1.0);
    }

    #[test]
    fn click_at_image_centre_focuses_centre() {
        let t = PreviewTransform::fit(640, 480, 500.0, 400.0).unwrap();
        let (px, py) = t.image_to_canvas(320.0, 240.0);
        let f = t.click_to_focus(px, py, 640, 480);
        assert!((f.x - 0.5).abs() < EPSILON);
        assert!((f.y - 0.5).abs() < EPSILON);
    }

    #[test]
    fn zero_image_rejected() {
        assert!(PreviewTransform::fit(0, 100, 400.0, 400.0).is_err());
    }
}
