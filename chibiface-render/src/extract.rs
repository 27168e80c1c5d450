//! Palette extraction: derive the avatar's four material colors from the
//! masked face texture.

use tracing::debug;

use chibiface_core::Rgb;

use crate::buffer::PixelBuffer;

/// Baseline skin tone blended into the measured average so extreme or
/// washed-out sources still yield a plausible skin color.
pub const BASELINE_SKIN: Rgb = Rgb::from_hex(0xf5d5c7);
/// Fallback cloth color for near-grayscale sources.
pub const BASELINE_CLOTH: Rgb = Rgb::from_hex(0x7bb5ff);
/// Default accent before any extraction has run.
pub const BASELINE_ACCENT: Rgb = Rgb::from_hex(0x68f0c2);
/// Dark baseline blended into skin to produce the shadow color.
pub const BASELINE_SHADOW: Rgb = Rgb::from_hex(0x2a3246);

/// Pixels with alpha below this are outside the face region.
const ALPHA_VISIBLE_MIN: u8 = 8;
/// Minimum channel spread (`max - min`, out of 255) for a pixel to count as
/// a usable accent basis.
const SPREAD_MIN: u8 = 12;

/// The four representative colors applied to the avatar's materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePalette {
    pub skin: Rgb,
    pub cloth: Rgb,
    pub accent: Rgb,
    pub shadow: Rgb,
}

impl Default for FacePalette {
    fn default() -> Self {
        Self {
            skin: BASELINE_SKIN,
            cloth: BASELINE_CLOTH,
            accent: BASELINE_ACCENT,
            shadow: BASELINE_SHADOW,
        }
    }
}

/// Scan the face texture and derive a palette.
///
/// Skips near-transparent pixels; returns `None` when nothing is visible
/// (e.g. no image loaded yet), in which case the caller keeps the palette
/// it already has.
pub fn extract_palette(face: &PixelBuffer) -> Option<FacePalette> {
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    let mut best_spread = 0u8;
    let mut accent_basis: Option<Rgb> = None;

    for texel in face.pixels.chunks_exact(4) {
        if texel[3] < ALPHA_VISIBLE_MIN {
            continue;
        }
        let (r, g, b) = (texel[0], texel[1], texel[2]);
        sum[0] += r as u64;
        sum[1] += g as u64;
        sum[2] += b as u64;
        count += 1;

        // Channel spread is a cheap saturation proxy.
        let spread = r.max(g).max(b) - r.min(g).min(b);
        if spread > best_spread || accent_basis.is_none() {
            best_spread = spread;
            accent_basis = Some(Rgb::from_rgb8(r, g, b));
        }
    }

    if count == 0 {
        return None;
    }

    let avg = Rgb::new(
        (sum[0] / count) as f32 / 255.0,
        (sum[1] / count) as f32 / 255.0,
        (sum[2] / count) as f32 / 255.0,
    );

    let skin = avg.lerp(BASELINE_SKIN, 0.4);
    let cloth = match accent_basis {
        Some(basis) if best_spread > SPREAD_MIN => basis,
        _ => BASELINE_CLOTH,
    };
    let accent = cloth.offset_hsl(0.0, 0.05, 0.05);
    let shadow = skin.lerp(BASELINE_SHADOW, 0.6);

    debug!(
        visible = count,
        spread = best_spread,
        "Extracted face palette"
    );

    Some(FacePalette {
        skin,
        cloth,
        accent,
        shadow,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 2.0 / 255.0;

    fn assert_close(a: Rgb, b: Rgb) {
        assert!(
            (a.r - b.r).abs() < EPSILON
                && (a.g - b.g).abs() < EPSILON
                && (a.b - b.b).abs() < EPSILON,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn transparent_buffer_is_noop() {
        let face = PixelBuffer::new(16, 16);
        assert!(extract_palette(&face).is_none());
    }

    #[test]
    fn below_threshold_alpha_ignored() {
        let mut face = PixelBuffer::new(4, 4);
        face.fill([255, 0, 0, 7]); // just under the visibility threshold
        assert!(extract_palette(&face).is_none());
    }

    #[test]
    fn uniform_gray_falls_back_to_baseline_cloth() {
        let mut face = PixelBuffer::new(8, 8);
        face.fill([128, 128, 128, 255]);
        let p = extract_palette(&face).unwrap();

        // Spread 0 < threshold: cloth falls back, accent derives from it.
        assert_close(p.cloth, BASELINE_CLOTH);
        assert_close(p.accent, BASELINE_CLOTH.offset_hsl(0.0, 0.05, 0.05));

        // Skin = 60%/40% blend of baseline and the measured average.
        let gray = Rgb::from_rgb8(128, 128, 128);
        assert_close(p.skin, gray.lerp(BASELINE_SKIN, 0.4));
        assert_close(p.shadow, p.skin.lerp(BASELINE_SHADOW, 0.6));
    }

    #[test]
    fn uniform_red_blends_toward_baseline_skin() {
        let mut face = PixelBuffer::new(8, 8);
        face.fill([255, 0, 0, 255]);
        let p = extract_palette(&face).unwrap();

        let red = Rgb::from_rgb8(255, 0, 0);
        assert_close(p.skin, red.lerp(BASELINE_SKIN, 0.4));
        // Red is fully saturated: it becomes the cloth basis.
        assert_close(p.cloth, red);
    }

    #[test]
    fn most_saturated_pixel_wins_accent() {
        let mut face = PixelBuffer::new(4, 1);
        face.set_pixel(0, 0, [100, 100, 100, 255]);
        face.set_pixel(1, 0, [140, 120, 100, 255]); // spread 40
        face.set_pixel(2, 0, [0, 200, 50, 255]); // spread 200, the winner
        face.set_pixel(3, 0, [110, 100, 100, 255]);
        let p = extract_palette(&face).unwrap();
        assert_close(p.cloth, Rgb::from_rgb8(0, 200, 50));
    }

    #[test]
    fn barely_saturated_stays_on_baseline() {
        let mut face = PixelBuffer::new(4, 4);
        face.fill([128, 124, 120, 255]); // spread 8 <= threshold
        let p = extract_palette(&face).unwrap();
        assert_close(p.cloth, BASELINE_CLOTH);
    }
}
