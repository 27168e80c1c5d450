//! Built-in sample portrait so the app is usable before any photo is loaded.
//!
//! Drawn procedurally (no bundled asset): a stylized face on a soft
//! gradient, with enough color variation to exercise the palette extractor.

use chibiface_render::PixelBuffer;

const SIDE: u32 = 512;

const SKIN: [u8; 3] = [0xe8, 0xb8, 0x94];
const HAIR: [u8; 3] = [0x4a, 0x32, 0x28];
const EYE: [u8; 3] = [0x26, 0x20, 0x1e];
const MOUTH: [u8; 3] = [0xc2, 0x5b, 0x54];
const SHIRT: [u8; 3] = [0x3f, 0x6f, 0xd1];

/// Render the sample portrait.
pub fn sample_portrait() -> PixelBuffer {
    let mut buf = PixelBuffer::new(SIDE, SIDE);
    for y in 0..SIDE {
        for x in 0..SIDE {
            let rgb = pixel_color(x as f32, y as f32);
            buf.set_pixel(x, y, [rgb[0], rgb[1], rgb[2], 255]);
        }
    }
    buf
}

fn pixel_color(x: f32, y: f32) -> [u8; 3] {
    // Painted back to front; the first region that contains the pixel wins.
    if in_ellipse(x, y, 200.0, 240.0, 14.0, 14.0) || in_ellipse(x, y, 312.0, 240.0, 14.0, 14.0) {
        return EYE;
    }
    if in_ellipse(x, y, 256.0, 316.0, 42.0, 15.0) {
        return MOUTH;
    }
    // Hair cap above the brow line.
    if y < 205.0 && in_ellipse(x, y, 256.0, 205.0, 170.0, 150.0) {
        return HAIR;
    }
    if in_ellipse(x, y, 256.0, 260.0, 150.0, 180.0) {
        return SKIN;
    }
    // Shoulders and shirt.
    if y > 430.0 && in_ellipse(x, y, 256.0, 560.0, 220.0, 140.0) {
        return SHIRT;
    }

    // Background gradient, top to bottom.
    let t = y / (SIDE - 1) as f32;
    [
        lerp8(0xcf, 0xa9, t),
        lerp8(0xdd, 0xb4, t),
        lerp8(0xf2, 0xd8, t),
    ]
}

fn in_ellipse(x: f32, y: f32, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
    let dx = (x - cx) / rx;
    let dy = (y - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

fn lerp8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_is_opaque_and_sized() {
        let buf = sample_portrait();
        assert_eq!(buf.width, SIDE);
        assert_eq!(buf.height, SIDE);
        assert!(buf.pixels.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn portrait_has_distinct_regions() {
        let buf = sample_portrait();
        // Cheek is skin, eye is dark, collar is the saturated shirt.
        assert_eq!(&buf.pixel(256, 280)[..3], &SKIN);
        assert_eq!(&buf.pixel(200, 240)[..3], &EYE);
        assert_eq!(&buf.pixel(256, 500)[..3], &SHIRT);
    }
}
