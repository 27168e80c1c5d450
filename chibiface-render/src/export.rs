//! PNG export with embedded metadata (tEXt chunks).

use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

/// Metadata to embed in an exported PNG as tEXt chunks.
pub struct ExportMetadata {
    pub crop_scale: f64,
    pub v_offset: f64,
    pub tone: f64,
    pub focus_x: f64,
    pub focus_y: f64,
    pub width: u32,
    pub height: u32,
}

/// Write an RGBA pixel buffer as a PNG file with embedded crop metadata.
///
/// Uses the `png` crate directly (rather than `image`) to inject custom tEXt
/// chunks readable by exiftool, IrfanView, XnView, etc.
pub fn export_png(
    pixels: &[u8],
    width: u32,
    height: u32,
    path: &Path,
    metadata: &ExportMetadata,
) -> crate::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), "ChibiFace".to_string())?;
    encoder.add_text_chunk("Description".to_string(), build_description(metadata))?;
    for (key, value) in build_metadata_pairs(metadata) {
        encoder.add_text_chunk(key, value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(pixels)?;

    debug!("Exported PNG {}x{} to {}", width, height, path.display());
    Ok(())
}

fn build_description(meta: &ExportMetadata) -> String {
    format!(
        "Face texture - Scale: {}, Offset: {}, Tone: {}, Focus: ({}, {})",
        meta.crop_scale, meta.v_offset, meta.tone, meta.focus_x, meta.focus_y,
    )
}

fn build_metadata_pairs(meta: &ExportMetadata) -> Vec<(String, String)> {
    vec![
        ("ChibiFace.CropScale".into(), format!("{}", meta.crop_scale)),
        ("ChibiFace.VerticalOffset".into(), format!("{}", meta.v_offset)),
        ("ChibiFace.Tone".into(), format!("{}", meta.tone)),
        ("ChibiFace.FocusX".into(), format!("{}", meta.focus_x)),
        ("ChibiFace.FocusY".into(), format!("{}", meta.focus_y)),
        (
            "ChibiFace.Resolution".into(),
            format!("{}x{}", meta.width, meta.height),
        ),
    ]
}
