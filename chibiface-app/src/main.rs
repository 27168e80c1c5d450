//! ChibiFace: turn a photo into a face texture and wear it on an animated
//! chibi avatar.
//!
//! The UI is a side panel (source preview, crop sliders, face texture,
//! export) next to a central 3D viewport with an orbit camera. Image
//! decoding runs on a background thread; everything else is recomputed
//! synchronously because a single compose pass is cheap.

mod app_dir;
mod preferences;
mod sample;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use eframe::egui;
use tracing::{error, info};

use chibiface_core::{CropParams, CropRect, FocusPoint, PreviewTransform, Rgb, ToneFilter};
use chibiface_render::{
    export_png, extract_palette, pose_at, render_scene, ExportMetadata, FaceCompositor,
    MaterialSet, OrbitCamera, PixelBuffer,
};

use preferences::AppPreferences;

/// Sources larger than this are downscaled on decode to keep the compose
/// and preview passes fast.
const MAX_SOURCE_DIM: u32 = 2048;

/// Longest side of the CPU-rendered viewport; the texture is stretched to
/// the panel so dragging stays responsive on large windows.
const SCENE_MAX_DIM: u32 = 480;

const PREVIEW_HEIGHT: f32 = 240.0;
const FACE_THUMB_SIDE: f32 = 120.0;

// ---------------------------------------------------------------------------
// Background decode worker
// ---------------------------------------------------------------------------

enum DecodeJob {
    Path(u64, PathBuf),
    Bytes(u64, String, Vec<u8>),
}

struct DecodeResult {
    id: u64,
    name: String,
    outcome: Result<PixelBuffer, String>,
}

/// Long-running decode worker. Receives jobs via `rx`, sends decoded
/// buffers back via `tx`, and calls `ctx.request_repaint()` so the UI wakes
/// up to display them.
fn decode_worker(ctx: egui::Context, rx: mpsc::Receiver<DecodeJob>, tx: mpsc::Sender<DecodeResult>) {
    while let Ok(job) = rx.recv() {
        let (id, name, outcome) = match job {
            DecodeJob::Path(id, path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                (id, name, decode_path(&path))
            }
            DecodeJob::Bytes(id, name, bytes) => (id, name, decode_bytes(&bytes)),
        };
        if tx.send(DecodeResult { id, name, outcome }).is_err() {
            return; // Channel closed.
        }
        ctx.request_repaint();
    }
}

fn decode_path(path: &Path) -> Result<PixelBuffer, String> {
    let img = image::open(path).map_err(|e| format!("Failed to decode {}: {e}", path.display()))?;
    dynamic_to_buffer(img)
}

fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer, String> {
    let img =
        image::load_from_memory(bytes).map_err(|e| format!("Failed to decode dropped data: {e}"))?;
    dynamic_to_buffer(img)
}

fn dynamic_to_buffer(img: image::DynamicImage) -> Result<PixelBuffer, String> {
    let img = if img.width().max(img.height()) > MAX_SOURCE_DIM {
        img.resize(
            MAX_SOURCE_DIM,
            MAX_SOURCE_DIM,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    PixelBuffer::from_pixels(w, h, rgba.into_raw()).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

struct SourceImage {
    buffer: PixelBuffer,
    name: String,
}

struct ChibiFaceApp {
    preferences: AppPreferences,

    source: Option<SourceImage>,
    params: CropParams,
    focus: FocusPoint,
    crop_rect: Option<CropRect>,

    compositor: FaceCompositor,
    materials: MaterialSet,
    camera: OrbitCamera,
    scene: PixelBuffer,
    start: Instant,

    status: String,

    tx_decode: mpsc::Sender<DecodeJob>,
    rx_decode: mpsc::Receiver<DecodeResult>,
    /// Monotonic job id; stale decode results are dropped on arrival.
    decode_id: u64,
    decoding: bool,

    preview_texture: Option<egui::TextureHandle>,
    face_texture: Option<egui::TextureHandle>,
    scene_texture: Option<egui::TextureHandle>,
}

impl ChibiFaceApp {
    fn new(egui_ctx: &egui::Context, preferences: AppPreferences) -> Self {
        let (tx_job, rx_job) = mpsc::channel();
        let (tx_result, rx_result) = mpsc::channel();

        let worker_ctx = egui_ctx.clone();
        thread::spawn(move || {
            decode_worker(worker_ctx, rx_job, tx_result);
        });

        let params = if preferences.restore_last_params {
            preferences
                .last_params
                .map(CropParams::clamped)
                .unwrap_or_default()
        } else {
            CropParams::default()
        };

        let mut app = Self {
            preferences,
            source: None,
            params,
            focus: FocusPoint::CENTER,
            crop_rect: None,
            compositor: FaceCompositor::new(),
            materials: MaterialSet::default(),
            camera: OrbitCamera::default(),
            scene: PixelBuffer::new(1, 1),
            start: Instant::now(),
            status: String::new(),
            tx_decode: tx_job,
            rx_decode: rx_result,
            decode_id: 0,
            decoding: false,
            preview_texture: None,
            face_texture: None,
            scene_texture: None,
        };
        app.load_sample();
        app
    }

    // -- Source management --------------------------------------------------

    fn load_sample(&mut self) {
        self.set_source(sample::sample_portrait(), "sample portrait".to_string());
    }

    fn set_source(&mut self, buffer: PixelBuffer, name: String) {
        let (w, h) = (buffer.width, buffer.height);
        self.source = Some(SourceImage { buffer, name });
        self.focus = FocusPoint::CENTER;
        self.preview_texture = None;
        self.recompute_face();
        if let Some(src) = &self.source {
            self.status = format!("{} ({w}\u{d7}{h})", src.name);
        }
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.crop_rect = None;
        self.focus = FocusPoint::CENTER;
        self.compositor = FaceCompositor::new();
        self.materials = MaterialSet::default();
        self.preview_texture = None;
        self.face_texture = None;
        self.status = "Cleared".to_string();
    }

    fn open_image_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
            .pick_file();
        if let Some(path) = picked {
            self.request_decode(DecodeJob::Path(0, path));
        }
    }

    fn request_decode(&mut self, job: DecodeJob) {
        self.decode_id += 1;
        let job = match job {
            DecodeJob::Path(_, path) => {
                self.status = format!("Loading {}\u{2026}", path.display());
                DecodeJob::Path(self.decode_id, path)
            }
            DecodeJob::Bytes(_, name, bytes) => {
                self.status = format!("Loading {name}\u{2026}");
                DecodeJob::Bytes(self.decode_id, name, bytes)
            }
        };
        self.decoding = true;
        if self.tx_decode.send(job).is_err() {
            error!("Decode worker is gone");
            self.decoding = false;
            self.status = "Image loading is unavailable".to_string();
        }
    }

    fn poll_decode(&mut self) {
        while let Ok(result) = self.rx_decode.try_recv() {
            if result.id != self.decode_id {
                continue; // Superseded by a newer load.
            }
            self.decoding = false;
            self.apply_decode_outcome(result);
        }
    }

    fn apply_decode_outcome(&mut self, result: DecodeResult) {
        match result.outcome {
            Ok(buffer) => {
                info!(
                    name = %result.name,
                    width = buffer.width,
                    height = buffer.height,
                    "Loaded source image"
                );
                self.set_source(buffer, result.name);
            }
            Err(e) => {
                // A failed decode falls back to the placeholder portrait;
                // crop parameters are untouched.
                error!("{e}");
                self.load_sample();
                self.status = e;
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // Only the first file of a multi-drop is loaded.
        if let Some(file) = dropped.into_iter().next() {
            if let Some(path) = file.path {
                self.request_decode(DecodeJob::Path(0, path));
            } else if let Some(bytes) = file.bytes {
                self.request_decode(DecodeJob::Bytes(0, file.name.clone(), bytes.to_vec()));
            }
        }
    }

    // -- Face pipeline -------------------------------------------------------

    /// Recompute the crop rectangle, face texture, and avatar palette from
    /// the current source and parameters.
    fn recompute_face(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        self.params = self.params.clamped();

        let rect = match CropRect::compute(
            source.buffer.width,
            source.buffer.height,
            &self.params,
            self.focus,
        ) {
            Ok(rect) => rect,
            Err(e) => {
                error!("Crop failed: {e}");
                return;
            }
        };

        let tone = ToneFilter::from_tone(self.params.tone);
        if let Err(e) = self.compositor.compose(&source.buffer, rect, tone) {
            error!("Compose failed: {e}");
            return;
        }

        // No visible pixels keeps whatever palette was active.
        if let Some(palette) = extract_palette(self.compositor.buffer()) {
            self.materials.apply_palette(&palette);
        }

        self.crop_rect = Some(rect);
        self.face_texture = None;
    }

    fn export_face(&mut self) {
        if self.source.is_none() {
            self.status = "Nothing to export".to_string();
            return;
        }
        let mut dialog = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name("chibiface_texture.png");
        if !self.preferences.export_dir.is_empty() {
            dialog = dialog.set_directory(&self.preferences.export_dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };

        let buffer = self.compositor.buffer();
        let metadata = ExportMetadata {
            crop_scale: self.params.scale,
            v_offset: self.params.v_offset,
            tone: self.params.tone,
            focus_x: self.focus.x,
            focus_y: self.focus.y,
            width: buffer.width,
            height: buffer.height,
        };
        match export_png(&buffer.pixels, buffer.width, buffer.height, &path, &metadata) {
            Ok(()) => {
                info!("Exported face texture to {}", path.display());
                self.status = format!("Exported {}", path.display());
                if let Some(dir) = path.parent() {
                    self.preferences.export_dir = dir.display().to_string();
                }
            }
            Err(e) => {
                error!("Export failed: {e}");
                self.status = format!("Export failed: {e}");
            }
        }
    }

    // -- Side panel ----------------------------------------------------------

    fn draw_controls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("ChibiFace");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            if ui.button("Load image\u{2026}").clicked() {
                self.open_image_dialog();
            }
            if ui.button("Sample").clicked() {
                self.load_sample();
            }
            if ui.button("Clear").clicked() {
                self.clear_source();
            }
        });
        ui.add_space(6.0);

        self.draw_source_preview(ui, ctx);
        ui.add_space(8.0);

        let mut changed = false;
        changed |= ui
            .add(egui::Slider::new(&mut self.params.scale, CropParams::SCALE_RANGE).text("Zoom"))
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut self.params.v_offset, CropParams::V_OFFSET_RANGE)
                    .text("Vertical offset"),
            )
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut self.params.tone, CropParams::TONE_RANGE).text("Tone"))
            .changed();
        if changed {
            self.recompute_face();
        }
        ui.add_space(8.0);

        ui.label("Face texture");
        self.draw_face_thumbnail(ui, ctx);
        self.draw_palette_swatches(ui);
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui.button("Export PNG\u{2026}").clicked() {
                self.export_face();
            }
            if ui.button("Reset camera").clicked() {
                self.camera.reset();
            }
        });

        ui.add_space(8.0);
        ui.separator();
        if self.decoding {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(&self.status);
            });
        } else {
            ui.label(&self.status);
        }
    }

    /// Source preview with the crop box overlay; clicks set the focus point.
    fn draw_source_preview(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let size = egui::vec2(ui.available_width(), PREVIEW_HEIGHT);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click());
        let canvas = response.rect;
        painter.rect_filled(canvas, 4.0, egui::Color32::from_rgb(14, 18, 28));

        let Some(source) = &self.source else {
            painter.text(
                canvas.center(),
                egui::Align2::CENTER_CENTER,
                "Drop an image here",
                egui::FontId::proportional(14.0),
                egui::Color32::GRAY,
            );
            return;
        };
        let (img_w, img_h) = (source.buffer.width, source.buffer.height);

        let transform = match PreviewTransform::fit(
            img_w,
            img_h,
            canvas.width() as f64,
            canvas.height() as f64,
        ) {
            Ok(t) => t,
            Err(_) => return,
        };

        if self.preview_texture.is_none() {
            self.preview_texture = Some(upload_texture(ctx, "source", &source.buffer));
        }
        if let Some(tex) = &self.preview_texture {
            let (min_x, min_y) = transform.image_to_canvas(0.0, 0.0);
            let (max_x, max_y) = transform.image_to_canvas(img_w as f64, img_h as f64);
            let image_rect = egui::Rect::from_min_max(
                canvas.min + egui::vec2(min_x as f32, min_y as f32),
                canvas.min + egui::vec2(max_x as f32, max_y as f32),
            );
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(tex.id(), image_rect, uv, egui::Color32::WHITE);
        }

        // Crop box and centre cross.
        if let Some(crop) = self.crop_rect {
            let accent = color32(self.materials.accent);
            let (x0, y0) = transform.image_to_canvas(crop.x, crop.y);
            let (x1, y1) = transform.image_to_canvas(crop.x + crop.size, crop.y + crop.size);
            let box_rect = egui::Rect::from_min_max(
                canvas.min + egui::vec2(x0 as f32, y0 as f32),
                canvas.min + egui::vec2(x1 as f32, y1 as f32),
            );
            painter.rect_stroke(
                box_rect,
                0.0,
                egui::Stroke::new(2.0, accent),
                egui::StrokeKind::Outside,
            );

            let faint = egui::Stroke::new(
                1.0,
                egui::Color32::from_rgba_premultiplied(200, 200, 200, 90),
            );
            let c = box_rect.center();
            painter.line_segment(
                [egui::pos2(canvas.min.x, c.y), egui::pos2(canvas.max.x, c.y)],
                faint,
            );
            painter.line_segment(
                [egui::pos2(c.x, canvas.min.y), egui::pos2(c.x, canvas.max.y)],
                faint,
            );
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = pos - canvas.min;
                self.focus =
                    transform.click_to_focus(local.x as f64, local.y as f64, img_w, img_h);
                self.recompute_face();
            }
        }
    }

    fn draw_face_thumbnail(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(FACE_THUMB_SIDE, FACE_THUMB_SIDE),
            egui::Sense::hover(),
        );
        ui.painter()
            .rect_filled(rect, 4.0, egui::Color32::from_rgb(14, 18, 28));

        if self.source.is_none() {
            return;
        }
        if self.face_texture.is_none() {
            self.face_texture = Some(upload_texture(ctx, "face", self.compositor.buffer()));
        }
        if let Some(tex) = &self.face_texture {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            ui.painter().image(tex.id(), rect, uv, egui::Color32::WHITE);
        }
    }

    fn draw_palette_swatches(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for color in [
                self.materials.head_base,
                self.materials.body,
                self.materials.limb,
                self.materials.accent,
            ] {
                let (rect, _) = ui.allocate_exact_size(egui::vec2(20.0, 20.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 3.0, color32(color));
            }
        });
    }

    // -- Avatar viewport -----------------------------------------------------

    fn draw_viewport(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let available = ui.available_size();
        let (response, painter) = ui.allocate_painter(available, egui::Sense::click_and_drag());

        if response.dragged() {
            let d = response.drag_delta();
            self.camera.orbit(-d.x * 0.01, d.y * 0.01);
        }
        let scroll = ctx.input(|i| i.raw_scroll_delta.y);
        if response.hovered() && scroll != 0.0 {
            self.camera.zoom((1.0 - scroll * 0.001).clamp(0.5, 2.0));
        }

        let panel_w = available.x.max(1.0) as u32;
        let panel_h = available.y.max(1.0) as u32;
        let scale = (SCENE_MAX_DIM as f32 / panel_w.max(panel_h) as f32).min(1.0);
        let render_w = ((panel_w as f32 * scale) as u32).max(1);
        let render_h = ((panel_h as f32 * scale) as u32).max(1);
        if self.scene.width != render_w || self.scene.height != render_h {
            self.scene = PixelBuffer::new(render_w, render_h);
        }

        let t = self.start.elapsed().as_secs_f32();
        let frame = pose_at(t);
        render_scene(
            &mut self.scene,
            &frame,
            &self.materials,
            self.compositor.buffer(),
            &self.camera,
        );

        let image = egui::ColorImage::from_rgba_unmultiplied(
            [render_w as usize, render_h as usize],
            &self.scene.pixels,
        );
        match &mut self.scene_texture {
            Some(tex) => tex.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.scene_texture = Some(ctx.load_texture("scene", image, egui::TextureOptions::LINEAR));
            }
        }
        if let Some(tex) = &self.scene_texture {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(tex.id(), response.rect, uv, egui::Color32::WHITE);
        }
    }
}

impl eframe::App for ChibiFaceApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.poll_decode();
        self.handle_dropped_files(ctx);

        let screen = ctx.input(|i| i.screen_rect());
        self.preferences.window_width = screen.width();
        self.preferences.window_height = screen.height();

        egui::SidePanel::right("controls")
            .default_width(320.0)
            .show(ctx, |ui| {
                self.draw_controls(ui, ctx);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_viewport(ui, ctx);
            });

        // The idle animation runs continuously.
        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.preferences.last_params = Some(self.params);
        self.preferences.save();
        info!("Saved preferences on exit");
    }
}

fn color32(rgb: Rgb) -> egui::Color32 {
    let [r, g, b] = rgb.to_rgb8();
    egui::Color32::from_rgb(r, g, b)
}

fn upload_texture(ctx: &egui::Context, name: &str, buffer: &PixelBuffer) -> egui::TextureHandle {
    let image = egui::ColorImage::from_rgba_unmultiplied(
        [buffer.width as usize, buffer.height as usize],
        &buffer.pixels,
    );
    ctx.load_texture(name, image, egui::TextureOptions::LINEAR)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting ChibiFace");

    let prefs = AppPreferences::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("ChibiFace")
            .with_inner_size([prefs.window_width, prefs.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "ChibiFace",
        options,
        Box::new(move |cc| Ok(Box::new(ChibiFaceApp::new(&cc.egui_ctx, prefs)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> ChibiFaceApp {
        ChibiFaceApp::new(&egui::Context::default(), AppPreferences::default())
    }

    #[test]
    fn failed_decode_falls_back_to_placeholder() {
        let mut app = test_app();
        let mut red = PixelBuffer::new(64, 64);
        red.fill([255, 0, 0, 255]);
        app.set_source(red, "red.png".to_string());
        app.params.tone = 35.0;
        assert_eq!(
            app.source.as_ref().map(|s| s.name.as_str()),
            Some("red.png")
        );

        app.apply_decode_outcome(DecodeResult {
            id: 1,
            name: "broken.jpg".to_string(),
            outcome: Err("Failed to decode broken.jpg".to_string()),
        });

        // The placeholder portrait replaces the old image; the error is
        // surfaced in the status line and the sliders keep their values.
        assert_eq!(
            app.source.as_ref().map(|s| s.name.as_str()),
            Some("sample portrait")
        );
        assert_eq!(app.status, "Failed to decode broken.jpg");
        assert_eq!(app.params.tone, 35.0);
    }

    #[test]
    fn successful_decode_resets_focus() {
        let mut app = test_app();
        app.focus = FocusPoint::new(0.1, 0.9);

        let mut green = PixelBuffer::new(32, 32);
        green.fill([0, 255, 0, 255]);
        app.apply_decode_outcome(DecodeResult {
            id: 1,
            name: "green.png".to_string(),
            outcome: Ok(green),
        });

        assert_eq!(app.focus, FocusPoint::CENTER);
        assert_eq!(
            app.source.as_ref().map(|s| s.name.as_str()),
            Some("green.png")
        );
    }
}
