pub mod avatar;
pub mod buffer;
pub mod compositor;
pub mod error;
pub mod export;
pub mod extract;
pub mod math;
pub mod scene;

pub use avatar::{pose_at, AvatarFrame, MaterialSet, Part, Slot};
pub use buffer::PixelBuffer;
pub use compositor::{FaceCompositor, FACE_TEXTURE_SIZE};
pub use error::RenderError;
pub use export::{export_png, ExportMetadata};
pub use extract::{extract_palette, FacePalette};
pub use math::Vec3;
pub use scene::{render_scene, OrbitCamera};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
