pub mod color;
pub mod crop;
pub mod error;
pub mod preview;
pub mod tone;

// Re-export primary types for convenience.
pub use color::Rgb;
pub use crop::{CropParams, CropRect, FocusPoint};
pub use error::CoreError;
pub use preview::PreviewTransform;
pub use tone::{ColorMatrix, ToneFilter};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
