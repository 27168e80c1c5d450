use thiserror::Error;

/// Errors originating from the core crop/tone engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid crop scale: {0} (must be positive and finite)")]
    InvalidCropScale(f64),

    #[error("invalid image dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },
}
