//! Error types for the cutout-normalize crate.

/// Errors that can occur while normalizing a cutout image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bytes are not a raster format the decoder recognizes, or are corrupt.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image has more pixels than the configured ceiling.
    #[error("image too large ({width}x{height}), limit is {max_pixels} pixels")]
    TooLarge {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Configured pixel ceiling.
        max_pixels: u64,
    },

    /// A zero-area image or target reached a stage that needs a real area.
    #[error("invalid geometry: {width}x{height}")]
    InvalidGeometry {
        /// Width that was rejected.
        width: u32,
        /// Height that was rejected.
        height: u32,
    },

    /// The canvas could not be serialized to PNG.
    #[error("failed to encode PNG: {0}")]
    EncodeFailure(image::ImageError),

    /// A data URL was malformed or its payload was not valid base64.
    #[error("invalid data URL: {0}")]
    DataUrl(String),

    /// A mode string did not name a known normalization mode.
    #[error("unknown mode {0:?}, expected \"bgOnly\" or \"fill<size>\"")]
    InvalidMode(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
