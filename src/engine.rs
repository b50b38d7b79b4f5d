//! Normalization engine: mode selection, the crop/cover pipeline, and file
//! batch processing.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::bounds::{self, BoundingBox};
use crate::codec;
use crate::error::{Error, Result};
use crate::geometry;

/// Side length of the square thumbnail the hosting side expects.
pub const DEFAULT_TARGET_SIZE: u32 = 256;

/// Pixel ceiling applied to decoded images unless configured otherwise.
pub const DEFAULT_MAX_PIXELS: u64 = 50_000_000;

/// What to do with a background-removed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keep the image as-is, only re-encoded as PNG (`"bgOnly"`).
    BgOnly,
    /// Crop to the opaque content and cover a square of this side (`"fill256"`).
    Fill(u32),
}

impl Default for Mode {
    fn default() -> Self {
        Self::Fill(DEFAULT_TARGET_SIZE)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BgOnly => f.write_str("bgOnly"),
            Self::Fill(size) => write!(f, "fill{size}"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Accepts `bgOnly` (or `bg-only`), `fill` and `fill<size>`, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "bgonly" | "bg-only" => Ok(Self::BgOnly),
            "fill" => Ok(Self::Fill(DEFAULT_TARGET_SIZE)),
            other => other
                .strip_prefix("fill")
                .and_then(|size| size.parse::<u32>().ok())
                .filter(|&size| size > 0)
                .map(Self::Fill)
                .ok_or_else(|| Error::InvalidMode(s.to_string())),
        }
    }
}

/// Options controlling normalization.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Pass-through or crop-and-fill.
    pub mode: Mode,
    /// Images with more pixels than this are rejected before decoding, and
    /// so is a fill target whose canvas would exceed it.
    pub max_pixels: u64,
    /// Resampling filter used when the crop is shrunk.
    pub filter: FilterType,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            max_pixels: DEFAULT_MAX_PIXELS,
            filter: FilterType::Triangle,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Where the output was written, on success.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        log::warn!("{}: {message}", path.display());
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            message,
        }
    }
}

/// Turns background-removed images into normalized PNGs.
///
/// Holds only configuration, so one instance can be shared across threads;
/// every call allocates its own buffers.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    /// Create a normalizer with the given options.
    #[must_use]
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// The options this normalizer runs with.
    #[must_use]
    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize encoded image bytes, returning PNG bytes.
    ///
    /// In [`Mode::Fill`] the output decodes to exactly `size x size`. In
    /// [`Mode::BgOnly`] the pixels are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] or [`Error::TooLarge`] from decoding,
    /// [`Error::InvalidGeometry`] for degenerate geometry, and
    /// [`Error::EncodeFailure`] if PNG encoding fails.
    pub fn normalize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let decoded = codec::decode(bytes, self.options.max_pixels)?;
        match self.options.mode {
            Mode::BgOnly => codec::encode_png(&decoded),
            Mode::Fill(size) => {
                let canvas = self.fill(&decoded.to_rgba8(), size)?;
                codec::encode_png(&DynamicImage::ImageRgba8(canvas))
            }
        }
    }

    /// Normalize an already-decoded bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] for an empty image or a zero target size,
    /// and [`Error::TooLarge`] if the target canvas exceeds `max_pixels`.
    pub fn normalize_image(&self, image: &RgbaImage) -> Result<RgbaImage> {
        match self.options.mode {
            Mode::BgOnly => Ok(image.clone()),
            Mode::Fill(size) => self.fill(image, size),
        }
    }

    fn fill(&self, image: &RgbaImage, size: u32) -> Result<RgbaImage> {
        let max_pixels = self.options.max_pixels;
        if u64::from(size) * u64::from(size) > max_pixels {
            return Err(Error::TooLarge {
                width: size,
                height: size,
                max_pixels,
            });
        }

        let (width, height) = image.dimensions();
        let bbox = bounds::opaque_bounds(image)?;
        log::debug!(
            "content bounds ({}, {})..=({}, {}) in {width}x{height}",
            bbox.min_x,
            bbox.min_y,
            bbox.max_x,
            bbox.max_y
        );

        let cropped = if bbox == BoundingBox::full(width, height) {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(geometry::crop(image, bbox))
        };
        let canvas = geometry::cover_composite(&cropped, size, self.options.filter)?;

        if canvas.dimensions() != (size, size) {
            return Err(Error::InvalidGeometry {
                width: canvas.width(),
                height: canvas.height(),
            });
        }
        Ok(canvas)
    }

    /// Process a single image file: read, normalize, write PNG.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> ProcessResult {
        let bytes = match std::fs::read(input) {
            Ok(b) => b,
            Err(e) => return ProcessResult::failed(input, format!("Failed to read: {e}")),
        };

        let png = match self.normalize(&bytes) {
            Ok(png) => png,
            Err(e) => return ProcessResult::failed(input, format!("Failed to normalize: {e}")),
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ProcessResult::failed(
                        input,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        if let Err(e) = std::fs::write(output, &png) {
            return ProcessResult::failed(input, format!("Failed to save: {e}"));
        }

        log::info!(
            "{} -> {} ({})",
            input.display(),
            output.display(),
            self.options.mode
        );
        ProcessResult {
            path: input.to_path_buf(),
            output: Some(output.to_path_buf()),
            success: true,
            message: format!("Saved {} bytes", png.len()),
        }
    }

    /// Process all supported images in a directory.
    ///
    /// Outputs are named like [`default_output_path`] but placed in
    /// `output_dir`. Uses parallel iteration when the `parallel` feature is
    /// enabled (via rayon).
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };
        entries.sort();

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        let process = |input: &PathBuf| {
            let output = output_dir.join(output_file_name(input, self.options.mode));
            self.process_file(input, &output)
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries.iter().map(process).collect()
        }
    }
}

/// Normalize encoded image bytes with the given options.
///
/// Shorthand for `Normalizer::new(options.clone()).normalize(bytes)`.
///
/// # Errors
///
/// See [`Normalizer::normalize`].
pub fn normalize(bytes: &[u8], options: &NormalizeOptions) -> Result<Vec<u8>> {
    Normalizer::new(options.clone()).normalize(bytes)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif" | "tif" | "tiff"
        ),
        None => false,
    }
}

fn output_file_name(input: &Path, mode: Mode) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    match mode {
        Mode::BgOnly => format!("{stem}_cutout.png"),
        Mode::Fill(size) => format!("{stem}_{size}.png"),
    }
}

/// Generate a default output path from an input path.
///
/// Output is always PNG. Example: `"photo.jpg"` becomes `"photo_256.png"` in
/// `fill256` mode and `"photo_cutout.png"` in `bgOnly` mode.
#[must_use]
pub fn default_output_path(input: &Path, mode: Mode) -> PathBuf {
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(output_file_name(input, mode))
}
