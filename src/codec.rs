//! Decode and encode adapters between raw bytes and pixel buffers.

use std::io::Cursor;

use base64::engine::general_purpose;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};

use crate::error::{Error, Result};

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Reject images whose pixel count exceeds `max_pixels`.
fn check_pixel_limit(width: u32, height: u32, max_pixels: u64) -> Result<()> {
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(Error::TooLarge {
            width,
            height,
            max_pixels,
        });
    }
    Ok(())
}

/// Widest pixel `image` decodes into (RGBA with 32-bit float channels).
const MAX_BYTES_PER_PIXEL: u64 = 16;

/// Decoder allocation limits wide enough for any image within `max_pixels`.
///
/// Never tighter than the `image` defaults, so small ceilings do not starve
/// the decoder's own working buffers.
fn decode_limits(max_pixels: u64) -> Limits {
    let mut limits = Limits::default();
    let needed = max_pixels.saturating_mul(MAX_BYTES_PER_PIXEL);
    limits.max_alloc = Some(limits.max_alloc.map_or(needed, |default| default.max(needed)));
    limits
}

/// Decode encoded image bytes into a bitmap.
///
/// The header dimensions are checked against `max_pixels` before any pixel
/// buffer is allocated.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] if the bytes are not a recognized raster format
///   or the data is corrupt.
/// - [`Error::TooLarge`] if the image has more than `max_pixels` pixels.
/// - [`Error::InvalidGeometry`] if the image has a zero side.
pub fn decode(bytes: &[u8], max_pixels: u64) -> Result<DynamicImage> {
    let format =
        image::guess_format(bytes).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| Error::UnsupportedFormat(format!("{format:?}: {e}")))?;
    check_pixel_limit(width, height, max_pixels)?;

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(decode_limits(max_pixels));
    let image = reader
        .decode()
        .map_err(|e| Error::UnsupportedFormat(format!("{format:?}: {e}")))?;

    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(Error::InvalidGeometry { width, height });
    }
    check_pixel_limit(width, height, max_pixels)?;

    log::debug!(
        "decoded {format:?} {width}x{height} ({:?})",
        image.color()
    );
    Ok(image)
}

/// Encode an image as PNG, keeping its color type where PNG can carry it.
///
/// Floating-point images are widened to 16-bit RGBA, the deepest PNG supports.
///
/// # Errors
///
/// Returns [`Error::EncodeFailure`] if the encoder rejects the image.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let widened;
    let image = match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            widened = DynamicImage::ImageRgba16(image.to_rgba16());
            &widened
        }
        _ => image,
    };

    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(Error::EncodeFailure)?;
    Ok(buf.into_inner())
}

/// Wrap PNG bytes in a `data:image/png;base64,` URL, the form image hosts accept.
#[must_use]
pub fn to_data_url(png: &[u8]) -> String {
    format!(
        "{DATA_URL_PREFIX}image/png{BASE64_MARKER}{}",
        general_purpose::STANDARD.encode(png)
    )
}

/// Extract the payload of a base64 image data URL.
///
/// # Errors
///
/// Returns [`Error::DataUrl`] if the URL is not a base64 `data:image/...` URL or
/// the payload is not valid base64.
pub fn from_data_url(url: &str) -> Result<Vec<u8>> {
    let url = url.trim();
    let header_end = url
        .find(BASE64_MARKER)
        .ok_or_else(|| Error::DataUrl("missing ;base64, marker".to_string()))?;
    let mime = url[..header_end]
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| Error::DataUrl("missing data: scheme".to_string()))?;
    if !mime.to_ascii_lowercase().starts_with("image/") {
        return Err(Error::DataUrl(format!("not an image type: {mime}")));
    }

    general_purpose::STANDARD
        .decode(&url[header_end + BASE64_MARKER.len()..])
        .map_err(|e| Error::DataUrl(e.to_string()))
}
