//! Alpha-channel bounding box extraction.
//!
//! Background-removal services return the product on a transparent canvas that
//! is usually much larger than the product itself. The bounding box of every
//! pixel with `alpha > 0` is what gets cropped before scaling.
//!
//! The scan walks the raw RGBA buffer row by row. With the `parallel` feature
//! rows are scanned on the rayon pool and the per-row boxes are reduced with
//! [`BoundingBox::merge`], which is associative, so the result is identical to
//! the sequential scan.

use image::RgbaImage;

use crate::error::{Error, Result};

/// Inclusive pixel rectangle: `min_x..=max_x` by `min_y..=max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column (inclusive).
    pub max_x: u32,
    /// Bottom row (inclusive).
    pub max_y: u32,
}

impl BoundingBox {
    /// Box covering a whole `width x height` image.
    ///
    /// Both dimensions must be non-zero.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        debug_assert!(width > 0 && height > 0);
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width.saturating_sub(1),
            max_y: height.saturating_sub(1),
        }
    }

    /// Number of columns covered.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of rows covered.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Whether `(x, y)` lies inside the box.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }

    /// Smallest box enclosing both `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Bounding box of the opaque pixels in a single row, if any.
#[allow(clippy::cast_possible_truncation)]
fn scan_row(y: u32, row: &[u8]) -> Option<BoundingBox> {
    let mut opaque = row
        .chunks_exact(4)
        .enumerate()
        .filter(|(_, px)| px[3] > 0)
        .map(|(x, _)| x);
    let first = opaque.next()?;
    let last = opaque.last().unwrap_or(first);

    Some(BoundingBox {
        min_x: first as u32,
        min_y: y,
        max_x: last as u32,
        max_y: y,
    })
}

/// Scan every pixel once and return the box around those with `alpha > 0`.
///
/// Returns `None` for an image with no opaque pixel (including an empty one).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn scan_opaque(image: &RgbaImage) -> Option<BoundingBox> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let stride = width as usize * 4;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        image
            .as_raw()
            .par_chunks_exact(stride)
            .enumerate()
            .filter_map(|(y, row)| scan_row(y as u32, row))
            .reduce_with(BoundingBox::merge)
    }

    #[cfg(not(feature = "parallel"))]
    {
        scan_rows_sequential(image.as_raw(), stride)
    }
}

/// Single-threaded fold over the rows of a raw RGBA buffer.
#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
#[allow(clippy::cast_possible_truncation)]
fn scan_rows_sequential(raw: &[u8], stride: usize) -> Option<BoundingBox> {
    raw.chunks_exact(stride)
        .enumerate()
        .filter_map(|(y, row)| scan_row(y as u32, row))
        .reduce(BoundingBox::merge)
}

/// Bounding box of the opaque content, falling back to the whole image when
/// every pixel is fully transparent.
///
/// # Errors
///
/// Returns [`Error::InvalidGeometry`] if the image has zero width or height.
pub fn opaque_bounds(image: &RgbaImage) -> Result<BoundingBox> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidGeometry { width, height });
    }

    Ok(scan_opaque(image).unwrap_or_else(|| {
        log::debug!("no opaque pixels in {width}x{height} image, using full bounds");
        BoundingBox::full(width, height)
    }))
}
