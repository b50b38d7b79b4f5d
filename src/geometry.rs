//! Crop and "cover" compositing onto a square canvas.
//!
//! Cover scaling multiplies the crop by the larger of the two axis ratios,
//! `scale = max(S / cw, S / ch)`, so the result fills the `S x S` square on
//! both axes. The overflowing axis is centered and clipped at the canvas edge:
//!
//! ```text
//! offset_x = (S - scaled_width) / 2     (<= 0)
//! offset_y = (S - scaled_height) / 2    (<= 0)
//! ```
//!
//! Scaled sizes are whole pixels and never smaller than `S`, so every canvas
//! pixel is covered for any non-empty crop.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

use crate::bounds::BoundingBox;
use crate::error::{Error, Result};

/// Copy the pixels inside `bbox` into a new image. The source is untouched.
///
/// `bbox` must lie within the image; use [`crate::opaque_bounds`] to get one.
#[must_use]
pub fn crop(image: &RgbaImage, bbox: BoundingBox) -> RgbaImage {
    debug_assert!(bbox.max_x < image.width() && bbox.max_y < image.height());
    imageops::crop_imm(image, bbox.min_x, bbox.min_y, bbox.width(), bbox.height()).to_image()
}

/// Where a `cw x ch` crop lands on an `S x S` canvas under cover scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverPlacement {
    /// Uniform scale factor, `max(S / cw, S / ch)`.
    pub scale: f64,
    /// Scaled crop width, at least `S`.
    pub scaled_width: u32,
    /// Scaled crop height, at least `S`.
    pub scaled_height: u32,
    /// Canvas x of the scaled crop's left edge (zero or negative).
    pub offset_x: i64,
    /// Canvas y of the scaled crop's top edge (zero or negative).
    pub offset_y: i64,
}

impl CoverPlacement {
    /// Compute the cover placement of a `crop_width x crop_height` image on a
    /// `size x size` canvas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if the crop or the target has a zero side.
    pub fn compute(crop_width: u32, crop_height: u32, size: u32) -> Result<Self> {
        if crop_width == 0 || crop_height == 0 {
            return Err(Error::InvalidGeometry {
                width: crop_width,
                height: crop_height,
            });
        }
        if size == 0 {
            return Err(Error::InvalidGeometry {
                width: size,
                height: size,
            });
        }

        let target = f64::from(size);
        let scale = (target / f64::from(crop_width)).max(target / f64::from(crop_height));
        let scaled_width = scaled_len(crop_width, scale, size);
        let scaled_height = scaled_len(crop_height, scale, size);

        Ok(Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: centered_offset(size, scaled_width),
            offset_y: centered_offset(size, scaled_height),
        })
    }
}

/// Round `len * scale` to whole pixels, never below the canvas side.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_len(len: u32, scale: f64, size: u32) -> u32 {
    let scaled = (f64::from(len) * scale).round().min(f64::from(u32::MAX));
    (scaled as u32).max(size)
}

fn centered_offset(size: u32, scaled: u32) -> i64 {
    (i64::from(size) - i64::from(scaled)).div_euclid(2)
}

/// Scale `crop` to cover a `size x size` canvas and composite it centered.
///
/// Downscaling goes through [`imageops::resize`] with `filter` on premultiplied
/// float pixels. Upscaling
/// samples the crop bilinearly for each canvas pixel, so memory stays at one
/// canvas even when the scaled crop would be far larger than it.
///
/// # Errors
///
/// Returns [`Error::InvalidGeometry`] if the crop or the target has a zero side.
pub fn cover_composite(crop: &RgbaImage, size: u32, filter: FilterType) -> Result<RgbaImage> {
    let (crop_width, crop_height) = crop.dimensions();
    let placement = CoverPlacement::compute(crop_width, crop_height, size)?;
    log::debug!(
        "cover {crop_width}x{crop_height} -> {}x{} at ({}, {}), scale {:.4}",
        placement.scaled_width,
        placement.scaled_height,
        placement.offset_x,
        placement.offset_y,
        placement.scale,
    );

    let mut canvas = RgbaImage::new(size, size);

    if placement.scaled_width <= crop_width && placement.scaled_height <= crop_height {
        let scaled = if (placement.scaled_width, placement.scaled_height) == (crop_width, crop_height)
        {
            Cow::Borrowed(crop)
        } else {
            let shrunk = imageops::resize(
                &premultiply(crop),
                placement.scaled_width,
                placement.scaled_height,
                filter,
            );
            Cow::Owned(unpremultiply(&shrunk))
        };
        imageops::replace(&mut canvas, &*scaled, placement.offset_x, placement.offset_y);
    } else {
        sample_bilinear(crop, &placement, &mut canvas);
    }

    Ok(canvas)
}

/// Convert to float RGBA with color multiplied by alpha, so resampling weights
/// color by coverage.
fn premultiply(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        let alpha = f32::from(px[3]) / 255.0;
        Rgba([
            f32::from(px[0]) / 255.0 * alpha,
            f32::from(px[1]) / 255.0 * alpha,
            f32::from(px[2]) / 255.0 * alpha,
            alpha,
        ])
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unpremultiply(image: &Rgba32FImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        let alpha = px[3].clamp(0.0, 1.0);
        if alpha * 255.0 < 0.5 {
            return Rgba([0, 0, 0, 0]);
        }
        let mut out = [0u8; 4];
        for ch in 0..3 {
            out[ch] = (px[ch] / alpha * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        out[3] = (alpha * 255.0).round() as u8;
        Rgba(out)
    })
}

/// Interpolation taps for one output column or row.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: u32,
    hi: u32,
    frac: f32,
}

/// Map each canvas coordinate on one axis back to the source, or `None` where
/// the scaled crop does not reach.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn axis_taps(canvas_len: u32, offset: i64, scaled_len: u32, source_len: u32) -> Vec<Option<Tap>> {
    let ratio = f64::from(source_len) / f64::from(scaled_len);
    let last = f64::from(source_len - 1);

    (0..i64::from(canvas_len))
        .map(|c| {
            let pos = c - offset;
            if pos < 0 || pos >= i64::from(scaled_len) {
                return None;
            }
            let src = ((pos as f64 + 0.5) * ratio - 0.5).clamp(0.0, last);
            let lo = src.floor() as u32;
            Some(Tap {
                lo,
                hi: (lo + 1).min(source_len - 1),
                frac: (src - f64::from(lo)) as f32,
            })
        })
        .collect()
}

/// Bilinear resample with premultiplied alpha, so transparent neighbors do not
/// bleed their (meaningless) color into the product's edge.
fn sample_bilinear(source: &RgbaImage, placement: &CoverPlacement, canvas: &mut RgbaImage) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    let cols = axis_taps(
        canvas_width,
        placement.offset_x,
        placement.scaled_width,
        source.width(),
    );
    let rows = axis_taps(
        canvas_height,
        placement.offset_y,
        placement.scaled_height,
        source.height(),
    );

    for (y, row) in (0u32..).zip(&rows) {
        let Some(ty) = row else { continue };
        for (x, col) in (0u32..).zip(&cols) {
            let Some(tx) = col else { continue };
            let taps = [
                (tx.lo, ty.lo, (1.0 - tx.frac) * (1.0 - ty.frac)),
                (tx.hi, ty.lo, tx.frac * (1.0 - ty.frac)),
                (tx.lo, ty.hi, (1.0 - tx.frac) * ty.frac),
                (tx.hi, ty.hi, tx.frac * ty.frac),
            ];
            canvas.put_pixel(x, y, blend_taps(source, &taps));
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_taps(source: &RgbaImage, taps: &[(u32, u32, f32); 4]) -> Rgba<u8> {
    let mut acc = [0.0_f32; 4];
    for &(x, y, weight) in taps {
        let px = source.get_pixel(x, y);
        let alpha = f32::from(px[3]) / 255.0 * weight;
        for ch in 0..3 {
            acc[ch] += f32::from(px[ch]) * alpha;
        }
        acc[3] += alpha;
    }

    if acc[3] <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for ch in 0..3 {
        out[ch] = (acc[ch] / acc[3]).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (acc[3] * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
