//! Normalize background-removed product cutouts into square thumbnails.
//!
//! Background-removal services return the product on a transparent canvas with
//! arbitrary padding. This crate finds the bounding box of every pixel with
//! `alpha > 0`, crops to it, scales the crop so it *covers* a fixed-size square
//! (256x256 by default, clipping the longer axis evenly on both sides), and
//! encodes the result as PNG so the transparency survives.
//!
//! # Quick Start
//!
//! ```no_run
//! use cutout_normalize::{Normalizer, NormalizeOptions};
//!
//! let bytes = std::fs::read("cutout.png").unwrap();
//! let normalizer = Normalizer::new(NormalizeOptions::default());
//! let thumbnail = normalizer.normalize(&bytes).expect("normalization failed");
//! std::fs::write("thumbnail.png", thumbnail).unwrap();
//! ```
//!
//! # Modes
//!
//! The two modes mirror what the upstream caller asks for: `"fill256"` runs the
//! full crop-and-cover pipeline, `"bgOnly"` only re-encodes the image.
//!
//! ```no_run
//! use cutout_normalize::{normalize, Mode, NormalizeOptions};
//!
//! let bytes = std::fs::read("cutout.png").unwrap();
//! let opts = NormalizeOptions {
//!     mode: "bgOnly".parse::<Mode>().unwrap(),
//!     ..NormalizeOptions::default()
//! };
//! let png = normalize(&bytes, &opts).unwrap();
//! println!("{}", cutout_normalize::codec::to_data_url(&png));
//! ```

#![deny(missing_docs)]

pub mod bounds;
pub mod codec;
mod engine;
pub mod error;
pub mod geometry;

pub use bounds::{opaque_bounds, BoundingBox};
pub use engine::{
    default_output_path, is_supported_image, normalize, Mode, NormalizeOptions, Normalizer,
    ProcessResult, DEFAULT_MAX_PIXELS, DEFAULT_TARGET_SIZE,
};
pub use error::{Error, Result};
pub use geometry::CoverPlacement;
