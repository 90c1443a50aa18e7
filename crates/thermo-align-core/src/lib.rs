//! Core buffers and geometry for thermal/optical image registration.
//!
//! This crate is intentionally small. It owns the pixel buffer types, the
//! transform model shared by every pipeline stage, and the homography
//! estimators. It does *not* decode files or run any detector.

mod homography;
mod image;
mod logger;
mod transform;
mod warp;

pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use image::{
    crop_gray, resize_exact, resize_to_width, sample_bilinear, sample_bilinear_rgb,
    sample_bilinear_u8, GrayImage, GrayImageView, RgbImage,
};
pub use transform::{AffineMap, Transform};
pub use warp::{warp_gray, warp_rgb};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
