//! Core types and utilities for toolkit check-in analysis.
//!
//! This crate is intentionally small and purely pixel/geometric. It does
//! *not* know about templates, markers or verdicts; it provides the image
//! views, the perspective transform and the slot region type that the
//! higher-level crates build on.

mod homography;
mod image;
mod logger;
mod region;

pub use homography::{perspective_from_quad, warp_perspective_gray, warp_perspective_rgb, Perspective};
pub use image::{
    luma_u8, rgb_to_gray, sample_bilinear, sample_bilinear_rgb, sample_bilinear_u8, saturation_u8,
    GrayImage, GrayImageView, RgbImage, RgbImageView,
};
pub use region::{Region, RegionBounds, RegionError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
