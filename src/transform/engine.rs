//! Transform engine
//!
//! Dispatches a validated method to one of three geometric strategies.
//! All pixel scaling goes through the injected `Resampler`; this module only
//! computes target sizes and crop windows.
//!
//! Zero dimensions:
//! - `Resize`: a zero axis is derived from the other preserving aspect ratio;
//!   both zero returns the source unchanged.
//! - `Fit`: a zero axis is unconstrained; both zero returns the source.
//! - `Fill`: with a zero axis there is nothing to crop to, so it behaves
//!   like `Resize`.
//!
//! `Fill` crops the source to the target aspect ratio before scaling, so no
//! intermediate buffer is ever larger than the source or the output.

use image::DynamicImage;

use super::error::ImageError;
use super::params::{Anchor, Method, ResampleFilter};
use super::resampler::Resampler;

/// Apply `method` to `image`
pub fn transform(
    image: DynamicImage,
    method: Method,
    width: u32,
    height: u32,
    filter: ResampleFilter,
    anchor: Anchor,
    resampler: &dyn Resampler,
) -> Result<DynamicImage, ImageError> {
    match method {
        Method::Resize => resize(image, width, height, filter, resampler),
        Method::Fit => fit(image, width, height, filter, resampler),
        Method::Fill => fill(image, width, height, filter, anchor, resampler),
    }
}

/// Scale to exactly `width` x `height`
pub fn resize(
    image: DynamicImage,
    width: u32,
    height: u32,
    filter: ResampleFilter,
    resampler: &dyn Resampler,
) -> Result<DynamicImage, ImageError> {
    let target = resize_dimensions(image.width(), image.height(), width, height);
    scale_to(image, target, filter, resampler)
}

/// Scale down to fit inside `width` x `height`, preserving aspect ratio
pub fn fit(
    image: DynamicImage,
    width: u32,
    height: u32,
    filter: ResampleFilter,
    resampler: &dyn Resampler,
) -> Result<DynamicImage, ImageError> {
    let target = fit_dimensions(image.width(), image.height(), width, height);
    scale_to(image, target, filter, resampler)
}

/// Crop to the aspect ratio of `width` x `height` around `anchor`, then scale
pub fn fill(
    image: DynamicImage,
    width: u32,
    height: u32,
    filter: ResampleFilter,
    anchor: Anchor,
    resampler: &dyn Resampler,
) -> Result<DynamicImage, ImageError> {
    if width == 0 || height == 0 {
        return resize(image, width, height, filter, resampler);
    }

    let (src_w, src_h) = (image.width(), image.height());
    let (crop_w, crop_h) = crop_window(src_w, src_h, width, height);
    let cropped = if (crop_w, crop_h) == (src_w, src_h) {
        image
    } else {
        let (x, y) = anchor_offset(src_w, src_h, crop_w, crop_h, anchor);
        image.crop_imm(x, y, crop_w, crop_h)
    };

    scale_to(cropped, (width, height), filter, resampler)
}

/// Size of the image `method` produces from a `src_w` x `src_h` source
pub fn output_dimensions(
    method: Method,
    src_w: u32,
    src_h: u32,
    width: u32,
    height: u32,
) -> (u32, u32) {
    match method {
        Method::Resize => resize_dimensions(src_w, src_h, width, height),
        Method::Fit => fit_dimensions(src_w, src_h, width, height),
        Method::Fill if width == 0 || height == 0 => {
            resize_dimensions(src_w, src_h, width, height)
        }
        Method::Fill => (width, height),
    }
}

fn scale_to(
    image: DynamicImage,
    (width, height): (u32, u32),
    filter: ResampleFilter,
    resampler: &dyn Resampler,
) -> Result<DynamicImage, ImageError> {
    if image.width() == width && image.height() == height {
        return Ok(image);
    }
    resampler.resize(&image, width, height, filter)
}

// Saturates at u32::MAX instead of wrapping
fn scale_axis(value: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (f64::from(value) * f64::from(numerator) / f64::from(denominator)).round();
    (scaled as u32).max(1)
}

/// Target size for `Method::Resize`
pub fn resize_dimensions(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    match (width, height) {
        (0, 0) => (src_w, src_h),
        (w, 0) => (w, scale_axis(src_h, w, src_w)),
        (0, h) => (scale_axis(src_w, h, src_h), h),
        (w, h) => (w, h),
    }
}

/// Target size for `Method::Fit`; never larger than the source
pub fn fit_dimensions(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    let max_w = if width == 0 { src_w } else { width };
    let max_h = if height == 0 { src_h } else { height };

    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }

    // Compare src_w/src_h against max_w/max_h without floating point
    if (src_w as u64) * (max_h as u64) > (max_w as u64) * (src_h as u64) {
        (max_w, scale_axis(src_h, max_w, src_w))
    } else {
        (scale_axis(src_w, max_h, src_h), max_h)
    }
}

/// Largest window with the aspect ratio of `width` x `height` that fits
/// inside the source
pub fn crop_window(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    if (src_w as u64) * (height as u64) > (width as u64) * (src_h as u64) {
        (scale_axis(src_h, width, height).min(src_w), src_h)
    } else {
        (src_w, scale_axis(src_w, height, width).min(src_h))
    }
}

/// Top-left corner of a `width` x `height` window anchored inside
/// a `bound_w` x `bound_h` image
pub fn anchor_offset(
    bound_w: u32,
    bound_h: u32,
    width: u32,
    height: u32,
    anchor: Anchor,
) -> (u32, u32) {
    let spare_w = bound_w.saturating_sub(width);
    let spare_h = bound_h.saturating_sub(height);
    match anchor {
        Anchor::TopLeft => (0, 0),
        Anchor::Top => (spare_w / 2, 0),
        Anchor::TopRight => (spare_w, 0),
        Anchor::Left => (0, spare_h / 2),
        Anchor::Right => (spare_w, spare_h / 2),
        Anchor::BottomLeft => (0, spare_h),
        Anchor::Bottom => (spare_w / 2, spare_h),
        Anchor::BottomRight => (spare_w, spare_h),
        Anchor::Center => (spare_w / 2, spare_h / 2),
    }
}
