//! Resampling capability
//!
//! The engine never scales pixels itself; it asks a `Resampler` for an
//! image of an exact size. `FastResampler` is the production implementation
//! backed by `fast_image_resize`.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::DynamicImage;
use std::num::NonZeroU32;

use super::error::ImageError;
use super::params::ResampleFilter;

/// Scales an image to an exact size with a given kernel
pub trait Resampler: Send + Sync {
    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<DynamicImage, ImageError>;
}

/// `fast_image_resize` backed resampler
///
/// The library ships a smaller kernel set than the request catalog, so each
/// kernel maps to the closest algorithm it provides:
///
/// | Kernel | Algorithm |
/// |---|---|
/// | NearestNeighbor | Nearest |
/// | Box | Box |
/// | Linear, Hermite | Bilinear |
/// | MitchellNetravali, BSpline, Gaussian | Mitchell |
/// | CatmullRom | CatmullRom |
/// | Hamming | Hamming |
/// | Lanczos, Bartlett, Hann, Blackman, Welch, Cosine | Lanczos3 |
///
/// Distinct kernels still produce distinct cache keys even when they share
/// an algorithm here.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastResampler;

impl FastResampler {
    pub fn new() -> Self {
        Self
    }

    pub fn algorithm(filter: ResampleFilter) -> ResizeAlg {
        match filter {
            ResampleFilter::NearestNeighbor => ResizeAlg::Nearest,
            ResampleFilter::Box => ResizeAlg::Convolution(FilterType::Box),
            ResampleFilter::Linear | ResampleFilter::Hermite => {
                ResizeAlg::Convolution(FilterType::Bilinear)
            }
            ResampleFilter::MitchellNetravali
            | ResampleFilter::BSpline
            | ResampleFilter::Gaussian => ResizeAlg::Convolution(FilterType::Mitchell),
            ResampleFilter::CatmullRom => ResizeAlg::Convolution(FilterType::CatmullRom),
            ResampleFilter::Hamming => ResizeAlg::Convolution(FilterType::Hamming),
            ResampleFilter::Lanczos
            | ResampleFilter::Bartlett
            | ResampleFilter::Hann
            | ResampleFilter::Blackman
            | ResampleFilter::Welch
            | ResampleFilter::Cosine => ResizeAlg::Convolution(FilterType::Lanczos3),
        }
    }
}

impl Resampler for FastResampler {
    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<DynamicImage, ImageError> {
        let src_width = NonZeroU32::new(image.width())
            .ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
        let src_height = NonZeroU32::new(image.height())
            .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
        let dst_width =
            NonZeroU32::new(width).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
        let dst_height = NonZeroU32::new(height)
            .ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

        // JPEG has no alpha channel, so work in RGB from the start
        let src_image = Image::from_vec_u8(
            src_width,
            src_height,
            image.to_rgb8().into_raw(),
            PixelType::U8x3,
        )
        .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

        let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x3);

        let mut resizer = Resizer::new(Self::algorithm(filter));
        resizer
            .resize(&src_image.view(), &mut dst_image.view_mut())
            .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

        let rgb_image = image::RgbImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    }
}
