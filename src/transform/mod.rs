//! Image transformation module
//!
//! - Parameter validation (`params`)
//! - Geometric strategies: resize, fit, fill (`engine`)
//! - Resampling capability (`resampler`)
//! - JPEG decode/encode (`codec`)

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod params;
pub mod resampler;

pub use codec::{decode_jpeg, encode_jpeg, CONTENT_TYPE};
pub use config::ImageConfig;
pub use engine::{output_dimensions, transform};
pub use error::ImageError;
pub use params::{
    validate, validate_dimensions, Anchor, Method, RawTransformRequest, ResampleFilter,
    TransformRequest, ValidatedParams,
};
pub use resampler::{FastResampler, Resampler};
