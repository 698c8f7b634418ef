//! Request parameter validation
//!
//! Query parameters arrive as untyped integers. This module turns them into
//! closed enums (`Method`, `ResampleFilter`, `Anchor`) and bounds-checks the
//! output dimensions. Nothing here touches the filesystem.

use std::fmt;

use super::config::ImageConfig;
use crate::error::PipelineError;

/// Geometric strategy applied to the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// Scale to exactly width x height, ignoring aspect ratio
    #[default]
    Resize,
    /// Scale to cover width x height, then crop around the anchor
    Fill,
    /// Scale to fit inside width x height, preserving aspect ratio
    Fit,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Resize, Method::Fill, Method::Fit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Resize => "resize",
            Method::Fill => "fill",
            Method::Fit => "fit",
        }
    }

    /// Wire value, also the value fed into the cache key
    pub fn code(&self) -> i64 {
        *self as i64
    }
}

impl TryFrom<i64> for Method {
    type Error = PipelineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Method::Resize),
            1 => Ok(Method::Fill),
            2 => Ok(Method::Fit),
            _ => Err(PipelineError::bad_request("Invalid Method")),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resampling kernel catalog
///
/// The discriminants are the wire values and must stay stable: they are
/// part of every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResampleFilter {
    #[default]
    NearestNeighbor,
    Box,
    Linear,
    Hermite,
    MitchellNetravali,
    CatmullRom,
    BSpline,
    Gaussian,
    Bartlett,
    Lanczos,
    Hann,
    Hamming,
    Blackman,
    Welch,
    Cosine,
}

impl ResampleFilter {
    pub const ALL: [ResampleFilter; 15] = [
        ResampleFilter::NearestNeighbor,
        ResampleFilter::Box,
        ResampleFilter::Linear,
        ResampleFilter::Hermite,
        ResampleFilter::MitchellNetravali,
        ResampleFilter::CatmullRom,
        ResampleFilter::BSpline,
        ResampleFilter::Gaussian,
        ResampleFilter::Bartlett,
        ResampleFilter::Lanczos,
        ResampleFilter::Hann,
        ResampleFilter::Hamming,
        ResampleFilter::Blackman,
        ResampleFilter::Welch,
        ResampleFilter::Cosine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleFilter::NearestNeighbor => "nearest_neighbor",
            ResampleFilter::Box => "box",
            ResampleFilter::Linear => "linear",
            ResampleFilter::Hermite => "hermite",
            ResampleFilter::MitchellNetravali => "mitchell_netravali",
            ResampleFilter::CatmullRom => "catmull_rom",
            ResampleFilter::BSpline => "bspline",
            ResampleFilter::Gaussian => "gaussian",
            ResampleFilter::Bartlett => "bartlett",
            ResampleFilter::Lanczos => "lanczos",
            ResampleFilter::Hann => "hann",
            ResampleFilter::Hamming => "hamming",
            ResampleFilter::Blackman => "blackman",
            ResampleFilter::Welch => "welch",
            ResampleFilter::Cosine => "cosine",
        }
    }

    pub fn code(&self) -> i64 {
        *self as i64
    }
}

impl TryFrom<i64> for ResampleFilter {
    type Error = PipelineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| {
                PipelineError::bad_request(format!("Invalid resample filter: {}", value))
            })
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference point kept in frame when `Method::Fill` crops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::Center,
        Anchor::TopLeft,
        Anchor::Top,
        Anchor::TopRight,
        Anchor::Left,
        Anchor::Right,
        Anchor::BottomLeft,
        Anchor::Bottom,
        Anchor::BottomRight,
    ];

    pub fn code(&self) -> i64 {
        *self as i64
    }
}

impl TryFrom<i64> for Anchor {
    type Error = PipelineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| PipelineError::bad_request(format!("Invalid anchor: {}", value)))
    }
}

/// Enumerations after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedParams {
    pub method: Method,
    pub filter: ResampleFilter,
    pub anchor: Anchor,
}

/// Validate the raw method/filter/anchor integers
///
/// Method is checked first so a request with several bad values reports
/// the method error, then the filter, then the anchor.
pub fn validate(
    raw_method: i64,
    raw_filter: i64,
    raw_anchor: i64,
) -> Result<ValidatedParams, PipelineError> {
    let method = Method::try_from(raw_method)?;
    let filter = ResampleFilter::try_from(raw_filter)?;
    let anchor = Anchor::try_from(raw_anchor)?;
    Ok(ValidatedParams {
        method,
        filter,
        anchor,
    })
}

/// Validate requested output dimensions against the configured limits
///
/// Zero is allowed on either axis (it means "derive from aspect ratio" or
/// "unconstrained", depending on the method).
pub fn validate_dimensions(
    raw_width: i64,
    raw_height: i64,
    config: &ImageConfig,
) -> Result<(u32, u32), PipelineError> {
    let width = check_dimension("width", raw_width, config.max_width)?;
    let height = check_dimension("height", raw_height, config.max_height)?;
    Ok((width, height))
}

fn check_dimension(name: &str, value: i64, max: u32) -> Result<u32, PipelineError> {
    if value < 0 {
        return Err(PipelineError::bad_request(format!(
            "Invalid {}: {} must not be negative",
            name, value
        )));
    }
    if value > i64::from(max) {
        return Err(PipelineError::bad_request(format!(
            "Invalid {}: {} exceeds maximum {}",
            name, value, max
        )));
    }
    Ok(value as u32)
}

/// Request parameters as they arrive from the transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTransformRequest {
    pub source_id: String,
    pub method: i64,
    pub width: i64,
    pub height: i64,
    pub filter: i64,
    pub anchor: i64,
}

/// Fully validated transformation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    source_id: String,
    method: Method,
    width: u32,
    height: u32,
    filter: ResampleFilter,
    anchor: Anchor,
}

impl TransformRequest {
    /// Validate a raw request against the image limits
    pub fn from_raw(raw: &RawTransformRequest, config: &ImageConfig) -> Result<Self, PipelineError> {
        let params = validate(raw.method, raw.filter, raw.anchor)?;
        let (width, height) = validate_dimensions(raw.width, raw.height, config)?;
        Ok(Self {
            source_id: raw.source_id.clone(),
            method: params.method,
            width,
            height,
            filter: params.filter,
            anchor: params.anchor,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn filter(&self) -> ResampleFilter {
        self.filter
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }
}
