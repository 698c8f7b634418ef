use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Maximum allowed width for resized images (to prevent abuse)
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum allowed height for resized images
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Quality used when encoding transformed images
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err("image.max_width and image.max_height must be > 0".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "image.jpeg_quality {} must be between 1 and 100",
                self.jpeg_quality
            ));
        }
        Ok(())
    }
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}
