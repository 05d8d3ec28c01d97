//! Shared texture types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a cached texture, external texture or encoded buffer.
/// All three share one id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered upload observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

/// Requested image size, zero means the natural size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u16,
    pub height: u16,
}

impl ImageDimensions {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// How a decoded image is fitted into the requested size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FittingMode {
    #[default]
    ShrinkToFit = 0,
    ScaleToFill = 1,
    FitWidth = 2,
    FitHeight = 3,
}

/// Filter used when resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SamplingMode {
    #[default]
    BoxThenLinear = 0,
    Box = 1,
    Nearest = 2,
    Linear = 3,
    Lanczos = 4,
    NoFilter = 5,
}

impl SamplingMode {
    pub(crate) fn filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            SamplingMode::Nearest | SamplingMode::NoFilter | SamplingMode::Box => {
                FilterType::Nearest
            }
            SamplingMode::Linear | SamplingMode::BoxThenLinear => FilterType::Triangle,
            SamplingMode::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Where the loaded result is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageType {
    /// Upload to a texture and drop the pixels
    #[default]
    UploadToTexture,
    /// Keep the pixels, used for masks
    KeepPixelBuffer,
    /// Upload and keep the texture around for masking
    KeepTexture,
    /// Hand the pixels to the observer without uploading
    ReturnPixelBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReloadPolicy {
    #[default]
    Cached,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MultiplyOnLoad {
    #[default]
    MultiplyOnLoad,
    LoadWithoutMultiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UseAtlas {
    #[default]
    NoAtlas,
    UseAtlas,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimensions() {
        assert!(ImageDimensions::ZERO.is_zero());
        assert!(!ImageDimensions::new(0, 4).is_zero());
    }
}
