//! CPU pixel buffers, uploaded textures and texture sets

use std::sync::Arc;

use image::{imageops, DynamicImage, GrayImage, RgbImage, RgbaImage};
use smallvec::SmallVec;

use crate::error::{TextureError, TextureResult};
use crate::types::{FittingMode, ImageDimensions, SamplingMode};

/// Slot of the image texture in a [`TextureSet`]
pub const TEXTURE_INDEX: usize = 0;
/// Slot of the mask texture in a [`TextureSet`]
pub const MASK_TEXTURE_INDEX: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
    L8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::L8 => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> TextureResult<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(TextureError::Decode(format!(
                "{width}x{height} {format:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            premultiplied: false,
        })
    }

    /// Converts a decoded image, keeping luminance and alpha-less images compact
    pub fn from_image(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (format, data) = match image {
            DynamicImage::ImageLuma8(buffer) => (PixelFormat::L8, buffer.into_raw()),
            DynamicImage::ImageRgb8(buffer) => (PixelFormat::Rgb8, buffer.into_raw()),
            other if !other.color().has_alpha() && !other.color().has_color() => {
                (PixelFormat::L8, other.to_luma8().into_raw())
            }
            other if !other.color().has_alpha() => (PixelFormat::Rgb8, other.to_rgb8().into_raw()),
            other => (PixelFormat::Rgba8, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            format,
            data,
            premultiplied: false,
        }
    }

    pub fn to_image(&self) -> TextureResult<DynamicImage> {
        let mismatch = || {
            TextureError::Decode(format!(
                "pixel data does not match {}x{} {:?}",
                self.width, self.height, self.format
            ))
        };
        let data = self.data.clone();
        let image = match self.format {
            PixelFormat::Rgba8 => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(self.width, self.height, data).ok_or_else(mismatch)?,
            ),
            PixelFormat::Rgb8 => DynamicImage::ImageRgb8(
                RgbImage::from_raw(self.width, self.height, data).ok_or_else(mismatch)?,
            ),
            PixelFormat::L8 => DynamicImage::ImageLuma8(
                GrayImage::from_raw(self.width, self.height, data).ok_or_else(mismatch)?,
            ),
        };
        Ok(image)
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.format == PixelFormat::Rgba8
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Multiplies color channels by alpha. Formats without alpha are only
    /// flagged.
    pub fn premultiply(&mut self) {
        if self.premultiplied {
            return;
        }
        if self.format == PixelFormat::Rgba8 {
            for pixel in self.data.chunks_exact_mut(4) {
                let alpha = u16::from(pixel[3]);
                for channel in &mut pixel[..3] {
                    *channel = multiply(u16::from(*channel), alpha);
                }
            }
        }
        self.premultiplied = true;
    }

    /// Downscales into `desired`. Images are never enlarged.
    pub fn fit(
        &mut self,
        desired: ImageDimensions,
        fitting_mode: FittingMode,
        sampling_mode: SamplingMode,
    ) -> TextureResult<()> {
        if desired.is_zero() || self.width == 0 || self.height == 0 {
            return Ok(());
        }

        let (width, height) = (self.width as f32, self.height as f32);
        let desired_width = if desired.width == 0 {
            width * f32::from(desired.height) / height
        } else {
            f32::from(desired.width)
        };
        let desired_height = if desired.height == 0 {
            height * f32::from(desired.width) / width
        } else {
            f32::from(desired.height)
        };

        let scale_x = desired_width / width;
        let scale_y = desired_height / height;
        let scale = match fitting_mode {
            FittingMode::ShrinkToFit => scale_x.min(scale_y),
            FittingMode::ScaleToFill => scale_x.max(scale_y),
            FittingMode::FitWidth => scale_x,
            FittingMode::FitHeight => scale_y,
        }
        .min(1.0);

        let scaled_width = ((width * scale).round() as u32).max(1);
        let scaled_height = ((height * scale).round() as u32).max(1);

        let mut image = self.to_image()?;
        if (scaled_width, scaled_height) != (self.width, self.height) {
            image = image.resize_exact(scaled_width, scaled_height, sampling_mode.filter());
        }

        if fitting_mode == FittingMode::ScaleToFill {
            let crop_width = scaled_width.min((desired_width.round() as u32).max(1));
            let crop_height = scaled_height.min((desired_height.round() as u32).max(1));
            if (crop_width, crop_height) != (scaled_width, scaled_height) {
                image = image.crop_imm(
                    (scaled_width - crop_width) / 2,
                    (scaled_height - crop_height) / 2,
                    crop_width,
                    crop_height,
                );
            }
        }

        self.replace_with(image);
        Ok(())
    }

    /// Multiplies alpha by the mask's alpha, or its luminance for masks
    /// without alpha.
    ///
    /// With `crop_to_mask` the image is scaled to cover the mask size times
    /// `content_scale` and cropped around its center. Otherwise the mask is
    /// stretched over the image.
    pub fn apply_mask(
        &mut self,
        mask: &PixelBuffer,
        content_scale: f32,
        crop_to_mask: bool,
    ) -> TextureResult<()> {
        if self.format != PixelFormat::Rgba8 {
            return Err(TextureError::UnsupportedFormat(format!(
                "masking needs RGBA8 pixels, got {:?}",
                self.format
            )));
        }

        if crop_to_mask {
            let scale = if content_scale > 0.0 { content_scale } else { 1.0 };
            let target_width = ((mask.width as f32 * scale).round() as u32).max(1);
            let target_height = ((mask.height as f32 * scale).round() as u32).max(1);
            let cover = (target_width as f32 / self.width as f32)
                .max(target_height as f32 / self.height as f32);
            let cover_width = ((self.width as f32 * cover).round() as u32).max(target_width);
            let cover_height = ((self.height as f32 * cover).round() as u32).max(target_height);

            let image = self
                .to_image()?
                .resize_exact(cover_width, cover_height, imageops::FilterType::Triangle)
                .crop_imm(
                    (cover_width - target_width) / 2,
                    (cover_height - target_height) / 2,
                    target_width,
                    target_height,
                );
            self.replace_with(image);
        }

        let mask_alpha = mask.alpha_plane(self.width, self.height)?;
        let premultiplied = self.premultiplied;
        for (pixel, &coverage) in self.data.chunks_exact_mut(4).zip(mask_alpha.iter()) {
            let coverage = u16::from(coverage);
            pixel[3] = multiply(u16::from(pixel[3]), coverage);
            if premultiplied {
                for channel in &mut pixel[..3] {
                    *channel = multiply(u16::from(*channel), coverage);
                }
            }
        }
        Ok(())
    }

    /// One coverage byte per pixel, resampled to `width` x `height`
    fn alpha_plane(&self, width: u32, height: u32) -> TextureResult<Vec<u8>> {
        let mut image = self.to_image()?;
        if (self.width, self.height) != (width, height) {
            image = image.resize_exact(width, height, imageops::FilterType::Triangle);
        }
        let plane = match self.format {
            PixelFormat::Rgba8 => image
                .to_rgba8()
                .pixels()
                .map(|pixel| pixel.0[3])
                .collect(),
            PixelFormat::Rgb8 | PixelFormat::L8 => image.to_luma8().into_raw(),
        };
        Ok(plane)
    }

    fn replace_with(&mut self, image: DynamicImage) {
        let premultiplied = self.premultiplied;
        self.width = image.width();
        self.height = image.height();
        self.data = match self.format {
            PixelFormat::Rgba8 => image.to_rgba8().into_raw(),
            PixelFormat::Rgb8 => image.to_rgb8().into_raw(),
            PixelFormat::L8 => image.to_luma8().into_raw(),
        };
        self.premultiplied = premultiplied;
    }
}

#[inline]
fn multiply(value: u16, factor: u16) -> u8 {
    ((value * factor + 127) / 255) as u8
}

/// Immutable uploaded texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub premultiplied: bool,
    pub data: Arc<[u8]>,
}

impl Texture {
    pub fn upload(pixel_buffer: &PixelBuffer) -> Self {
        Self {
            width: pixel_buffer.width,
            height: pixel_buffer.height,
            format: pixel_buffer.format,
            premultiplied: pixel_buffer.premultiplied,
            data: Arc::from(pixel_buffer.data.as_slice()),
        }
    }

    /// Opaque white RGBA square
    pub fn solid_white(size: u32) -> Self {
        let size = size.max(1);
        Self {
            width: size,
            height: size,
            format: PixelFormat::Rgba8,
            premultiplied: true,
            data: Arc::from(vec![u8::MAX; (size * size * 4) as usize]),
        }
    }
}

/// Textures bound together for drawing, the image at [`TEXTURE_INDEX`] and an
/// optional mask at [`MASK_TEXTURE_INDEX`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureSet {
    textures: SmallVec<[Option<Texture>; 2]>,
}

impl TextureSet {
    pub fn with_texture(texture: Texture) -> Self {
        let mut set = Self::default();
        set.set_texture(TEXTURE_INDEX, texture);
        set
    }

    pub fn set_texture(&mut self, index: usize, texture: Texture) {
        if self.textures.len() <= index {
            self.textures.resize(index + 1, None);
        }
        self.textures[index] = Some(texture);
    }

    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index).and_then(Option::as_ref)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.iter().filter(|texture| texture.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.texture_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32, pixel: [u8; 4]) -> PixelBuffer {
        let data = pixel.repeat((width * height) as usize);
        PixelBuffer::new(width, height, PixelFormat::Rgba8, data).unwrap()
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut buffer = rgba(1, 1, [255, 100, 0, 128]);
        buffer.premultiply();
        assert_eq!(buffer.data, vec![128, 50, 0, 128]);
        assert!(buffer.premultiplied);
    }

    #[test]
    fn shrink_to_fit_keeps_aspect() {
        let mut buffer = rgba(8, 4, [1, 2, 3, 255]);
        buffer
            .fit(ImageDimensions::new(4, 4), FittingMode::ShrinkToFit, SamplingMode::Nearest)
            .unwrap();
        assert_eq!(buffer.dimensions(), (4, 2));
    }

    #[test]
    fn scale_to_fill_crops_to_request() {
        let mut buffer = rgba(8, 4, [1, 2, 3, 255]);
        buffer
            .fit(ImageDimensions::new(2, 2), FittingMode::ScaleToFill, SamplingMode::Nearest)
            .unwrap();
        assert_eq!(buffer.dimensions(), (2, 2));
    }

    #[test]
    fn never_upscales() {
        let mut buffer = rgba(2, 2, [1, 2, 3, 255]);
        buffer
            .fit(ImageDimensions::new(8, 8), FittingMode::ShrinkToFit, SamplingMode::Linear)
            .unwrap();
        assert_eq!(buffer.dimensions(), (2, 2));
    }

    #[test]
    fn luminance_mask_multiplies_alpha() {
        let mut buffer = rgba(2, 2, [10, 20, 30, 255]);
        let mask = PixelBuffer::new(2, 2, PixelFormat::L8, vec![0, 255, 255, 0]).unwrap();
        buffer.apply_mask(&mask, 1.0, false).unwrap();
        let alphas: Vec<u8> = buffer.data.chunks_exact(4).map(|p| p[3]).collect();
        assert_eq!(alphas, vec![0, 255, 255, 0]);
    }

    #[test]
    fn crop_to_mask_takes_mask_size() {
        let mut buffer = rgba(8, 8, [10, 20, 30, 255]);
        let mask = rgba(2, 3, [0, 0, 0, 255]);
        buffer.apply_mask(&mask, 1.0, true).unwrap();
        assert_eq!(buffer.dimensions(), (2, 3));
    }

    #[test]
    fn masking_needs_alpha() {
        let mut buffer = PixelBuffer::new(1, 1, PixelFormat::Rgb8, vec![0, 0, 0]).unwrap();
        let mask = rgba(1, 1, [0, 0, 0, 255]);
        assert!(matches!(
            buffer.apply_mask(&mask, 1.0, false),
            Err(TextureError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn texture_set_slots() {
        let mut set = TextureSet::with_texture(Texture::solid_white(2));
        assert_eq!(set.texture_count(), 1);
        assert!(set.texture(MASK_TEXTURE_INDEX).is_none());
        set.set_texture(MASK_TEXTURE_INDEX, Texture::solid_white(1));
        assert_eq!(set.texture(MASK_TEXTURE_INDEX).map(|t| t.width), Some(1));
    }
}
