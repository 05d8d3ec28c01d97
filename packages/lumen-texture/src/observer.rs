//! Observer traits for texture uploads and manager lifetime

use std::sync::Arc;
use std::time::Duration;

use crate::manager::TextureManager;
use crate::pixel_buffer::{PixelBuffer, TextureSet};
use crate::types::TextureId;

/// What a finished load hands to its observers
#[derive(Debug, Clone)]
pub enum TextureInformation {
    Texture {
        texture_id: TextureId,
        texture_set: TextureSet,
        use_atlas: bool,
        premultiplied: bool,
    },
    PixelBuffer {
        texture_id: TextureId,
        /// None when the load failed
        pixel_buffer: Option<Arc<PixelBuffer>>,
        url: String,
        premultiplied: bool,
    },
    AnimatedImage {
        texture_id: TextureId,
        texture_set: TextureSet,
        frame_count: u32,
        frame_interval: Duration,
        premultiplied: bool,
    },
}

impl TextureInformation {
    pub fn texture_id(&self) -> TextureId {
        match self {
            TextureInformation::Texture { texture_id, .. }
            | TextureInformation::PixelBuffer { texture_id, .. }
            | TextureInformation::AnimatedImage { texture_id, .. } => *texture_id,
        }
    }
}

/// Receives load completion. The manager is lent back so observers may
/// request or remove textures from inside the callback; those calls are
/// queued until notification finishes.
pub trait TextureUploadObserver {
    fn load_complete(&mut self, manager: &mut TextureManager, success: bool, info: TextureInformation);
}

pub trait LifecycleObserver {
    fn texture_manager_destroyed(&mut self);
}
