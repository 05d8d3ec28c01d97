//! Texture cache and texture manager for Lumen
//!
//! This crate provides:
//! - A reference counted texture cache keyed by url and load parameters,
//!   with external textures and encoded image buffers in the same id space
//! - A texture manager driving loads through a state machine, with alpha
//!   masking, deferred requests during notification and a fallback texture
//! - A worker pool decoding images off the owning thread

pub mod cache_manager;
pub mod config;
pub mod error;
pub mod hash;
pub mod load_state;
pub mod loader;
pub mod manager;
pub mod observer;
pub mod pixel_buffer;
pub mod slot_map;
pub mod types;
pub mod visual_url;

pub use cache_manager::{CacheKind, TextureCacheIndex, TextureCacheManager, TextureInfo};
pub use config::TextureConfig;
pub use error::{TextureError, TextureResult};
pub use hash::{calculate_hash, generate_hash, HashParameters};
pub use load_state::{LoadEvent, LoadState, TransitionError};
pub use loader::{
    AsyncImageLoader, DecodedImage, ImageDecoder, ImageSource, LoadRequest, LoadResult,
    MaskRequest, PngDecoder, ThreadPoolImageLoader,
};
pub use manager::{LoadedTexture, MaskingData, TextureManager, TextureRequest};
pub use observer::{LifecycleObserver, TextureInformation, TextureUploadObserver};
pub use pixel_buffer::{PixelBuffer, PixelFormat, Texture, TextureSet, MASK_TEXTURE_INDEX, TEXTURE_INDEX};
pub use slot_map::DenseSlotMap;
pub use types::*;
pub use visual_url::{ProtocolType, UrlType, VisualUrl};
