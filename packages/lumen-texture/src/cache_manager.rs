//! Texture cache manager
//!
//! Owns every cache entry: local textures loaded from urls, external
//! textures registered by the application and encoded image buffers. The
//! three kinds share one id space, resolved through a single id converter.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::hash::calculate_hash;
use crate::load_state::{LoadEvent, LoadState};
use crate::pixel_buffer::{PixelBuffer, Texture, TextureSet, MASK_TEXTURE_INDEX, TEXTURE_INDEX};
use crate::slot_map::{DenseSlotMap, Removed};
use crate::types::{
    FittingMode, ImageDimensions, MultiplyOnLoad, ObserverId, SamplingMode, StorageType, TextureId,
};
use crate::visual_url::{ProtocolType, VisualUrl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Local,
    /// Texture set registered by the application
    Texture,
    /// Encoded image buffer
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureCacheIndex {
    pub kind: CacheKind,
    pub index: usize,
}

/// Cache entry of a texture loaded from a url
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub texture_id: TextureId,
    pub mask_texture_id: Option<TextureId>,
    pub url: VisualUrl,
    pub desired_size: ImageDimensions,
    pub content_scale: f32,
    pub fitting_mode: FittingMode,
    pub sampling_mode: SamplingMode,
    pub use_atlas: bool,
    pub crop_to_mask: bool,
    pub hash: u64,
    pub orientation_correction: bool,
    /// Premultiplication was requested
    pub premultiply_on_load: bool,
    /// The stored pixels are premultiplied
    pub premultiplied: bool,
    pub frame_index: u32,
    pub is_animated: bool,
    pub storage_type: StorageType,
    pub load_state: LoadState,
    pub reference_count: u32,
    /// Observers waiting for this texture, notified first in first out
    pub observers: SmallVec<[ObserverId; 4]>,
    pub pixel_buffer: Option<Arc<PixelBuffer>>,
    pub texture: Option<Texture>,
    pub frame_count: u32,
    pub frame_interval: Duration,
}

impl TextureInfo {
    pub fn new(texture_id: TextureId, url: VisualUrl, hash: u64) -> Self {
        Self {
            texture_id,
            mask_texture_id: None,
            url,
            desired_size: ImageDimensions::ZERO,
            content_scale: 1.0,
            fitting_mode: FittingMode::default(),
            sampling_mode: SamplingMode::default(),
            use_atlas: false,
            crop_to_mask: true,
            hash,
            orientation_correction: true,
            premultiply_on_load: false,
            premultiplied: false,
            frame_index: 0,
            is_animated: false,
            storage_type: StorageType::default(),
            load_state: LoadState::NotStarted,
            reference_count: 1,
            observers: SmallVec::new(),
            pixel_buffer: None,
            texture: None,
            frame_count: 0,
            frame_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalTextureInfo {
    pub texture_id: TextureId,
    pub texture_set: TextureSet,
    pub reference_count: u32,
}

#[derive(Debug, Clone)]
pub struct EncodedImageBufferInfo {
    pub texture_id: TextureId,
    pub buffer: Arc<[u8]>,
    pub hash: u64,
    pub reference_count: u32,
}

/// Properties a cached texture must match to be shared
#[derive(Debug, Clone, Copy)]
pub struct CacheLookup<'a> {
    pub url: &'a str,
    pub size: ImageDimensions,
    pub fitting_mode: FittingMode,
    pub sampling_mode: SamplingMode,
    pub use_atlas: bool,
    pub storage_type: StorageType,
    pub mask_texture_id: Option<TextureId>,
    pub crop_to_mask: bool,
    pub multiply_on_load: MultiplyOnLoad,
    pub is_animated: bool,
    pub frame_index: u32,
}

impl CacheLookup<'_> {
    fn matches(&self, info: &TextureInfo) -> bool {
        let premultiply_matches = match self.multiply_on_load {
            MultiplyOnLoad::MultiplyOnLoad => info.premultiply_on_load,
            MultiplyOnLoad::LoadWithoutMultiply => !info.premultiplied,
        };

        info.url.url() == self.url
            && info.use_atlas == self.use_atlas
            && info.mask_texture_id == self.mask_texture_id
            && info.crop_to_mask == self.crop_to_mask
            && info.desired_size == self.size
            && info.is_animated == self.is_animated
            && info.storage_type == self.storage_type
            && info.frame_index == self.frame_index
            && (self.size.is_zero()
                || (info.fitting_mode == self.fitting_mode
                    && info.sampling_mode == self.sampling_mode))
            && premultiply_matches
    }
}

#[derive(Debug, Default)]
pub struct TextureCacheManager {
    textures: DenseSlotMap<TextureInfo>,
    external_textures: DenseSlotMap<ExternalTextureInfo>,
    encoded_buffers: DenseSlotMap<EncodedImageBufferInfo>,
    texture_hash: AHashMap<u64, SmallVec<[TextureId; 2]>>,
    buffer_hash: AHashMap<u64, SmallVec<[TextureId; 2]>>,
    id_converter: AHashMap<TextureId, TextureCacheIndex>,
    next_id: u32,
}

impl TextureCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id not used by any entry
    pub fn generate_texture_id(&mut self) -> TextureId {
        loop {
            let id = TextureId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            if !self.id_converter.contains_key(&id) {
                return id;
            }
        }
    }

    #[inline]
    pub fn cache_index(&self, id: TextureId) -> Option<TextureCacheIndex> {
        self.id_converter.get(&id).copied()
    }

    fn local_index(&self, id: TextureId) -> Option<usize> {
        match self.cache_index(id)? {
            TextureCacheIndex {
                kind: CacheKind::Local,
                index,
            } => Some(index),
            _ => None,
        }
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureInfo> {
        self.local_index(id).and_then(|index| self.textures.get(index))
    }

    pub fn get_mut(&mut self, id: TextureId) -> Option<&mut TextureInfo> {
        let index = self.local_index(id)?;
        self.textures.get_mut(index)
    }

    pub fn textures(&self) -> impl Iterator<Item = &TextureInfo> {
        self.textures.iter().map(|(_, info)| info)
    }

    pub fn texture_ids(&self) -> Vec<TextureId> {
        self.textures.iter().map(|(id, _)| id).collect()
    }

    #[inline]
    pub fn number_of_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn number_of_external_textures(&self) -> usize {
        self.external_textures.len()
    }

    pub fn number_of_encoded_buffers(&self) -> usize {
        self.encoded_buffers.len()
    }

    /// Looks up the hash bucket and compares every candidate in full
    pub fn find_cached_texture(&self, hash: u64, lookup: &CacheLookup<'_>) -> Option<TextureId> {
        let found = self.texture_hash.get(&hash).and_then(|bucket| {
            bucket
                .iter()
                .copied()
                .find(|&id| self.get(id).is_some_and(|info| lookup.matches(info)))
        });
        match found {
            Some(id) => log::debug!("cache hit for {} as texture {id}", lookup.url),
            None => log::debug!("cache miss for {}", lookup.url),
        }
        found
    }

    /// Adds a new entry. A buffer url takes a reference on its buffer.
    pub fn append_cache(&mut self, info: TextureInfo) -> TextureId {
        let id = info.texture_id;
        if info.url.is_buffer_resource() {
            self.use_external_resource(&info.url);
        }
        self.texture_hash.entry(info.hash).or_default().push(id);
        let index = self.textures.insert(id, info);
        self.id_converter.insert(
            id,
            TextureCacheIndex {
                kind: CacheKind::Local,
                index,
            },
        );
        log::debug!("cached texture {id} at {index}");
        id
    }

    /// Drops one reference. On the last one an uploaded or idle entry is
    /// removed, while an entry with a job in flight is flagged cancelled and
    /// removed once the job returns.
    pub fn remove_cache(&mut self, id: TextureId) {
        let Some(index) = self.cache_index(id) else {
            return;
        };

        match index.kind {
            CacheKind::Local => {
                let Some(info) = self.textures.get_mut(index.index) else {
                    return;
                };
                info.reference_count = info.reference_count.saturating_sub(1);
                log::debug!(
                    "remove texture {id} {} state {} references {}",
                    info.url.url(),
                    info.load_state,
                    info.reference_count
                );
                if info.reference_count > 0 {
                    return;
                }

                let state = info.load_state;
                match state {
                    LoadState::Loading | LoadState::MaskApplying => {
                        if let Ok(next) = state.transition(LoadEvent::Release) {
                            info.load_state = next;
                        }
                    }
                    _ => self.remove_local(id, index.index),
                }
            }
            CacheKind::Texture => {
                self.remove_external_texture(id);
            }
            CacheKind::Buffer => {
                self.remove_encoded_image_buffer(id);
            }
        }
    }

    fn remove_local(&mut self, id: TextureId, index: usize) {
        let Some(Removed { value, moved }) = self.textures.remove(index) else {
            return;
        };
        self.forget(id, moved, CacheKind::Local);
        remove_from_bucket(&mut self.texture_hash, value.hash, id);

        if value.url.is_buffer_resource() {
            if let Ok(buffer_id) = value.url.resource_id() {
                self.remove_encoded_image_buffer(buffer_id);
            }
        }
        log::debug!("texture {id} removed from cache");
    }

    fn forget(&mut self, id: TextureId, moved: Option<(TextureId, usize)>, kind: CacheKind) {
        self.id_converter.remove(&id);
        if let Some((moved_id, index)) = moved {
            self.id_converter
                .insert(moved_id, TextureCacheIndex { kind, index });
        }
    }

    pub fn add_external_texture(&mut self, texture_set: TextureSet) -> TextureId {
        let id = self.generate_texture_id();
        let index = self.external_textures.insert(
            id,
            ExternalTextureInfo {
                texture_id: id,
                texture_set,
                reference_count: 1,
            },
        );
        self.id_converter.insert(
            id,
            TextureCacheIndex {
                kind: CacheKind::Texture,
                index,
            },
        );
        id
    }

    /// Drops one reference and returns the texture set, the entry goes away
    /// with its last reference
    pub fn remove_external_texture(&mut self, id: TextureId) -> Option<TextureSet> {
        let index = match self.cache_index(id)? {
            TextureCacheIndex {
                kind: CacheKind::Texture,
                index,
            } => index,
            _ => return None,
        };
        let info = self.external_textures.get_mut(index)?;
        info.reference_count = info.reference_count.saturating_sub(1);
        if info.reference_count > 0 {
            return Some(info.texture_set.clone());
        }

        let removed = self.external_textures.remove(index)?;
        self.forget(id, removed.moved, CacheKind::Texture);
        Some(removed.value.texture_set)
    }

    /// Registers an encoded buffer. Adding the same bytes again shares the
    /// existing entry.
    pub fn add_encoded_image_buffer(&mut self, buffer: Arc<[u8]>) -> TextureId {
        let hash = calculate_hash(&buffer);
        if let Some(bucket) = self.buffer_hash.get(&hash) {
            for &id in bucket {
                let Some(TextureCacheIndex {
                    kind: CacheKind::Buffer,
                    index,
                }) = self.cache_index(id)
                else {
                    continue;
                };
                if let Some(info) = self.encoded_buffers.get_mut(index) {
                    if info.buffer == buffer {
                        info.reference_count += 1;
                        return id;
                    }
                }
            }
        }

        let id = self.generate_texture_id();
        let index = self.encoded_buffers.insert(
            id,
            EncodedImageBufferInfo {
                texture_id: id,
                buffer,
                hash,
                reference_count: 1,
            },
        );
        self.buffer_hash.entry(hash).or_default().push(id);
        self.id_converter.insert(
            id,
            TextureCacheIndex {
                kind: CacheKind::Buffer,
                index,
            },
        );
        id
    }

    pub fn remove_encoded_image_buffer(&mut self, id: TextureId) -> Option<Arc<[u8]>> {
        let index = match self.cache_index(id)? {
            TextureCacheIndex {
                kind: CacheKind::Buffer,
                index,
            } => index,
            _ => return None,
        };
        let info = self.encoded_buffers.get_mut(index)?;
        info.reference_count = info.reference_count.saturating_sub(1);
        if info.reference_count > 0 {
            return Some(Arc::clone(&info.buffer));
        }

        let removed = self.encoded_buffers.remove(index)?;
        self.forget(id, removed.moved, CacheKind::Buffer);
        remove_from_bucket(&mut self.buffer_hash, removed.value.hash, id);
        Some(removed.value.buffer)
    }

    /// Takes a reference on the external texture or buffer named by `url`
    pub fn use_external_resource(&mut self, url: &VisualUrl) {
        let Ok(id) = url.resource_id() else {
            return;
        };
        let Some(index) = self.cache_index(id) else {
            return;
        };
        match (url.protocol_type(), index.kind) {
            (ProtocolType::Texture, CacheKind::Texture) => {
                if let Some(info) = self.external_textures.get_mut(index.index) {
                    info.reference_count += 1;
                }
            }
            (ProtocolType::Buffer, CacheKind::Buffer) => {
                if let Some(info) = self.encoded_buffers.get_mut(index.index) {
                    info.reference_count += 1;
                }
            }
            _ => {}
        }
    }

    /// External textures count as uploaded, unknown ids as not started
    pub fn texture_state(&self, id: TextureId) -> LoadState {
        match self.cache_index(id) {
            Some(TextureCacheIndex {
                kind: CacheKind::Local,
                index,
            }) => self
                .textures
                .get(index)
                .map_or(LoadState::NotStarted, |info| info.load_state),
            Some(TextureCacheIndex {
                kind: CacheKind::Texture,
                ..
            }) => LoadState::Uploaded,
            _ => LoadState::NotStarted,
        }
    }

    pub fn visual_url(&self, id: TextureId) -> Option<&VisualUrl> {
        self.get(id).map(|info| &info.url)
    }

    /// Texture set of an uploaded local texture or of an external texture
    pub fn texture_set(&self, id: TextureId) -> Option<TextureSet> {
        match self.cache_index(id)? {
            TextureCacheIndex {
                kind: CacheKind::Local,
                index,
            } => {
                let info = self.textures.get(index)?;
                (info.load_state == LoadState::Uploaded).then(|| self.build_texture_set(info))
            }
            TextureCacheIndex {
                kind: CacheKind::Texture,
                index,
            } => self
                .external_textures
                .get(index)
                .map(|info| info.texture_set.clone()),
            TextureCacheIndex {
                kind: CacheKind::Buffer,
                ..
            } => None,
        }
    }

    /// Binds the entry's texture and, when its mask keeps a texture, the
    /// mask texture
    pub fn build_texture_set(&self, info: &TextureInfo) -> TextureSet {
        let mut set = TextureSet::default();
        let Some(texture) = &info.texture else {
            return set;
        };
        set.set_texture(TEXTURE_INDEX, texture.clone());

        let mask = info.mask_texture_id.and_then(|mask_id| self.get(mask_id));
        if let Some(mask) = mask {
            if matches!(
                mask.storage_type,
                StorageType::UploadToTexture | StorageType::KeepTexture
            ) {
                if let Some(mask_texture) = &mask.texture {
                    set.set_texture(MASK_TEXTURE_INDEX, mask_texture.clone());
                }
            }
        }
        set
    }

    pub fn external_texture_set(&self, id: TextureId) -> Option<TextureSet> {
        match self.cache_index(id)? {
            TextureCacheIndex {
                kind: CacheKind::Texture,
                index,
            } => self
                .external_textures
                .get(index)
                .map(|info| info.texture_set.clone()),
            _ => None,
        }
    }

    pub fn encoded_image_buffer(&self, id: TextureId) -> Option<Arc<[u8]>> {
        match self.cache_index(id)? {
            TextureCacheIndex {
                kind: CacheKind::Buffer,
                index,
            } => self
                .encoded_buffers
                .get(index)
                .map(|info| Arc::clone(&info.buffer)),
            _ => None,
        }
    }

    pub fn reference_count(&self, id: TextureId) -> u32 {
        match self.cache_index(id) {
            Some(TextureCacheIndex {
                kind: CacheKind::Local,
                index,
            }) => self.textures.get(index).map_or(0, |info| info.reference_count),
            Some(TextureCacheIndex {
                kind: CacheKind::Texture,
                index,
            }) => self
                .external_textures
                .get(index)
                .map_or(0, |info| info.reference_count),
            Some(TextureCacheIndex {
                kind: CacheKind::Buffer,
                index,
            }) => self
                .encoded_buffers
                .get(index)
                .map_or(0, |info| info.reference_count),
            None => 0,
        }
    }

    /// Removes `observer` from every waiting list
    pub fn purge_observer(&mut self, observer: ObserverId) {
        for index in 0..self.textures.len() {
            if let Some(info) = self.textures.get_mut(index) {
                info.observers.retain(|waiting| *waiting != observer);
            }
        }
    }

    /// Every id in the converter resolves to an entry holding that id
    pub fn is_consistent(&self) -> bool {
        self.id_converter.iter().all(|(&id, index)| {
            let stored = match index.kind {
                CacheKind::Local => self.textures.id_at(index.index),
                CacheKind::Texture => self.external_textures.id_at(index.index),
                CacheKind::Buffer => self.encoded_buffers.id_at(index.index),
            };
            stored == Some(id)
        }) && self.id_converter.len()
            == self.textures.len() + self.external_textures.len() + self.encoded_buffers.len()
    }
}

fn remove_from_bucket(buckets: &mut AHashMap<u64, SmallVec<[TextureId; 2]>>, hash: u64, id: TextureId) {
    if let Some(bucket) = buckets.get_mut(&hash) {
        bucket.retain(|candidate| *candidate != id);
        if bucket.is_empty() {
            buckets.remove(&hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cache: &mut TextureCacheManager, url: &str) -> TextureId {
        let id = cache.generate_texture_id();
        cache.append_cache(TextureInfo::new(id, VisualUrl::new(url), calculate_hash(url.as_bytes())))
    }

    #[test]
    fn last_reference_removes_idle_entry() {
        let mut cache = TextureCacheManager::new();
        let id = entry(&mut cache, "a.png");
        cache.get_mut(id).unwrap().reference_count = 2;

        cache.remove_cache(id);
        assert_eq!(cache.reference_count(id), 1);
        cache.remove_cache(id);
        assert!(cache.get(id).is_none());
        assert_eq!(cache.number_of_textures(), 0);
    }

    #[test]
    fn loading_entry_is_cancelled_not_removed() {
        let mut cache = TextureCacheManager::new();
        let id = entry(&mut cache, "a.png");
        cache.get_mut(id).unwrap().load_state = LoadState::Loading;

        cache.remove_cache(id);
        assert_eq!(cache.texture_state(id), LoadState::Cancelled);

        cache.remove_cache(id);
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn removal_patches_moved_entry() {
        let mut cache = TextureCacheManager::new();
        let first = entry(&mut cache, "a.png");
        let second = entry(&mut cache, "b.png");
        let third = entry(&mut cache, "c.png");

        cache.remove_cache(first);
        assert!(cache.is_consistent());
        assert_eq!(cache.visual_url(third).map(VisualUrl::url), Some("c.png"));
        assert_eq!(cache.visual_url(second).map(VisualUrl::url), Some("b.png"));
    }

    #[test]
    fn same_bytes_share_a_buffer() {
        let mut cache = TextureCacheManager::new();
        let bytes: Arc<[u8]> = Arc::from(&b"encoded"[..]);
        let first = cache.add_encoded_image_buffer(Arc::clone(&bytes));
        let second = cache.add_encoded_image_buffer(Arc::from(&b"encoded"[..]));
        assert_eq!(first, second);
        assert_eq!(cache.reference_count(first), 2);

        assert!(cache.remove_encoded_image_buffer(first).is_some());
        assert_eq!(cache.number_of_encoded_buffers(), 1);
        cache.remove_encoded_image_buffer(first);
        assert_eq!(cache.number_of_encoded_buffers(), 0);
    }

    #[test]
    fn buffer_url_entry_holds_a_buffer_reference() {
        let mut cache = TextureCacheManager::new();
        let buffer = cache.add_encoded_image_buffer(Arc::from(&b"png"[..]));
        let url = VisualUrl::create_buffer_url(&buffer.to_string(), "");
        let id = entry(&mut cache, &url);
        assert_eq!(cache.reference_count(buffer), 2);

        cache.remove_cache(id);
        assert_eq!(cache.reference_count(buffer), 1);
        assert!(cache.is_consistent());
    }

    #[test]
    fn external_textures_count_as_uploaded() {
        let mut cache = TextureCacheManager::new();
        let id = cache.add_external_texture(TextureSet::with_texture(Texture::solid_white(1)));
        assert_eq!(cache.texture_state(id), LoadState::Uploaded);
        assert!(cache.texture_set(id).is_some());
        cache.remove_cache(id);
        assert_eq!(cache.number_of_external_textures(), 0);
    }
}
