//! Texture manager
//!
//! Turns load requests into cache entries, hands decode and mask jobs to the
//! asynchronous loader and notifies observers when textures are ready.
//!
//! Everything runs on the owning thread. Worker results are collected by
//! [`TextureManager::process`]. Observers are called with the manager lent
//! back to them; loads and removals they request while a texture is being
//! notified are queued and run once notification finishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::cache_manager::{CacheLookup, TextureCacheManager, TextureInfo};
use crate::config::TextureConfig;
use crate::error::{TextureError, TextureResult};
use crate::hash::{generate_hash, HashParameters};
use crate::load_state::{LoadEvent, LoadState};
use crate::loader::{
    decode_image, AsyncImageLoader, DecodedImage, ImageDecoder, ImageSource, LoadRequest,
    MaskRequest, PngDecoder, ThreadPoolImageLoader,
};
use crate::observer::{LifecycleObserver, TextureInformation, TextureUploadObserver};
use crate::pixel_buffer::{PixelBuffer, Texture, TextureSet, MASK_TEXTURE_INDEX};
use crate::types::{
    FittingMode, ImageDimensions, MultiplyOnLoad, ObserverId, ReloadPolicy, SamplingMode,
    StorageType, TextureId, UseAtlas,
};
use crate::visual_url::{ProtocolType, VisualUrl};

/// Id given to decodes that never enter the cache
const UNCACHED_LOAD_ID: TextureId = TextureId(u32::MAX);

/// Parameters of one texture load
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRequest {
    pub url: VisualUrl,
    pub desired_size: ImageDimensions,
    pub fitting_mode: FittingMode,
    pub sampling_mode: SamplingMode,
    pub use_atlas: UseAtlas,
    pub mask_texture_id: Option<TextureId>,
    pub content_scale: f32,
    pub crop_to_mask: bool,
    pub storage_type: StorageType,
    pub orientation_correction: bool,
    pub reload_policy: ReloadPolicy,
    pub multiply_on_load: MultiplyOnLoad,
    pub frame_index: u32,
    pub is_animated: bool,
    pub synchronous: bool,
}

impl TextureRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: VisualUrl::new(url),
            desired_size: ImageDimensions::ZERO,
            fitting_mode: FittingMode::default(),
            sampling_mode: SamplingMode::default(),
            use_atlas: UseAtlas::NoAtlas,
            mask_texture_id: None,
            content_scale: 1.0,
            crop_to_mask: false,
            storage_type: StorageType::UploadToTexture,
            orientation_correction: true,
            reload_policy: ReloadPolicy::Cached,
            multiply_on_load: MultiplyOnLoad::MultiplyOnLoad,
            frame_index: 0,
            is_animated: false,
            synchronous: false,
        }
    }

    pub fn with_size(mut self, desired_size: ImageDimensions) -> Self {
        self.desired_size = desired_size;
        self
    }

    pub fn with_mask(mut self, mask_texture_id: TextureId) -> Self {
        self.mask_texture_id = Some(mask_texture_id);
        self
    }

    pub fn synchronous(mut self) -> Self {
        self.synchronous = true;
        self
    }

    fn hash_parameters(&self) -> HashParameters {
        HashParameters {
            size: self.desired_size,
            fitting_mode: self.fitting_mode,
            sampling_mode: self.sampling_mode,
            use_atlas: self.use_atlas == UseAtlas::UseAtlas,
            mask_texture_id: self.mask_texture_id,
            crop_to_mask: self.crop_to_mask,
            frame_index: self.frame_index,
        }
    }

    fn lookup(&self) -> CacheLookup<'_> {
        CacheLookup {
            url: self.url.url(),
            size: self.desired_size,
            fitting_mode: self.fitting_mode,
            sampling_mode: self.sampling_mode,
            use_atlas: self.use_atlas == UseAtlas::UseAtlas,
            storage_type: self.storage_type,
            mask_texture_id: self.mask_texture_id,
            crop_to_mask: self.crop_to_mask,
            multiply_on_load: self.multiply_on_load,
            is_animated: self.is_animated,
            frame_index: self.frame_index,
        }
    }
}

/// Alpha mask attached to an image load
#[derive(Debug, Clone, PartialEq)]
pub struct MaskingData {
    pub alpha_mask_url: VisualUrl,
    /// Set by the manager once the mask is requested
    pub alpha_mask_id: Option<TextureId>,
    pub content_scale: f32,
    pub crop_to_mask: bool,
    /// Bake the mask into the image pixels instead of binding it as a second
    /// texture
    pub preapplied_masking: bool,
}

impl MaskingData {
    pub fn new(alpha_mask_url: impl Into<String>) -> Self {
        Self {
            alpha_mask_url: VisualUrl::new(alpha_mask_url),
            alpha_mask_id: None,
            content_scale: 1.0,
            crop_to_mask: true,
            preapplied_masking: true,
        }
    }
}

/// Outcome of [`TextureManager::load_texture`]
#[derive(Debug, Clone, Default)]
pub struct LoadedTexture {
    pub texture_id: Option<TextureId>,
    /// Present when the texture was already uploaded
    pub texture_set: Option<TextureSet>,
    /// The caller will be notified later
    pub loading: bool,
}

type QueueElement = (Option<TextureId>, Option<ObserverId>);

pub struct TextureManager {
    config: TextureConfig,
    cache: TextureCacheManager,
    loader: Box<dyn AsyncImageLoader>,
    decoder: Arc<dyn ImageDecoder>,
    /// A `None` slot is an observer lent out to its own callback
    observers: AHashMap<ObserverId, Option<Box<dyn TextureUploadObserver>>>,
    lifecycle_observers: Vec<(ObserverId, Box<dyn LifecycleObserver>)>,
    next_observer_id: u32,
    load_queue: Vec<QueueElement>,
    remove_queue: Vec<QueueElement>,
    /// Texture whose observers are being notified
    loading_queue_texture_id: Option<TextureId>,
    fallback_texture: Texture,
}

impl TextureManager {
    /// Manager decoding with the `image` crate on a worker pool
    pub fn new(config: TextureConfig) -> TextureResult<Self> {
        let decoder: Arc<dyn ImageDecoder> = Arc::new(PngDecoder);
        let loader = ThreadPoolImageLoader::new(&config, Arc::clone(&decoder))?;
        Self::with_loader(config, Box::new(loader), decoder)
    }

    pub fn with_loader(
        config: TextureConfig,
        loader: Box<dyn AsyncImageLoader>,
        decoder: Arc<dyn ImageDecoder>,
    ) -> TextureResult<Self> {
        config.validate()?;
        let fallback_texture = Self::create_fallback_texture(&config, decoder.as_ref());
        Ok(Self {
            config,
            cache: TextureCacheManager::new(),
            loader,
            decoder,
            observers: AHashMap::new(),
            lifecycle_observers: Vec::new(),
            next_observer_id: 0,
            load_queue: Vec::new(),
            remove_queue: Vec::new(),
            loading_queue_texture_id: None,
            fallback_texture,
        })
    }

    fn create_fallback_texture(config: &TextureConfig, decoder: &dyn ImageDecoder) -> Texture {
        let Some(url) = &config.broken_image_url else {
            return Texture::solid_white(config.fallback_texture_size);
        };
        let request = LoadRequest {
            texture_id: UNCACHED_LOAD_ID,
            source: ImageSource::File(PathBuf::from(url)),
            desired_size: ImageDimensions::ZERO,
            fitting_mode: FittingMode::default(),
            sampling_mode: SamplingMode::default(),
            orientation_correction: true,
            premultiply: config.premultiply_on_load,
            frame_index: 0,
        };
        match decode_image(decoder, &request) {
            Ok(decoded) => Texture::upload(&decoded.pixel_buffer),
            Err(err) => {
                log::warn!("broken image {url} failed to load: {err}");
                Texture::solid_white(config.fallback_texture_size)
            }
        }
    }

    #[inline]
    pub fn config(&self) -> &TextureConfig {
        &self.config
    }

    #[inline]
    pub fn cache(&self) -> &TextureCacheManager {
        &self.cache
    }

    /// Request with the configured premultiplication
    pub fn texture_request(&self, url: impl Into<String>) -> TextureRequest {
        let mut request = TextureRequest::new(url);
        request.multiply_on_load = if self.config.premultiply_on_load {
            MultiplyOnLoad::MultiplyOnLoad
        } else {
            MultiplyOnLoad::LoadWithoutMultiply
        };
        request
    }

    fn next_observer_id(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id = self.next_observer_id.wrapping_add(1);
        id
    }

    pub fn register_observer(&mut self, observer: Box<dyn TextureUploadObserver>) -> ObserverId {
        let id = self.next_observer_id();
        self.observers.insert(id, Some(observer));
        id
    }

    /// Forgets `observer` everywhere it waits. Returns it unless it is inside
    /// its own callback, in which case it is dropped when the callback ends.
    pub fn observer_destroyed(
        &mut self,
        observer: ObserverId,
    ) -> Option<Box<dyn TextureUploadObserver>> {
        self.cache.purge_observer(observer);
        for element in &mut self.load_queue {
            if element.1 == Some(observer) {
                *element = (None, None);
            }
        }
        self.observers.remove(&observer).flatten()
    }

    pub fn add_lifecycle_observer(&mut self, observer: Box<dyn LifecycleObserver>) -> ObserverId {
        let id = self.next_observer_id();
        self.lifecycle_observers.push((id, observer));
        id
    }

    pub fn remove_lifecycle_observer(
        &mut self,
        id: ObserverId,
    ) -> Option<Box<dyn LifecycleObserver>> {
        let position = self
            .lifecycle_observers
            .iter()
            .position(|(observer_id, _)| *observer_id == id)?;
        Some(self.lifecycle_observers.remove(position).1)
    }

    /// Loads an image as a texture, or resolves a `dali://` url to its
    /// external texture set.
    pub fn load_texture(
        &mut self,
        mut request: TextureRequest,
        mask: Option<&mut MaskingData>,
        observer: Option<ObserverId>,
    ) -> LoadedTexture {
        if request.url.protocol_type() == ProtocolType::Texture {
            let Ok(id) = request.url.resource_id() else {
                return LoadedTexture::default();
            };
            return match self.cache.external_texture_set(id) {
                Some(texture_set) => LoadedTexture {
                    texture_id: Some(id),
                    texture_set: Some(texture_set),
                    loading: false,
                },
                None => LoadedTexture::default(),
            };
        }

        request.use_atlas = UseAtlas::NoAtlas;
        request.storage_type = StorageType::UploadToTexture;
        self.attach_mask(&mut request, mask);

        let synchronous = request.synchronous;
        let Some(texture_id) = self.request_load_internal(&mut request, observer) else {
            return LoadedTexture::default();
        };

        let state = self.cache.texture_state(texture_id);
        let texture_set = if state == LoadState::Uploaded {
            self.cache.texture_set(texture_id)
        } else {
            None
        };
        let loading = !synchronous
            && (matches!(
                state,
                LoadState::Loading
                    | LoadState::WaitingForMask
                    | LoadState::MaskApplying
                    | LoadState::MaskApplied
                    | LoadState::NotStarted
            ) || self.loading_queue_texture_id.is_some());

        LoadedTexture {
            texture_id: Some(texture_id),
            texture_set,
            loading,
        }
    }

    fn attach_mask(&mut self, request: &mut TextureRequest, mask: Option<&mut MaskingData>) {
        request.mask_texture_id = None;
        request.content_scale = 1.0;
        request.crop_to_mask = false;

        let Some(mask) = mask else {
            return;
        };
        if !mask.alpha_mask_url.is_valid() {
            return;
        }

        let storage_type = if mask.preapplied_masking {
            StorageType::KeepPixelBuffer
        } else {
            StorageType::KeepTexture
        };
        mask.alpha_mask_id =
            self.request_mask_load(mask.alpha_mask_url.clone(), storage_type, request.synchronous);
        request.mask_texture_id = mask.alpha_mask_id;
        if mask.preapplied_masking {
            request.content_scale = mask.content_scale;
            request.crop_to_mask = mask.crop_to_mask;
        }
    }

    /// Loads one frame of an animated image
    pub fn load_animated_image_texture(
        &mut self,
        url: impl Into<String>,
        frame_index: u32,
        mask: Option<&mut MaskingData>,
        sampling_mode: SamplingMode,
        synchronous: bool,
        observer: Option<ObserverId>,
    ) -> LoadedTexture {
        let mut request = self.texture_request(url);
        request.frame_index = frame_index;
        request.is_animated = true;
        request.sampling_mode = sampling_mode;
        request.fitting_mode = FittingMode::ScaleToFill;

        if synchronous {
            return self.load_animated_frame_synchronously(&request, mask);
        }

        self.attach_mask(&mut request, mask);
        let Some(texture_id) = self.request_load_internal(&mut request, observer) else {
            return LoadedTexture::default();
        };
        let state = self.cache.texture_state(texture_id);
        LoadedTexture {
            texture_id: Some(texture_id),
            texture_set: self.cache.texture_set(texture_id),
            loading: state != LoadState::Uploaded,
        }
    }

    fn load_animated_frame_synchronously(
        &mut self,
        request: &TextureRequest,
        mask: Option<&mut MaskingData>,
    ) -> LoadedTexture {
        let mut decoded = match self.load_image_synchronously(request) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::error!("synchronous frame {} of {} failed: {err}", request.frame_index, request.url.url());
                return LoadedTexture::default();
            }
        };

        let mut mask_texture = None;
        if let Some(mask) = mask.filter(|mask| mask.alpha_mask_url.is_valid()) {
            let mut mask_request = TextureRequest::new(mask.alpha_mask_url.url());
            mask_request.fitting_mode = FittingMode::ScaleToFill;
            mask_request.sampling_mode = SamplingMode::NoFilter;
            match self.load_image_synchronously(&mask_request) {
                Ok(mask_image) if mask.preapplied_masking => {
                    if let Err(err) = decoded.pixel_buffer.apply_mask(
                        &mask_image.pixel_buffer,
                        mask.content_scale,
                        mask.crop_to_mask,
                    ) {
                        log::error!("mask not applied: {err}");
                    }
                }
                Ok(mask_image) => mask_texture = Some(Texture::upload(&mask_image.pixel_buffer)),
                Err(err) => log::error!("synchronous mask loading failed: {err}"),
            }
        }

        if request.multiply_on_load == MultiplyOnLoad::MultiplyOnLoad {
            decoded.pixel_buffer.premultiply();
        }
        let mut texture_set = TextureSet::with_texture(Texture::upload(&decoded.pixel_buffer));
        if let Some(mask_texture) = mask_texture {
            texture_set.set_texture(MASK_TEXTURE_INDEX, mask_texture);
        }
        LoadedTexture {
            texture_id: None,
            texture_set: Some(texture_set),
            loading: false,
        }
    }

    /// Loads pixels without uploading. Synchronous loads return them,
    /// asynchronous ones deliver them to `observer` and always reload.
    pub fn load_pixel_buffer(
        &mut self,
        mut request: TextureRequest,
        observer: Option<ObserverId>,
    ) -> Option<PixelBuffer> {
        if request.synchronous {
            if !request.url.is_valid() {
                return None;
            }
            return match self.load_image_synchronously(&request) {
                Ok(mut decoded) => {
                    if request.multiply_on_load == MultiplyOnLoad::MultiplyOnLoad {
                        decoded.pixel_buffer.premultiply();
                    }
                    Some(decoded.pixel_buffer)
                }
                Err(err) => {
                    log::warn!("synchronous pixel buffer {} failed: {err}", request.url.url());
                    None
                }
            };
        }

        request.mask_texture_id = None;
        request.content_scale = 1.0;
        request.use_atlas = UseAtlas::NoAtlas;
        request.crop_to_mask = false;
        request.storage_type = StorageType::ReturnPixelBuffer;
        request.reload_policy = ReloadPolicy::Forced;
        self.request_load_internal(&mut request, observer);
        None
    }

    /// Requests a texture upload. `None` when a synchronous load failed.
    ///
    /// When the texture comes from the cache or was loaded synchronously,
    /// `request.multiply_on_load` is updated to tell whether its pixels are
    /// premultiplied.
    pub fn request_load(
        &mut self,
        request: &mut TextureRequest,
        observer: Option<ObserverId>,
    ) -> Option<TextureId> {
        let mut upload = TextureRequest {
            storage_type: StorageType::UploadToTexture,
            frame_index: 0,
            is_animated: false,
            ..request.clone()
        };
        let texture_id = self.request_load_internal(&mut upload, observer);
        request.multiply_on_load = upload.multiply_on_load;
        texture_id
    }

    /// Loads an alpha mask, kept as pixels or as a texture
    pub fn request_mask_load(
        &mut self,
        url: VisualUrl,
        storage_type: StorageType,
        synchronous: bool,
    ) -> Option<TextureId> {
        let mut request = TextureRequest {
            url,
            fitting_mode: FittingMode::ScaleToFill,
            sampling_mode: SamplingMode::NoFilter,
            storage_type,
            multiply_on_load: MultiplyOnLoad::LoadWithoutMultiply,
            synchronous,
            ..TextureRequest::new("")
        };
        self.request_load_internal(&mut request, None)
    }

    pub fn request_load_internal(
        &mut self,
        request: &mut TextureRequest,
        observer: Option<ObserverId>,
    ) -> Option<TextureId> {
        let mut hash = 0;
        let mut cached = None;
        if request.storage_type != StorageType::ReturnPixelBuffer {
            hash = generate_hash(request.url.url(), &request.hash_parameters());
            cached = self.cache.find_cached_texture(hash, &request.lookup());
        }

        let texture_id = match cached {
            Some(id) => {
                if request.reload_policy == ReloadPolicy::Cached {
                    if let Some(info) = self.cache.get_mut(id) {
                        info.reference_count += 1;
                    }
                }
                id
            }
            None => {
                let id = self.cache.generate_texture_id();
                let mut info = TextureInfo::new(id, request.url.clone(), hash);
                info.desired_size = request.desired_size;
                info.content_scale = request.content_scale;
                info.fitting_mode = request.fitting_mode;
                info.sampling_mode = request.sampling_mode;
                info.use_atlas = request.use_atlas == UseAtlas::UseAtlas;
                info.crop_to_mask = request.crop_to_mask;
                info.premultiply_on_load = request.multiply_on_load == MultiplyOnLoad::MultiplyOnLoad;
                info.frame_index = request.frame_index;
                info.is_animated = request.is_animated;
                log::debug!("new texture {id} for {}", request.url.url());
                self.cache.append_cache(info)
            }
        };

        let info = self.cache.get_mut(texture_id)?;
        info.mask_texture_id = request.mask_texture_id;
        info.storage_type = request.storage_type;
        info.orientation_correction = request.orientation_correction;

        if request.reload_policy == ReloadPolicy::Forced {
            if let Ok(next) = info.load_state.transition(LoadEvent::ForceReload) {
                log::debug!("forced reload of texture {texture_id}");
                info.load_state = next;
            }
        }

        if request.synchronous {
            let loaded = self.load_synchronously(texture_id, request);
            if loaded.is_some() {
                self.report_premultiplied(texture_id, request);
            }
            return loaded;
        }

        let state = info.load_state;
        match state {
            LoadState::LoadFailed | LoadState::NotStarted => self.load_or_queue_texture(texture_id, observer),
            LoadState::Loading
            | LoadState::WaitingForMask
            | LoadState::MaskApplying
            | LoadState::MaskApplied => self.observe_texture(texture_id, observer),
            LoadState::Uploaded => {
                if observer.is_some() {
                    self.load_or_queue_texture(texture_id, observer);
                }
            }
            LoadState::Cancelled | LoadState::MaskCancelled => {
                // Still in flight, picked up again by this request
                if let Ok(next) = state.transition(LoadEvent::Resume) {
                    info.load_state = next;
                }
                self.observe_texture(texture_id, observer);
            }
            LoadState::LoadFinished => {
                if observer.is_some() && request.storage_type == StorageType::ReturnPixelBuffer {
                    self.load_or_queue_texture(texture_id, observer);
                }
            }
        }
        if cached.is_some() {
            self.report_premultiplied(texture_id, request);
        }
        Some(texture_id)
    }

    fn report_premultiplied(&self, texture_id: TextureId, request: &mut TextureRequest) {
        if let Some(info) = self.cache.get(texture_id) {
            request.multiply_on_load = if info.premultiplied {
                MultiplyOnLoad::MultiplyOnLoad
            } else {
                MultiplyOnLoad::LoadWithoutMultiply
            };
        }
    }

    fn load_synchronously(&mut self, texture_id: TextureId, request: &TextureRequest) -> Option<TextureId> {
        let state = self.cache.texture_state(texture_id);
        if matches!(state, LoadState::Uploaded | LoadState::LoadFinished) {
            return Some(texture_id);
        }
        self.advance(texture_id, LoadEvent::StartLoad);

        let decoded = match self.load_image_synchronously(request) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("synchronous load of {} failed: {err}", request.url.url());
                self.advance(texture_id, LoadEvent::Fail);
                self.request_remove(texture_id, None);
                return None;
            }
        };

        if request.storage_type == StorageType::KeepPixelBuffer {
            if let Some(info) = self.cache.get_mut(texture_id) {
                info.premultiplied = decoded.pixel_buffer.premultiplied;
                info.pixel_buffer = Some(Arc::new(decoded.pixel_buffer));
            }
            self.advance(texture_id, LoadEvent::Finish);
            return Some(texture_id);
        }

        let mut pixel_buffer = decoded.pixel_buffer;
        if let Some(mask_id) = request.mask_texture_id {
            match self.cache.get(mask_id) {
                Some(mask) if mask.storage_type == StorageType::KeepPixelBuffer => {
                    match &mask.pixel_buffer {
                        Some(mask_pixels) => {
                            if let Err(err) = pixel_buffer.apply_mask(
                                mask_pixels,
                                request.content_scale,
                                request.crop_to_mask,
                            ) {
                                log::error!("mask not applied to texture {texture_id}: {err}");
                            }
                        }
                        None => log::error!("mask {mask_id} has no cached pixels"),
                    }
                }
                Some(_) => {}
                None => log::error!("mask {mask_id} is not in the cache"),
            }
        }
        if request.multiply_on_load == MultiplyOnLoad::MultiplyOnLoad {
            pixel_buffer.premultiply();
        }
        self.upload_textures(texture_id, &pixel_buffer);
        Some(texture_id)
    }

    fn image_source(&self, url: &VisualUrl) -> ImageSource {
        match url.protocol_type() {
            ProtocolType::Local => ImageSource::File(PathBuf::from(url.url())),
            ProtocolType::Remote => ImageSource::Remote(url.url().to_string()),
            ProtocolType::Buffer => match url
                .resource_id()
                .ok()
                .and_then(|id| self.cache.encoded_image_buffer(id))
            {
                Some(bytes) => ImageSource::Encoded(bytes),
                None => ImageSource::Unavailable(url.url().to_string()),
            },
            ProtocolType::Texture => ImageSource::Unavailable(url.url().to_string()),
        }
    }

    fn load_image_synchronously(&self, request: &TextureRequest) -> TextureResult<DecodedImage> {
        let load = LoadRequest {
            texture_id: UNCACHED_LOAD_ID,
            source: self.image_source(&request.url),
            desired_size: request.desired_size,
            fitting_mode: request.fitting_mode,
            sampling_mode: request.sampling_mode,
            orientation_correction: request.orientation_correction,
            premultiply: false,
            frame_index: request.frame_index,
        };
        decode_image(self.decoder.as_ref(), &load)
    }

    /// Drops a reference to `texture_id` and stops `observer` waiting on it.
    /// While observers are being notified the removal is queued.
    pub fn request_remove(&mut self, texture_id: TextureId, observer: Option<ObserverId>) {
        let Some(info) = self.cache.get(texture_id) else {
            // External textures and buffers share the id space
            self.cache.remove_cache(texture_id);
            return;
        };

        let mask_texture_id = if info.load_state.is_cancelled() {
            None
        } else {
            info.mask_texture_id
        };
        log::debug!(
            "remove texture {texture_id} observer {observer:?} mask {mask_texture_id:?} state {}",
            info.load_state
        );

        if let Some(notifying) = self.loading_queue_texture_id {
            let queue_observer = if notifying == texture_id { None } else { observer };
            if let Some(element) = self
                .load_queue
                .iter_mut()
                .find(|element| **element == (Some(texture_id), observer))
            {
                *element = (None, None);
            }
            self.remove_queue.push((Some(texture_id), queue_observer));
            return;
        }

        if let Some(observer) = observer {
            if let Some(info) = self.cache.get_mut(texture_id) {
                if let Some(position) = info.observers.iter().position(|id| *id == observer) {
                    info.observers.remove(position);
                }
            }
        }
        self.cache.remove_cache(texture_id);
        if let Some(mask_texture_id) = mask_texture_id {
            self.cache.remove_cache(mask_texture_id);
        }
    }

    fn load_or_queue_texture(&mut self, texture_id: TextureId, observer: Option<ObserverId>) {
        let Some(info) = self.cache.get(texture_id) else {
            return;
        };
        let state = info.load_state;
        let returns_pixels = info.storage_type == StorageType::ReturnPixelBuffer;
        let notifying = self.loading_queue_texture_id.is_some();
        match state {
            LoadState::NotStarted | LoadState::LoadFailed => {
                if notifying {
                    self.load_queue.push((Some(texture_id), observer));
                } else {
                    self.start_load(texture_id, observer);
                }
            }
            LoadState::Uploaded => {
                if notifying {
                    self.load_queue.push((Some(texture_id), observer));
                } else if let Some(observer) = observer {
                    self.emit_load_complete(observer, texture_id, true);
                }
            }
            LoadState::LoadFinished if returns_pixels => {
                if notifying {
                    self.load_queue.push((Some(texture_id), observer));
                } else if let Some(observer) = observer {
                    self.emit_load_complete(observer, texture_id, true);
                }
            }
            _ => {}
        }
    }

    fn start_load(&mut self, texture_id: TextureId, observer: Option<ObserverId>) {
        self.advance(texture_id, LoadEvent::StartLoad);
        let Some(info) = self.cache.get(texture_id) else {
            return;
        };
        log::debug!("loading texture {texture_id} from {}", info.url.url());
        let request = LoadRequest {
            texture_id,
            source: self.image_source(&info.url),
            desired_size: info.desired_size,
            fitting_mode: info.fitting_mode,
            sampling_mode: info.sampling_mode,
            orientation_correction: info.orientation_correction,
            premultiply: info.premultiply_on_load && info.mask_texture_id.is_none(),
            frame_index: info.frame_index,
        };
        self.loader.load(request);
        self.observe_texture(texture_id, observer);
    }

    fn observe_texture(&mut self, texture_id: TextureId, observer: Option<ObserverId>) {
        if let (Some(observer), Some(info)) = (observer, self.cache.get_mut(texture_id)) {
            info.observers.push(observer);
        }
    }

    fn process_load_queue(&mut self) {
        for (texture_id, observer) in std::mem::take(&mut self.load_queue) {
            let Some(texture_id) = texture_id else {
                continue;
            };
            let Some(info) = self.cache.get(texture_id) else {
                continue;
            };
            let state = info.load_state;
            let returns_pixels = info.storage_type == StorageType::ReturnPixelBuffer;
            if state == LoadState::Uploaded || (state == LoadState::LoadFinished && returns_pixels) {
                if let Some(observer) = observer {
                    self.emit_load_complete(observer, texture_id, true);
                }
            } else if state == LoadState::Loading {
                self.observe_texture(texture_id, observer);
            } else {
                self.start_load(texture_id, observer);
            }
        }
    }

    fn process_remove_queue(&mut self) {
        for (texture_id, observer) in std::mem::take(&mut self.remove_queue) {
            if let Some(texture_id) = texture_id {
                self.request_remove(texture_id, observer);
            }
        }
    }

    /// Applies finished worker results. Returns how many were handled.
    pub fn process(&mut self) -> usize {
        let results = self.loader.poll_results();
        let count = results.len();
        for result in results {
            self.async_load_complete(result.texture_id, result.result);
        }
        count
    }

    /// Processes results until no job is pending or `timeout` passes
    pub fn wait_for_idle(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut handled = self.process();
        while self.loader.pending() > 0 {
            let now = Instant::now();
            if now >= deadline {
                log::warn!("{} image loads still pending", self.loader.pending());
                break;
            }
            if let Some(result) = self.loader.wait_result(deadline - now) {
                self.async_load_complete(result.texture_id, result.result);
                handled += 1;
            }
            handled += self.process();
        }
        handled
    }

    pub fn async_load_complete(&mut self, texture_id: TextureId, result: TextureResult<DecodedImage>) {
        let Some(info) = self.cache.get(texture_id) else {
            log::debug!("result for removed texture {texture_id} dropped");
            return;
        };
        log::debug!("texture {texture_id} {} finished in state {}", info.url.url(), info.load_state);
        if info.load_state.is_cancelled() {
            self.request_remove(texture_id, None);
        } else {
            self.post_load(texture_id, result);
        }
    }

    fn post_load(&mut self, texture_id: TextureId, result: TextureResult<DecodedImage>) {
        let decoded = match result {
            Ok(decoded) if decoded.pixel_buffer.width > 0 && decoded.pixel_buffer.height > 0 => decoded,
            Ok(_) => {
                self.load_failed(texture_id, &TextureError::Decode("empty image".to_string()));
                return;
            }
            Err(err) => {
                self.load_failed(texture_id, &err);
                return;
            }
        };

        let Some(info) = self.cache.get_mut(texture_id) else {
            return;
        };
        info.use_atlas = false;
        info.premultiplied = decoded.pixel_buffer.premultiplied;
        if info.is_animated {
            info.frame_count = decoded.frame_count;
            info.frame_interval = decoded.frame_interval;
        }
        let state = info.load_state;
        let storage_type = info.storage_type;
        let mask_texture_id = info.mask_texture_id;
        let pixel_buffer = decoded.pixel_buffer;

        if storage_type != StorageType::UploadToTexture {
            info.pixel_buffer = Some(Arc::new(pixel_buffer));
            self.advance(texture_id, LoadEvent::Finish);
            if storage_type == StorageType::ReturnPixelBuffer {
                self.notify_observers(texture_id, true);
            } else {
                self.check_for_waiting_texture(texture_id);
            }
            return;
        }

        let Some(mask_texture_id) = mask_texture_id.filter(|_| state != LoadState::Uploaded) else {
            self.upload_textures(texture_id, &pixel_buffer);
            self.notify_observers(texture_id, true);
            return;
        };

        if state == LoadState::MaskApplying {
            self.advance(texture_id, LoadEvent::MaskApplied);
            self.upload_textures(texture_id, &pixel_buffer);
            self.notify_observers(texture_id, true);
            return;
        }

        let mask_state = self.cache.texture_state(mask_texture_id);
        let mask_storage = self.cache.get(mask_texture_id).map(|mask| mask.storage_type);
        if let Some(info) = self.cache.get_mut(texture_id) {
            info.pixel_buffer = Some(Arc::new(pixel_buffer.clone()));
        }
        match mask_state {
            LoadState::Loading => self.advance(texture_id, LoadEvent::WaitForMask),
            LoadState::LoadFinished | LoadState::Uploaded => match mask_storage {
                Some(StorageType::KeepPixelBuffer) => {
                    if let Err(err) = self.apply_mask(texture_id, mask_texture_id) {
                        log::error!("{err}, texture {texture_id} is not masked");
                        self.upload_textures(texture_id, &pixel_buffer);
                        self.notify_observers(texture_id, true);
                    }
                }
                Some(StorageType::KeepTexture) => {
                    self.upload_textures(texture_id, &pixel_buffer);
                    self.notify_observers(texture_id, true);
                }
                _ => {}
            },
            _ => {
                log::error!("alpha mask {mask_texture_id} failed, texture {texture_id} is not masked");
                self.upload_textures(texture_id, &pixel_buffer);
                self.notify_observers(texture_id, true);
            }
        }
    }

    fn load_failed(&mut self, texture_id: TextureId, err: &TextureError) {
        log::warn!("texture {texture_id} failed to load: {err}");
        self.advance(texture_id, LoadEvent::Fail);
        let storage_type = self.cache.get(texture_id).map(|info| info.storage_type);
        if matches!(
            storage_type,
            Some(StorageType::KeepPixelBuffer | StorageType::KeepTexture)
        ) {
            self.check_for_waiting_texture(texture_id);
        } else {
            self.notify_observers(texture_id, false);
        }
    }

    /// Resumes textures waiting for the mask `mask_texture_id`
    pub fn check_for_waiting_texture(&mut self, mask_texture_id: TextureId) {
        let Some(mask) = self.cache.get(mask_texture_id) else {
            return;
        };
        if mask.load_state == LoadState::LoadFinished && mask.storage_type == StorageType::KeepTexture {
            if let Some(pixels) = mask.pixel_buffer.clone() {
                self.upload_textures(mask_texture_id, &pixels);
            }
        }
        let Some(mask) = self.cache.get(mask_texture_id) else {
            return;
        };
        let mask_state = mask.load_state;
        let mask_storage = mask.storage_type;
        log::debug!("checking textures waiting for mask {mask_texture_id} {}", mask.url.url());

        let waiting: Vec<TextureId> = self
            .cache
            .textures()
            .filter(|info| {
                info.mask_texture_id == Some(mask_texture_id)
                    && info.load_state == LoadState::WaitingForMask
            })
            .map(|info| info.texture_id)
            .collect();

        let mut notify_required = Vec::new();
        for texture_id in waiting {
            match mask_state {
                LoadState::LoadFinished => {
                    if mask_storage == StorageType::KeepPixelBuffer {
                        if let Err(err) = self.apply_mask(texture_id, mask_texture_id) {
                            log::error!("{err}, texture {texture_id} is not masked");
                        }
                    }
                }
                LoadState::Uploaded => {
                    if mask_storage == StorageType::KeepTexture {
                        self.upload_stored_pixels(texture_id);
                        self.retain_for_notification(texture_id, mask_texture_id);
                        notify_required.push(texture_id);
                    }
                }
                _ => {
                    log::error!("alpha mask {mask_texture_id} failed, texture {texture_id} is not masked");
                    self.upload_stored_pixels(texture_id);
                    self.retain_for_notification(texture_id, mask_texture_id);
                    notify_required.push(texture_id);
                }
            }
        }

        for &texture_id in &notify_required {
            if self.cache.get(texture_id).is_some() {
                self.notify_observers(texture_id, true);
            }
        }
        for texture_id in notify_required {
            self.request_remove(texture_id, None);
        }
    }

    fn retain_for_notification(&mut self, texture_id: TextureId, mask_texture_id: TextureId) {
        for id in [texture_id, mask_texture_id] {
            if let Some(info) = self.cache.get_mut(id) {
                info.reference_count += 1;
            }
        }
    }

    fn upload_stored_pixels(&mut self, texture_id: TextureId) {
        let pixels = self
            .cache
            .get(texture_id)
            .and_then(|info| info.pixel_buffer.clone());
        match pixels {
            Some(pixels) => self.upload_textures(texture_id, &pixels),
            None => self.advance(texture_id, LoadEvent::Upload),
        }
    }

    /// Sends the stored pixels of `texture_id` to a worker to be masked
    pub fn apply_mask(&mut self, texture_id: TextureId, mask_texture_id: TextureId) -> TextureResult<()> {
        let mask = self
            .cache
            .get(mask_texture_id)
            .and_then(|mask| mask.pixel_buffer.clone())
            .ok_or(TextureError::MaskUnavailable {
                mask_id: mask_texture_id,
            })?;

        let info = self
            .cache
            .get_mut(texture_id)
            .ok_or(TextureError::NotCached(texture_id))?;
        let state = info.load_state.transition(LoadEvent::StartMaskApply)?;
        let pixel_buffer = info
            .pixel_buffer
            .take()
            .ok_or(TextureError::NoPixelData(texture_id))?;
        info.load_state = state;
        log::debug!("applying mask {mask_texture_id} to texture {texture_id}");

        let request = MaskRequest {
            texture_id,
            pixel_buffer: Arc::try_unwrap(pixel_buffer).unwrap_or_else(|shared| (*shared).clone()),
            mask,
            content_scale: info.content_scale,
            crop_to_mask: info.crop_to_mask,
            premultiply: info.premultiply_on_load,
        };
        self.loader.apply_mask(request);
        Ok(())
    }

    /// Uploads `pixel_buffer` as the texture of `texture_id`. The state
    /// becomes uploaded even when nothing new is uploaded.
    pub fn upload_textures(&mut self, texture_id: TextureId, pixel_buffer: &PixelBuffer) {
        let Some(info) = self.cache.get_mut(texture_id) else {
            return;
        };
        if info.load_state != LoadState::Uploaded && !info.use_atlas {
            log::debug!("uploading texture {texture_id} {}x{}", pixel_buffer.width, pixel_buffer.height);
            info.premultiplied = pixel_buffer.premultiplied;
            info.texture = Some(Texture::upload(pixel_buffer));
            if info.storage_type == StorageType::UploadToTexture {
                info.pixel_buffer = None;
            }
        }
        self.advance(texture_id, LoadEvent::Upload);
    }

    /// Notifies the observers of `texture_id` first in first out. Requests
    /// made from the callbacks run afterwards, loads before removals.
    pub fn notify_observers(&mut self, texture_id: TextureId, success: bool) {
        self.loading_queue_texture_id = Some(texture_id);

        loop {
            let observer = match self.cache.get_mut(texture_id) {
                Some(info) if !info.observers.is_empty() => info.observers.remove(0),
                _ => break,
            };
            self.emit_load_complete(observer, texture_id, success);
        }

        self.loading_queue_texture_id = None;
        self.process_load_queue();
        self.process_remove_queue();

        let unobserved_pixels = self.cache.get(texture_id).is_some_and(|info| {
            info.storage_type == StorageType::ReturnPixelBuffer && info.observers.is_empty()
        });
        if unobserved_pixels {
            self.request_remove(texture_id, None);
        }
    }

    fn texture_information(&self, info: &TextureInfo) -> TextureInformation {
        if info.storage_type == StorageType::ReturnPixelBuffer {
            return TextureInformation::PixelBuffer {
                texture_id: info.texture_id,
                pixel_buffer: info.pixel_buffer.clone(),
                url: info.url.url().to_string(),
                premultiplied: info.premultiplied,
            };
        }

        let texture_set = self.cache.build_texture_set(info);
        if info.is_animated {
            TextureInformation::AnimatedImage {
                texture_id: info.texture_id,
                texture_set,
                frame_count: info.frame_count,
                frame_interval: info.frame_interval,
                premultiplied: info.premultiplied,
            }
        } else {
            TextureInformation::Texture {
                texture_id: info.texture_id,
                texture_set,
                use_atlas: info.use_atlas,
                premultiplied: info.premultiplied,
            }
        }
    }

    fn emit_load_complete(&mut self, observer: ObserverId, texture_id: TextureId, success: bool) {
        let Some(info) = self.cache.get(texture_id) else {
            return;
        };
        let information = self.texture_information(info);

        let Some(mut callback) = self.observers.get_mut(&observer).and_then(Option::take) else {
            log::warn!("observer {observer:?} is not available for texture {texture_id}");
            return;
        };
        callback.load_complete(self, success, information);

        // Gone if it was destroyed during its callback
        if let Some(slot) = self.observers.get_mut(&observer) {
            *slot = Some(callback);
        }
    }

    fn advance(&mut self, texture_id: TextureId, event: LoadEvent) {
        let Some(info) = self.cache.get_mut(texture_id) else {
            return;
        };
        match info.load_state.transition(event) {
            Ok(next) => {
                log::debug!("texture {texture_id}: {} -> {next}", info.load_state);
                info.load_state = next;
            }
            Err(err) => log::error!("texture {texture_id}: {err}"),
        }
    }

    pub fn texture_state(&self, texture_id: TextureId) -> LoadState {
        self.cache.texture_state(texture_id)
    }

    pub fn texture_set(&self, texture_id: TextureId) -> Option<TextureSet> {
        let set = self.cache.texture_set(texture_id);
        if set.is_none() {
            log::error!("texture {texture_id} has no uploaded texture set");
        }
        set
    }

    /// Texture set of `texture_id`, or the fallback texture when it is not
    /// uploaded
    pub fn texture_set_or_fallback(&self, texture_id: TextureId) -> TextureSet {
        self.cache
            .texture_set(texture_id)
            .filter(|set| !set.is_empty())
            .unwrap_or_else(|| TextureSet::with_texture(self.fallback_texture.clone()))
    }

    #[inline]
    pub fn fallback_texture(&self) -> &Texture {
        &self.fallback_texture
    }

    pub fn texture(&self, texture_id: TextureId) -> Option<&Texture> {
        self.cache.get(texture_id).and_then(|info| info.texture.as_ref())
    }

    pub fn visual_url(&self, texture_id: TextureId) -> Option<&VisualUrl> {
        self.cache.visual_url(texture_id)
    }

    /// Registers an application texture set, returns its `dali://` url
    pub fn add_external_texture(&mut self, texture_set: TextureSet) -> String {
        let id = self.cache.add_external_texture(texture_set);
        VisualUrl::create_texture_url(&id.to_string())
    }

    pub fn remove_external_texture(&mut self, url: &str) -> Option<TextureSet> {
        let url = VisualUrl::new(url);
        if url.protocol_type() != ProtocolType::Texture {
            return None;
        }
        let id = url.resource_id().ok()?;
        self.cache.remove_external_texture(id)
    }

    /// Registers encoded image bytes, returns their `enbuf://` url
    pub fn add_encoded_image_buffer(&mut self, buffer: impl Into<Arc<[u8]>>) -> String {
        let id = self.cache.add_encoded_image_buffer(buffer.into());
        VisualUrl::create_buffer_url(&id.to_string(), "")
    }

    pub fn remove_encoded_image_buffer(&mut self, url: &str) -> Option<Arc<[u8]>> {
        let url = VisualUrl::new(url);
        if url.protocol_type() != ProtocolType::Buffer {
            return None;
        }
        let id = url.resource_id().ok()?;
        self.cache.remove_encoded_image_buffer(id)
    }

    pub fn encoded_image_buffer(&self, url: &str) -> Option<Arc<[u8]>> {
        let id = VisualUrl::new(url).resource_id().ok()?;
        self.cache.encoded_image_buffer(id)
    }

    pub fn use_external_resource(&mut self, url: &str) {
        self.cache.use_external_resource(&VisualUrl::new(url));
    }
}

impl Drop for TextureManager {
    fn drop(&mut self) {
        for (_, observer) in &mut self.lifecycle_observers {
            observer.texture_manager_destroyed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let request = TextureRequest::new("a.png");
        assert_eq!(request.storage_type, StorageType::UploadToTexture);
        assert_eq!(request.reload_policy, ReloadPolicy::Cached);
        assert!(request.mask_texture_id.is_none());
        assert!(!request.synchronous);
    }

    #[test]
    fn requests_differing_in_mask_hash_apart() {
        let plain = TextureRequest::new("a.png");
        let masked = TextureRequest::new("a.png").with_mask(TextureId(4));
        assert_ne!(
            generate_hash(plain.url.url(), &plain.hash_parameters()),
            generate_hash(masked.url.url(), &masked.hash_parameters())
        );
    }
}
