//! Image decoding and the asynchronous loader
//!
//! Decoding runs on a fixed pool of named worker threads fed through a
//! bounded job channel. Results come back on a result channel and are
//! drained by the owning thread, so no cache state is touched by workers.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::config::TextureConfig;
use crate::error::{TextureError, TextureResult};
use crate::pixel_buffer::PixelBuffer;
use crate::types::{FittingMode, ImageDimensions, SamplingMode, TextureId};

/// Where the encoded image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    File(PathBuf),
    Encoded(Arc<[u8]>),
    Remote(String),
    /// Url that names nothing loadable, such as a released buffer
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub texture_id: TextureId,
    pub source: ImageSource,
    pub desired_size: ImageDimensions,
    pub fitting_mode: FittingMode,
    pub sampling_mode: SamplingMode,
    pub orientation_correction: bool,
    /// Premultiply after decoding
    pub premultiply: bool,
    pub frame_index: u32,
}

#[derive(Debug, Clone)]
pub struct MaskRequest {
    pub texture_id: TextureId,
    pub pixel_buffer: PixelBuffer,
    pub mask: Arc<PixelBuffer>,
    pub content_scale: f32,
    pub crop_to_mask: bool,
    /// Premultiply once the mask is applied
    pub premultiply: bool,
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixel_buffer: PixelBuffer,
    pub frame_count: u32,
    pub frame_interval: Duration,
}

#[derive(Debug)]
pub struct LoadResult {
    pub texture_id: TextureId,
    pub result: TextureResult<DecodedImage>,
}

/// Turns encoded bytes into pixels
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, request: &LoadRequest) -> TextureResult<DecodedImage>;
}

/// Decoder for single frame images through the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDecoder;

impl ImageDecoder for PngDecoder {
    fn decode(&self, request: &LoadRequest) -> TextureResult<DecodedImage> {
        if request.frame_index > 0 {
            return Err(TextureError::UnsupportedFormat(format!(
                "frame {} of a single frame image",
                request.frame_index
            )));
        }

        let image = match &request.source {
            ImageSource::File(path) => {
                let bytes = std::fs::read(path)?;
                image::load_from_memory(&bytes)?
            }
            ImageSource::Encoded(bytes) => image::load_from_memory(bytes)?,
            ImageSource::Remote(url) => {
                return Err(TextureError::UnsupportedFormat(format!(
                    "remote image {url}"
                )));
            }
            ImageSource::Unavailable(url) => return Err(TextureError::InvalidUrl(url.clone())),
        };

        Ok(DecodedImage {
            pixel_buffer: PixelBuffer::from_image(image),
            frame_count: 1,
            frame_interval: Duration::ZERO,
        })
    }
}

/// Decodes `request` and applies its fitting and premultiplication
pub fn decode_image(decoder: &dyn ImageDecoder, request: &LoadRequest) -> TextureResult<DecodedImage> {
    let mut decoded = decoder.decode(request)?;
    decoded
        .pixel_buffer
        .fit(request.desired_size, request.fitting_mode, request.sampling_mode)?;
    if request.premultiply {
        decoded.pixel_buffer.premultiply();
    }
    Ok(decoded)
}

fn mask_image(request: MaskRequest) -> TextureResult<DecodedImage> {
    let MaskRequest {
        mut pixel_buffer,
        mask,
        content_scale,
        crop_to_mask,
        premultiply,
        ..
    } = request;
    pixel_buffer.apply_mask(&mask, content_scale, crop_to_mask)?;
    if premultiply {
        pixel_buffer.premultiply();
    }
    Ok(DecodedImage {
        pixel_buffer,
        frame_count: 1,
        frame_interval: Duration::ZERO,
    })
}

/// Loader the texture manager hands decode and mask jobs to
pub trait AsyncImageLoader {
    fn load(&mut self, request: LoadRequest);

    fn apply_mask(&mut self, request: MaskRequest);

    /// Results finished so far, without blocking
    fn poll_results(&mut self) -> Vec<LoadResult>;

    /// Blocks up to `timeout` for the next result
    fn wait_result(&mut self, timeout: Duration) -> Option<LoadResult>;

    /// Jobs sent whose results were not collected yet
    fn pending(&self) -> usize;
}

enum Job {
    Load(LoadRequest),
    Mask(MaskRequest),
    Shutdown,
}

pub struct ThreadPoolImageLoader {
    jobs: Sender<Job>,
    results: Receiver<LoadResult>,
    undelivered: Vec<LoadResult>,
    workers: Vec<JoinHandle<()>>,
    pending: usize,
}

impl ThreadPoolImageLoader {
    pub fn new(config: &TextureConfig, decoder: Arc<dyn ImageDecoder>) -> TextureResult<Self> {
        config.validate()?;

        let (job_sender, job_receiver) = crossbeam_channel::bounded::<Job>(config.load_queue_capacity);
        let (result_sender, result_receiver) = crossbeam_channel::unbounded();

        let mut workers = Vec::with_capacity(config.worker_threads);
        for index in 0..config.worker_threads {
            let jobs = job_receiver.clone();
            let results = result_sender.clone();
            let decoder = Arc::clone(&decoder);
            let handle = thread::Builder::new()
                .name(format!("lumen-texture-loader-{index}"))
                .spawn(move || worker_loop(jobs, results, decoder))?;
            workers.push(handle);
        }
        log::debug!("started {} image loader workers", workers.len());

        Ok(Self {
            jobs: job_sender,
            results: result_receiver,
            undelivered: Vec::new(),
            workers,
            pending: 0,
        })
    }

    fn send(&mut self, texture_id: TextureId, job: Job) {
        self.pending += 1;
        if self.jobs.send(job).is_err() {
            log::error!("image loader workers are gone, failing texture {texture_id}");
            self.undelivered.push(LoadResult {
                texture_id,
                result: Err(TextureError::LoaderClosed),
            });
        }
    }
}

impl AsyncImageLoader for ThreadPoolImageLoader {
    fn load(&mut self, request: LoadRequest) {
        self.send(request.texture_id, Job::Load(request));
    }

    fn apply_mask(&mut self, request: MaskRequest) {
        self.send(request.texture_id, Job::Mask(request));
    }

    fn poll_results(&mut self) -> Vec<LoadResult> {
        let mut results = std::mem::take(&mut self.undelivered);
        results.extend(self.results.try_iter());
        self.pending = self.pending.saturating_sub(results.len());
        results
    }

    fn wait_result(&mut self, timeout: Duration) -> Option<LoadResult> {
        if let Some(result) = self.undelivered.pop() {
            self.pending = self.pending.saturating_sub(1);
            return Some(result);
        }
        match self.results.recv_timeout(timeout) {
            Ok(result) => {
                self.pending = self.pending.saturating_sub(1);
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn pending(&self) -> usize {
        self.pending
    }
}

fn worker_loop(jobs: Receiver<Job>, results: Sender<LoadResult>, decoder: Arc<dyn ImageDecoder>) {
    while let Ok(job) = jobs.recv() {
        let result = match job {
            Job::Load(request) => LoadResult {
                texture_id: request.texture_id,
                result: decode_image(decoder.as_ref(), &request),
            },
            Job::Mask(request) => LoadResult {
                texture_id: request.texture_id,
                result: mask_image(request),
            },
            Job::Shutdown => break,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

impl Drop for ThreadPoolImageLoader {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.jobs.send(Job::Shutdown);
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("image loader worker panicked");
            }
        }
        log::debug!("image loader workers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Solid;

    impl ImageDecoder for Solid {
        fn decode(&self, _request: &LoadRequest) -> TextureResult<DecodedImage> {
            Ok(DecodedImage {
                pixel_buffer: PixelBuffer::new(
                    4,
                    4,
                    crate::pixel_buffer::PixelFormat::Rgba8,
                    vec![200; 64],
                )?,
                frame_count: 1,
                frame_interval: Duration::ZERO,
            })
        }
    }

    fn request(id: u32) -> LoadRequest {
        LoadRequest {
            texture_id: TextureId(id),
            source: ImageSource::Remote("unused".into()),
            desired_size: ImageDimensions::new(2, 2),
            fitting_mode: FittingMode::ShrinkToFit,
            sampling_mode: SamplingMode::Nearest,
            orientation_correction: true,
            premultiply: false,
            frame_index: 0,
        }
    }

    #[test]
    fn workers_return_every_result() {
        let config = TextureConfig {
            worker_threads: 2,
            ..Default::default()
        };
        let mut loader = ThreadPoolImageLoader::new(&config, Arc::new(Solid)).unwrap();
        for id in 0..5 {
            loader.load(request(id));
        }

        let mut ids = Vec::new();
        while ids.len() < 5 {
            let result = loader
                .wait_result(Duration::from_secs(5))
                .expect("worker result");
            assert_eq!(result.result.unwrap().pixel_buffer.dimensions(), (2, 2));
            ids.push(result.texture_id.0);
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn remote_sources_are_unsupported() {
        let err = decode_image(&PngDecoder, &request(1)).unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedFormat(_)));
    }
}
