// Request pipeline module - turns a raw request into transformed image bytes
//
// Order of checks: source containment and existence, parameter validation,
// cache lookup. The populate step (read, decode, transform, encode) only runs
// on a cache miss.

use bytes::Bytes;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{source_extension, CacheKey, CacheStats, CacheStatus, CacheStore};
use crate::config::Config;
use crate::error::PipelineError;
use crate::security::resolve_source_path;
use crate::transform::{
    decode_jpeg, encode_jpeg, output_dimensions, transform, FastResampler, ImageConfig,
    RawTransformRequest, Resampler, TransformRequest, CONTENT_TYPE,
};

/// Encoded output of a request
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Bytes,
    pub status: CacheStatus,
    pub content_type: &'static str,
}

pub struct Pipeline {
    image_dir: PathBuf,
    image_config: ImageConfig,
    store: CacheStore,
    resampler: Arc<dyn Resampler>,
}

impl Pipeline {
    /// Pipeline over the local filesystem with the production resampler
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.storage.image_dir.clone(),
            config.image.clone(),
            CacheStore::new(config.storage.cache_dir.clone()),
            Arc::new(FastResampler::new()),
        )
    }

    pub fn new(
        image_dir: impl Into<PathBuf>,
        image_config: ImageConfig,
        store: CacheStore,
        resampler: Arc<dyn Resampler>,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            image_config,
            store,
            resampler,
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Transformed image as stored in the cache
    pub fn resolve_bytes(&self, raw: &RawTransformRequest) -> Result<ResolvedImage, PipelineError> {
        let started = Instant::now();

        let source_path = resolve_source_path(&self.image_dir, &raw.source_id)?;
        let request = TransformRequest::from_raw(raw, &self.image_config)?;

        let key = CacheKey::for_request(&request);
        let extension = source_extension(request.source_id());

        let lookup = self
            .store
            .get_or_create(&key, &extension, || self.render(&source_path, &request))?;

        tracing::info!(
            source_id = %request.source_id(),
            method = %request.method(),
            width = request.width(),
            height = request.height(),
            filter = %request.filter(),
            anchor = request.anchor().code(),
            cache = lookup.status.as_str(),
            size_bytes = lookup.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Image resolved"
        );

        Ok(ResolvedImage {
            bytes: lookup.bytes,
            status: lookup.status,
            content_type: CONTENT_TYPE,
        })
    }

    /// Transformed image, decoded
    pub fn resolve(&self, raw: &RawTransformRequest) -> Result<DynamicImage, PipelineError> {
        let resolved = self.resolve_bytes(raw)?;
        Ok(decode_jpeg(&resolved.bytes)?)
    }

    fn render(&self, source_path: &Path, request: &TransformRequest) -> Result<Vec<u8>, PipelineError> {
        let data = std::fs::read(source_path).map_err(|e| match e.kind() {
            // Removed between the existence check and the read
            std::io::ErrorKind::NotFound => PipelineError::file_not_found(request.source_id()),
            _ => PipelineError::internal(format!(
                "Failed to read {}: {}",
                source_path.display(),
                e
            )),
        })?;

        let source = decode_jpeg(&data)?;
        tracing::debug!(
            source_id = %request.source_id(),
            source_width = source.width(),
            source_height = source.height(),
            "Source decoded"
        );
        self.check_output_size(&source, request)?;

        let output = transform(
            source,
            request.method(),
            request.width(),
            request.height(),
            request.filter(),
            request.anchor(),
            self.resampler.as_ref(),
        )?;

        Ok(encode_jpeg(&output, self.image_config.jpeg_quality)?)
    }

    /// Reject derived sizes beyond the configured maximum before any
    /// buffer is allocated for them
    fn check_output_size(
        &self,
        source: &DynamicImage,
        request: &TransformRequest,
    ) -> Result<(), PipelineError> {
        let source_size = (source.width(), source.height());
        let (width, height) = output_dimensions(
            request.method(),
            source_size.0,
            source_size.1,
            request.width(),
            request.height(),
        );

        let limits = &self.image_config;
        // An unchanged source needs no new buffer
        if (width, height) != source_size
            && (width > limits.max_width || height > limits.max_height)
        {
            return Err(PipelineError::bad_request(format!(
                "Output {}x{} exceeds maximum {}x{}",
                width, height, limits.max_width, limits.max_height
            )));
        }
        Ok(())
    }
}
