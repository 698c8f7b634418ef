// Pipeline unit tests
// Source resolution, validation, cache behaviour and the transform methods,
// exercised through the public Pipeline API on a temporary directory tree.

use image::{DynamicImage, GenericImageView};
use rstest::rstest;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

use kasasagi::cache::{CacheStatus, CacheStore};
use kasasagi::error::PipelineError;
use kasasagi::pipeline::Pipeline;
use kasasagi::transform::{
    encode_jpeg, FastResampler, ImageConfig, ImageError, RawTransformRequest, ResampleFilter,
    Resampler,
};

/// Counts calls and delegates to the production resampler
#[derive(Default)]
struct CountingResampler {
    inner: FastResampler,
    calls: AtomicUsize,
}

impl CountingResampler {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Resampler for CountingResampler {
    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<DynamicImage, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(image, width, height, filter)
    }
}

struct Fixture {
    _images: TempDir,
    cache: TempDir,
    resampler: Arc<CountingResampler>,
    pipeline: Arc<Pipeline>,
}

/// Image root containing cat.jpg (500x300, left half red, right half blue)
fn fixture() -> Fixture {
    fixture_with_config(ImageConfig::default())
}

fn fixture_with_config(image_config: ImageConfig) -> Fixture {
    let images = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    let cat = DynamicImage::ImageRgb8(image::RgbImage::from_fn(500, 300, |x, _| {
        if x < 250 {
            image::Rgb([220, 20, 20])
        } else {
            image::Rgb([20, 20, 220])
        }
    }));
    std::fs::write(images.path().join("cat.jpg"), encode_jpeg(&cat, 95).unwrap()).unwrap();

    let resampler = Arc::new(CountingResampler::default());
    let pipeline = Arc::new(Pipeline::new(
        images.path(),
        image_config,
        CacheStore::new(cache.path()),
        resampler.clone(),
    ));

    Fixture {
        _images: images,
        cache,
        resampler,
        pipeline,
    }
}

fn request(method: i64, width: i64, height: i64) -> RawTransformRequest {
    RawTransformRequest {
        source_id: "cat.jpg".to_string(),
        method,
        width,
        height,
        ..Default::default()
    }
}

fn cache_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect()
        })
        .unwrap_or_default()
}

// Test: Fill 100x100 on a 500x300 source yields exactly 100x100
#[test]
fn test_fill_cat_to_square() {
    let f = fixture();
    let img = f.pipeline.resolve(&request(1, 100, 100)).unwrap();
    assert_eq!(img.dimensions(), (100, 100));
}

// Test: Output is identical on a second request and the resampler runs once
#[test]
fn test_cache_idempotence() {
    let f = fixture();
    let raw = request(1, 100, 100);

    let first = f.pipeline.resolve_bytes(&raw).unwrap();
    let second = f.pipeline.resolve_bytes(&raw).unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(f.resampler.calls(), 1);
    assert_eq!(cache_entries(f.cache.path()).len(), 1);
}

// Test: Resize (m=0) 100x100 on cat.jpg is 100x100, stored once and
// resampled once across two requests
#[test]
fn test_resize_cat_scenario() {
    let f = fixture();
    let raw = request(0, 100, 100);

    let first = f.pipeline.resolve_bytes(&raw).unwrap();
    let second = f.pipeline.resolve_bytes(&raw).unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(first.bytes, second.bytes);
    let img = image::load_from_memory(&second.bytes).unwrap();
    assert_eq!(img.dimensions(), (100, 100));
    assert_eq!(f.resampler.calls(), 1);
    assert_eq!(cache_entries(f.cache.path()).len(), 1);
}

// Test: Stored entry is named by a 64-char hex key plus the source extension
#[test]
fn test_cache_entry_layout() {
    let f = fixture();
    let resolved = f.pipeline.resolve_bytes(&request(0, 50, 50)).unwrap();

    let entries = cache_entries(f.cache.path());
    assert_eq!(entries.len(), 1);
    let name = &entries[0];
    let (key, ext) = name.split_at(64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(ext, ".jpg");

    let on_disk = std::fs::read(f.cache.path().join(name)).unwrap();
    assert_eq!(&on_disk[..], &resolved.bytes[..]);
}

// Test: Every parameter participates in the cache key
#[rstest]
#[case(request(0, 100, 100))]
#[case(request(1, 100, 100))]
#[case(request(2, 100, 100))]
#[case(request(1, 100, 50))]
#[case(request(1, 50, 100))]
#[case(RawTransformRequest { filter: 9, ..request(1, 100, 100) })]
#[case(RawTransformRequest { anchor: 4, ..request(1, 100, 100) })]
fn test_distinct_parameters_get_distinct_entries(#[case] other: RawTransformRequest) {
    let f = fixture();
    let base = RawTransformRequest {
        filter: 1,
        anchor: 1,
        ..request(1, 100, 100)
    };

    f.pipeline.resolve_bytes(&base).unwrap();
    let resolved = f.pipeline.resolve_bytes(&other).unwrap();

    assert_eq!(resolved.status, CacheStatus::Miss);
    assert_eq!(cache_entries(f.cache.path()).len(), 2);
}

// Test: Resize with one zero axis keeps the aspect ratio
#[rstest]
#[case(100, 0, (100, 60))]
#[case(0, 60, (100, 60))]
#[case(250, 150, (250, 150))]
#[case(0, 0, (500, 300))]
fn test_resize_dimensions(#[case] width: i64, #[case] height: i64, #[case] expected: (u32, u32)) {
    let f = fixture();
    let img = f.pipeline.resolve(&request(0, width, height)).unwrap();
    assert_eq!(img.dimensions(), expected);
}

// Test: Fit never exceeds the bounding box and never upscales
#[rstest]
#[case(100, 100, (100, 60))]
#[case(1000, 1000, (500, 300))]
#[case(0, 150, (250, 150))]
fn test_fit_dimensions(#[case] width: i64, #[case] height: i64, #[case] expected: (u32, u32)) {
    let f = fixture();
    let img = f.pipeline.resolve(&request(2, width, height)).unwrap();
    assert_eq!(img.dimensions(), expected);
}

// Test: Fill anchored left keeps the red half, anchored right keeps the blue half
#[test]
fn test_fill_respects_anchor() {
    let f = fixture();
    let left = f
        .pipeline
        .resolve(&RawTransformRequest {
            anchor: 4,
            ..request(1, 60, 60)
        })
        .unwrap()
        .to_rgb8();
    let right = f
        .pipeline
        .resolve(&RawTransformRequest {
            anchor: 5,
            ..request(1, 60, 60)
        })
        .unwrap()
        .to_rgb8();

    let left_px = left.get_pixel(30, 30);
    let right_px = right.get_pixel(30, 30);
    assert!(left_px[0] > left_px[2], "left anchor should be red: {:?}", left_px);
    assert!(right_px[2] > right_px[0], "right anchor should be blue: {:?}", right_px);
}

// Test: Validation boundaries
#[rstest]
#[case(RawTransformRequest { method: 3, ..request(0, 10, 10) }, "Invalid Method")]
#[case(RawTransformRequest { method: -1, ..request(0, 10, 10) }, "Invalid Method")]
#[case(RawTransformRequest { filter: 15, ..request(0, 10, 10) }, "Invalid resample filter: 15")]
#[case(RawTransformRequest { filter: -1, ..request(0, 10, 10) }, "Invalid resample filter: -1")]
#[case(RawTransformRequest { anchor: 9, ..request(0, 10, 10) }, "Invalid anchor: 9")]
fn test_invalid_parameters_are_bad_requests(
    #[case] raw: RawTransformRequest,
    #[case] message: &str,
) {
    let f = fixture();
    let err = f.pipeline.resolve_bytes(&raw).unwrap_err();
    assert_eq!(err, PipelineError::bad_request(message));
    assert_eq!(err.to_http_status(), 400);
    assert!(cache_entries(f.cache.path()).is_empty());
}

// Test: Highest valid codes are accepted
#[rstest]
#[case(2, 14, 8)]
#[case(0, 0, 0)]
fn test_boundary_codes_are_accepted(#[case] method: i64, #[case] filter: i64, #[case] anchor: i64) {
    let f = fixture();
    let raw = RawTransformRequest {
        filter,
        anchor,
        ..request(method, 40, 40)
    };
    assert!(f.pipeline.resolve_bytes(&raw).is_ok());
}

// Test: Method is reported before filter and anchor
#[test]
fn test_method_error_reported_first() {
    let f = fixture();
    let raw = RawTransformRequest {
        filter: 99,
        anchor: 99,
        ..request(7, 10, 10)
    };
    assert_eq!(
        f.pipeline.resolve_bytes(&raw).unwrap_err(),
        PipelineError::bad_request("Invalid Method")
    );
}

// Test: Dimensions outside the configured limits are rejected
#[test]
fn test_dimension_limits() {
    let f = fixture_with_config(ImageConfig {
        max_width: 200,
        max_height: 200,
        ..ImageConfig::default()
    });

    assert!(f.pipeline.resolve_bytes(&request(0, 200, 200)).is_ok());

    let too_wide = f.pipeline.resolve_bytes(&request(0, 201, 10)).unwrap_err();
    assert_eq!(too_wide.to_http_status(), 400);

    let negative = f.pipeline.resolve_bytes(&request(0, 10, -1)).unwrap_err();
    assert_eq!(negative.to_http_status(), 400);
}

// Test: A derived axis above the configured maximum is rejected before
// resampling and nothing is cached
#[rstest]
#[case::resize_derived_height(0, 400, 0)]
#[case::fill_zero_axis(1, 400, 0)]
fn test_derived_dimension_limits(#[case] method: i64, #[case] width: i64, #[case] height: i64) {
    let f = fixture_with_config(ImageConfig {
        max_width: 400,
        max_height: 400,
        ..ImageConfig::default()
    });
    let narrow = DynamicImage::ImageRgb8(image::RgbImage::new(4, 400));
    std::fs::write(
        f._images.path().join("narrow.jpg"),
        encode_jpeg(&narrow, 90).unwrap(),
    )
    .unwrap();

    let raw = RawTransformRequest {
        source_id: "narrow.jpg".to_string(),
        ..request(method, width, height)
    };
    let err = f.pipeline.resolve_bytes(&raw).unwrap_err();

    assert_eq!(err.to_http_status(), 400);
    assert_eq!(err.to_string(), "Output 400x40000 exceeds maximum 400x400");
    assert_eq!(f.resampler.calls(), 0);
    assert!(cache_entries(f.cache.path()).is_empty());
}

// Test: Fill on an extreme aspect ratio stays within the requested box
#[test]
fn test_fill_extreme_aspect_within_limits() {
    let f = fixture_with_config(ImageConfig {
        max_width: 400,
        max_height: 400,
        ..ImageConfig::default()
    });
    let narrow = DynamicImage::ImageRgb8(image::RgbImage::new(4, 400));
    std::fs::write(
        f._images.path().join("narrow.jpg"),
        encode_jpeg(&narrow, 90).unwrap(),
    )
    .unwrap();

    let raw = RawTransformRequest {
        source_id: "narrow.jpg".to_string(),
        ..request(1, 400, 4)
    };
    let img = f.pipeline.resolve(&raw).unwrap();
    assert_eq!(img.dimensions(), (400, 4));
}

// Test: Asking for the unchanged source is allowed even when it is larger
// than the configured maximum
#[test]
fn test_unchanged_source_passes_limits() {
    let f = fixture_with_config(ImageConfig {
        max_width: 100,
        max_height: 100,
        ..ImageConfig::default()
    });
    let img = f.pipeline.resolve(&request(0, 0, 0)).unwrap();
    assert_eq!(img.dimensions(), (500, 300));
    assert_eq!(f.resampler.calls(), 0);
}

// Test: Missing source yields FileNotFound and writes nothing
#[test]
fn test_missing_source() {
    let f = fixture();
    let raw = RawTransformRequest {
        source_id: "dog.jpg".to_string(),
        ..request(0, 10, 10)
    };
    let err = f.pipeline.resolve_bytes(&raw).unwrap_err();
    assert_eq!(err.to_string(), "File not found: dog.jpg");
    assert_eq!(err.to_http_status(), 404);
    assert!(cache_entries(f.cache.path()).is_empty());
    assert_eq!(f.resampler.calls(), 0);
}

// Test: Empty source identifier is FileNotFound
#[test]
fn test_empty_source_id() {
    let f = fixture();
    let raw = RawTransformRequest {
        source_id: String::new(),
        ..request(0, 10, 10)
    };
    assert_eq!(f.pipeline.resolve_bytes(&raw).unwrap_err().to_http_status(), 404);
}

// Test: Identifiers escaping the image directory are rejected
#[rstest]
#[case("../cat.jpg")]
#[case("/etc/passwd")]
#[case("sub/../../cat.jpg")]
fn test_path_traversal_rejected(#[case] source_id: &str) {
    let f = fixture();
    let raw = RawTransformRequest {
        source_id: source_id.to_string(),
        ..request(0, 10, 10)
    };
    let err = f.pipeline.resolve_bytes(&raw).unwrap_err();
    assert_eq!(err.to_http_status(), 400);
    assert_eq!(err.to_string(), format!("Invalid file name: {}", source_id));
}

// Test: Concurrent identical misses run one transform and leave one file
#[test]
fn test_concurrent_identical_misses() {
    let f = fixture();
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let pipeline = Arc::clone(&f.pipeline);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                pipeline.resolve_bytes(&request(1, 120, 80)).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(f.resampler.calls(), 1);
    assert!(results.windows(2).all(|w| w[0].bytes == w[1].bytes));
    assert_eq!(
        results.iter().filter(|r| r.status == CacheStatus::Miss).count(),
        1
    );

    let entries = cache_entries(f.cache.path());
    assert_eq!(entries.len(), 1);
    let stored = std::fs::read(f.cache.path().join(&entries[0])).unwrap();
    assert_eq!(&stored[..], &results[0].bytes[..]);
}

// Test: Concurrent requests for different keys all complete
#[test]
fn test_concurrent_distinct_keys() {
    let f = fixture();
    let handles: Vec<_> = (1..=6)
        .map(|i| {
            let pipeline = Arc::clone(&f.pipeline);
            thread::spawn(move || pipeline.resolve(&request(0, 20 * i, 0)).unwrap())
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(f.resampler.calls(), 6);
    assert_eq!(cache_entries(f.cache.path()).len(), 6);
}

// Test: Statistics track hits and misses
#[test]
fn test_cache_stats() {
    let f = fixture();
    f.pipeline.resolve_bytes(&request(0, 30, 30)).unwrap();
    f.pipeline.resolve_bytes(&request(0, 30, 30)).unwrap();
    f.pipeline.resolve_bytes(&request(0, 40, 40)).unwrap();

    let stats = f.pipeline.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert!(stats.bytes_written > 0);
}
