// Error mapping unit tests
// Every component error collapses into a PipelineError with a fixed status.

use kasasagi::cache::CacheError;
use kasasagi::error::PipelineError;
use kasasagi::transform::ImageError;

// Test: Decode failures become 500s
#[test]
fn test_image_error_maps_to_internal() {
    let err: PipelineError = ImageError::decode_failed("bad huffman table").into();
    assert!(matches!(err, PipelineError::Internal { .. }));
    assert_eq!(err.to_http_status(), 500);
    assert!(err.to_string().contains("bad huffman table"));
}

// Test: Persist failures become 500s and keep the path in the message
#[test]
fn test_cache_error_maps_to_internal() {
    let err: PipelineError = CacheError::persist(
        "/cache/abc.jpg",
        std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    )
    .into();
    assert_eq!(err.to_http_status(), 500);
    assert!(err.to_string().contains("/cache/abc.jpg"));
    assert!(err.to_string().contains("disk full"));
}

// Test: Client errors keep their message verbatim
#[test]
fn test_client_error_messages() {
    assert_eq!(
        PipelineError::file_not_found("cat.jpg").to_string(),
        "File not found: cat.jpg"
    );
    assert_eq!(
        PipelineError::bad_request("Invalid Method").to_string(),
        "Invalid Method"
    );
}
