// Constants module - centralized default values for configuration
//
// Every default used by `config` lives here so the YAML defaults, the
// built-in fallback config and the tests agree on one value.

// =============================================================================
// Server defaults
// =============================================================================

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default listen address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

// =============================================================================
// Storage defaults
// =============================================================================

/// Default directory holding source images
pub const DEFAULT_IMAGE_DIR: &str = "input";

/// Default directory holding transformed images
pub const DEFAULT_CACHE_DIR: &str = "_cache";

// =============================================================================
// Image defaults
// =============================================================================

/// Default maximum output width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 4096;

/// Default maximum output height in pixels
pub const DEFAULT_MAX_HEIGHT: u32 = 4096;

/// Default JPEG quality (1-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

// =============================================================================
// Request parameter defaults (used when a query parameter is absent)
// =============================================================================

/// Resize
pub const DEFAULT_METHOD: i64 = 0;

/// Nearest-neighbor
pub const DEFAULT_FILTER: i64 = 0;

/// Center
pub const DEFAULT_ANCHOR: i64 = 0;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log output format ("json" or "pretty")
pub const DEFAULT_LOG_FORMAT: &str = "json";
