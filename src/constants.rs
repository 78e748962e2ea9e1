pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Long-edge cap applied before re-encoding.
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;
/// Output size safeguard; the encoder keeps iterating while the payload is larger.
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_PASSES: u8 = 10;
/// Per-pass JPEG quality multiplier once the payload is over the size cap.
pub const PASS_QUALITY_FACTOR: f32 = 0.9;
/// Per-pass scale applied to each side when quality alone cannot shrink the payload.
pub const PASS_SCALE_FACTOR: f32 = 0.9;

// Decode-time limits
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 20_000;

pub const OXIPNG_PRESET: u8 = 2;
pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;

// Intake traversal caps
pub const DEFAULT_MAX_WALK_DEPTH: usize = 32;
pub const DEFAULT_MAX_INTAKE_FILES: usize = 10_000;

// Batch memory planning
pub const LARGE_IMAGE_THRESHOLD_MIB: f64 = 50.0;
pub const MAX_CONCURRENT_LARGE_IMAGES: usize = 2;
pub const MIN_AVAILABLE_MEMORY_MIB: u64 = 256;

pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
pub const FALLBACK_EXTENSION: &str = "bin";
pub const OUTPUT_PREFIX: &str = "compressed_";
pub const ARCHIVE_NAME: &str = "img-shrink-images.zip";
pub const ARCHIVE_MIME: &str = "application/zip";

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

// Common output message prefixes
pub const ORIGINAL_SIZE_PREFIX: &str = "📊";
pub const COMPRESSED_SIZE_PREFIX: &str = "📈";
pub const SUCCESS_PREFIX: &str = "✅";
pub const WARNING_PREFIX: &str = "⚠️";
pub const ERROR_PREFIX: &str = "❌";
pub const INFO_PREFIX: &str = "📋";
