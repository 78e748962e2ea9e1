use crate::cancel::CancelToken;
use crate::constants::{
    DEFAULT_MAX_DIMENSION, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_MAX_PASSES, DEFAULT_QUALITY,
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, MAX_FILE_SIZE, MAX_IMAGE_DIMENSION,
    MAX_QUALITY, MIN_QUALITY, OXIPNG_PRESET, PASS_QUALITY_FACTOR, PASS_SCALE_FACTOR,
    ZOPFLI_ITERATIONS,
};
use crate::error::{CompressionError, Result};
use crate::formats::ImageKind;
use crate::record::SourceFile;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use oxipng::{Deflaters, Options};
use std::fmt;
use std::num::NonZeroU8;
use std::sync::Arc;
use tracing::debug;

/// Global compression quality, validated to `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Result<Self> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&value) {
            return Err(CompressionError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl TryFrom<u8> for Quality {
    type Error = CompressionError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Limits applied to every pipeline run.
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    /// Long-edge cap in pixels; `None` keeps the decoded size.
    pub max_dimension: Option<u32>,
    pub max_output_bytes: u64,
    pub max_passes: u8,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_dimension: Some(DEFAULT_MAX_DIMENSION),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl CompressionOptions {
    /// Builds options from optional overrides. A dimension of `0` disables the
    /// long-edge cap; passes are clamped to at least one.
    pub fn new(
        max_dimension: Option<u32>,
        max_output_bytes: Option<u64>,
        max_passes: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            max_dimension: match max_dimension {
                Some(0) => None,
                Some(d) => Some(d),
                None => defaults.max_dimension,
            },
            max_output_bytes: max_output_bytes.unwrap_or(defaults.max_output_bytes),
            max_passes: max_passes.unwrap_or(defaults.max_passes).max(1),
        }
    }
}

/// Result of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct CompressedOutput {
    pub payload: Arc<[u8]>,
    pub preview: Arc<str>,
    pub kind: ImageKind,
}

impl CompressedOutput {
    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}

/// Encodes bytes as a `data:` URL, the displayable preview form.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
}

/// Compresses one source at `quality`:
/// decode -> cap long edge -> encode -> shrink until under the size cap
pub fn compress_source(
    source: &SourceFile,
    quality: Quality,
    options: &CompressionOptions,
    cancel: &CancelToken,
) -> Result<CompressedOutput> {
    cancel.check()?;

    let kind = ImageKind::from_mime(&source.mime)
        .ok_or_else(|| CompressionError::UnsupportedFormat(source.mime.clone()))?;

    if source.size > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(source.size, MAX_FILE_SIZE));
    }

    let mut img = decode_image(&source.bytes, kind)?;
    resize_to_fit(&mut img, options.max_dimension);

    let mut pass_quality = quality.get();
    let mut payload = encode_image(&img, kind, pass_quality)?;
    let mut passes = 1;

    while payload.len() as u64 > options.max_output_bytes && passes < options.max_passes {
        cancel.check()?;

        if kind.is_lossy() && pass_quality > MIN_QUALITY {
            pass_quality = next_pass_quality(pass_quality);
        } else {
            shrink_image(&mut img);
        }
        payload = encode_image(&img, kind, pass_quality)?;
        passes += 1;

        debug!(
            "{}: pass {} produced {} bytes (quality {}, {}x{})",
            source.name,
            passes,
            payload.len(),
            pass_quality,
            img.width(),
            img.height()
        );
    }

    if payload.is_empty() {
        return Err(CompressionError::EmptyOutput);
    }

    let preview = data_url(kind.mime_type(), &payload);
    Ok(CompressedOutput {
        payload: Arc::from(payload),
        preview: Arc::from(preview),
        kind,
    })
}

/// Decodes in-memory bytes, rejecting dimensions over [`MAX_IMAGE_DIMENSION`].
pub fn decode_image(bytes: &[u8], kind: ImageKind) -> Result<DynamicImage> {
    let img = image::load_from_memory_with_format(bytes, kind.to_image_format())?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok(img)
}

/// Caps the long edge at `max_dimension`, preserving aspect ratio. Never upscales.
pub fn resize_to_fit(img: &mut DynamicImage, max_dimension: Option<u32>) {
    let Some(max) = max_dimension.filter(|&m| m > 0) else {
        return;
    };
    if img.width() <= max && img.height() <= max {
        return;
    }

    let (before_w, before_h) = img.dimensions();
    *img = img.resize(max, max, FilterType::Lanczos3);
    debug!(
        "Resized {}x{} to {}x{}",
        before_w,
        before_h,
        img.width(),
        img.height()
    );
}

fn shrink_image(img: &mut DynamicImage) {
    let width = ((img.width() as f32 * PASS_SCALE_FACTOR) as u32).max(1);
    let height = ((img.height() as f32 * PASS_SCALE_FACTOR) as u32).max(1);
    *img = img.resize_exact(width, height, FilterType::Lanczos3);
}

fn next_pass_quality(quality: u8) -> u8 {
    let next = (quality as f32 * PASS_QUALITY_FACTOR) as u8;
    next.clamp(MIN_QUALITY, quality.saturating_sub(1).max(MIN_QUALITY))
}

/// Re-encodes `img` as `kind`. Quality drives the JPEG encoder directly and
/// the lossy WebP encoder, and picks the oxipng deflater for PNG.
pub fn encode_image(img: &DynamicImage, kind: ImageKind, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match kind {
        ImageKind::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            rgb.write_with_encoder(encoder)?;
        }
        ImageKind::Png => {
            img.write_with_encoder(PngEncoder::new(&mut buffer))?;
            buffer = optimize_png(&buffer, quality)?;
        }
        ImageKind::WebP => {
            buffer = encode_webp(img, quality)?;
        }
    }

    Ok(buffer)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| CompressionError::WebPEncoding(e.to_string()))?;
    let memory = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| CompressionError::WebPEncoding(format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

fn optimize_png(data: &[u8], quality: u8) -> Result<Vec<u8>> {
    let mut options = Options::from_preset(OXIPNG_PRESET);

    if quality >= 90 {
        options.deflate = Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        };
    } else if quality >= 70 {
        options.deflate = Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        };
    } else {
        options.deflate = Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        };
    }

    oxipng::optimize_from_memory(data, &options)
        .map_err(|e| CompressionError::PngOptimization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn encoded_source(name: &str, img: &DynamicImage, kind: ImageKind) -> SourceFile {
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, kind.to_image_format()).unwrap();
        SourceFile::new(name, kind.mime_type(), bytes.into_inner())
    }

    #[test]
    fn test_quality_validation() {
        assert_eq!(Quality::new(1).unwrap().get(), 1);
        assert_eq!(Quality::new(100).unwrap().get(), 100);
        assert!(matches!(
            Quality::new(0),
            Err(CompressionError::InvalidQuality(0))
        ));
        assert!(matches!(
            Quality::try_from(101),
            Err(CompressionError::InvalidQuality(101))
        ));
        assert_eq!(Quality::default().get(), 80);
    }

    #[test]
    fn test_compression_options_new() {
        let options = CompressionOptions::new(None, None, None);
        assert_eq!(options.max_dimension, Some(1920));
        assert_eq!(options.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
        assert_eq!(options.max_passes, DEFAULT_MAX_PASSES);

        let options = CompressionOptions::new(Some(0), Some(1024), Some(0));
        assert_eq!(options.max_dimension, None);
        assert_eq!(options.max_output_bytes, 1024);
        assert_eq!(options.max_passes, 1);
    }

    #[test]
    fn test_resize_to_fit_caps_long_edge() {
        let mut img = DynamicImage::new_rgb8(4000, 2000);
        resize_to_fit(&mut img, Some(1920));
        assert_eq!(img.dimensions(), (1920, 960));

        let mut img = DynamicImage::new_rgb8(1000, 3000);
        resize_to_fit(&mut img, Some(1500));
        assert_eq!(img.dimensions(), (500, 1500));
    }

    #[test]
    fn test_resize_to_fit_never_upscales() {
        let mut img = DynamicImage::new_rgb8(800, 600);
        resize_to_fit(&mut img, Some(1920));
        assert_eq!(img.dimensions(), (800, 600));

        let mut img = DynamicImage::new_rgb8(4000, 2000);
        resize_to_fit(&mut img, None);
        assert_eq!(img.dimensions(), (4000, 2000));
    }

    #[test]
    fn test_next_pass_quality_always_decreases() {
        assert_eq!(next_pass_quality(80), 72);
        assert_eq!(next_pass_quality(5), 4);
        assert_eq!(next_pass_quality(2), 1);
        assert_eq!(next_pass_quality(1), 1);
    }

    #[test]
    fn test_compress_source_keeps_format() {
        let img = gradient(64, 48);
        let options = CompressionOptions::default();
        let cancel = CancelToken::new();

        for kind in [ImageKind::Jpeg, ImageKind::Png, ImageKind::WebP] {
            let source = encoded_source("sample", &img, kind);
            let output =
                compress_source(&source, Quality::new(75).unwrap(), &options, &cancel).unwrap();

            assert!(!output.payload.is_empty());
            assert_eq!(output.kind, kind);
            assert_eq!(
                image::guess_format(&output.payload).unwrap(),
                kind.to_image_format()
            );
            assert!(output
                .preview
                .starts_with(&format!("data:{};base64,", kind.mime_type())));
        }
    }

    #[test]
    fn test_compress_source_caps_dimensions() {
        let img = gradient(300, 100);
        let source = encoded_source("wide.png", &img, ImageKind::Png);
        let options = CompressionOptions::new(Some(150), None, None);

        let output = compress_source(
            &source,
            Quality::default(),
            &options,
            &CancelToken::new(),
        )
        .unwrap();

        let decoded = image::load_from_memory_with_format(&output.payload, ImageFormat::Png)
            .unwrap();
        assert_eq!(decoded.dimensions(), (150, 50));
    }

    #[test]
    fn test_compress_source_iterates_towards_size_cap() {
        let img = gradient(256, 256);
        let source = encoded_source("big.jpg", &img, ImageKind::Jpeg);
        let unbounded = compress_source(
            &source,
            Quality::new(95).unwrap(),
            &CompressionOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();

        let capped_options = CompressionOptions::new(None, Some(2 * 1024), Some(10));
        let capped = compress_source(
            &source,
            Quality::new(95).unwrap(),
            &capped_options,
            &CancelToken::new(),
        )
        .unwrap();

        assert!(capped.payload.len() < unbounded.payload.len());
    }

    #[test]
    fn test_webp_quality_changes_output() {
        let img = gradient(128, 128);
        let source = encoded_source("photo.webp", &img, ImageKind::WebP);
        let options = CompressionOptions::default();
        let cancel = CancelToken::new();

        let low = compress_source(&source, Quality::new(10).unwrap(), &options, &cancel).unwrap();
        let high = compress_source(&source, Quality::new(95).unwrap(), &options, &cancel).unwrap();

        assert!(low.payload.len() < high.payload.len());
        assert_eq!(image::guess_format(&low.payload).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_compress_source_rejects_garbage() {
        let source = SourceFile::new("broken.jpg", "image/jpeg", b"fake jpg data".to_vec());
        let result = compress_source(
            &source,
            Quality::default(),
            &CompressionOptions::default(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(CompressionError::ImageProcessing(_))));
    }

    #[test]
    fn test_compress_source_rejects_unsupported_mime() {
        let source = SourceFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let result = compress_source(
            &source,
            Quality::default(),
            &CompressionOptions::default(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(CompressionError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_compress_source_honours_cancel() {
        let img = gradient(16, 16);
        let source = encoded_source("tiny.png", &img, ImageKind::Png);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = compress_source(
            &source,
            Quality::default(),
            &CompressionOptions::default(),
            &cancel,
        );
        assert!(matches!(result, Err(CompressionError::Cancelled)));
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }
}
