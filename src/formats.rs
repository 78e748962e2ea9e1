/// Image kind handling and MIME mapping
///
/// Every accepted input is one of three kinds, and the compressed output always
/// keeps the kind of its input.
use crate::constants::{FALLBACK_EXTENSION, SUPPORTED_MIME_TYPES};
use crate::error::{CompressionError, Result};
use image::ImageFormat;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// JPEG, lossy, quality-driven
    Jpeg,
    /// PNG, lossless, optimized with oxipng
    Png,
    /// WebP, lossy encoder driven by quality
    WebP,
}

impl ImageKind {
    /// Resolves a MIME string. Matching is by prefix, so parameters such as
    /// `image/jpeg; charset=binary` still resolve.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with(SUPPORTED_MIME_TYPES[0]) {
            Some(ImageKind::Jpeg)
        } else if mime.starts_with(SUPPORTED_MIME_TYPES[1]) {
            Some(ImageKind::Png)
        } else if mime.starts_with(SUPPORTED_MIME_TYPES[2]) {
            Some(ImageKind::WebP)
        } else {
            None
        }
    }

    /// Resolves a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => SUPPORTED_MIME_TYPES[0],
            ImageKind::Png => SUPPORTED_MIME_TYPES[1],
            ImageKind::WebP => SUPPORTED_MIME_TYPES[2],
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::WebP => "webp",
        }
    }

    /// Whether the encoder takes the quality setting directly.
    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageKind::Jpeg | ImageKind::WebP)
    }

    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::WebP => ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageKind::Jpeg => "JPEG",
            ImageKind::Png => "PNG",
            ImageKind::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ImageKind {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageKind::Jpeg),
            "png" => Ok(ImageKind::Png),
            "webp" => Ok(ImageKind::WebP),
            _ => Err(CompressionError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// True if the MIME string is one the intake accepts.
pub fn is_supported_mime(mime: &str) -> bool {
    ImageKind::from_mime(mime).is_some()
}

/// MIME type the intake assigns to a path, if it is an accepted image.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    ImageKind::from_path(path).map(|kind| kind.mime_type())
}

/// Output extension for a MIME type, `bin` for anything unrecognized.
pub fn extension_for_mime(mime: &str) -> &'static str {
    ImageKind::from_mime(mime)
        .map(|kind| kind.extension())
        .unwrap_or(FALLBACK_EXTENSION)
}
