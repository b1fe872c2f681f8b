//! Best-effort image compression before transfer.
//!
//! Oversized images are downscaled to fit `max_dimension` and re-encoded
//! as JPEG. Any failure falls back to the original bytes; videos and GIFs
//! always pass through untouched.

use bytes::Bytes;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use realtyfeed_protocol::MediaKind;
use tracing::{debug, warn};

/// Compression targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// Longest edge in pixels after downscaling.
    pub max_dimension: u32,
    /// Images at or below this size are sent as-is.
    pub threshold_bytes: u64,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_dimension: 1920,
            threshold_bytes: 1024 * 1024,
            jpeg_quality: 80,
        }
    }
}

/// Payload ready for transfer.
#[derive(Debug, Clone)]
pub struct Processed {
    pub bytes: Bytes,
    pub mime_type: String,
    /// `true` when `bytes` differ from the original.
    pub compressed: bool,
}

impl Processed {
    fn original(bytes: Bytes, mime_type: &str) -> Self {
        Self {
            bytes,
            mime_type: mime_type.to_string(),
            compressed: false,
        }
    }
}

/// Runs [`preprocess_blocking`] on the blocking pool.
pub async fn preprocess(
    kind: MediaKind,
    mime_type: &str,
    bytes: Bytes,
    config: &CompressionConfig,
) -> Processed {
    let task = tokio::task::spawn_blocking({
        let bytes = bytes.clone();
        let mime_type = mime_type.to_string();
        let config = config.clone();
        move || preprocess_blocking(kind, &mime_type, bytes, &config)
    });

    match task.await {
        Ok(processed) => processed,
        Err(e) => {
            warn!(error = %e, "compression task failed, sending original");
            Processed::original(bytes, mime_type)
        }
    }
}

/// Shrinks an image payload when it exceeds the configured targets.
pub fn preprocess_blocking(
    kind: MediaKind,
    mime_type: &str,
    bytes: Bytes,
    config: &CompressionConfig,
) -> Processed {
    if kind != MediaKind::Image
        || !config.enabled
        || mime_type.eq_ignore_ascii_case("image/gif")
        || bytes.len() as u64 <= config.threshold_bytes
    {
        return Processed::original(bytes, mime_type);
    }

    match compress_image(&bytes, config) {
        Ok(compressed) if compressed.len() < bytes.len() => {
            debug!(
                original = bytes.len(),
                compressed = compressed.len(),
                "image compressed"
            );
            Processed {
                bytes: Bytes::from(compressed),
                mime_type: "image/jpeg".into(),
                compressed: true,
            }
        }
        Ok(_) => Processed::original(bytes, mime_type),
        Err(e) => {
            warn!(error = %e, mime_type, "image compression failed, sending original");
            Processed::original(bytes, mime_type)
        }
    }
}

fn compress_image(data: &[u8], config: &CompressionConfig) -> image::ImageResult<Vec<u8>> {
    let mut img = image::load_from_memory(data)?;

    let max = config.max_dimension.max(1);
    if img.width() > max || img.height() > max {
        img = img.resize(max, max, FilterType::Triangle);
    }

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, config.jpeg_quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(out)
}
