//! Single-frame sampling for remote analysis.
//!
//! A [`FrameGrabber`] pulls one decoded still out of a source file; the
//! [`FrameSampler`] scales it to the fixed analysis size and encodes it as
//! JPEG. Sampling never fails loudly: any problem yields `None` and the
//! caller skips analysis.

pub mod ffmpeg;
pub mod still;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::SamplerSettings;
use crate::error::SamplerError;

pub use ffmpeg::FfmpegFrameGrabber;
pub use still::StillImageGrabber;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// A user-selected video file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub path: PathBuf,
    pub file_name: Option<String>,
}

impl VideoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string());
        Self { path, file_name }
    }

    /// Opens a source, checking that the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SamplerError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SamplerError::SourceMissing(path.to_path_buf()));
        }
        Ok(Self::new(path))
    }
}

/// An encoded still ready for transmission.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl SampledFrame {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Pulls one decoded frame out of a source.
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    async fn grab(&self, source: &VideoSource) -> Result<DynamicImage, SamplerError>;
}

pub struct FrameSampler {
    grabber: Arc<dyn FrameGrabber>,
    width: u32,
    height: u32,
    quality: u8,
}

impl FrameSampler {
    pub fn new(grabber: Arc<dyn FrameGrabber>, settings: &SamplerSettings) -> Self {
        Self {
            grabber,
            width: settings.width,
            height: settings.height,
            quality: settings.quality,
        }
    }

    /// Sampler backed by ffmpeg, the default for video files.
    pub fn ffmpeg(settings: &SamplerSettings) -> Self {
        Self::new(Arc::new(FfmpegFrameGrabber::new(settings)), settings)
    }

    /// Captures one frame, or `None` when there is nothing to capture.
    #[tracing::instrument(name = "sampler.sample", skip_all)]
    pub async fn sample(&self, source: Option<&VideoSource>) -> Option<SampledFrame> {
        let Some(source) = source else {
            log::debug!("No video source loaded, skipping frame capture");
            return None;
        };

        let frame = match self.grabber.grab(source).await {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!(
                    "Frame capture failed for {}: {}",
                    source.path.display(),
                    e
                );
                return None;
            }
        };

        let (width, height, quality) = (self.width, self.height, self.quality);
        let encoded =
            tokio::task::spawn_blocking(move || encode_frame(&frame, width, height, quality)).await;

        match encoded {
            Ok(Ok(sampled)) => {
                log::debug!(
                    "Captured {}x{} frame ({} bytes) from {}",
                    sampled.width,
                    sampled.height,
                    sampled.bytes.len(),
                    source.path.display()
                );
                Some(sampled)
            }
            Ok(Err(e)) => {
                log::warn!("Frame encoding failed: {}", e);
                None
            }
            Err(e) => {
                log::error!("Frame encoding task failed: {}", e);
                None
            }
        }
    }
}

/// Stretches `frame` to exactly `width`x`height` and encodes it as JPEG.
pub fn encode_frame(
    frame: &DynamicImage,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<SampledFrame, SamplerError> {
    let resized = frame.resize_exact(width, height, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| SamplerError::Encode(e.to_string()))?;

    Ok(SampledFrame {
        bytes: buffer.into_inner(),
        mime_type: JPEG_MIME_TYPE,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    struct FailingGrabber;

    #[async_trait]
    impl FrameGrabber for FailingGrabber {
        async fn grab(&self, source: &VideoSource) -> Result<DynamicImage, SamplerError> {
            Err(SamplerError::SourceMissing(source.path.clone()))
        }
    }

    struct SolidGrabber;

    #[async_trait]
    impl FrameGrabber for SolidGrabber {
        async fn grab(&self, _source: &VideoSource) -> Result<DynamicImage, SamplerError> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                1920,
                1080,
                Rgb([200, 120, 40]),
            )))
        }
    }

    #[test]
    fn test_encode_frame_fixed_dimensions() {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 300, Rgb([10, 20, 30])));
        let sampled = encode_frame(&frame, 640, 360, 70).unwrap();

        assert_eq!(sampled.mime_type, "image/jpeg");
        assert_eq!((sampled.width, sampled.height), (640, 360));
        // JPEG SOI marker
        assert_eq!(&sampled.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&sampled.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (640, 360));
    }

    #[test]
    fn test_video_source_file_name() {
        let source = VideoSource::new("/videos/old reel.mp4");
        assert_eq!(source.file_name.as_deref(), Some("old reel.mp4"));

        let source = VideoSource::new("/");
        assert_eq!(source.file_name, None);
    }

    #[test]
    fn test_open_missing_source() {
        let result = VideoSource::open("/nonexistent/film.mp4");
        assert!(matches!(result, Err(SamplerError::SourceMissing(_))));
    }

    #[tokio::test]
    async fn test_sample_without_source_is_none() {
        let sampler = FrameSampler::new(Arc::new(SolidGrabber), &SamplerSettings::default());
        assert!(sampler.sample(None).await.is_none());
    }

    #[tokio::test]
    async fn test_sample_grab_failure_is_none() {
        let sampler = FrameSampler::new(Arc::new(FailingGrabber), &SamplerSettings::default());
        let source = VideoSource::new("/videos/missing.mp4");
        assert!(sampler.sample(Some(&source)).await.is_none());
    }

    #[tokio::test]
    async fn test_sample_encodes_frame() {
        let sampler = FrameSampler::new(Arc::new(SolidGrabber), &SamplerSettings::default());
        let source = VideoSource::new("/videos/reel.mp4");
        let frame = sampler.sample(Some(&source)).await.unwrap();
        assert_eq!((frame.width, frame.height), (640, 360));
        assert!(!frame.to_base64().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_samples_on_one_thread() {
        let sampler = FrameSampler::new(Arc::new(SolidGrabber), &SamplerSettings::default());
        let first = VideoSource::new("/videos/a.mp4");
        let second = VideoSource::new("/videos/b.mp4");

        let (a, b) = tokio::join!(sampler.sample(Some(&first)), sampler.sample(Some(&second)));
        assert_eq!(a.unwrap().bytes, b.unwrap().bytes);
    }
}
