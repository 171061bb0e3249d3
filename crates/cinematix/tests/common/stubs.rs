//! Stand-ins for the frame grabber and the analysis service.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use cinematix::analysis::{FrameAnalysis, FrameAnalyzer};
use cinematix::error::{AnalysisError, SamplerError};
use cinematix::sampler::{FrameGrabber, SampledFrame, VideoSource};

/// Returns a solid grey frame regardless of the source contents.
pub struct SolidFrameGrabber;

#[async_trait]
impl FrameGrabber for SolidFrameGrabber {
    async fn grab(&self, _source: &VideoSource) -> Result<DynamicImage, SamplerError> {
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            160,
            120,
            Rgb([90, 90, 90]),
        )))
    }
}

/// Behaves like a source whose frames can't be decoded.
pub struct BrokenFrameGrabber;

#[async_trait]
impl FrameGrabber for BrokenFrameGrabber {
    async fn grab(&self, _source: &VideoSource) -> Result<DynamicImage, SamplerError> {
        Err(SamplerError::Decode("corrupt stream".to_string()))
    }
}

pub fn analysis(noise: f64, sharpness: f64, color: f64) -> FrameAnalysis {
    FrameAnalysis {
        noise_level: Some(noise),
        sharpness: Some(sharpness),
        color_health: Some(color),
        grain_type: Some("fine".to_string()),
        advice: None,
    }
}

/// Analyzer with a canned answer, an optional delay and a call counter.
pub struct StubAnalyzer {
    answer: Option<FrameAnalysis>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubAnalyzer {
    pub fn answering(analysis: FrameAnalysis) -> Self {
        Self {
            answer: Some(analysis),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with a 503.
    pub fn failing() -> Self {
        Self {
            answer: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameAnalyzer for StubAnalyzer {
    async fn analyze_frame(&self, frame: &SampledFrame) -> Result<FrameAnalysis, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!((frame.width, frame.height), (640, 360));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.answer.clone().ok_or_else(|| AnalysisError::Status {
            status: 503,
            body: "model overloaded".to_string(),
        })
    }
}
