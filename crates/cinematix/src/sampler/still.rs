use async_trait::async_trait;
use image::DynamicImage;

use super::{FrameGrabber, VideoSource};
use crate::error::SamplerError;

/// Treats the source file itself as the frame (PNG, JPEG, ...).
#[derive(Debug, Default)]
pub struct StillImageGrabber;

impl StillImageGrabber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FrameGrabber for StillImageGrabber {
    async fn grab(&self, source: &VideoSource) -> Result<DynamicImage, SamplerError> {
        let data = tokio::fs::read(&source.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SamplerError::SourceMissing(source.path.clone())
            } else {
                SamplerError::ReadSource {
                    path: source.path.clone(),
                    source: e,
                }
            }
        })?;

        image::load_from_memory(&data).map_err(|e| SamplerError::Decode(e.to_string()))
    }
}
