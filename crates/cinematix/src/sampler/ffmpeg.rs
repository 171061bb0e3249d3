use std::process::Stdio;

use async_trait::async_trait;
use image::DynamicImage;

use super::{FrameGrabber, VideoSource};
use crate::config::SamplerSettings;
use crate::error::SamplerError;

/// Grabs a frame by piping a single PNG out of ffmpeg.
pub struct FfmpegFrameGrabber {
    ffmpeg_path: String,
    offset_secs: f64,
}

impl FfmpegFrameGrabber {
    pub fn new(settings: &SamplerSettings) -> Self {
        Self {
            ffmpeg_path: settings.ffmpeg_path.clone(),
            offset_secs: settings.offset_secs,
        }
    }

    fn args(&self, source: &VideoSource) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", self.offset_secs),
            "-i".to_string(),
            source.path.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "png".to_string(),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl FrameGrabber for FfmpegFrameGrabber {
    async fn grab(&self, source: &VideoSource) -> Result<DynamicImage, SamplerError> {
        if !source.path.exists() {
            return Err(SamplerError::SourceMissing(source.path.clone()));
        }

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(self.args(source))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(SamplerError::FfmpegUnavailable)?;

        if !output.status.success() {
            return Err(SamplerError::FfmpegFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(SamplerError::Decode(
                "ffmpeg produced no frame data".to_string(),
            ));
        }

        image::load_from_memory(&output.stdout).map_err(|e| SamplerError::Decode(e.to_string()))
    }
}
