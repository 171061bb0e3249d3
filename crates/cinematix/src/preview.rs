//! Visual filter applied to the preview once a remaster is live.

use serde::Serialize;

use crate::model::RestorationConfig;

const BRIGHTNESS: f32 = 1.15;
const CONTRAST: f32 = 1.1;
const SATURATE_GRADED: f32 = 1.4;
const SATURATE_PLAIN: f32 = 1.1;
const SEPIA: f32 = 0.05;
const GLOW: &str = "drop-shadow(0 0 15px rgba(6, 182, 212, 0.3))";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFilter {
    pub brightness: f32,
    pub contrast: f32,
    pub saturate: f32,
    pub sepia: f32,
    pub glow: &'static str,
}

impl PreviewFilter {
    /// Filter for the given config, or `None` while the remaster isn't live.
    pub fn for_config(config: &RestorationConfig, live: bool) -> Option<Self> {
        if !live {
            return None;
        }

        Some(Self {
            brightness: BRIGHTNESS,
            contrast: CONTRAST,
            saturate: if config.color_grade {
                SATURATE_GRADED
            } else {
                SATURATE_PLAIN
            },
            sepia: SEPIA,
            glow: GLOW,
        })
    }

    /// CSS `filter` property value.
    pub fn to_css(&self) -> String {
        format!(
            "brightness({}) contrast({}) saturate({}) sepia({}) {}",
            self.brightness, self.contrast, self.saturate, self.sepia, self.glow
        )
    }
}
