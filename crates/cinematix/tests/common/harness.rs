//! Test harness for isolated orchestrator runs.
//!
//! The `TestHarness` owns a temporary directory with:
//! - a `sources/` directory holding fake video files
//! - an `output/` directory for downloads

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use cinematix::analysis::FrameAnalyzer;
use cinematix::config::{AnalysisFallback, Settings};
use cinematix::orchestrator::{FixedIncrements, Orchestrator};
use cinematix::sampler::{FrameGrabber, FrameSampler, VideoSource};

use super::stubs::SolidFrameGrabber;

/// Bytes written into every fake source file.
pub const SOURCE_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake film reel";

pub struct TestHarness {
    temp_dir: TempDir,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub settings: Settings,
    /// Per-tick progress step used instead of random increments.
    pub step: f64,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source_dir = temp_dir.path().join("sources");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&source_dir).expect("Failed to create source dir");

        Self {
            temp_dir,
            source_dir,
            output_dir,
            settings: Settings::default(),
            step: 5.0,
        }
    }

    pub fn with_fallback(mut self, fallback: AnalysisFallback) -> Self {
        self.settings.analysis.fallback = fallback;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a fake video file and returns it as a source.
    pub fn source(&self, name: &str) -> VideoSource {
        let path = self.source_dir.join(name);
        std::fs::write(&path, SOURCE_BYTES).expect("Failed to write source file");
        VideoSource::new(path)
    }

    pub fn orchestrator(&self, analyzer: Arc<dyn FrameAnalyzer>) -> Orchestrator {
        self.orchestrator_with_grabber(Arc::new(SolidFrameGrabber), analyzer)
    }

    pub fn orchestrator_with_grabber(
        &self,
        grabber: Arc<dyn FrameGrabber>,
        analyzer: Arc<dyn FrameAnalyzer>,
    ) -> Orchestrator {
        let sampler = FrameSampler::new(grabber, &self.settings.sampler);
        Orchestrator::builder(sampler, analyzer)
            .settings(&self.settings)
            .increments(FixedIncrements::factory(self.step))
            .build()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
