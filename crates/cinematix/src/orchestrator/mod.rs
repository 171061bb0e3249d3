//! Remaster lifecycle: one operation at a time, driven by a spawned task.
//!
//! The orchestrator owns the state snapshot (a `watch` channel), the loaded
//! source and the handle of the in-flight operation. Every mutation made by an
//! operation task is checked against the current operation id, so a task that
//! is still winding down after being aborted cannot touch a newer operation.

pub mod handle;
pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::analysis::{FrameAnalysis, FrameAnalyzer};
use crate::broadcast::{OperationTracker, RemasterBroadcaster, RemasterEvent};
use crate::config::{AnalysisFallback, DownloadSettings, Settings};
use crate::error::DownloadError;
use crate::model::{OperationStatus, ProcessingStats, RemasterState};
use crate::preview::PreviewFilter;
use crate::sampler::{FrameSampler, VideoSource};

pub use handle::OperationHandle;
pub use progress::{
    FixedIncrements, IncrementFactory, IncrementSource, ProgressSimulator, RandomIncrements, Tick,
    ANALYZING_PROGRESS, COMPLETE_PROGRESS, PROCESSING_START_PROGRESS,
};

/// State shared between the orchestrator and its operation task.
struct Shared {
    state: watch::Sender<RemasterState>,
    sampler: FrameSampler,
    analyzer: Arc<dyn FrameAnalyzer>,
    increments: IncrementFactory,
    tick_interval: Duration,
    fallback: AnalysisFallback,
    broadcaster: RemasterBroadcaster,
}

impl Shared {
    /// Applies `f` only while `id` is still the current operation.
    fn update_if_current<F>(&self, id: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut RemasterState),
    {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if state.operation_id != Some(id) {
                return false;
            }
            f(state);
            applied = true;
            true
        });
        applied
    }

    /// Guarded status change; refuses transitions the lifecycle doesn't allow.
    fn transition<F>(&self, id: Uuid, next: OperationStatus, f: F) -> bool
    where
        F: FnOnce(&mut RemasterState),
    {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if state.operation_id != Some(id) {
                return false;
            }
            if !state.status.can_transition_to(next) {
                log::warn!(
                    "Operation {} refused transition {} -> {}",
                    id,
                    state.status,
                    next
                );
                return false;
            }
            state.status = next;
            f(state);
            applied = true;
            true
        });
        applied
    }
}

#[derive(Default)]
struct Session {
    source: Option<VideoSource>,
    current: Option<OperationHandle>,
}

/// Drives remaster operations and exposes their state.
///
/// Operation methods must be called from within a tokio runtime.
pub struct Orchestrator {
    shared: Arc<Shared>,
    session: Mutex<Session>,
    download: DownloadSettings,
}

pub struct OrchestratorBuilder {
    sampler: FrameSampler,
    analyzer: Arc<dyn FrameAnalyzer>,
    settings: Settings,
    increments: Option<IncrementFactory>,
    broadcaster: Option<RemasterBroadcaster>,
}

impl OrchestratorBuilder {
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Replaces the random progress increments, mainly for tests.
    pub fn increments(mut self, factory: IncrementFactory) -> Self {
        self.increments = Some(factory);
        self
    }

    pub fn broadcaster(mut self, broadcaster: RemasterBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn build(self) -> Orchestrator {
        let settings = self.settings;
        let increments = self
            .increments
            .unwrap_or_else(|| RandomIncrements::factory(settings.progress.max_increment));

        let initial = RemasterState {
            restoration: settings.restoration.clamped(),
            ..RemasterState::default()
        };
        let (state, _) = watch::channel(initial);

        Orchestrator {
            shared: Arc::new(Shared {
                state,
                sampler: self.sampler,
                analyzer: self.analyzer,
                increments,
                tick_interval: settings.progress.tick_interval(),
                fallback: settings.analysis.fallback,
                broadcaster: self.broadcaster.unwrap_or_default(),
            }),
            session: Mutex::new(Session::default()),
            download: settings.download,
        }
    }
}

impl Orchestrator {
    pub fn builder(sampler: FrameSampler, analyzer: Arc<dyn FrameAnalyzer>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            sampler,
            analyzer,
            settings: Settings::default(),
            increments: None,
            broadcaster: None,
        }
    }

    pub fn new(sampler: FrameSampler, analyzer: Arc<dyn FrameAnalyzer>, settings: &Settings) -> Self {
        Self::builder(sampler, analyzer).settings(settings).build()
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state snapshot.
    pub fn state(&self) -> RemasterState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change (coalesced).
    pub fn subscribe(&self) -> watch::Receiver<RemasterState> {
        self.shared.state.subscribe()
    }

    /// Receiver for per-operation progress events.
    pub fn events(&self) -> broadcast::Receiver<RemasterEvent> {
        self.shared.broadcaster.subscribe()
    }

    pub fn preview_filter(&self) -> Option<PreviewFilter> {
        let state = self.shared.state.borrow();
        PreviewFilter::for_config(&state.restoration, state.live_remaster)
    }

    /// Loads a new source, cancelling whatever was running and clearing results.
    pub fn load_source(&self, source: VideoSource) {
        let mut session = self.session();
        if let Some(previous) = session.current.take() {
            previous.cancel();
        }

        log::info!("Loaded source {}", source.path.display());
        let source_name = source.file_name.clone();
        session.source = Some(source);

        self.shared.state.send_modify(|state| {
            state.status = OperationStatus::Idle;
            state.progress = 0;
            state.stats = None;
            state.live_remaster = false;
            state.operation_id = None;
            state.source_name = source_name;
        });
    }

    /// Starts a remaster. Returns `false` (and does nothing) when no source is
    /// loaded or an operation already ran since the last reset.
    pub fn run_remaster(&self) -> bool {
        let mut session = self.session();
        let Some(source) = session.source.clone() else {
            log::debug!("Remaster requested without a source");
            return false;
        };

        let id = Uuid::new_v4();
        let started = self.shared.state.send_if_modified(|state| {
            if state.status != OperationStatus::Idle {
                return false;
            }
            state.status = OperationStatus::Analyzing;
            state.progress = ANALYZING_PROGRESS;
            state.live_remaster = false;
            state.operation_id = Some(id);
            true
        });
        if !started {
            log::debug!("Remaster requested while {}", self.shared.state.borrow().status);
            return false;
        }

        let tracker = self
            .shared
            .broadcaster
            .start_operation(id, source.file_name.as_deref());
        tracker.update(OperationStatus::Analyzing, ANALYZING_PROGRESS, "Sampling frame");
        log::info!("Starting remaster {} for {}", id, source.path.display());

        let task = tokio::spawn(run_operation(Arc::clone(&self.shared), id, source, tracker));
        if let Some(previous) = session.current.replace(OperationHandle::new(id, task)) {
            previous.cancel();
        }
        true
    }

    /// Back to Idle with progress 0. Stats and the loaded source are kept.
    pub fn reset_to_idle(&self) {
        let mut session = self.session();
        if let Some(previous) = session.current.take() {
            previous.cancel();
        }

        self.shared.state.send_modify(|state| {
            state.status = OperationStatus::Idle;
            state.progress = 0;
            state.live_remaster = false;
            state.operation_id = None;
        });
        log::debug!("Reset to idle");
    }

    /// Resolves once the current operation is no longer running.
    pub async fn wait_until_settled(&self) -> RemasterState {
        let mut rx = self.shared.state.subscribe();
        let settled = match rx.wait_for(|state| !state.status.is_busy()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Writes the original source bytes to `<output_dir>/<prefix><name>`.
    ///
    /// Returns `Ok(None)` when there is no source or a download is already
    /// being prepared.
    pub async fn download(&self, output_dir: &Path) -> Result<Option<PathBuf>, DownloadError> {
        let Some(source) = self.session().source.clone() else {
            log::debug!("Download requested without a source");
            return Ok(None);
        };

        let claimed = self.shared.state.send_if_modified(|state| {
            if state.downloading {
                return false;
            }
            state.downloading = true;
            true
        });
        if !claimed {
            return Ok(None);
        }

        tokio::time::sleep(self.download.delay()).await;
        let result = write_download(&source, output_dir, &self.download).await;

        self.shared.state.send_modify(|state| state.downloading = false);

        let path = result?;
        log::info!("Saved {}", path.display());
        Ok(Some(path))
    }

    pub fn set_denoise(&self, value: i64) {
        self.shared
            .state
            .send_modify(|state| state.restoration.set_denoise(value));
    }

    pub fn set_sharpness(&self, value: i64) {
        self.shared
            .state
            .send_modify(|state| state.restoration.set_sharpness(value));
    }

    pub fn toggle_upscale(&self) {
        self.shared
            .state
            .send_modify(|state| state.restoration.upscale = !state.restoration.upscale);
    }

    pub fn toggle_color_grade(&self) {
        self.shared
            .state
            .send_modify(|state| state.restoration.color_grade = !state.restoration.color_grade);
    }

    pub fn toggle_fps_boost(&self) {
        self.shared
            .state
            .send_modify(|state| state.restoration.fps_boost = !state.restoration.fps_boost);
    }
}

/// Output file name for a source: the configured prefix plus the source name,
/// or the fallback name when the source has none.
pub fn download_file_name(source_name: Option<&str>, settings: &DownloadSettings) -> String {
    let name = source_name
        .filter(|n| !n.is_empty())
        .unwrap_or(&settings.fallback_name);
    format!("{}{}", settings.prefix, name)
}

async fn write_download(
    source: &VideoSource,
    output_dir: &Path,
    settings: &DownloadSettings,
) -> Result<PathBuf, DownloadError> {
    let bytes = tokio::fs::read(&source.path)
        .await
        .map_err(|e| DownloadError::ReadOriginal {
            path: source.path.clone(),
            source: e,
        })?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| DownloadError::CreateDirectory {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    let target = output_dir.join(download_file_name(source.file_name.as_deref(), settings));
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|e| DownloadError::WriteFile {
            path: target.clone(),
            source: e,
        })?;

    Ok(target)
}

#[tracing::instrument(name = "remaster.operation", skip_all, fields(operation_id = %id))]
async fn run_operation(shared: Arc<Shared>, id: Uuid, source: VideoSource, tracker: OperationTracker) {
    let stats = match analyze(&shared, &source).await {
        Ok(stats) => stats,
        Err(message) => {
            if shared.transition(id, OperationStatus::Error, |_| {}) {
                tracker.failed(ANALYZING_PROGRESS, &message);
            }
            return;
        }
    };

    if let Some(stats) = &stats {
        tracker.analyzed(ANALYZING_PROGRESS, stats);
    }

    let entered = shared.transition(id, OperationStatus::Processing, |state| {
        state.stats = stats.clone();
        state.progress = PROCESSING_START_PROGRESS;
    });
    if !entered {
        return;
    }
    tracker.update(OperationStatus::Processing, PROCESSING_START_PROGRESS, "Remastering");

    let mut simulator = ProgressSimulator::new(PROCESSING_START_PROGRESS, (shared.increments)());
    let mut interval = tokio::time::interval(shared.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        match simulator.tick() {
            Tick::Advanced(progress) => {
                let applied = shared.update_if_current(id, |state| {
                    state.progress = state.progress.max(progress);
                });
                if !applied {
                    return;
                }
                tracker.update(OperationStatus::Processing, progress, "Remastering");
            }
            Tick::Finished => {
                let completed = shared.transition(id, OperationStatus::Completed, |state| {
                    state.progress = COMPLETE_PROGRESS;
                    state.live_remaster = true;
                });
                if completed {
                    log::info!("Remaster {} completed", id);
                    tracker.completed(stats.as_ref());
                }
                return;
            }
        }
    }
}

/// Samples a frame and analyzes it, applying the fallback policy.
///
/// `Err` carries the failure message when the policy is `Fail`.
async fn analyze(shared: &Shared, source: &VideoSource) -> Result<Option<ProcessingStats>, String> {
    let Some(frame) = shared.sampler.sample(Some(source)).await else {
        log::info!("No frame captured, skipping analysis");
        return Ok(None);
    };

    match shared.analyzer.analyze_frame(&frame).await {
        Ok(analysis) => {
            log::debug!(
                "Frame analysis: noise {:?}, sharpness {:?}, color health {:?}",
                analysis.noise_level,
                analysis.sharpness,
                analysis.color_health
            );
            Ok(Some(ProcessingStats::from_analysis(&analysis)))
        }
        Err(e) => match shared.fallback {
            AnalysisFallback::LeaveUnset => {
                log::warn!("Frame analysis failed, continuing without stats: {}", e);
                Ok(None)
            }
            AnalysisFallback::UseDefaults => {
                log::warn!("Frame analysis failed, using conservative defaults: {}", e);
                Ok(Some(ProcessingStats::from_analysis(
                    &FrameAnalysis::conservative_defaults(),
                )))
            }
            AnalysisFallback::Fail => {
                log::error!("Frame analysis failed: {}", e);
                Err(e.to_string())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_name() {
        let settings = DownloadSettings::default();
        assert_eq!(
            download_file_name(Some("reel.mp4"), &settings),
            "REMASTERED_reel.mp4"
        );
        assert_eq!(download_file_name(None, &settings), "REMASTERED_film.mp4");
        assert_eq!(download_file_name(Some(""), &settings), "REMASTERED_film.mp4");
    }

    #[test]
    fn test_custom_prefix() {
        let settings = DownloadSettings {
            prefix: "HD_".to_string(),
            ..DownloadSettings::default()
        };
        assert_eq!(download_file_name(Some("a.mov"), &settings), "HD_a.mov");
    }
}
