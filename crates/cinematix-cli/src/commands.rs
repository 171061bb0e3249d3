//! Command implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;

use cinematix::analysis::generation::wait_for_video;
use cinematix::analysis::FrameAnalyzer;
use cinematix::config::AnalysisFallback;
use cinematix::model::{OperationStatus, RemasterState};
use cinematix::{KeySelector, Orchestrator, PreviewFilter, RemasterEvent, VideoSource};

use crate::state::AppState;

pub struct RunOptions {
    pub input: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub no_download: bool,
    pub still: bool,
    pub fallback: Option<AnalysisFallback>,
    pub json: bool,
}

pub async fn run(app: &AppState, options: RunOptions) -> Result<()> {
    let source = VideoSource::open(&options.input)
        .with_context(|| format!("Cannot open {}", options.input.display()))?;

    let mut settings = app.settings.clone();
    if let Some(fallback) = options.fallback {
        settings.analysis.fallback = fallback;
    }

    if !app.keys.has_selected_api_key() {
        log::warn!("No API key configured, frame analysis will fail (see `cinematix key set`)");
    }

    let analyzer: Arc<dyn FrameAnalyzer> = Arc::new(app.client()?);
    let orchestrator = Orchestrator::new(app.sampler(options.still), analyzer, &settings);
    orchestrator.load_source(source);

    let mut events = orchestrator.events();
    let mut state_rx = orchestrator.subscribe();
    if !orchestrator.run_remaster() {
        bail!("Remaster did not start");
    }

    let bar = progress_bar()?;
    loop {
        let state = state_rx.borrow_and_update().clone();
        bar.set_position(u64::from(state.progress));
        bar.set_message(state.status.to_string());
        if !state.status.is_busy() {
            break;
        }
        if state_rx.changed().await.is_err() {
            break;
        }
    }
    bar.finish_and_clear();

    let state = orchestrator.state();
    match state.status {
        OperationStatus::Completed => {}
        OperationStatus::Error => {
            let reason = last_error(&mut events).unwrap_or_else(|| "unknown error".to_string());
            bail!("Remaster failed: {}", reason);
        }
        other => bail!("Remaster stopped in state {}", other),
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_summary(&state, orchestrator.preview_filter().as_ref());
    }

    if options.no_download {
        return Ok(());
    }

    let output_dir = match options.output_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Preparing download...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    let saved = orchestrator.download(&output_dir).await;
    spinner.finish_and_clear();

    if let Some(path) = saved? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg:<10} [{bar:40.cyan/blue}] {pos:>3}%")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

fn last_error(events: &mut broadcast::Receiver<RemasterEvent>) -> Option<String> {
    let mut error = None;
    while let Ok(event) = events.try_recv() {
        if event.error.is_some() {
            error = event.error;
        }
    }
    error
}

fn print_summary(state: &RemasterState, filter: Option<&PreviewFilter>) {
    println!(
        "Remastered {}",
        state.source_name.as_deref().unwrap_or("source")
    );
    match &state.stats {
        Some(stats) => {
            println!("  Noise level:       {}%", stats.noise_level);
            println!("  Resolution:        {}", stats.estimated_resolution);
            println!("  Dynamic range:     {}", stats.dynamic_range);
            println!("  Frame health:      {}%", stats.frame_health);
        }
        None => println!("  No analysis available"),
    }
    if let Some(filter) = filter {
        println!("  Preview filter:    {}", filter.to_css());
    }
}

pub fn key_status(app: &AppState) {
    let selected = app.keys.has_selected_api_key();
    println!("API key configured: {}", if selected { "yes" } else { "no" });
    if let Some(path) = app.keys.key_file() {
        println!("Key file: {}", path.display());
    }
    if let Some(path) = &app.settings_path {
        println!("Settings: {}", path.display());
    }
}

pub fn key_set(app: &AppState, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let path = app.keys.store(&key)?;
        println!("Stored key in {}", path.display());
        return Ok(());
    }

    if !app.keys.open_select_key()? {
        bail!("No key entered");
    }
    println!("API key stored");
    Ok(())
}

pub struct GenerateOptions {
    pub input: PathBuf,
    pub prompt: String,
    pub still: bool,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

pub async fn generate(app: &AppState, options: GenerateOptions) -> Result<()> {
    let source = VideoSource::open(&options.input)
        .with_context(|| format!("Cannot open {}", options.input.display()))?;

    let Some(frame) = app.sampler(options.still).sample(Some(&source)).await else {
        bail!("Could not capture a frame from {}", options.input.display());
    };

    let client = app.client()?;
    let operation = client.start_video_generation(&options.prompt, &frame).await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Generating ({})", operation.name));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let finished = wait_for_video(&client, operation, options.poll_interval, options.timeout).await;
    spinner.finish_and_clear();

    let uris = finished?.video_uris();
    if uris.is_empty() {
        bail!("Generation finished without a video");
    }
    for uri in uris {
        println!("{}", uri);
    }
    Ok(())
}
