mod commands;
mod state;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use cinematix::config::AnalysisFallback;
use cinematix::logging::{init_logging, LogFormat, DEFAULT_LOG_DIRECTIVE};

use commands::{GenerateOptions, RunOptions};
use state::AppState;

#[derive(Parser)]
#[command(name = "cinematix")]
#[command(version, about = "Old film remaster workflow with AI frame analysis", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/cinematix/settings.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a frame, run the remaster and save the result
    Run {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Where the remastered file is written (defaults to the current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        no_download: bool,
        /// Treat INPUT as a still image instead of a video
        #[arg(long)]
        still: bool,
        /// What to do when frame analysis fails
        #[arg(long)]
        fallback: Option<FallbackArg>,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the analysis service API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Generate a remastered clip seeded from a frame of INPUT
    Generate {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(short, long, default_value = "")]
        prompt: String,
        #[arg(long)]
        still: bool,
        /// Seconds between status checks
        #[arg(long, default_value_t = 10)]
        poll_secs: u64,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Show whether a key is available
    Status,
    /// Store a key (prompts when --key is omitted)
    Set {
        #[arg(long)]
        key: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FallbackArg {
    LeaveUnset,
    UseDefaults,
    Fail,
}

impl From<FallbackArg> for AnalysisFallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::LeaveUnset => AnalysisFallback::LeaveUnset,
            FallbackArg::UseDefaults => AnalysisFallback::UseDefaults,
            FallbackArg::Fail => AnalysisFallback::Fail,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    let directive = if cli.verbose {
        "debug"
    } else {
        DEFAULT_LOG_DIRECTIVE
    };
    init_logging(format, directive)?;

    info!("Starting cinematix v{}", env!("CARGO_PKG_VERSION"));
    let app = AppState::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            output_dir,
            no_download,
            still,
            fallback,
            json,
        } => {
            commands::run(
                &app,
                RunOptions {
                    input,
                    output_dir,
                    no_download,
                    still,
                    fallback: fallback.map(AnalysisFallback::from),
                    json,
                },
            )
            .await
        }
        Commands::Key { action } => match action {
            KeyAction::Status => {
                commands::key_status(&app);
                Ok(())
            }
            KeyAction::Set { key } => commands::key_set(&app, key),
        },
        Commands::Generate {
            input,
            prompt,
            still,
            poll_secs,
            timeout_secs,
        } => {
            commands::generate(
                &app,
                GenerateOptions {
                    input,
                    prompt,
                    still,
                    poll_interval: Duration::from_secs(poll_secs),
                    timeout: Duration::from_secs(timeout_secs),
                },
            )
            .await
        }
    }
}
