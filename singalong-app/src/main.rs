//! `singalong` command-line entry point.
//!
//! Settings are read from a JSON file first; flags given on the command line
//! override them for this run only.

mod commands;
mod settings;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;

use settings::{default_settings_path, load_settings, AppSettings};

/// Re-time a recording word by word to follow a reference song.
#[derive(Parser)]
#[command(name = "singalong", version)]
struct Cli {
    /// Settings file (default: $XDG_DATA_HOME/singalong/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Frames per recognizer call.
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Resample the output to this rate (Hz).
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Recognizer backend: energy or vosk.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Vosk model directory.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stretch each word of one recording to the matching word of the other.
    Align {
        /// The singer's recording.
        #[arg(long)]
        user: PathBuf,
        /// Reference track name or WAV path.
        #[arg(long)]
        reference: String,
        /// Output WAV.
        #[arg(long)]
        out: PathBuf,
        /// Which side keeps its audio: reference-to-user or user-to-reference.
        #[arg(long)]
        direction: Option<String>,
        /// Also write the per-word report as JSON here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Stretch a whole recording to the reference's length.
    Fit {
        #[arg(long)]
        input: PathBuf,
        /// Reference track name or WAV path.
        #[arg(long)]
        reference: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print detected word intervals as JSON.
    Boundaries { input: PathBuf },
    /// Print a WAV file's duration in seconds.
    Duration { input: PathBuf },
    /// List configured reference tracks.
    Tracks,
    /// Print the effective settings as JSON.
    Settings {
        /// Write them to the settings file.
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "singalong=debug,singalong_core=debug"
    } else {
        "singalong=info,singalong_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    apply_overrides(&mut settings, &cli);
    info!(
        settings = %settings_path.display(),
        backend = %settings.backend,
        "singalong starting"
    );

    let ctx = commands::Context {
        settings,
        settings_path,
    };
    match cli.command {
        Command::Align {
            user,
            reference,
            out,
            direction,
            report,
        } => commands::align(&ctx, &user, &reference, &out, direction.as_deref(), report.as_deref()),
        Command::Fit {
            input,
            reference,
            out,
        } => commands::fit(&ctx, &input, &reference, &out),
        Command::Boundaries { input } => commands::boundaries(&ctx, &input),
        Command::Duration { input } => commands::duration(&input),
        Command::Tracks => commands::tracks(&ctx),
        Command::Settings { save } => commands::settings(&ctx, save),
    }
}

fn apply_overrides(settings: &mut AppSettings, cli: &Cli) {
    if let Some(chunk) = cli.chunk_size {
        settings.chunk_frames = chunk;
    }
    if let Some(rate) = cli.sample_rate {
        settings.output_sample_rate = Some(rate);
    }
    if let Some(backend) = &cli.backend {
        settings.backend = backend.clone();
    }
    if let Some(model) = &cli.model {
        settings.model_path = Some(model.clone());
    }
    settings.normalize();
}
