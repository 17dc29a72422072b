//! wavplay: play uncompressed PCM WAV files through CPAL.
//!
//! ## Modes
//! - batch (default): play one file, print its format and duration, stop on any key.
//! - `--interactive`: terminal transport over a playlist with pause/play, rewind and
//!   fast-forward.
//!
//! Failures print one diagnostic line and exit with status 1.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use wavplay::cli::{self, Args};
use wavplay::config::Mode;
use wavplay::runtime;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            std::process::exit(cli::exit_code(&e));
        }
    };
    if let Err(e) = run(args) {
        eprintln!("{}", diagnostic(&e));
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    init_tracing(args.interactive, args.log_file.as_deref())?;
    match Mode::from_args(args)? {
        Mode::ListDevices => runtime::list_devices(),
        Mode::Play(config) => {
            let stop = runtime::install_stop_flag();
            let reason = runtime::run_play(config, &stop)?;
            tracing::info!(reason = ?reason, "done");
            Ok(())
        }
        Mode::Interactive(config) => {
            let stop = runtime::install_stop_flag();
            runtime::run_interactive(config, stop)
        }
    }
}

fn init_tracing(interactive: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wavplay=info,wav_player=info"));
    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("create log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        // The terminal belongs to the UI.
        None if interactive => (BoxMakeWriter::new(std::io::sink), false),
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .init();
    Ok(())
}

/// The library error's message when there is one, otherwise the full context chain.
fn diagnostic(err: &anyhow::Error) -> String {
    match err.downcast_ref::<wav_player::Error>() {
        Some(e) => e.to_string(),
        None => format!("{err:#}"),
    }
}
