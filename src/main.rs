// convo_kit — Sticky-scroll and streaming reveal engines for chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use convo_kit::error::AppError;
use convo_kit::model::export::{DefaultLabels, render_transcript};
use convo_kit::{Cli, ExportFormat};
use std::fs::OpenOptions;
use std::time::{Duration, Instant};

#[allow(clippy::exit)]
fn main() {
    if let Err(err) = run() {
        if let Some(app_error) = extract_app_error(&err) {
            eprintln!("{}", app_error.user_message());
            std::process::exit(app_error.exit_code());
        }
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let mut config = convo_kit::config::load_config(cli.config.as_deref())?;
    if let Some(pacing) = cli.pacing {
        config.reveal.pacing = pacing;
    }
    let transcript = match cli.transcript.as_deref() {
        Some(path) => convo_kit::app::load_transcript(path)?,
        None => Vec::new(),
    };
    tracing::info!(messages = transcript.len(), pacing = ?config.reveal.pacing, "starting");

    if let Some(format) = cli.export {
        let entries: Vec<((), _)> = transcript.into_iter().map(|m| ((), m)).collect();
        let rendered = render_transcript(&entries, cli.language, &DefaultLabels);
        match format {
            ExportFormat::Text => println!("{}", rendered.text),
            ExportFormat::Html => println!("{}", rendered.html),
        }
        return Ok(());
    }

    let options = convo_kit::app::AppOptions {
        mode: cli.reveal_mode,
        fast_forward: cli.fast_forward,
        chunk_delay: Duration::from_millis(cli.chunk_delay_ms),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let local_set = tokio::task::LocalSet::new();

    rt.block_on(local_set.run_until(async move {
        let mut app = convo_kit::app::App::new(&config, options, transcript, Instant::now());
        let result = convo_kit::app::run_tui(&mut app).await;
        if result.is_ok() {
            eprintln!("Session cost: {:.6}", app.backend.store.total_cost());
        }
        result
    }))
}

fn extract_app_error(err: &anyhow::Error) -> Option<AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>().cloned())
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = cli.log_file.as_ref() else {
        if std::env::var_os("RUST_LOG").is_some() {
            eprintln!(
                "RUST_LOG is set, but tracing is disabled without --log-file <PATH>. \
Use --log-file to enable diagnostics."
            );
        }
        return Ok(());
    };

    let directives = cli
        .log_filter
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_owned());
    let filter = tracing_subscriber::EnvFilter::try_new(directives.as_str())
        .map_err(|e| anyhow::anyhow!("invalid tracing filter `{directives}`: {e}"))?;

    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if cli.log_append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let file = options
        .open(path)
        .map_err(|e| anyhow::anyhow!("failed to open log file {}: {e}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    tracing::info!(
        target: "diagnostics",
        version = env!("CARGO_PKG_VERSION"),
        log_file = %path.display(),
        log_filter = %directives,
        log_append = cli.log_append,
        "tracing enabled"
    );

    Ok(())
}
