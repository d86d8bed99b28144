//! eventline CLI: parse a Server-Sent Events stream and print its events.

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use eventline_config::{CliOverrides, EventlineConfig};
use eventline_core::{BufferedSource, EventParser, reconnect_delay};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "eventline",
    version,
    about = "Parse a Server-Sent Events stream and print its events"
)]
struct Cli {
    /// File to read the stream from (defaults to stdin)
    file: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long)]
    format: Option<String>,

    /// Bytes requested from the input per read
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

/// What the stream left behind once it was exhausted.
#[derive(Debug, PartialEq, Eq)]
struct Summary {
    events: usize,
    reconnection_time_ms: i64,
    last_event_id: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = EventlineConfig::load(CliOverrides {
        format: cli.format,
        buffer_size: cli.buffer_size,
    })
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let input: Box<dyn Read> = match &cli.file {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let mut stdout = io::stdout().lock();
    let summary = run(input, &config, &mut stdout)?;
    stdout.flush()?;

    report(&summary, &config);
    Ok(())
}

/// Parse every event from `input` and write it to `out`.
fn run(input: impl Read, config: &EventlineConfig, out: &mut impl Write) -> Result<Summary> {
    let mut source = BufferedSource::with_chunk_size(input, config.buffer_size);
    source
        .skip_byte_order_mark()
        .context("Failed to read event stream")?;

    let mut parser = EventParser::new(source);
    let mut events = 0;
    while let Some(event) = parser
        .next_event()
        .context("Failed to read event stream")?
    {
        events += 1;
        tracing::debug!(seq = events, id = ?event.id, event_type = ?event.event_type, "Dispatched event");
        output::write_event(&mut *out, config.format, events, &event)
            .context("Failed to write event")?;
    }

    Ok(Summary {
        events,
        reconnection_time_ms: parser.reconnection_time(),
        last_event_id: parser.last_event_id().map(str::to_owned),
    })
}

fn report(summary: &Summary, config: &EventlineConfig) {
    eprintln!("{} event(s) dispatched", summary.events);
    if let Some(id) = &summary.last_event_id {
        eprintln!("Last event id: {id}");
    }
    if summary.reconnection_time_ms >= 0 {
        eprintln!(
            "Server advised reconnecting after {}ms",
            summary.reconnection_time_ms
        );
    }
    let delay = reconnect_delay(&config.reconnect, summary.reconnection_time_ms);
    eprintln!("A client would reconnect in {delay}ms");
}
