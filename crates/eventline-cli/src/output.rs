//! Rendering of dispatched events for the terminal.

use anyhow::Result;
use eventline_config::OutputFormat;
use eventline_types::Event;
use std::io::Write;

/// Write one event in the requested format. `seq` is 1-based.
pub fn write_event(
    out: &mut impl Write,
    format: OutputFormat,
    seq: usize,
    event: &Event,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(out, seq, event),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, event)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn write_text(out: &mut impl Write, seq: usize, event: &Event) -> Result<()> {
    write!(out, "#{seq}")?;
    if let Some(id) = &event.id {
        write!(out, " id={id}")?;
    }
    if let Some(event_type) = &event.event_type {
        write!(out, " type={event_type}")?;
    }
    writeln!(out)?;
    for line in event.data_lines() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}
