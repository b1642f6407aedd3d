// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! StreamLib repeater CLI
//!
//! Runs a synthetic pattern source through the frame-rate repeater and
//! reports every delivered frame, then the session stats as JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use streamlib_repeater::{
    PatternSource, PatternSourceConfig, ReadOptions, RepeaterError, RepeaterSettings,
    RepeaterSource, RepeaterStats,
};

#[derive(Parser)]
#[command(name = "streamlib-repeater")]
#[command(author, version, about = "Pace an irregular frame source to a fixed rate", long_about = None)]
struct Cli {
    /// Settings file with [repeater] and [source] tables
    /// (default: ./repeater.toml if present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output rate in frames per second
    #[arg(short, long)]
    rate: Option<f64>,

    /// Rate the pattern source produces at
    #[arg(long)]
    source_rate: Option<f64>,

    /// Random per-frame deviation of the source, in milliseconds
    #[arg(long)]
    jitter_ms: Option<u64>,

    /// Stall the source on every Nth frame
    #[arg(long)]
    stall_every: Option<u64>,

    /// Length of each source stall, in milliseconds
    #[arg(long)]
    stall_ms: Option<u64>,

    /// Number of frames to read before stopping
    #[arg(short = 'n', long, default_value = "60")]
    frames: u64,

    /// Give up on a single read after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Hold fresh frames until their deadline
    #[arg(long)]
    pace: bool,
}

#[derive(Serialize)]
struct Report {
    rate_hz: f64,
    #[serde(flatten)]
    stats: RepeaterStats,
    repeat_ratio: f64,
    ended_by: Option<String>,
}

fn load_settings(path: Option<&Path>) -> Result<RepeaterSettings> {
    match path {
        Some(path) => RepeaterSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(RepeaterSettings::load_or_default(Path::new(
            RepeaterSettings::FILE_NAME,
        ))),
    }
}

fn apply_overrides(cli: &Cli, settings: &mut RepeaterSettings) {
    if let Some(rate) = cli.rate {
        settings.repeater.rate_hz = rate;
    }
    if cli.pace {
        settings.repeater.pace_fresh_frames = true;
    }

    let source = &mut settings.source;
    if let Some(rate) = cli.source_rate {
        source.insert("rate_hz", rate);
    }
    if let Some(jitter) = cli.jitter_ms {
        source.insert("jitter_ms", jitter);
    }
    if let Some(every) = cli.stall_every {
        source.insert("stall_every", every);
    }
    if let Some(stall) = cli.stall_ms {
        source.insert("stall_ms", stall);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    apply_overrides(&cli, &mut settings);

    let repeater = RepeaterSource::new(
        PatternSource::new(PatternSourceConfig::default()),
        settings.repeater.clone(),
    )
    .context("Invalid repeater configuration")?;
    repeater
        .start(&settings.source)
        .context("Failed to start repeater")?;

    if let Some(format) = repeater.format() {
        tracing::info!("Source format: {}", serde_json::to_string(&format)?);
    }

    let options = ReadOptions {
        timeout: cli.timeout_ms.map(Duration::from_millis),
    };

    let mut ended_by = None;
    for _ in 0..cli.frames {
        match repeater.read(&options) {
            Ok(frame) => {
                tracing::info!(
                    "#{:<5} {:>14}us {:>8} bytes {}",
                    frame.frame_number,
                    frame.timestamp_us,
                    frame.len(),
                    if frame.is_repeat() { "repeat" } else { "fresh" }
                );
            }
            Err(RepeaterError::TimedOut(after)) => {
                tracing::warn!("No frame within {:?}", after);
            }
            Err(e) if e.is_terminal() => {
                tracing::info!("Stream ended: {}", e);
                ended_by = Some(e.to_string());
                break;
            }
            Err(e) => return Err(e).context("Read failed"),
        }
    }

    repeater.stop().context("Failed to stop repeater")?;

    let stats = repeater.stats();
    let report = Report {
        rate_hz: repeater.rate_hz(),
        stats,
        repeat_ratio: stats.repeat_ratio(),
        ended_by,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "streamlib-repeater",
            "--rate",
            "24",
            "--source-rate",
            "10",
            "--stall-every",
            "5",
            "--pace",
        ]);
        let mut settings = RepeaterSettings::default();
        apply_overrides(&cli, &mut settings);

        assert_eq!(settings.repeater.rate_hz, 24.0);
        assert!(settings.repeater.pace_fresh_frames);
        assert_eq!(settings.source.get_f64("rate_hz"), Some(10.0));
        assert_eq!(settings.source.get_u64("stall_every"), Some(5));
        assert_eq!(settings.source.get("jitter_ms"), None);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["streamlib-repeater"]);
        assert_eq!(cli.frames, 60);
        assert!(cli.config.is_none());
        assert!(!cli.pace);
    }
}
