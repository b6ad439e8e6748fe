mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use cli::Cli;
use mixcheck::config::{self, Thresholds};
use mixcheck::report::aggregate::matches_filter;
use mixcheck::report::TrackStatus;
use mixcheck::session;
use mixcheck::{ReportAggregator, SymphoniaDecoder};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let thresholds = load_thresholds(&cli);

    let mut tracks = Vec::new();
    if let Some(ref path) = cli.session {
        tracks.extend(session::load_session(path)?.tracks);
        log::info!("Loaded session {}", path.display());
    }
    tracks.extend(session::tracks_from_files(&cli.files));
    if tracks.is_empty() {
        anyhow::bail!("Nothing to analyze: pass audio files or --session <manifest>");
    }

    let filter = cli.filter.as_deref();
    let total_items: usize = tracks
        .iter()
        .filter(|t| matches_filter(&t.name, filter))
        .map(|t| t.items.len())
        .sum();

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total_items as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} items ({eta} remaining)")?
            .progress_chars("=>-"),
    );
    let tick = || pb.inc(1);

    let reports = ReportAggregator::new(&SymphoniaDecoder, &thresholds)
        .with_progress(&tick)
        .run(&tracks, filter);
    pb.finish_and_clear();

    if reports.is_empty() {
        log::warn!("No track matches filter {:?}", filter.unwrap_or_default());
    }
    for report in reports.iter() {
        if report.status == TrackStatus::Unanalyzable {
            log::warn!("Track '{}' could not be analyzed", report.track);
        } else {
            log::info!(
                "Track '{}': {} items, {} diagnostics",
                report.track,
                report.items_analyzed,
                report.diagnostics.len()
            );
        }
    }

    let json = if cli.compact {
        serde_json::to_string(&reports)?
    } else {
        serde_json::to_string_pretty(&reports)?
    };

    match cli.output {
        Some(ref path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Explicit --config, else ./mixcheck.toml, else the user config dir.
fn load_thresholds(cli: &Cli) -> Thresholds {
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("mixcheck.toml");
        if local.exists() {
            return Some(local);
        }
        let global = dirs::config_dir()?.join("mixcheck").join("config.toml");
        global.exists().then_some(global)
    });

    match config_path {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg.thresholds
            }
            None => {
                log::warn!("Failed to load config from {}, using defaults", path.display());
                Thresholds::default()
            }
        },
        None => Thresholds::default(),
    }
}
