use std::path::Path;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use engine::compositor::{NoText, TextPainter};
use engine::pacing::SystemClock;
use engine::{Collaborators, DesktopGeometry, PlaybackConfig, SessionSummary, session};
use player::cli::Cli;
use player::config::{Config, LabelSettings};
use player::display::HeadlessDisplay;
use player::label::FontPainter;
use player::media::MediaOpener;

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    // Logging is configured from the file, so report how it loaded after init
    let config_path = match cli.config.clone() {
        Some(path) => Ok(path),
        None => Config::default_config_path(),
    };
    let loaded = match &config_path {
        Ok(path) => Config::load_from_path(path),
        Err(e) => Err(anyhow::anyhow!("{:#}", e)),
    };
    let config = loaded.as_ref().cloned().unwrap_or_default();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    log::info!("Starting gridplay v{}", env!("CARGO_PKG_VERSION"));
    log_config_source(config_path.as_deref().ok(), &loaded);

    let playback = match PlaybackConfig::new(
        cli.files.clone(),
        cli.start_frame,
        cli.fps,
        cli.pause,
        cli.stitch,
    ) {
        Ok(playback) => playback,
        Err(e) => {
            eprintln!("{}", Cli::command().render_usage());
            return Err(e.into());
        }
    };

    let backend = cli
        .backend
        .clone()
        .unwrap_or_else(|| config.general.backend.clone());
    log_settings(&config, &playback, &backend);

    let mut painter = build_painter(&config.label);
    let summary = match backend.as_str() {
        "headless" => run_headless(&config, &playback, painter.as_mut())?,
        #[cfg(feature = "wayland")]
        "wayland" => run_wayland(&config, &playback, painter.as_mut())?,
        #[cfg(not(feature = "wayland"))]
        "wayland" => anyhow::bail!("Wayland support is not compiled in (enable the `wayland` feature)"),
        other => anyhow::bail!("Unknown backend: {} (expected headless or wayland)", other),
    };

    log::info!(
        "Session finished: {:?} after {} tick(s) at frame {}, {} stream(s) ended",
        summary.outcome,
        summary.ticks,
        summary.final_frame + 1,
        summary.ended_streams
    );
    Ok(())
}

fn log_config_source(path: Option<&Path>, loaded: &Result<Config>) {
    match (path, loaded) {
        (_, Err(e)) => log::warn!("Failed to load configuration, using defaults: {:#}", e),
        (Some(path), Ok(_)) if path.exists() => {
            log::info!("Loaded configuration from {}", path.display())
        }
        (Some(path), Ok(_)) => log::info!(
            "Config file not found at {}, using defaults",
            path.display()
        ),
        (None, Ok(_)) => {}
    }
}

fn log_settings(config: &Config, playback: &PlaybackConfig, backend: &str) {
    log::info!("  General settings:");
    log::info!("    - Log level: {}", config.general.log_level);
    log::info!("    - Backend: {}", backend);
    log::info!("  Playback:");
    log::info!("    - Streams: {}", playback.streams().len());
    log::info!("    - Start frame: {}", playback.start_frame());
    log::info!("    - FPS cap: {}", playback.fps());
    log::info!("    - Paused: {}", if playback.paused() { "yes" } else { "no" });
    log::info!("    - Stitch: {}", if playback.stitch() { "yes" } else { "no" });
    if config.label.enabled {
        log::info!("  Labels: {}", config.label.color);
    } else {
        log::info!("  Labels: disabled");
    }
}

/// Font-backed text, or none at all when no font can be loaded
fn build_painter(settings: &LabelSettings) -> Box<dyn TextPainter> {
    if !settings.enabled {
        return Box::new(NoText);
    }
    match FontPainter::load(settings) {
        Ok(painter) => match settings.rgba() {
            Some(color) => Box::new(painter.with_label_color(color)),
            None => Box::new(painter),
        },
        Err(e) => {
            log::warn!("Labels disabled: {:#}", e);
            Box::new(NoText)
        }
    }
}

fn run_headless(
    config: &Config,
    playback: &PlaybackConfig,
    painter: &mut dyn TextPainter,
) -> Result<SessionSummary> {
    let mut display = HeadlessDisplay::from_stdin(config.headless.output_dir.clone())
        .context("Failed to start headless display")?;
    let mut geometry: DesktopGeometry = config.headless.geometry;
    let clock = SystemClock;

    let summary = session::run(
        playback,
        &MediaOpener::new(),
        &mut geometry,
        Collaborators {
            display: &mut display,
            painter,
            clock: &clock,
        },
    )?;
    Ok(summary)
}

#[cfg(feature = "wayland")]
fn run_wayland(
    config: &Config,
    playback: &PlaybackConfig,
    painter: &mut dyn TextPainter,
) -> Result<SessionSummary> {
    let mut display = player::display::WaylandDisplay::connect(config.wayland.title_bar_height)?;
    let mut geometry = display.geometry();
    let clock = SystemClock;

    let summary = session::run(
        playback,
        &MediaOpener::new(),
        &mut geometry,
        Collaborators {
            display: &mut display,
            painter,
            clock: &clock,
        },
    )?;
    Ok(summary)
}
