//! Screen Translator - Real-time translation of on-screen text
//!
//! Captures the screen, finds text regions, recognizes them with Tesseract
//! and shows the translated text in a window.

mod app;
mod capture;
mod config;
mod overlay;
mod shared;
mod storage;
mod translation;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::TranslatorApp;
use crate::capture::{list_monitors, ScreenCapture};
use crate::config::AppConfig;
use crate::translation::{build_translator, TranslationProvider};
use crate::vision::FramePipeline;

/// Screen Translator - translate text shown on screen
#[derive(Parser, Debug)]
#[command(name = "screen-translator")]
#[command(about = "Capture the screen, recognize text and show its translation")]
struct Args {
    /// Configuration file (defaults to config.toml in the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Monitor index to capture
    #[arg(short, long)]
    monitor: Option<usize>,

    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,

    /// Translate a single image file, print the result and exit
    #[arg(long)]
    image: Option<PathBuf>,

    /// Show recognized text without translating it
    #[arg(long)]
    no_translate: bool,

    /// Target language code (e.g. en-US, fr)
    #[arg(short, long)]
    target: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // List monitors mode
    if args.list_monitors {
        println!("Available monitors:");
        let monitors = list_monitors()?;
        if monitors.is_empty() {
            println!("  No monitors detected");
        }
        for monitor in &monitors {
            println!(
                "  [{}] {} - {}x{} at ({}, {}){}",
                monitor.index,
                monitor.name,
                monitor.width,
                monitor.height,
                monitor.x,
                monitor.y,
                if monitor.is_primary { " (primary)" } else { "" }
            );
        }
        return Ok(());
    }

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    if let Some(path) = &args.image {
        return run_single_image(path, &config);
    }

    info!("Screen Translator starting...");
    run_live(config)?;
    info!("Screen Translator shutdown complete");

    Ok(())
}

/// Load configuration from the given file, or from the config directory
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    match storage::get_config_dir() {
        Ok(config_dir) => Ok(load_or_create_config(&config_dir.join("config.toml"))),
        Err(e) => {
            warn!("No configuration directory, using defaults: {:#}", e);
            Ok(AppConfig::default())
        }
    }
}

/// Load configuration from file, writing the defaults there on first run
fn load_or_create_config(config_path: &Path) -> AppConfig {
    if config_path.exists() {
        match config::load_config(config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
            Err(e) => {
                warn!("Ignoring invalid configuration: {:#}", e);
                return AppConfig::default();
            }
        }
    }

    let config = AppConfig::default();
    match config::save_config(&config, config_path) {
        Ok(()) => info!("Wrote default configuration to {:?}", config_path),
        Err(e) => warn!("Could not write default configuration: {:#}", e),
    }
    config
}

/// Command-line flags take precedence over the configuration file
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(monitor) = args.monitor {
        config.capture.monitor_index = monitor;
    }
    if let Some(target) = &args.target {
        config.translation.target_language = target.clone();
    }
    if args.no_translate {
        config.translation.provider = TranslationProvider::Passthrough;
    }
}

/// Recognize and translate one image file
fn run_single_image(path: &Path, config: &AppConfig) -> Result<()> {
    let image = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
    let pipeline = FramePipeline::new(&config.vision)?;
    let translator = build_translator(&config.translation)?;

    let (frame_text, translation) = app::translate_image(
        &image,
        &pipeline,
        translator.as_ref(),
        &config.translation.target_language,
    )?;

    info!(
        "{} region(s) recognized in {} ms",
        frame_text.regions.len(),
        frame_text.processing_time_ms
    );
    println!("Recognized: {}", frame_text.text);
    match translation {
        Some(translation) => println!("Translated: {}", translation.text),
        None => println!("Translated: (no text found)"),
    }

    Ok(())
}

/// Capture continuously and show translations until the window closes
fn run_live(config: AppConfig) -> Result<()> {
    let pipeline = FramePipeline::new(&config.vision)?;
    let translator = build_translator(&config.translation)?;
    let capture_config = config.capture.clone();

    let mut app = TranslatorApp::new(config);
    app.start(move || ScreenCapture::new(capture_config), pipeline, translator)?;

    info!("Showing translations (press ESC to exit)");
    let result = overlay::run_display(app.state());

    app.shutdown();
    result
}
