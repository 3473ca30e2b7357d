/*!
# Tilt Viewer Application

Live 3D view of a board's roll and pitch, read from an MPU-6050
accelerometer on an I2C bus.

## Features

- Background sensor discovery, configuration and 25 Hz polling
- Wireframe airplane rotated by the latest sample every frame
- Performance and accelerometer info windows
- Built-in simulated sensor for running without hardware
- Command-line interface for headless operation

## Usage

### GUI Mode (default)
```bash
tiltview
```

### Command Line Mode
```bash
tiltview run --interval-ms 40 --json
```

### Simulated sensor
```bash
tiltview run --simulate --duration-s 10
```
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod gui;
mod hardware;
mod headless;
mod scene;

use config::{AppConfig, SensorSource};
use gui::TiltViewerGui;
use headless::{HeadlessOptions, HeadlessRunner, REPORT_INTERVAL};

#[derive(Parser)]
#[command(name = "tiltview")]
#[command(about = "Live 3D tilt viewer driven by an MPU-6050 accelerometer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "tiltview.toml")]
    config: PathBuf,

    /// Run in command-line mode (no GUI)
    #[arg(long)]
    cli: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the sensor and print orientation to stdout
    Run {
        /// Use the simulated sensor instead of hardware
        #[arg(long)]
        simulate: bool,

        /// Poll interval in milliseconds (overrides the config file)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Print one JSON object per report
        #[arg(long)]
        json: bool,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration_s: Option<f64>,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "tiltview.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load_from_file(&cli.config);
    let level = match &loaded {
        Ok(config) => config.logging.level.clone(),
        Err(_) => AppConfig::default().logging.level,
    };

    // Initialize logging to stderr to keep stdout clean for reports
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let config = loaded.unwrap_or_else(|e| {
        warn!("⚠️ Using default configuration ({:#})", e);
        AppConfig::new()
    });

    match cli.command {
        Some(Commands::Run {
            simulate,
            interval_ms,
            json,
            duration_s,
        }) => {
            let mut config = config;
            if simulate {
                config.sensor.source = SensorSource::Simulated;
            }
            if let Some(ms) = interval_ms {
                config.sensor.poll_interval_ms = ms;
            }
            config.sensor.validate()?;
            let duration = duration_s
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("--duration-s must be a non-negative number")?;
            run_headless(config, json, duration)
        }

        Some(Commands::Config { output }) => generate_config_file(output),

        None => {
            if cli.cli {
                run_headless(config, false, None)
            } else {
                run_gui(config, cli.config)
            }
        }
    }
}

/// Run acquisition without a window until Ctrl+C or the duration elapses
fn run_headless(config: AppConfig, json: bool, duration: Option<Duration>) -> Result<()> {
    info!(
        "🚀 Starting headless acquisition ({:?} source, {} ms)",
        config.sensor.source, config.sensor.poll_interval_ms
    );

    let runner = HeadlessRunner::new(
        config.sensor.acquisition(),
        HeadlessOptions {
            json,
            duration,
            report_interval: REPORT_INTERVAL,
        },
    );

    // Set up Ctrl+C handler
    let running = runner.get_running_flag();
    ctrlc::set_handler(move || {
        eprintln!("\n🛑 Received Ctrl+C, shutting down gracefully...");
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    })?;

    let enumerator = hardware::open_enumerator(&config.sensor)?;
    let stdout = std::io::stdout();
    runner.run(enumerator, &mut stdout.lock())?;

    info!("✅ Acquisition completed");
    Ok(())
}

/// Run the GUI application
fn run_gui(config: AppConfig, config_path: PathBuf) -> Result<()> {
    info!("🖥️ Starting Tilt Viewer GUI");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.gui.window_width, config.gui.window_height])
            .with_title("Tilt Viewer - MPU-6050"),
        ..Default::default()
    };

    eframe::run_native(
        "Tilt Viewer",
        options,
        Box::new(|cc| Ok(Box::new(TiltViewerGui::new(config, config_path, cc)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {e}"))?;

    Ok(())
}

/// Generate a default configuration file
fn generate_config_file(output_path: PathBuf) -> Result<()> {
    let config = AppConfig::new();
    config.save_to_file(&output_path)?;

    println!("✅ Generated configuration file: {}", output_path.display());
    println!("📝 Edit the file to customize settings, then run:");
    println!("   tiltview --config {}", output_path.display());

    Ok(())
}
