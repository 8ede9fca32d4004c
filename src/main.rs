//! CLI entry point for the bike-share traffic tool.
//!
//! Loads station and trip sources, runs the recompute pipeline for one or
//! many slider positions, and logs or stores the resulting marker snapshots.

use anyhow::{Context, Result};
use bikeshare_traffic::{
    config::AppConfig,
    loader::load_sources,
    model::Coordinate,
    output::{append_snapshot, print_json, print_pretty},
    pipeline::{LatestSnapshot, MapContext, RecomputePipeline, Snapshot},
    projection::MercatorViewport,
    time::{MINUTES_PER_DAY, format_minutes},
};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_STATIONS: &str = "https://dsc106.com/labs/lab07/data/bluebikes-stations.json";
const DEFAULT_TRIPS: &str = "https://dsc106.com/labs/lab07/data/bluebikes-traffic-2024-03.csv";

#[derive(Parser)]
#[command(name = "bikeshare_traffic")]
#[command(about = "Per-station bike-share traffic under a time-of-day filter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Station list JSON (path or URL)
    #[arg(long, default_value = DEFAULT_STATIONS)]
    stations: String,

    /// Trip CSV (path or URL)
    #[arg(long, default_value = DEFAULT_TRIPS)]
    trips: String,

    /// Optional JSON config with radius ranges and viewport
    #[arg(short, long)]
    config: Option<String>,
}

/// Camera moves applied after loading, like a pan/zoom/resize on the map.
#[derive(Args)]
struct ViewArgs {
    /// Map center as "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    center: Option<Coordinate>,

    /// Zoom level
    #[arg(long)]
    zoom: Option<f64>,

    /// Canvas width in pixels
    #[arg(long, requires = "height")]
    width: Option<f64>,

    /// Canvas height in pixels
    #[arg(long, requires = "width")]
    height: Option<f64>,
}

impl ViewArgs {
    fn is_empty(&self) -> bool {
        self.center.is_none() && self.zoom.is_none() && self.width.is_none()
    }

    fn apply(&self, viewport: &mut MercatorViewport) {
        if let Some(center) = self.center {
            viewport.set_center(center);
        }
        if let Some(zoom) = self.zoom {
            viewport.set_zoom(zoom);
        }
        if let (Some(width), Some(height)) = (self.width, self.height) {
            viewport.resize(width, height);
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute station markers for a single slider position
    Snapshot {
        #[command(flatten)]
        sources: SourceArgs,

        /// Minute of day to focus on, or -1 for any time
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        time: i32,

        #[command(flatten)]
        view: ViewArgs,

        /// CSV file to append markers to
        #[arg(short, long)]
        output: Option<String>,

        /// Log the full snapshot as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay the slider across the whole day and write every snapshot to CSV
    Sweep {
        #[command(flatten)]
        sources: SourceArgs,

        /// Slider step in minutes
        #[arg(short, long, default_value_t = 60)]
        step: u16,

        /// CSV file to append markers to
        #[arg(short, long, default_value = "sweep.csv")]
        output: String,
    },
}

type CliPipeline = RecomputePipeline<MercatorViewport, LatestSnapshot>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bikeshare_traffic.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_traffic.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot {
            sources,
            time,
            view,
            output,
            json,
        } => {
            let mut pipeline = start_pipeline(&sources).await?;

            if !view.is_empty() {
                view.apply(&mut pipeline.context_mut().projector);
                pipeline.on_viewport_change();
            }

            pipeline.on_filter_change(time)?;
            info!(time = %slider_label(time), "Time filter applied");

            let snapshot = latest(&pipeline)?;
            info!(
                trips = snapshot.trip_count,
                stations = snapshot.markers.len(),
                "Snapshot ready"
            );
            print_pretty(snapshot, 10);

            if json {
                print_json(snapshot)?;
            }
            if let Some(path) = output {
                append_snapshot(&path, snapshot)?;
                info!(path, "Markers written");
            }
        }
        Commands::Sweep {
            sources,
            step,
            output,
        } => {
            sweep(&sources, step, &output).await?;
        }
    }

    Ok(())
}

/// Loads both sources and builds a pipeline around the configured viewport.
async fn start_pipeline(sources: &SourceArgs) -> Result<CliPipeline> {
    let config = AppConfig::load_or_default(sources.config.as_deref())?;
    let context = MapContext::new(config.viewport, LatestSnapshot::default())
        .with_radius_ranges(config.radius_ranges);
    let mut pipeline = RecomputePipeline::new(context);

    let (stations, trips) = load_sources(&sources.stations, &sources.trips).await;
    pipeline.load(stations, trips)?;
    Ok(pipeline)
}

/// Steps the slider from "any time" through the day, appending each snapshot.
#[tracing::instrument(skip(sources))]
async fn sweep(sources: &SourceArgs, step: u16, output: &str) -> Result<()> {
    if step == 0 {
        anyhow::bail!("step must be at least one minute");
    }

    let mut pipeline = start_pipeline(sources).await?;
    let positions =
        std::iter::once(-1).chain((0..i32::from(MINUTES_PER_DAY)).step_by(usize::from(step)));

    for value in positions {
        pipeline.on_filter_change(value)?;
        let snapshot = latest(&pipeline)?;
        if snapshot.trip_count == 0 {
            warn!(time = %slider_label(value), "No trips in window");
        }
        append_snapshot(output, snapshot)?;
        info!(time = %slider_label(value), trips = snapshot.trip_count, "Sweep step written");
    }

    info!(output, "Sweep finished");
    Ok(())
}

fn latest(pipeline: &CliPipeline) -> Result<&Snapshot> {
    pipeline
        .context()
        .renderer
        .latest()
        .context("pipeline has not published a snapshot")
}

fn slider_label(value: i32) -> String {
    u16::try_from(value)
        .map(format_minutes)
        .unwrap_or_else(|_| "any time".to_string())
}
