//! Bowser command-line client.
//!
//! Drives the browsing engine headless against a running Bowser server and
//! prints what the map and chart would receive.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bowser_common::{BowserApi, LatLng};
use bowser_engine::{EngineConfig, HttpBackend, Session};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use commands::ScaleOverrides;

/// Bowser client
#[derive(Parser, Debug)]
#[command(name = "bowser")]
#[command(about = "Browse time-indexed raster datasets served by a Bowser server")]
struct Args {
    /// Engine configuration file (YAML)
    #[arg(short, long, env = "BOWSER_CONFIG")]
    config: Option<PathBuf>,

    /// Server url, overrides the configuration
    #[arg(long, env = "BOWSER_URL")]
    url: Option<String>,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the dataset catalog and the server's data mode
    Datasets {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the tile url template for one dataset and time step
    Tile {
        #[arg(short, long)]
        dataset: String,

        #[arg(short = 't', long, default_value_t = 0, allow_negative_numbers = true)]
        time_idx: i64,

        /// Reference point as LON,LAT
        #[arg(long = "ref", value_parser = parse_lon_lat, allow_hyphen_values = true)]
        reference: Option<LatLng>,

        #[arg(long)]
        colormap: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        vmin: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        vmax: Option<f64>,
    },

    /// Print chart data for one or more points
    Series {
        #[arg(short, long)]
        dataset: String,

        /// Point as LON,LAT; repeat for more points
        #[arg(short, long = "point", value_parser = parse_lon_lat, allow_hyphen_values = true, required = true)]
        points: Vec<LatLng>,

        /// Reference point as LON,LAT
        #[arg(long = "ref", value_parser = parse_lon_lat, allow_hyphen_values = true)]
        reference: Option<LatLng>,

        /// Ask the server for linear trends
        #[arg(long)]
        trends: bool,
    },

    /// Print the linear trend at one point
    Trend {
        #[arg(short, long)]
        dataset: String,

        /// Point as LON,LAT
        #[arg(short, long, value_parser = parse_lon_lat, allow_hyphen_values = true)]
        point: LatLng,

        /// Reference point as LON,LAT
        #[arg(long = "ref", value_parser = parse_lon_lat, allow_hyphen_values = true)]
        reference: Option<LatLng>,
    },
}

fn parse_lon_lat(s: &str) -> Result<LatLng, String> {
    LatLng::from_lon_lat_str(s).map_err(|e| e.to_string())
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn load_config(args: &Args, env: impl Fn(&str) -> Option<String>) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_file_with(path, env)?,
        None => EngineConfig::from_lookup(env)?,
    };
    if let Some(url) = &args.url {
        config.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    let config = load_config(&args, |key| std::env::var(key).ok())?;
    info!(base_url = %config.base_url, "Starting bowser client");

    let backend = HttpBackend::new(&config.base_url, config.request_timeout())
        .context("Failed to create backend")?;
    debug!(colorbar = %backend.colorbar_url(&config.default_colormap), "Colorbar");
    let api: Arc<dyn BowserApi> = Arc::new(backend);
    let mut session = Session::from_config(api, &config);

    match args.command {
        Command::Datasets { json } => {
            let listing = commands::list_datasets(&mut session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print!("{}", listing.to_table());
            }
        }
        Command::Tile {
            dataset,
            time_idx,
            reference,
            colormap,
            vmin,
            vmax,
        } => {
            let overrides = ScaleOverrides {
                colormap,
                vmin,
                vmax,
            };
            let url =
                commands::tile_url(&mut session, &dataset, time_idx, reference, overrides).await?;
            println!("{}", url);
        }
        Command::Series {
            dataset,
            points,
            reference,
            trends,
        } => {
            let chart = commands::series(&mut session, &dataset, &points, reference, trends).await?;
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }
        Command::Trend {
            dataset,
            point,
            reference,
        } => {
            let trend = commands::trend(&mut session, &dataset, point, reference).await?;
            println!("{}", serde_json::to_string_pretty(&trend)?);
        }
    }

    Ok(())
}
