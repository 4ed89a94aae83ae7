use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use reach_core::{
    Config, GeoPoint, OpenMeteoClient, RangeType, RequestParameters, TerrainPreference,
    TravelMode, WeatherSource, engine_from_config,
    speed::{adjust_speed_for_slope, describe_weather, weather_multiplier},
};
use std::{fs, path::PathBuf};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "reach", version, about = "Reachability area CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the openrouteservice API key and request options.
    Configure {
        /// API key; prompted for when omitted.
        #[arg(long)]
        api_key: Option<String>,

        /// "distance" or "time".
        #[arg(long)]
        range_type: Option<String>,
    },

    /// Compute the area reachable from a point and print it as GeoJSON.
    Generate(GenerateArgs),

    /// Show current weather at a point and how much it slows travel down.
    Weather {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        #[arg(long, default_value = "walking")]
        mode: String,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lng: f64,

    /// Travel time in minutes.
    #[arg(long)]
    minutes: f64,

    /// Base speed in km/h; defaults to the mode's typical speed.
    #[arg(long)]
    speed: Option<f64>,

    /// walking, biking or driving.
    #[arg(long, default_value = "walking")]
    mode: String,

    /// cross-country or roads-only.
    #[arg(long, default_value = "cross-country")]
    terrain: String,

    /// Average slope in degrees (negative for downhill).
    #[arg(long, allow_negative_numbers = true)]
    slope: Option<f64>,

    /// Slow down according to current weather.
    #[arg(long)]
    weather: bool,

    /// Also print the bounding box for POI searches (to stderr).
    #[arg(long)]
    bbox: bool,

    /// Write GeoJSON to a file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key, range_type } => configure(api_key, range_type),
            Command::Generate(args) => generate(args).await,
            Command::Weather { lat, lng, mode } => show_weather(lat, lng, &mode).await,
        }
    }
}

fn configure(api_key: Option<String>, range_type: Option<String>) -> anyhow::Result<()> {
    // Read the file directly so an ORS_API_KEY override is never persisted.
    let mut config = Config::load_from(&Config::config_file_path()?)?;

    let api_key = match api_key {
        Some(key) => key,
        None => inquire::Password::new("openrouteservice API key:")
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };
    config.set_routing_api_key(api_key);

    if let Some(range_type) = range_type {
        config.routing.range_type = RangeType::try_from(range_type.as_str())?;
    }

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let engine = engine_from_config(&config)?;

    let mode = TravelMode::from_name_lenient(&args.mode);
    let terrain = TerrainPreference::try_from(args.terrain.as_str())?;

    let mut speed = args.speed.unwrap_or_else(|| mode.default_speed_kmh());
    if let Some(slope) = args.slope {
        let adjusted = adjust_speed_for_slope(speed, slope);
        info!("slope of {slope}° changes speed from {speed:.1} to {adjusted:.1} km/h");
        speed = adjusted;
    }

    let params = RequestParameters::new(GeoPoint::new(args.lat, args.lng), speed, args.minutes, mode)
        .with_terrain(terrain);

    let weather_client = if args.weather {
        weather_source(&config)
    } else {
        None
    };

    let result = match &weather_client {
        Some(client) => engine.generate_with_weather(params, client).await?,
        None => engine.generate(params).await?,
    };

    if result.is_fallback() {
        warn!("The isochrone service was unavailable; the area is an approximate circle.");
    }
    if let Some(description) = result.weather_description() {
        info!("weather: {description}");
    }

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write GeoJSON to {}", path.display()))?;
            println!("Wrote reachability area to {}", path.display());
        }
        None => println!("{json}"),
    }

    if args.bbox {
        match result.bounding_box() {
            Some(bbox) => eprintln!("bbox: {:?}", bbox.corners()),
            None => warn!("result has no polygon to derive a bounding box from"),
        }
    }

    Ok(())
}

async fn show_weather(lat: f64, lng: f64, mode: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mode = TravelMode::from_name_lenient(mode);
    let Some(client) = weather_source(&config) else {
        return Ok(());
    };

    let location = GeoPoint::new(lat, lng);
    match client.current(location).await {
        Some(weather) => {
            println!("{}", describe_weather(&weather));
            if let Some(at) = weather.observed_at {
                println!("Observed at: {at} (local time)");
            }
            println!(
                "Speed multiplier for {mode}: {:.2}",
                weather_multiplier(&weather, mode)
            );
        }
        None => println!("Wetterdaten nicht verfügbar"),
    }

    Ok(())
}

/// The configured weather client, warning when lookups are switched off.
fn weather_source(config: &Config) -> Option<OpenMeteoClient> {
    let client = config.weather_client();
    if client.is_none() {
        warn!("weather lookups are disabled in the configuration");
    }
    client
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "reach", "generate", "--lat", "-33.86", "--lng", "151.2", "--minutes", "30",
            "--mode", "biking", "--slope", "-3",
        ])
        .expect("valid arguments");

        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.lat, -33.86);
        assert_eq!(args.slope, Some(-3.0));
        assert_eq!(args.terrain, "cross-country");
        assert!(args.speed.is_none());
    }

    #[test]
    fn disabled_weather_yields_no_client() {
        let mut config = Config::default();
        assert!(weather_source(&config).is_some());

        config.weather.enabled = false;
        assert!(weather_source(&config).is_none());
    }

    #[test]
    fn minutes_are_required() {
        assert!(Cli::try_parse_from(["reach", "generate", "--lat", "49", "--lng", "8"]).is_err());
    }
}
