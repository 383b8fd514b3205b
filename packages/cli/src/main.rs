#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI tool for turning a customer CSV export into map layers.
//!
//! Reads geocoded customers, builds route/rep zones or heat layers and writes
//! them as `GeoJSON` feature collections for the dashboard frontend.

mod config;
mod input;
mod output;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use geojson::FeatureCollection;
use sales_map_customer_models::{CustomerRow, MeasureName};
use sales_map_heatmap::{build_bubbles, build_density, build_grid};
use sales_map_heatmap_models::DensityNormalization;
use sales_map_zones::{ZoneIndex, build_zones_with};
use sales_map_zones_models::ZoneGrouping;

use crate::config::load_config;
use crate::input::load_customers;

#[derive(Parser)]
#[command(name = "sales_map_cli", about = "Sales map layer generator")]
struct Cli {
    /// TOML config file; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IoArgs {
    /// Customer CSV export
    #[arg(long, short)]
    input: PathBuf,

    /// Output file; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convex-hull zones per route or per rep route
    Zones {
        #[command(flatten)]
        io: IoArgs,
        /// `route` or `rep`
        #[arg(long, value_parser = parse_grouping)]
        grouping: Option<ZoneGrouping>,
        /// Palette position of the first zone
        #[arg(long)]
        color_offset: Option<usize>,
    },
    /// Color-tiered grid of summed measure values
    Grid {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long, value_parser = MeasureName::parse)]
        measure: Option<MeasureName>,
        /// Decimal digits kept when snapping coordinates
        #[arg(long)]
        precision: Option<u8>,
        /// Color by ln(1 + sum); `--log=false` overrides the config
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        log: Option<bool>,
        #[arg(long)]
        tiers: Option<usize>,
        /// Include customers without sales
        #[arg(long)]
        include_idle: bool,
    },
    /// Weighted points for a density heat map
    Density {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long, value_parser = MeasureName::parse)]
        measure: Option<MeasureName>,
        /// `normal`, `percentile` or `clipped`
        #[arg(long, value_parser = parse_normalization)]
        normalization: Option<DensityNormalization>,
        /// Log-scale weights (normal mode only); `--log=false` overrides the config
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        log: Option<bool>,
        #[arg(long)]
        radius: Option<u32>,
        /// Include customers without sales
        #[arg(long)]
        include_idle: bool,
    },
    /// Customer bubbles sized by a measure
    Bubbles {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long, value_parser = MeasureName::parse)]
        measure: Option<MeasureName>,
    },
    /// Tag each customer with the zones containing it
    Locate {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long, value_parser = parse_grouping)]
        grouping: Option<ZoneGrouping>,
    },
}

fn parse_grouping(raw: &str) -> Result<ZoneGrouping, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("unknown grouping '{raw}': expected route or rep"))
}

fn parse_normalization(raw: &str) -> Result<DensityNormalization, String> {
    raw.trim().parse().map_err(|_| {
        format!("unknown normalization '{raw}': expected normal, percentile or clipped")
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Zones {
            io,
            grouping,
            color_offset,
        } => {
            set_if_given(&mut config.zones.grouping, grouping);
            set_if_given(&mut config.zones.color_offset, color_offset);

            let rows = load_customers(&io.input)?;
            let zones = build_zones_with(&rows, config.zones.grouping, &config.zones.style()?);
            log::info!(
                "Built {} {} zones from {} customers",
                zones.len(),
                config.zones.grouping,
                rows.len()
            );
            write_output(&output::zones_to_geojson(&zones), io.output.as_deref())?;
        }
        Commands::Grid {
            io,
            measure,
            precision,
            log: use_log,
            tiers,
            include_idle,
        } => {
            let measure = measure.unwrap_or(config.measure);
            set_if_given(&mut config.grid.precision, precision);
            set_if_given(&mut config.grid.tiers, tiers);
            set_if_given(&mut config.grid.use_log, use_log);
            config.grid.include_idle |= include_idle;

            let rows = selling(load_customers(&io.input)?, config.grid.include_idle);
            let tiers = build_grid(&rows, &config.grid_params(measure))?;
            log::info!("Binned {} customers into {} tiers", rows.len(), tiers.len());
            write_output(
                &output::tiers_to_geojson(&tiers, measure),
                io.output.as_deref(),
            )?;
        }
        Commands::Density {
            io,
            measure,
            normalization,
            log: use_log,
            radius,
            include_idle,
        } => {
            let measure = measure.unwrap_or(config.measure);
            set_if_given(&mut config.density.normalization, normalization);
            set_if_given(&mut config.density.radius, radius);
            set_if_given(&mut config.density.use_log, use_log);
            config.density.include_idle |= include_idle;

            let rows = selling(load_customers(&io.input)?, config.density.include_idle);
            let layer = build_density(&rows, &config.density_params(measure))?;
            log::info!("Weighted {} density points", layer.points.len());
            write_output(
                &output::density_to_geojson(&layer, measure),
                io.output.as_deref(),
            )?;
        }
        Commands::Bubbles { io, measure } => {
            let measure = measure.unwrap_or(config.measure);
            let rows = load_customers(&io.input)?;
            let layer = build_bubbles(&rows, measure)?;
            log::info!(
                "Sized {} bubbles ({} customers without sales)",
                layer.with_sales.len(),
                layer.without_sales.len()
            );
            write_output(
                &output::bubbles_to_geojson(&layer, measure),
                io.output.as_deref(),
            )?;
        }
        Commands::Locate { io, grouping } => {
            let grouping = grouping.unwrap_or(config.zones.grouping);
            let rows = load_customers(&io.input)?;
            let zones = build_zones_with(&rows, grouping, &config.zones.style()?);
            let index = ZoneIndex::new(&zones);
            write_output(
                &output::locations_to_geojson(&rows, &index),
                io.output.as_deref(),
            )?;
        }
    }

    Ok(())
}

/// Replaces a config value with a flag that was given on the command line.
fn set_if_given<T>(slot: &mut T, flag: Option<T>) {
    if let Some(value) = flag {
        *slot = value;
    }
}

/// Keeps only customers with units sold unless `include_idle` is set.
fn selling(rows: Vec<CustomerRow>, include_idle: bool) -> Vec<CustomerRow> {
    if include_idle {
        return rows;
    }
    let before = rows.len();
    let rows: Vec<CustomerRow> = rows.into_iter().filter(CustomerRow::has_sales).collect();
    log::debug!("Dropped {} customers without sales", before - rows.len());
    rows
}

/// Writes `collection` as pretty-printed JSON to `path`, or to stdout.
fn write_output(
    collection: &FeatureCollection,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(collection)?;

    if let Some(path) = path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        log::info!(
            "Wrote {} features to {}",
            collection.features.len(),
            path.display()
        );
    } else {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}")?;
    }

    Ok(())
}
