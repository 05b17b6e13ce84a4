//! Print the impact statistics block for one set of inputs
//!
//! Loads the reference data (paths from DATA_DIR / COUNTY_TABLE / FACTOR_TABLE /
//! BOUNDARY_FILE), computes the report and prints the percentile summary plus
//! the highest-impact counties.
//!
//! Usage:
//!   cargo run --bin impact_report -- --metric carbon --power 2 --power-unit MW --state Texas

use anyhow::{bail, Result};
use clap::Parser;
use county_impact_rust::{
    DashboardConfig, ImpactMetric, ImpactPipeline, ImpactQuery, OnsiteInputs, ReferenceData,
    StateFilter, ALL_STATES,
};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "impact-report")]
#[command(about = "County environmental impact statistics for on-site power and water use")]
struct Args {
    /// carbon, water or water_scarcity
    #[arg(short, long, default_value = "carbon")]
    metric: String,

    /// On-site power value
    #[arg(long, default_value = "0")]
    power: f64,

    /// kWh/yr, kWh/mo, kW or MW
    #[arg(long, default_value = "kWh/yr")]
    power_unit: String,

    /// On-site water value
    #[arg(long, default_value = "0")]
    water: f64,

    /// L/yr, L/mo, L/s, gpm or gal/mo
    #[arg(long, default_value = "L/yr")]
    water_unit: String,

    /// State name, or "All States"
    #[arg(short, long, default_value = ALL_STATES)]
    state: String,

    /// Number of highest-impact counties to list
    #[arg(short, long, default_value = "10")]
    top: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "county_impact_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let Some(metric) = ImpactMetric::parse(&args.metric) else {
        bail!("Unknown metric '{}' (expected carbon, water or water_scarcity)", args.metric);
    };
    if args.power < 0.0 || args.water < 0.0 {
        bail!("On-site power and water must be non-negative");
    }

    let config = DashboardConfig::from_env();
    let data = ReferenceData::load(&config)?;

    let state = StateFilter::parse(&args.state);
    if let StateFilter::State(name) = &state {
        if !data.has_state(name) {
            bail!("Unknown state '{}'", name);
        }
    }

    let pipeline = ImpactPipeline::new(Arc::new(data));
    let query = ImpactQuery {
        metric,
        inputs: OnsiteInputs::new(args.power, &args.power_unit, args.water, &args.water_unit),
        state,
    };

    let start = Instant::now();
    let report = pipeline.compute(&query);
    let elapsed = start.elapsed();

    println!("\n{}", "=".repeat(70));
    println!("{}", report.title);
    println!("{}", "=".repeat(70));

    for line in [&report.inputs.power_entered, &report.inputs.water_entered]
        .into_iter()
        .flatten()
    {
        println!("On-Site: {}", line);
    }
    for line in [&report.inputs.power_converted, &report.inputs.water_converted]
        .into_iter()
        .flatten()
    {
        println!("Converted: {}", line);
    }
    println!();

    for line in report.summary_lines() {
        println!("{}", line);
    }

    let mut ranked: Vec<_> = report
        .rows
        .iter()
        .filter_map(|row| metric.select(&row.footprints()).map(|v| (v, row)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    if !ranked.is_empty() && args.top > 0 {
        println!("\nHighest {} counties:", ranked.len().min(args.top));
        for (_, row) in ranked.iter().take(args.top) {
            let formatted = match metric {
                ImpactMetric::Carbon => &row.carbon_footprint_formatted,
                ImpactMetric::Water => &row.water_footprint_formatted,
                ImpactMetric::WaterScarcity => &row.water_scarcity_footprint_formatted,
            };
            println!(
                "  {} {:<30} {:<3} {:>10} {}  [{}]",
                row.fips,
                row.county_name,
                row.state_abbr,
                formatted,
                report.unit,
                row.color_category.as_str()
            );
        }
    }

    println!("\nComputed {} counties in {:?}", report.summary.total_count, elapsed);
    Ok(())
}
