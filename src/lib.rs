//! County Environmental Impact
//!
//! Estimates carbon, water and water-scarcity footprints of on-site power and
//! water use for every U.S. county, and buckets them into map colors.
//!
//! Module layout (leaves first):
//! - `units`: on-site power/water unit conversion to annual values
//! - `footprint`: per-county footprint formulas
//! - `classify`: 33rd/67th percentile color classification
//! - `format`: tooltip and statistics string formatting
//! - `data` / `boundaries`: reference table and GeoJSON loading
//! - `pipeline`: joins everything into an `ImpactReport`
//! - `api_server`: Axum JSON API (feature `api`)

pub mod units;
pub mod footprint;
pub mod classify;
pub mod format;
pub mod config;
pub mod data;
pub mod boundaries;
pub mod pipeline;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use units::{to_annual_energy, to_annual_volume, PowerUnit, WaterUnit};
pub use footprint::{carbon_footprint, water_footprint, water_scarcity_footprint, EmissionFactors, Footprints};
pub use classify::{classify_values, Classification, ColorCategory, Thresholds};
pub use format::{format_scientific, format_sig3, MISSING};
pub use config::DashboardConfig;
pub use data::{CountyRecord, LoadError, ReferenceData};
pub use boundaries::{BoundarySet, FilteredBoundaries};
pub use pipeline::{
    CountyImpactRow, ImpactMetric, ImpactPipeline, ImpactQuery, ImpactReport, MetricSummary,
    OnsiteInputs, StateFilter, ALL_STATES,
};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
