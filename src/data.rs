//! Reference Data Loading
//!
//! Loads the three datasets the dashboard needs, once, into an immutable
//! [`ReferenceData`] context:
//!
//! - County table (CSV): fips, county_name, state_name, optional state_abbr
//! - Factor table (CSV or Parquet): fips, EWIF, EF, ACF, SWI by position
//! - County boundaries (GeoJSON FeatureCollection)
//!
//! Tables are read with Polars as all-string columns and coerced here, so a
//! non-numeric factor becomes `None` instead of failing the whole load.

use crate::boundaries::BoundarySet;
use crate::config::DashboardConfig;
use crate::footprint::EmissionFactors;
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Width of a county FIPS code
pub const FIPS_WIDTH: usize = 5;

/// Number of leading factor-table columns used (fips, EWIF, EF, ACF, SWI)
pub const FACTOR_COLUMNS: usize = 5;

/// Dataset load failure
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("{}: missing column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}: expected at least {expected} columns (fips, EWIF, EF, ACF, SWI), found {found}", .path.display())]
    TooFewColumns {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{}: invalid GeoJSON: {reason}", .path.display())]
    InvalidGeoJson { path: PathBuf, reason: String },
}

/// County reference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountyRecord {
    pub fips: String,
    pub county_name: String,
    pub state_name: String,
    pub state_abbr: String,
}

/// Normalize a FIPS code to 5 zero-padded characters
///
/// Accepts `"1001"`, `"01001"`, `" 1001 "` and float renderings like `"1001.0"`.
/// Returns `None` for empty input.
pub fn normalize_fips(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let digits = if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed.to_string()
    } else {
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => format!("{:.0}", v),
            _ => trimmed.to_string(),
        }
    };

    Some(format!("{:0>width$}", digits, width = FIPS_WIDTH))
}

/// Parse a factor cell; anything non-numeric or non-finite is missing
pub fn parse_factor(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// State abbreviation fallback: first two letters, upper-cased
pub fn derive_state_abbr(state_name: &str) -> String {
    let abbr: String = state_name.trim().chars().take(2).collect::<String>().to_uppercase();
    if abbr.is_empty() {
        "??".to_string()
    } else {
        abbr
    }
}

fn ensure_exists(path: &Path) -> Result<(), LoadError> {
    if path.exists() {
        Ok(())
    } else {
        Err(LoadError::NotFound(path.to_path_buf()))
    }
}

fn table_error(path: &Path) -> impl FnOnce(PolarsError) -> LoadError + '_ {
    move |source| LoadError::Table {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a CSV with every column as a (lossily decoded) string
fn read_csv_as_strings(path: &Path, has_header: bool) -> Result<DataFrame, LoadError> {
    CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_encoding(CsvEncoding::LossyUtf8))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(table_error(path))?
        .finish()
        .map_err(table_error(path))
}

/// Column by name, ignoring surrounding whitespace in the header
fn find_column<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Column> {
    df.get_columns()
        .iter()
        .find(|c| c.name().as_str().trim() == name)
}

/// Column values as optional strings (numeric columns are rendered first)
fn string_values(column: &Column, path: &Path) -> Result<Vec<Option<String>>, LoadError> {
    let as_str = column.cast(&DataType::String).map_err(table_error(path))?;
    let chunked = as_str.str().map_err(table_error(path))?;
    Ok(chunked
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

fn required_strings(df: &DataFrame, name: &str, path: &Path) -> Result<Vec<Option<String>>, LoadError> {
    let column = find_column(df, name).ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    string_values(column, path)
}

/// Load the county reference table
///
/// Rows missing fips, county_name or state_name are dropped. Duplicate fips keep
/// the first row.
pub fn load_county_table(path: &Path) -> Result<Vec<CountyRecord>, LoadError> {
    ensure_exists(path)?;
    let df = read_csv_as_strings(path, true)?;

    let fips = required_strings(&df, "fips", path)?;
    let county_names = required_strings(&df, "county_name", path)?;
    let state_names = required_strings(&df, "state_name", path)?;
    let state_abbrs = match find_column(&df, "state_abbr") {
        Some(column) => Some(string_values(column, path)?),
        None => None,
    };

    let mut seen = FxHashSet::default();
    let mut records = Vec::with_capacity(df.height());
    let mut dropped = 0usize;

    for i in 0..df.height() {
        let fips = fips[i].as_deref().and_then(normalize_fips);
        let county = county_names[i].as_deref().map(str::trim).filter(|s| !s.is_empty());
        let state = state_names[i].as_deref().map(str::trim).filter(|s| !s.is_empty());

        let (Some(fips), Some(county), Some(state)) = (fips, county, state) else {
            dropped += 1;
            continue;
        };
        if !seen.insert(fips.clone()) {
            continue;
        }

        let state_abbr = state_abbrs
            .as_ref()
            .and_then(|abbrs| abbrs[i].as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derive_state_abbr(state));

        records.push(CountyRecord {
            fips,
            county_name: county.to_string(),
            state_name: state.to_string(),
            state_abbr,
        });
    }

    if dropped > 0 {
        tracing::debug!("County table: dropped {} incomplete rows", dropped);
    }
    Ok(records)
}

/// Load the factor table (CSV or Parquet)
///
/// The first five columns are taken by position as fips, EWIF, EF, ACF, SWI, so
/// the file may or may not carry a header row. Rows whose fips is not a number
/// (a header row included) or whose EF cell is blank are dropped. A non-numeric
/// EF keeps the row, with only EF missing.
pub fn load_factor_table(path: &Path) -> Result<FxHashMap<String, EmissionFactors>, LoadError> {
    ensure_exists(path)?;

    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    let df = if is_parquet {
        LazyFrame::scan_parquet(path, Default::default())
            .and_then(|lf| lf.collect())
            .map_err(table_error(path))?
    } else {
        read_csv_as_strings(path, false)?
    };

    if df.width() < FACTOR_COLUMNS {
        return Err(LoadError::TooFewColumns {
            path: path.to_path_buf(),
            expected: FACTOR_COLUMNS,
            found: df.width(),
        });
    }

    let columns = df.get_columns();
    let fips = string_values(&columns[0], path)?;
    let ewif = string_values(&columns[1], path)?;
    let ef = string_values(&columns[2], path)?;
    let acf = string_values(&columns[3], path)?;
    let swi = string_values(&columns[4], path)?;

    let mut factors = FxHashMap::default();
    for i in 0..df.height() {
        let Some(fips) = fips[i]
            .as_deref()
            .and_then(normalize_fips)
            .filter(|f| f.bytes().all(|b| b.is_ascii_digit()))
        else {
            continue;
        };
        if ef[i].as_deref().map_or(true, |cell| cell.trim().is_empty()) {
            continue;
        }
        let row = EmissionFactors {
            ewif: parse_factor(ewif[i].as_deref()),
            ef: parse_factor(ef[i].as_deref()),
            acf: parse_factor(acf[i].as_deref()),
            swi: parse_factor(swi[i].as_deref()),
        };
        factors.entry(fips).or_insert(row);
    }

    Ok(factors)
}

/// Immutable reference datasets shared by every request
#[derive(Debug, Clone)]
pub struct ReferenceData {
    counties: FxHashMap<String, CountyRecord>,
    factors: FxHashMap<String, EmissionFactors>,
    boundaries: BoundarySet,
    state_names: Vec<String>,
    factors_degraded: bool,
}

impl ReferenceData {
    /// Load all datasets
    ///
    /// County and boundary data are required. A factor table that fails to load is
    /// replaced by an empty one: every footprint then reports missing data.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let county_path = config.county_table_path();
        let factor_path = config.factor_table_path();
        let boundary_path = config.boundary_path();

        tracing::info!("Loading county table: {}", county_path.display());
        let counties = load_county_table(&county_path)
            .with_context(|| "Error loading county data")?;

        tracing::info!("Loading county boundaries: {}", boundary_path.display());
        let boundaries = BoundarySet::load(&boundary_path)
            .with_context(|| "Error loading map data")?;

        tracing::info!("Loading emission factors: {}", factor_path.display());
        let (factors, factors_degraded) = match load_factor_table(&factor_path) {
            Ok(factors) => (factors, false),
            Err(e) => {
                tracing::warn!(
                    "Emission data could not be loaded ({}). Continuing without emission factors.",
                    e
                );
                (FxHashMap::default(), true)
            }
        };

        let mut data = Self::from_parts(counties, factors, boundaries);
        data.factors_degraded = factors_degraded;

        tracing::info!("  Counties: {}", data.counties.len());
        tracing::info!("  Factor rows: {}", data.factors.len());
        tracing::info!("  Boundary features: {}", data.boundaries.len());
        tracing::info!("  States: {}", data.state_names.len());

        Ok(data)
    }

    /// Build from already-loaded parts (first record wins on duplicate fips)
    pub fn from_parts(
        counties: Vec<CountyRecord>,
        factors: FxHashMap<String, EmissionFactors>,
        boundaries: BoundarySet,
    ) -> Self {
        let mut by_fips = FxHashMap::default();
        for county in counties {
            by_fips.entry(county.fips.clone()).or_insert(county);
        }

        let mut state_names: Vec<String> = by_fips
            .values()
            .map(|c| c.state_name.clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        state_names.sort();

        let factors = factors
            .into_iter()
            .map(|(fips, f)| (fips, f.sanitized()))
            .collect();

        Self {
            counties: by_fips,
            factors,
            boundaries,
            state_names,
            factors_degraded: false,
        }
    }

    pub fn county(&self, fips: &str) -> Option<&CountyRecord> {
        self.counties.get(fips)
    }

    pub fn factors(&self, fips: &str) -> Option<&EmissionFactors> {
        self.factors.get(fips)
    }

    pub fn boundaries(&self) -> &BoundarySet {
        &self.boundaries
    }

    /// Sorted unique state names
    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    pub fn has_state(&self, state_name: &str) -> bool {
        self.state_names.binary_search_by(|s| s.as_str().cmp(state_name)).is_ok()
    }

    pub fn county_count(&self) -> usize {
        self.counties.len()
    }

    pub fn factor_count(&self) -> usize {
        self.factors.len()
    }

    /// True when the factor table failed to load and was replaced by an empty one
    pub fn factors_degraded(&self) -> bool {
        self.factors_degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fips() {
        assert_eq!(normalize_fips("1001").as_deref(), Some("01001"));
        assert_eq!(normalize_fips("01001").as_deref(), Some("01001"));
        assert_eq!(normalize_fips(" 6037 ").as_deref(), Some("06037"));
        assert_eq!(normalize_fips("1001.0").as_deref(), Some("01001"));
        assert_eq!(normalize_fips("48201").as_deref(), Some("48201"));
        assert_eq!(normalize_fips(""), None);
        assert_eq!(normalize_fips("   "), None);
    }

    #[test]
    fn test_parse_factor() {
        assert_eq!(parse_factor(Some("0.45")), Some(0.45));
        assert_eq!(parse_factor(Some(" 2 ")), Some(2.0));
        assert_eq!(parse_factor(Some("EF")), None);
        assert_eq!(parse_factor(Some("")), None);
        assert_eq!(parse_factor(Some("NaN")), None);
        assert_eq!(parse_factor(Some("inf")), None);
        assert_eq!(parse_factor(None), None);
    }

    #[test]
    fn test_derive_state_abbr() {
        assert_eq!(derive_state_abbr("Texas"), "TE");
        assert_eq!(derive_state_abbr(" ohio"), "OH");
        assert_eq!(derive_state_abbr(""), "??");
    }

    fn county(fips: &str, state: &str) -> CountyRecord {
        CountyRecord {
            fips: fips.to_string(),
            county_name: format!("County {}", fips),
            state_name: state.to_string(),
            state_abbr: derive_state_abbr(state),
        }
    }

    #[test]
    fn test_from_parts_states_sorted_unique() {
        let data = ReferenceData::from_parts(
            vec![county("06037", "California"), county("01001", "Alabama"), county("06001", "California")],
            FxHashMap::default(),
            BoundarySet::from_ids(&["01001", "06001", "06037"]),
        );
        assert_eq!(data.state_names(), &["Alabama".to_string(), "California".to_string()]);
        assert!(data.has_state("Alabama"));
        assert!(!data.has_state("Alaska"));
        assert_eq!(data.county_count(), 3);
        assert!(!data.factors_degraded());
    }

    #[test]
    fn test_from_parts_sanitizes_factors() {
        let mut factors = FxHashMap::default();
        factors.insert(
            "01001".to_string(),
            EmissionFactors { ewif: Some(f64::NAN), ef: Some(0.5), acf: None, swi: None },
        );
        let data = ReferenceData::from_parts(vec![], factors, BoundarySet::from_ids(&[]));
        assert_eq!(data.factors("01001").and_then(|f| f.ewif), None);
        assert_eq!(data.factors("01001").and_then(|f| f.ef), Some(0.5));
    }
}
