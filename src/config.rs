//! Runtime configuration from environment variables
//!
//! | Variable        | Default                        |
//! |-----------------|--------------------------------|
//! | `DATA_DIR`      | `data`                         |
//! | `COUNTY_TABLE`  | `county_fips_master.csv`       |
//! | `FACTOR_TABLE`  | `inputdata.csv`                |
//! | `BOUNDARY_FILE` | `geojson-counties-fips.json`   |
//! | `PORT`          | `3000`                         |
//!
//! Relative file names resolve against `DATA_DIR`.

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_COUNTY_TABLE: &str = "county_fips_master.csv";
pub const DEFAULT_FACTOR_TABLE: &str = "inputdata.csv";
pub const DEFAULT_BOUNDARY_FILE: &str = "geojson-counties-fips.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub county_table: PathBuf,
    pub factor_table: PathBuf,
    pub boundary_file: PathBuf,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

impl DashboardConfig {
    /// Default file names under `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            county_table: PathBuf::from(DEFAULT_COUNTY_TABLE),
            factor_table: PathBuf::from(DEFAULT_FACTOR_TABLE),
            boundary_file: PathBuf::from(DEFAULT_BOUNDARY_FILE),
            port: DEFAULT_PORT,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::with_data_dir(
            non_empty("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        if let Some(path) = non_empty("COUNTY_TABLE") {
            config.county_table = PathBuf::from(path);
        }
        if let Some(path) = non_empty("FACTOR_TABLE") {
            config.factor_table = PathBuf::from(path);
        }
        if let Some(path) = non_empty("BOUNDARY_FILE") {
            config.boundary_file = PathBuf::from(path);
        }
        config.port = non_empty("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        config
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    pub fn county_table_path(&self) -> PathBuf {
        self.resolve(&self.county_table)
    }

    pub fn factor_table_path(&self) -> PathBuf {
        self.resolve(&self.factor_table)
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.resolve(&self.boundary_file)
    }
}
