use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DB_PATH: &str = "product-dashboard";
const DEFAULT_HISTOGRAM_BINS: usize = 20;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: PathBuf,

    /// CSV file of products to load into the database before serving.
    #[arg(long, value_name = "CSV_PATH")]
    pub import: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Bucket count of the rating histogram when a query does not give one.
    pub histogram_bins: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub database: DatabaseSettings,
    pub dashboard: DashboardSettings,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("database.path", DEFAULT_DB_PATH)?
            .set_default("dashboard.histogram_bins", 20)?;

        let cfg = builder.add_source(File::from(path)).build()?;

        cfg.try_deserialize()
    }
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let file = write_config("");
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.web.address, DEFAULT_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(settings.database.path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(settings.dashboard.histogram_bins, DEFAULT_HISTOGRAM_BINS);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            [web]
            address = "0.0.0.0:9090"

            [database]
            path = "/var/lib/dashboard"

            [dashboard]
            histogram_bins = 10
            "#,
        );
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.web.address.port(), 9090);
        assert_eq!(settings.database.path, PathBuf::from("/var/lib/dashboard"));
        assert_eq!(settings.dashboard.histogram_bins, 10);
    }

    #[test]
    fn bad_address_is_rejected() {
        let file = write_config("[web]\naddress = \"not an address\"\n");
        assert!(Settings::from_file(file.path()).is_err());
    }
}
