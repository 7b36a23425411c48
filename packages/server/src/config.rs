//! Dashboard configuration.
//!
//! A TOML file with `[incidents]`, `[boundaries]`, `[output]` and
//! `[server]` tables. Every table is optional, and command-line flags
//! override the paths and the listen address.

use std::path::{Path, PathBuf};

use clap::Parser;
use fire_map_geography::BoundarySourceConfig;
use fire_map_source::IncidentSourceConfig;
use serde::Deserialize;

use crate::PipelineError;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "fire_map.toml";

/// Complete dashboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Incident CSV source.
    pub incidents: IncidentSourceConfig,
    /// Commune boundary source.
    pub boundaries: BoundarySourceConfig,
    /// Generated artifacts.
    pub output: OutputConfig,
    /// HTTP listener.
    pub server: ServerConfig,
}

/// Where generated artifacts are written and served from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Joined `GeoJSON` artifact, rewritten on every startup.
    pub geojson_path: PathBuf,
    /// Directory of pre-rendered map pages served under `/html`.
    pub html_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            geojson_path: PathBuf::from("data/generated/all_communes.geojson"),
            html_dir: None,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8050,
        }
    }
}

impl DashboardConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] if the text is not valid TOML or
    /// does not match the expected shape.
    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the file cannot be read, or
    /// [`PipelineError::Toml`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml(&text)
    }

    /// Resolves the configuration for the given command-line arguments.
    ///
    /// An explicit `--config` must exist. Without one, `fire_map.toml` is
    /// read when present and the built-in defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the selected file cannot be read or
    /// parsed.
    pub fn resolve(args: &Args) -> Result<Self, PipelineError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.is_file() {
                    Self::load(path)?
                } else {
                    log::info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
                    Self::default()
                }
            }
        };
        config.apply(args);
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn apply(&mut self, args: &Args) {
        if let Some(path) = &args.incidents {
            self.incidents.path.clone_from(path);
        }
        if let Some(path) = &args.boundaries {
            self.boundaries.path.clone_from(path);
        }
        if let Some(path) = &args.output {
            self.output.geojson_path.clone_from(path);
        }
        if let Some(dir) = &args.html_dir {
            self.output.html_dir = Some(dir.clone());
        }
        if let Some(addr) = &args.bind_addr {
            self.server.bind_addr.clone_from(addr);
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
    }
}

/// Command-line arguments.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "fire_map_server")]
#[command(about = "Forest-fire dashboard API server")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Incident CSV file.
    #[arg(long)]
    pub incidents: Option<PathBuf>,

    /// Commune boundary `GeoJSON` file.
    #[arg(long)]
    pub boundaries: Option<PathBuf>,

    /// Destination of the joined `GeoJSON` artifact.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory of static map pages served under `/html`.
    #[arg(long)]
    pub html_dir: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    pub bind_addr: Option<String>,

    /// Port to bind.
    #[arg(long)]
    pub port: Option<u16>,

    /// Write the joined artifact and exit without serving.
    #[arg(long)]
    pub prepare_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = DashboardConfig::from_toml("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.server.port, 8050);
        assert_eq!(config.incidents.region_prefix, "13");
        assert_eq!(config.boundaries.default_epsg, 2154);
    }

    #[test]
    fn partial_tables() {
        let config = DashboardConfig::from_toml(
            r#"
            [incidents]
            path = "fires.csv"
            year_max = 2022

            [incidents.columns]
            commune_name = "Nom"

            [output]
            html_dir = "html"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.incidents.path, PathBuf::from("fires.csv"));
        assert_eq!(config.incidents.year_max, 2022);
        assert_eq!(config.incidents.year_min, 1970);
        assert_eq!(config.incidents.columns.commune_name, "Nom");
        assert_eq!(config.incidents.columns.alert_time, "Alerte");
        assert_eq!(config.output.html_dir, Some(PathBuf::from("html")));
        assert_eq!(
            config.output.geojson_path,
            PathBuf::from("data/generated/all_communes.geojson")
        );
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let err = DashboardConfig::from_toml("[server]\nport = \"eighty\"").unwrap_err();
        assert!(matches!(err, PipelineError::Toml(_)));
    }

    #[test]
    fn flags_override_file() {
        let args = Args::parse_from([
            "fire_map_server",
            "--incidents",
            "a.csv",
            "--output",
            "out/joined.geojson",
            "--bind-addr",
            "0.0.0.0",
            "--port",
            "8123",
            "--prepare-only",
        ]);
        assert!(args.prepare_only);

        let mut config = DashboardConfig::default();
        config.apply(&args);

        assert_eq!(config.incidents.path, PathBuf::from("a.csv"));
        assert_eq!(config.boundaries.path, PathBuf::from("data/communes.geojson"));
        assert_eq!(config.output.geojson_path, PathBuf::from("out/joined.geojson"));
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn missing_explicit_config_fails() {
        let args = Args {
            config: Some(std::env::temp_dir().join("fire_map_missing_config.toml")),
            ..Args::default()
        };
        let err = DashboardConfig::resolve(&args).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }
}
