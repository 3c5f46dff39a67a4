//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signal_tracker::TrackerConfig;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub tracking: TrackerConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

fn default_host() -> String {
    "test.mosquitto.org".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "smart_ambulance/location".to_string()
}

fn default_client_id() -> String {
    format!("signal-tracker-{}", std::process::id())
}

fn default_keep_alive() -> u64 {
    60
}

fn default_reconnect_delay() -> u64 {
    2000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            topic: default_topic(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

impl BrokerConfig {
    /// Human-readable source description for reports
    pub fn describe(&self) -> String {
        format!("mqtt://{}:{} ({})", self.host, self.port, self.topic)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh")]
    pub refresh_ms: u64,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_refresh() -> u64 {
    1000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh(),
            format: OutputFormat::default(),
        }
    }
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("Failed to parse config")?;

    config
        .tracking
        .validate()
        .context("Invalid [tracking] section")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_tracker::MissingFieldPolicy;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [broker]
            host = "localhost"
            topic = "fleet/ambulance-7/location"

            [tracking]
            threshold_m = 150.0
            missing_field = "reject"
            default_position = { lat = 51.5, lng = -0.12 }

            [[tracking.sites]]
            name = "Market Street"
            lat = 51.501
            lng = -0.121

            [display]
            refresh_ms = 250
            format = "json"
        "#;

        let config = parse_config(toml_content).unwrap();
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.topic, "fleet/ambulance-7/location");
        assert_eq!(config.tracking.threshold_m, 150.0);
        assert_eq!(config.tracking.missing_field, MissingFieldPolicy::Reject);
        assert_eq!(config.tracking.sites.len(), 1);
        assert_eq!(config.tracking.sites[0].name, "Market Street");
        assert_eq!(config.tracking.default_position.lat, 51.5);
        assert_eq!(config.display.refresh_ms, 250);
        assert_eq!(config.display.format, OutputFormat::Json);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.broker.host, "test.mosquitto.org");
        assert_eq!(config.broker.topic, "smart_ambulance/location");
        assert_eq!(config.broker.keep_alive_secs, 60);
        assert_eq!(config.tracking.threshold_m, 200.0);
        assert_eq!(config.tracking.sites.len(), 3);
        assert_eq!(config.display.format, OutputFormat::Txt);
    }

    #[test]
    fn test_non_numeric_threshold_rejected() {
        assert!(parse_config("[tracking]\nthreshold_m = \"near\"\n").is_err());
    }

    #[test]
    fn test_duplicate_sites_rejected() {
        let toml_content = r#"
            [[tracking.sites]]
            name = "A"
            lat = 1.0
            lng = 1.0

            [[tracking.sites]]
            name = "A"
            lat = 2.0
            lng = 2.0
        "#;
        let err = parse_config(toml_content).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate signal site name"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[broker]\nport = 8883").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.broker.port, 8883);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/tracker.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
