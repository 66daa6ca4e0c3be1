//! Pipeline settings for the stock market pipeline.
//!
//! This module provides configuration for the data pipeline: the symbol to
//! fetch, storage paths, the formatting container image, sensor polling
//! parameters, and the warehouse target.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the stock market pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    // Market settings
    /// Ticker symbol to fetch prices for.
    pub symbol: String,
    /// Connection id for the finance API.
    pub api_conn_id: String,

    // Storage settings
    /// Root directory for raw and formatted price data.
    pub storage_root: PathBuf,

    // Formatting settings
    /// Container image used by the formatting job.
    pub format_image: String,
    /// Docker daemon URL; `None` connects with local defaults.
    pub docker_url: Option<String>,
    /// Run the formatting job in a container. When disabled the in-process
    /// reformatter produces the same CSV layout.
    pub format_in_container: bool,
    /// Network mode for the formatting container, e.g. "container:spark-master"
    /// to share a Spark master's network namespace.
    pub format_network_mode: Option<String>,

    // Sensor settings
    /// Interval between availability probes.
    pub poke_interval: Duration,
    /// Total time the availability sensor may wait before failing the run.
    pub sensor_timeout: Duration,

    // Warehouse settings
    /// Connection id for the warehouse database.
    pub warehouse_conn_id: String,
    /// Target table for the formatted prices.
    pub warehouse_table: String,
    /// Schema holding the target table.
    pub warehouse_schema: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            api_conn_id: "stock_api".to_string(),

            storage_root: PathBuf::from("./data/stock-market"),

            format_image: "stockflow/stock-app".to_string(),
            docker_url: None,
            format_in_container: true,
            format_network_mode: None,

            poke_interval: Duration::from_secs(30),
            sensor_timeout: Duration::from_secs(300),

            warehouse_conn_id: "postgres".to_string(),
            warehouse_table: "stock_market".to_string(),
            warehouse_schema: "public".to_string(),
        }
    }
}

impl PipelineSettings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `STOCKFLOW_SYMBOL`: Ticker symbol (default: AAPL)
    /// - `STOCKFLOW_API_CONN_ID`: Finance API connection id (default: stock_api)
    /// - `STOCKFLOW_STORAGE_ROOT`: Storage root (default: ./data/stock-market)
    /// - `STOCKFLOW_FORMAT_IMAGE`: Formatting container image
    /// - `STOCKFLOW_DOCKER_URL`: Docker daemon URL (default: local defaults)
    /// - `STOCKFLOW_FORMAT_IN_CONTAINER`: Use the container formatter (default: true)
    /// - `STOCKFLOW_FORMAT_NETWORK_MODE`: Formatting container network mode (default: unset)
    /// - `STOCKFLOW_POKE_INTERVAL_SECS`: Sensor poke interval (default: 30)
    /// - `STOCKFLOW_SENSOR_TIMEOUT_SECS`: Sensor timeout (default: 300)
    /// - `STOCKFLOW_WAREHOUSE_CONN_ID`: Warehouse connection id (default: postgres)
    /// - `STOCKFLOW_WAREHOUSE_TABLE`: Target table (default: stock_market)
    /// - `STOCKFLOW_WAREHOUSE_SCHEMA`: Target schema (default: public)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting settings fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Ok(val) = std::env::var("STOCKFLOW_SYMBOL") {
            settings.symbol = val;
        }

        if let Ok(val) = std::env::var("STOCKFLOW_API_CONN_ID") {
            settings.api_conn_id = val;
        }

        if let Ok(val) = std::env::var("STOCKFLOW_STORAGE_ROOT") {
            settings.storage_root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("STOCKFLOW_FORMAT_IMAGE") {
            settings.format_image = val;
        }

        if let Ok(val) = std::env::var("STOCKFLOW_DOCKER_URL") {
            settings.docker_url = Some(val);
        }

        if let Ok(val) = std::env::var("STOCKFLOW_FORMAT_IN_CONTAINER") {
            settings.format_in_container = parse_env_bool(&val, "STOCKFLOW_FORMAT_IN_CONTAINER")?;
        }

        if let Ok(val) = std::env::var("STOCKFLOW_FORMAT_NETWORK_MODE") {
            settings.format_network_mode = Some(val);
        }

        if let Ok(val) = std::env::var("STOCKFLOW_POKE_INTERVAL_SECS") {
            let secs: u64 = parse_env_value(&val, "STOCKFLOW_POKE_INTERVAL_SECS")?;
            settings.poke_interval = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("STOCKFLOW_SENSOR_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "STOCKFLOW_SENSOR_TIMEOUT_SECS")?;
            settings.sensor_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("STOCKFLOW_WAREHOUSE_CONN_ID") {
            settings.warehouse_conn_id = val;
        }

        if let Ok(val) = std::env::var("STOCKFLOW_WAREHOUSE_TABLE") {
            settings.warehouse_table = val;
        }

        if let Ok(val) = std::env::var("STOCKFLOW_WAREHOUSE_SCHEMA") {
            settings.warehouse_schema = val;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "symbol cannot be empty".to_string(),
            ));
        }

        if self.api_conn_id.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_conn_id cannot be empty".to_string(),
            ));
        }

        if self.format_image.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "format_image cannot be empty".to_string(),
            ));
        }

        if self.poke_interval.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "poke_interval must be greater than 0".to_string(),
            ));
        }

        if self.sensor_timeout < self.poke_interval {
            return Err(ConfigError::ValidationFailed(
                "sensor_timeout must be at least poke_interval".to_string(),
            ));
        }

        if !is_sql_identifier(&self.warehouse_table) {
            return Err(ConfigError::ValidationFailed(format!(
                "warehouse_table '{}' is not a valid identifier",
                self.warehouse_table
            )));
        }

        if !is_sql_identifier(&self.warehouse_schema) {
            return Err(ConfigError::ValidationFailed(format!(
                "warehouse_schema '{}' is not a valid identifier",
                self.warehouse_schema
            )));
        }

        Ok(())
    }

    /// Builder method to set the ticker symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Builder method to set the storage root.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Builder method to set the formatting container image.
    pub fn with_format_image(mut self, image: impl Into<String>) -> Self {
        self.format_image = image.into();
        self
    }

    /// Builder method to set the Docker daemon URL.
    pub fn with_docker_url(mut self, url: impl Into<String>) -> Self {
        self.docker_url = Some(url.into());
        self
    }

    /// Builder method to enable or disable the container formatter.
    pub fn with_format_in_container(mut self, enabled: bool) -> Self {
        self.format_in_container = enabled;
        self
    }

    /// Builder method to set the formatting container network mode.
    pub fn with_format_network_mode(mut self, mode: impl Into<String>) -> Self {
        self.format_network_mode = Some(mode.into());
        self
    }

    /// Builder method to set the sensor poke interval.
    pub fn with_poke_interval(mut self, interval: Duration) -> Self {
        self.poke_interval = interval;
        self
    }

    /// Builder method to set the sensor timeout.
    pub fn with_sensor_timeout(mut self, timeout: Duration) -> Self {
        self.sensor_timeout = timeout;
        self
    }

    /// Builder method to set the warehouse table.
    pub fn with_warehouse_table(mut self, table: impl Into<String>) -> Self {
        self.warehouse_table = table.into();
        self
    }

    /// Builder method to set the warehouse schema.
    pub fn with_warehouse_schema(mut self, schema: impl Into<String>) -> Self {
        self.warehouse_schema = schema.into();
        self
    }
}

/// A table or schema name usable without quoting.
fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.symbol, "AAPL");
        assert_eq!(settings.api_conn_id, "stock_api");
        assert_eq!(settings.format_image, "stockflow/stock-app");
        assert!(settings.docker_url.is_none());
        assert!(settings.format_in_container);
        assert!(settings.format_network_mode.is_none());
        assert_eq!(settings.poke_interval, Duration::from_secs(30));
        assert_eq!(settings.sensor_timeout, Duration::from_secs(300));
        assert_eq!(settings.warehouse_table, "stock_market");
        assert_eq!(settings.warehouse_schema, "public");
    }

    #[test]
    fn test_settings_builder() {
        let settings = PipelineSettings::new()
            .with_symbol("NVDA")
            .with_storage_root("/tmp/prices")
            .with_format_image("stockflow/formatter:2")
            .with_docker_url("tcp://docker-proxy:2375")
            .with_format_in_container(false)
            .with_format_network_mode("container:spark-master")
            .with_poke_interval(Duration::from_secs(5))
            .with_sensor_timeout(Duration::from_secs(60))
            .with_warehouse_table("quotes")
            .with_warehouse_schema("market");

        assert_eq!(settings.symbol, "NVDA");
        assert_eq!(settings.storage_root, PathBuf::from("/tmp/prices"));
        assert_eq!(settings.format_image, "stockflow/formatter:2");
        assert_eq!(settings.docker_url.as_deref(), Some("tcp://docker-proxy:2375"));
        assert!(!settings.format_in_container);
        assert_eq!(
            settings.format_network_mode.as_deref(),
            Some("container:spark-master")
        );
        assert_eq!(settings.poke_interval, Duration::from_secs(5));
        assert_eq!(settings.sensor_timeout, Duration::from_secs(60));
        assert_eq!(settings.warehouse_table, "quotes");
        assert_eq!(settings.warehouse_schema, "market");
    }

    #[test]
    fn test_validation_valid_settings() {
        let settings = PipelineSettings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_symbol() {
        let settings = PipelineSettings::default().with_symbol("");
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("symbol"));
    }

    #[test]
    fn test_validation_empty_image() {
        let settings = PipelineSettings::default().with_format_image("");
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("format_image"));
    }

    #[test]
    fn test_validation_zero_poke_interval() {
        let settings = PipelineSettings::default().with_poke_interval(Duration::from_secs(0));
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("poke_interval"));
    }

    #[test]
    fn test_validation_timeout_below_interval() {
        let settings = PipelineSettings::default()
            .with_poke_interval(Duration::from_secs(60))
            .with_sensor_timeout(Duration::from_secs(30));
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("sensor_timeout"));
    }

    #[test]
    fn test_validation_bad_table_name() {
        let settings = PipelineSettings::default().with_warehouse_table("stock market; drop");
        let result = settings.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("warehouse_table"));
    }

    #[test]
    fn test_is_sql_identifier() {
        assert!(is_sql_identifier("stock_market"));
        assert!(is_sql_identifier("_private"));
        assert!(is_sql_identifier("t1"));

        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("1table"));
        assert!(!is_sql_identifier("bad-name"));
        assert!(!is_sql_identifier("bad name"));
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("true", "test").unwrap());
        assert!(parse_env_bool("1", "test").unwrap());
        assert!(parse_env_bool("YES", "test").unwrap());

        assert!(!parse_env_bool("false", "test").unwrap());
        assert!(!parse_env_bool("off", "test").unwrap());

        assert!(parse_env_bool("invalid", "test").is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "KEY".to_string(),
            message: "bad value".to_string(),
        };
        assert!(err.to_string().contains("KEY"));
        assert!(err.to_string().contains("bad value"));

        let err = ConfigError::ValidationFailed("test failure".to_string());
        assert!(err.to_string().contains("test failure"));
    }
}
