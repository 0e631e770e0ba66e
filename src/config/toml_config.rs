use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str =
    "http://portal.chmi.cz/files/portal/docs/meteo/opss/pocasicko_nejnovejsi/st_pudni_teploty_cz.html";

/// Complete run configuration. Every field has a default, so an empty file
/// (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub parse: ParseConfig,
    pub sink: SinkConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_seconds: u64,
    /// Extra attempts after a failed fetch. Zero keeps the single-shot behaviour.
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub user_agent: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout_seconds: 30,
            retry_attempts: 0,
            retry_delay_seconds: 5,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidValuePolicy {
    /// Abort the run on the first unreadable number.
    #[default]
    Fail,
    /// Keep the row with the value missing; it is dropped before the sink.
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub timezone: String,
    pub time_format: String,
    pub on_invalid_value: InvalidValuePolicy,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Prague".to_string(),
            time_format: "%Y.%m.%d %H:%M:%S".to_string(),
            on_invalid_value: InvalidValuePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Influx,
    Csv,
}

impl std::str::FromStr for SinkKind {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "influx" | "influxdb" => Ok(SinkKind::Influx),
            "csv" => Ok(SinkKind::Csv),
            other => Err(EtlError::InvalidConfigValueError {
                field: "sink.kind".to_string(),
                value: other.to_string(),
                reason: "Valid sinks: influx, csv".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub host: String,
    pub port: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub measurement: String,
    pub tag_key: String,
    pub ssl: bool,
    /// Defaults to `ssl` when unset.
    pub verify_ssl: Option<bool>,
    pub output_path: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Influx,
            host: "localhost".to_string(),
            port: 8086,
            username: None,
            password: None,
            database: "db0".to_string(),
            measurement: "soil_temp".to_string(),
            tag_key: crate::domain::model::STATION_COLUMN.to_string(),
            ssl: false,
            verify_ssl: None,
            output_path: "./output".to_string(),
        }
    }
}

impl SinkConfig {
    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl.unwrap_or(self.ssl)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl EtlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unknown variables are left
    /// as is; validation rejects them in credential fields.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ProcessingError {
            message: format!("env placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.url", &self.source.url)?;
        validation::validate_range("source.timeout_seconds", self.source.timeout_seconds, 1, 600)?;
        validation::validate_range("source.retry_attempts", self.source.retry_attempts, 0, 10)?;

        validation::parse_timezone("parse.timezone", &self.parse.timezone)?;
        validation::validate_time_format("parse.time_format", &self.parse.time_format)?;

        match self.sink.kind {
            SinkKind::Influx => {
                validation::validate_non_empty_string("sink.host", &self.sink.host)?;
                validation::validate_range("sink.port", self.sink.port, 1, 65535)?;
                validation::validate_non_empty_string("sink.database", &self.sink.database)?;
                validation::validate_non_empty_string("sink.measurement", &self.sink.measurement)?;
                validation::validate_non_empty_string("sink.tag_key", &self.sink.tag_key)?;
                validation::validate_resolved("sink.username", self.sink.username.as_deref())?;
                validation::validate_resolved("sink.password", self.sink.password.as_deref())?;
                if self.sink.password.is_some() {
                    validation::validate_required_field("sink.username", &self.sink.username)?;
                }
            }
            SinkKind::Csv => {
                validation::validate_path("sink.output_path", &self.sink.output_path)?;
            }
        }

        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        validation::parse_timezone("parse.timezone", &self.parse.timezone)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
