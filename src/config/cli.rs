use crate::config::toml_config::{EtlConfig, SinkKind};
use crate::utils::error::Result;
use clap::Parser;

/// Command line flags. Anything given here overrides the configuration file.
#[derive(Debug, Clone, Parser)]
#[command(name = "soil-etl")]
#[command(about = "Fetch the CHMI soil temperature table and write it to a time-series store")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Source page URL
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// IANA timezone of the capture timestamp
    #[arg(long)]
    pub timezone: Option<String>,

    #[arg(long)]
    pub time_format: Option<String>,

    /// Sink to write to: influx or csv
    #[arg(long)]
    pub sink: Option<String>,

    /// Hostname of the InfluxDB server
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u32>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long, env = "INFLUX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long)]
    pub database: Option<String>,

    #[arg(long)]
    pub measurement: Option<String>,

    /// Use https for the InfluxDB connection
    #[arg(long)]
    pub ssl: Option<bool>,

    /// Output directory for the csv sink
    #[arg(long)]
    pub output_path: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Log CPU and memory usage per phase
    #[arg(long)]
    pub monitor: bool,

    /// Fetch and parse, print the dataset, write nothing
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Loads the configuration file (if any) and applies the flag overrides.
    pub fn resolve(&self) -> Result<EtlConfig> {
        let mut config = match &self.config {
            Some(path) => EtlConfig::from_file(path)?,
            None => EtlConfig::default(),
        };
        self.apply_overrides(&mut config)?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut EtlConfig) -> Result<()> {
        if let Some(url) = &self.url {
            config.source.url = url.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            config.source.timeout_seconds = timeout;
        }
        if let Some(attempts) = self.retry_attempts {
            config.source.retry_attempts = attempts;
        }
        if let Some(tz) = &self.timezone {
            config.parse.timezone = tz.clone();
        }
        if let Some(format) = &self.time_format {
            config.parse.time_format = format.clone();
        }
        if let Some(sink) = &self.sink {
            config.sink.kind = sink.parse::<SinkKind>()?;
        }
        if let Some(host) = &self.host {
            config.sink.host = host.clone();
        }
        if let Some(port) = self.port {
            config.sink.port = port;
        }
        if let Some(username) = &self.username {
            config.sink.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.sink.password = Some(password.clone());
        }
        if let Some(database) = &self.database {
            config.sink.database = database.clone();
        }
        if let Some(measurement) = &self.measurement {
            config.sink.measurement = measurement.clone();
        }
        if let Some(ssl) = self.ssl {
            config.sink.ssl = ssl;
        }
        if let Some(path) = &self.output_path {
            config.sink.output_path = path.clone();
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
        Ok(())
    }
}
