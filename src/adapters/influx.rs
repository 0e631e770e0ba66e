//! InfluxDB 1.x HTTP write API sink, line protocol at second precision.

use crate::config::toml_config::SinkConfig;
use crate::domain::model::{Dataset, DEPTH_COLUMNS};
use crate::domain::ports::Sink;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Write;
use std::time::Duration;
use url::Url;

pub struct InfluxSink {
    client: Client,
    base_url: Url,
    database: String,
    measurement: String,
    tag_key: String,
    credentials: Option<(String, Option<String>)>,
}

impl InfluxSink {
    pub fn from_config(config: &SinkConfig, timeout: Duration) -> Result<Self> {
        let scheme = if config.ssl { "https" } else { "http" };
        let raw = format!("{}://{}:{}/", scheme, config.host, config.port);
        let base_url = Url::parse(&raw).map_err(|e| EtlError::InvalidConfigValueError {
            field: "sink.host".to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.ssl && !config.verify_ssl())
            .build()
            .map_err(|e| EtlError::ConfigValidationError {
                field: "sink".to_string(),
                message: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            database: config.database.clone(),
            measurement: config.measurement.clone(),
            tag_key: config.tag_key.clone(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    fn write_url(&self) -> Result<Url> {
        let mut url = self
            .base_url
            .join("write")
            .map_err(|e| EtlError::ProcessingError {
                message: format!("cannot build write URL: {}", e),
            })?;
        url.query_pairs_mut()
            .append_pair("db", &self.database)
            .append_pair("precision", "s");
        Ok(url)
    }

    pub fn line_protocol(&self, dataset: &Dataset) -> String {
        to_line_protocol(dataset, &self.measurement, &self.tag_key)
    }
}

/// Renders one line per complete reading; readings with a missing depth are skipped.
pub fn to_line_protocol(dataset: &Dataset, measurement: &str, tag_key: &str) -> String {
    let mut body = String::new();
    for reading in dataset.readings.iter().filter(|r| r.is_complete()) {
        let _ = write!(
            body,
            "{},{}={} ",
            escape_measurement(measurement),
            escape_key(tag_key),
            escape_key(&reading.station)
        );
        let fields = DEPTH_COLUMNS
            .iter()
            .zip(reading.depths())
            .filter_map(|(column, value)| value.map(|v| format!("{}={}", escape_key(column), v)))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(body, "{} {}", fields, reading.captured_at.timestamp());
    }
    body
}

fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escaping for tag keys, tag values and field keys.
fn escape_key(name: &str) -> String {
    name.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

#[async_trait]
impl Sink for InfluxSink {
    fn destination(&self) -> String {
        format!(
            "influx {}{} measurement={}",
            self.base_url, self.database, self.measurement
        )
    }

    async fn write(&self, dataset: &Dataset) -> Result<usize> {
        let body = self.line_protocol(dataset);
        let lines = body.lines().count();
        if lines == 0 {
            tracing::warn!("Nothing to write to {}", self.destination());
            return Ok(0);
        }

        let url = self.write_url()?;
        tracing::debug!("Writing {} points to {}", lines, url);

        let mut request = self.client.post(url.clone()).body(body);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|source| EtlError::TransportError {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::SinkError {
                destination: self.destination(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(lines)
    }
}
