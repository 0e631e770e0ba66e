use crate::adapters::{CsvSink, InfluxSink};
use crate::config::{EtlConfig, SinkKind};
use crate::core::fetch::{Fetcher, RetryPolicy};
use crate::core::records::{capture_time, RecordBuilder};
use crate::core::table;
use crate::core::{Dataset, LoadSummary, Pipeline, RawRow, Sink};
use crate::utils::error::Result;
use crate::utils::validation::validate_time_format;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;

/// Fetch → extract → build → sink, for the soil temperature page.
pub struct SoilPipeline {
    url: String,
    fetcher: Fetcher,
    builder: RecordBuilder,
    timezone: Tz,
    time_format: String,
    sink: Box<dyn Sink>,
    clock: fn() -> DateTime<Utc>,
}

impl SoilPipeline {
    pub fn new(config: &EtlConfig, sink: Box<dyn Sink>) -> Result<Self> {
        validate_time_format("parse.time_format", &config.parse.time_format)?;
        let fetcher = Fetcher::new(config.request_timeout(), config.source.user_agent.as_deref())?
            .with_retry(RetryPolicy {
                attempts: config.source.retry_attempts,
                delay: Duration::from_secs(config.source.retry_delay_seconds),
            });

        Ok(Self {
            url: config.source.url.clone(),
            fetcher,
            builder: RecordBuilder::new(config.parse.on_invalid_value),
            timezone: config.timezone()?,
            time_format: config.parse.time_format.clone(),
            sink,
            clock: Utc::now,
        })
    }

    /// Builds the pipeline with the sink selected in the configuration.
    pub fn from_config(config: &EtlConfig) -> Result<Self> {
        Self::new(config, build_sink(config)?)
    }

    /// Replaces the wall clock used for the capture timestamp.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

pub fn build_sink(config: &EtlConfig) -> Result<Box<dyn Sink>> {
    Ok(match config.sink.kind {
        SinkKind::Influx => Box::new(InfluxSink::from_config(
            &config.sink,
            config.request_timeout(),
        )?),
        SinkKind::Csv => Box::new(CsvSink::new(&config.sink.output_path)),
    })
}

#[async_trait::async_trait]
impl Pipeline for SoilPipeline {
    fn source(&self) -> &str {
        &self.url
    }

    async fn extract(&self) -> Result<Vec<RawRow>> {
        tracing::info!("🚀 Fetching soil temperatures from: {}", self.url);
        let document = self.fetcher.fetch(&self.url).await?;
        tracing::info!("✅ Fetched {} bytes", document.body.len());

        let rows = table::extract(&document)?;
        tracing::info!(
            "📋 Extracted {} rows from table #{}",
            rows.len(),
            table::TARGET_TABLE_INDEX
        );
        Ok(rows)
    }

    async fn transform(&self, rows: Vec<RawRow>) -> Result<Dataset> {
        let now = capture_time((self.clock)(), self.timezone);
        tracing::info!(
            "🔧 Building readings captured at {}",
            now.format(&self.time_format)
        );

        let dataset = self.builder.build(&rows, now)?;
        tracing::info!("✅ Built {} station readings", dataset.len());
        Ok(dataset)
    }

    async fn load(&self, mut dataset: Dataset) -> Result<LoadSummary> {
        let dropped = dataset.drop_incomplete();
        if dropped > 0 {
            tracing::warn!("Dropping {} readings with missing values", dropped);
        }

        let destination = self.sink.destination();
        tracing::info!("💾 Writing {} readings to {}", dataset.len(), destination);
        let written = self.sink.write(&dataset).await?;

        Ok(LoadSummary {
            destination,
            rows_written: written,
            rows_dropped: dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvalidValuePolicy;
    use crate::utils::error::EtlError;
    use chrono::TimeZone;
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        written: Arc<Mutex<Vec<Dataset>>>,
    }

    #[async_trait::async_trait]
    impl Sink for MemorySink {
        fn destination(&self) -> String {
            "memory".to_string()
        }

        async fn write(&self, dataset: &Dataset) -> Result<usize> {
            self.written.lock().unwrap().push(dataset.clone());
            Ok(dataset.len())
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 10, 15, 0).unwrap()
    }

    const PAGE: &str = "<html><body>\
        <table><tr><td>nav</td></tr></table>\
        <table><tr><td>legend</td></tr></table>\
        <table>\
        <tr><td>Stanice</td><td>5 cm</td><td>10 cm</td><td>20 cm</td><td>50 cm</td><td>100 cm</td></tr>\
        <tr><td>Doksany</td><td>9,1 °C</td><td>8,7 °C</td><td>8,0 °C</td><td>7,4 °C</td><td>6,9 °C</td></tr>\
        <tr><td>Kocelovice</td><td>8,2 °C</td><td>x</td><td>7,1 °C</td><td>6,6 °C</td><td>6,0 °C</td></tr>\
        </table></body></html>";

    fn config(url: String, policy: InvalidValuePolicy) -> EtlConfig {
        let mut config = EtlConfig::default();
        config.source.url = url;
        config.parse.on_invalid_value = policy;
        config
    }

    #[tokio::test]
    async fn test_extract_reads_table_from_page() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/soil.html");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body(PAGE);
        });

        let pipeline = SoilPipeline::new(
            &config(server.url("/soil.html"), InvalidValuePolicy::Fail),
            Box::new(MemorySink::default()),
        )
        .unwrap();

        let rows = pipeline.extract().await.unwrap();

        page_mock.assert();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].cells, vec!["Doksany", "9.1", "8.7", "8.0", "7.4", "6.9"]);
    }

    #[tokio::test]
    async fn test_transform_strict_policy_fails_on_bad_value() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/soil.html");
            then.status(200).body(PAGE);
        });

        let pipeline = SoilPipeline::new(
            &config(server.url("/soil.html"), InvalidValuePolicy::Fail),
            Box::new(MemorySink::default()),
        )
        .unwrap();

        let rows = pipeline.extract().await.unwrap();
        let err = pipeline.transform(rows).await.unwrap_err();

        assert!(matches!(err, EtlError::ValueCoercionError { row: 2, .. }));
    }

    #[tokio::test]
    async fn test_missing_policy_drops_incomplete_rows_before_sink() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/soil.html");
            then.status(200).body(PAGE);
        });

        let sink = MemorySink::default();
        let pipeline = SoilPipeline::new(
            &config(server.url("/soil.html"), InvalidValuePolicy::Missing),
            Box::new(sink.clone()),
        )
        .unwrap()
        .with_clock(fixed_clock);

        let rows = pipeline.extract().await.unwrap();
        let dataset = pipeline.transform(rows).await.unwrap();
        assert_eq!(dataset.len(), 2);

        let summary = pipeline.load(dataset).await.unwrap();

        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.rows_dropped, 1);
        assert_eq!(summary.destination, "memory");

        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].readings[0].station, "Doksany");
        assert_eq!(
            written[0].captured_at,
            chrono_tz::Europe::Prague
                .with_ymd_and_hms(2024, 4, 20, 12, 15, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_build_sink_follows_config() {
        let mut config = EtlConfig::default();
        config.sink.kind = SinkKind::Csv;
        config.sink.output_path = "./out".to_string();
        assert_eq!(build_sink(&config).unwrap().destination(), "csv ./out");

        config.sink.kind = SinkKind::Influx;
        assert!(build_sink(&config)
            .unwrap()
            .destination()
            .starts_with("influx http://localhost:8086/"));
    }
}
