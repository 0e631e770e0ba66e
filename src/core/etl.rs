use crate::core::{LoadSummary, Pipeline};
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

fn report(stage: &'static str, url: &str, error: &EtlError) {
    tracing::error!(
        stage,
        url,
        category = ?error.category(),
        severity = ?error.severity(),
        "❌ {} failed: {}",
        stage,
        error
    );
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// One complete run. The first failing stage aborts it; nothing is written
    /// unless extract and transform both succeed.
    pub async fn run(&self) -> Result<LoadSummary> {
        tracing::info!("Starting soil temperature ETL run");
        self.monitor.log_stats("Start");

        let started = Instant::now();
        let rows = self
            .pipeline
            .extract()
            .await
            .inspect_err(|e| report("extract", self.pipeline.source(), e))?;
        tracing::debug!("extract took {:?}", started.elapsed());
        self.monitor.log_stats("Extract");

        let started = Instant::now();
        let dataset = self
            .pipeline
            .transform(rows)
            .await
            .inspect_err(|e| report("transform", self.pipeline.source(), e))?;
        tracing::debug!("transform took {:?}", started.elapsed());
        self.monitor.log_stats("Transform");

        let started = Instant::now();
        let summary = self
            .pipeline
            .load(dataset)
            .await
            .inspect_err(|e| report("load", self.pipeline.source(), e))?;
        tracing::debug!("load took {:?}", started.elapsed());
        self.monitor.log_stats("Load");

        tracing::info!(
            "Wrote {} readings to {} ({} dropped)",
            summary.rows_written,
            summary.destination,
            summary.rows_dropped
        );
        self.monitor.log_final_stats();
        Ok(summary)
    }

    /// Runs extract and transform only, for dry runs.
    pub async fn preview(&self) -> Result<crate::core::Dataset> {
        let rows = self
            .pipeline
            .extract()
            .await
            .inspect_err(|e| report("extract", self.pipeline.source(), e))?;
        self.pipeline
            .transform(rows)
            .await
            .inspect_err(|e| report("transform", self.pipeline.source(), e))
    }
}
