use crate::domain::model::{Dataset, LoadSummary, RawRow};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Where the pipeline reads from, reported with stage failures.
    fn source(&self) -> &str;

    /// Fetch the page and pull the target table out of it.
    async fn extract(&self) -> Result<Vec<RawRow>>;
    async fn transform(&self, rows: Vec<RawRow>) -> Result<Dataset>;
    async fn load(&self, dataset: Dataset) -> Result<LoadSummary>;
}

/// Destination for a finished dataset.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Human readable target, used in logs and summaries.
    fn destination(&self) -> String;

    async fn write(&self, dataset: &Dataset) -> Result<usize>;
}
