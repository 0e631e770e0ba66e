use crate::domain::model::{Dataset, DEPTH_COLUMNS, STATION_COLUMN};
use crate::domain::ports::Sink;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes each run to its own CSV file, named after the capture time.
#[derive(Debug, Clone)]
pub struct CsvSink {
    base_path: PathBuf,
}

impl CsvSink {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self, dataset: &Dataset) -> PathBuf {
        self.base_path.join(format!(
            "soil_temp_{}.csv",
            dataset.captured_at.format("%Y%m%d_%H%M%S")
        ))
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn destination(&self) -> String {
        format!("csv {}", self.base_path.display())
    }

    async fn write(&self, dataset: &Dataset) -> Result<usize> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.file_path(dataset);

        let mut writer = csv::Writer::from_path(&path)?;
        let mut header = vec![STATION_COLUMN];
        header.extend(DEPTH_COLUMNS);
        header.push("captured_at");
        writer.write_record(&header)?;

        for reading in &dataset.readings {
            let mut record = vec![reading.station.clone()];
            record.extend(
                reading
                    .depths()
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            record.push(reading.captured_at.to_rfc3339());
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} rows to {}", dataset.len(), path.display());
        Ok(dataset.len())
    }
}
