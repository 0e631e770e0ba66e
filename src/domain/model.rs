use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// Column names of the soil temperature table, in page order.
///
/// The page's own header row is discarded; these names are what the
/// dashboard queries in the time-series store.
pub const STATION_COLUMN: &str = "Stanice";
pub const DEPTH_COLUMNS: [&str; 5] = [
    "Teplota pudy v hloubce 5 cm",
    "Teplota pudy v hloubce 10 cm",
    "Teplota pudy v hloubce 20 cm",
    "Teplota pudy v hloubce 50 cm",
    "Teplota pudy v hloubce 100 cm",
];
pub const SCHEMA_WIDTH: usize = 1 + DEPTH_COLUMNS.len();

/// The fetched HTML page, already decoded to text.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: String,
    pub body: String,
}

/// Normalized cells of one `<tr>`, before schema mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Zero-based position of the row within the table.
    pub index: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(index: usize, cells: Vec<String>) -> Self {
        Self { index, cells }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReading {
    #[serde(rename = "Stanice")]
    pub station: String,
    #[serde(rename = "Teplota pudy v hloubce 5 cm")]
    pub depth_temp_5: Option<f64>,
    #[serde(rename = "Teplota pudy v hloubce 10 cm")]
    pub depth_temp_10: Option<f64>,
    #[serde(rename = "Teplota pudy v hloubce 20 cm")]
    pub depth_temp_20: Option<f64>,
    #[serde(rename = "Teplota pudy v hloubce 50 cm")]
    pub depth_temp_50: Option<f64>,
    #[serde(rename = "Teplota pudy v hloubce 100 cm")]
    pub depth_temp_100: Option<f64>,
    pub captured_at: DateTime<Tz>,
}

impl StationReading {
    /// Depth readings in schema order.
    pub fn depths(&self) -> [Option<f64>; 5] {
        [
            self.depth_temp_5,
            self.depth_temp_10,
            self.depth_temp_20,
            self.depth_temp_50,
            self.depth_temp_100,
        ]
    }

    pub fn is_complete(&self) -> bool {
        self.depths().iter().all(Option::is_some)
    }
}

/// All readings captured by one run. Every reading carries `captured_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub captured_at: DateTime<Tz>,
    pub readings: Vec<StationReading>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Removes readings with a missing depth value, returning how many were removed.
    pub fn drop_incomplete(&mut self) -> usize {
        let before = self.readings.len();
        self.readings.retain(StationReading::is_complete);
        before - self.readings.len()
    }
}

/// Outcome of handing a dataset to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub destination: String,
    pub rows_written: usize,
    pub rows_dropped: usize,
}
