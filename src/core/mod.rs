pub mod etl;
pub mod fetch;
pub mod pipeline;
pub mod records;
pub mod table;

pub use crate::domain::model::{Dataset, LoadSummary, RawDocument, RawRow, StationReading};
pub use crate::domain::ports::{Pipeline, Sink};
pub use crate::utils::error::Result;
