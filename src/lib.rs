//! soil-etl: scrapes the CHMI soil temperature table and writes one
//! timestamped point per station to a time-series store.
//!
//! ```text
//! soil_etl
//! ├── domain    — RawDocument, RawRow, StationReading, Dataset; Pipeline and Sink ports
//! ├── core
//! │   ├── fetch    — HTTP GET of the source page (optional retry)
//! │   ├── table    — positional table lookup + cell normalization
//! │   ├── records  — schema mapping, numeric coercion, capture timestamp
//! │   ├── pipeline — SoilPipeline wiring the stages to a sink
//! │   └── etl      — EtlEngine, runs one pass and reports the failing stage
//! ├── adapters  — InfluxDB line protocol sink, CSV file sink
//! ├── config    — TOML file + CLI overrides
//! └── utils     — errors, logging, validation, resource monitor
//! ```

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::EtlConfig;

pub use core::{etl::EtlEngine, pipeline::SoilPipeline};
pub use utils::error::{EtlError, Result};
