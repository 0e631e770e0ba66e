// Adapters layer: concrete sinks for the finished dataset.

pub mod csv_file;
pub mod influx;

pub use csv_file::CsvSink;
pub use influx::InfluxSink;
