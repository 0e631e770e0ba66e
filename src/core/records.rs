use crate::config::InvalidValuePolicy;
use crate::core::table::transliterate;
use crate::domain::model::{Dataset, RawRow, StationReading, DEPTH_COLUMNS, SCHEMA_WIDTH};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use chrono_tz::Tz;

/// Capture timestamp for a run: `now` in the source timezone, whole seconds.
pub fn capture_time(now: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    now.with_timezone(&tz).trunc_subsecs(0)
}

/// Rejects extractor output that is not a non-empty list of non-empty rows.
pub fn check_rows(rows: &[RawRow]) -> Result<()> {
    if rows.is_empty() {
        return Err(EtlError::MalformedInputError {
            message: "no rows extracted from the table".to_string(),
        });
    }
    if let Some(row) = rows.iter().find(|row| row.cells.is_empty()) {
        return Err(EtlError::MalformedInputError {
            message: format!("row {} has no cells", row.index),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordBuilder {
    policy: InvalidValuePolicy,
}

impl RecordBuilder {
    pub fn new(policy: InvalidValuePolicy) -> Self {
        Self { policy }
    }

    /// Maps the rows (header first) onto the station schema. Pure: the same
    /// rows and `now` always produce the same dataset.
    pub fn build(&self, rows: &[RawRow], now: DateTime<Tz>) -> Result<Dataset> {
        check_rows(rows)?;

        let readings = rows
            .iter()
            .skip(1)
            .map(|row| self.reading(row, now))
            .collect::<Result<Vec<_>>>()?;

        Ok(Dataset {
            captured_at: now,
            readings,
        })
    }

    fn reading(&self, row: &RawRow, now: DateTime<Tz>) -> Result<StationReading> {
        if row.cells.len() != SCHEMA_WIDTH {
            return Err(EtlError::SchemaMismatchError {
                row: row.index,
                expected: SCHEMA_WIDTH,
                found: row.cells.len(),
            });
        }

        let mut depths = [None; 5];
        for (slot, (column, value)) in depths
            .iter_mut()
            .zip(DEPTH_COLUMNS.iter().zip(&row.cells[1..]))
        {
            *slot = self.coerce(row.index, column, value)?;
        }
        let [depth_temp_5, depth_temp_10, depth_temp_20, depth_temp_50, depth_temp_100] = depths;

        Ok(StationReading {
            station: transliterate(&row.cells[0]),
            depth_temp_5,
            depth_temp_10,
            depth_temp_20,
            depth_temp_50,
            depth_temp_100,
            captured_at: now,
        })
    }

    fn coerce(&self, row: usize, column: &str, value: &str) -> Result<Option<f64>> {
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Some(number)),
            _ => match self.policy {
                InvalidValuePolicy::Fail => Err(EtlError::ValueCoercionError {
                    row,
                    column: column.to_string(),
                    value: value.to_string(),
                }),
                InvalidValuePolicy::Missing => {
                    tracing::warn!(
                        "Row {}: '{}' is not a number for '{}', marking missing",
                        row,
                        value,
                        column
                    );
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(index: usize, cells: &[&str]) -> RawRow {
        RawRow::new(index, cells.iter().map(|c| c.to_string()).collect())
    }

    fn header() -> RawRow {
        row(0, &["Stanice", "5 cm", "10 cm", "20 cm", "50 cm", "100 cm"])
    }

    fn now() -> DateTime<Tz> {
        chrono_tz::Europe::Prague
            .with_ymd_and_hms(2024, 3, 15, 14, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_build_maps_rows_onto_schema() {
        let rows = vec![
            header(),
            row(1, &["StationA", "5.0", "6.1", "7.2", "8.3", "9.4"]),
            row(2, &["StationB", "1.0", "2.0", "3.0", "4.0", "5.0"]),
        ];

        let dataset = RecordBuilder::default().build(&rows, now()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.readings[0].station, "StationA");
        assert_eq!(
            dataset.readings[0].depths(),
            [Some(5.0), Some(6.1), Some(7.2), Some(8.3), Some(9.4)]
        );
        assert_eq!(dataset.readings[1].station, "StationB");
        assert_eq!(dataset.readings[1].depth_temp_100, Some(5.0));
    }

    #[test]
    fn test_build_shares_capture_time() {
        let rows = vec![
            header(),
            row(1, &["A", "1", "2", "3", "4", "5"]),
            row(2, &["B", "1", "2", "3", "4", "5"]),
            row(3, &["C", "1", "2", "3", "4", "5"]),
        ];

        let dataset = RecordBuilder::default().build(&rows, now()).unwrap();

        assert_eq!(dataset.captured_at, now());
        assert!(dataset.readings.iter().all(|r| r.captured_at == now()));
    }

    #[test]
    fn test_build_is_deterministic() {
        let rows = vec![header(), row(1, &["A", "1.5", "2", "3", "4", "5"])];
        let builder = RecordBuilder::default();

        assert_eq!(
            builder.build(&rows, now()).unwrap(),
            builder.build(&rows, now()).unwrap()
        );
    }

    #[test]
    fn test_build_empty_input_is_malformed() {
        let err = RecordBuilder::default().build(&[], now()).unwrap_err();
        assert!(matches!(err, EtlError::MalformedInputError { .. }));
    }

    #[test]
    fn test_build_empty_row_is_malformed() {
        let rows = vec![header(), row(1, &[])];
        let err = RecordBuilder::default().build(&rows, now()).unwrap_err();
        assert!(matches!(err, EtlError::MalformedInputError { .. }));
    }

    #[test]
    fn test_build_short_row_is_schema_mismatch() {
        let rows = vec![
            header(),
            row(1, &["A", "1", "2", "3", "4", "5"]),
            row(2, &["B", "1", "2", "3", "4"]),
        ];

        let err = RecordBuilder::default().build(&rows, now()).unwrap_err();

        assert!(matches!(
            err,
            EtlError::SchemaMismatchError {
                row: 2,
                expected: 6,
                found: 5
            }
        ));
    }

    #[test]
    fn test_build_long_row_is_schema_mismatch() {
        let rows = vec![header(), row(1, &["A", "1", "2", "3", "4", "5", "6"])];
        let err = RecordBuilder::default().build(&rows, now()).unwrap_err();
        assert!(matches!(err, EtlError::SchemaMismatchError { found: 7, .. }));
    }

    #[test]
    fn test_header_row_is_not_checked_against_schema() {
        let rows = vec![row(0, &["Stanice"]), row(1, &["A", "1", "2", "3", "4", "5"])];
        assert_eq!(RecordBuilder::default().build(&rows, now()).unwrap().len(), 1);
    }

    #[test]
    fn test_build_strict_coercion_fails() {
        let rows = vec![header(), row(1, &["A", "1", "n/a", "3", "4", "5"])];

        let err = RecordBuilder::default().build(&rows, now()).unwrap_err();

        match err {
            EtlError::ValueCoercionError { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Teplota pudy v hloubce 10 cm");
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_non_finite_numbers() {
        let rows = vec![header(), row(1, &["A", "NaN", "2", "3", "4", "inf"])];
        assert!(RecordBuilder::default().build(&rows, now()).is_err());
    }

    #[test]
    fn test_build_missing_policy_keeps_row() {
        let rows = vec![header(), row(1, &["A", "1", "-", "3", "4", "5"])];

        let dataset = RecordBuilder::new(InvalidValuePolicy::Missing)
            .build(&rows, now())
            .unwrap();

        assert_eq!(dataset.readings[0].depth_temp_10, None);
        assert!(!dataset.readings[0].is_complete());
    }

    #[test]
    fn test_build_transliterates_station() {
        let rows = vec![header(), row(1, &["Přerov", "1", "2", "3", "4", "5"])];
        let dataset = RecordBuilder::default().build(&rows, now()).unwrap();
        assert_eq!(dataset.readings[0].station, "Prerov");
    }

    #[test]
    fn test_capture_time_uses_timezone_and_whole_seconds() {
        let utc = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);

        let captured = capture_time(utc, chrono_tz::Europe::Prague);

        assert_eq!(captured.to_rfc3339(), "2024-01-10T09:00:00+01:00");
    }
}
