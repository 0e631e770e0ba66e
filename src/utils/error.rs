use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Transport error while requesting {url}: {source}")]
    TransportError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} from {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Expected at least {expected} tables on {url}, found {found}")]
    StructureError {
        url: String,
        expected: usize,
        found: usize,
    },

    #[error("Malformed extractor output: {message}")]
    MalformedInputError { message: String },

    #[error("Row {row} has {found} cells, schema expects {expected}")]
    SchemaMismatchError {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}: cannot read '{value}' as a number for column '{column}'")]
    ValueCoercionError {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Write to {destination} rejected with status {status}: {body}")]
    SinkError {
        destination: String,
        status: u16,
        body: String,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    PageStructure,
    Data,
    Sink,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::TransportError { .. } | EtlError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            EtlError::StructureError { .. } => ErrorCategory::PageStructure,
            EtlError::MalformedInputError { .. }
            | EtlError::SchemaMismatchError { .. }
            | EtlError::ValueCoercionError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::SinkError { .. } | EtlError::CsvError(_) => ErrorCategory::Sink,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// Medium errors are worth a retry on the next scheduled run; High means
    /// the page or the data changed shape; Critical is local to the host.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Sink => ErrorSeverity::Medium,
            ErrorCategory::PageStructure | ErrorCategory::Data | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for this error. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::TransportError { .. } => {
                "Check network connectivity to the source page or raise --timeout-seconds"
            }
            EtlError::HttpStatusError { .. } => {
                "The source page is unavailable; the next scheduled run will try again"
            }
            EtlError::StructureError { .. } => {
                "The page layout changed; inspect it and update the table index"
            }
            EtlError::MalformedInputError { .. } | EtlError::SchemaMismatchError { .. } => {
                "The table columns changed; compare the page with the station schema"
            }
            EtlError::ValueCoercionError { .. } => {
                "Set parse.on_invalid_value = \"missing\" to skip unreadable values"
            }
            EtlError::SinkError { .. } => {
                "Verify database name, credentials and that the time-series store is reachable"
            }
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
            EtlError::CsvError(_) | EtlError::IoError(_) => {
                "Check that the output path exists and is writable"
            }
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Re-run with --verbose and report the log"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch the source page: {}", self),
            ErrorCategory::PageStructure => format!("Source page has an unexpected layout: {}", self),
            ErrorCategory::Data => format!("Soil temperature table could not be read: {}", self),
            ErrorCategory::Sink => format!("Could not store the readings: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_are_retryable() {
        let err = EtlError::HttpStatusError {
            url: "http://example.com".to_string(),
            status: 503,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_data_errors_exit_with_one() {
        let err = EtlError::SchemaMismatchError {
            row: 3,
            expected: 6,
            found: 5,
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Row 3"));
    }

    #[test]
    fn test_structure_error_message() {
        let err = EtlError::StructureError {
            url: "http://example.com/soil.html".to_string(),
            expected: 3,
            found: 1,
        };
        assert_eq!(err.category(), ErrorCategory::PageStructure);
        assert!(err.user_friendly_message().contains("found 1"));
        assert!(err.to_string().contains("http://example.com/soil.html"));
    }

    #[test]
    fn test_io_error_is_critical() {
        let err = EtlError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }
}
