use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 單一列的欄位數量錯誤
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnViolation {
    pub row: usize,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for ColumnViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Row {} has an incorrect column count: expected {}, found {}",
            self.row, self.expected, self.actual
        )
    }
}

fn join_violations(violations: &[ColumnViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Empty CSV input: no rows to process")]
    EmptyInputError,

    #[error("Column count mismatch:\n{}", join_violations(.violations))]
    ColumnMismatchError { violations: Vec<ColumnViolation> },

    #[error("Invalid name '{name}': {reason}")]
    InvalidNameError { name: String, reason: String },

    #[error("Unsupported date format: {value}")]
    UnsupportedDateFormatError { value: String },

    #[error("Failed to load XML template '{location}': {reason}")]
    TemplateLoadError { location: String, reason: String },

    #[error("Failed to render XML document: {message}")]
    RenderError { message: String },

    #[error("File '{file_name}' is not valid UTF-8: {reason}")]
    InvalidEncodingError { file_name: String, reason: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，決定重試次數與錯誤檔案的後綴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Csv,
    Conversion,
    System,
}

impl ErrorCategory {
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ErrorCategory::Csv => "csv_error",
            ErrorCategory::Conversion => "conversion_error",
            ErrorCategory::System => "system_error",
        }
    }

    pub fn max_redeliveries(&self) -> u32 {
        match self {
            ErrorCategory::Csv | ErrorCategory::Conversion => 2,
            ErrorCategory::System => 1,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            ErrorCategory::Csv => "CSV processing error",
            ErrorCategory::Conversion => "Data conversion error",
            ErrorCategory::System => "System error",
        }
    }
}

impl EtlError {
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::EmptyInputError => "EmptyInputError",
            EtlError::ColumnMismatchError { .. } => "ColumnMismatchError",
            EtlError::InvalidNameError { .. } => "InvalidNameError",
            EtlError::UnsupportedDateFormatError { .. } => "UnsupportedDateFormatError",
            EtlError::TemplateLoadError { .. } => "TemplateLoadError",
            EtlError::RenderError { .. } => "RenderError",
            EtlError::InvalidEncodingError { .. } => "InvalidEncodingError",
            EtlError::CsvError(_) => "CsvError",
            EtlError::IoError(_) => "IoError",
            EtlError::SerializationError(_) => "SerializationError",
            EtlError::ConfigError { .. } => "ConfigError",
            EtlError::InvalidConfigValueError { .. } => "InvalidConfigValueError",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::EmptyInputError
            | EtlError::ColumnMismatchError { .. }
            | EtlError::InvalidEncodingError { .. }
            | EtlError::CsvError(_) => ErrorCategory::Csv,
            EtlError::InvalidNameError { .. } | EtlError::UnsupportedDateFormatError { .. } => {
                ErrorCategory::Conversion
            }
            _ => ErrorCategory::System,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::EmptyInputError => "The CSV file contains no rows".to_string(),
            EtlError::ColumnMismatchError { violations } => {
                format!("{} row(s) have the wrong number of columns", violations.len())
            }
            EtlError::TemplateLoadError { location, .. } => {
                format!("The XML template '{}' could not be loaded", location)
            }
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                format!("Invalid configuration: {}", self)
            }
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::EmptyInputError | EtlError::ColumnMismatchError { .. } => {
                "Every row must contain exactly 4 columns: company, user id, full name, register date"
            }
            EtlError::CsvError(_) | EtlError::InvalidEncodingError { .. } => {
                "Check that the file is valid UTF-8 CSV with ',' delimiters"
            }
            EtlError::InvalidNameError { .. } => {
                "Use a Chinese name of at least 2 characters or a Western name with given name and surname"
            }
            EtlError::UnsupportedDateFormatError { .. } => {
                "Use one of: yyyy-MM-dd, dd/MM/yyyy, MMM dd, yyyy, MM/dd/yyyy"
            }
            EtlError::TemplateLoadError { .. } => {
                "Make sure the template exists, is well-formed XML and contains a Profile element"
            }
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command-line arguments"
            }
            EtlError::IoError(_) => "Check directory permissions and available disk space",
            _ => "This is an internal error; check the logs for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
