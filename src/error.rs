use thiserror::Error;

use crate::months::AcademicMonth;

#[derive(Error, Debug)]
pub enum BursarError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing identity fields; raised before any write is attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store rejected a deposit batch. Nothing from the batch was kept.
    #[error("Deposit not saved: {0}")]
    Persistence(String),

    #[error("Unknown student: {0}")]
    UnknownStudent(String),

    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(String),

    #[error("Unknown month: {0}")]
    UnknownMonth(String),

    #[error("Unknown fee type: {0}")]
    UnknownFeeType(String),

    #[error("Invalid session label: {0} (expected YYYY-YY, e.g. 2024-25)")]
    InvalidSession(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BursarError>;

/// Non-fatal conditions met while resolving fees or reading deposit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeWarning {
    /// The catalog has no entries for this class and month.
    NoFeesConfigured {
        class_name: String,
        month: AcademicMonth,
    },
    /// A history row whose month could not be read.
    MalformedRecord { raw_month: Option<String> },
    /// A non-transport entry marked dynamic; it has no per-student source.
    UnsupportedDynamic {
        fee_type: String,
        month: AcademicMonth,
    },
}

impl std::fmt::Display for FeeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFeesConfigured { class_name, month } => {
                write!(f, "no fees configured for class {class_name} in {month}")
            }
            Self::MalformedRecord { raw_month } => match raw_month {
                Some(m) => write!(f, "skipped deposit record with unknown month {m:?}"),
                None => write!(f, "skipped deposit record without a month"),
            },
            Self::UnsupportedDynamic { fee_type, month } => {
                write!(f, "ignored dynamic {fee_type} fee in {month}: only transport can be dynamic")
            }
        }
    }
}
