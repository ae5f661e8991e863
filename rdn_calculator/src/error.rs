use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalculatorError {
    #[error("missing required section `{0}`")]
    MissingSection(&'static str),

    #[error("invalid parameters: {0}")]
    InvalidParams(#[source] serde_json::Error),

    #[error("price record #{index}: {reason}")]
    InvalidPriceRecord { index: usize, reason: String },

    #[error("malformed input: {0}")]
    MalformedInput(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse category of a [`CalculatorError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Configuration,
    PriceData,
    Input,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::PriceData => "PriceDataError",
            ErrorKind::Input => "InputError",
            ErrorKind::Io => "IoError",
        }
    }
}

impl CalculatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalculatorError::MissingSection("params") | CalculatorError::InvalidParams(_) => {
                ErrorKind::Configuration
            }
            CalculatorError::MissingSection(_) | CalculatorError::InvalidPriceRecord { .. } => {
                ErrorKind::PriceData
            }
            CalculatorError::MalformedInput(_) | CalculatorError::Csv(_) => ErrorKind::Input,
            CalculatorError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: self.to_string(),
            error_type: self.kind().as_str().to_string(),
        }
    }
}

/// Wire form of a failed calculation: `{"error": ..., "type": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub error: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

pub type Result<T> = std::result::Result<T, CalculatorError>;
