use std::fmt::{self, Debug, Display};
use std::io;

use crate::disease::Phase;
use crate::people::PersonId;

/// Provides `ContagionError` and maps to other errors to
/// convert to a `ContagionError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ContagionError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ReportError(String),
    /// A probability, duration or model parameter could not be parsed or is out of range.
    ConfigError(String),
    /// A plan was scheduled at a time that is NaN, infinite or in the past.
    InvalidPlanTime { time: f64, current_time: f64 },
    /// A phase transition that the disease model does not allow.
    InvalidTransition {
        person_id: PersonId,
        from: Phase,
        to: Phase,
    },
    UnknownParameter(String),
    InvalidParameterValue { name: String, value: f64 },
    ContagionError(String),
}

impl From<io::Error> for ContagionError {
    fn from(error: io::Error) -> Self {
        ContagionError::IoError(error)
    }
}

impl From<serde_json::Error> for ContagionError {
    fn from(error: serde_json::Error) -> Self {
        ContagionError::JsonError(error)
    }
}

impl From<csv::Error> for ContagionError {
    fn from(error: csv::Error) -> Self {
        ContagionError::CsvError(error)
    }
}

impl From<String> for ContagionError {
    fn from(error: String) -> Self {
        ContagionError::ContagionError(error)
    }
}

impl From<&str> for ContagionError {
    fn from(error: &str) -> Self {
        ContagionError::ContagionError(error.to_string())
    }
}

impl std::error::Error for ContagionError {}

impl Display for ContagionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContagionError::IoError(error) => write!(f, "I/O error: {error}"),
            ContagionError::JsonError(error) => write!(f, "JSON error: {error}"),
            ContagionError::CsvError(error) => write!(f, "CSV error: {error}"),
            ContagionError::ReportError(message) => write!(f, "Report error: {message}"),
            ContagionError::ConfigError(message) => write!(f, "Configuration error: {message}"),
            ContagionError::InvalidPlanTime { time, current_time } => write!(
                f,
                "Invalid plan time {time} (current time is {current_time})"
            ),
            ContagionError::InvalidTransition {
                person_id,
                from,
                to,
            } => write!(f, "Person {person_id} cannot move from {from} to {to}"),
            ContagionError::UnknownParameter(name) => {
                write!(f, "Unrecognized parameter name {name}")
            }
            ContagionError::InvalidParameterValue { name, value } => {
                write!(f, "Invalid value {value} for parameter {name}")
            }
            ContagionError::ContagionError(message) => write!(f, "Error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_strings() {
        let error: ContagionError = "boom".into();
        assert!(matches!(error, ContagionError::ContagionError(ref m) if m == "boom"));
        let error: ContagionError = String::from("bang").into();
        assert_eq!(error.to_string(), "Error: bang");
    }

    #[test]
    fn displays_unknown_parameter() {
        let error = ContagionError::UnknownParameter("gamma".to_string());
        assert_eq!(error.to_string(), "Unrecognized parameter name gamma");
    }

    #[test]
    fn converts_from_io_error() {
        let error: ContagionError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(error, ContagionError::IoError(_)));
    }
}
