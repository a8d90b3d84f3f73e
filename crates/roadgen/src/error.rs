use thiserror::Error;

/// Invalid road generation or controller parameters. Fatal at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("{field} range is inverted: {low} > {high}")]
    InvertedRange {
        field: &'static str,
        low: f64,
        high: f64,
    },
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("start_direction must have a horizontal component")]
    DegenerateDirection,
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), PathConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PathConfigError::NotPositive { field, value })
    }
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), PathConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PathConfigError::Negative { field, value })
    }
}
