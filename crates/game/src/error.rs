use roadgen::PathConfigError;
use thiserror::Error;

use crate::session::GameState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("invalid road config: {0}")]
    Path(#[from] PathConfigError),
    #[error("invalid {section} config: {reason}")]
    Config {
        section: &'static str,
        reason: String,
    },
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: GameState,
        action: &'static str,
    },
}

/// `Ok` if `value` is finite and `> 0`, otherwise a [`GameError::Config`].
pub(crate) fn positive(section: &'static str, field: &str, value: f64) -> Result<(), GameError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GameError::Config {
            section,
            reason: format!("{} must be positive, got {}", field, value),
        })
    }
}

/// `Ok` if `value` is finite and `>= 0`, otherwise a [`GameError::Config`].
pub(crate) fn non_negative(section: &'static str, field: &str, value: f64) -> Result<(), GameError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GameError::Config {
            section,
            reason: format!("{} must not be negative, got {}", field, value),
        })
    }
}
