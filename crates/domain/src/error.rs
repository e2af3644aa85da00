//! Domain error types.

use common::{MAX_AMOUNT, Money};
use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Rejects amounts above [`MAX_AMOUNT`].
pub(crate) fn check_amount_limit(field: &'static str, amount: Money) -> Result<(), ValidationError> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::new(
            field,
            format!("must be at most {MAX_AMOUNT}"),
        ));
    }
    Ok(())
}
