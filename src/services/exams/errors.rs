use thiserror::Error;

use crate::services::payments::PaymentError;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("inconsistent record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("attempt has expired")]
    Expired,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("storage failure: {0}")]
    Internal(#[from] StoreError),
}

impl AttemptError {
    /// Stable machine-readable code for clients.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            AttemptError::NotFound(_) => "not_found",
            AttemptError::Conflict(_) => "conflict",
            AttemptError::Expired => "expired",
            AttemptError::Validation(_) => "validation_error",
            AttemptError::Forbidden(_) => "forbidden",
            AttemptError::Payment(_) => "payment_failed",
            AttemptError::Internal(_) => "internal",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        AttemptError::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AttemptError::NotFound("exam not found").code(), "not_found");
        assert_eq!(AttemptError::Conflict("busy").code(), "conflict");
        assert_eq!(AttemptError::Expired.code(), "expired");
        assert_eq!(AttemptError::validation("bad").code(), "validation_error");
        assert_eq!(AttemptError::Forbidden("no").code(), "forbidden");
        assert_eq!(AttemptError::from(PaymentError::InsufficientFunds).code(), "payment_failed");
        assert_eq!(
            AttemptError::from(StoreError::Corrupt("missing question".to_string())).code(),
            "internal"
        );
    }
}
