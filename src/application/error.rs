use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    AccountId, CategoryId, Cents, PricingError, TransactionId, TransitionError,
    WithdrawalRequestId,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Waste category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient balance in account {account_id}: balance {balance}, required {required}")]
    InsufficientBalance {
        account_id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("Account {account_id} already has a pending withdrawal request ({request_id})")]
    DuplicatePendingRequest {
        account_id: AccountId,
        request_id: WithdrawalRequestId,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error(
        "Transaction {id} was created at {created_at} and is older than the {window_hours}h deletion window"
    )]
    DeletionWindowExpired {
        id: TransactionId,
        created_at: DateTime<Utc>,
        window_hours: i64,
    },

    #[error("Database error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Coarse classification for boundary layers (status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientBalance,
    DuplicatePendingRequest,
    InvalidState,
    Unauthorized,
    Conflict,
    StorageFailure,
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } | AppError::CategoryNotFound(_) => ErrorKind::NotFound,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            AppError::DuplicatePendingRequest { .. } => ErrorKind::DuplicatePendingRequest,
            AppError::InvalidState(_) | AppError::DeletionWindowExpired { .. } => {
                ErrorKind::InvalidState
            }
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::AlreadyExists(_) => ErrorKind::Conflict,
            AppError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::UnknownCategory(id) => AppError::CategoryNotFound(id),
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::InvalidState(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{WithdrawalEvent, WithdrawalStatus};

    #[test]
    fn test_pricing_errors_map_to_taxonomy() {
        assert!(matches!(
            AppError::from(PricingError::UnknownCategory(7)),
            AppError::CategoryNotFound(7)
        ));
        assert_eq!(
            AppError::from(PricingError::NoItems).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            AppError::from(PricingError::Overflow).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_transition_error_is_invalid_state() {
        let err = AppError::from(TransitionError {
            from: WithdrawalStatus::Approved,
            event: WithdrawalEvent::Approve,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("approved"));
    }

    #[test]
    fn test_insufficient_balance_message_names_amounts() {
        let err = AppError::InsufficientBalance {
            account_id: Uuid::nil(),
            balance: 10000,
            required: 15000,
        };
        let message = err.to_string();
        assert!(message.contains("10000"));
        assert!(message.contains("15000"));
    }
}
