//! The module contains the errors the engine can throw.
//!
//! Business-rule errors are detected before anything is written and abort the
//! whole operation:
//!
//! - [`Validation`] malformed input (non-positive amount, same-account transfer, ...).
//! - [`NotFound`] an id supplied by the caller does not exist.
//! - [`InsufficientFunds`] a debit exceeds the vault's `capital_actual`.
//! - [`Overpayment`] a payment exceeds the outstanding debt or balance.
//! - [`NegativeProfit`] a sale line implies a loss.
//! - [`Permission`] manual income targeted at a non-operational vault.
//! - [`CreditLimit`] a sale would push the client past its credit limit.
//!
//! Storage errors are the only ones the transaction runtime may retry, and
//! only when [`EngineError::is_transient`] says so.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFound`]: EngineError::NotFound
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`Overpayment`]: EngineError::Overpayment
//!  [`NegativeProfit`]: EngineError::NegativeProfit
//!  [`Permission`]: EngineError::Permission
//!  [`CreditLimit`]: EngineError::CreditLimit
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Overpayment: {0}")]
    Overpayment(String),
    #[error("Negative profit: {0}")]
    NegativeProfit(String),
    #[error("Permission denied: {0}")]
    Permission(String),
    #[error("Credit limit exceeded: {0}")]
    CreditLimit(String),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Machine readable error kind, stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    Overpayment,
    NegativeProfit,
    Permission,
    CreditLimit,
    Storage,
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Self::Overpayment(_) => ErrorKind::Overpayment,
            Self::NegativeProfit(_) => ErrorKind::NegativeProfit,
            Self::Permission(_) => ErrorKind::Permission,
            Self::CreditLimit(_) => ErrorKind::CreditLimit,
            Self::Database(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Returns `true` for write-write conflicts the transaction runtime may
    /// retry: a locked/busy SQLite database, or two concurrent transactions
    /// racing to create the same account, counterparty, product or idempotent
    /// operation. Any other unique violation is a bug and is surfaced as is.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        let Self::Database(err) = self else {
            return false;
        };
        let message = err.to_string();
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            || message.contains("UNIQUE constraint failed")
        {
            return is_create_race(&message);
        }
        let message = message.to_ascii_lowercase();
        message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("sqlite_busy")
            || message.contains("deadlock")
            || message.contains("could not serialize")
    }
}

/// Unique keys written by create-if-missing paths, where losing the race to
/// another transaction is resolved by rerunning the operation.
const CREATE_RACE_KEYS: [&str; 4] = [
    "accounts.id",
    "counterparties.name_norm",
    "products.name_norm",
    "operations.idempotency_key",
];

fn is_create_race(message: &str) -> bool {
    CREATE_RACE_KEYS.iter().any(|key| message.contains(key))
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::Overpayment(a), Self::Overpayment(b)) => a == b,
            (Self::NegativeProfit(a), Self::NegativeProfit(b)) => a == b,
            (Self::Permission(a), Self::Permission(b)) => a == b,
            (Self::CreditLimit(a), Self::CreditLimit(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_not_transient() {
        let errors = [
            EngineError::Validation("x".to_string()),
            EngineError::NotFound("x".to_string()),
            EngineError::InsufficientFunds("x".to_string()),
            EngineError::Overpayment("x".to_string()),
            EngineError::NegativeProfit("x".to_string()),
            EngineError::Permission("x".to_string()),
            EngineError::CreditLimit("x".to_string()),
        ];
        for err in errors {
            assert!(!err.is_transient(), "{err} must not be retried");
        }
    }

    #[test]
    fn locked_database_is_transient() {
        let err = EngineError::Database(DbErr::Custom(
            "error returned from database: (code: 5) database is locked".to_string(),
        ));
        assert!(err.is_transient());
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn only_create_races_are_retried_among_unique_violations() {
        assert!(is_create_race(
            "UNIQUE constraint failed: operations.actor_id, operations.idempotency_key"
        ));
        assert!(is_create_race(
            "UNIQUE constraint failed: counterparties.kind, counterparties.name_norm"
        ));
        assert!(is_create_race("UNIQUE constraint failed: accounts.id"));
        assert!(!is_create_race("UNIQUE constraint failed: sales.id"));
        assert!(!is_create_race("UNIQUE constraint failed: movements.id"));

        let duplicate_sale = EngineError::Database(DbErr::Custom(
            "UNIQUE constraint failed: sales.id".to_string(),
        ));
        assert!(!duplicate_sale.is_transient());
        let duplicate_product = EngineError::Database(DbErr::Custom(
            "UNIQUE constraint failed: products.name_norm".to_string(),
        ));
        assert!(duplicate_product.is_transient());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let kind = EngineError::InsufficientFunds("x".to_string()).kind();
        assert_eq!(
            serde_json::to_string(&kind).unwrap(),
            "\"insufficient_funds\""
        );
    }
}
