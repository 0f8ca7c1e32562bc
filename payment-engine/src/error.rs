//! Error types for the payment engine

use gateway_core::TransitionError;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Payment engine errors.
///
/// A duplicate webhook is deliberately not here: it is an expected outcome
/// (`WebhookOutcome::Duplicate`), not an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Merchant absent
    #[error("Merchant {0} not found")]
    MerchantNotFound(Uuid),

    /// Merchant exists but may not process payments
    #[error("Merchant {0} is not active")]
    MerchantInactive(Uuid),

    /// Merchant has no acquirer credentials configured; this is a tenant
    /// misconfiguration, not a generic failure
    #[error("Merchant {0} has no acquirer credentials configured")]
    MissingCredentials(Uuid),

    /// Invoice absent or owned by a different merchant
    #[error("Invoice {0} not found")]
    InvoiceNotFound(Uuid),

    /// Transaction absent or owned by a different merchant
    #[error("Transaction {0} not found")]
    TransactionNotFound(Uuid),

    /// Conflicting concurrent operation or retry on a non-retryable status
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Acquirer-side failure
    #[error(transparent)]
    Acquirer(#[from] acquirer::Error),

    /// Persistence collaborator failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
