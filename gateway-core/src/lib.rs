//! CardRail Gateway Core
//!
//! Pure domain layer shared by the acquirer adapter and the payment engine:
//!
//! - **Entities**: invoices, transactions, webhook records, merchants
//! - **State machine**: the authoritative status transition tables
//! - **Vocabulary**: mapping from the acquirer's status strings to ours
//!
//! # Invariants
//!
//! - Invoice status is a function of its transactions' statuses
//! - Terminal statuses never transition (except SETTLED → REFUNDED)
//! - Full card numbers (PANs) never appear in any type defined here

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod state_machine;
pub mod types;

pub use error::TransitionError;
pub use types::{
    CaptureType, CardBrand, Environment, Invoice, InvoiceStatus, Merchant, MerchantCredentials,
    Transaction, TransactionStatus, WebhookRecord,
};

/// Safety margin subtracted from a bearer token's lifetime, in seconds.
///
/// Absorbs clock skew and in-flight request latency so a token never
/// expires mid-call.
pub const TOKEN_EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Maximum length of a merchant-facing order number.
pub const ORDER_NUMBER_MAX_LEN: usize = 13;

/// Maximum installment count accepted for a payment.
pub const MAX_INSTALLMENTS: u32 = 12;
