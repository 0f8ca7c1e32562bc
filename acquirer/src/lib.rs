//! CardRail Acquirer Adapter
//!
//! Per-merchant authenticated HTTP client to the acquirer:
//!
//! - OAuth2 client-credentials token lifecycle with cached refresh
//! - Card tokenization (the PAN never leaves [`client::AcquirerClient::tokenize_card`]
//!   unmasked)
//! - Payment authorization/capture submission
//! - Payment status query for reconciliation and polling
//!
//! No operation retries automatically: blind retry of a payment submission
//! risks a duplicate charge, so retry policy stays with the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use client::{AcquirerClient, TokenizedCard};
pub use config::AcquirerConfig;
pub use error::{Error, Result};
