//! CardRail Payment Engine
//!
//! The gateway's coordination layer: invoice lifecycle, payment attempt
//! orchestration against the acquirer, and webhook-driven reconciliation,
//! all over a pluggable [`Store`].
//!
//! The synchronous path ([`PaymentEngine::process_payment`]) drives a payment
//! from a `PENDING` invoice through tokenization and authorization to
//! terminal invoice state; the asynchronous path
//! ([`PaymentEngine::ingest_webhook`]) absorbs acquirer notifications that
//! arrive later, duplicated, or out of order. Both paths funnel every state
//! change through the transition rules in `gateway-core`, so no code path can
//! move an entity backwards.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod invoices;
pub mod orchestrator;
pub mod store;
pub mod webhooks;

pub use config::EngineConfig;
pub use engine::PaymentEngine;
pub use error::{Error, Result};
pub use invoices::InvoiceLedger;
pub use orchestrator::{CardDetails, CardSource, PaymentOptions, PaymentOrchestrator};
pub use store::{MemoryStore, Store, StoreError, StoreResult};
pub use webhooks::{WebhookOutcome, WebhookReconciler};
