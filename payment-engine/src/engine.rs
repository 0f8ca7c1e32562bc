//! Gateway facade
//!
//! [`PaymentEngine`] wires the invoice ledger, payment orchestrator, and
//! webhook reconciler over one shared store and exposes the operations a
//! merchant-facing API layer needs. Merchant scoping happens here and in the
//! components below; no operation leaks another merchant's entities.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::invoices::InvoiceLedger;
use crate::orchestrator::{CardDetails, PaymentOptions, PaymentOrchestrator};
use crate::store::Store;
use crate::webhooks::{WebhookOutcome, WebhookReconciler};
use gateway_core::{Invoice, InvoiceStatus, Merchant, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// Top-level gateway handle
#[derive(Clone)]
pub struct PaymentEngine {
    store: Arc<dyn Store>,
    invoices: InvoiceLedger,
    orchestrator: PaymentOrchestrator,
    reconciler: WebhookReconciler,
    config: EngineConfig,
}

impl PaymentEngine {
    /// Assemble an engine over the given store.
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let invoices = InvoiceLedger::new(store.clone());
        let orchestrator =
            PaymentOrchestrator::new(store.clone(), invoices.clone(), config.clone());
        let reconciler = WebhookReconciler::new(store.clone(), invoices.clone());
        Self {
            store,
            invoices,
            orchestrator,
            reconciler,
            config,
        }
    }

    /// Register or replace a merchant.
    pub async fn upsert_merchant(&self, merchant: Merchant) -> Result<()> {
        self.store.upsert_merchant(merchant).await?;
        Ok(())
    }

    /// Create a `PENDING` invoice for an active merchant.
    pub async fn create_invoice(
        &self,
        merchant_id: Uuid,
        customer_id: Uuid,
        amount: i64,
        currency: &str,
        description: Option<String>,
    ) -> Result<Invoice> {
        let merchant = self
            .store
            .get_merchant(merchant_id)
            .await?
            .ok_or(Error::MerchantNotFound(merchant_id))?;
        if !merchant.active {
            return Err(Error::MerchantInactive(merchant_id));
        }
        self.invoices
            .create(merchant_id, customer_id, amount, currency, description)
            .await
    }

    /// Fetch an invoice, scoped to the merchant.
    pub async fn get_invoice(&self, invoice_id: Uuid, merchant_id: Uuid) -> Result<Invoice> {
        self.invoices.get(invoice_id, merchant_id).await
    }

    /// List a merchant's invoices, newest first. `page_size` is clamped to
    /// the configured maximum; `None` means the configured default.
    pub async fn list_invoices(
        &self,
        merchant_id: Uuid,
        status: Option<InvoiceStatus>,
        page_size: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Invoice>> {
        let limit = self.config.page_size(page_size);
        self.invoices.list(merchant_id, status, limit, offset).await
    }

    /// Run one payment attempt against a `PENDING` invoice.
    pub async fn process_payment(
        &self,
        invoice_id: Uuid,
        merchant_id: Uuid,
        card: CardDetails,
        options: PaymentOptions,
    ) -> Result<Transaction> {
        self.orchestrator
            .process_payment(invoice_id, merchant_id, card, options)
            .await
    }

    /// Fetch a payment attempt, scoped to the merchant.
    pub async fn get_payment(
        &self,
        transaction_id: Uuid,
        merchant_id: Uuid,
    ) -> Result<Transaction> {
        self.orchestrator.get_payment(transaction_id, merchant_id).await
    }

    /// Ingest one acquirer webhook notification.
    pub async fn ingest_webhook(
        &self,
        payload: serde_json::Value,
        signature: Option<String>,
    ) -> Result<WebhookOutcome> {
        self.reconciler.ingest(payload, signature).await
    }
}
