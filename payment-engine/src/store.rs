//! Persistence collaborator
//!
//! The engine treats persistence as an abstract row store: equality-filtered
//! lookups, inserts, whole-row updates, and one conditional update used as
//! the invoice status compare-and-swap guard. [`MemoryStore`] implements the
//! trait over in-process maps and backs every test.

use async_trait::async_trait;
use chrono::Utc;
use gateway_core::{Invoice, InvoiceStatus, Merchant, Transaction, WebhookRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Persistence failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Row absent
    #[error("row not found: {0}")]
    NotFound(String),

    /// Conditional update lost the race: the row's current status did not
    /// match the expected one
    #[error("conditional update conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Status the caller expected
        expected: String,
        /// Status actually found
        actual: String,
    },

    /// Backend failure (connection, serialization, ...)
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Abstract row store used by the engine.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a merchant by ID.
    async fn get_merchant(&self, id: Uuid) -> StoreResult<Option<Merchant>>;

    /// Insert or replace a merchant.
    async fn upsert_merchant(&self, merchant: Merchant) -> StoreResult<()>;

    /// Insert an invoice.
    async fn insert_invoice(&self, invoice: Invoice) -> StoreResult<()>;

    /// Get an invoice by ID.
    async fn get_invoice(&self, id: Uuid) -> StoreResult<Option<Invoice>>;

    /// List a merchant's invoices, newest first, optionally filtered by
    /// status.
    async fn list_invoices(
        &self,
        merchant_id: Uuid,
        status: Option<InvoiceStatus>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<Invoice>>;

    /// Set an invoice's status only if its current status matches
    /// `expected` (compare-and-swap). Returns the updated row.
    async fn update_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        to: InvoiceStatus,
    ) -> StoreResult<Invoice>;

    /// Insert a transaction.
    async fn insert_transaction(&self, transaction: Transaction) -> StoreResult<()>;

    /// Get a transaction by ID.
    async fn get_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>>;

    /// Find the transaction carrying the given acquirer payment ID.
    async fn find_transaction_by_payment_id(
        &self,
        payment_id: &str,
    ) -> StoreResult<Option<Transaction>>;

    /// List the transactions attached to an invoice, newest first.
    async fn list_invoice_transactions(&self, invoice_id: Uuid)
        -> StoreResult<Vec<Transaction>>;

    /// Replace a transaction row.
    async fn update_transaction(&self, transaction: Transaction) -> StoreResult<()>;

    /// Append a webhook record.
    async fn insert_webhook(&self, record: WebhookRecord) -> StoreResult<()>;

    /// Whether a processed webhook record already exists for the given
    /// acquirer payment ID. This is the deduplication check.
    async fn has_processed_webhook(&self, payment_id: &str) -> StoreResult<bool>;

    /// Replace a webhook record (processed flag, error note).
    async fn update_webhook(&self, record: WebhookRecord) -> StoreResult<()>;
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    merchants: RwLock<HashMap<Uuid, Merchant>>,
    invoices: RwLock<HashMap<Uuid, Invoice>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
    webhooks: RwLock<HashMap<Uuid, WebhookRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_merchant(&self, id: Uuid) -> StoreResult<Option<Merchant>> {
        Ok(self.merchants.read().get(&id).cloned())
    }

    async fn upsert_merchant(&self, merchant: Merchant) -> StoreResult<()> {
        self.merchants.write().insert(merchant.id, merchant);
        Ok(())
    }

    async fn insert_invoice(&self, invoice: Invoice) -> StoreResult<()> {
        self.invoices.write().insert(invoice.id, invoice);
        Ok(())
    }

    async fn get_invoice(&self, id: Uuid) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices.read().get(&id).cloned())
    }

    async fn list_invoices(
        &self,
        merchant_id: Uuid,
        status: Option<InvoiceStatus>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<Invoice>> {
        let invoices = self.invoices.read();
        let mut rows: Vec<Invoice> = invoices
            .values()
            .filter(|i| i.merchant_id == merchant_id)
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        to: InvoiceStatus,
    ) -> StoreResult<Invoice> {
        let mut invoices = self.invoices.write();
        let invoice = invoices
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {id}")))?;

        if invoice.status != expected {
            return Err(StoreError::Conflict {
                expected: expected.to_string(),
                actual: invoice.status.to_string(),
            });
        }

        invoice.status = to;
        invoice.updated_at = Utc::now();
        Ok(invoice.clone())
    }

    async fn insert_transaction(&self, transaction: Transaction) -> StoreResult<()> {
        self.transactions
            .write()
            .insert(transaction.id, transaction);
        Ok(())
    }

    async fn get_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        Ok(self.transactions.read().get(&id).cloned())
    }

    async fn find_transaction_by_payment_id(
        &self,
        payment_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .values()
            .find(|t| t.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn list_invoice_transactions(
        &self,
        invoice_id: Uuid,
    ) -> StoreResult<Vec<Transaction>> {
        let transactions = self.transactions.read();
        let mut rows: Vec<Transaction> = transactions
            .values()
            .filter(|t| t.invoice_id == invoice_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update_transaction(&self, transaction: Transaction) -> StoreResult<()> {
        let mut transactions = self.transactions.write();
        if !transactions.contains_key(&transaction.id) {
            return Err(StoreError::NotFound(format!(
                "transaction {}",
                transaction.id
            )));
        }
        transactions.insert(transaction.id, transaction);
        Ok(())
    }

    async fn insert_webhook(&self, record: WebhookRecord) -> StoreResult<()> {
        self.webhooks.write().insert(record.id, record);
        Ok(())
    }

    async fn has_processed_webhook(&self, payment_id: &str) -> StoreResult<bool> {
        Ok(self
            .webhooks
            .read()
            .values()
            .any(|w| w.processed && w.payment_id.as_deref() == Some(payment_id)))
    }

    async fn update_webhook(&self, record: WebhookRecord) -> StoreResult<()> {
        let mut webhooks = self.webhooks.write();
        if !webhooks.contains_key(&record.id) {
            return Err(StoreError::NotFound(format!("webhook {}", record.id)));
        }
        webhooks.insert(record.id, record);
        Ok(())
    }
}
