//! Webhook reconciliation
//!
//! Acquirer notifications arrive out of order, duplicated, and occasionally
//! for payments this gateway never created. Every notification is appended
//! to the audit trail before any interpretation, and every anomaly maps to
//! a [`WebhookOutcome`] variant rather than an error: the caller always
//! acknowledges receipt, since acquirers retry unacknowledged webhooks
//! indefinitely.

use crate::error::Result;
use crate::invoices::InvoiceLedger;
use crate::store::Store;
use chrono::Utc;
use gateway_core::{InvoiceStatus, TransactionStatus, WebhookRecord};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What became of one acquirer notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A transaction (and possibly its invoice) moved forward
    Processed {
        /// Audit record ID
        webhook_id: Uuid,
    },
    /// A processed notification for this payment already exists
    Duplicate {
        /// Audit record ID
        webhook_id: Uuid,
    },
    /// The reported status is equal to or behind the transaction's
    IgnoredStale {
        /// Audit record ID
        webhook_id: Uuid,
    },
    /// No transaction carries the reported payment ID
    Unmatched {
        /// Audit record ID
        webhook_id: Uuid,
    },
    /// The payload could not be interpreted (permanent defect)
    Failed {
        /// Audit record ID
        webhook_id: Uuid,
        /// What was wrong with the payload
        reason: String,
    },
}

/// Applies acquirer notifications to transactions and invoices
#[derive(Clone)]
pub struct WebhookReconciler {
    store: Arc<dyn Store>,
    invoices: InvoiceLedger,
}

impl WebhookReconciler {
    /// Create a reconciler over the given store.
    pub fn new(store: Arc<dyn Store>, invoices: InvoiceLedger) -> Self {
        Self { store, invoices }
    }

    /// Ingest one acquirer notification.
    ///
    /// Errors are reserved for storage failures; every payload-level problem
    /// is an outcome variant.
    pub async fn ingest(
        &self,
        payload: serde_json::Value,
        signature: Option<String>,
    ) -> Result<WebhookOutcome> {
        // Audit first. If this insert fails nothing else may happen.
        let mut record = WebhookRecord::new(payload, signature);
        self.store.insert_webhook(record.clone()).await?;
        let webhook_id = record.id;

        let payment_id = match record.payment_id.clone() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return self
                    .fail(record, "notification carries no paymentId".to_string())
                    .await;
            }
        };

        if self.store.has_processed_webhook(&payment_id).await? {
            info!(%webhook_id, payment_id = %payment_id, "duplicate notification");
            self.conclude(record, Some("duplicate notification".to_string()))
                .await?;
            return Ok(WebhookOutcome::Duplicate { webhook_id });
        }

        let reported = match record.payload.get("status").and_then(|v| v.as_str()) {
            Some(s) => s.to_string(),
            None => {
                return self
                    .fail(record, "notification carries no status".to_string())
                    .await;
            }
        };

        let transaction = match self
            .store
            .find_transaction_by_payment_id(&payment_id)
            .await?
        {
            Some(t) => t,
            None => {
                warn!(%webhook_id, payment_id = %payment_id, "notification matches no transaction");
                self.conclude(record, Some("no matching transaction".to_string()))
                    .await?;
                return Ok(WebhookOutcome::Unmatched { webhook_id });
            }
        };

        let incoming = TransactionStatus::from_acquirer(&reported).unwrap_or_else(|| {
            warn!(%webhook_id, status = %reported, "unrecognized acquirer status in notification");
            TransactionStatus::Created
        });

        // Forward-only: an equal or backward status is stale, not an error.
        if incoming == transaction.status || !transaction.status.can_transition(incoming) {
            info!(
                %webhook_id,
                transaction_id = %transaction.id,
                current = %transaction.status,
                reported = %incoming,
                "stale notification ignored"
            );
            self.conclude(
                record,
                Some(format!("stale: {} while at {}", incoming, transaction.status)),
            )
            .await?;
            return Ok(WebhookOutcome::IgnoredStale { webhook_id });
        }

        let mut transaction = transaction;
        if let Some(code) = record
            .payload
            .get("authorizationCode")
            .and_then(|v| v.as_str())
        {
            transaction.authorization_code = Some(code.to_string());
        }
        transaction.apply_status(incoming);
        self.store.update_transaction(transaction.clone()).await?;

        self.cascade_invoice(&transaction, incoming).await;

        info!(
            %webhook_id,
            transaction_id = %transaction.id,
            status = %incoming,
            "notification applied"
        );
        self.conclude(record, None).await?;
        Ok(WebhookOutcome::Processed { webhook_id })
    }

    /// Derive and apply the invoice consequence of a transaction move.
    ///
    /// Best effort: the transaction update already committed, so invoice
    /// bookkeeping problems are logged rather than bubbled up.
    async fn cascade_invoice(
        &self,
        transaction: &gateway_core::Transaction,
        status: TransactionStatus,
    ) {
        let target = match status {
            TransactionStatus::Captured | TransactionStatus::Settled => InvoiceStatus::Paid,
            TransactionStatus::Declined | TransactionStatus::Cancelled => InvoiceStatus::Failed,
            // An async authorization alone does not settle the invoice;
            // refunds are transaction-level and keep the invoice's history.
            TransactionStatus::Created
            | TransactionStatus::Authorized
            | TransactionStatus::Refunded => return,
        };

        let invoice = match self.store.get_invoice(transaction.invoice_id).await {
            Ok(Some(invoice)) => invoice,
            Ok(None) => {
                warn!(invoice_id = %transaction.invoice_id, "transaction references missing invoice");
                return;
            }
            Err(e) => {
                warn!(invoice_id = %transaction.invoice_id, error = %e, "could not load invoice");
                return;
            }
        };
        if invoice.status == target {
            return;
        }
        if let Err(e) = self.invoices.transition(invoice.id, target).await {
            warn!(
                invoice_id = %invoice.id,
                from = %invoice.status,
                to = %target,
                error = %e,
                "invoice did not follow transaction"
            );
        }
    }

    async fn conclude(&self, mut record: WebhookRecord, note: Option<String>) -> Result<()> {
        record.processed = true;
        record.processed_at = Some(Utc::now());
        record.processing_error = note;
        self.store.update_webhook(record).await?;
        Ok(())
    }

    /// A malformed payload is a permanent defect; redelivery of the same
    /// bytes cannot succeed. The record keeps `processed = false` anyway:
    /// a defective record carrying a payment ID must never satisfy the
    /// dedup check and shadow a later, well-formed notification for that
    /// payment.
    async fn fail(&self, mut record: WebhookRecord, reason: String) -> Result<WebhookOutcome> {
        warn!(webhook_id = %record.id, %reason, "notification rejected");
        let webhook_id = record.id;
        record.processing_error = Some(reason.clone());
        self.store.update_webhook(record).await?;
        Ok(WebhookOutcome::Failed { webhook_id, reason })
    }
}
