//! Invoice ledger
//!
//! Owns the invoice lifecycle. [`InvoiceLedger::transition`] is the only
//! code path in the system that writes `Invoice::status`: it validates the
//! move through the state machine and persists it with a compare-and-swap
//! conditioned on the status it validated against, so two racing writers
//! cannot both win the same transition.

use crate::error::{Error, Result};
use crate::store::{Store, StoreError};
use chrono::Utc;
use gateway_core::error::EntityKind;
use gateway_core::state_machine::validate_invoice_transition;
use gateway_core::{Invoice, InvoiceStatus, TransitionError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Invoice lifecycle owner
#[derive(Clone)]
pub struct InvoiceLedger {
    store: Arc<dyn Store>,
}

impl InvoiceLedger {
    /// Create a ledger over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create an invoice in `PENDING`.
    pub async fn create(
        &self,
        merchant_id: Uuid,
        customer_id: Uuid,
        amount: i64,
        currency: &str,
        description: Option<String>,
    ) -> Result<Invoice> {
        if amount <= 0 {
            return Err(Error::Validation(format!(
                "invoice amount must be positive, got {amount}"
            )));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Validation(format!(
                "currency must be a 3-letter ISO 4217 code, got {currency:?}"
            )));
        }

        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            merchant_id,
            customer_id,
            amount,
            currency: currency.to_uppercase(),
            status: InvoiceStatus::Pending,
            description,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_invoice(invoice.clone()).await?;
        info!(invoice_id = %invoice.id, merchant_id = %merchant_id, amount, "invoice created");
        Ok(invoice)
    }

    /// Get an invoice owned by the given merchant.
    ///
    /// Authorization is by ownership: an invoice owned by another merchant
    /// is indistinguishable from an absent one.
    pub async fn get(&self, invoice_id: Uuid, merchant_id: Uuid) -> Result<Invoice> {
        match self.store.get_invoice(invoice_id).await? {
            Some(invoice) if invoice.merchant_id == merchant_id => Ok(invoice),
            _ => Err(Error::InvoiceNotFound(invoice_id)),
        }
    }

    /// List a merchant's invoices, newest first.
    pub async fn list(
        &self,
        merchant_id: Uuid,
        status: Option<InvoiceStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Invoice>> {
        Ok(self
            .store
            .list_invoices(merchant_id, status, limit, offset)
            .await?)
    }

    /// Transition an invoice to `to`, enforcing the state machine.
    ///
    /// The persisted write is conditioned on the status the transition was
    /// validated against; a concurrent writer that got there first surfaces
    /// as `InvalidTransition`.
    pub async fn transition(&self, invoice_id: Uuid, to: InvoiceStatus) -> Result<Invoice> {
        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or(Error::InvoiceNotFound(invoice_id))?;

        let from = invoice.status;
        validate_invoice_transition(from, to)?;

        match self.store.update_invoice_status(invoice_id, from, to).await {
            Ok(updated) => {
                info!(invoice_id = %invoice_id, %from, %to, "invoice status updated");
                Ok(updated)
            }
            // Lost the CAS race: report it as the transition conflict it is.
            Err(StoreError::Conflict { actual, .. }) => {
                Err(Error::InvalidTransition(TransitionError::Disallowed {
                    entity: EntityKind::Invoice,
                    from: actual,
                    to: to.to_string(),
                }))
            }
            Err(e) => Err(e.into()),
        }
    }
}
