//! Payment orchestrator
//!
//! Coordinates a single payment attempt: resolves the merchant's acquirer
//! client, tokenizes the card if a PAN was given, submits the authorization,
//! and maps the response onto the transaction and invoice.
//!
//! Ordering is load-bearing:
//!
//! 1. The invoice flips PENDING → PROCESSING before any network call; that
//!    compare-and-swap is the guard against concurrent double-submission.
//! 2. The transaction row exists in CREATED before the acquirer is touched,
//!    so a crash mid-call leaves an auditable, reconcilable record.
//! 3. Any failure after that lands the transaction in DECLINED and the
//!    invoice in FAILED before the error propagates; failure is never left
//!    un-recorded.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::invoices::InvoiceLedger;
use crate::store::Store;
use acquirer::wire::{
    CardInfoBlock, CustomerInfo, PaymentBlock, PaymentRequest, SellerInfoBlock,
};
use acquirer::{AcquirerClient, TokenizedCard};
use chrono::Utc;
use gateway_core::{
    CaptureType, CardBrand, Invoice, InvoiceStatus, Merchant, Transaction, TransactionStatus,
    MAX_INSTALLMENTS,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Where the card number comes from.
///
/// Tagged so that "both PAN and token" or "neither" is unrepresentable.
#[derive(Debug, Clone)]
pub enum CardSource {
    /// Raw PAN; will be tokenized before the payment call
    Pan {
        /// Full card number; never persisted or logged
        pan: String,
        /// Card brand
        brand: CardBrand,
    },
    /// Pre-generated acquirer token
    Token {
        /// Opaque card token
        number_token: String,
        /// Card brand
        brand: CardBrand,
    },
}

impl CardSource {
    fn brand(&self) -> CardBrand {
        match self {
            CardSource::Pan { brand, .. } | CardSource::Token { brand, .. } => *brand,
        }
    }
}

/// Card input for one payment attempt
#[derive(Debug, Clone)]
pub struct CardDetails {
    /// PAN or pre-generated token
    pub source: CardSource,
    /// Name on card
    pub cardholder_name: String,
    /// Expiration month (MM)
    pub expiration_month: String,
    /// Expiration year (YY)
    pub expiration_year: String,
    /// CVV
    pub security_code: String,
}

/// Options for one payment attempt
#[derive(Debug, Clone)]
pub struct PaymentOptions {
    /// Installment count (1..=12)
    pub installments: u32,
    /// Auto-capture or pre-authorization
    pub capture_type: CaptureType,
    /// Statement descriptor override
    pub soft_descriptor: Option<String>,
    /// Customer block for antifraud screening
    pub customer: Option<CustomerInfo>,
    /// Device info for 3-D Secure
    pub device_info: Option<serde_json::Value>,
}

impl Default for PaymentOptions {
    fn default() -> Self {
        Self {
            installments: 1,
            capture_type: CaptureType::AutoCapture,
            soft_descriptor: None,
            customer: None,
            device_info: None,
        }
    }
}

/// Coordinates single payment attempts
#[derive(Clone)]
pub struct PaymentOrchestrator {
    store: Arc<dyn Store>,
    invoices: InvoiceLedger,
    config: EngineConfig,
}

impl PaymentOrchestrator {
    /// Create an orchestrator over the given store.
    pub fn new(store: Arc<dyn Store>, invoices: InvoiceLedger, config: EngineConfig) -> Self {
        Self {
            store,
            invoices,
            config,
        }
    }

    /// Process one payment attempt against a PENDING invoice.
    pub async fn process_payment(
        &self,
        invoice_id: Uuid,
        merchant_id: Uuid,
        card: CardDetails,
        options: PaymentOptions,
    ) -> Result<Transaction> {
        validate_input(&card, &options)?;

        // Resolve the merchant's acquirer client before touching any state.
        let merchant = self.resolve_merchant(merchant_id).await?;
        let credentials = merchant
            .credentials
            .clone()
            .ok_or(Error::MissingCredentials(merchant_id))?;
        let adapter = AcquirerClient::new(credentials, self.config.acquirer.clone())?;

        // Ownership check, then the PENDING -> PROCESSING guard. Exactly one
        // concurrent caller wins this transition.
        let invoice = self.invoices.get(invoice_id, merchant_id).await?;
        self.invoices
            .transition(invoice_id, InvoiceStatus::Processing)
            .await?;

        // Auditable record before any network call.
        let transaction = Transaction::new(
            invoice_id,
            merchant_id,
            invoice.amount,
            &invoice.currency,
            options.installments,
        );
        self.store.insert_transaction(transaction.clone()).await?;
        info!(
            transaction_id = %transaction.id,
            invoice_id = %invoice_id,
            merchant_id = %merchant_id,
            "payment attempt started"
        );

        match self
            .attempt(&adapter, &invoice, transaction.clone(), card, options)
            .await
        {
            Ok(transaction) => Ok(transaction),
            Err(e) => {
                self.record_failure(transaction.id, invoice_id).await;
                Err(e)
            }
        }
    }

    /// Get a payment attempt by transaction ID, scoped to the merchant.
    pub async fn get_payment(
        &self,
        transaction_id: Uuid,
        merchant_id: Uuid,
    ) -> Result<Transaction> {
        match self.store.get_transaction(transaction_id).await? {
            Some(transaction) if transaction.merchant_id == merchant_id => Ok(transaction),
            _ => Err(Error::TransactionNotFound(transaction_id)),
        }
    }

    async fn resolve_merchant(&self, merchant_id: Uuid) -> Result<Merchant> {
        let merchant = self
            .store
            .get_merchant(merchant_id)
            .await?
            .ok_or(Error::MerchantNotFound(merchant_id))?;
        if !merchant.active {
            return Err(Error::MerchantInactive(merchant_id));
        }
        Ok(merchant)
    }

    /// Tokenize, submit, and map the response. Callers handle failure
    /// bookkeeping; this function only moves state forward.
    async fn attempt(
        &self,
        adapter: &AcquirerClient,
        invoice: &Invoice,
        mut transaction: Transaction,
        card: CardDetails,
        options: PaymentOptions,
    ) -> Result<Transaction> {
        let brand = card.source.brand();

        let tokenized = match &card.source {
            CardSource::Pan { pan, brand } => {
                adapter
                    .tokenize_card(pan, &card.expiration_month, &card.expiration_year, *brand)
                    .await?
            }
            CardSource::Token {
                number_token,
                brand,
            } => TokenizedCard {
                number_token: number_token.clone(),
                brand: *brand,
                last4: String::new(),
            },
        };

        transaction.card_brand = Some(brand);
        if !tokenized.last4.is_empty() {
            transaction.card_last4 = Some(tokenized.last4.clone());
        }

        let order_number = generate_order_number();
        let request = PaymentRequest {
            payment: PaymentBlock::new(
                invoice.amount,
                &invoice.currency,
                options.installments,
                options.capture_type,
            ),
            card_info: CardInfoBlock {
                number_token: tokenized.number_token,
                brand,
                cardholder_name: card.cardholder_name.clone(),
                expiration_month: card.expiration_month.clone(),
                expiration_year: card.expiration_year.clone(),
                security_code: card.security_code.clone(),
            },
            seller_info: SellerInfoBlock {
                id: Some(adapter.seller_id().to_string()),
                order_number,
                soft_descriptor: options
                    .soft_descriptor
                    .unwrap_or_else(|| self.config.soft_descriptor.clone()),
                code_anti_fraud: self.config.code_anti_fraud.clone(),
            },
            customer: options.customer,
            device_info: options.device_info,
        };

        let response = adapter.create_payment(&request).await?;
        let authorization = response.payment_authorization.unwrap_or_default();

        // Authorization code present means approved; the capture type says
        // whether funds were captured atomically or merely held.
        let status = if authorization.authorization_code.is_some() {
            match options.capture_type {
                CaptureType::AutoCapture => TransactionStatus::Captured,
                CaptureType::PreAuth => TransactionStatus::Authorized,
            }
        } else {
            let code = authorization.return_code.as_deref().unwrap_or("");
            TransactionStatus::from_acquirer(code).unwrap_or_else(|| {
                warn!(return_code = code, "unrecognized acquirer status in payment response");
                TransactionStatus::Created
            })
        };

        transaction.payment_id = authorization.payment_id.clone();
        transaction.tid = authorization.payment_id;
        transaction.nsu = authorization.nsu;
        transaction.authorization_code = authorization.authorization_code;
        transaction.eci = authorization.eci;
        transaction.cavv = authorization.cavv;
        transaction.apply_status(status);
        self.store.update_transaction(transaction.clone()).await?;

        let invoice_target = if matches!(
            status,
            TransactionStatus::Captured | TransactionStatus::Authorized
        ) {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Failed
        };
        self.invoices.transition(invoice.id, invoice_target).await?;

        info!(
            transaction_id = %transaction.id,
            invoice_id = %invoice.id,
            status = %status,
            invoice_status = %invoice_target,
            "payment attempt concluded"
        );

        Ok(transaction)
    }

    /// Land the entities in terminal states after a failed attempt.
    ///
    /// Best effort: secondary failures are logged and must never mask the
    /// original error.
    async fn record_failure(&self, transaction_id: Uuid, invoice_id: Uuid) {
        match self.store.get_transaction(transaction_id).await {
            // Only moves a transaction the table allows to decline: a
            // persisted authorization or capture is never rewritten by
            // failure bookkeeping for a later step.
            Ok(Some(mut transaction))
                if transaction
                    .status
                    .can_transition(TransactionStatus::Declined) =>
            {
                transaction.apply_status(TransactionStatus::Declined);
                if let Err(e) = self.store.update_transaction(transaction).await {
                    warn!(%transaction_id, error = %e, "could not mark transaction declined");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(%transaction_id, error = %e, "could not load transaction for failure bookkeeping"),
        }

        if let Err(e) = self
            .invoices
            .transition(invoice_id, InvoiceStatus::Failed)
            .await
        {
            warn!(%invoice_id, error = %e, "could not mark invoice failed");
        }
    }
}

/// Merchant-facing order reference, unique per attempt.
///
/// Millisecond-derived and bounded to the acquirer's 13-character limit.
fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis() % 10_000_000_000_000;
    format!("{millis:013}")
}

fn validate_input(card: &CardDetails, options: &PaymentOptions) -> Result<()> {
    match &card.source {
        CardSource::Pan { pan, .. } => {
            let digits = pan.chars().filter(|c| c.is_ascii_digit()).count();
            if digits != pan.len() || !(13..=19).contains(&digits) {
                return Err(Error::Validation(
                    "pan must be 13-19 digits".to_string(),
                ));
            }
        }
        CardSource::Token { number_token, .. } => {
            if number_token.trim().is_empty() {
                return Err(Error::Validation("card token must not be empty".to_string()));
            }
        }
    }

    if card.cardholder_name.trim().is_empty() || card.cardholder_name.len() > 100 {
        return Err(Error::Validation(
            "cardholder name must be 1-100 characters".to_string(),
        ));
    }

    let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
    if !two_digits(&card.expiration_month) || !two_digits(&card.expiration_year) {
        return Err(Error::Validation(
            "expiration must be MM and YY digit pairs".to_string(),
        ));
    }
    let month: u32 = card.expiration_month.parse().unwrap_or(0);
    if !(1..=12).contains(&month) {
        return Err(Error::Validation(
            "expiration month must be between 01 and 12".to_string(),
        ));
    }

    let code_len = card.security_code.len();
    if !(3..=4).contains(&code_len) || !card.security_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(
            "security code must be 3-4 digits".to_string(),
        ));
    }

    if options.installments < 1 || options.installments > MAX_INSTALLMENTS {
        return Err(Error::Validation(format!(
            "installments must be between 1 and {MAX_INSTALLMENTS}"
        )));
    }

    Ok(())
}
