//! Core entity types for the payment gateway
//!
//! Amounts are integer minor-currency units (cents). Card data is reduced to
//! brand + last four digits before it reaches any of these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{EntityKind, TransitionError};

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Created, awaiting a payment attempt
    Pending,
    /// A payment attempt is in flight
    Processing,
    /// Capture confirmed (terminal)
    Paid,
    /// The active attempt reached a terminal failure (terminal)
    Failed,
}

impl InvoiceStatus {
    /// Storage/wire form of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Processing => "PROCESSING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PROCESSING" => Ok(InvoiceStatus::Processing),
            "PAID" => Ok(InvoiceStatus::Paid),
            "FAILED" => Ok(InvoiceStatus::Failed),
            other => Err(TransitionError::UnknownStatus {
                entity: EntityKind::Invoice,
                value: other.to_string(),
            }),
        }
    }
}

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Row created, no acquirer response yet
    Created,
    /// Authorization held, capture deferred
    Authorized,
    /// Funds captured
    Captured,
    /// Funds settled by the acquirer
    Settled,
    /// Declined by the acquirer (terminal)
    Declined,
    /// Cancelled before capture (terminal)
    Cancelled,
    /// Refunded after capture/settlement (terminal)
    Refunded,
}

impl TransactionStatus {
    /// Storage/wire form of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Created => "CREATED",
            TransactionStatus::Authorized => "AUTHORIZED",
            TransactionStatus::Captured => "CAPTURED",
            TransactionStatus::Settled => "SETTLED",
            TransactionStatus::Declined => "DECLINED",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Refunded => "REFUNDED",
        }
    }

    /// Map an acquirer status string to the internal vocabulary.
    ///
    /// Returns `None` for unrecognized strings; the call site decides how to
    /// surface the anomaly (the orchestrator and the reconciler both fall
    /// back to [`TransactionStatus::Created`] and log a warning).
    pub fn from_acquirer(s: &str) -> Option<Self> {
        match s {
            "Authorized" => Some(TransactionStatus::Authorized),
            "Captured" => Some(TransactionStatus::Captured),
            "Settled" => Some(TransactionStatus::Settled),
            "Declined" => Some(TransactionStatus::Declined),
            "Cancelled" => Some(TransactionStatus::Cancelled),
            "Refunded" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(TransactionStatus::Created),
            "AUTHORIZED" => Ok(TransactionStatus::Authorized),
            "CAPTURED" => Ok(TransactionStatus::Captured),
            "SETTLED" => Ok(TransactionStatus::Settled),
            "DECLINED" => Ok(TransactionStatus::Declined),
            "CANCELLED" => Ok(TransactionStatus::Cancelled),
            "REFUNDED" => Ok(TransactionStatus::Refunded),
            other => Err(TransitionError::UnknownStatus {
                entity: EntityKind::Transaction,
                value: other.to_string(),
            }),
        }
    }
}

/// Card brand accepted by the acquirer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    /// Visa
    Visa,
    /// Mastercard
    Mastercard,
    /// Elo
    Elo,
    /// American Express
    Amex,
    /// Hipercard
    Hipercard,
}

impl CardBrand {
    /// Wire form expected by the acquirer
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Elo => "elo",
            CardBrand::Amex => "amex",
            CardBrand::Hipercard => "hipercard",
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capture mode for a payment submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureType {
    /// Authorize and capture atomically ("ac")
    #[serde(rename = "ac")]
    AutoCapture,
    /// Authorize only, capture deferred ("pa")
    #[serde(rename = "pa")]
    PreAuth,
}

impl CaptureType {
    /// Wire form expected by the acquirer
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureType::AutoCapture => "ac",
            CaptureType::PreAuth => "pa",
        }
    }
}

impl fmt::Display for CaptureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Acquirer environment a merchant's credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Homologation/sandbox
    Sandbox,
    /// Production
    Production,
}

/// Acquirer credential set owned by a single merchant.
///
/// One merchant's credentials must never be used for another merchant's
/// transaction; there is no shared fallback set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantCredentials {
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Merchant's seller identifier at the acquirer
    pub seller_id: String,
    /// Target environment
    pub environment: Environment,
}

/// Merchant record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    /// Merchant ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Whether the merchant may process payments
    pub active: bool,
    /// Acquirer credentials, if onboarded
    pub credentials: Option<MerchantCredentials>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Last updated at
    pub updated_at: DateTime<Utc>,
}

/// Invoice: the thing to be paid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice ID
    pub id: Uuid,
    /// Owning merchant
    pub merchant_id: Uuid,
    /// Merchant's customer reference
    pub customer_id: Uuid,
    /// Amount in minor-currency units, always > 0
    pub amount: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Lifecycle status
    pub status: InvoiceStatus,
    /// Free-form description
    pub description: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Last updated at
    pub updated_at: DateTime<Utc>,
}

/// Transaction: one attempt to pay an invoice.
///
/// An invoice may have multiple transactions, but at most one non-terminal
/// transaction open at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID
    pub id: Uuid,
    /// Invoice being paid
    pub invoice_id: Uuid,
    /// Owning merchant
    pub merchant_id: Uuid,
    /// Acquirer payment ID, once assigned
    pub payment_id: Option<String>,
    /// Authorization code from the acquirer
    pub authorization_code: Option<String>,
    /// Acquirer sequence number (reconciliation reference)
    pub nsu: Option<String>,
    /// Acquirer transaction ID (reconciliation reference)
    pub tid: Option<String>,
    /// Amount in minor-currency units
    pub amount: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Installment count (1 = single payment)
    pub installments: u32,
    /// Card brand
    pub card_brand: Option<CardBrand>,
    /// Last four digits of the card; never the full PAN
    pub card_last4: Option<String>,
    /// Lifecycle status
    pub status: TransactionStatus,
    /// 3-D Secure electronic commerce indicator
    pub eci: Option<String>,
    /// 3-D Secure cardholder authentication value
    pub cavv: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Last updated at
    pub updated_at: DateTime<Utc>,
    /// Authorization milestone
    pub authorized_at: Option<DateTime<Utc>>,
    /// Capture milestone
    pub captured_at: Option<DateTime<Utc>>,
    /// Settlement milestone
    pub settled_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new transaction in [`TransactionStatus::Created`].
    ///
    /// The row exists before any network call so a crash mid-call leaves an
    /// auditable record.
    pub fn new(invoice_id: Uuid, merchant_id: Uuid, amount: i64, currency: &str, installments: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            invoice_id,
            merchant_id,
            payment_id: None,
            authorization_code: None,
            nsu: None,
            tid: None,
            amount,
            currency: currency.to_string(),
            installments,
            card_brand: None,
            card_last4: None,
            status: TransactionStatus::Created,
            eci: None,
            cavv: None,
            created_at: now,
            updated_at: now,
            authorized_at: None,
            captured_at: None,
            settled_at: None,
        }
    }

    /// Set a new status and stamp the matching milestone timestamp.
    ///
    /// Does not validate the transition; callers go through the state
    /// machine first.
    pub fn apply_status(&mut self, status: TransactionStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        match status {
            TransactionStatus::Authorized => self.authorized_at = Some(now),
            TransactionStatus::Captured => self.captured_at = Some(now),
            TransactionStatus::Settled => self.settled_at = Some(now),
            _ => {}
        }
    }
}

/// Append-only audit record of one received webhook notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRecord {
    /// Record ID
    pub id: Uuid,
    /// Acquirer event type (e.g. "payment.status.changed")
    pub event_type: String,
    /// Acquirer payment ID the notification refers to
    pub payment_id: Option<String>,
    /// Raw payload as received
    pub payload: serde_json::Value,
    /// Signature header as received
    pub signature: Option<String>,
    /// Whether processing has concluded for this record
    pub processed: bool,
    /// Processing error or anomaly note, if any
    pub processing_error: Option<String>,
    /// Received at
    pub received_at: DateTime<Utc>,
    /// Processed at
    pub processed_at: Option<DateTime<Utc>>,
}

impl WebhookRecord {
    /// Build an unprocessed record from an incoming notification.
    pub fn new(payload: serde_json::Value, signature: Option<String>) -> Self {
        let payment_id = payload
            .get("paymentId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let event_type = payload
            .get("eventType")
            .and_then(|v| v.as_str())
            .unwrap_or("payment.status.changed")
            .to_string();

        Self {
            id: Uuid::new_v4(),
            event_type,
            payment_id,
            payload,
            signature,
            processed: false,
            processing_error: None,
            received_at: Utc::now(),
            processed_at: None,
        }
    }
}

/// Derive the masked last four digits of a PAN.
///
/// The only card-number-derived value that may be logged or persisted.
pub fn last4(pan: &str) -> String {
    let digits: Vec<char> = pan.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.iter().rev().take(4).rev().collect()
}
