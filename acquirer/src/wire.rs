//! Wire types for the acquirer HTTP API
//!
//! All request and response bodies are camelCase JSON. The shapes follow the
//! acquirer's e-commerce API: OAuth token endpoint, card tokenization, and
//! the nested payment creation payload.

use gateway_core::{CaptureType, CardBrand};
use serde::{Deserialize, Serialize};

/// Product type for a single payment (installments == 1)
pub const PRODUCT_TYPE_SINGLE: &str = "avista";
/// Product type for an installment payment (installments > 1)
pub const PRODUCT_TYPE_INSTALLMENT: &str = "lojista";

/// OAuth token request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// Always "client_credentials"
    pub grant_type: &'static str,
}

impl TokenRequest {
    /// Client-credentials grant request
    pub fn client_credentials() -> Self {
        Self {
            grant_type: "client_credentials",
        }
    }
}

fn default_expires_in() -> u64 {
    3600
}

/// OAuth token response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Bearer token
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

/// Card tokenization request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeRequest {
    /// Full card number; exists only for the duration of the call
    pub card_number: String,
}

/// Card tokenization response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResponse {
    /// Opaque token usable in place of the PAN
    pub number_token: String,
}

/// Payment creation request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Transaction block
    pub payment: PaymentBlock,
    /// Card block (tokenized; no PAN)
    pub card_info: CardInfoBlock,
    /// Seller block
    pub seller_info: SellerInfoBlock,
    /// Customer/antifraud block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerInfo>,
    /// Device info block for 3-D Secure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<serde_json::Value>,
}

/// Transaction block of a payment request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBlock {
    /// Always "credit"
    pub transaction_type: &'static str,
    /// Amount in minor-currency units
    pub amount: i64,
    /// Lowercase ISO 4217 code
    pub currency_code: String,
    /// "avista" or "lojista"
    pub product_type: &'static str,
    /// Installment count
    pub installments: u32,
    /// "ac" or "pa"
    pub capture_type: CaptureType,
    /// Recurring payment marker
    pub recurrent: bool,
}

impl PaymentBlock {
    /// Build the transaction block, deriving the product type from the
    /// installment count.
    pub fn new(amount: i64, currency: &str, installments: u32, capture_type: CaptureType) -> Self {
        Self {
            transaction_type: "credit",
            amount,
            currency_code: currency.to_lowercase(),
            product_type: if installments == 1 {
                PRODUCT_TYPE_SINGLE
            } else {
                PRODUCT_TYPE_INSTALLMENT
            },
            installments,
            capture_type,
            recurrent: false,
        }
    }
}

/// Card block of a payment request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfoBlock {
    /// Tokenized card number
    pub number_token: String,
    /// Card brand
    pub brand: CardBrand,
    /// Name on card
    pub cardholder_name: String,
    /// Expiration month (MM)
    pub expiration_month: String,
    /// Expiration year (YY)
    pub expiration_year: String,
    /// CVV
    pub security_code: String,
}

/// Seller block of a payment request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfoBlock {
    /// Seller identifier at the acquirer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Merchant-facing order reference, unique per attempt
    pub order_number: String,
    /// Descriptor on the cardholder's statement
    pub soft_descriptor: String,
    /// Antifraud integration code
    pub code_anti_fraud: String,
}

/// Customer block for antifraud screening
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    /// Document type (e.g. "cpf")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    /// Document number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    /// First name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Mobile phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone_number: Option<String>,
    /// Street address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Address number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    /// City
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Zip code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// Country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Client IP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Payment creation response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Nested authorization result
    pub payment_authorization: Option<PaymentAuthorization>,
}

/// Authorization object nested in a payment response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorization {
    /// Acquirer payment ID
    pub payment_id: Option<String>,
    /// Authorization code; present means approved
    pub authorization_code: Option<String>,
    /// Acquirer sequence number
    pub nsu: Option<String>,
    /// Acquirer status/return code (vocabulary: Authorized, Captured, ...)
    pub return_code: Option<String>,
    /// Human-readable return description
    pub description: Option<String>,
    /// 3-D Secure electronic commerce indicator
    pub eci: Option<String>,
    /// 3-D Secure cardholder authentication value
    pub cavv: Option<String>,
}

/// Payment status query response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQueryResponse {
    /// Acquirer payment ID
    pub payment_id: Option<String>,
    /// Acquirer status string
    pub status: Option<String>,
    /// Remaining fields, preserved for diagnostics
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
