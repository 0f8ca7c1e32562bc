//! Acquirer HTTP client
//!
//! One client per merchant credential set. The bearer token is cached inside
//! the client and refreshed behind a mutex, so concurrent calls on the same
//! instance share a single token exchange instead of re-authenticating
//! redundantly.

use crate::config::AcquirerConfig;
use crate::error::{Error, Result};
use crate::wire::{
    PaymentQueryResponse, PaymentRequest, PaymentResponse, TokenRequest, TokenResponse,
    TokenizeRequest, TokenizeResponse,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gateway_core::types::last4;
use gateway_core::{CardBrand, MerchantCredentials, TOKEN_EXPIRY_MARGIN_SECONDS};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Result of a card tokenization.
///
/// Carries the opaque token plus the masked last four digits derived from
/// the PAN before it left the tokenize call. The PAN itself is never
/// returned, logged, or persisted.
#[derive(Debug, Clone)]
pub struct TokenizedCard {
    /// Opaque card token
    pub number_token: String,
    /// Card brand
    pub brand: CardBrand,
    /// Masked last four digits
    pub last4: String,
}

/// Upper bound accepted for a reported token lifetime; acquirer tokens
/// live about an hour.
const MAX_TOKEN_LIFETIME_SECONDS: u64 = 86_400;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Per-merchant authenticated client to the acquirer
pub struct AcquirerClient {
    base_url: String,
    credentials: MerchantCredentials,
    config: AcquirerConfig,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl AcquirerClient {
    /// Create a client for one merchant's credential set.
    ///
    /// All three credential fields are mandatory; there is no fallback to
    /// shared credentials. This is a hard multi-tenancy boundary.
    pub fn new(credentials: MerchantCredentials, config: AcquirerConfig) -> Result<Self> {
        if credentials.client_id.trim().is_empty()
            || credentials.client_secret.trim().is_empty()
            || credentials.seller_id.trim().is_empty()
        {
            return Err(Error::Config(
                "client_id, client_secret and seller_id are all required".to_string(),
            ));
        }

        let base_url = config
            .base_url(credentials.environment)
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        info!(
            seller_id = %credentials.seller_id,
            base_url = %base_url,
            "acquirer client initialized"
        );

        Ok(Self {
            base_url,
            credentials,
            config,
            client,
            token: Mutex::new(None),
        })
    }

    /// Seller identifier this client submits payments for.
    pub fn seller_id(&self) -> &str {
        &self.credentials.seller_id
    }

    /// Exchange client credentials for a bearer token.
    ///
    /// The cached copy is replaced; most callers want
    /// [`AcquirerClient::ensure_authenticated`] instead.
    pub async fn authenticate(&self) -> Result<String> {
        let mut cache = self.token.lock().await;
        let token = self.exchange_token().await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Return a bearer token, reusing the cached one while it is still
    /// inside the expiry safety margin.
    ///
    /// The mutex is held across the refresh, so concurrent callers on this
    /// instance wait for one exchange rather than issuing their own.
    pub async fn ensure_authenticated(&self) -> Result<String> {
        let mut cache = self.token.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let token = self.exchange_token().await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    async fn exchange_token(&self) -> Result<CachedToken> {
        let url = format!("{}/auth/oauth2/v1/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .json(&TokenRequest::client_credentials())
            .timeout(self.config.auth_timeout())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), "acquirer authentication failed");
            return Err(Error::Authentication {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("token response: {e}")))?;

        // Refresh one margin early so a token never expires mid-call. The
        // reported lifetime is capped so the expiry arithmetic cannot
        // overflow on a pathological value.
        let lifetime = token.expires_in.min(MAX_TOKEN_LIFETIME_SECONDS) as i64;
        let expires_at =
            Utc::now() + ChronoDuration::seconds(lifetime - TOKEN_EXPIRY_MARGIN_SECONDS);

        info!(expires_in = token.expires_in, "acquirer authenticated");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }

    /// Exchange a PAN for an opaque card token.
    ///
    /// The masked last four digits are derived here, before the PAN leaves
    /// this function; the PAN itself is never logged or returned.
    pub async fn tokenize_card(
        &self,
        pan: &str,
        expiration_month: &str,
        expiration_year: &str,
        brand: CardBrand,
    ) -> Result<TokenizedCard> {
        let bearer = self.ensure_authenticated().await?;
        let masked = last4(pan);

        debug!(
            %brand,
            last4 = %masked,
            expiration = %format!("{expiration_month}/{expiration_year}"),
            "tokenizing card"
        );

        let url = format!("{}/v1/tokens/cards", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&bearer)
            .json(&TokenizeRequest {
                card_number: pan.to_string(),
            })
            .timeout(self.config.tokenize_timeout())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), last4 = %masked, "tokenization failed");
            return Err(Error::Tokenization {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: TokenizeResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("tokenize response: {e}")))?;

        info!(%brand, last4 = %masked, "card tokenized");

        Ok(TokenizedCard {
            number_token: parsed.number_token,
            brand,
            last4: masked,
        })
    }

    /// Submit an authorization/capture request.
    ///
    /// Uses the long payment timeout; acquirer authorization latency is
    /// dominated by the card-network round trip. Never retried here.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        let bearer = self.ensure_authenticated().await?;

        info!(
            order_number = %request.seller_info.order_number,
            amount = request.payment.amount,
            installments = request.payment.installments,
            capture_type = %request.payment.capture_type,
            "submitting payment"
        );

        let url = format!("{}/v1/payments", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&bearer)
            .json(request)
            .timeout(self.config.payment_timeout())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = status.as_u16(),
                order_number = %request.seller_info.order_number,
                "payment submission failed"
            );
            return Err(Error::Payment {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PaymentResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("payment response: {e}")))?;

        if let Some(auth) = &parsed.payment_authorization {
            info!(
                payment_id = auth.payment_id.as_deref().unwrap_or("-"),
                authorization_code = auth.authorization_code.as_deref().unwrap_or("-"),
                return_code = auth.return_code.as_deref().unwrap_or("-"),
                "payment response received"
            );
        }

        Ok(parsed)
    }

    /// Read-only payment status query, used for reconciliation and polling.
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentQueryResponse> {
        let bearer = self.ensure_authenticated().await?;

        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&bearer)
            .timeout(self.config.query_timeout())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Payment {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("payment query response: {e}")))
    }
}
