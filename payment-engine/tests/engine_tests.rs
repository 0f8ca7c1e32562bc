//! End-to-end engine tests against a stubbed acquirer.

use gateway_core::{
    CaptureType, CardBrand, Environment, InvoiceStatus, Merchant, MerchantCredentials,
    TransactionStatus,
};
use payment_engine::{
    CardDetails, CardSource, EngineConfig, Error, MemoryStore, PaymentEngine, PaymentOptions,
    Store, WebhookOutcome,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PAN: &str = "4761739001010036";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn engine_against(server: &MockServer) -> (PaymentEngine, Arc<MemoryStore>, Uuid) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let mut config = EngineConfig::default();
    config.acquirer.sandbox_url = server.uri();

    let engine = PaymentEngine::new(store.clone(), config);

    let merchant = Merchant {
        id: Uuid::new_v4(),
        name: "Loja Exemplo".to_string(),
        active: true,
        credentials: Some(MerchantCredentials {
            client_id: "client-1".to_string(),
            client_secret: "secret-1".to_string(),
            seller_id: "seller-1".to_string(),
            environment: Environment::Sandbox,
        }),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let merchant_id = merchant.id;
    engine.upsert_merchant(merchant).await.unwrap();

    (engine, store, merchant_id)
}

fn card() -> CardDetails {
    CardDetails {
        source: CardSource::Pan {
            pan: TEST_PAN.to_string(),
            brand: CardBrand::Visa,
        },
        cardholder_name: "JOSE DA SILVA".to_string(),
        expiration_month: "12".to_string(),
        expiration_year: "30".to_string(),
        security_code: "123".to_string(),
    }
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/oauth2/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "tok-abc",
            "expiresIn": 3600
        })))
        .mount(server)
        .await;
}

async fn mount_tokenize(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/tokens/cards"))
        .and(body_partial_json(json!({"cardNumber": TEST_PAN})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numberToken": "nt-123"
        })))
        .mount(server)
        .await;
}

async fn mount_approved_payment(server: &MockServer, payment_id: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "paymentAuthorization": {
                "paymentId": payment_id,
                "authorizationCode": "AUTH42",
                "nsu": "000123",
                "returnCode": "00"
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_auto_capture_pays_the_invoice() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    mount_approved_payment(&server, "pay-100").await;

    let (engine, store, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();

    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap();

    assert_eq!(transaction.status, TransactionStatus::Captured);
    assert_eq!(transaction.payment_id.as_deref(), Some("pay-100"));
    assert!(!transaction
        .authorization_code
        .as_deref()
        .unwrap_or("")
        .is_empty());
    assert_eq!(transaction.card_last4.as_deref(), Some("0036"));
    assert!(transaction.captured_at.is_some());

    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);

    // Full PAN never reaches storage.
    let stored = store.get_transaction(transaction.id).await.unwrap().unwrap();
    let as_json = serde_json::to_string(&stored).unwrap();
    assert!(!as_json.contains(TEST_PAN));
}

#[tokio::test]
async fn test_pre_auth_holds_funds_and_pays_the_invoice() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;

    // Pre-authorizations go out with captureType "pa".
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .and(body_partial_json(json!({"payment": {"captureType": "pa"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "paymentAuthorization": {
                "paymentId": "pay-200",
                "authorizationCode": "AUTH99"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (engine, _, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 2500, "BRL", None)
        .await
        .unwrap();

    let options = PaymentOptions {
        capture_type: CaptureType::PreAuth,
        ..PaymentOptions::default()
    };
    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), options)
        .await
        .unwrap();

    assert_eq!(transaction.status, TransactionStatus::Authorized);
    assert!(transaction.authorized_at.is_some());
    assert!(transaction.captured_at.is_none());

    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_tokenization_failure_lands_everything_in_failed() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/tokens/cards"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"error":"invalid card"}"#),
        )
        .mount(&server)
        .await;

    let (engine, store, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();

    let err = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Acquirer(acquirer::Error::Tokenization { status: 422, .. })
    ));

    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Failed);

    // The attempt record landed in DECLINED without reaching any milestone.
    let attempts = store.list_invoice_transactions(invoice.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, TransactionStatus::Declined);
    assert!(attempts[0].authorized_at.is_none());
    assert!(attempts[0].captured_at.is_none());
    assert!(attempts[0].settled_at.is_none());
}

#[tokio::test]
async fn test_declined_payment_surfaces_the_acquirer_body() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .respond_with(
            ResponseTemplate::new(402).set_body_string(r#"{"returnCode":"51"}"#),
        )
        .mount(&server)
        .await;

    let (engine, _, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();

    let err = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Acquirer(acquirer::Error::Payment { status, body }) => {
            assert_eq!(status, 402);
            assert!(body.contains("51"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Failed);
}

#[tokio::test]
async fn test_concurrent_double_submission_charges_once() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;

    // The acquirer may be hit at most once for the invoice.
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "paymentAuthorization": {
                "paymentId": "pay-300",
                "authorizationCode": "AUTH01"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (engine, _, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        engine.process_payment(invoice.id, merchant_id, card(), PaymentOptions::default()),
        engine.process_payment(invoice.id, merchant_id, card(), PaymentOptions::default()),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, Error::InvalidTransition(_)));

    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_webhook_settles_a_captured_payment() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    mount_approved_payment(&server, "pay-400").await;

    let (engine, store, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();
    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Captured);

    let outcome = engine
        .ingest_webhook(json!({"paymentId": "pay-400", "status": "Settled"}), None)
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Processed { .. }));

    let settled = store.get_transaction(transaction.id).await.unwrap().unwrap();
    assert_eq!(settled.status, TransactionStatus::Settled);
    assert!(settled.settled_at.is_some());

    // The invoice was already PAID and stays PAID.
    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_duplicate_webhook_changes_nothing() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    mount_approved_payment(&server, "pay-500").await;

    let (engine, store, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();
    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap();

    let payload = json!({"paymentId": "pay-500", "status": "Settled"});
    let first = engine.ingest_webhook(payload.clone(), None).await.unwrap();
    assert!(matches!(first, WebhookOutcome::Processed { .. }));

    let before = store.get_transaction(transaction.id).await.unwrap().unwrap();
    let second = engine.ingest_webhook(payload, None).await.unwrap();
    assert!(matches!(second, WebhookOutcome::Duplicate { .. }));

    let after = store.get_transaction(transaction.id).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_stale_webhook_is_ignored() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    mount_approved_payment(&server, "pay-600").await;

    let (engine, store, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();
    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap();

    // An "Authorized" notification arriving after capture is behind the
    // transaction's state and must not move anything.
    let outcome = engine
        .ingest_webhook(json!({"paymentId": "pay-600", "status": "Authorized"}), None)
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::IgnoredStale { .. }));

    let unchanged = store.get_transaction(transaction.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, TransactionStatus::Captured);
    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_unmatched_webhook_is_flagged() {
    let server = MockServer::start().await;
    let (engine, _, _) = engine_against(&server).await;

    let outcome = engine
        .ingest_webhook(
            json!({"paymentId": "never-seen", "status": "Captured"}),
            None,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Unmatched { .. }));
}

#[tokio::test]
async fn test_refund_webhook_settles_transaction_without_failing_invoice() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    mount_approved_payment(&server, "pay-700").await;

    let (engine, store, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();
    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap();

    let outcome = engine
        .ingest_webhook(json!({"paymentId": "pay-700", "status": "Refunded"}), None)
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Processed { .. }));

    let refunded = store.get_transaction(transaction.id).await.unwrap().unwrap();
    assert_eq!(refunded.status, TransactionStatus::Refunded);

    // Refunds are transaction-level; the invoice keeps its PAID history.
    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_payment_requires_merchant_credentials() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let mut config = EngineConfig::default();
    config.acquirer.sandbox_url = server.uri();
    let engine = PaymentEngine::new(store, config);

    let merchant = Merchant {
        id: Uuid::new_v4(),
        name: "Sem Credencial".to_string(),
        active: true,
        credentials: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let merchant_id = merchant.id;
    engine.upsert_merchant(merchant).await.unwrap();

    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();

    let err = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingCredentials(_)));

    // The invoice was never touched.
    let invoice = engine.get_invoice(invoice.id, merchant_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
}

#[tokio::test]
async fn test_get_payment_is_merchant_scoped() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_tokenize(&server).await;
    mount_approved_payment(&server, "pay-800").await;

    let (engine, _, merchant_id) = engine_against(&server).await;
    let invoice = engine
        .create_invoice(merchant_id, Uuid::new_v4(), 1000, "BRL", None)
        .await
        .unwrap();
    let transaction = engine
        .process_payment(invoice.id, merchant_id, card(), PaymentOptions::default())
        .await
        .unwrap();

    let fetched = engine
        .get_payment(transaction.id, merchant_id)
        .await
        .unwrap();
    assert_eq!(fetched.id, transaction.id);

    let err = engine
        .get_payment(transaction.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransactionNotFound(_)));
}
