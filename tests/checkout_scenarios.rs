mod common;

use common::*;
use serde_json::Value;
use spay_core::application::endpoints;
use spay_core::domain::checkout::{PresentationEvent, Screen, SessionState};
use spay_core::domain::credentials::AuthMethod;
use spay_core::domain::ports::{AnalyticsOutcome, KeyValueStorage};
use spay_core::error::SdkError;
use spay_core::infrastructure::in_memory::{InMemoryStorage, StaticBiometrics};
use spay_core::interfaces::console::Autopilot;
use std::time::Duration;
use tokio::time::Instant;

async fn last_body(harness: &Harness, path: &str) -> Value {
    let request = harness
        .transport
        .requests()
        .await
        .into_iter()
        .filter(|r| r.path == path)
        .last()
        .unwrap();
    serde_json::from_slice(&request.body.unwrap()).unwrap()
}

async fn approving_harness() -> (Harness, std::sync::Arc<FakeBankApp>) {
    let (bank, redirects) = FakeBankApp::approving();
    let harness = HarnessBuilder::new(bank.clone()).build();
    harness.forward_redirects(redirects);
    script_happy_path(&harness.transport).await;
    harness.sdk.setup("key-1").await.unwrap();
    (harness, bank)
}

#[tokio::test]
async fn test_installment_checkout_completes_with_token() {
    let (harness, bank) = approving_harness().await;

    let outcome = harness
        .run_checkout(Autopilot {
            installment: true,
            ..autopilot()
        })
        .await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.auth_method, AuthMethod::BankApp);
    assert!(outcome.installment_selected);
    assert_eq!(
        outcome.token.as_ref().map(|t| t.payment_token.as_str()),
        Some("stub-payment-token")
    );
    assert_eq!(bank.opened(), 1);

    // The only tool that was pre-selected covers just the first installment.
    let body = last_body(&harness, endpoints::PAYMENT_TOKEN).await;
    assert_eq!(body["paymentId"], 1);
    assert_eq!(body["isBnplEnabled"], true);
    assert_eq!(body["orderId"], "ORD1");

    let auth = last_body(&harness, endpoints::AUTH).await;
    assert_eq!(auth["authCode"], "auth-code");

    // Remember-me cookies outlive the checkout.
    assert_eq!(
        harness.storage.get("cookie.refresh_data").await.unwrap().as_deref(),
        Some("refresh-1")
    );
    let credentials = harness.sdk.services().credentials.snapshot().await;
    assert!(credentials.session_id.is_none());
    assert!(credentials.cookies.has_refresh_credentials());

    let checkout_event = harness
        .analytics
        .events()
        .into_iter()
        .find(|e| e.name == "Checkout")
        .unwrap();
    assert_eq!(checkout_event.outcome, AnalyticsOutcome::Good);
}

#[tokio::test]
async fn test_checkout_without_installments_picks_best_tool() {
    let (bank, redirects) = FakeBankApp::approving();
    let harness = HarnessBuilder::new(bank)
        .config(spay_core::config::SdkConfig {
            bnpl_enabled: false,
            ..config()
        })
        .build();
    harness.forward_redirects(redirects);
    script_happy_path(&harness.transport).await;
    harness.sdk.setup("key-1").await.unwrap();

    let outcome = harness.run_checkout(autopilot()).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert!(!outcome.installment_selected);
    assert_eq!(harness.transport.count(endpoints::PAYMENT_PLAN).await, 0);
    let body = last_body(&harness, endpoints::PAYMENT_TOKEN).await;
    assert_eq!(body["paymentId"], 2);
    assert!(body.get("isBnplEnabled").is_none());
}

#[tokio::test]
async fn test_dismiss_during_authentication_cancels() {
    let harness = HarnessBuilder::new(FakeBankApp::silent()).build();
    script_happy_path(&harness.transport).await;
    harness.transport.hang(endpoints::SESSION_ID).await;
    harness.sdk.setup("key-1").await.unwrap();

    let (checkout, mut events) = harness.start().await;
    wait_for(&mut events, |e| {
        *e == PresentationEvent::StateChanged(SessionState::Authenticating)
    })
    .await;
    assert!(harness.sdk.dismiss().await);

    let outcome = checkout.outcome().await;
    assert_eq!(outcome.state, SessionState::Cancelled);
    assert!(outcome.token.is_none());
    assert_eq!(
        outcome.token_response().error.as_deref(),
        Some(SdkError::Cancelled.merchant_description())
    );

    let services = harness.sdk.services();
    assert!(services.gateway.cancellations() >= 1);
    assert!(services.credentials.session_id().await.is_none());
    assert!(!harness.sdk.dismiss().await);
}

#[tokio::test]
async fn test_second_checkout_waits_for_the_first() {
    let harness = HarnessBuilder::new(FakeBankApp::silent()).build();
    script_happy_path(&harness.transport).await;
    harness.transport.hang(endpoints::SESSION_ID).await;
    harness.sdk.setup("key-1").await.unwrap();

    let (first, _events) = harness.start().await;
    let (presenter, _rx) = spay_core::interfaces::presenter::ChannelPresenter::new();
    let second = harness
        .sdk
        .get_payment_token(request(), std::sync::Arc::new(presenter))
        .await;
    assert!(matches!(second, Err(SdkError::Waiting)));

    first.handle().dismiss();
    assert_eq!(first.outcome().await.state, SessionState::Cancelled);

    let (third, _events) = harness.start().await;
    third.handle().dismiss();
    assert_eq!(third.outcome().await.state, SessionState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_checkout_times_out() {
    let harness = HarnessBuilder::new(FakeBankApp::silent())
        .config(spay_core::config::SdkConfig {
            session_timeout_secs: 5,
            ..config()
        })
        .build();
    script_happy_path(&harness.transport).await;
    harness.transport.hang(endpoints::SESSION_ID).await;
    harness.sdk.setup("key-1").await.unwrap();

    let started = Instant::now();
    let (checkout, mut events) = harness.start().await;
    let outcome = checkout.outcome().await;

    assert_eq!(outcome.state, SessionState::Failed(SdkError::TimeOut));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(harness.sdk.services().gateway.cancellations() >= 1);

    let seen = wait_for(&mut events, |e| {
        matches!(e, PresentationEvent::StateChanged(state) if state.is_terminal())
    })
    .await;
    assert!(seen.iter().any(|e| matches!(
        e,
        PresentationEvent::ShowError { error: SdkError::TimeOut, message }
            if message == "Time for payment has expired"
    )));
}

#[tokio::test(start_paused = true)]
async fn test_background_time_counts_against_the_checkout() {
    let (harness, _bank) = approving_harness().await;

    let (checkout, mut events) = harness.start().await;
    wait_for(&mut events, |e| {
        matches!(e, PresentationEvent::ShowScreen(Screen::PaymentSheet(_)))
    })
    .await;

    harness.sdk.did_enter_background(Instant::now()).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::advance(Duration::from_secs(600)).await;
    harness.sdk.will_enter_foreground(Instant::now()).await;

    let outcome = checkout.outcome().await;
    assert_eq!(outcome.state, SessionState::Failed(SdkError::TimeOut));
}

#[tokio::test]
async fn test_otp_is_confirmed_before_token_issuance() {
    let (harness, _bank) = approving_harness().await;
    harness
        .transport
        .always(
            endpoints::AUTH,
            Ok(ok(r#"{"errorCode": "0", "isOtpNeed": true}"#)),
        )
        .await;

    let outcome = harness.run_checkout(autopilot()).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(harness.transport.count(endpoints::CREATE_OTP).await, 1);
    assert_eq!(harness.transport.count(endpoints::CONFIRM_OTP).await, 1);

    let create = last_body(&harness, endpoints::CREATE_OTP).await;
    assert_eq!(create["bankInvoiceId"], "ORD1");
    let confirm = last_body(&harness, endpoints::CONFIRM_OTP).await;
    assert_eq!(confirm["otpHash"].as_str().map(str::len), Some(64));
}

#[tokio::test]
async fn test_three_wrong_codes_fail_the_checkout() {
    let (harness, _bank) = approving_harness().await;
    harness
        .transport
        .always(
            endpoints::AUTH,
            Ok(ok(r#"{"errorCode": "0", "isOtpNeed": true}"#)),
        )
        .await;
    harness
        .transport
        .always(
            endpoints::CONFIRM_OTP,
            Ok(status(400, r#"{"errorCode": "7", "errorMessage": "wrong code"}"#)),
        )
        .await;

    let outcome = harness.run_checkout(autopilot()).await;

    assert!(matches!(
        outcome.state,
        SessionState::Failed(SdkError::BadResponseWithStatus { code: 400, .. })
    ));
    assert_eq!(harness.transport.count(endpoints::CONFIRM_OTP).await, 3);
    assert_eq!(harness.transport.count(endpoints::PAYMENT_TOKEN).await, 0);
}

#[tokio::test]
async fn test_fraud_hint_is_confirmed_and_token_reissued() {
    let (harness, _bank) = approving_harness().await;
    harness
        .transport
        .push(
            endpoints::PAYMENT_TOKEN,
            Ok(ok(r#"{
                "errorCode": "0",
                "fraudMonCheckResult": {
                    "actionCode": "REVIEW",
                    "confirmMethodFactor": "HINT",
                    "formParameters": {"header": "Is this you?"}
                }
            }"#)),
        )
        .await;

    let outcome = harness.run_checkout(autopilot()).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(harness.transport.count(endpoints::PAYMENT_TOKEN).await, 2);
    let body = last_body(&harness, endpoints::PAYMENT_TOKEN).await;
    assert_eq!(body["fraudMonInfo"]["resolution"], "CONFIRMED_GENUINE");
}

#[tokio::test]
async fn test_fraud_sms_challenge_runs_otp() {
    let (harness, _bank) = approving_harness().await;
    harness
        .transport
        .push(
            endpoints::PAYMENT_TOKEN,
            Ok(status(
                403,
                r#"{"fraudMonCheckResult": {"actionCode": "REVIEW", "confirmMethodFactor": "SMSP"}}"#,
            )),
        )
        .await;

    let outcome = harness.run_checkout(autopilot()).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(harness.transport.count(endpoints::CONFIRM_OTP).await, 1);
    assert_eq!(harness.transport.count(endpoints::PAYMENT_TOKEN).await, 2);
}

#[tokio::test]
async fn test_denied_payment_fails() {
    let (harness, _bank) = approving_harness().await;
    harness
        .transport
        .always(
            endpoints::PAYMENT_TOKEN,
            Ok(ok(r#"{"errorCode": "0", "fraudMonCheckResult": {"actionCode": "DENY"}}"#)),
        )
        .await;

    let outcome = harness.run_checkout(autopilot()).await;

    assert!(matches!(
        outcome.state,
        SessionState::Failed(SdkError::ErrorFromServer { .. })
    ));
    assert_eq!(harness.transport.count(endpoints::PAYMENT_TOKEN).await, 1);
}

#[tokio::test]
async fn test_remember_me_skips_the_bank_app() {
    let storage = InMemoryStorage::new();
    storage.set("cookie.id_key", "id-0").await.unwrap();
    storage.set("cookie.refresh_data", "refresh-0").await.unwrap();
    let (bank, redirects) = FakeBankApp::approving();
    let harness = HarnessBuilder::new(bank.clone())
        .storage(storage)
        .biometrics(StaticBiometrics::new(true, true))
        .build();
    harness.forward_redirects(redirects);
    script_happy_path(&harness.transport).await;
    harness.sdk.setup("key-1").await.unwrap();

    let outcome = harness.run_checkout(autopilot()).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.auth_method, AuthMethod::RefreshToken);
    assert_eq!(bank.opened(), 0);

    let session = harness
        .transport
        .requests()
        .await
        .into_iter()
        .find(|r| r.path == endpoints::SESSION_ID)
        .unwrap();
    let cookie = session
        .headers
        .iter()
        .find(|(name, _)| name == "Cookie")
        .map(|(_, value)| value.clone())
        .unwrap();
    assert!(cookie.contains("X-Sdk-Refresh-Data=refresh-0"));
}

#[tokio::test]
async fn test_rejected_biometrics_fall_back_to_the_bank_app() {
    let storage = InMemoryStorage::new();
    storage.set("cookie.id_key", "id-0").await.unwrap();
    storage.set("cookie.refresh_data", "refresh-0").await.unwrap();
    let (bank, redirects) = FakeBankApp::approving();
    let harness = HarnessBuilder::new(bank.clone())
        .storage(storage)
        .biometrics(StaticBiometrics::new(true, false))
        .build();
    harness.forward_redirects(redirects);
    script_happy_path(&harness.transport).await;
    harness.sdk.setup("key-1").await.unwrap();

    let outcome = harness.run_checkout(autopilot()).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.auth_method, AuthMethod::BankApp);
    assert_eq!(bank.opened(), 1);
    assert_eq!(harness.transport.count(endpoints::AUTH).await, 2);
}

#[tokio::test]
async fn test_setup_without_any_config_fails() {
    let harness = HarnessBuilder::new(FakeBankApp::silent()).build();
    harness
        .transport
        .always(endpoints::REMOTE_CONFIG, Ok(status(503, "")))
        .await;

    let result = harness.sdk.setup("key-1").await;

    assert!(matches!(
        result,
        Err(SdkError::BadResponseWithStatus { code: 503, .. })
    ));
    assert_eq!(harness.transport.count(endpoints::REMOTE_CONFIG).await, 2);
    assert!(!harness.sdk.is_ready_for_pay().await);
    let setup = harness.analytics.events().into_iter().find(|e| e.name == "Setup");
    assert_eq!(setup.map(|e| e.outcome), Some(AnalyticsOutcome::Fail));
}

#[tokio::test]
async fn test_setup_falls_back_to_cached_config() {
    let storage = InMemoryStorage::new();
    storage
        .set("remote_config", &fixture("remote_config"))
        .await
        .unwrap();
    let harness = HarnessBuilder::new(FakeBankApp::silent())
        .storage(storage)
        .build();
    harness
        .transport
        .always(endpoints::REMOTE_CONFIG, Ok(status(500, "")))
        .await;

    harness.sdk.setup("key-1").await.unwrap();
    assert!(harness.sdk.is_ready_for_pay().await);
}

#[tokio::test]
async fn test_pay_reports_waiting_after_locked_retries() {
    let (harness, _bank) = approving_harness().await;
    harness
        .transport
        .always(endpoints::PAYMENT_ORDER, Ok(status(423, "")))
        .await;

    let response = harness
        .sdk
        .pay(&spay_core::domain::auth_info::PaymentRequest {
            order_id: Some("ORD1".to_string()),
            payment_token: Some("stub-payment-token".to_string()),
            merchant_login: Some("shop".to_string()),
            ..Default::default()
        })
        .await;

    assert_eq!(
        response.state,
        spay_core::domain::checkout::PaymentState::Waiting
    );
    assert_eq!(harness.transport.count(endpoints::PAYMENT_ORDER).await, 4);
}

fn authorization(request: &spay_core::domain::ports::OutboundRequest) -> Option<&str> {
    request
        .headers
        .iter()
        .find(|(name, _)| name == "Authorization")
        .map(|(_, value)| value.as_str())
}

#[tokio::test]
async fn test_checkout_after_re_setup_keeps_the_new_key() {
    let (harness, _bank) = approving_harness().await;
    harness.sdk.setup("key-2").await.unwrap();

    let outcome = harness.run_checkout(autopilot()).await;
    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(
        harness.sdk.services().credentials.snapshot().await.api_key.as_deref(),
        Some("key-2")
    );

    harness
        .sdk
        .pay(&spay_core::domain::auth_info::PaymentRequest {
            order_id: Some("ORD1".to_string()),
            payment_token: Some("stub-payment-token".to_string()),
            ..Default::default()
        })
        .await;
    let requests = harness.transport.requests().await;
    let order = requests
        .iter()
        .find(|r| r.path == endpoints::PAYMENT_ORDER)
        .unwrap();
    assert_eq!(authorization(order), Some("Bearer key-2"));
}

#[tokio::test]
async fn test_checkout_key_lasts_for_one_checkout() {
    let (harness, _bank) = approving_harness().await;

    let (presenter, events) = spay_core::interfaces::presenter::ChannelPresenter::new();
    let checkout = harness
        .sdk
        .get_payment_token(
            spay_core::domain::auth_info::PaymentTokenRequest {
                api_key: Some("key-checkout".to_string()),
                ..request()
            },
            std::sync::Arc::new(presenter),
        )
        .await
        .unwrap();
    let driver = tokio::spawn(autopilot().drive(events, checkout.handle().clone()));
    assert_eq!(checkout.outcome().await.state, SessionState::Completed);
    driver.await.unwrap();

    let requests = harness.transport.requests().await;
    let token = requests
        .iter()
        .find(|r| r.path == endpoints::PAYMENT_TOKEN)
        .unwrap();
    assert_eq!(authorization(token), Some("Bearer key-checkout"));
    assert_eq!(
        harness.sdk.services().credentials.snapshot().await.api_key.as_deref(),
        Some("key-1")
    );
}
