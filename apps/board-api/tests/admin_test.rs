mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{Datelike, NaiveDate};
use tokio::sync::Notify;

use board_api::db::usage::UsageCounterStore;
use board_api::error::StoreError;
use board_api::maintenance::scheduler::{RunOutcome, RunState};

// ===========================================================================
// Helpers
// ===========================================================================

async fn trigger_reset(server: &TestServer, token: &str) -> axum_test::TestResponse {
    server
        .post("/api/v1/admin/maintenance/usage-reset")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await
}

/// Store whose reset parks until released.
#[derive(Default)]
struct GatedStore {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl UsageCounterStore for GatedStore {
    async fn reset_all(&self, _period_start: NaiveDate) -> Result<usize, StoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(0)
    }
}

struct UnreachableStore;

#[async_trait]
impl UsageCounterStore for UnreachableStore {
    async fn reset_all(&self, _period_start: NaiveDate) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

// ===========================================================================
// Health
// ===========================================================================

#[tokio::test]
async fn health_reports_ok() {
    let (app, _state, _usage) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["status"], "ok");
}

// ===========================================================================
// Authorization
// ===========================================================================

#[tokio::test]
async fn usage_reset_requires_credential() {
    let (app, _state, usage) = common::test_app();
    let server = TestServer::new(app).unwrap();
    common::seed_counter(&usage, "rec_a", 3);

    let resp = server.post("/api/v1/admin/maintenance/usage-reset").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json::<serde_json::Value>()["error"]["code"],
        "UNAUTHORIZED"
    );
    assert_eq!(usage.get("rec_a").unwrap().posts_used, 3);
}

#[tokio::test]
async fn usage_reset_rejects_expired_credential() {
    let (app, _state, usage) = common::test_app();
    let server = TestServer::new(app).unwrap();
    common::seed_counter(&usage, "rec_a", 3);

    let expired = common::mint_token(Some("usr_admin"), Some("admin"), -300);
    let resp = trigger_reset(&server, &expired).await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json::<serde_json::Value>()["error"]["message"],
        "session expired, please sign in again"
    );
    assert_eq!(usage.get("rec_a").unwrap().posts_used, 3);
}

#[tokio::test]
async fn usage_reset_forbidden_for_non_admin() {
    let (app, _state, usage) = common::test_app();
    let server = TestServer::new(app).unwrap();
    common::seed_counter(&usage, "rec_a", 3);

    let resp = trigger_reset(&server, &common::user_token("usr_recruiter")).await;
    resp.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(resp.json::<serde_json::Value>()["error"]["code"], "FORBIDDEN");
    assert_eq!(usage.get("rec_a").unwrap().posts_used, 3);
}

#[tokio::test]
async fn presence_forbidden_for_non_admin() {
    let (app, _state, _usage) = common::test_app();
    let server = TestServer::new(app).unwrap();

    server
        .get("/api/v1/admin/presence")
        .add_header(AUTHORIZATION, format!("Bearer {}", common::user_token("usr_1")))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// ===========================================================================
// Manual usage reset
// ===========================================================================

#[tokio::test]
async fn admin_reset_zeroes_every_counter() {
    let (app, state, usage) = common::test_app();
    let server = TestServer::new(app).unwrap();
    common::seed_counter(&usage, "rec_a", 4);
    common::seed_counter(&usage, "rec_b", 0);
    common::seed_counter(&usage, "rec_c", 25);

    let resp = trigger_reset(&server, &common::admin_token()).await;
    resp.assert_status_ok();

    let body = resp.json::<serde_json::Value>();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["records_reset"], 3);
    assert!(body["next_scheduled"].is_string());

    let period_start: NaiveDate =
        serde_json::from_value(body["period_start"].clone()).expect("period_start");
    assert_eq!(period_start.day(), 1);

    for counter in usage.snapshot() {
        assert_eq!(counter.posts_used, 0);
        assert_eq!(counter.period_start, period_start);
    }
    assert_eq!(state.maintenance.state(), RunState::Idle);
}

#[tokio::test]
async fn admin_reset_twice_matches_once() {
    let (app, _state, usage) = common::test_app();
    let server = TestServer::new(app).unwrap();
    common::seed_counter(&usage, "rec_a", 9);

    trigger_reset(&server, &common::admin_token())
        .await
        .assert_status_ok();
    let after_first = usage.snapshot();

    trigger_reset(&server, &common::admin_token())
        .await
        .assert_status_ok();
    assert_eq!(usage.snapshot(), after_first);
}

#[tokio::test]
async fn admin_reset_with_no_counters() {
    let (app, _state, _usage) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = trigger_reset(&server, &common::admin_token()).await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["records_reset"], 0);
}

#[tokio::test]
async fn admin_reset_while_run_in_flight_is_conflict() {
    let store = Arc::new(GatedStore::default());
    let (app, state) = common::app_with_store(store.clone());
    let server = TestServer::new(app).unwrap();

    let scheduler = state.maintenance.clone();
    let in_flight = tokio::spawn(async move { scheduler.trigger().await });
    store.entered.notified().await;
    assert_eq!(state.maintenance.state(), RunState::Running);

    let resp = trigger_reset(&server, &common::admin_token()).await;
    resp.assert_status(StatusCode::CONFLICT);
    assert_eq!(resp.json::<serde_json::Value>()["error"]["code"], "CONFLICT");

    store.release.notify_one();
    assert!(matches!(in_flight.await.unwrap(), RunOutcome::Completed(_)));
    assert_eq!(state.maintenance.state(), RunState::Idle);
}

#[tokio::test]
async fn admin_reset_with_store_down_is_unavailable() {
    let (app, state) = common::app_with_store(Arc::new(UnreachableStore));
    let server = TestServer::new(app).unwrap();

    let resp = trigger_reset(&server, &common::admin_token()).await;
    resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        resp.json::<serde_json::Value>()["error"]["code"],
        "SERVICE_UNAVAILABLE"
    );
    // The failure is absorbed; the next trigger is free to run.
    assert_eq!(state.maintenance.state(), RunState::Idle);
}

// ===========================================================================
// Presence
// ===========================================================================

#[tokio::test]
async fn admin_presence_reports_connected_users() {
    let (app, _state, _usage) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .get("/api/v1/admin/presence")
        .add_header(AUTHORIZATION, format!("Bearer {}", common::admin_token()))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["connected"], 0);
}
