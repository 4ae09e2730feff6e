// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with a
// ManualClock so window expiry needs no sleeping.
//
// Covered:
// - GET /health
// - POST /transactions   (201 / 204 / 400 / 422)
// - GET /statistics      (all-zero, aggregates, expiry, rounding)
// - DELETE /transactions
// - GET /transactions    (plain-text count)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use transaction_statistics::{api, AppState, Clock, ManualClock, TransactionStore};

const BODY_LIMIT: usize = 1024 * 1024;

struct Harness {
    clock: Arc<ManualClock>,
    app: Router,
}

fn harness(decimal_places: Option<u32>) -> Harness {
    let t0 = DateTime::from_timestamp(1_531_821_591, 312_000_000).expect("valid t0");
    let clock = Arc::new(ManualClock::new(t0));
    let store = Arc::new(TransactionStore::new(clock.clone()));
    let app = api::router(AppState::new(store).with_decimal_places(decimal_places));
    Harness { clock, app }
}

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn post_raw(app: &Router, body: &str) -> StatusCode {
    let req = Request::builder()
        .method("POST")
        .uri("/transactions")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build POST /transactions");
    app.clone().oneshot(req).await.expect("oneshot").status()
}

async fn post(app: &Router, amount: Json, at: DateTime<Utc>) -> StatusCode {
    let payload = json!({ "amount": amount, "timestamp": iso(at) });
    post_raw(app, &payload.to_string()).await
}

async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, String::from_utf8(bytes).expect("utf8"))
}

async fn statistics(app: &Router) -> Json {
    let (status, text) = get_text(app, "/statistics").await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_str(&text).expect("parse statistics json")
}

async fn delete_all(app: &Router) -> StatusCode {
    let req = Request::builder()
        .method("DELETE")
        .uri("/transactions")
        .body(Body::empty())
        .expect("build DELETE");
    app.clone().oneshot(req).await.expect("oneshot").status()
}

fn dec_field(v: &Json, key: &str) -> Decimal {
    let s = v.get(key).and_then(Json::as_str).unwrap_or_else(|| panic!("missing '{key}' in {v}"));
    s.parse().expect("decimal string")
}

#[tokio::test]
async fn health_returns_ok() {
    let h = harness(None);
    let (status, body) = get_text(&h.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), "ok");
}

#[tokio::test]
async fn empty_statistics_are_all_zero() {
    let h = harness(Some(2));
    let v = statistics(&h.app).await;
    assert_eq!(
        v,
        json!({ "sum": "0.00", "avg": "0.00", "max": "0.00", "min": "0.00", "count": 0 })
    );
}

#[tokio::test]
async fn two_transactions_now_are_aggregated() {
    let h = harness(Some(2));
    let now = h.clock.now();
    assert_eq!(post(&h.app, json!("10.00"), now).await, StatusCode::CREATED);
    assert_eq!(post(&h.app, json!(10), now).await, StatusCode::CREATED);

    let v = statistics(&h.app).await;
    assert_eq!(
        v,
        json!({ "sum": "20.00", "avg": "10.00", "max": "10.00", "min": "10.00", "count": 2 })
    );
}

#[tokio::test]
async fn full_precision_is_kept_without_rounding() {
    let h = harness(None);
    let now = h.clock.now();
    assert_eq!(post(&h.app, json!("12.3343"), now).await, StatusCode::CREATED);
    assert_eq!(post(&h.app, json!("0.0001"), now).await, StatusCode::CREATED);

    let v = statistics(&h.app).await;
    assert_eq!(dec_field(&v, "sum"), dec!(12.3344));
    assert_eq!(dec_field(&v, "max"), dec!(12.3343));
    assert_eq!(dec_field(&v, "min"), dec!(0.0001));
    assert_eq!(dec_field(&v, "avg"), dec!(6.1672));
    assert_eq!(v["count"], json!(2));
}

#[tokio::test]
async fn old_transaction_is_no_content_and_invisible() {
    let h = harness(Some(2));
    let at = h.clock.now() - Duration::seconds(61);
    assert_eq!(post(&h.app, json!("5.00"), at).await, StatusCode::NO_CONTENT);
    assert_eq!(statistics(&h.app).await["count"], json!(0));

    // long ago, with an extra field
    let body = r#"{"amount": 12.3343, "timestamp": "2018-07-16T09:59:51.312Z", "forceIn": "true"}"#;
    assert_eq!(post_raw(&h.app, body).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn future_transaction_is_unprocessable_and_changes_nothing() {
    let h = harness(Some(2));
    let now = h.clock.now();
    post(&h.app, json!("1.00"), now).await;
    let before = statistics(&h.app).await;

    let at = now + Duration::seconds(5);
    assert_eq!(
        post(&h.app, json!("5.00"), at).await,
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(statistics(&h.app).await, before);
}

#[tokio::test]
async fn unparseable_fields_are_unprocessable() {
    let h = harness(None);
    for body in [
        r#"{"amount": "12.3343.5", "timestamp": "2018-07-17T09:59:51.312Z"}"#,
        r#"{"amount": "abc", "timestamp": "2018-07-17T09:59:51.312Z"}"#,
        r#"{"amount": "12.3343", "timestamp": "2018-07-17T019:59:51.312Z"}"#,
        r#"{"amount": "12.3343", "timestamp": 1531821591}"#,
    ] {
        assert_eq!(
            post_raw(&h.app, body).await,
            StatusCode::UNPROCESSABLE_ENTITY,
            "body: {body}"
        );
    }
}

#[tokio::test]
async fn malformed_json_or_missing_fields_are_bad_request() {
    let h = harness(None);
    for body in [
        r#"{"amount": "12.3343", "timestamp" "2018-07-17T09:59:51.312Z"}"#,
        r#"{"amount": "12.3343", "timestamp": "2018-07-17T09:59:51.312Z""#,
        r#"{"amount": "12.3343" "timestamp": "2018-07-17T09:59:51.312Z"}"#,
        r#"{"timestamp": "2018-07-17T09:59:51.312Z",}"#,
        r#"{"amount": 12.3343}"#,
        r#"{}"#,
        r#"[]"#,
    ] {
        assert_eq!(post_raw(&h.app, body).await, StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn missing_content_type_is_bad_request() {
    let h = harness(None);
    let req = Request::builder()
        .method("POST")
        .uri("/transactions")
        .body(Body::from(
            r#"{"amount": "1", "timestamp": "2018-07-17T09:59:51.312Z"}"#,
        ))
        .expect("build POST");
    let resp = h.app.clone().oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transactions_expire_after_the_window() {
    let h = harness(Some(2));
    let t = h.clock.now();
    assert_eq!(post(&h.app, json!("3.00"), t).await, StatusCode::CREATED);

    h.clock.set(t + Duration::seconds(59));
    assert_eq!(statistics(&h.app).await["count"], json!(1));

    h.clock.set(t + Duration::seconds(61));
    assert_eq!(
        statistics(&h.app).await,
        json!({ "sum": "0.00", "avg": "0.00", "max": "0.00", "min": "0.00", "count": 0 })
    );
}

#[tokio::test]
async fn delete_clears_and_count_reports_window() {
    let h = harness(None);
    let now = h.clock.now();
    for i in 0..5 {
        post(&h.app, json!("1.5"), now - Duration::seconds(i * 10)).await;
    }
    assert_eq!(get_text(&h.app, "/transactions").await, (StatusCode::OK, "5".to_string()));

    assert_eq!(delete_all(&h.app).await, StatusCode::NO_CONTENT);
    assert_eq!(get_text(&h.app, "/transactions").await.1, "0");
    assert_eq!(statistics(&h.app).await["count"], json!(0));
}

#[tokio::test]
async fn rounding_is_half_up_to_two_places() {
    let h = harness(Some(2));
    let now = h.clock.now();
    post(&h.app, json!("10.345"), now).await;
    post(&h.app, json!("10.8"), now - Duration::seconds(1)).await;

    let v = statistics(&h.app).await;
    assert_eq!(v["max"], json!("10.80"));
    assert_eq!(v["min"], json!("10.35"));
    assert_eq!(v["sum"], json!("21.15"));
    // (10.345 + 10.8) / 2 = 10.5725
    assert_eq!(v["avg"], json!("10.57"));
}
