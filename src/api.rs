use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::aggregator::AggregateSnapshot;
use crate::metrics;
use crate::store::TransactionStore;
use crate::transaction::{Outcome, Transaction, TransactionError, TransactionPayload};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TransactionStore>,
    /// Fixed output scale for `/statistics`; `None` keeps full precision.
    pub decimal_places: Option<u32>,
}

impl AppState {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self {
            store,
            decimal_places: None,
        }
    }

    pub fn with_decimal_places(mut self, places: Option<u32>) -> Self {
        self.decimal_places = places;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/transactions",
            get(count_transactions)
                .post(create_transaction)
                .delete(delete_transactions),
        )
        .route("/statistics", get(statistics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body is not a JSON object with both fields present.
    #[error("malformed request: {0}")]
    BadRequest(String),
    /// Fields are present but not parseable.
    #[error(transparent)]
    Unprocessable(TransactionError),
    #[error("transaction timestamp is in the future")]
    FutureTimestamp,
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::BadRequest(r.body_text())
    }
}

impl From<TransactionError> for ApiError {
    fn from(e: TransactionError) -> Self {
        if e.is_missing_field() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Unprocessable(e)
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) | ApiError::FutureTimestamp => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    fn metric_reason(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "malformed",
            ApiError::Unprocessable(_) => "invalid_field",
            ApiError::FutureTimestamp => "future_timestamp",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(error = %self, "transaction refused");
        self.status().into_response()
    }
}

/// POST /transactions
///
/// 201 accepted, 204 older than the window, 400 malformed body,
/// 422 unparseable field or future timestamp. Bodies are empty.
async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionPayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let tx = parse(payload).inspect_err(|e| metrics::record_invalid(e.metric_reason()))?;

    let outcome = state.store.add_transaction(&tx);
    metrics::record_outcome(&outcome);
    match outcome {
        Outcome::Accepted => Ok(StatusCode::CREATED),
        Outcome::Ignored(_) => Ok(StatusCode::NO_CONTENT),
        Outcome::Rejected(_) => Err(ApiError::FutureTimestamp),
    }
}

fn parse(payload: Result<Json<TransactionPayload>, JsonRejection>) -> Result<Transaction, ApiError> {
    let Json(body) = payload?;
    Ok(Transaction::try_from(body)?)
}

/// DELETE /transactions
async fn delete_transactions(State(state): State<AppState>) -> StatusCode {
    state.store.clear();
    metrics::record_clear();
    StatusCode::NO_CONTENT
}

/// GET /transactions — plain-text count, for diagnostics only.
async fn count_transactions(State(state): State<AppState>) -> String {
    state.store.count().to_string()
}

/// GET /statistics
async fn statistics(State(state): State<AppState>) -> Json<AggregateSnapshot> {
    let snap = state.store.snapshot();
    metrics::record_snapshot(&snap);
    match state.decimal_places {
        Some(places) => Json(snap.rounded(places)),
        None => Json(snap),
    }
}
