//! # REST API
//!
//! Builds the axum router that exposes the exchange node's HTTP
//! interface. All endpoints share application state through axum's
//! `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                             | Description                        |
//! |--------|----------------------------------|------------------------------------|
//! | GET    | `/health`                        | Liveness probe                     |
//! | GET    | `/api/info`                      | Service metadata                   |
//! | GET    | `/api/tokens/providers`          | Supported AI-credit providers      |
//! | POST   | `/api/tokens/wrap`               | Wrap credits into VRD tokens       |
//! | GET    | `/api/tokens/balance/:address`   | Balance and wrap history           |
//! | POST   | `/api/carbon/retire`             | Retire tokens, purchase offset     |
//! | GET    | `/api/carbon/history/:address`   | Retirement history                 |
//! | GET    | `/api/carbon/stats`              | Platform-wide offset statistics    |
//! | GET    | `/api/carbon/certificate/:id`    | Offset certificate lookup          |
//!
//! The two POST endpoints identify the caller with a `user_address`
//! query parameter, mirroring the v1 wire contract exactly.
//!
//! ## Errors
//!
//! Failures serialize as `{"error": <kind>, "message": <detail>}`.
//! Validation and balance failures map to 400, missing records to 404,
//! storage faults to 500.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use verdant_ledger::config::{
    OFFSET_PROVIDER, OFFSET_RATE_TONS_PER_TOKEN, SERVICE_NAME, TOKEN_SYMBOL,
};
use verdant_ledger::{BalanceLedger, LedgerError, RetirementEngine, RetirementRecord};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The balance ledger (wraps, balances).
    pub ledger: Arc<BalanceLedger>,
    /// The retirement engine (retire, history, stats, certificates).
    pub engine: Arc<RetirementEngine>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured API port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .route("/api/tokens/providers", get(providers_handler))
        .route("/api/tokens/wrap", post(wrap_handler))
        .route("/api/tokens/balance/:address", get(balance_handler))
        .route("/api/carbon/retire", post(retire_handler))
        .route("/api/carbon/history/:address", get(history_handler))
        .route("/api/carbon/stats", get(stats_handler))
        .route("/api/carbon/certificate/:id", get(certificate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// JSON error envelope returned for every failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable machine-readable kind, e.g. `"insufficient_balance"`.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

/// Wraps [`LedgerError`] so handlers can use `?` and let axum render the
/// response.
pub struct ApiFailure(LedgerError);

impl From<LedgerError> for ApiFailure {
    fn from(err: LedgerError) -> Self {
        ApiFailure(err)
    }
}

impl ApiFailure {
    fn kind(&self) -> &'static str {
        match &self.0 {
            LedgerError::InvalidAddress(_) => "invalid_address",
            LedgerError::Registry(_) => "unknown_provider",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::Proof(_) => "invalid_proof",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Storage(_) => "storage",
        }
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = ApiError {
            error: self.kind().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Query parameters identifying the caller on POST endpoints.
#[derive(Debug, Deserialize)]
pub struct CallerQuery {
    pub user_address: String,
}

/// Request body for `POST /api/tokens/wrap`.
#[derive(Debug, Deserialize)]
pub struct WrapCreditsRequest {
    /// Provider id, e.g. `"openai"`.
    pub provider: String,
    /// Credits to surrender, in provider units.
    pub credit_amount: f64,
    /// Proof of credit ownership.
    pub proof: String,
}

/// Response body for `POST /api/tokens/wrap`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WrapCreditsResponse {
    pub transaction_hash: String,
    pub tokens_issued: f64,
    pub message: String,
}

/// One wrap entry in a balance response. The stored proof is deliberately
/// not echoed back.
#[derive(Debug, Serialize, Deserialize)]
pub struct WrappedCreditInfo {
    pub provider: String,
    pub credit_amount: f64,
    pub tokens_issued: f64,
    pub transaction_hash: String,
    pub created_at: String,
}

/// Response body for `GET /api/tokens/balance/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenBalanceResponse {
    pub user_address: String,
    pub total_balance: f64,
    pub wrapped_credits: Vec<WrappedCreditInfo>,
}

/// Request body for `POST /api/carbon/retire`.
#[derive(Debug, Deserialize)]
pub struct RetireTokensRequest {
    /// Tokens to burn.
    pub token_amount: f64,
    /// Caller-supplied motivation.
    #[serde(default = "default_retirement_reason")]
    pub reason: String,
}

fn default_retirement_reason() -> String {
    "Carbon offset retirement".to_string()
}

/// Response body for `POST /api/carbon/retire`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CarbonOffsetResponse {
    pub transaction_hash: String,
    pub tokens_retired: f64,
    pub carbon_credits_purchased: f64,
    pub offset_provider: String,
    pub certificate_id: String,
    pub message: String,
}

/// One retirement entry in a history response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OffsetInfo {
    pub id: u64,
    pub user_address: String,
    pub tokens_retired: f64,
    pub carbon_credits_purchased: f64,
    pub offset_provider: String,
    pub certificate_id: String,
    pub reason: String,
    pub created_at: String,
}

impl From<&RetirementRecord> for OffsetInfo {
    fn from(record: &RetirementRecord) -> Self {
        OffsetInfo {
            id: record.id,
            user_address: record.user_address.clone(),
            tokens_retired: record.tokens_retired.to_decimal(),
            carbon_credits_purchased: record.carbon_credits_purchased.to_decimal(),
            offset_provider: record.offset_provider.clone(),
            certificate_id: record.certificate_id.clone(),
            reason: record.reason.clone(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Response body for `GET /api/carbon/certificate/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CertificateResponse {
    pub certificate_id: String,
    pub user_address: String,
    pub tokens_retired: f64,
    pub carbon_credits_purchased: f64,
    pub offset_provider: String,
    pub transaction_hash: String,
    pub reason: String,
    pub offset_rate: f64,
    pub created_at: String,
    pub verification_url: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe for monitoring and load balancers.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": state.version,
    }))
}

/// `GET /api/info` — service metadata.
async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": state.version,
        "token_symbol": TOKEN_SYMBOL,
        "offset_provider": OFFSET_PROVIDER,
        "offset_rate_tons_per_token": OFFSET_RATE_TONS_PER_TOKEN,
        "endpoints": {
            "tokens": "/api/tokens",
            "carbon": "/api/carbon",
        },
    }))
}

/// `GET /api/tokens/providers` — the active provider catalog.
async fn providers_handler(State(state): State<AppState>) -> impl IntoResponse {
    let providers: Vec<_> = state
        .ledger
        .registry()
        .active()
        .into_iter()
        .cloned()
        .collect();
    Json(providers)
}

/// `POST /api/tokens/wrap?user_address=0x...` — wrap provider credits
/// into VRD tokens.
async fn wrap_handler(
    State(state): State<AppState>,
    Query(caller): Query<CallerQuery>,
    Json(request): Json<WrapCreditsRequest>,
) -> Result<Json<WrapCreditsResponse>, ApiFailure> {
    let started = std::time::Instant::now();
    let record = state
        .ledger
        .wrap(
            &caller.user_address,
            &request.provider,
            request.credit_amount,
            &request.proof,
        )
        .map_err(|err| {
            state.metrics.rejections_total.inc();
            ApiFailure::from(err)
        })?;
    state
        .metrics
        .operation_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    state.metrics.wraps_total.inc();
    state
        .metrics
        .tokens_wrapped_total
        .inc_by(record.tokens_issued.to_decimal());

    let message = format!(
        "Successfully wrapped {} {} credits into {} {} tokens",
        record.credit_amount, record.provider, record.tokens_issued, TOKEN_SYMBOL,
    );
    Ok(Json(WrapCreditsResponse {
        transaction_hash: record.transaction_hash,
        tokens_issued: record.tokens_issued.to_decimal(),
        message,
    }))
}

/// `GET /api/tokens/balance/:address` — balance plus wrap history.
/// Unknown addresses answer with a zero balance, never an error.
async fn balance_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<TokenBalanceResponse>, ApiFailure> {
    let summary = state.ledger.get_balance(&address)?;
    let wrapped_credits = summary
        .wrapped_credits
        .iter()
        .map(|record| WrappedCreditInfo {
            provider: record.provider.clone(),
            credit_amount: record.credit_amount.to_decimal(),
            tokens_issued: record.tokens_issued.to_decimal(),
            transaction_hash: record.transaction_hash.clone(),
            created_at: record.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(TokenBalanceResponse {
        user_address: summary.user_address,
        total_balance: summary.total_balance.to_decimal(),
        wrapped_credits,
    }))
}

/// `POST /api/carbon/retire?user_address=0x...` — burn tokens and
/// purchase the corresponding carbon offset.
async fn retire_handler(
    State(state): State<AppState>,
    Query(caller): Query<CallerQuery>,
    Json(request): Json<RetireTokensRequest>,
) -> Result<Json<CarbonOffsetResponse>, ApiFailure> {
    let started = std::time::Instant::now();
    let record = state
        .engine
        .retire(&caller.user_address, request.token_amount, &request.reason)
        .map_err(|err| {
            state.metrics.rejections_total.inc();
            ApiFailure::from(err)
        })?;
    state
        .metrics
        .operation_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    state.metrics.retirements_total.inc();
    state
        .metrics
        .tokens_retired_total
        .inc_by(record.tokens_retired.to_decimal());
    state
        .metrics
        .carbon_tons_total
        .inc_by(record.carbon_credits_purchased.to_decimal());

    let message = format!(
        "Successfully retired {} {} tokens and purchased {} tons CO2 offset",
        record.tokens_retired, TOKEN_SYMBOL, record.carbon_credits_purchased,
    );
    Ok(Json(CarbonOffsetResponse {
        transaction_hash: record.transaction_hash,
        tokens_retired: record.tokens_retired.to_decimal(),
        carbon_credits_purchased: record.carbon_credits_purchased.to_decimal(),
        offset_provider: record.offset_provider,
        certificate_id: record.certificate_id,
        message,
    }))
}

/// `GET /api/carbon/history/:address` — retirement history, newest first.
async fn history_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<OffsetInfo>>, ApiFailure> {
    let mut history = state.engine.get_history(&address)?;
    history.reverse();
    Ok(Json(history.iter().map(OffsetInfo::from).collect()))
}

/// `GET /api/carbon/stats` — platform-wide offset statistics.
async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<verdant_ledger::CarbonStats>, ApiFailure> {
    Ok(Json(state.engine.stats()?))
}

/// `GET /api/carbon/certificate/:id` — certificate lookup. 404 when the
/// certificate id was never issued.
async fn certificate_handler(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateResponse>, ApiFailure> {
    let record = state.engine.certificate(&certificate_id)?;
    Ok(Json(CertificateResponse {
        verification_url: format!(
            "https://registry.goldstandard.org/projects/{}",
            record.certificate_id
        ),
        certificate_id: record.certificate_id,
        user_address: record.user_address,
        tokens_retired: record.tokens_retired.to_decimal(),
        carbon_credits_purchased: record.carbon_credits_purchased.to_decimal(),
        offset_provider: record.offset_provider,
        transaction_hash: record.transaction_hash,
        reason: record.reason,
        offset_rate: OFFSET_RATE_TONS_PER_TOKEN,
        created_at: record.created_at.to_rfc3339(),
        status: "verified".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
