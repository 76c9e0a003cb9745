mod cli;
mod payload;

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::core::{
    BalanceInput, Clock, DetectorConfig, ExtremaReport, ForecastError, PayCutoff, TurningPoint,
    WeightForecast, WindowRadius, detect_turning_points, forecast_weight, render_balance_report,
    render_weight_report, simulate_balance,
};

pub use cli::{Cli, Command, run};
pub use payload::{BalancePayload, NumberField, WeightPayload};

/// Process-wide settings built once at startup and shared with every handler.
#[derive(Clone)]
pub struct AppContext {
    pub clock: Arc<dyn Clock>,
    pub cutoff: PayCutoff,
    pub detector: DetectorConfig,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiExtremaReport {
    #[serde(alias = "min")]
    Minima,
    Both,
}

impl From<ApiExtremaReport> for ExtremaReport {
    fn from(value: ApiExtremaReport) -> Self {
        match value {
            ApiExtremaReport::Minima => ExtremaReport::Minima,
            ApiExtremaReport::Both => ExtremaReport::Both,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BalanceQuery {
    format: Option<ReportFormat>,
    radius: Option<u8>,
    report: Option<ApiExtremaReport>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Runs the balance pipeline end to end and returns the detected turning points.
pub fn balance_turning_points(
    ctx: &AppContext,
    input: &BalanceInput,
    detector: DetectorConfig,
) -> Result<Vec<TurningPoint>, ForecastError> {
    let series = simulate_balance(input, ctx.clock.now(), ctx.cutoff)?;
    detect_turning_points(&series, detector)
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/balance", post(balance_handler))
        .route("/api/weight", post(weight_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

pub async fn run_http_server(host: &str, port: u16, ctx: AppContext) -> Result<(), String> {
    let addr = format!("{host}:{port}")
        .parse::<SocketAddr>()
        .map_err(|e| format!("invalid listen address {host}:{port}: {e}"))?;
    let app = router(ctx);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;
    info!("forecast HTTP API listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {e}"))
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn balance_handler(
    State(ctx): State<AppContext>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
    payload: Result<Json<BalancePayload>, JsonRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    let detector = match detector_for_query(ctx.detector, &query) {
        Ok(detector) => detector,
        Err(err) => return forecast_error_response(&err),
    };

    let result = payload::balance_input_from_payload(&payload)
        .and_then(|input| balance_turning_points(&ctx, &input, detector));
    let points = match result {
        Ok(points) => points,
        Err(err) => return forecast_error_response(&err),
    };

    info!(
        turning_points = points.len(),
        radius = detector.radius.days(),
        "balance forecast complete"
    );
    match query.format.unwrap_or_default() {
        ReportFormat::Text => text_response(render_balance_report(&points, detector.report)),
        ReportFormat::Json => json_response(StatusCode::OK, points),
    }
}

async fn weight_handler(payload: Result<Json<WeightPayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    match weight_forecast(&payload) {
        Ok(forecast) => {
            info!(
                points = forecast.model.fitted.len(),
                predictions = forecast.predictions.len(),
                "weight forecast complete"
            );
            text_response(render_weight_report(&forecast))
        }
        Err(err) => forecast_error_response(&err),
    }
}

pub fn weight_forecast(payload: &WeightPayload) -> Result<WeightForecast, ForecastError> {
    let observations = payload::weight_rows_from_payload(payload)?;
    forecast_weight(&observations, payload.forecast.unwrap_or(true))
}

fn detector_for_query(
    defaults: DetectorConfig,
    query: &BalanceQuery,
) -> Result<DetectorConfig, ForecastError> {
    let radius = match query.radius {
        None => defaults.radius,
        Some(2) => WindowRadius::Two,
        Some(3) => WindowRadius::Three,
        Some(other) => {
            return Err(ForecastError::MalformedInput(format!(
                "radius must be 2 or 3, got {other}"
            )));
        }
    };
    let report = query.report.map(Into::into).unwrap_or(defaults.report);
    Ok(DetectorConfig { radius, report })
}

fn status_for(err: &ForecastError) -> StatusCode {
    match err {
        ForecastError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        ForecastError::InsufficientSeries { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ForecastError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn forecast_error_response(err: &ForecastError) -> Response {
    let status = status_for(err);
    warn!(%status, error = %err, "forecast request failed");
    error_response(status, &err.to_string())
}

fn text_response(body: String) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
