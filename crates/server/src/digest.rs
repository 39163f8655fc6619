//! Cron-triggered maintenance digest endpoints.
//!
//! - `GET  /api/cron/maintenance-digest` runs a preview (no sends, no writes)
//! - `POST /api/cron/maintenance-digest` sends digests and commits the ledger
//!
//! Both require `Authorization: Bearer <digest.cron_secret>`. Without a
//! configured secret every request is rejected.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use fleetpulse_core::config::DigestConfig;
use fleetpulse_core::errors::{ApplicationError, InterfaceError};
use fleetpulse_core::notifications::ports::Mailer;
use fleetpulse_core::notifications::{DigestEngine, ExecuteReport, PreviewReport};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DIGEST_ROUTE: &str = "/api/cron/maintenance-digest";

#[derive(Clone)]
pub struct DigestState {
    engine: Arc<DigestEngine>,
    config: DigestConfig,
    mailer: Result<Arc<dyn Mailer>, ApplicationError>,
}

impl DigestState {
    /// `mailer` carries the transport selection result so a misconfigured
    /// transport only fails the requests that need it.
    pub fn new(
        engine: Arc<DigestEngine>,
        config: DigestConfig,
        mailer: Result<Arc<dyn Mailer>, ApplicationError>,
    ) -> Self {
        Self { engine, config, mailer }
    }
}

pub fn router(state: DigestState) -> Router {
    Router::new().route(DIGEST_ROUTE, get(preview_digest).post(execute_digest)).with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiErrorBody {
            error: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn preview_digest(
    State(state): State<DigestState>,
    headers: HeaderMap,
) -> Result<Json<PreviewReport>, ApiError> {
    let correlation_id = request_id();
    authorize(&headers, &state.config, &correlation_id)?;

    let report = state
        .engine
        .preview(Utc::now())
        .await
        .map_err(|error| run_failed(error, "preview", &correlation_id))?;
    Ok(Json(report))
}

async fn execute_digest(
    State(state): State<DigestState>,
    headers: HeaderMap,
) -> Result<Json<ExecuteReport>, ApiError> {
    let correlation_id = request_id();
    authorize(&headers, &state.config, &correlation_id)?;

    let mailer = state
        .mailer
        .clone()
        .map_err(|error| run_failed(error, "execute", &correlation_id))?;

    let report = state
        .engine
        .execute(mailer.as_ref(), Utc::now())
        .await
        .map_err(|error| run_failed(error, "execute", &correlation_id))?;

    info!(
        event_name = "digest.http.execute_complete",
        correlation_id = %correlation_id,
        sent = report.sent,
        failed = report.failed,
        skipped_users = report.skipped_users,
        "digest execute request complete"
    );
    Ok(Json(report))
}

fn authorize(
    headers: &HeaderMap,
    config: &DigestConfig,
    correlation_id: &str,
) -> Result<(), ApiError> {
    let Some(secret) = config.cron_secret() else {
        warn!(
            event_name = "digest.auth.rejected",
            correlation_id = %correlation_id,
            reason = "secret_not_configured",
            "digest request rejected: no cron secret configured"
        );
        return Err(ApiError(InterfaceError::unauthorized(
            "cron secret not configured",
            correlation_id,
        )));
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let accepted = provided
        .map(|token| bool::from(token.as_bytes().ct_eq(secret.as_bytes())))
        .unwrap_or(false);

    if !accepted {
        warn!(
            event_name = "digest.auth.rejected",
            correlation_id = %correlation_id,
            reason = if provided.is_some() { "token_mismatch" } else { "missing_bearer_token" },
            "digest request rejected"
        );
        return Err(ApiError(InterfaceError::unauthorized("invalid bearer token", correlation_id)));
    }
    Ok(())
}

fn run_failed(error: ApplicationError, operation: &'static str, correlation_id: &str) -> ApiError {
    error!(
        event_name = "digest.http.run_failed",
        correlation_id = %correlation_id,
        operation,
        error = %error,
        "digest run aborted"
    );
    ApiError(error.into_interface(correlation_id))
}

fn request_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}
