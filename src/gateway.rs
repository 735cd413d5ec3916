//! The registration gateway: re-validates what the form sent, checks the
//! bot-verification token and forwards a whitelisted payload upstream.
//!
//! Each request moves through
//! `Received → TokenValidated → FieldsValidated → Forwarded → Relayed`; any
//! failure short-circuits into a `GatewayError` response.

use crate::config::Config;
use crate::registration::{
    rules, sanitize::sanitize_token, RegistrationSubmission, ValidationError, TOKEN_KEY,
};
use crate::{turnstile, upstream};
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Why a registration request did not reach the upstream API, or failed
/// after it.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Internal server configuration error")]
    Configuration,

    #[error("Security verification required")]
    VerificationRequired,

    #[error("Security verification failed. Please try again.")]
    VerificationFailed,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The cause is logged, never sent to the caller.
    #[error("An unexpected error occurred during registration.")]
    Unexpected(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Configuration | GatewayError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::VerificationRequired
            | GatewayError::VerificationFailed
            | GatewayError::Invalid(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::Unexpected(cause) = &self {
            error!("Registration proxy error: {:#}", cause);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shared, read-only state for every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(register))
        .route("/api/register/config", get(register_config))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Public settings the form needs to render the challenge widget.
async fn register_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "site_key": state.config.turnstile_site_key }))
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), GatewayError> {
    // Fail closed before touching anything external.
    let Some(upstream_url) = state.config.upstream_api_url.as_deref() else {
        error!("BE_API_URL not configured, rejecting registration");
        return Err(GatewayError::Configuration);
    };

    let body: Value =
        serde_json::from_slice(&body).context("Registration body is not valid JSON")?;

    let token = body
        .get(TOKEN_KEY)
        .and_then(Value::as_str)
        .map(sanitize_token)
        .filter(|token| !token.is_empty())
        .ok_or(GatewayError::VerificationRequired)?;

    turnstile::verify_token(&state.http, &state.config, &token)
        .await
        .map_err(|e| {
            warn!("Bot verification failed: {:#}", e);
            GatewayError::VerificationFailed
        })?;

    let submission = RegistrationSubmission::from_untrusted(&body);
    if let Err(e) = submission.validate(rules::today()) {
        info!("Registration rejected: {}", e);
        return Err(e.into());
    }

    let payload = submission.to_upstream(&token);
    let reply = upstream::forward_registration(&state.http, upstream_url, &payload).await?;
    info!("Registration forwarded, upstream answered {}", reply.status);

    let status = StatusCode::from_u16(reply.status)
        .with_context(|| format!("Upstream returned invalid status {}", reply.status))?;
    Ok((status, Json(reply.body)))
}
