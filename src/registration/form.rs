//! Registration form state: the client tier of the pipeline.
//!
//! The form sanitizes each value as it is entered, validates the whole
//! submission before anything leaves the client, and tracks the
//! editing / submitting / success presentation state. The bot-verification
//! widget and the HTTP transport are injected so the form does not depend on
//! a particular vendor SDK or HTTP stack.

use super::error::ValidationError;
use super::rules;
use super::sanitize::sanitize_token;
use super::submission::{Field, RegistrationSubmission, TOKEN_KEY};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const FALLBACK_SERVER_ERROR: &str = "Registration failed";
const TRANSPORT_ERROR: &str = "An error occurred. Please try again.";
const WIDGET_ERROR: &str = "Security verification failed. Please try again.";

/// Source of bot-verification tokens (the challenge widget).
#[async_trait]
pub trait VerificationWidget: Send + Sync {
    /// Run the challenge and return the token it issues.
    async fn obtain_token(&self) -> Result<String>;
}

/// Raw reply from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a serialized registration to the gateway.
#[async_trait]
pub trait RegistrationTransport: Send + Sync {
    async fn post_registration(&self, body: &Value) -> Result<TransportResponse>;
}

/// `RegistrationTransport` over HTTP, posting JSON to `<base>/api/register`.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(gateway_base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/register", gateway_base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl RegistrationTransport for HttpTransport {
    async fn post_registration(&self, body: &Value) -> Result<TransportResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .context("Failed to send registration to gateway")?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Editing,
    Submitting,
    /// Terminal: the form accepts no further input.
    Success,
}

/// What `begin_submit` decided.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStep {
    /// Validation passed; send this body.
    Send(Value),
    /// A rule failed; nothing is sent.
    Blocked(ValidationError),
    /// A submission is already in flight or the form already succeeded.
    Ignored,
}

/// End result of `submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Registered,
    Invalid(ValidationError),
    Failed(String),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    data: RegistrationSubmission,
    token: String,
    status: FormStatus,
    error: Option<String>,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self {
            data: RegistrationSubmission::default(),
            token: String::new(),
            status: FormStatus::Editing,
            error: None,
        }
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    /// The single visible error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn value(&self, field: Field) -> &str {
        self.data.get(field)
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    fn is_locked(&self) -> bool {
        self.status != FormStatus::Editing
    }

    // ==================== Input ====================

    /// Store a field value after running it through the field's sanitizer.
    pub fn set_field(&mut self, field: Field, raw: &str) {
        if self.is_locked() {
            return;
        }
        *self.data.get_mut(field) = field.class().sanitize(raw);
    }

    pub fn set_consent_datastore(&mut self, checked: bool) {
        if !self.is_locked() {
            self.data.consent_datastore = checked;
        }
    }

    pub fn set_consent_marketing(&mut self, checked: bool) {
        if !self.is_locked() {
            self.data.consent_marketing = checked;
        }
    }

    /// Pick one of the suggested dojos.
    pub fn select_dojo(&mut self, dojo: &str) {
        self.set_field(Field::Dojo, dojo);
    }

    /// Known dojos matching what has been typed into the dojo field so far.
    pub fn dojo_suggestions(&self) -> Vec<&'static str> {
        rules::matching_dojos(&self.data.dojo)
    }

    /// Store a token handed over by the challenge widget.
    pub fn set_token(&mut self, token: &str) {
        if !self.is_locked() {
            self.token = sanitize_token(token);
        }
    }

    /// Ask the widget for a fresh token.
    ///
    /// On failure the stored token is cleared and the error is shown.
    pub async fn request_verification<W>(&mut self, widget: &W) -> Result<()>
    where
        W: VerificationWidget + ?Sized,
    {
        if self.is_locked() {
            return Ok(());
        }

        match widget.obtain_token().await {
            Ok(token) => {
                self.set_token(&token);
                Ok(())
            }
            Err(e) => {
                warn!("Verification widget failed: {:#}", e);
                self.token.clear();
                self.error = Some(WIDGET_ERROR.to_string());
                Err(e)
            }
        }
    }

    // ==================== Validation ====================

    /// Validate everything the gateway will validate, plus the presence of
    /// a verification token.
    ///
    /// Order: lengths, sanitization check, required fields (including the
    /// token), formats, rank, password policy.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        self.data.check_lengths()?;
        self.data.check_sanitized()?;
        self.data.check_required()?;
        if sanitize_token(&self.token).is_empty() {
            return Err(ValidationError::SecurityChallengeRequired);
        }
        self.data.check_formats(today)?;
        self.data.check_rank()?;
        self.data.check_password()
    }

    /// JSON body sent to the gateway: the sanitized fields plus the token.
    pub fn payload(&self) -> Value {
        let mut body = serde_json::to_value(self.data.sanitized())
            .unwrap_or_else(|_| Value::Object(Default::default()));
        if let Some(object) = body.as_object_mut() {
            object.insert(TOKEN_KEY.to_string(), Value::String(sanitize_token(&self.token)));
        }
        body
    }

    // ==================== Submission ====================

    /// First half of a submission: validate and, when valid, move to
    /// `Submitting` and hand back the body to send.
    pub fn begin_submit(&mut self, today: NaiveDate) -> SubmitStep {
        if self.is_locked() {
            debug!("Submission ignored, form status is {:?}", self.status);
            return SubmitStep::Ignored;
        }

        self.error = None;
        if let Err(e) = self.validate(today) {
            self.error = Some(e.to_string());
            return SubmitStep::Blocked(e);
        }

        self.status = FormStatus::Submitting;
        SubmitStep::Send(self.payload())
    }

    /// Second half of a submission: apply the gateway's answer.
    pub fn finish_submit(&mut self, result: Result<TransportResponse>) -> SubmitOutcome {
        if self.status != FormStatus::Submitting {
            return SubmitOutcome::Ignored;
        }

        match result {
            Ok(response) if response.is_success() => {
                self.status = FormStatus::Success;
                SubmitOutcome::Registered
            }
            Ok(response) => {
                let message = server_error_message(&response.body);
                debug!("Gateway rejected registration ({}): {}", response.status, message);
                self.status = FormStatus::Editing;
                self.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
            Err(e) => {
                warn!("Registration request failed: {:#}", e);
                self.status = FormStatus::Editing;
                self.error = Some(TRANSPORT_ERROR.to_string());
                SubmitOutcome::Failed(TRANSPORT_ERROR.to_string())
            }
        }
    }

    /// Validate and send the registration through `transport`.
    pub async fn submit<T>(&mut self, transport: &T, today: NaiveDate) -> SubmitOutcome
    where
        T: RegistrationTransport + ?Sized,
    {
        let body = match self.begin_submit(today) {
            SubmitStep::Send(body) => body,
            SubmitStep::Blocked(e) => return SubmitOutcome::Invalid(e),
            SubmitStep::Ignored => return SubmitOutcome::Ignored,
        };

        let result = transport.post_registration(&body).await;
        self.finish_submit(result)
    }
}

/// Pull `error` out of a gateway error body.
fn server_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_SERVER_ERROR.to_string())
}
