//! Member registration: the rules, sanitizers and data model shared by the
//! form validator and the gateway.
//!
//! # Architecture
//!
//! - `rules`: rank and dojo enumerations, length limits, format checks
//! - `sanitize`: per field-class sanitizers (text, phone, date, password, token)
//! - `submission`: the submission itself, its checks and the upstream payload
//! - `form`: client-side form state, validation and submission
//! - `error`: the user-facing validation errors
//!
//! Both tiers validate through `RegistrationSubmission`'s checks; they only
//! differ in the order the checks run.

mod error;
pub mod form;
pub mod rules;
pub mod sanitize;
mod submission;

pub use error::ValidationError;
pub use form::{
    FormStatus, HttpTransport, RegistrationForm, RegistrationTransport, SubmitOutcome, SubmitStep,
    TransportResponse, VerificationWidget,
};
pub use submission::{Field, RegistrationSubmission, UpstreamPayload, TOKEN_KEY};
