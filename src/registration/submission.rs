//! The registration submission and the checks run against it.

use super::error::ValidationError;
use super::rules::{self, char_len, MIN_PASSWORD_LEN};
use super::sanitize::FieldClass;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Wire key of the bot-verification token in the form's request body.
pub const TOKEN_KEY: &str = "cf-turnstile-response";

/// The string fields of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Whatsapp,
    DateOfBirth,
    Password,
    PasswordConfirm,
    Dojo,
    Rank,
    LastGradingDate,
    EmergencyContactName,
    EmergencyContactNumber,
    MedicalConditions,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Name,
        Field::Email,
        Field::Whatsapp,
        Field::DateOfBirth,
        Field::Password,
        Field::PasswordConfirm,
        Field::Dojo,
        Field::Rank,
        Field::LastGradingDate,
        Field::EmergencyContactName,
        Field::EmergencyContactNumber,
        Field::MedicalConditions,
    ];

    /// Length-limited fields in the order their limits are checked.
    pub const LENGTH_CHECKED: [Field; 8] = [
        Field::Name,
        Field::Email,
        Field::Whatsapp,
        Field::Password,
        Field::EmergencyContactName,
        Field::EmergencyContactNumber,
        Field::MedicalConditions,
        Field::Dojo,
    ];

    /// JSON key used on the wire.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Whatsapp => "whatsapp",
            Field::DateOfBirth => "date_of_birth",
            Field::Password => "password",
            Field::PasswordConfirm => "password_confirm",
            Field::Dojo => "dojo",
            Field::Rank => "rank",
            Field::LastGradingDate => "last_grading_date",
            Field::EmergencyContactName => "emergency_contact_name",
            Field::EmergencyContactNumber => "emergency_contact_number",
            Field::MedicalConditions => "medical_conditions",
        }
    }

    pub fn class(self) -> FieldClass {
        match self {
            Field::Whatsapp | Field::EmergencyContactNumber => FieldClass::Phone,
            Field::DateOfBirth | Field::LastGradingDate => FieldClass::Date,
            Field::Password | Field::PasswordConfirm => FieldClass::Password,
            Field::Name
            | Field::Email
            | Field::Dojo
            | Field::Rank
            | Field::EmergencyContactName
            | Field::MedicalConditions => FieldClass::Text,
        }
    }

    /// Maximum length in characters, if the field has one.
    pub fn max_len(self) -> Option<usize> {
        match self {
            Field::Name | Field::Email | Field::Dojo | Field::EmergencyContactName => Some(100),
            Field::Whatsapp | Field::EmergencyContactNumber => Some(20),
            Field::Password => Some(128),
            Field::MedicalConditions => Some(500),
            Field::DateOfBirth
            | Field::PasswordConfirm
            | Field::Rank
            | Field::LastGradingDate => None,
        }
    }

    pub fn too_long_message(self) -> &'static str {
        match self {
            Field::Name => "Name is too long (max 100 characters)",
            Field::Email => "Email is too long (max 100 characters)",
            Field::Whatsapp => "WhatsApp number is too long",
            Field::Password => "Password is too long (max 128 characters)",
            Field::EmergencyContactName => {
                "Emergency contact name is too long (max 100 characters)"
            }
            Field::EmergencyContactNumber => "Emergency contact number is too long",
            Field::MedicalConditions => "Medical conditions text is too long (max 500 characters)",
            Field::Dojo => "Dojo name is too long (max 100 characters)",
            Field::DateOfBirth
            | Field::PasswordConfirm
            | Field::Rank
            | Field::LastGradingDate => "Value is too long",
        }
    }
}

/// One member registration as entered on the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationSubmission {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub date_of_birth: String,
    pub password: String,
    pub password_confirm: String,
    pub dojo: String,
    pub rank: String,
    pub last_grading_date: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub medical_conditions: String,
    pub consent_datastore: bool,
    pub consent_marketing: bool,
}

impl RegistrationSubmission {
    /// Build a sanitized submission from an untrusted JSON body.
    ///
    /// Unknown keys are ignored, non-string values count as empty and the
    /// consent flags are only set by a JSON `true`.
    pub fn from_untrusted(body: &Value) -> Self {
        let mut submission = Self::default();
        for field in Field::ALL {
            let raw = body.get(field.key()).and_then(Value::as_str).unwrap_or("");
            *submission.get_mut(field) = field.class().sanitize(raw);
        }
        submission.consent_datastore = body.get("consent_datastore") == Some(&Value::Bool(true));
        submission.consent_marketing = body.get("consent_marketing") == Some(&Value::Bool(true));
        submission
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Whatsapp => &self.whatsapp,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Password => &self.password,
            Field::PasswordConfirm => &self.password_confirm,
            Field::Dojo => &self.dojo,
            Field::Rank => &self.rank,
            Field::LastGradingDate => &self.last_grading_date,
            Field::EmergencyContactName => &self.emergency_contact_name,
            Field::EmergencyContactNumber => &self.emergency_contact_number,
            Field::MedicalConditions => &self.medical_conditions,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Whatsapp => &mut self.whatsapp,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Password => &mut self.password,
            Field::PasswordConfirm => &mut self.password_confirm,
            Field::Dojo => &mut self.dojo,
            Field::Rank => &mut self.rank,
            Field::LastGradingDate => &mut self.last_grading_date,
            Field::EmergencyContactName => &mut self.emergency_contact_name,
            Field::EmergencyContactNumber => &mut self.emergency_contact_number,
            Field::MedicalConditions => &mut self.medical_conditions,
        }
    }

    /// Copy of the submission with every field passed through its sanitizer.
    pub fn sanitized(&self) -> Self {
        let mut clean = self.clone();
        for field in Field::ALL {
            let value = field.class().sanitize(self.get(field));
            *clean.get_mut(field) = value;
        }
        clean
    }

    // ==================== Individual Checks ====================

    pub fn check_required(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if self.whatsapp.trim().is_empty() {
            return Err(ValidationError::WhatsappRequired);
        }
        if self.password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        if !self.consent_datastore {
            return Err(ValidationError::ConsentRequired);
        }
        Ok(())
    }

    pub fn check_lengths(&self) -> Result<(), ValidationError> {
        for field in Field::LENGTH_CHECKED {
            if let Some(max) = field.max_len() {
                if char_len(self.get(field)) > max {
                    return Err(ValidationError::TooLong(field));
                }
            }
        }
        Ok(())
    }

    /// Reject text fields that would change under sanitization.
    pub fn check_sanitized(&self) -> Result<(), ValidationError> {
        let tampered = Field::ALL
            .into_iter()
            .filter(|field| field.class() == FieldClass::Text)
            .any(|field| {
                let value = self.get(field);
                !value.is_empty() && value != field.class().sanitize(value)
            });

        if tampered {
            Err(ValidationError::InvalidCharacters)
        } else {
            Ok(())
        }
    }

    pub fn check_formats(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if !self.email.is_empty() && !rules::is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if !rules::is_valid_phone(&self.whatsapp) {
            return Err(ValidationError::InvalidWhatsapp);
        }
        if !self.emergency_contact_number.is_empty()
            && !rules::is_valid_phone(&self.emergency_contact_number)
        {
            return Err(ValidationError::InvalidEmergencyContactNumber);
        }
        if !rules::is_valid_date(&self.date_of_birth, today) {
            return Err(ValidationError::InvalidDateOfBirth);
        }
        if !rules::is_valid_date(&self.last_grading_date, today) {
            return Err(ValidationError::InvalidLastGradingDate);
        }
        Ok(())
    }

    pub fn check_password(&self) -> Result<(), ValidationError> {
        if char_len(&self.password) < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if self.password != self.password_confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    pub fn check_rank(&self) -> Result<(), ValidationError> {
        if rules::is_valid_rank(&self.rank) {
            Ok(())
        } else {
            Err(ValidationError::InvalidRank)
        }
    }

    /// Full server-side validation; the first broken rule is returned.
    ///
    /// Order: required fields, lengths, formats, password policy, rank.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        self.check_required()?;
        self.check_lengths()?;
        self.check_formats(today)?;
        self.check_password()?;
        self.check_rank()
    }

    /// The whitelisted payload sent to the registration API.
    pub fn to_upstream(&self, turnstile_token: &str) -> UpstreamPayload {
        UpstreamPayload {
            name: self.name.clone(),
            email: self.email.clone(),
            whatsapp: self.whatsapp.clone(),
            date_of_birth: self.date_of_birth.clone(),
            password: self.password.clone(),
            dojo: self.dojo.clone(),
            rank: self.rank.clone(),
            last_grading_date: self.last_grading_date.clone(),
            emergency_contact_name: self.emergency_contact_name.clone(),
            emergency_contact_number: self.emergency_contact_number.clone(),
            medical_conditions: self.medical_conditions.clone(),
            consent_datastore: self.consent_datastore,
            consent_marketing: self.consent_marketing,
            turnstile_token: turnstile_token.to_string(),
        }
    }
}

/// Exactly the fields the upstream registration API receives.
///
/// The password confirmation is consumed by validation and not forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamPayload {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub date_of_birth: String,
    pub password: String,
    pub dojo: String,
    pub rank: String,
    pub last_grading_date: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub medical_conditions: String,
    pub consent_datastore: bool,
    pub consent_marketing: bool,
    pub turnstile_token: String,
}
