use super::submission::Field;
use thiserror::Error;

/// A broken registration rule.
///
/// The `Display` text is the message shown to the member, on the form or in
/// the gateway's `{"error": ...}` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Full name is required")]
    NameRequired,

    #[error("WhatsApp number is required")]
    WhatsappRequired,

    #[error("Password is required")]
    PasswordRequired,

    #[error("You must consent to data storage to register")]
    ConsentRequired,

    #[error("Please complete the security challenge")]
    SecurityChallengeRequired,

    #[error("{}", .0.too_long_message())]
    TooLong(Field),

    #[error("Invalid characters detected. Please remove special characters.")]
    InvalidCharacters,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid WhatsApp number (e.g. 0812...)")]
    InvalidWhatsapp,

    #[error("Please enter a valid emergency contact number")]
    InvalidEmergencyContactNumber,

    #[error("Please enter a valid date of birth")]
    InvalidDateOfBirth,

    #[error("Please enter a valid last grading date")]
    InvalidLastGradingDate,

    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Please select a valid rank")]
    InvalidRank,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_form_copy() {
        assert_eq!(ValidationError::NameRequired.to_string(), "Full name is required");
        assert_eq!(ValidationError::PasswordMismatch.to_string(), "Passwords do not match");
        assert!(ValidationError::InvalidWhatsapp
            .to_string()
            .starts_with("Please enter a valid WhatsApp number"));
    }

    #[test]
    fn test_too_long_message_names_the_field() {
        assert_eq!(
            ValidationError::TooLong(Field::Name).to_string(),
            "Name is too long (max 100 characters)"
        );
        assert_eq!(
            ValidationError::TooLong(Field::Whatsapp).to_string(),
            "WhatsApp number is too long"
        );
        assert_eq!(
            ValidationError::TooLong(Field::MedicalConditions).to_string(),
            "Medical conditions text is too long (max 500 characters)"
        );
    }
}
