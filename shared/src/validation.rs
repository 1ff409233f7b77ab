//! Input validation functions
//!
//! Presence checks mirror what clients see in the error body, so the
//! messages here are part of the API.

use crate::errors::ValidationError;
use std::sync::OnceLock;

/// Maximum accepted email length
pub const MAX_EMAIL_LEN: usize = 255;

/// Maximum accepted password length
pub const MAX_PASSWORD_LEN: usize = 128;

const CREDENTIALS_REQUIRED: &str = "Email and password are required";
const NOTE_FIELDS_REQUIRED: &str = "Title and body are required";

/// Email and password pulled out of a register/login body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Title and body pulled out of a create-note body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub title: String,
    pub body: String,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Require both credentials to be present and non-empty
///
/// The values are returned exactly as supplied; email comparison downstream
/// is exact.
pub fn require_credentials(
    email: Option<&str>,
    password: Option<&str>,
) -> Result<Credentials, ValidationError> {
    match (present(email), present(password)) {
        (Some(email), Some(password)) => Ok(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }),
        _ => Err(ValidationError::MissingFields(CREDENTIALS_REQUIRED)),
    }
}

/// Require both note fields to be present and non-empty
pub fn require_note_fields(
    title: Option<&str>,
    body: Option<&str>,
) -> Result<NoteFields, ValidationError> {
    match (present(title), present(body)) {
        (Some(title), Some(body)) => Ok(NoteFields {
            title: title.to_string(),
            body: body.to_string(),
        }),
        _ => Err(ValidationError::MissingFields(NOTE_FIELDS_REQUIRED)),
    }
}

fn email_regex() -> &'static regex_lite::Regex {
    static EMAIL: OnceLock<regex_lite::Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        regex_lite::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::Invalid("Email too long".to_string()));
    }
    if !email_regex().is_match(email) {
        return Err(ValidationError::Invalid("Invalid email format".to_string()));
    }
    Ok(())
}

/// Validate password length
///
/// There is no minimum beyond presence.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::Invalid("Password too long".to_string()));
    }
    Ok(())
}
