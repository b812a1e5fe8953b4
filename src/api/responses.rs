//! Backend response normalization
//!
//! The backend is not consistent about its payloads: some endpoints wrap the
//! result in `{ data: ... }`, errors arrive as `{ message }`, `{ error }`,
//! `{ error: { message } }` or with an `errors` list or map. Everything is
//! folded here into a few closed types so callers match on variants instead
//! of probing JSON fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::{CreatedUser, EmailDelivery, User};

// ============================================================================
// Mutation outcome
// ============================================================================

/// Result of a write endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    Success(T),
    /// The input was rejected; field errors are shown inline
    ValidationFailure {
        message: String,
        fields: Vec<FieldError>,
    },
    /// A unique value (usually the serial number or username) is taken
    DuplicateFailure {
        message: String,
        field: Option<String>,
    },
    GenericFailure { status: u16, message: String },
}

impl<T> MutationOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationOutcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            MutationOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Message to show for a failure
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            MutationOutcome::Success(_) => None,
            MutationOutcome::ValidationFailure { message, .. }
            | MutationOutcome::DuplicateFailure { message, .. }
            | MutationOutcome::GenericFailure { message, .. } => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MutationOutcome<U> {
        match self.try_map(|value| Ok::<U, std::convert::Infallible>(f(value))) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Convert the success value, failing if the conversion fails
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<MutationOutcome<U>, E> {
        Ok(match self {
            MutationOutcome::Success(value) => MutationOutcome::Success(f(value)?),
            MutationOutcome::ValidationFailure { message, fields } => {
                MutationOutcome::ValidationFailure { message, fields }
            }
            MutationOutcome::DuplicateFailure { message, field } => {
                MutationOutcome::DuplicateFailure { message, field }
            }
            MutationOutcome::GenericFailure { status, message } => {
                MutationOutcome::GenericFailure { status, message }
            }
        })
    }
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Option<String>,
    pub message: String,
}

/// Fold a failed write response into an outcome
pub fn normalize_failure<T>(status: u16, body: &JsonValue) -> MutationOutcome<T> {
    let message = error_message(body).unwrap_or_else(|| default_message(status));
    let code = error_code(body);

    let duplicate = status == 409
        || code.as_deref().is_some_and(|c| c.contains("DUPLICATE"))
        || looks_like_duplicate(&message);
    if duplicate {
        return MutationOutcome::DuplicateFailure {
            field: body
                .get("field")
                .and_then(JsonValue::as_str)
                .map(String::from)
                .or_else(|| duplicate_field_hint(&message)),
            message,
        };
    }

    let fields = field_errors(body);
    let validation = matches!(status, 400 | 422)
        || !fields.is_empty()
        || code.as_deref().is_some_and(|c| c.contains("VALIDATION"));
    if validation {
        return MutationOutcome::ValidationFailure { message, fields };
    }

    MutationOutcome::GenericFailure { status, message }
}

fn looks_like_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["already exists", "duplicate", "sudah ada", "sudah terdaftar", "sudah digunakan"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn duplicate_field_hint(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    if lower.contains("serial") {
        Some("serialNumber".to_string())
    } else if lower.contains("username") {
        Some("username".to_string())
    } else if lower.contains("email") {
        Some("email".to_string())
    } else {
        None
    }
}

// ============================================================================
// Error body probing
// ============================================================================

/// Best human-readable message in an error body
pub fn error_message(body: &JsonValue) -> Option<String> {
    let candidates = [
        body.get("message"),
        body.get("error"),
        body.pointer("/error/message"),
        body.get("msg"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(JsonValue::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| body.as_str().map(String::from).filter(|s| !s.trim().is_empty()))
}

fn error_code(body: &JsonValue) -> Option<String> {
    body.get("code")
        .or_else(|| body.pointer("/error/code"))
        .and_then(JsonValue::as_str)
        .map(str::to_uppercase)
}

/// Field errors from an `errors` list or map
pub fn field_errors(body: &JsonValue) -> Vec<FieldError> {
    let Some(errors) = body.get("errors").or_else(|| body.pointer("/error/details")) else {
        return Vec::new();
    };

    match errors {
        JsonValue::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                JsonValue::String(message) => Some(FieldError {
                    field: None,
                    message: message.clone(),
                }),
                JsonValue::Object(_) => {
                    let message = entry
                        .get("message")
                        .or_else(|| entry.get("msg"))
                        .and_then(JsonValue::as_str)?;
                    let field = entry
                        .get("field")
                        .or_else(|| entry.get("path"))
                        .or_else(|| entry.get("param"))
                        .and_then(JsonValue::as_str)
                        .map(String::from);
                    Some(FieldError {
                        field,
                        message: message.to_string(),
                    })
                }
                _ => None,
            })
            .collect(),
        JsonValue::Object(map) => map
            .iter()
            .filter_map(|(field, message)| {
                let message = message
                    .as_str()
                    .map(String::from)
                    .or_else(|| message.get(0).and_then(JsonValue::as_str).map(String::from))?;
                Some(FieldError {
                    field: Some(field.clone()),
                    message,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn default_message(status: u16) -> String {
    match status {
        400 => "Bad request".to_string(),
        404 => "Not found".to_string(),
        409 => "Conflict".to_string(),
        422 => "Invalid input".to_string(),
        500..=599 => "Server error".to_string(),
        _ => format!("Request failed with status {status}"),
    }
}

// ============================================================================
// Success payloads
// ============================================================================

/// Decode a success body, unwrapping a `{ data: ... }` envelope if present
pub fn extract_payload<T: DeserializeOwned>(body: JsonValue) -> Result<T, serde_json::Error> {
    match serde_json::from_value::<T>(body.clone()) {
        Ok(value) => Ok(value),
        Err(direct) => match body {
            JsonValue::Object(mut map) if map.contains_key("data") => {
                let data = map.remove("data").unwrap_or(JsonValue::Null);
                serde_json::from_value(data)
            }
            _ => Err(direct),
        },
    }
}

/// Body of `POST /auth/refresh`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Body of a plain acknowledgement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Read a user-creation body: the user plus the welcome e-mail result
pub fn created_user(body: JsonValue, email_requested: bool) -> Result<CreatedUser, serde_json::Error> {
    let email = if !email_requested {
        EmailDelivery::NotRequested
    } else if body.get("emailSent").and_then(JsonValue::as_bool) == Some(true) {
        EmailDelivery::Sent
    } else {
        let reason = body
            .get("emailError")
            .and_then(JsonValue::as_str)
            .unwrap_or("welcome e-mail was not sent");
        EmailDelivery::Failed(reason.to_string())
    };

    let user: User = match body.get("user") {
        Some(user) => serde_json::from_value(user.clone())?,
        None => extract_payload(body)?,
    };
    Ok(CreatedUser { user, email })
}
