//! Field-level request validation.
//!
//! Request structs declare their shape rules with `#[derive(Validate)]`.
//! Handlers collect those failures, plus the label and number parsing that
//! `validator` cannot express, into [`FieldErrors`] and turn a non-empty
//! collection into `AppError::InvalidFields`, which renders as a 400 with a
//! `details` list.

use axum::extract::{FromRequest, FromRequestParts};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// JSON body extractor whose rejections render as `AppError` (400) instead of
/// axum's plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor with JSON error bodies.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameter extractor with JSON error bodies.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Records `message` against `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Starts a collection from the derived `validator` rules of `input`.
    pub fn validated<T: Validate>(input: &T) -> Self {
        let mut errors = Self::new();
        if let Err(failures) = input.validate() {
            errors.record(&failures);
        }
        errors
    }

    /// Appends `validator` failures under camelCase field names, ordered by
    /// field.
    pub fn record(&mut self, failures: &ValidationErrors) {
        let mut fields: Vec<_> = failures.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        for (field, list) in fields {
            let field = camel_case(&field);
            for failure in list.iter() {
                let message = match &failure.message {
                    Some(message) => message.to_string(),
                    None => failure.code.to_string(),
                };
                self.push(&field, &message);
            }
        }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.errors))
        }
    }
}

/// Parses a wire label ("full-time", "senior", "USD") into one of the
/// serde-renamed model enums.
pub fn parse_label<T: DeserializeOwned>(label: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(label.trim().to_string())).ok()
}

/// Accepts JSON numbers and numeric strings, like form inputs send them.
pub fn as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Lowercases and trims an email for storage and lookup.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// `0x` followed by exactly `hex_len` hex digits.
pub fn is_prefixed_hex(value: &str, hex_len: usize) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == hex_len && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

pub fn is_eth_address(value: &str) -> bool {
    is_prefixed_hex(value, 40)
}

pub fn is_tx_hash(value: &str) -> bool {
    is_prefixed_hex(value, 64)
}

/// `confirm_password` -> `confirmPassword`, matching the wire names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Trims every entry, drops blanks and exact duplicates, keeps first-seen order.
pub fn clean_string_list(values: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !cleaned.iter().any(|v| v == value) {
            cleaned.push(value.to_string());
        }
    }
    cleaned
}
