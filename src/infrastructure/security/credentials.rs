use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::error::{AppError, Result};

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]{2,49}$").unwrap());

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const MIN_PASSWORD_LEN: usize = 8;

/// Signup fields after case normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCredentials {
    pub username: String,
    pub email: String,
}

/// Trim and lowercase; applied before every store and lookup
pub fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn validate_signup(username: &str, email: &str, password: &str) -> Result<NormalizedCredentials> {
    let username = normalize_identity(username);
    let email = normalize_identity(email);

    if !USERNAME_PATTERN.is_match(&username) {
        return Err(AppError::ValidationError(
            "Username must be 3-50 characters of letters, digits, '.', '_' or '-'".to_string(),
        ));
    }
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(AppError::ValidationError(format!(
            "Invalid email address: {}",
            email
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(NormalizedCredentials { username, email })
}
