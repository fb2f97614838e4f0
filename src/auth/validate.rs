use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, FieldError};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "Invalid email format"));
    }
}

fn check_password(password: &str, field: &'static str, errors: &mut Vec<FieldError>) {
    if password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            field,
            "Password must be at least 8 characters",
        ));
    }
}

/// Field checks for signup. The caller has already trimmed the username and
/// lowercased the email.
pub fn validate_signup(
    username: &str,
    phone: &str,
    email: &str,
    password: &str,
) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if username.len() < 3 || username.len() > 50 {
        errors.push(FieldError::new(
            "username",
            "Username must be between 3 and 50 characters",
        ));
    }
    if !PHONE_RE.is_match(phone) {
        errors.push(FieldError::new("phone", "Phone number must be 10 digits"));
    }
    check_email(email, &mut errors);
    check_password(password, "password", &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_email(email, &mut errors);
    check_password(password, "password", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn validate_forgot_password(email: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else {
        check_email(email, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn validate_reset_password(token: &str, new_password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if token.is_empty() {
        errors.push(FieldError::new("token", "Reset token is required"));
    }
    check_password(new_password, "newPassword", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}
