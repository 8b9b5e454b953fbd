//! Input validation utilities
//!
//! Each validator returns every problem it finds so callers can report them
//! together.

use regex::Regex;
use std::sync::OnceLock;

fn username_regex() -> &'static Regex {
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Failed to compile username regex")
    })
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$")
            .expect("Failed to compile email regex")
    })
}

/// Validate username
pub fn validate_username(username: Option<&str>) -> Result<(), String> {
    let Some(username) = username.filter(|u| !u.is_empty()) else {
        return Err("Username is required".to_string());
    };

    let trimmed = username.trim();
    let length = trimmed.chars().count();

    if length < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if length > 30 {
        return Err("Username cannot exceed 30 characters".to_string());
    }

    if !username_regex().is_match(trimmed) {
        return Err(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: Option<&str>) -> Result<(), String> {
    let Some(email) = email.filter(|e| !e.is_empty()) else {
        return Err("Email is required".to_string());
    };

    if !email_regex().is_match(email.trim()) {
        return Err("Please provide a valid email address".to_string());
    }

    Ok(())
}

/// Validate a new password
pub fn validate_password(password: Option<&str>) -> Result<(), String> {
    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return Err("Password is required".to_string());
    };

    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_lower && has_upper && has_digit) {
        return Err(
            "Password must contain at least one lowercase letter, one uppercase letter, and one number"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate signup input, collecting every error
pub fn validate_signup(
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Vec<String> {
    [
        validate_username(username),
        validate_email(email),
        validate_password(password),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}

/// Validate login input, collecting every error
pub fn validate_login(email: Option<&str>, password: Option<&str>) -> Vec<String> {
    let mut errors: Vec<String> = validate_email(email).err().into_iter().collect();

    match password {
        None | Some("") => errors.push("Password is required".to_string()),
        Some(p) if p.trim().is_empty() => errors.push("Password cannot be empty".to_string()),
        Some(_) => {}
    }

    errors
}

/// Reduce arbitrary text to the username alphabet, within length bounds
///
/// Used when deriving a username from an identity provider profile. The
/// result is padded to the minimum length and may still collide with an
/// existing account.
pub fn sanitize_username(raw: &str) -> String {
    let mut username: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(30)
        .collect();

    while username.len() < 3 {
        username.push('_');
    }

    username
}
