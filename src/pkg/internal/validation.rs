use std::borrow::Cow;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use validator::ValidationError;

use crate::prelude::{AppError, Result};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("email pattern");
    static ref OBJECT_ID_RE: Regex = Regex::new(r"^[0-9a-fA-F]{24}$").expect("id pattern");
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn is_object_id(id: &str) -> bool {
    OBJECT_ID_RE.is_match(id)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn is_valid_date(value: &str) -> bool {
    parse_date(value).is_some()
}

/// Rejects path identifiers that cannot name a stored record.
pub fn ensure_object_id(id: &str, path: &str) -> Result<()> {
    if is_object_id(id) {
        Ok(())
    } else {
        Err(AppError::invalid_id(path))
    }
}

/// 4-byte big-endian unix timestamp followed by 8 random bytes, hex encoded.
pub fn new_object_id() -> String {
    let ts = (Utc::now().timestamp() as u32).to_be_bytes();
    let tail: [u8; 8] = rand::rng().random();
    ts.iter()
        .chain(tail.iter())
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub(crate) fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub(crate) fn email_format(email: &str) -> core::result::Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(invalid("email", "Please enter a valid email"))
    }
}

pub(crate) fn password_policy(password: &str) -> core::result::Result<(), ValidationError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "Password must be at least 8 characters and contain an uppercase letter, a lowercase letter and a number",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("jane.doe@example.com"));
        assert!(is_valid_email("a-b@mail.co.uk"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@example.company"));
    }

    #[test]
    fn test_password_policy() {
        assert!(is_strong_password("Secret123"));
        assert!(!is_strong_password("Sec123"));
        assert!(!is_strong_password("secret123"));
        assert!(!is_strong_password("SECRET123"));
        assert!(!is_strong_password("SecretPass"));
    }

    #[test]
    fn test_object_id() {
        assert!(is_object_id("507f1f77bcf86cd799439011"));
        assert!(is_object_id("507F1F77BCF86CD799439011"));
        assert!(!is_object_id("507f1f77bcf86cd79943901"));
        assert!(!is_object_id("507f1f77bcf86cd79943901z"));
        assert!(ensure_object_id("nope", "jobId").is_err());
    }

    #[test]
    fn test_new_object_id_matches_pattern() {
        let a = new_object_id();
        let b = new_object_id();
        assert!(is_object_id(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_dates() {
        assert_eq!(parse_date("2026-02-28"), NaiveDate::from_ymd_opt(2026, 2, 28));
        assert!(!is_valid_date("2026-02-30"));
        assert!(!is_valid_date("2026-2-3"));
        assert!(!is_valid_date("26-02-03"));
    }
}
