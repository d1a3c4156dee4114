//! services/api/src/web/validation.rs
//!
//! Request body checks run before any handler touches the store. Failures are
//! reported together as `field: message` pairs joined by ` | `.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const OTP_LEN: usize = 6;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Trims and lower-cases an email address for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accumulates field errors for one request.
#[derive(Default)]
pub struct Checks {
    failures: Vec<String>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, message: &str) {
        self.failures.push(format!("{}: {}", field, message));
    }

    pub fn non_empty(mut self, field: &str, value: &str, message: &str) -> Self {
        if value.trim().is_empty() {
            self.fail(field, message);
        }
        self
    }

    pub fn email(mut self, field: &str, value: &str) -> Self {
        if !email_pattern().is_match(value.trim()) {
            self.fail(field, "Please include a valid email");
        }
        self
    }

    pub fn min_len(mut self, field: &str, value: &str, min: usize, message: &str) -> Self {
        if value.chars().count() < min {
            self.fail(field, message);
        }
        self
    }

    pub fn exact_len(mut self, field: &str, value: &str, len: usize, message: &str) -> Self {
        if value.chars().count() != len {
            self.fail(field, message);
        }
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(ApiError::BadRequest(self.failures.join(" | ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_registration_passes() {
        Checks::new()
            .non_empty("name", "Ada", "Name is required")
            .email("email", "ada@example.com")
            .min_len("password", "longenough", MIN_PASSWORD_LEN, "too short")
            .finish()
            .unwrap();
    }

    #[test]
    fn failures_are_joined_in_order() {
        let err = Checks::new()
            .non_empty("name", "  ", "Name is required")
            .email("email", "not-an-email")
            .min_len(
                "password",
                "short",
                MIN_PASSWORD_LEN,
                "Password must be 8 or more characters",
            )
            .finish()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "name: Name is required | email: Please include a valid email | password: Password must be 8 or more characters"
        );
    }

    #[test]
    fn otp_must_have_exact_length() {
        assert!(Checks::new().exact_len("otp", "12345", OTP_LEN, "bad").finish().is_err());
        assert!(Checks::new().exact_len("otp", "123456", OTP_LEN, "bad").finish().is_ok());
    }

    #[test]
    fn email_pattern_accepts_addresses_and_rejects_the_rest() {
        let pattern = email_pattern();
        assert!(pattern.is_match("ada@example.com"));
        assert!(pattern.is_match("a.b+tag@mail.example.org"));
        for bad in [
            "",
            "ada",
            "ada@example",
            "@example.com",
            "ada@@example.com",
            "a da@example.com",
        ] {
            assert!(!pattern.is_match(bad), "{bad} should be rejected");
        }
        assert!(Checks::new().email("email", "  ada@example.com ").finish().is_ok());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
