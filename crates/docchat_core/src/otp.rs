//! crates/docchat_core/src/otp.rs
//!
//! Six-digit one-time codes used for account verification and password reset.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Lifetime of an account-verification code.
pub const VERIFY_OTP_TTL_MINUTES: i64 = 10;
/// Lifetime of a password-reset code.
pub const RESET_OTP_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("Invalid OTP")]
    Invalid,
    #[error("OTP expired. Please request a new one.")]
    Expired,
}

impl OneTimeCode {
    /// Generates a fresh numeric code in `100000..=999999`.
    pub fn generate(ttl: Duration, now: DateTime<Utc>) -> Self {
        let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self {
            code: code.to_string(),
            expires_at: now + ttl,
        }
    }

    /// Value is compared first, expiry second; a matching but stale code
    /// reports `Expired`.
    pub fn check(&self, candidate: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.code != candidate {
            return Err(OtpError::Invalid);
        }
        if self.expires_at < now {
            return Err(OtpError::Expired);
        }
        Ok(())
    }
}

/// Checks a candidate against an optional stored code. No stored code means
/// nothing can match.
pub fn check_slot(
    slot: Option<&OneTimeCode>,
    candidate: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    match slot {
        Some(code) => code.check(candidate, now),
        None => Err(OtpError::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        let now = Utc::now();
        for _ in 0..200 {
            let otp = OneTimeCode::generate(Duration::minutes(VERIFY_OTP_TTL_MINUTES), now);
            assert_eq!(otp.code.len(), 6);
            assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
            assert_eq!(otp.expires_at, now + Duration::minutes(10));
        }
    }

    #[test]
    fn matching_code_before_expiry_passes() {
        let now = Utc::now();
        let otp = OneTimeCode {
            code: "123456".into(),
            expires_at: now + Duration::minutes(1),
        };
        assert_eq!(otp.check("123456", now), Ok(()));
    }

    #[test]
    fn matching_code_after_expiry_reports_expired() {
        let now = Utc::now();
        let otp = OneTimeCode {
            code: "123456".into(),
            expires_at: now - Duration::seconds(1),
        };
        assert_eq!(otp.check("123456", now), Err(OtpError::Expired));
    }

    #[test]
    fn wrong_code_is_invalid_even_when_expired() {
        let now = Utc::now();
        let otp = OneTimeCode {
            code: "123456".into(),
            expires_at: now - Duration::minutes(5),
        };
        assert_eq!(otp.check("654321", now), Err(OtpError::Invalid));
    }

    #[test]
    fn empty_slot_never_matches() {
        assert_eq!(check_slot(None, "123456", Utc::now()), Err(OtpError::Invalid));
    }
}
