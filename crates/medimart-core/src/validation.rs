//! Field-level checks shared by the models.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::missing_field(field));
    }
    Ok(())
}

pub fn require_email(field: &str, value: &str) -> Result<()> {
    require(field, value)?;
    if !EMAIL_RE.is_match(value.trim()) {
        return Err(CoreError::invalid_field(field, "not a valid email address"));
    }
    Ok(())
}

pub fn require_rating(value: u8) -> Result<()> {
    if !(1..=5).contains(&value) {
        return Err(CoreError::invalid_field("rating", "must be between 1 and 5"));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::invalid_field(field, "must be zero or greater"));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::invalid_field(field, "must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_missing() {
        assert!(matches!(require("name", "  "), Err(CoreError::MissingField(f)) if f == "name"));
        assert!(require("name", "Asha").is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(require_email("email", "a@b.io").is_ok());
        assert!(require_email("email", "a@b").is_err());
        assert!(require_email("email", "a b@c.io").is_err());
        assert!(matches!(require_email("email", ""), Err(CoreError::MissingField(_))));
    }

    #[test]
    fn ratings_and_amounts() {
        assert!(require_rating(0).is_err());
        assert!(require_rating(5).is_ok());
        assert!(require_rating(6).is_err());
        assert!(require_non_negative("fees", 0.0).is_ok());
        assert!(require_non_negative("fees", -1.0).is_err());
        assert!(require_positive("price", 0.0).is_err());
        assert!(require_positive("price", f64::NAN).is_err());
    }
}
