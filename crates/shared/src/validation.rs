//! Common validation utilities.

use chrono::NaiveDate;
use validator::ValidationError;

/// Maximum length accepted for a caller-supplied user identifier.
pub const MAX_USER_ID_LENGTH: usize = 100;

/// Date format used on the wire for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates that a string contains at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a date range is ordered (start on or before end).
pub fn validate_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start <= end {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_order");
        err.message = Some("Start date must not be after end date".into());
        Err(err)
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        let mut err = ValidationError::new("date_format");
        err.message = Some(format!("'{}' is not a valid date (expected YYYY-MM-DD)", value).into());
        err
    })
}

/// Parses a numeric value, accepting surrounding whitespace.
pub fn parse_number(value: &str) -> Result<f64, ValidationError> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => {
            let mut err = ValidationError::new("number_format");
            err.message = Some(format!("'{}' is not a valid number", value).into());
            Err(err)
        }
    }
}

/// Validates a user identifier supplied by an upstream gateway.
///
/// Must be non-empty, at most [`MAX_USER_ID_LENGTH`] characters, and free of
/// control characters.
pub fn validate_user_id(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.chars().count() > MAX_USER_ID_LENGTH {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!("User id must be 1-{} characters", MAX_USER_ID_LENGTH).into(),
        );
        return Err(err);
    }
    if value.chars().any(char::is_control) {
        let mut err = ValidationError::new("user_id_chars");
        err.message = Some("User id must not contain control characters".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Monthly revenue").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \t").is_err());
    }

    #[test]
    fn test_validate_date_order() {
        assert!(validate_date_order(date(2024, 1, 1), date(2024, 1, 5)).is_ok());
        assert!(validate_date_order(date(2024, 1, 5), date(2024, 1, 5)).is_ok());
        assert!(validate_date_order(date(2024, 1, 6), date(2024, 1, 5)).is_err());
    }

    #[test]
    fn test_validate_date_order_error_message() {
        let err = validate_date_order(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Start date must not be after end date"
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-05").unwrap(), date(2024, 1, 5));
        assert_eq!(parse_date(" 2024-12-31 ").unwrap(), date(2024, 12, 31));
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("05/01/2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42").unwrap(), 42.0);
        assert_eq!(parse_number(" -3.5 ").unwrap(), -3.5);
        assert!(parse_number("abc").is_err());
        assert!(parse_number("NaN").is_err());
        assert!(parse_number("inf").is_err());
    }

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("fleet-manager@example.com").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LENGTH + 1)).is_err());
        assert!(validate_user_id("bad\nid").is_err());
    }
}
