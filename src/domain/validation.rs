//! Field-level validation shared by create and update paths.

use super::DomainError;

/// Reject values longer than the column allows.
pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::Validation(format!(
            "{}: Ensure this field has no more than {} characters.",
            field, max
        )));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!(
            "{}: This field may not be blank.",
            field
        )));
    }
    Ok(())
}

/// Loose structural check: one `@`, non-empty local part, dotted domain.
pub fn email(field: &str, value: &str) -> Result<(), DomainError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::Validation(format!(
            "{}: Enter a valid email address.",
            field
        )));
    }
    Ok(())
}

pub fn optional_email(field: &str, value: Option<&str>) -> Result<(), DomainError> {
    match value {
        Some(v) if !v.is_empty() => email(field, v),
        _ => Ok(()),
    }
}

pub fn website_url(field: &str, value: &str) -> Result<(), DomainError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(())
        }
        _ => Err(DomainError::Validation(format!(
            "{}: Enter a valid URL.",
            field
        ))),
    }
}

pub fn credit_hours(value: i32) -> Result<(), DomainError> {
    if !(1..=12).contains(&value) {
        return Err(DomainError::Validation(
            "Credit hours must be between 1 and 12".to_string(),
        ));
    }
    Ok(())
}

pub fn date_range(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Result<(), DomainError> {
    if start > end {
        return Err(DomainError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}
