//! Query string parsing shared by the list endpoints.

use std::collections::HashMap;
use std::str::FromStr;

use uuid::Uuid;

use crate::domain::{DomainError, Ordering};

pub type Params = HashMap<String, String>;

fn value<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// `true`/`false` (any case), also `1`/`0`. Anything else is ignored.
pub fn boolean(params: &Params, key: &str) -> Option<bool> {
    match value(params, key)?.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// `true` only when the flag is explicitly set to true.
pub fn flag(params: &Params, key: &str) -> bool {
    boolean(params, key).unwrap_or(false)
}

pub fn text(params: &Params, key: &str) -> Option<String> {
    value(params, key).map(str::to_string)
}

pub fn number<T: FromStr>(params: &Params, key: &str) -> Result<Option<T>, DomainError> {
    value(params, key)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| DomainError::Validation(format!("{}: A valid integer is required.", key)))
        })
        .transpose()
}

pub fn uuid(params: &Params, key: &str) -> Result<Option<Uuid>, DomainError> {
    value(params, key)
        .map(|v| {
            Uuid::parse_str(v).map_err(|_| {
                DomainError::Validation(format!(
                    "{}: Select a valid choice. That choice is not one of the available choices.",
                    key
                ))
            })
        })
        .transpose()
}

pub fn ordering(params: &Params) -> Vec<Ordering> {
    value(params, "ordering")
        .map(Ordering::parse_list)
        .unwrap_or_default()
}

/// Window for the expiring-document endpoints, default 90 days.
pub fn days(params: &Params) -> Result<i64, DomainError> {
    Ok(number(params, "days")?.unwrap_or(90))
}
