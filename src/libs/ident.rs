//! Identifier and business-key format checks.
//!
//! Table and column names are never bound as parameters; they are checked
//! here before they are concatenated into SQL text.

use crate::libs::error::{DataError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .unwrap()
});

/// Accept a bare SQL identifier or fail with a validation error.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if RE_IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(DataError::validation(format!("invalid SQL identifier '{}'", name)))
    }
}

/// Accept `name` or `table.name`, each part a bare identifier.
pub fn validate_qualified(name: &str) -> Result<&str> {
    let mut parts = name.split('.');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(a), None, _) => RE_IDENTIFIER.is_match(a),
        (Some(a), Some(b), None) => RE_IDENTIFIER.is_match(a) && RE_IDENTIFIER.is_match(b),
        _ => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(DataError::validation(format!("invalid SQL identifier '{}'", name)))
    }
}

/// Person identifiers in the roster are email addresses.
pub fn is_email(value: &str) -> bool {
    value.len() <= 254 && RE_EMAIL.is_match(value)
}
