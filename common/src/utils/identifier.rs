//! Identifier validation.
//!
//! Database, user and instance names end up interpolated into DDL
//! statements by the SQL adaptors, so they are restricted to a
//! conservative character set before they reach a backend.

use crate::errors::{AppError, AppResult};

/// Longest identifier accepted (MySQL's limit for schema names).
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Validates resource names.
pub struct IdentifierValidator;

impl IdentifierValidator {
    /// Accepts ASCII letters, digits, `_` and `-`, not starting with a digit or `-`.
    pub fn validate(kind: &str, name: &str) -> AppResult<()> {
        if name.is_empty() {
            return Err(AppError::Validation(format!("{} name must not be empty", kind)));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(AppError::Validation(format!(
                "{} name '{}' exceeds {} characters",
                kind, name, MAX_IDENTIFIER_LEN
            )));
        }
        let mut chars = name.chars();
        let first_ok = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !first_ok || !name.chars().all(Self::is_allowed) {
            return Err(AppError::Validation(format!(
                "{} name '{}' contains illegal characters",
                kind, name
            )));
        }
        Ok(())
    }

    /// Escapes a value for use inside a single-quoted SQL string literal.
    pub fn quote_literal(value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    }
}
