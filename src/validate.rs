//! Field-level checks shared by the request schemas.

use std::{fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::Error as _, Deserialize, Deserializer};

use crate::error::AppError;

/// Collects the names of missing required fields so a request is rejected
/// once, listing all of them.
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    /// Trimmed text; blank counts as missing.
    pub fn text(&mut self, name: &'static str, value: Option<String>) -> String {
        match trimmed(value) {
            Some(v) => v,
            None => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    /// Like [`Required::text`] but keeps surrounding whitespace, which may
    /// be part of a password.
    pub fn secret(&mut self, name: &'static str, value: Option<String>) -> String {
        match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    pub fn value<T: Default>(&mut self, name: &'static str, value: Option<T>) -> T {
        self.value_or(name, value, T::default())
    }

    /// `placeholder` is returned for a missing field; it never outlives a
    /// failed [`Required::finish`].
    pub fn value_or<T>(&mut self, name: &'static str, value: Option<T>, placeholder: T) -> T {
        match value {
            Some(v) => v,
            None => {
                self.missing.push(name);
                placeholder
            }
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!(
                "Missing required fields: {}",
                self.missing.join(", ")
            )))
        }
    }
}

/// Trims; an all-whitespace string becomes `None`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Query-string filter value: blank means "no filter", anything else is
/// trimmed and parsed.
pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match trimmed(Option::<String>::deserialize(deserializer)?) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(D::Error::custom),
    }
}

/// For partial updates: absent stays absent, but a present field must not be
/// blank.
pub fn non_blank(name: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    match value {
        None => Ok(None),
        Some(v) => match v.trim() {
            "" => Err(AppError::InvalidInput(format!("{name} must not be empty"))),
            t => Ok(Some(t.to_string())),
        },
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn email(value: &str) -> Result<(), AppError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(AppError::InvalidInput("Invalid email".into()))
    }
}

pub fn at_least<T: PartialOrd + std::fmt::Display>(
    name: &str,
    value: T,
    min: T,
) -> Result<(), AppError> {
    if value < min {
        return Err(AppError::InvalidInput(format!("{name} must be at least {min}")));
    }
    Ok(())
}
