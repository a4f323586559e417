//! Field validation data model.
//!
//! Validators are pure functions from a field value to an optional [`ValidationError`]. Their
//! results are data: they flow through the element update path into the node's `errors` and
//! `hasErrors` attributes and into the aggregate plugin state, and are never returned as `Err`.

use crate::error::ConfigError;
use crate::field::FieldValue;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Severity of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorLevel {
    /// Shown to the user, does not block publication.
    Warn,
    /// Blocks publication.
    Error,
}

/// A single validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Human-readable message.
    pub message: String,
    /// Severity.
    pub level: ErrorLevel,
}

impl ValidationError {
    /// An `ERROR`-level result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: ErrorLevel::Error,
        }
    }

    /// A `WARN`-level result.
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: ErrorLevel::Warn,
        }
    }

    /// Whether this result blocks publication.
    pub fn is_error(&self) -> bool {
        self.level == ErrorLevel::Error
    }
}

/// Validation results keyed by field name, in field declaration order.
pub type FieldErrors = IndexMap<String, Vec<ValidationError>>;

/// A field validator. Must be pure, synchronous and deterministic.
pub type Validator = Arc<dyn Fn(&FieldValue) -> Option<ValidationError> + Send + Sync>;

/// Fails when the value's text is empty or whitespace.
pub fn required(message: &str) -> Validator {
    let message = message.to_string();
    Arc::new(move |value: &FieldValue| {
        value
            .plain_text()
            .trim()
            .is_empty()
            .then(|| ValidationError::error(message.clone()))
    })
}

/// Fails when the value's text is longer than `max` user-perceived characters.
pub fn max_length(max: usize, message: Option<&str>, level: ErrorLevel) -> Validator {
    let message = message.map(str::to_string);
    Arc::new(move |value: &FieldValue| {
        let text = value.plain_text();
        let length = text.graphemes(true).count();
        (length > max).then(|| ValidationError {
            message: message
                .clone()
                .unwrap_or_else(|| format!("Too long: {length}/{max}")),
            level,
        })
    })
}

/// Fails when a non-empty value's text does not match `pattern`.
pub fn pattern(pattern: &str, message: &str, level: ErrorLevel) -> Result<Validator, ConfigError> {
    let regex = Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;
    let message = message.to_string();
    Ok(Arc::new(move |value: &FieldValue| {
        let text = value.plain_text();
        (!text.is_empty() && !regex.is_match(&text)).then(|| ValidationError {
            message: message.clone(),
            level,
        })
    }))
}

/// How an element picks the errors it shows for one field out of all failing validators.
///
/// The choice only affects which errors are displayed and stored in the node's `errors`
/// attribute. `hasErrors` is always computed from every failing validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// The first failing validator, in declaration order.
    #[default]
    FirstFailing,
    /// The first `WARN`, falling back to the first failure of any level.
    PreferWarn,
    /// The first `ERROR`, falling back to the first failure of any level.
    PreferError,
    /// Every failure, in declaration order.
    All,
}

impl ErrorPolicy {
    /// Select the displayed errors from all failures of one field.
    pub fn select(&self, failures: &[ValidationError]) -> Vec<ValidationError> {
        let pick = |level: ErrorLevel| {
            failures
                .iter()
                .find(|e| e.level == level)
                .or_else(|| failures.first())
                .cloned()
                .into_iter()
                .collect()
        };
        match self {
            ErrorPolicy::FirstFailing => failures.first().cloned().into_iter().collect(),
            ErrorPolicy::PreferWarn => pick(ErrorLevel::Warn),
            ErrorPolicy::PreferError => pick(ErrorLevel::Error),
            ErrorPolicy::All => failures.to_vec(),
        }
    }
}

/// Run validators in declaration order, collecting every failure.
pub fn run_validators(validators: &[Validator], value: &FieldValue) -> Vec<ValidationError> {
    validators.iter().filter_map(|v| v(value)).collect()
}
