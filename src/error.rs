//! Error types for the weightplan application.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised inside the persisted key-value store.
///
/// These never escape the typed `load_or`/`save` boundary; they are logged
/// and replaced by the caller's default.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON for key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store file is corrupt: {0}")]
    Corrupt(String),
}

/// Errors produced while validating onboarding and planner form input.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("field {field} is not a number: {value}")]
    NotANumber { field: &'static str, value: String },

    #[error("field {field} must be positive: {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("unknown value for {field}: {value}")]
    UnknownChoice { field: &'static str, value: String },
}

/// Errors from ledger mutations.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("day index out of range: {0}")]
    DayOutOfRange(usize),

    #[error("calories must be a finite non-negative number: {0}")]
    InvalidCalories(f64),

    #[error("no entry with id {0}")]
    EntryNotFound(Uuid),

    #[error("no {meal_type} entry at position {index}")]
    EntryIndexOutOfRange { meal_type: String, index: usize },
}

/// Errors surfaced by the planner controller.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("no profile has been saved yet")]
    MissingProfile,

    #[error("unknown activity: {0}")]
    UnknownActivity(String),

    #[error("unknown ingredient: {0}")]
    UnknownIngredient(String),

    #[error("meal has no ingredients")]
    EmptyMeal,
}
