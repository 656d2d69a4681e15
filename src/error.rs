//! Error types for the payroll calculation engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every condition that makes a calculation fail outright. Problems that
//! only degrade a single formula (see [`EvaluationError`]) are not fatal and
//! surface as warnings on the calculation result instead.
//!
//! [`EvaluationError`]: crate::calculation::EvaluationError

use rust_decimal::Decimal;
use thiserror::Error;

/// The main error type for the payroll calculation engine.
///
/// Every variant identifies the precondition that was violated, so a payroll
/// run can record a meaningful reason against the employee and move on.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/settings.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/settings.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The template is missing a required component category or is malformed.
    #[error("Template '{template_id}' is incomplete: {reason}")]
    TemplateIncomplete {
        /// The ID of the offending template.
        template_id: String,
        /// What the template is missing.
        reason: String,
    },

    /// No tax brackets are available, even after falling back to the latest schedule.
    #[error("No tax brackets available for {period}")]
    BracketTableEmpty {
        /// The period the brackets were requested for.
        period: String,
    },

    /// The tax bracket table violates ordering or contiguity rules.
    #[error("Malformed tax bracket table: {message}")]
    MalformedBracketTable {
        /// A description of the violation.
        message: String,
    },

    /// The attendance record cannot be used for proration.
    #[error("Invalid attendance: {days_worked} days worked of {total_days} total days")]
    InvalidAttendance {
        /// Days worked in the period.
        days_worked: Decimal,
        /// Total days in the period.
        total_days: Decimal,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
