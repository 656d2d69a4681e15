//! Formula evaluation errors.

use thiserror::Error;

/// Why a formula could not produce a value.
///
/// These are never fatal to a calculation: the caller treats the formula as
/// zero and records a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The formula is blank.
    #[error("Formula is empty")]
    Empty,

    /// The formula exceeds the maximum accepted length.
    #[error("Formula is too long ({length} characters, max {max})")]
    TooLong {
        /// Length of the rejected formula in characters.
        length: usize,
        /// The maximum accepted length.
        max: usize,
    },

    /// Opening and closing parentheses do not pair up.
    #[error("Formula has unbalanced parentheses")]
    UnbalancedParentheses,

    /// A character outside the arithmetic grammar.
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// The offending character.
        character: char,
        /// Zero-based character offset.
        position: usize,
    },

    /// A numeric literal that does not fit a decimal.
    #[error("Invalid number '{literal}'")]
    InvalidNumber {
        /// The literal text.
        literal: String,
    },

    /// An identifier that is not a known variable.
    #[error("Unknown variable '{name}'")]
    UnknownVariable {
        /// The identifier as written.
        name: String,
    },

    /// A function call other than `SUM`.
    #[error("Unsupported function '{name}'")]
    UnsupportedFunction {
        /// The function name as written.
        name: String,
    },

    /// The token stream does not match the grammar.
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the parser was looking for.
        expected: String,
        /// What it found instead.
        found: String,
    },

    /// Division by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// An intermediate result exceeded the decimal range.
    #[error("Arithmetic overflow")]
    Overflow,
}
