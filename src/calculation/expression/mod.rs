//! Safe arithmetic formulas over named values.
//!
//! Formulas are tokenized, parsed into an [`Expr`] tree and evaluated with
//! checked decimal arithmetic. The grammar is closed: numbers, `+ - * /`,
//! parentheses, known variable names and `SUM(...)`. Anything else is an
//! [`EvaluationError`]; nothing in a formula is ever executed.

mod ast;
mod error;
mod evaluator;
mod lexer;
mod parser;
mod variables;

pub use ast::{BinaryOperator, Expr};
pub use error::EvaluationError;
pub use evaluator::evaluate;
pub use lexer::{Lexer, Token};
pub use parser::{MAX_FORMULA_LENGTH, Parser, parse};
pub use variables::VariableTable;
