//! Evaluation of formula ASTs.

use rust_decimal::Decimal;

use super::ast::{BinaryOperator, Expr};
use super::error::EvaluationError;
use super::parser::parse;
use super::variables::VariableTable;

impl Expr {
    /// Evaluates the expression against the current variable values.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::DivisionByZero`], [`EvaluationError::Overflow`], or
    /// [`EvaluationError::UnknownVariable`] if a referenced name has been
    /// removed from the table since parsing.
    pub fn evaluate(&self, variables: &VariableTable) -> Result<Decimal, EvaluationError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Variable(name) => {
                variables
                    .get(name)
                    .ok_or_else(|| EvaluationError::UnknownVariable { name: name.clone() })
            }
            Expr::Negate(operand) => Ok(-operand.evaluate(variables)?),
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = left.evaluate(variables)?;
                let right = right.evaluate(variables)?;
                apply(*operator, left, right)
            }
            Expr::Sum(args) => args.iter().try_fold(Decimal::ZERO, |total, arg| {
                total
                    .checked_add(arg.evaluate(variables)?)
                    .ok_or(EvaluationError::Overflow)
            }),
        }
    }
}

fn apply(operator: BinaryOperator, left: Decimal, right: Decimal) -> Result<Decimal, EvaluationError> {
    let result = match operator {
        BinaryOperator::Add => left.checked_add(right),
        BinaryOperator::Subtract => left.checked_sub(right),
        BinaryOperator::Multiply => left.checked_mul(right),
        BinaryOperator::Divide => {
            if right.is_zero() {
                return Err(EvaluationError::DivisionByZero);
            }
            left.checked_div(right)
        }
    };

    result.ok_or(EvaluationError::Overflow)
}

/// Parses and evaluates a formula in one step.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{VariableTable, evaluate};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let variables: VariableTable = [
///     ("BASIC_SALARY", Decimal::from(50_000)),
///     ("HOUSING", Decimal::from(15_000)),
/// ]
/// .into_iter()
/// .collect();
///
/// // A leading integer multiplier reads as a percentage.
/// let pension = evaluate("8 * (BASIC_SALARY + HOUSING)", &variables).unwrap();
/// assert_eq!(pension, Decimal::from_str("5200").unwrap());
/// ```
pub fn evaluate(formula: &str, variables: &VariableTable) -> Result<Decimal, EvaluationError> {
    parse(formula, variables)?.evaluate(variables)
}
