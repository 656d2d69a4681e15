//! Abstract syntax tree for formula expressions.

use rust_decimal::Decimal;
use std::fmt;

/// A parsed formula.
///
/// Variables hold the canonical component name they were resolved to at
/// parse time, so evaluation never has to re-match names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A numeric literal (percentage literals already divided by 100).
    Number(Decimal),
    /// A reference to a named value.
    Variable(String),
    /// Unary minus.
    Negate(Box<Expr>),
    /// A binary arithmetic operation.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        operator: BinaryOperator,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `SUM(a, b, ...)`, equivalent to `(a + b + ...)`.
    Sum(Vec<Expr>),
}

/// The four arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        };
        f.write_str(symbol)
    }
}

impl Expr {
    /// Creates a numeric literal.
    pub fn number(value: Decimal) -> Self {
        Expr::Number(value)
    }

    /// Creates a variable reference.
    pub fn var(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }

    /// Creates a binary operation.
    pub fn binary(left: Expr, operator: BinaryOperator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    /// Creates a negation.
    pub fn negate(operand: Expr) -> Self {
        Expr::Negate(Box::new(operand))
    }

    /// Returns the distinct variable names referenced, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Negate(operand) => operand.collect_variables(names),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Sum(args) => args.iter().for_each(|arg| arg.collect_variables(names)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_deduplicated_in_order() {
        let expr = Expr::binary(
            Expr::var("HOUSING"),
            BinaryOperator::Add,
            Expr::Sum(vec![
                Expr::var("BASIC_SALARY"),
                Expr::negate(Expr::var("HOUSING")),
                Expr::number(Decimal::ONE),
            ]),
        );

        assert_eq!(expr.variables(), vec!["HOUSING", "BASIC_SALARY"]);
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(BinaryOperator::Divide.to_string(), "/");
        assert_eq!(BinaryOperator::Subtract.to_string(), "-");
    }
}
