//! Recursive descent parser for formula expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expression     := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/') unary)*
//! unary          := ('-' | '+') unary | primary
//! primary        := NUMBER | VARIABLE | SUM '(' expression (',' expression)* ')'
//!                 | '(' expression ')'
//! ```

use super::ast::{BinaryOperator, Expr};
use super::error::EvaluationError;
use super::lexer::{Lexer, Token};
use super::variables::VariableTable;

/// The longest formula accepted, in characters.
pub const MAX_FORMULA_LENGTH: usize = 1000;

/// Parser over a token stream produced by [`Lexer::tokenize`].
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Creates a parser over a complete token stream ending in [`Token::Eof`].
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvaluationError> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(EvaluationError::UnexpectedToken {
                expected: format!("'{}'", expected),
                found: self.current().to_string(),
            })
        }
    }

    /// Parses a complete expression and requires the input to be exhausted.
    pub fn parse(mut self) -> Result<Expr, EvaluationError> {
        let expr = self.parse_expression()?;

        if *self.current() != Token::Eof {
            return Err(EvaluationError::UnexpectedToken {
                expected: "operator or end of formula".to_string(),
                found: self.current().to_string(),
            });
        }

        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match self.current() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvaluationError> {
        match self.current() {
            Token::Minus => {
                self.advance();
                Ok(Expr::negate(self.parse_unary()?))
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvaluationError> {
        match self.current().clone() {
            Token::Number { value, .. } => {
                self.advance();
                Ok(Expr::number(value))
            }
            Token::Variable(name) => {
                self.advance();
                Ok(Expr::Variable(name))
            }
            Token::Sum => {
                self.advance();
                self.expect(Token::LeftParen)?;

                let mut args = vec![self.parse_expression()?];
                while *self.current() == Token::Comma {
                    self.advance();
                    args.push(self.parse_expression()?);
                }

                self.expect(Token::RightParen)?;
                Ok(Expr::Sum(args))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            other => Err(EvaluationError::UnexpectedToken {
                expected: "number, variable or '('".to_string(),
                found: other.to_string(),
            }),
        }
    }
}

/// Parses a formula into an AST, resolving names against `variables`.
///
/// # Errors
///
/// Returns an [`EvaluationError`] for blank or oversized formulas, unbalanced
/// parentheses, characters outside the grammar, unknown names, calls to
/// anything but `SUM`, and malformed token sequences.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{Expr, VariableTable, parse};
///
/// let variables: VariableTable = [("BASIC", rust_decimal::Decimal::ONE)].into_iter().collect();
/// let expr = parse("SUM(BASIC, 2)", &variables).unwrap();
/// assert!(matches!(expr, Expr::Sum(ref args) if args.len() == 2));
/// ```
pub fn parse(formula: &str, variables: &VariableTable) -> Result<Expr, EvaluationError> {
    if formula.trim().is_empty() {
        return Err(EvaluationError::Empty);
    }

    let length = formula.chars().count();
    if length > MAX_FORMULA_LENGTH {
        return Err(EvaluationError::TooLong {
            length,
            max: MAX_FORMULA_LENGTH,
        });
    }

    check_balanced_parentheses(formula)?;

    let tokens = Lexer::new(formula, variables).tokenize()?;
    Parser::new(tokens).parse()
}

fn check_balanced_parentheses(formula: &str) -> Result<(), EvaluationError> {
    let mut depth: usize = 0;
    for ch in formula.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(EvaluationError::UnbalancedParentheses)?;
            }
            _ => {}
        }
    }

    if depth == 0 {
        Ok(())
    } else {
        Err(EvaluationError::UnbalancedParentheses)
    }
}
