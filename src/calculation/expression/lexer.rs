//! Tokenizer for formula expressions.
//!
//! The lexer resolves variable names against a [`VariableTable`] while it
//! scans, so a name containing spaces is one token and an identifier that is
//! not in the table is rejected before parsing starts.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use super::error::EvaluationError;
use super::variables::{VariableTable, is_word_char};

/// Token types recognized by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A numeric literal. `bare_integer` is true for literals written without
    /// a decimal point or percent sign.
    Number {
        /// The literal value.
        value: Decimal,
        /// Whether the literal was a plain integer.
        bare_integer: bool,
    },
    /// A known variable, by canonical name.
    Variable(String),
    /// The `SUM` aggregate.
    Sum,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// End of input.
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number { value, .. } => write!(f, "{}", value),
            Token::Variable(name) => write!(f, "{}", name),
            Token::Sum => write!(f, "SUM"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "end of formula"),
        }
    }
}

/// Lexer for formula expressions.
pub struct Lexer<'a> {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    variables: &'a VariableTable,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input` that resolves names against `variables`.
    pub fn new(input: &str, variables: &'a VariableTable) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
            variables,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn unexpected(&self, character: char) -> EvaluationError {
        EvaluationError::UnexpectedCharacter {
            character,
            position: self.position,
        }
    }

    fn read_digits(&mut self, into: &mut String) {
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                into.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, EvaluationError> {
        let mut literal = String::new();
        self.read_digits(&mut literal);

        let mut bare_integer = true;
        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            if literal.is_empty() {
                literal.push('0');
            }
            literal.push('.');
            self.advance();
            self.read_digits(&mut literal);
            bare_integer = false;
        }

        let mut value = Decimal::from_str(&literal)
            .map_err(|_| EvaluationError::InvalidNumber { literal: literal.clone() })?;

        if self.current_char == Some('%') {
            self.advance();
            value /= Decimal::ONE_HUNDRED;
            bare_integer = false;
        }

        // `2BASIC` is neither a number nor a name.
        if let Some(ch) = self.current_char.filter(|&c| is_word_char(c)) {
            return Err(self.unexpected(ch));
        }

        Ok(Token::Number {
            value,
            bare_integer,
        })
    }

    /// Reads the identifier at the current position without consuming it.
    fn peek_word(&self) -> String {
        self.input[self.position..]
            .iter()
            .take_while(|&&c| is_word_char(c))
            .collect()
    }

    /// Returns true if the next non-whitespace character after `offset`
    /// characters is an opening parenthesis.
    fn is_call_after(&self, offset: usize) -> bool {
        self.input[self.position + offset..]
            .iter()
            .find(|c| !c.is_whitespace())
            .is_some_and(|&c| c == '(')
    }

    fn read_name(&mut self) -> Result<Token, EvaluationError> {
        let word = self.peek_word();

        if word.eq_ignore_ascii_case("SUM") && self.is_call_after(word.chars().count()) {
            self.advance_by(3);
            return Ok(Token::Sum);
        }

        if let Some((canonical, length)) = self.variables.match_at(&self.input[self.position..]) {
            let token = Token::Variable(canonical.to_string());
            self.advance_by(length);
            return Ok(token);
        }

        match self.current_char {
            Some(ch) if word.is_empty() => Err(self.unexpected(ch)),
            _ if self.is_call_after(word.chars().count()) => {
                Err(EvaluationError::UnsupportedFunction { name: word })
            }
            _ => Err(EvaluationError::UnknownVariable { name: word }),
        }
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> Result<Token, EvaluationError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char else {
            return Ok(Token::Eof);
        };

        let single = match ch {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // Names may start with a digit ("13th Month"), so try the table first.
        if self.variables.match_at(&self.input[self.position..]).is_some() {
            return self.read_name();
        }

        match ch {
            '0'..='9' => self.read_number(),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            c if is_word_char(c) => self.read_name(),
            c => Err(self.unexpected(c)),
        }
    }

    /// Consumes the whole input, applying the percentage-literal convention.
    pub fn tokenize(mut self) -> Result<Vec<Token>, EvaluationError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        apply_percentage_convention(&mut tokens);
        Ok(tokens)
    }
}

/// Rewrites `10 * (x)` as `0.10 * (x)`.
///
/// Applies to a plain integer literal between 1 and 100 in two shapes only:
/// it starts the formula and is followed by `*`, or it is followed by `*`
/// and then `(`. Everything else, including `2 + 3 * 4`, keeps its value.
fn apply_percentage_convention(tokens: &mut [Token]) {
    for index in 0..tokens.len() {
        let before_star = matches!(tokens.get(index + 1), Some(Token::Star));
        let before_group = matches!(tokens.get(index + 2), Some(Token::LeftParen));

        if !before_star || (index != 0 && !before_group) {
            continue;
        }

        if let Token::Number {
            value,
            bare_integer: true,
        } = tokens[index]
        {
            if (Decimal::ONE..=Decimal::ONE_HUNDRED).contains(&value) {
                tokens[index] = Token::Number {
                    value: value / Decimal::ONE_HUNDRED,
                    bare_integer: false,
                };
            }
        }
    }
}
