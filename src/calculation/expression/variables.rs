//! Variable tables for formula evaluation.

use rust_decimal::Decimal;
use std::collections::HashMap;

/// One way of writing a variable in a formula.
#[derive(Debug, Clone)]
struct Spelling {
    chars: Vec<char>,
    canonical: String,
}

/// Named numeric values visible to a formula.
///
/// Names are matched as whole words, longest spelling first, so `BASIC_SALARY`
/// is never mistaken for `BASIC`. Matching is case-sensitive first and falls
/// back to ASCII case-insensitive. A name containing spaces or hyphens can also
/// be written with underscores (`Basic Salary` as `Basic_Salary`).
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{VariableTable, evaluate};
/// use rust_decimal::Decimal;
///
/// let mut variables = VariableTable::new();
/// variables.set("BASIC", Decimal::from(1));
/// variables.set("BASIC_SALARY", Decimal::from(50_000));
///
/// assert_eq!(evaluate("BASIC_SALARY + BASIC", &variables).unwrap(), Decimal::from(50_001));
/// ```
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    values: HashMap<String, Decimal>,
    spellings: Vec<Spelling>,
}

impl VariableTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable or updates its value.
    pub fn set(&mut self, name: &str, value: Decimal) {
        if let Some(existing) = self.values.get_mut(name) {
            *existing = value;
            return;
        }

        self.values.insert(name.to_string(), value);

        // A real name always wins over another variable's underscore alias.
        self.spellings
            .retain(|spelling| spelling.chars.iter().copied().ne(name.chars()));
        self.spellings.push(Spelling {
            chars: name.chars().collect(),
            canonical: name.to_string(),
        });

        let alias = underscore_alias(name);
        if alias != name && !self.values.contains_key(&alias) {
            self.spellings.push(Spelling {
                chars: alias.chars().collect(),
                canonical: name.to_string(),
            });
        }

        self.spellings.sort_by(|a, b| {
            b.chars
                .len()
                .cmp(&a.chars.len())
                .then_with(|| a.chars.cmp(&b.chars))
        });
    }

    /// Returns the value of a variable by its canonical name.
    pub fn get(&self, name: &str) -> Option<Decimal> {
        self.values.get(name).copied()
    }

    /// Returns true if a variable with this canonical name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of variables (aliases not counted).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the table has no variables.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finds the variable written at the start of `input`.
    ///
    /// Returns the canonical name and the number of characters matched.
    pub(crate) fn match_at(&self, input: &[char]) -> Option<(&str, usize)> {
        self.find_spelling(input, |a, b| a == b)
            .or_else(|| self.find_spelling(input, |a, b| a.eq_ignore_ascii_case(&b)))
    }

    fn find_spelling(&self, input: &[char], eq: impl Fn(char, char) -> bool) -> Option<(&str, usize)> {
        self.spellings.iter().find_map(|spelling| {
            let len = spelling.chars.len();
            let candidate = input.get(..len)?;
            let same = spelling
                .chars
                .iter()
                .zip(candidate)
                .all(|(&a, &b)| eq(a, b));
            let whole_word = input.get(len).is_none_or(|&next| !is_word_char(next));

            (same && whole_word).then_some((spelling.canonical.as_str(), len))
        })
    }
}

impl<S: AsRef<str>> FromIterator<(S, Decimal)> for VariableTable {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut table = VariableTable::new();
        for (name, value) in iter {
            table.set(name.as_ref(), value);
        }
        table
    }
}

/// Characters that may continue an identifier.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn underscore_alias(name: &str) -> String {
    name.chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}
