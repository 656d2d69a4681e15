//! Income tax bracket models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single tier of a progressive tax schedule (annual amounts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// The tier number, starting at 1.
    pub tier: u32,
    /// The lower bound of income taxed in this tier.
    pub income_from: Decimal,
    /// The upper bound, or `None` for the unbounded top tier.
    #[serde(default)]
    pub income_to: Option<Decimal>,
    /// The rate applied within this tier, as a percentage.
    pub rate_percent: Decimal,
}

impl TaxBracket {
    /// Creates a bounded bracket.
    pub fn bounded(tier: u32, income_from: Decimal, income_to: Decimal, rate_percent: Decimal) -> Self {
        Self {
            tier,
            income_from,
            income_to: Some(income_to),
            rate_percent,
        }
    }

    /// Creates the unbounded top bracket.
    pub fn unbounded(tier: u32, income_from: Decimal, rate_percent: Decimal) -> Self {
        Self {
            tier,
            income_from,
            income_to: None,
            rate_percent,
        }
    }

    /// The width of the bracket, or `None` when unbounded.
    pub fn width(&self) -> Option<Decimal> {
        self.income_to.map(|to| to - self.income_from)
    }
}

/// A validated, tier-ordered bracket table.
///
/// Brackets are sorted by tier, contiguous (`income_from` of tier n+1 equals
/// `income_to` of tier n), non-overlapping, and only the last one is unbounded.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{TaxBracket, TaxBracketTable};
/// use rust_decimal::Decimal;
///
/// let table = TaxBracketTable::new(vec![
///     TaxBracket::bounded(1, Decimal::ZERO, Decimal::from(800_000), Decimal::ZERO),
///     TaxBracket::unbounded(2, Decimal::from(800_000), Decimal::from(15)),
/// ])
/// .unwrap();
/// assert_eq!(table.brackets().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBracketTable {
    brackets: Vec<TaxBracket>,
}

impl TaxBracketTable {
    /// Validates and wraps a bracket list.
    ///
    /// # Errors
    ///
    /// - [`EngineError::BracketTableEmpty`] if `brackets` is empty
    /// - [`EngineError::MalformedBracketTable`] on a first tier not starting
    ///   at 0, duplicate tiers, gaps, overlaps, inverted bounds, negative
    ///   rates, or a bounded top tier
    pub fn new(mut brackets: Vec<TaxBracket>) -> EngineResult<Self> {
        if brackets.is_empty() {
            return Err(EngineError::BracketTableEmpty {
                period: "the supplied bracket table".to_string(),
            });
        }

        brackets.sort_by_key(|b| b.tier);

        let first = &brackets[0];
        if !first.income_from.is_zero() {
            return Err(malformed(format!(
                "first tier {} starts at {} instead of 0",
                first.tier, first.income_from
            )));
        }

        let last_index = brackets.len() - 1;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate_percent < Decimal::ZERO {
                return Err(malformed(format!(
                    "tier {} has a negative rate {}",
                    bracket.tier, bracket.rate_percent
                )));
            }

            match bracket.income_to {
                Some(to) if to <= bracket.income_from => {
                    return Err(malformed(format!(
                        "tier {} upper bound {} is not above its lower bound {}",
                        bracket.tier, to, bracket.income_from
                    )));
                }
                None if index != last_index => {
                    return Err(malformed(format!(
                        "tier {} is unbounded but is not the last tier",
                        bracket.tier
                    )));
                }
                _ => {}
            }

            if index == last_index && bracket.income_to.is_some() {
                return Err(malformed(format!(
                    "top tier {} must be unbounded",
                    bracket.tier
                )));
            }

            if let Some(next) = brackets.get(index + 1) {
                if next.tier == bracket.tier {
                    return Err(malformed(format!("duplicate tier {}", bracket.tier)));
                }
                if bracket.income_to != Some(next.income_from) {
                    return Err(malformed(format!(
                        "tier {} ends at {:?} but tier {} starts at {}",
                        bracket.tier, bracket.income_to, next.tier, next.income_from
                    )));
                }
            }
        }

        Ok(Self { brackets })
    }

    /// Returns the brackets in tier order.
    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }
}

fn malformed(message: String) -> EngineError {
    EngineError::MalformedBracketTable { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_valid_brackets() -> Vec<TaxBracket> {
        vec![
            TaxBracket::bounded(1, dec("0"), dec("800000"), dec("0")),
            TaxBracket::bounded(2, dec("800000"), dec("3000000"), dec("15")),
            TaxBracket::unbounded(3, dec("3000000"), dec("18")),
        ]
    }

    #[test]
    fn test_valid_table_is_accepted() {
        let table = TaxBracketTable::new(create_valid_brackets()).unwrap();
        assert_eq!(table.brackets().len(), 3);
    }

    #[test]
    fn test_brackets_are_sorted_by_tier() {
        let mut brackets = create_valid_brackets();
        brackets.reverse();

        let table = TaxBracketTable::new(brackets).unwrap();
        let tiers: Vec<u32> = table.brackets().iter().map(|b| b.tier).collect();
        assert_eq!(tiers, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let result = TaxBracketTable::new(vec![]);
        assert!(matches!(result, Err(EngineError::BracketTableEmpty { .. })));
    }

    #[test]
    fn test_gap_between_tiers_is_rejected() {
        let mut brackets = create_valid_brackets();
        brackets[1].income_from = dec("900000");

        let result = TaxBracketTable::new(brackets);
        assert!(matches!(
            result,
            Err(EngineError::MalformedBracketTable { .. })
        ));
    }

    #[test]
    fn test_first_tier_must_start_at_zero() {
        let brackets = vec![
            TaxBracket::bounded(1, dec("300000"), dec("800000"), dec("0")),
            TaxBracket::unbounded(2, dec("800000"), dec("15")),
        ];

        match TaxBracketTable::new(brackets) {
            Err(EngineError::MalformedBracketTable { message }) => {
                assert!(message.contains("first tier 1 starts at 300000"));
            }
            other => panic!("Expected MalformedBracketTable error, got {:?}", other),
        }
    }

    #[test]
    fn test_bounded_top_tier_is_rejected() {
        let mut brackets = create_valid_brackets();
        brackets[2].income_to = Some(dec("12000000"));

        match TaxBracketTable::new(brackets) {
            Err(EngineError::MalformedBracketTable { message }) => {
                assert!(message.contains("must be unbounded"));
            }
            _ => panic!("Expected MalformedBracketTable error"),
        }
    }

    #[test]
    fn test_unbounded_middle_tier_is_rejected() {
        let mut brackets = create_valid_brackets();
        brackets[1].income_to = None;

        assert!(TaxBracketTable::new(brackets).is_err());
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let brackets = vec![
            TaxBracket::bounded(1, dec("800000"), dec("0"), dec("0")),
            TaxBracket::unbounded(2, dec("0"), dec("15")),
        ];

        assert!(TaxBracketTable::new(brackets).is_err());
    }

    #[test]
    fn test_duplicate_tier_is_rejected() {
        let brackets = vec![
            TaxBracket::bounded(1, dec("0"), dec("800000"), dec("0")),
            TaxBracket::unbounded(1, dec("800000"), dec("15")),
        ];

        match TaxBracketTable::new(brackets) {
            Err(EngineError::MalformedBracketTable { message }) => {
                assert!(message.contains("duplicate tier 1"));
            }
            _ => panic!("Expected MalformedBracketTable error"),
        }
    }

    #[test]
    fn test_width_of_bounded_and_unbounded_brackets() {
        let brackets = create_valid_brackets();
        assert_eq!(brackets[1].width(), Some(dec("2200000")));
        assert_eq!(brackets[2].width(), None);
    }

    #[test]
    fn test_deserialize_bracket_without_upper_bound() {
        let json = r#"{"tier": 6, "income_from": "50000000", "rate_percent": "25"}"#;
        let bracket: TaxBracket = serde_json::from_str(json).unwrap();
        assert_eq!(bracket.income_to, None);
        assert_eq!(bracket.rate_percent, dec("25"));
    }
}
