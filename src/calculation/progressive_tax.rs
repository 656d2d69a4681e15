//! Progressive income tax over an ordered bracket schedule.
//!
//! The calculator knows nothing about tax years. Callers pick the schedule
//! (see [`ConfigLoader::brackets_effective_on`]) and pass the brackets in tier
//! order; a [`TaxBracketTable`] guarantees that order.
//!
//! [`ConfigLoader::brackets_effective_on`]: crate::config::ConfigLoader::brackets_effective_on
//! [`TaxBracketTable`]: crate::models::TaxBracketTable

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::TaxBracket;

/// The tax charged within one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTax {
    /// The bracket tier.
    pub tier: u32,
    /// Income that fell into this tier.
    pub taxable_portion: Decimal,
    /// The tier rate as a percentage.
    pub rate_percent: Decimal,
    /// `taxable_portion x rate_percent / 100`, unrounded.
    pub tax: Decimal,
}

/// Splits `taxable_income` across the brackets.
///
/// Tiers are consumed in order until the income is exhausted; tiers that
/// receive no income are omitted. Income of zero or less yields no tiers.
pub fn compute_tax_by_tier(taxable_income: Decimal, brackets: &[TaxBracket]) -> Vec<TierTax> {
    let mut tiers = Vec::new();
    let mut remaining = taxable_income;

    for bracket in brackets {
        if remaining <= Decimal::ZERO {
            break;
        }

        let portion = match bracket.width() {
            Some(width) => remaining.min(width),
            None => remaining,
        };
        let tax = portion.saturating_mul(bracket.rate_percent / Decimal::ONE_HUNDRED);

        tiers.push(TierTax {
            tier: bracket.tier,
            taxable_portion: portion,
            rate_percent: bracket.rate_percent,
            tax,
        });

        remaining -= portion;
    }

    tiers
}

/// Computes the annual tax due on `taxable_income`.
///
/// Returns zero for income of zero or less. There is no upper limit on
/// income: everything above the last bounded tier is taxed at the top rate.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::compute_tax;
/// use payroll_engine::models::TaxBracket;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let brackets = vec![
///     TaxBracket::bounded(1, Decimal::ZERO, Decimal::from(800_000), Decimal::ZERO),
///     TaxBracket::unbounded(2, Decimal::from(800_000), Decimal::from(15)),
/// ];
///
/// let tax = compute_tax(Decimal::from(1_000_000), &brackets);
/// assert_eq!(tax, Decimal::from_str("30000").unwrap());
/// ```
pub fn compute_tax(taxable_income: Decimal, brackets: &[TaxBracket]) -> Decimal {
    compute_tax_by_tier(taxable_income, brackets)
        .iter()
        .fold(Decimal::ZERO, |total, tier| total.saturating_add(tier.tax))
}
