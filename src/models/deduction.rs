//! Deduction rule model.
//!
//! Deduction rules describe statutory and contractual withholdings. They are
//! evaluated after components have been resolved and adjusted for attendance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a deduction rule's amount is derived.
///
/// Unrecognized kinds deserialize to [`DeductionKind::Unsupported`] so that a
/// single bad rule contributes zero instead of rejecting the whole template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionKind {
    /// Annual amount divided by the template's division factor.
    Fixed,
    /// Monthly amount used as-is.
    FixedMonthly,
    /// Percentage of gross salary.
    Percentage,
    /// Arithmetic formula, or a percentage of named components.
    Formula,
    /// Annual amount divided by 12 and prorated by attendance.
    ProratedAnnual,
    /// Progressive income tax (PAYE) on chargeable income.
    Tax,
    /// Any kind this engine does not understand.
    #[serde(other)]
    Unsupported,
}

/// A single deduction rule of a template.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{DeductionKind, DeductionRule};
/// use rust_decimal::Decimal;
///
/// let pension = DeductionRule::formula("PENSION", "(BASIC_SALARY + HOUSING) * 0.08");
/// assert_eq!(pension.kind, DeductionKind::Formula);
///
/// let levy = DeductionRule::fixed_monthly("UNION_DUES", Decimal::from(1_500));
/// assert_eq!(levy.rate_or_amount, Decimal::from(1_500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRule {
    /// The deduction name, used as the key in the result.
    pub name: String,
    /// How the amount is derived.
    pub kind: DeductionKind,
    /// An amount or a percentage rate, depending on `kind`.
    #[serde(default)]
    pub rate_or_amount: Decimal,
    /// The expression for formula deductions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Components whose amounts form the base of a rate-driven formula deduction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_component_names: Vec<String>,
}

impl DeductionRule {
    fn new(name: impl Into<String>, kind: DeductionKind, rate_or_amount: Decimal) -> Self {
        Self {
            name: name.into(),
            kind,
            rate_or_amount,
            formula: None,
            dependent_component_names: Vec::new(),
        }
    }

    /// An annual amount spread over the template's division factor.
    pub fn fixed(name: impl Into<String>, annual_amount: Decimal) -> Self {
        Self::new(name, DeductionKind::Fixed, annual_amount)
    }

    /// A monthly amount applied unchanged.
    pub fn fixed_monthly(name: impl Into<String>, monthly_amount: Decimal) -> Self {
        Self::new(name, DeductionKind::FixedMonthly, monthly_amount)
    }

    /// A percentage of gross salary.
    pub fn percentage(name: impl Into<String>, rate: Decimal) -> Self {
        Self::new(name, DeductionKind::Percentage, rate)
    }

    /// A formula evaluated against adjusted components and `GROSS_SALARY`.
    pub fn formula(name: impl Into<String>, formula: impl Into<String>) -> Self {
        let mut rule = Self::new(name, DeductionKind::Formula, Decimal::ZERO);
        rule.formula = Some(formula.into());
        rule
    }

    /// A rate applied to the sum of the named components.
    pub fn rate_of_components<I, S>(name: impl Into<String>, rate: Decimal, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = Self::new(name, DeductionKind::Formula, rate);
        rule.dependent_component_names = components.into_iter().map(Into::into).collect();
        rule
    }

    /// An annual amount divided by 12 and prorated by attendance.
    pub fn prorated_annual(name: impl Into<String>, annual_amount: Decimal) -> Self {
        Self::new(name, DeductionKind::ProratedAnnual, annual_amount)
    }

    /// Progressive PAYE tax.
    pub fn tax(name: impl Into<String>) -> Self {
        Self::new(name, DeductionKind::Tax, Decimal::ZERO)
    }
}
