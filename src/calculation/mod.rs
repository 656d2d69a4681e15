//! Calculation logic for the payroll engine.
//!
//! A calculation runs in stages, each in its own module:
//!
//! 1. [`resolve_components`] turns template components into monthly amounts,
//!    evaluating formulas with the [`expression`] evaluator.
//! 2. [`adjust_components`] scales attendance-adjustable components.
//! 3. [`compute_deductions`] compiles each deduction rule, including
//!    progressive tax via [`compute_taxable_income`] and [`compute_tax`].
//! 4. [`recalculate_aggregates`] evaluates formulas that read deduction amounts.
//! 5. [`PayrollEngine`] ties the stages together and records the audit trace.

pub mod expression;

mod aggregates;
mod deductions;
mod engine;
mod progressive_tax;
mod proration;
mod resolver;
mod taxable_income;

use rust_decimal::{Decimal, RoundingStrategy};

pub use aggregates::recalculate_aggregates;
pub use deductions::{DeductionContext, DeductionOutcome, compute_deductions};
pub use engine::PayrollEngine;
pub use expression::{
    BinaryOperator, EvaluationError, Expr, Lexer, MAX_FORMULA_LENGTH, Parser, Token,
    VariableTable, evaluate, parse,
};
pub use progressive_tax::{TierTax, compute_tax, compute_tax_by_tier};
pub use proration::{adjust_components, apply_attendance, gross_salary, to_monthly};
pub use resolver::{ComponentResolution, MAX_RESOLUTION_ROUNDS, resolve_components};
pub use taxable_income::{TaxableIncome, compute_taxable_income};

/// Pseudo-variable holding gross salary in formulas.
///
/// A component with this exact name takes precedence over the computed value.
pub const GROSS_SALARY: &str = "GROSS_SALARY";

/// Months used to spread annual tax and prorated deductions.
pub const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Warning code: a formula component never produced a value.
pub const WARNING_UNRESOLVED_COMPONENT: &str = "UNRESOLVED_COMPONENT";
/// Warning code: proration was requested without an attendance record.
pub const WARNING_MISSING_ATTENDANCE: &str = "MISSING_ATTENDANCE";
/// Warning code: a deduction kind the engine does not know.
pub const WARNING_UNSUPPORTED_DEDUCTION: &str = "UNSUPPORTED_DEDUCTION";
/// Warning code: a deduction formula could not be evaluated.
pub const WARNING_FORMULA_EVALUATION_FAILED: &str = "FORMULA_EVALUATION_FAILED";
/// Warning code: net salary came out negative.
pub const WARNING_NEGATIVE_NET: &str = "NEGATIVE_NET_SALARY";

/// Rounds a money amount to 2 dp, half away from zero.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::round_money;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_money(Decimal::new(83434098, 3)), Decimal::new(8343410, 2));
/// assert_eq!(round_money(Decimal::new(-5, 3)), Decimal::new(-1, 2));
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
