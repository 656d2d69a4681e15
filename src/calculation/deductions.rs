//! Deduction compilation.
//!
//! Every rule yields one monthly amount rounded to 2 dp. Problems confined to
//! a single rule (a bad formula, an unknown kind, missing attendance) produce
//! a warning and a fallback amount instead of failing the calculation.

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::PayrollSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdjustedComponent, AttendanceContext, AuditWarning, DeductionKind, DeductionLine,
    DeductionRule, Employee, TaxBracketTable, TaxComputation,
};

use super::expression::{VariableTable, evaluate};
use super::progressive_tax::compute_tax;
use super::proration::to_monthly;
use super::taxable_income::compute_taxable_income;
use super::{
    GROSS_SALARY, MONTHS_PER_YEAR, WARNING_FORMULA_EVALUATION_FAILED, WARNING_MISSING_ATTENDANCE,
    WARNING_UNSUPPORTED_DEDUCTION, round_money,
};

/// Everything a deduction rule may draw on.
#[derive(Debug, Clone, Copy)]
pub struct DeductionContext<'a> {
    /// Components after attendance scaling.
    pub components: &'a [AdjustedComponent],
    /// Sum of adjusted component amounts.
    pub gross_salary: Decimal,
    /// The template's annual division factor.
    pub division_factor: Decimal,
    /// Attendance for the period, if known.
    pub attendance: Option<&'a AttendanceContext>,
    /// The employee being paid.
    pub employee: &'a Employee,
    /// Statutory rates.
    pub settings: &'a PayrollSettings,
    /// The bracket schedule in force.
    pub brackets: &'a TaxBracketTable,
}

/// Compiled deductions for one calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeductionOutcome {
    /// One line per rule, in rule order.
    pub lines: Vec<DeductionLine>,
    /// Sum of the rounded line amounts.
    pub total: Decimal,
    /// Rule-level degradations.
    pub warnings: Vec<AuditWarning>,
    /// Breakdown of the first tax rule, if any.
    pub tax: Option<TaxComputation>,
}

struct Compiler<'a> {
    context: &'a DeductionContext<'a>,
    warnings: Vec<AuditWarning>,
    tax: Option<TaxComputation>,
}

impl Compiler<'_> {
    fn warn(&mut self, code: &str, rule: &DeductionRule, message: String) {
        warn!(deduction = %rule.name, code = code, "{}", message);
        self.warnings.push(AuditWarning::new(code, message, "medium"));
    }

    fn amount(&mut self, rule: &DeductionRule) -> EngineResult<Decimal> {
        let context = self.context;

        match rule.kind {
            DeductionKind::Fixed => to_monthly(rule.rate_or_amount, context.division_factor),
            DeductionKind::FixedMonthly => Ok(rule.rate_or_amount),
            DeductionKind::Percentage => percent_of(context.gross_salary, rule.rate_or_amount),
            DeductionKind::Formula => self.formula(rule),
            DeductionKind::ProratedAnnual => self.prorated_annual(rule),
            DeductionKind::Tax => self.tax(rule),
            DeductionKind::Unsupported => {
                self.warn(
                    WARNING_UNSUPPORTED_DEDUCTION,
                    rule,
                    format!("Deduction '{}' has an unsupported kind; using 0", rule.name),
                );
                Ok(Decimal::ZERO)
            }
        }
    }

    fn formula(&mut self, rule: &DeductionRule) -> EngineResult<Decimal> {
        let context = self.context;

        if let Some(formula) = rule.formula.as_deref().filter(|f| !f.trim().is_empty()) {
            let mut variables: VariableTable = context
                .components
                .iter()
                .map(|c| (c.name.as_str(), c.adjusted_amount))
                .collect();

            if variables.get(GROSS_SALARY).is_none_or(|value| value.is_zero()) {
                variables.set(GROSS_SALARY, context.gross_salary);
            }

            return match evaluate(formula, &variables) {
                Ok(value) => Ok(value),
                Err(e) => {
                    self.warn(
                        WARNING_FORMULA_EVALUATION_FAILED,
                        rule,
                        format!("Deduction '{}' formula failed: {}; using 0", rule.name, e),
                    );
                    Ok(Decimal::ZERO)
                }
            };
        }

        if rule.dependent_component_names.is_empty() {
            return percent_of(context.gross_salary, rule.rate_or_amount);
        }

        let mut base = Decimal::ZERO;
        for name in &rule.dependent_component_names {
            let amount = if name == GROSS_SALARY {
                context.gross_salary
            } else if let Some(component) = context.components.iter().find(|c| &c.name == name) {
                component.adjusted_amount
            } else {
                self.warn(
                    WARNING_FORMULA_EVALUATION_FAILED,
                    rule,
                    format!(
                        "Deduction '{}' depends on unknown component '{}'; counted as 0",
                        rule.name, name
                    ),
                );
                Decimal::ZERO
            };
            base = base.checked_add(amount).ok_or_else(|| overflow(&rule.name))?;
        }

        percent_of(base, rule.rate_or_amount)
    }

    fn prorated_annual(&mut self, rule: &DeductionRule) -> EngineResult<Decimal> {
        let monthly = to_monthly(rule.rate_or_amount, MONTHS_PER_YEAR)?;

        match self.context.attendance {
            Some(attendance) => monthly
                .checked_mul(attendance.attendance_factor()?)
                .ok_or_else(|| overflow(&rule.name)),
            None => {
                self.warn(
                    WARNING_MISSING_ATTENDANCE,
                    rule,
                    format!(
                        "No attendance record for prorated deduction '{}'; using full monthly amount",
                        rule.name
                    ),
                );
                Ok(monthly)
            }
        }
    }

    fn tax(&mut self, rule: &DeductionRule) -> EngineResult<Decimal> {
        let context = self.context;

        let income = compute_taxable_income(context.components, context.employee, context.settings)?;
        let annual_tax = compute_tax(income.chargeable_income, context.brackets.brackets());
        let factor = match context.attendance {
            Some(attendance) => attendance.attendance_factor()?,
            None => Decimal::ONE,
        };
        let monthly_tax = to_monthly(annual_tax, MONTHS_PER_YEAR)?
            .checked_mul(factor)
            .map(round_money)
            .ok_or_else(|| overflow(&rule.name))?;

        if self.tax.is_none() {
            self.tax = Some(TaxComputation {
                annual_gross: income.annual_gross,
                pensionable_amount: income.pensionable_amount,
                pension_relief: income.pension_relief,
                nhis_relief: income.nhis_relief,
                rent_relief: income.rent_relief,
                total_relief: income.total_relief,
                chargeable_income: income.chargeable_income,
                annual_tax,
                monthly_tax,
            });
        }

        Ok(monthly_tax)
    }
}

fn percent_of(amount: Decimal, rate: Decimal) -> EngineResult<Decimal> {
    amount
        .checked_mul(rate)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("{}% of {} overflowed", rate, amount),
        })
}

fn overflow(name: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("Deduction '{}' overflowed", name),
    }
}

/// Computes every deduction rule against the adjusted components.
///
/// | Kind | Monthly amount |
/// |------|----------------|
/// | `Fixed` | `rate_or_amount / division_factor` |
/// | `FixedMonthly` | `rate_or_amount` |
/// | `Percentage` | `gross x rate%` |
/// | `Formula` | the formula over adjusted components and `GROSS_SALARY`; without a formula, `rate%` of the dependent components, or of gross |
/// | `ProratedAnnual` | `rate_or_amount / 12 x attendance factor` |
/// | `Tax` | progressive tax on chargeable income `/ 12 x attendance factor` |
/// | `Unsupported` | 0, with a warning |
///
/// Each amount is rounded to 2 dp before it is added to the total.
///
/// # Errors
///
/// Only arithmetic overflow and invalid attendance are fatal; see
/// [`EngineError`].
pub fn compute_deductions(
    rules: &[DeductionRule],
    context: &DeductionContext<'_>,
) -> EngineResult<DeductionOutcome> {
    let mut compiler = Compiler {
        context,
        warnings: Vec::new(),
        tax: None,
    };

    let mut lines = Vec::with_capacity(rules.len());
    let mut total = Decimal::ZERO;

    for rule in rules {
        let amount = round_money(compiler.amount(rule)?);
        total = total
            .checked_add(amount)
            .ok_or_else(|| overflow(&rule.name))?;

        lines.push(DeductionLine {
            name: rule.name.clone(),
            kind: rule.kind,
            amount,
        });
    }

    Ok(DeductionOutcome {
        lines,
        total,
        warnings: compiler.warnings,
        tax: compiler.tax,
    })
}
