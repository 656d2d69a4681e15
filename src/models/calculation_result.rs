//! Calculation result models for the payroll engine.
//!
//! This module contains the [`CalculationResult`] type and its associated structures
//! that capture all outputs from a pay calculation, including resolved components,
//! deductions, totals, and audit traces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AttendanceContext, ComponentCategory, ComponentKind};

/// A component after the resolver has fixed its monthly amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedComponent {
    /// The component name.
    pub name: String,
    /// The component kind from the template.
    pub kind: ComponentKind,
    /// The payroll category.
    pub category: ComponentCategory,
    /// The annual amount (monthly amount times the division factor for derived kinds).
    pub annual_amount: Decimal,
    /// The unrounded monthly amount before attendance.
    pub monthly_amount: Decimal,
    /// False for formula components that never produced a non-zero value.
    pub resolved: bool,
    /// Whether attendance scaling applies.
    pub attendance_adjustable: bool,
    /// Whether the component counts toward the pensionable amount.
    pub pensionable: bool,
}

/// A component after attendance scaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedComponent {
    /// The component name.
    pub name: String,
    /// The component kind from the template.
    pub kind: ComponentKind,
    /// The payroll category.
    pub category: ComponentCategory,
    /// The annual amount before proration.
    pub annual_amount: Decimal,
    /// The monthly amount before attendance, rounded to 2 dp.
    pub base_amount: Decimal,
    /// The monthly amount after attendance, rounded to 2 dp.
    pub adjusted_amount: Decimal,
    /// `adjusted_amount - base_amount`; never positive.
    pub adjustment: Decimal,
    /// The factor that was applied.
    pub attendance_factor: Decimal,
    /// Whether the component counts toward the pensionable amount.
    pub pensionable: bool,
}

/// One compiled deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionLine {
    /// The deduction name from the template.
    pub name: String,
    /// The rule kind that produced the amount.
    pub kind: super::DeductionKind,
    /// The monthly amount, rounded to 2 dp.
    pub amount: Decimal,
}

/// The breakdown behind a progressive tax deduction (annual unless noted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComputation {
    /// Annual salary and allowances, excluding reimbursables.
    pub annual_gross: Decimal,
    /// Annual pensionable amount.
    pub pensionable_amount: Decimal,
    /// Relief for pension contributions.
    pub pension_relief: Decimal,
    /// Relief for health insurance contributions.
    pub nhis_relief: Decimal,
    /// Relief for rent paid, after the cap.
    pub rent_relief: Decimal,
    /// Sum of all reliefs.
    pub total_relief: Decimal,
    /// Income the bracket schedule is applied to.
    pub chargeable_income: Decimal,
    /// Tax due for the year.
    pub annual_tax: Decimal,
    /// Tax for this month after proration, rounded to 2 dp.
    pub monthly_tax: Decimal,
}

/// Aggregated totals for a pay calculation.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayTotals;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let totals = PayTotals {
///     gross_salary: Decimal::from_str("65000.00").unwrap(),
///     total_deductions: Decimal::from_str("5200.00").unwrap(),
///     net_salary: Decimal::from_str("59800.00").unwrap(),
///     credit_to_bank: Decimal::from_str("70200.00").unwrap(),
/// };
/// assert_eq!(totals.net_salary + totals.total_deductions, totals.gross_salary);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayTotals {
    /// Sum of all adjusted component amounts.
    pub gross_salary: Decimal,
    /// Sum of the individually rounded deductions.
    pub total_deductions: Decimal,
    /// `gross_salary - total_deductions`.
    pub net_salary: Decimal,
    /// Employer payable: `gross_salary + total_deductions`.
    pub credit_to_bank: Decimal,
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the stage that ran.
    pub rule_id: String,
    /// The human-readable name of the stage.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate degradations that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

impl AuditWarning {
    /// Creates a new warning.
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: severity.into(),
        }
    }
}

/// The complete audit trace for a calculation.
///
/// # Example
///
/// ```
/// use payroll_engine::models::AuditTrace;
///
/// let trace = AuditTrace {
///     steps: vec![],
///     warnings: vec![],
///     duration_us: 1234,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// The complete result of a pay calculation.
///
/// Produced fresh per call and never mutated by the engine afterwards. The
/// whole structure serializes to JSON for audit snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The ID of the employee the calculation is for.
    pub employee_id: String,
    /// The ID of the template that was applied.
    pub template_id: String,
    /// The attendance record used, if any.
    pub attendance: Option<AttendanceContext>,
    /// The factor applied to attendance-adjustable components.
    pub attendance_factor: Decimal,
    /// Components in template order, after attendance scaling.
    pub components: Vec<AdjustedComponent>,
    /// Deductions in template order.
    pub deductions: Vec<DeductionLine>,
    /// Aggregated totals.
    pub totals: PayTotals,
    /// The tax breakdown, when the template has a tax deduction.
    pub tax: Option<TaxComputation>,
    /// Formula components evaluated after deductions, by name. Informational
    /// only; they are not part of gross or net.
    #[serde(default)]
    pub aggregates: BTreeMap<String, Decimal>,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

/// Absolute tolerance used when cross-checking totals.
const VERIFY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

impl CalculationResult {
    /// Looks up a deduction amount by name.
    pub fn deduction(&self, name: &str) -> Option<Decimal> {
        self.deductions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.amount)
    }

    /// Looks up a recalculated aggregate by name.
    pub fn aggregate(&self, name: &str) -> Option<Decimal> {
        self.aggregates.get(name).copied()
    }

    /// Looks up an adjusted component by name.
    pub fn component(&self, name: &str) -> Option<&AdjustedComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Returns the warnings raised during the calculation.
    pub fn warnings(&self) -> &[AuditWarning] {
        &self.audit_trace.warnings
    }

    /// Cross-checks the result for internal consistency.
    ///
    /// Returns a list of problems; an empty list means the result is
    /// consistent.
    pub fn verify(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let totals = &self.totals;

        if totals.gross_salary < Decimal::ZERO {
            problems.push("Gross salary cannot be negative".to_string());
        }

        if totals.net_salary < Decimal::ZERO {
            problems.push("Net salary is negative - deductions exceed gross salary".to_string());
        }

        if self.attendance_factor < Decimal::ZERO || self.attendance_factor > Decimal::ONE {
            problems.push("Attendance factor must be between 0 and 1".to_string());
        }

        let component_sum: Decimal = self.components.iter().map(|c| c.adjusted_amount).sum();
        if (component_sum - totals.gross_salary).abs() > VERIFY_TOLERANCE {
            problems.push("Gross salary does not match the sum of components".to_string());
        }

        let deduction_sum: Decimal = self.deductions.iter().map(|d| d.amount).sum();
        if (deduction_sum - totals.total_deductions).abs() > VERIFY_TOLERANCE {
            problems.push("Total deductions calculation mismatch".to_string());
        }

        if (totals.gross_salary - totals.total_deductions - totals.net_salary).abs()
            > VERIFY_TOLERANCE
        {
            problems.push("Net salary calculation mismatch".to_string());
        }

        if (totals.gross_salary + totals.total_deductions - totals.credit_to_bank).abs()
            > VERIFY_TOLERANCE
        {
            problems.push("Credit to bank calculation mismatch".to_string());
        }

        problems
    }
}
