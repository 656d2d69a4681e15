//! The payroll calculation pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ConfigLoader, PayrollSettings};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceContext, AuditStep, AuditTrace, AuditWarning, CalculationResult, Employee,
    PayTotals, TaxBracketTable, Template,
};

use super::aggregates::recalculate_aggregates;
use super::deductions::{DeductionContext, compute_deductions};
use super::proration::{adjust_components, gross_salary};
use super::resolver::resolve_components;
use super::{WARNING_MISSING_ATTENDANCE, WARNING_NEGATIVE_NET};

/// Calculates pay for one employee at a time.
///
/// The engine holds only read-only settings and the bracket table in force,
/// so one instance can be shared across threads for a whole payroll run.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use payroll_engine::calculation::PayrollEngine;
/// use payroll_engine::config::PayrollSettings;
/// use payroll_engine::models::{
///     AttendanceContext, Component, DeductionRule, Employee, TaxBracket, TaxBracketTable, Template,
/// };
/// use rust_decimal::Decimal;
///
/// let brackets = TaxBracketTable::new(vec![
///     TaxBracket::bounded(1, Decimal::ZERO, Decimal::from(800_000), Decimal::ZERO),
///     TaxBracket::unbounded(2, Decimal::from(800_000), Decimal::from(15)),
/// ])
/// .unwrap();
/// let engine = PayrollEngine::new(Arc::new(PayrollSettings::new()), Arc::new(brackets));
///
/// let template = Template::new(
///     "tpl_001",
///     "Grade A",
///     vec![Component::fixed("BASIC_SALARY", Decimal::from(600_000))],
///     vec![DeductionRule::percentage("PENSION", Decimal::from(8))],
/// );
/// let attendance = AttendanceContext::new(Decimal::from(30), Decimal::from(30)).unwrap();
///
/// let result = engine
///     .calculate(&Employee::new("emp_001", "Ada Obi"), &template, Some(&attendance))
///     .unwrap();
/// assert_eq!(result.totals.gross_salary, Decimal::from(50_000));
/// assert_eq!(result.totals.net_salary, Decimal::from(46_000));
/// ```
#[derive(Debug, Clone)]
pub struct PayrollEngine {
    settings: Arc<PayrollSettings>,
    brackets: Arc<TaxBracketTable>,
}

impl PayrollEngine {
    /// Creates an engine over shared settings and brackets.
    pub fn new(settings: Arc<PayrollSettings>, brackets: Arc<TaxBracketTable>) -> Self {
        Self { settings, brackets }
    }

    /// Creates an engine from loaded configuration, using the bracket schedule
    /// in force on `period_end`.
    pub fn from_config(loader: &ConfigLoader, period_end: NaiveDate) -> EngineResult<Self> {
        let brackets = loader.brackets_effective_on(period_end)?;
        Ok(Self::new(
            Arc::new(loader.settings().clone()),
            Arc::new(brackets),
        ))
    }

    /// Returns the settings in use.
    pub fn settings(&self) -> &PayrollSettings {
        &self.settings
    }

    /// Returns the bracket table in use.
    pub fn brackets(&self) -> &TaxBracketTable {
        &self.brackets
    }

    /// Calculates one employee's pay from a template.
    ///
    /// Without an attendance record every component is paid in full and a
    /// `MISSING_ATTENDANCE` warning is attached.
    ///
    /// # Errors
    ///
    /// - `TemplateIncomplete` if the template fails validation
    /// - `InvalidAttendance` if `total_days` is below one
    /// - `CalculationError` on arithmetic overflow
    pub fn calculate(
        &self,
        employee: &Employee,
        template: &Template,
        attendance: Option<&AttendanceContext>,
    ) -> EngineResult<CalculationResult> {
        let start_time = Instant::now();
        let mut steps: Vec<AuditStep> = Vec::new();
        let mut warnings: Vec<AuditWarning> = Vec::new();

        template.validate()?;
        if let Some(attendance) = attendance {
            attendance.validate()?;
        }

        debug!(
            employee_id = %employee.id,
            template_id = %template.id,
            components = template.components.len(),
            deductions = template.deductions.len(),
            "Starting calculation"
        );

        // Resolution
        let max_rounds = self.settings.max_resolution_rounds();
        let resolution = resolve_components(
            &template.components,
            template.annual_division_factor,
            max_rounds,
        )?;

        let unresolved = resolution.unresolved();
        steps.push(AuditStep {
            step_number: next_step(&steps),
            rule_id: "component_resolution".to_string(),
            rule_name: "Component Resolution".to_string(),
            input: serde_json::json!({
                "components": template.components.len(),
                "division_factor": template.annual_division_factor.to_string(),
                "max_rounds": max_rounds
            }),
            output: serde_json::json!({
                "rounds": resolution.rounds,
                "monthly_amounts": resolution
                    .components
                    .iter()
                    .map(|c| (c.name.clone(), c.monthly_amount.to_string()))
                    .collect::<BTreeMap<_, _>>(),
                "unresolved": unresolved
            }),
            reasoning: if unresolved.is_empty() {
                format!(
                    "Resolved {} component(s) in {} round(s)",
                    resolution.components.len(),
                    resolution.rounds
                )
            } else {
                format!(
                    "{} component(s) unresolved after {} round(s): {}",
                    unresolved.len(),
                    resolution.rounds,
                    unresolved.join(", ")
                )
            },
        });
        warnings.extend(resolution.warnings.iter().cloned());

        // Attendance
        let attendance_factor = match attendance {
            Some(attendance) => attendance.attendance_factor()?,
            None => {
                let message = format!(
                    "No attendance record for employee '{}'; components paid in full",
                    employee.id
                );
                warn!(employee_id = %employee.id, "{}", message);
                warnings.push(AuditWarning::new(WARNING_MISSING_ATTENDANCE, message, "low"));
                Decimal::ONE
            }
        };

        let components = adjust_components(&resolution.components, attendance_factor)?;
        let gross = gross_salary(&components)?;

        steps.push(AuditStep {
            step_number: next_step(&steps),
            rule_id: "attendance_adjustment".to_string(),
            rule_name: "Attendance Adjustment".to_string(),
            input: serde_json::json!({
                "days_worked": attendance.map(|a| a.days_worked.to_string()),
                "total_days": attendance.map(|a| a.total_days.to_string())
            }),
            output: serde_json::json!({
                "attendance_factor": attendance_factor.to_string(),
                "gross_salary": gross.to_string()
            }),
            reasoning: format!(
                "Applied attendance factor {} to adjustable components; gross salary {}",
                attendance_factor, gross
            ),
        });

        // Deductions
        let context = DeductionContext {
            components: &components,
            gross_salary: gross,
            division_factor: template.annual_division_factor,
            attendance,
            employee,
            settings: self.settings.as_ref(),
            brackets: self.brackets.as_ref(),
        };
        let outcome = compute_deductions(&template.deductions, &context)?;
        warnings.extend(outcome.warnings.iter().cloned());

        if let Some(tax) = &outcome.tax {
            steps.push(AuditStep {
                step_number: next_step(&steps),
                rule_id: "progressive_tax".to_string(),
                rule_name: "Progressive Tax".to_string(),
                input: serde_json::json!({
                    "annual_gross": tax.annual_gross.to_string(),
                    "total_relief": tax.total_relief.to_string(),
                    "brackets": self.brackets.brackets().len()
                }),
                output: serde_json::json!({
                    "chargeable_income": tax.chargeable_income.to_string(),
                    "annual_tax": tax.annual_tax.to_string(),
                    "monthly_tax": tax.monthly_tax.to_string()
                }),
                reasoning: format!(
                    "Tax on chargeable income {} is {} a year, {} this period",
                    tax.chargeable_income, tax.annual_tax, tax.monthly_tax
                ),
            });
        }

        steps.push(AuditStep {
            step_number: next_step(&steps),
            rule_id: "deductions".to_string(),
            rule_name: "Deductions".to_string(),
            input: serde_json::json!({
                "rules": template.deductions.len(),
                "gross_salary": gross.to_string()
            }),
            output: serde_json::json!({
                "amounts": outcome
                    .lines
                    .iter()
                    .map(|line| (line.name.clone(), line.amount.to_string()))
                    .collect::<BTreeMap<_, _>>(),
                "total": outcome.total.to_string()
            }),
            reasoning: format!(
                "Compiled {} deduction(s) totalling {}",
                outcome.lines.len(),
                outcome.total
            ),
        });

        // Aggregates
        let aggregates = recalculate_aggregates(
            &template.components,
            &unresolved,
            &components,
            &outcome.lines,
            gross,
            max_rounds,
        );

        if !aggregates.is_empty() {
            steps.push(AuditStep {
                step_number: next_step(&steps),
                rule_id: "aggregate_recalculation".to_string(),
                rule_name: "Aggregate Recalculation".to_string(),
                input: serde_json::json!({
                    "unresolved": unresolved,
                    "gross_salary": gross.to_string(),
                    "deductions": outcome.lines.len()
                }),
                output: serde_json::json!({
                    "aggregates": aggregates
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_string()))
                        .collect::<BTreeMap<_, _>>()
                }),
                reasoning: format!(
                    "Recalculated {} aggregate formula(s) with deduction amounts and final gross; gross and net unchanged",
                    aggregates.len()
                ),
            });
        }

        // Totals
        let net_salary = gross
            .checked_sub(outcome.total)
            .ok_or_else(|| overflow("Net salary"))?;
        let credit_to_bank = gross
            .checked_add(outcome.total)
            .ok_or_else(|| overflow("Credit to bank"))?;

        if net_salary < Decimal::ZERO {
            let message = format!(
                "Deductions of {} exceed gross salary of {}",
                outcome.total, gross
            );
            warn!(employee_id = %employee.id, "{}", message);
            warnings.push(AuditWarning::new(WARNING_NEGATIVE_NET, message, "high"));
        }

        let duration_us = start_time.elapsed().as_micros() as u64;

        info!(
            employee_id = %employee.id,
            template_id = %template.id,
            gross_salary = %gross,
            net_salary = %net_salary,
            warnings = warnings.len(),
            duration_us = duration_us,
            "Calculation completed"
        );

        Ok(CalculationResult {
            calculation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            employee_id: employee.id.clone(),
            template_id: template.id.clone(),
            attendance: attendance.copied(),
            attendance_factor,
            components,
            deductions: outcome.lines,
            totals: PayTotals {
                gross_salary: gross,
                total_deductions: outcome.total,
                net_salary,
                credit_to_bank,
            },
            tax: outcome.tax,
            aggregates,
            audit_trace: AuditTrace {
                steps,
                warnings,
                duration_us,
            },
        })
    }
}

fn next_step(steps: &[AuditStep]) -> u32 {
    steps.len() as u32 + 1
}

fn overflow(what: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("{} overflowed", what),
    }
}
