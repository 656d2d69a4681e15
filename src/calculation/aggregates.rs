//! Aggregate formulas evaluated once deductions are known.
//!
//! Invoice-style components such as `TOTAL_COST = GROSS_SALARY + PENSION`
//! reference deduction lines, so the resolver cannot fix them. After the
//! deductions are compiled their formulas are evaluated again over the
//! adjusted amounts, the deduction amounts and the final gross. The values are
//! reported alongside the result and never feed back into gross or net.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{AdjustedComponent, Component, ComponentKind, DeductionLine};

use super::expression::{Expr, VariableTable, parse};
use super::{GROSS_SALARY, round_money};

/// Evaluates formula components the resolver left unresolved.
///
/// `unresolved` names the formula components to retry. The variable table
/// holds every adjusted component amount, then every deduction amount whose
/// name is not already taken, then `GROSS_SALARY` unless a component of that
/// name exists. Aggregates may reference each other: up to `max_rounds`
/// rounds run, and a formula is evaluated once all of its aggregate
/// references have a value. A non-zero result fixes the value.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{apply_attendance, recalculate_aggregates, MAX_RESOLUTION_ROUNDS};
/// use payroll_engine::models::{
///     Component, ComponentCategory, ComponentKind, DeductionKind, DeductionLine, ResolvedComponent,
/// };
/// use rust_decimal::Decimal;
///
/// let basic = ResolvedComponent {
///     name: "BASIC_SALARY".to_string(),
///     kind: ComponentKind::Fixed,
///     category: ComponentCategory::Salary,
///     annual_amount: Decimal::from(1_200_000),
///     monthly_amount: Decimal::from(100_000),
///     resolved: true,
///     attendance_adjustable: true,
///     pensionable: true,
/// };
/// let adjusted = vec![apply_attendance(&basic, Decimal::ONE).unwrap()];
/// let pension = DeductionLine {
///     name: "PENSION".to_string(),
///     kind: DeductionKind::Percentage,
///     amount: Decimal::from(8_000),
/// };
///
/// let aggregates = recalculate_aggregates(
///     &[Component::formula("TOTAL_COST", "GROSS_SALARY + PENSION")],
///     &["TOTAL_COST"],
///     &adjusted,
///     &[pension],
///     Decimal::from(100_000),
///     MAX_RESOLUTION_ROUNDS,
/// );
/// assert_eq!(aggregates["TOTAL_COST"], Decimal::from(108_000));
/// ```
pub fn recalculate_aggregates(
    components: &[Component],
    unresolved: &[&str],
    adjusted: &[AdjustedComponent],
    deductions: &[DeductionLine],
    gross_salary: Decimal,
    max_rounds: u32,
) -> BTreeMap<String, Decimal> {
    let mut aggregates = BTreeMap::new();

    let candidates: Vec<(&str, &str)> = components
        .iter()
        .filter(|c| c.kind == ComponentKind::Formula && unresolved.contains(&c.name.as_str()))
        .filter_map(|c| c.formula.as_deref().map(|f| (c.name.as_str(), f)))
        .collect();

    if candidates.is_empty() {
        return aggregates;
    }

    let mut variables = VariableTable::new();
    for component in adjusted {
        variables.set(&component.name, component.adjusted_amount);
    }
    for line in deductions {
        if !variables.contains(&line.name) {
            variables.set(&line.name, line.amount);
        }
    }
    if !adjusted.iter().any(|c| c.name == GROSS_SALARY) {
        variables.set(GROSS_SALARY, gross_salary);
    }

    // Names are all present, so parse failures here are final.
    let parsed: Vec<(&str, Expr)> = candidates
        .into_iter()
        .filter_map(|(name, formula)| match parse(formula, &variables) {
            Ok(expr) => Some((name, expr)),
            Err(e) => {
                debug!(component = %name, error = %e, "Aggregate formula rejected");
                None
            }
        })
        .collect();

    let mut rounds = 0;
    while rounds < max_rounds && aggregates.len() < parsed.len() {
        rounds += 1;
        let mut fixed = 0;

        for (name, expr) in &parsed {
            if aggregates.contains_key(*name) {
                continue;
            }

            let waiting = expr.variables().iter().any(|reference| {
                parsed
                    .iter()
                    .any(|(other, _)| other == reference && !aggregates.contains_key(*other))
            });
            if waiting {
                continue;
            }

            match expr.evaluate(&variables) {
                Ok(value) if !value.is_zero() => {
                    let value = round_money(value);
                    debug!(component = %name, value = %value, round = rounds, "Aggregate recalculated");
                    variables.set(name, value);
                    aggregates.insert(name.to_string(), value);
                    fixed += 1;
                }
                Ok(_) => {}
                Err(e) => debug!(component = %name, error = %e, "Aggregate evaluation failed"),
            }
        }

        if fixed == 0 {
            break;
        }
    }

    aggregates
}
