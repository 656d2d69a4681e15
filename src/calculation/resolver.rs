//! Component resolution by fixed-point relaxation.
//!
//! Fixed components are known up front. Formula components start at zero and
//! are retried over a bounded number of rounds until no round makes progress.
//! Percentage components are applied last, against the resolved base.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditWarning, Component, ComponentKind, ResolvedComponent};

use super::expression::{EvaluationError, Expr, VariableTable, parse};
use super::proration::to_monthly;
use super::{GROSS_SALARY, WARNING_UNRESOLVED_COMPONENT};

/// Default cap on resolution rounds.
pub const MAX_RESOLUTION_ROUNDS: u32 = 5;

/// The outcome of resolving a template's components.
#[derive(Debug, Clone)]
pub struct ComponentResolution {
    /// Components in template order.
    pub components: Vec<ResolvedComponent>,
    /// Number of rounds that ran.
    pub rounds: u32,
    /// One warning per formula left unresolved.
    pub warnings: Vec<AuditWarning>,
}

impl ComponentResolution {
    /// Looks up a resolved component by name.
    pub fn get(&self, name: &str) -> Option<&ResolvedComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Names of formula components that never produced a value.
    pub fn unresolved(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| !c.resolved)
            .map(|c| c.name.as_str())
            .collect()
    }
}

struct Resolver<'a> {
    components: &'a [Component],
    index: HashMap<&'a str, usize>,
    parsed: Vec<Option<Result<Expr, EvaluationError>>>,
    monthly: Vec<Decimal>,
    resolved: Vec<bool>,
    errors: Vec<Option<EvaluationError>>,
    variables: VariableTable,
}

impl<'a> Resolver<'a> {
    fn new(components: &'a [Component], division_factor: Decimal) -> EngineResult<Self> {
        let mut monthly = Vec::with_capacity(components.len());
        let mut resolved = Vec::with_capacity(components.len());
        let mut variables = VariableTable::new();
        let mut fixed_total = Decimal::ZERO;

        for component in components {
            let amount = match component.kind {
                ComponentKind::Fixed => {
                    let amount = to_monthly(component.value, division_factor)?;
                    fixed_total = fixed_total.checked_add(amount).ok_or_else(|| {
                        EngineError::CalculationError {
                            message: "Sum of fixed components overflowed".to_string(),
                        }
                    })?;
                    amount
                }
                ComponentKind::Percentage | ComponentKind::Formula => Decimal::ZERO,
            };

            monthly.push(amount);
            resolved.push(component.kind == ComponentKind::Fixed);
            variables.set(&component.name, amount);
        }

        if !variables.contains(GROSS_SALARY) {
            variables.set(GROSS_SALARY, fixed_total);
        }

        let index = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();

        // Every name is already in the table, so parsing once is enough.
        let parsed: Vec<_> = components
            .iter()
            .map(|c| match (c.kind, c.formula.as_deref()) {
                (ComponentKind::Formula, Some(formula)) => Some(parse(formula, &variables)),
                _ => None,
            })
            .collect();

        let errors = parsed
            .iter()
            .map(|p| match p {
                Some(Err(e)) => Some(e.clone()),
                _ => None,
            })
            .collect();

        Ok(Self {
            components,
            index,
            parsed,
            monthly,
            resolved,
            errors,
            variables,
        })
    }

    fn is_pending(&self, i: usize) -> bool {
        self.components[i].kind == ComponentKind::Formula && !self.resolved[i]
    }

    fn has_unresolved_formulas(&self) -> bool {
        (0..self.components.len()).any(|i| self.is_pending(i))
    }

    /// True if every component the expression references already has its value.
    fn is_ready(&self, expr: &Expr) -> bool {
        expr.variables().iter().all(|name| {
            self.index
                .get(name)
                .is_none_or(|&i| self.resolved[i])
        })
    }

    /// Pending formulas referenced by component `i`.
    fn pending_references(&self, i: usize) -> Vec<usize> {
        match &self.parsed[i] {
            Some(Ok(expr)) => expr
                .variables()
                .into_iter()
                .filter_map(|name| self.index.get(name).copied())
                .filter(|&j| self.is_pending(j))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True if component `i` reaches itself through pending references.
    fn on_cycle(&self, i: usize) -> bool {
        let mut seen = vec![false; self.components.len()];
        let mut stack = self.pending_references(i);

        while let Some(j) = stack.pop() {
            if j == i {
                return true;
            }
            if !seen[j] {
                seen[j] = true;
                stack.extend(self.pending_references(j));
            }
        }

        false
    }

    /// Evaluates formula `i`, fixing it on a non-zero result.
    ///
    /// With `require_ready` set the formula is skipped unless all of its
    /// references are resolved. Otherwise unresolved references read as zero.
    fn try_resolve(&mut self, i: usize, require_ready: bool) -> bool {
        let components = self.components;
        let component = &components[i];
        let outcome = match &self.parsed[i] {
            Some(Ok(expr)) if !require_ready || self.is_ready(expr) => {
                expr.evaluate(&self.variables)
            }
            _ => return false,
        };

        match outcome {
            Ok(value) if !value.is_zero() => {
                debug!(
                    component = %component.name,
                    value = %value,
                    bootstrap = !require_ready,
                    "Formula component resolved"
                );
                self.monthly[i] = value;
                self.resolved[i] = true;
                self.errors[i] = None;
                self.variables.set(&component.name, value);
                true
            }
            Ok(_) => false,
            Err(e) => {
                self.errors[i] = Some(e);
                false
            }
        }
    }

    /// Evaluates every pending formula whose references are all resolved.
    fn ready_pass(&mut self) -> usize {
        (0..self.components.len())
            .filter(|&i| self.is_pending(i) && self.try_resolve(i, true))
            .count()
    }

    /// Fixes a single pending formula with unresolved references read as zero.
    ///
    /// Members of a reference cycle are tried first, in template order, so an
    /// aggregate over a cycle waits for the cycle's real values. Other
    /// formulas are only tried when no cycle member yields a value.
    fn bootstrap_pass(&mut self) -> usize {
        let (cyclic, acyclic): (Vec<usize>, Vec<usize>) = (0..self.components.len())
            .filter(|&i| self.is_pending(i))
            .partition(|&i| self.on_cycle(i));

        for i in cyclic.into_iter().chain(acyclic) {
            if self.try_resolve(i, false) {
                return 1;
            }
        }

        0
    }

    fn unresolved_warning(&self, i: usize, rounds: u32) -> AuditWarning {
        let component = &self.components[i];
        let reason = match (&self.errors[i], component.has_formula()) {
            (Some(e), _) => format!(": {}", e),
            (None, false) => ": no formula defined".to_string(),
            (None, true) => ": formula evaluated to zero".to_string(),
        };

        warn!(
            component = %component.name,
            rounds = rounds,
            "Formula component left unresolved{}", reason
        );

        AuditWarning::new(
            WARNING_UNRESOLVED_COMPONENT,
            format!(
                "Component '{}' unresolved after {} round(s){}; using 0",
                component.name, rounds, reason
            ),
            "medium",
        )
    }
}

/// Resolves every component of a template to a monthly amount.
///
/// Formula components are retried for at most `max_rounds` rounds. Each round
/// first evaluates the formulas whose references are all known. If none of
/// those make progress, one formula is fixed with unresolved references read
/// as zero, preferring members of a reference cycle. A formula is fixed by
/// its first non-zero result.
/// Resolution stops at the first round that fixes nothing. Formulas that are
/// still unresolved stay at zero and produce an `UNRESOLVED_COMPONENT`
/// warning.
///
/// `GROSS_SALARY` is available to formulas as the sum of the fixed monthly
/// amounts unless a component of that name exists. Percentage components are
/// computed after the fixed point as `rate% x (fixed + formula amounts)`.
///
/// # Errors
///
/// Returns [`EngineError::CalculationError`] if `division_factor` is not
/// positive or an amount overflows.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{MAX_RESOLUTION_ROUNDS, resolve_components};
/// use payroll_engine::models::Component;
/// use rust_decimal::Decimal;
///
/// let components = vec![
///     Component::formula("TOTAL", "BASIC_SALARY + HOUSING"),
///     Component::fixed("BASIC_SALARY", Decimal::from(600_000)),
///     Component::formula("HOUSING", "BASIC_SALARY * 0.5"),
/// ];
///
/// let resolution =
///     resolve_components(&components, Decimal::from(12), MAX_RESOLUTION_ROUNDS).unwrap();
/// assert_eq!(resolution.get("TOTAL").unwrap().monthly_amount, Decimal::from(75_000));
/// ```
pub fn resolve_components(
    components: &[Component],
    division_factor: Decimal,
    max_rounds: u32,
) -> EngineResult<ComponentResolution> {
    let mut resolver = Resolver::new(components, division_factor)?;
    let mut rounds = 0;

    while rounds < max_rounds && resolver.has_unresolved_formulas() {
        rounds += 1;

        let mut fixed = resolver.ready_pass();
        if fixed == 0 {
            fixed = resolver.bootstrap_pass();
        }

        debug!(round = rounds, fixed = fixed, "Resolution round complete");

        if fixed == 0 {
            break;
        }
    }

    let base = components
        .iter()
        .zip(&resolver.monthly)
        .filter(|(c, _)| c.kind != ComponentKind::Percentage)
        .try_fold(Decimal::ZERO, |total, (_, &amount)| total.checked_add(amount))
        .ok_or_else(|| overflow("Base salary"))?;

    let mut warnings = Vec::new();
    let mut resolved = Vec::with_capacity(components.len());

    for (i, component) in components.iter().enumerate() {
        let monthly = match component.kind {
            ComponentKind::Percentage => component
                .value
                .checked_mul(base)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(|| overflow(&component.name))?,
            _ => resolver.monthly[i],
        };

        let is_resolved = component.kind != ComponentKind::Formula || resolver.resolved[i];
        if !is_resolved {
            warnings.push(resolver.unresolved_warning(i, rounds));
        }

        let annual_amount = match component.kind {
            ComponentKind::Fixed => component.value,
            _ => monthly
                .checked_mul(division_factor)
                .ok_or_else(|| overflow(&component.name))?,
        };

        resolved.push(ResolvedComponent {
            name: component.name.clone(),
            kind: component.kind,
            category: component.category,
            annual_amount,
            monthly_amount: monthly,
            resolved: is_resolved,
            attendance_adjustable: component.attendance_adjustable,
            pensionable: component.pensionable,
        });
    }

    Ok(ComponentResolution {
        components: resolved,
        rounds,
        warnings,
    })
}

fn overflow(what: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("Amount for '{}' overflowed", what),
    }
}
