//! Pay template model and validation.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{Component, ComponentCategory, ComponentKind, DeductionRule};

/// The default number of pay periods an annual amount is spread over.
pub const DEFAULT_ANNUAL_DIVISION_FACTOR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

fn default_division_factor() -> Decimal {
    DEFAULT_ANNUAL_DIVISION_FACTOR
}

/// An immutable pay template: ordered components plus deduction rules.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Component, DeductionRule, Template};
/// use rust_decimal::Decimal;
///
/// let template = Template::new(
///     "tpl_001",
///     "Grade A",
///     vec![Component::fixed("BASIC_SALARY", Decimal::from(600_000))],
///     vec![DeductionRule::percentage("PENSION", Decimal::from(8))],
/// );
/// assert!(template.validate().is_ok());
/// assert_eq!(template.annual_division_factor, Decimal::from(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier for the template.
    pub id: String,
    /// Human-readable template name.
    pub name: String,
    /// Number of pay periods an annual amount is divided into.
    #[serde(default = "default_division_factor")]
    pub annual_division_factor: Decimal,
    /// The ordered pay components.
    pub components: Vec<Component>,
    /// The deduction rules.
    #[serde(default)]
    pub deductions: Vec<DeductionRule>,
}

impl Template {
    /// Creates a template with the default division factor of 12.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        components: Vec<Component>,
        deductions: Vec<DeductionRule>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            annual_division_factor: DEFAULT_ANNUAL_DIVISION_FACTOR,
            components,
            deductions,
        }
    }

    /// Checks that the template can be calculated.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TemplateIncomplete`] when the template has no
    /// salary component, no deduction rule, a formula component without a
    /// formula, duplicate component names, or a non-positive division factor.
    pub fn validate(&self) -> EngineResult<()> {
        if self.annual_division_factor <= Decimal::ZERO {
            return Err(self.incomplete(format!(
                "annual division factor must be positive, got {}",
                self.annual_division_factor
            )));
        }

        if self.components.is_empty() {
            return Err(self.incomplete("no components defined"));
        }

        if !self
            .components
            .iter()
            .any(|c| c.category == ComponentCategory::Salary)
        {
            return Err(self.incomplete("at least one salary component is required"));
        }

        if self.deductions.is_empty() {
            return Err(self.incomplete("at least one deduction rule is required"));
        }

        let mut seen = HashSet::new();
        for component in &self.components {
            if component.name.trim().is_empty() {
                return Err(self.incomplete("component with an empty name"));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(self.incomplete(format!(
                    "duplicate component name '{}'",
                    component.name
                )));
            }
            if component.kind == ComponentKind::Formula && !component.has_formula() {
                return Err(self.incomplete(format!(
                    "component '{}' is formula-typed but has no formula",
                    component.name
                )));
            }
        }

        Ok(())
    }

    fn incomplete(&self, reason: impl Into<String>) -> EngineError {
        EngineError::TemplateIncomplete {
            template_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}
