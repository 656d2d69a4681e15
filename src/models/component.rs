//! Pay component model.
//!
//! A component is a named monetary building block of a pay template: a fixed
//! annual amount, a percentage, or an arithmetic formula over other components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a component's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// `value` is an annual amount, converted to monthly by the division factor.
    Fixed,
    /// `value` is a percentage rate applied to the resolved base gross.
    Percentage,
    /// The amount is derived from `formula`; `value` is ignored.
    Formula,
}

/// The payroll category a component belongs to.
///
/// Categories drive template validation and decide what counts toward taxable
/// income; every category contributes to gross pay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    /// Basic salary.
    #[default]
    Salary,
    /// Taxable allowances (housing, transport, ...).
    Allowance,
    /// Reimbursements, excluded from taxable income.
    Reimbursable,
}

/// A named monetary building block of a template.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Component, ComponentCategory, ComponentKind};
/// use rust_decimal::Decimal;
///
/// let housing = Component::fixed("HOUSING", Decimal::from(180_000))
///     .with_category(ComponentCategory::Allowance);
/// assert_eq!(housing.kind, ComponentKind::Fixed);
/// assert!(housing.attendance_adjustable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The component name, unique within a template.
    pub name: String,
    /// How `value` / `formula` are interpreted.
    pub kind: ComponentKind,
    /// Annual amount or percentage rate, depending on `kind`.
    #[serde(default)]
    pub value: Decimal,
    /// The arithmetic expression for formula components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// The payroll category of this component.
    #[serde(default)]
    pub category: ComponentCategory,
    /// Whether the monthly amount is scaled by the attendance factor.
    #[serde(default = "default_attendance_adjustable")]
    pub attendance_adjustable: bool,
    /// Whether the component counts toward the pensionable amount.
    #[serde(default)]
    pub pensionable: bool,
}

fn default_attendance_adjustable() -> bool {
    true
}

impl Component {
    fn new(name: impl Into<String>, kind: ComponentKind, value: Decimal) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            formula: None,
            category: ComponentCategory::Salary,
            attendance_adjustable: true,
            pensionable: false,
        }
    }

    /// Creates a fixed component from an annual amount.
    pub fn fixed(name: impl Into<String>, annual_amount: Decimal) -> Self {
        Self::new(name, ComponentKind::Fixed, annual_amount)
    }

    /// Creates a percentage component from a rate (e.g. `10` for 10%).
    pub fn percentage(name: impl Into<String>, rate: Decimal) -> Self {
        Self::new(name, ComponentKind::Percentage, rate)
    }

    /// Creates a formula component.
    pub fn formula(name: impl Into<String>, formula: impl Into<String>) -> Self {
        let mut component = Self::new(name, ComponentKind::Formula, Decimal::ZERO);
        component.formula = Some(formula.into());
        component
    }

    /// Sets the payroll category.
    pub fn with_category(mut self, category: ComponentCategory) -> Self {
        self.category = category;
        self
    }

    /// Marks the component as pensionable.
    pub fn pensionable(mut self) -> Self {
        self.pensionable = true;
        self
    }

    /// Excludes the component from attendance scaling.
    pub fn not_attendance_adjustable(mut self) -> Self {
        self.attendance_adjustable = false;
        self
    }

    /// Returns true if the component is a formula with a non-blank expression.
    pub fn has_formula(&self) -> bool {
        self.formula
            .as_deref()
            .is_some_and(|formula| !formula.trim().is_empty())
    }
}
