//! Employee model.
//!
//! This module defines the per-employee inputs that are not part of the pay
//! template, such as the rent figure used for rent relief.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents an employee whose pay is calculated from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// The employee's display name.
    #[serde(default)]
    pub name: String,
    /// Annual rent paid by the employee, used for rent relief.
    #[serde(default)]
    pub annual_rent: Option<Decimal>,
}

impl Employee {
    /// Creates an employee with no rent on record.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::Employee;
    ///
    /// let employee = Employee::new("emp_001", "Ada Obi");
    /// assert_eq!(employee.id, "emp_001");
    /// assert!(employee.annual_rent.is_none());
    /// ```
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            annual_rent: None,
        }
    }

    /// Sets the annual rent used for rent relief.
    pub fn with_annual_rent(mut self, annual_rent: Decimal) -> Self {
        self.annual_rent = Some(annual_rent);
        self
    }
}
