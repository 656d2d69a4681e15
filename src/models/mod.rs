//! Core data models for the payroll calculation engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod calculation_result;
mod component;
mod deduction;
mod employee;
mod tax_bracket;
mod template;

pub use attendance::{AttendanceContext, PayBasis};
pub use calculation_result::{
    AdjustedComponent, AuditStep, AuditTrace, AuditWarning, CalculationResult, DeductionLine,
    PayTotals, ResolvedComponent, TaxComputation,
};
pub use component::{Component, ComponentCategory, ComponentKind};
pub use deduction::{DeductionKind, DeductionRule};
pub use employee::Employee;
pub use tax_bracket::{TaxBracket, TaxBracketTable};
pub use template::{DEFAULT_ANNUAL_DIVISION_FACTOR, Template};
