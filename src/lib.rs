//! Template-driven payroll calculation engine.
//!
//! Given a pay template (named fixed, percentage and formula components plus
//! deduction rules), an attendance record and a progressive tax schedule, the
//! engine produces a fully resolved breakdown: adjusted components, itemized
//! deductions, gross, net and the employer payable total.
//!
//! Formulas are evaluated by a closed arithmetic grammar, never by a general
//! evaluator. Components may reference each other in any order; references are
//! resolved by bounded fixed-point iteration.
//!
//! The crate performs no I/O during a calculation. Configuration is loaded from
//! YAML up front by [`config::ConfigLoader`], and [`batch::run_payroll`] runs
//! many employees concurrently.

#![warn(missing_docs)]

pub mod batch;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
