//! Payroll runs over many employees.
//!
//! Each employee is calculated independently on the tokio blocking pool. One
//! employee's failure, including a panic, is recorded against that employee
//! and never stops the rest of the run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use payroll_engine::batch::{PayrollRunEntry, run_payroll};
//! use payroll_engine::calculation::PayrollEngine;
//! use payroll_engine::config::ConfigLoader;
//!
//! # async fn example(entries: Vec<PayrollRunEntry>) -> Result<(), payroll_engine::error::EngineError> {
//! let loader = ConfigLoader::load("./config/ng-paye")?;
//! let period_end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
//! let engine = Arc::new(PayrollEngine::from_config(&loader, period_end)?);
//!
//! let report = run_payroll(engine, entries).await;
//! println!("{} processed, {} failed", report.processed(), report.failed.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::task::{self, JoinSet};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::PayrollEngine;
use crate::error::EngineResult;
use crate::models::{AttendanceContext, CalculationResult, Employee, Template};

/// One employee's input to a payroll run.
#[derive(Debug, Clone)]
pub struct PayrollRunEntry {
    /// The employee to pay.
    pub employee: Employee,
    /// The employee's pay template, if one is assigned.
    pub template: Option<Arc<Template>>,
    /// Attendance for the period, if recorded.
    pub attendance: Option<AttendanceContext>,
}

impl PayrollRunEntry {
    /// Creates an entry with a template and attendance.
    pub fn new(employee: Employee, template: Arc<Template>, attendance: AttendanceContext) -> Self {
        Self {
            employee,
            template: Some(template),
            attendance: Some(attendance),
        }
    }
}

/// Why an employee was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeIssue {
    /// The affected employee.
    pub employee_id: String,
    /// A human-readable reason.
    pub reason: String,
}

/// The outcome of a payroll run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRunReport {
    /// Unique identifier for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Successful calculations, in input order.
    pub results: Vec<CalculationResult>,
    /// Employees with no template or no attendance record.
    pub skipped: Vec<EmployeeIssue>,
    /// Employees whose calculation failed.
    pub failed: Vec<EmployeeIssue>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl PayrollRunReport {
    /// Number of employees calculated successfully.
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    /// Total employer payable across all processed employees.
    pub fn total_credit_to_bank(&self) -> Decimal {
        self.results
            .iter()
            .map(|r| r.totals.credit_to_bank)
            .sum()
    }

    /// Looks up a processed employee's result.
    pub fn result_for(&self, employee_id: &str) -> Option<&CalculationResult> {
        self.results.iter().find(|r| r.employee_id == employee_id)
    }
}

/// Calculates every entry concurrently and collects the outcomes.
///
/// Entries without a template or attendance record are skipped. Results are
/// returned in input order regardless of completion order. A calculation that
/// errors, panics or is cancelled lands in `failed` under its employee.
pub async fn run_payroll(engine: Arc<PayrollEngine>, entries: Vec<PayrollRunEntry>) -> PayrollRunReport {
    run_with(entries, move |employee, template, attendance| {
        engine.calculate(employee, template, Some(attendance))
    })
    .await
}

async fn run_with<F>(entries: Vec<PayrollRunEntry>, calculate: F) -> PayrollRunReport
where
    F: Fn(&Employee, &Template, &AttendanceContext) -> EngineResult<CalculationResult>
        + Send
        + Sync
        + 'static,
{
    let start_time = Instant::now();
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let calculate = Arc::new(calculate);
    let mut skipped = Vec::new();
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<task::Id, (usize, String)> = HashMap::new();

    info!(run_id = %run_id, employees = entries.len(), "Starting payroll run");

    for (index, entry) in entries.into_iter().enumerate() {
        let PayrollRunEntry {
            employee,
            template,
            attendance,
        } = entry;

        let Some(template) = template else {
            skipped.push(issue(&employee.id, "No template assigned"));
            continue;
        };
        let Some(attendance) = attendance else {
            skipped.push(issue(&employee.id, "No attendance record for the period"));
            continue;
        };

        let employee_id = employee.id.clone();
        let calculate = Arc::clone(&calculate);
        let handle = tasks.spawn_blocking(move || (*calculate)(&employee, &template, &attendance));
        pending.insert(handle.id(), (index, employee_id));
    }

    let mut completed = Vec::new();
    let mut failed = Vec::new();

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, Ok(outcome)),
            Err(e) => (e.id(), Err(e)),
        };

        let Some((index, employee_id)) = pending.remove(&id) else {
            warn!(run_id = %run_id, task_id = %id, "Untracked payroll task finished");
            continue;
        };

        match outcome {
            Ok(Ok(result)) => completed.push((index, result)),
            Ok(Err(e)) => {
                warn!(run_id = %run_id, employee_id = %employee_id, error = %e, "Calculation failed");
                failed.push((index, issue(&employee_id, e.to_string())));
            }
            Err(e) => {
                let what = if e.is_panic() { "panicked" } else { "was cancelled" };
                warn!(run_id = %run_id, employee_id = %employee_id, error = %e, "Calculation {}", what);
                failed.push((index, issue(&employee_id, format!("Calculation task failed: {}", e))));
            }
        }
    }

    completed.sort_by_key(|(index, _)| *index);
    failed.sort_by_key(|(index, _)| *index);

    let report = PayrollRunReport {
        run_id,
        started_at,
        results: completed.into_iter().map(|(_, result)| result).collect(),
        skipped,
        failed: failed.into_iter().map(|(_, issue)| issue).collect(),
        duration_ms: start_time.elapsed().as_millis() as u64,
    };

    info!(
        run_id = %run_id,
        processed = report.processed(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        duration_ms = report.duration_ms,
        "Payroll run completed"
    );

    report
}

fn issue(employee_id: &str, reason: impl Into<String>) -> EmployeeIssue {
    EmployeeIssue {
        employee_id: employee_id.to_string(),
        reason: reason.into(),
    }
}
