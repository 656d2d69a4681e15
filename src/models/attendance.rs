//! Attendance context model.
//!
//! An attendance context is built per calculation from an external attendance
//! record and yields the factor used to prorate monthly entitlements.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How the total days of a month are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayBasis {
    /// Every day of the month.
    #[default]
    CalendarDays,
    /// Monday to Friday only.
    WorkingDays,
}

impl PayBasis {
    /// Returns the number of days in the given month under this basis.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CalculationError`] for an invalid year/month.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::PayBasis;
    ///
    /// assert_eq!(PayBasis::CalendarDays.total_days(2026, 2).unwrap(), 28);
    /// assert_eq!(PayBasis::WorkingDays.total_days(2026, 2).unwrap(), 20);
    /// ```
    pub fn total_days(&self, year: i32, month: u32) -> EngineResult<u32> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            EngineError::CalculationError {
                message: format!("Invalid pay month {}-{:02}", year, month),
            }
        })?;

        let days = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .filter(|d| match self {
                PayBasis::CalendarDays => true,
                PayBasis::WorkingDays => !matches!(d.weekday(), Weekday::Sat | Weekday::Sun),
            })
            .count();

        Ok(days as u32)
    }
}

/// Days worked against total days for a pay period.
///
/// # Example
///
/// ```
/// use payroll_engine::models::AttendanceContext;
/// use rust_decimal::Decimal;
///
/// let attendance = AttendanceContext::new(Decimal::from(15), Decimal::from(30)).unwrap();
/// assert_eq!(attendance.attendance_factor().unwrap(), Decimal::new(5, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceContext {
    /// Days worked in the period.
    pub days_worked: Decimal,
    /// Total days in the period; must be at least one.
    pub total_days: Decimal,
}

impl AttendanceContext {
    /// Creates a validated attendance context.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAttendance`] if `total_days` is below one.
    pub fn new(days_worked: Decimal, total_days: Decimal) -> EngineResult<Self> {
        let context = Self {
            days_worked,
            total_days,
        };
        context.validate()?;
        Ok(context)
    }

    /// Creates a context for a calendar month, counting total days by `basis`.
    pub fn for_month(
        days_worked: Decimal,
        year: i32,
        month: u32,
        basis: PayBasis,
    ) -> EngineResult<Self> {
        let total_days = basis.total_days(year, month)?;
        Self::new(days_worked, Decimal::from(total_days))
    }

    /// Checks that the context can be used for proration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.total_days < Decimal::ONE {
            return Err(EngineError::InvalidAttendance {
                days_worked: self.days_worked,
                total_days: self.total_days,
            });
        }
        Ok(())
    }

    /// Returns `days_worked / total_days`, clamped to `[0, 1]`.
    pub fn attendance_factor(&self) -> EngineResult<Decimal> {
        self.validate()?;
        let ratio = self.days_worked / self.total_days;
        Ok(ratio.clamp(Decimal::ZERO, Decimal::ONE))
    }
}
