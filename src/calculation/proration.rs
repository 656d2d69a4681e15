//! Annual-to-monthly conversion and attendance scaling.
//!
//! Component amounts are carried unrounded through resolution. This module is
//! where they are rounded to money precision: the base amount before
//! attendance and the adjusted amount after it.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AdjustedComponent, ResolvedComponent};

use super::round_money;

/// Converts an annual amount to a monthly one.
///
/// # Errors
///
/// Returns [`EngineError::CalculationError`] if `division_factor` is not
/// positive or the result overflows.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::to_monthly;
/// use rust_decimal::Decimal;
///
/// let monthly = to_monthly(Decimal::from(600_000), Decimal::from(12)).unwrap();
/// assert_eq!(monthly, Decimal::from(50_000));
/// ```
pub fn to_monthly(annual: Decimal, division_factor: Decimal) -> EngineResult<Decimal> {
    if division_factor <= Decimal::ZERO {
        return Err(EngineError::CalculationError {
            message: format!("Division factor must be positive, got {}", division_factor),
        });
    }

    annual
        .checked_div(division_factor)
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("Monthly amount of {} overflowed", annual),
        })
}

/// Scales a resolved component by the attendance factor.
///
/// The factor is clamped to `[0, 1]`. Components that are not attendance
/// adjustable are scaled by 1. Both amounts are rounded to 2 dp, so
/// `adjustment = adjusted_amount - base_amount` is exact.
pub fn apply_attendance(
    component: &ResolvedComponent,
    attendance_factor: Decimal,
) -> EngineResult<AdjustedComponent> {
    let factor = if component.attendance_adjustable {
        attendance_factor.clamp(Decimal::ZERO, Decimal::ONE)
    } else {
        Decimal::ONE
    };

    let scaled = component
        .monthly_amount
        .checked_mul(factor)
        .ok_or_else(|| EngineError::CalculationError {
            message: format!("Attendance scaling of '{}' overflowed", component.name),
        })?;

    let base_amount = round_money(component.monthly_amount);
    let adjusted_amount = round_money(scaled);

    Ok(AdjustedComponent {
        name: component.name.clone(),
        kind: component.kind,
        category: component.category,
        annual_amount: component.annual_amount,
        base_amount,
        adjusted_amount,
        adjustment: adjusted_amount - base_amount,
        attendance_factor: factor,
        pensionable: component.pensionable,
    })
}

/// Applies [`apply_attendance`] to every component, preserving order.
pub fn adjust_components(
    components: &[ResolvedComponent],
    attendance_factor: Decimal,
) -> EngineResult<Vec<AdjustedComponent>> {
    components
        .iter()
        .map(|component| apply_attendance(component, attendance_factor))
        .collect()
}

/// Sums the adjusted amounts.
pub fn gross_salary(components: &[AdjustedComponent]) -> EngineResult<Decimal> {
    components.iter().try_fold(Decimal::ZERO, |total, component| {
        total
            .checked_add(component.adjusted_amount)
            .ok_or_else(|| EngineError::CalculationError {
                message: "Gross salary overflowed".to_string(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentCategory, ComponentKind};
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn resolved(name: &str, monthly: &str, adjustable: bool) -> ResolvedComponent {
        ResolvedComponent {
            name: name.to_string(),
            kind: ComponentKind::Fixed,
            category: ComponentCategory::Salary,
            annual_amount: dec(monthly) * dec("12"),
            monthly_amount: dec(monthly),
            resolved: true,
            attendance_adjustable: adjustable,
            pensionable: true,
        }
    }

    #[test]
    fn test_to_monthly_divides_by_factor() {
        assert_eq!(to_monthly(dec("1200000"), dec("12")).unwrap(), dec("100000"));
        assert_eq!(to_monthly(dec("1300000"), dec("13")).unwrap(), dec("100000"));
    }

    #[test]
    fn test_to_monthly_rejects_non_positive_factor() {
        assert!(matches!(
            to_monthly(dec("1200000"), Decimal::ZERO),
            Err(EngineError::CalculationError { .. })
        ));
        assert!(to_monthly(dec("1200000"), dec("-12")).is_err());
    }

    #[test]
    fn test_half_attendance_halves_amount() {
        let adjusted = apply_attendance(&resolved("BASIC_SALARY", "50000", true), dec("0.5")).unwrap();

        assert_eq!(adjusted.base_amount, dec("50000.00"));
        assert_eq!(adjusted.adjusted_amount, dec("25000.00"));
        assert_eq!(adjusted.adjustment, dec("-25000.00"));
        assert_eq!(adjusted.attendance_factor, dec("0.5"));
        assert!(adjusted.pensionable);
    }

    #[test]
    fn test_non_adjustable_component_keeps_full_amount() {
        let adjusted = apply_attendance(&resolved("MEAL", "5000", false), dec("0.5")).unwrap();

        assert_eq!(adjusted.adjusted_amount, dec("5000.00"));
        assert_eq!(adjusted.adjustment, Decimal::ZERO);
        assert_eq!(adjusted.attendance_factor, Decimal::ONE);
    }

    #[test]
    fn test_amounts_round_half_away_from_zero() {
        let adjusted =
            apply_attendance(&resolved("TRANSPORT", "100.005", true), Decimal::ONE).unwrap();
        assert_eq!(adjusted.base_amount, dec("100.01"));

        let third = apply_attendance(&resolved("BASIC", "1000", true), dec("1") / dec("3")).unwrap();
        assert_eq!(third.adjusted_amount, dec("333.33"));
    }

    #[test]
    fn test_factor_above_one_is_clamped() {
        let adjusted = apply_attendance(&resolved("BASIC", "1000", true), dec("1.4")).unwrap();
        assert_eq!(adjusted.adjusted_amount, dec("1000.00"));
    }

    #[test]
    fn test_gross_salary_sums_adjusted_amounts() {
        let components = adjust_components(
            &[
                resolved("BASIC_SALARY", "50000", true),
                resolved("HOUSING", "15000", true),
                resolved("MEAL", "5000", false),
            ],
            dec("0.5"),
        )
        .unwrap();

        assert_eq!(gross_salary(&components).unwrap(), dec("37500.00"));
    }

    proptest! {
        #[test]
        fn prop_adjustment_is_never_positive(
            monthly_cents in 0i64..1_000_000_000,
            worked in 0u32..=31,
            total in 1u32..=31,
        ) {
            let component = resolved("BASIC", &Decimal::new(monthly_cents, 2).to_string(), true);
            let factor = Decimal::from(worked) / Decimal::from(total);
            let adjusted = apply_attendance(&component, factor).unwrap();

            prop_assert!(adjusted.adjustment <= Decimal::ZERO);
            prop_assert!(adjusted.adjusted_amount <= adjusted.base_amount);
        }
    }
}
