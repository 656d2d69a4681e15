//! Chargeable income after statutory reliefs.
//!
//! All amounts here are annual. Reimbursable components never count toward
//! taxable income. The health insurance rate is granted as relief only; it is
//! not withheld from pay.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PayrollSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{AdjustedComponent, ComponentCategory, Employee};

/// Annual income and reliefs feeding the progressive tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxableIncome {
    /// Salary and allowance components, annualized.
    pub annual_gross: Decimal,
    /// Annual amount of pensionable components.
    pub pensionable_amount: Decimal,
    /// `pensionable_amount x PENSION_RATE%`.
    pub pension_relief: Decimal,
    /// `annual_gross x NHIS_RATE%`.
    pub nhis_relief: Decimal,
    /// `min(annual_rent x RENT_RELIEF_RATE%, RENT_RELIEF_CAP)`.
    pub rent_relief: Decimal,
    /// Sum of the three reliefs.
    pub total_relief: Decimal,
    /// `max(annual_gross - total_relief, 0)`.
    pub chargeable_income: Decimal,
}

fn percent_of(amount: Decimal, rate: Decimal) -> EngineResult<Decimal> {
    amount
        .checked_mul(rate)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("relief"))
}

fn sum<'a>(mut amounts: impl Iterator<Item = &'a Decimal>, what: &str) -> EngineResult<Decimal> {
    amounts
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
        .ok_or_else(|| overflow(what))
}

fn overflow(what: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("Annual {} overflowed", what),
    }
}

/// Computes chargeable income from the template's components.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{apply_attendance, compute_taxable_income};
/// use payroll_engine::config::PayrollSettings;
/// use payroll_engine::models::{ComponentCategory, ComponentKind, Employee, ResolvedComponent};
/// use rust_decimal::Decimal;
///
/// let basic = ResolvedComponent {
///     name: "BASIC_SALARY".to_string(),
///     kind: ComponentKind::Fixed,
///     category: ComponentCategory::Salary,
///     annual_amount: Decimal::from(2_400_000),
///     monthly_amount: Decimal::from(200_000),
///     resolved: true,
///     attendance_adjustable: true,
///     pensionable: true,
/// };
/// let adjusted = apply_attendance(&basic, Decimal::ONE).unwrap();
///
/// let income = compute_taxable_income(
///     &[adjusted],
///     &Employee::new("emp_001", "Ada Obi"),
///     &PayrollSettings::new(),
/// )
/// .unwrap();
///
/// // 2,400,000 - 192,000 pension - 42,000 health insurance
/// assert_eq!(income.chargeable_income, Decimal::from(2_166_000));
/// ```
pub fn compute_taxable_income(
    components: &[AdjustedComponent],
    employee: &Employee,
    settings: &PayrollSettings,
) -> EngineResult<TaxableIncome> {
    let taxable = components
        .iter()
        .filter(|c| c.category != ComponentCategory::Reimbursable);

    let annual_gross = sum(taxable.clone().map(|c| &c.annual_amount), "gross")?;
    let pensionable_amount = sum(
        taxable.filter(|c| c.pensionable).map(|c| &c.annual_amount),
        "pensionable amount",
    )?;

    let pension_relief = percent_of(pensionable_amount, settings.pension_rate())?;
    let nhis_relief = percent_of(annual_gross, settings.nhis_rate())?;
    let rent_relief = match employee.annual_rent {
        Some(rent) if rent > Decimal::ZERO => {
            percent_of(rent, settings.rent_relief_rate())?.min(settings.rent_relief_cap())
        }
        _ => Decimal::ZERO,
    };

    let total_relief = sum([pension_relief, nhis_relief, rent_relief].iter(), "relief")?;
    let chargeable_income = (annual_gross - total_relief).max(Decimal::ZERO);

    Ok(TaxableIncome {
        annual_gross,
        pensionable_amount,
        pension_relief,
        nhis_relief,
        rent_relief,
        total_relief,
        chargeable_income,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentKind;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn component(
        name: &str,
        annual: &str,
        category: ComponentCategory,
        pensionable: bool,
    ) -> AdjustedComponent {
        let monthly = dec(annual) / dec("12");
        AdjustedComponent {
            name: name.to_string(),
            kind: ComponentKind::Fixed,
            category,
            annual_amount: dec(annual),
            base_amount: monthly,
            adjusted_amount: monthly,
            adjustment: Decimal::ZERO,
            attendance_factor: Decimal::ONE,
            pensionable,
        }
    }

    fn employee() -> Employee {
        Employee::new("emp_001", "Ada Obi")
    }

    #[test]
    fn test_reliefs_reduce_chargeable_income() {
        let components = vec![
            component("BASIC_SALARY", "1200000", ComponentCategory::Salary, true),
            component("HOUSING", "600000", ComponentCategory::Allowance, true),
            component("TRANSPORT", "200000", ComponentCategory::Allowance, true),
        ];

        let income = compute_taxable_income(&components, &employee(), &PayrollSettings::new()).unwrap();

        assert_eq!(income.annual_gross, dec("2000000"));
        assert_eq!(income.pension_relief, dec("160000"));
        assert_eq!(income.nhis_relief, dec("35000"));
        assert_eq!(income.rent_relief, Decimal::ZERO);
        assert_eq!(income.total_relief, dec("195000"));
        assert_eq!(income.chargeable_income, dec("1805000"));
    }

    #[test]
    fn test_reimbursables_are_excluded() {
        let components = vec![
            component("BASIC_SALARY", "1200000", ComponentCategory::Salary, false),
            component("FUEL", "300000", ComponentCategory::Reimbursable, true),
        ];

        let income = compute_taxable_income(&components, &employee(), &PayrollSettings::new()).unwrap();

        assert_eq!(income.annual_gross, dec("1200000"));
        assert_eq!(income.pensionable_amount, Decimal::ZERO);
    }

    #[test]
    fn test_rent_relief_is_capped() {
        let components = vec![component("BASIC_SALARY", "12000000", ComponentCategory::Salary, false)];

        let modest = employee().with_annual_rent(dec("1800000"));
        let income = compute_taxable_income(&components, &modest, &PayrollSettings::new()).unwrap();
        assert_eq!(income.rent_relief, dec("360000"));

        let lavish = employee().with_annual_rent(dec("6000000"));
        let income = compute_taxable_income(&components, &lavish, &PayrollSettings::new()).unwrap();
        assert_eq!(income.rent_relief, dec("500000"));
    }

    #[test]
    fn test_chargeable_income_floors_at_zero() {
        let components = vec![component("BASIC_SALARY", "100000", ComponentCategory::Salary, true)];
        let settings = PayrollSettings::new().with(PayrollSettings::PENSION_RATE, dec("90"));
        let tenant = employee().with_annual_rent(dec("2500000"));

        let income = compute_taxable_income(&components, &tenant, &settings).unwrap();
        assert_eq!(income.chargeable_income, Decimal::ZERO);
    }

    #[test]
    fn test_annual_gross_overflow_is_an_error() {
        let mut huge = component("BASIC_SALARY", "1", ComponentCategory::Salary, false);
        huge.annual_amount = Decimal::MAX;
        let components = vec![huge.clone(), huge];

        let result = compute_taxable_income(&components, &employee(), &PayrollSettings::new());
        assert!(matches!(result, Err(EngineError::CalculationError { .. })));
    }

    #[test]
    fn test_settings_override_rates() {
        let components = vec![component("BASIC_SALARY", "1000000", ComponentCategory::Salary, true)];
        let settings = PayrollSettings::new()
            .with(PayrollSettings::PENSION_RATE, dec("10"))
            .with(PayrollSettings::NHIS_RATE, Decimal::ZERO);

        let income = compute_taxable_income(&components, &employee(), &settings).unwrap();
        assert_eq!(income.pension_relief, dec("100000"));
        assert_eq!(income.nhis_relief, Decimal::ZERO);
        assert_eq!(income.chargeable_income, dec("900000"));
    }
}
