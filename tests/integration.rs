//! Integration tests for the payroll engine.
//!
//! This test suite covers end-to-end calculations:
//! - Tax scenarios on the 2026 schedule
//! - Formula resolution through the full pipeline
//! - Attendance proration
//! - Configuration-driven calculation from `config/ng-paye`
//! - Templates loaded from YAML
//! - Payroll runs
//! - Aggregation consistency

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use payroll_engine::batch::{PayrollRunEntry, run_payroll};
use payroll_engine::calculation::PayrollEngine;
use payroll_engine::config::{ConfigLoader, PayrollSettings};
use payroll_engine::models::{
    AttendanceContext, CalculationResult, Component, ComponentCategory, DeductionRule, Employee,
    PayBasis, Template,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::from_str(s).unwrap()
}

fn loader() -> ConfigLoader {
    ConfigLoader::load("./config/ng-paye").expect("Failed to load config")
}

fn engine_for(period_end: &str) -> PayrollEngine {
    PayrollEngine::from_config(&loader(), date(period_end)).unwrap()
}

fn engine_with_settings(settings: PayrollSettings) -> PayrollEngine {
    let loader = loader();
    let brackets = loader.brackets_effective_on(date("2026-01-31")).unwrap();
    PayrollEngine::new(Arc::new(settings), Arc::new(brackets))
}

fn employee(id: &str) -> Employee {
    Employee::new(id, "Test Employee")
}

fn attendance(days_worked: &str, total_days: &str) -> AttendanceContext {
    AttendanceContext::new(dec(days_worked), dec(total_days)).unwrap()
}

fn grade_b_template() -> Template {
    serde_yaml::from_str(include_str!("fixtures/grade_b_officer.yaml")).unwrap()
}

fn assert_consistent(result: &CalculationResult) {
    let problems = result.verify();
    assert!(problems.is_empty(), "Inconsistent result: {:?}", problems);
}

// =============================================================================
// SECTION 1: Tax scenarios
// =============================================================================

#[test]
fn test_income_below_exempt_threshold_pays_no_tax() {
    // 600,000 a year, no reliefs
    let engine = engine_with_settings(
        PayrollSettings::new().with(PayrollSettings::NHIS_RATE, Decimal::ZERO),
    );
    let template = Template::new(
        "tpl_low",
        "Junior",
        vec![Component::fixed("BASIC_SALARY", dec("600000"))],
        vec![DeductionRule::tax("PAYE")],
    );

    let result = engine
        .calculate(&employee("emp_001"), &template, Some(&attendance("30", "30")))
        .unwrap();

    let tax = result.tax.as_ref().unwrap();
    assert_eq!(tax.chargeable_income, dec("600000"));
    assert_eq!(tax.annual_tax, Decimal::ZERO);
    assert_eq!(result.deduction("PAYE"), Some(Decimal::ZERO));
    assert_consistent(&result);
}

#[test]
fn test_income_in_second_tier() {
    // 800,000 x 0% + 556,227.32 x 15% = 83,434.098
    let engine = engine_with_settings(
        PayrollSettings::new().with(PayrollSettings::NHIS_RATE, Decimal::ZERO),
    );
    let template = Template::new(
        "tpl_mid",
        "Officer",
        vec![Component::fixed("BASIC_SALARY", dec("1356227.32"))],
        vec![DeductionRule::tax("PAYE")],
    );

    let result = engine
        .calculate(&employee("emp_002"), &template, Some(&attendance("30", "30")))
        .unwrap();

    let tax = result.tax.as_ref().unwrap();
    assert_eq!(tax.annual_tax, dec("83434.098"));
    assert_eq!(result.deduction("PAYE"), Some(dec("6952.84")));
    assert_consistent(&result);
}

#[test]
fn test_rent_relief_lowers_tax() {
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_rent",
        "Officer",
        vec![Component::fixed("BASIC_SALARY", dec("6000000"))],
        vec![DeductionRule::tax("PAYE")],
    );
    let full_month = attendance("30", "30");

    let without_rent = engine
        .calculate(&employee("emp_003"), &template, Some(&full_month))
        .unwrap();
    let tenant = employee("emp_003").with_annual_rent(dec("1000000"));
    let with_rent = engine.calculate(&tenant, &template, Some(&full_month)).unwrap();

    let relief = with_rent.tax.as_ref().unwrap().rent_relief;
    assert_eq!(relief, dec("200000"));
    assert!(with_rent.deduction("PAYE").unwrap() < without_rent.deduction("PAYE").unwrap());
}

// =============================================================================
// SECTION 2: Resolution through the pipeline
// =============================================================================

#[test]
fn test_gross_salary_formula_component() {
    // GROSS_SALARY is the sum of the fixed components: 50,000 + 15,000
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_c",
        "Scenario C",
        vec![
            Component::fixed("BASIC_SALARY", dec("600000")),
            Component::fixed("HOUSING", dec("180000")).with_category(ComponentCategory::Allowance),
            Component::formula("PENSION_BASE", "GROSS_SALARY * 0.08")
                .with_category(ComponentCategory::Allowance),
        ],
        vec![DeductionRule::fixed_monthly("UNION_DUES", dec("500"))],
    );

    let result = engine
        .calculate(&employee("emp_004"), &template, Some(&attendance("30", "30")))
        .unwrap();

    let component = result.component("PENSION_BASE").unwrap();
    assert_eq!(component.adjusted_amount, dec("5200.00"));
    assert_eq!(result.totals.gross_salary, dec("70200.00"));
    assert_consistent(&result);
}

#[test]
fn test_forward_references_and_cycles_resolve() {
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_refs",
        "References",
        vec![
            Component::formula("TOTAL_ALLOWANCE", "HOUSING + TRANSPORT")
                .with_category(ComponentCategory::Allowance),
            Component::fixed("BASIC_SALARY", dec("1200000")),
            Component::formula("HOUSING", "BASIC_SALARY * 0.5")
                .with_category(ComponentCategory::Allowance),
            Component::formula("TRANSPORT", "BASIC_SALARY * 0.1")
                .with_category(ComponentCategory::Allowance),
            Component::formula("BONUS_A", "BONUS_B + 1000"),
            Component::formula("BONUS_B", "BONUS_A * 0.5"),
        ],
        vec![DeductionRule::percentage("PENSION", dec("8"))],
    );

    let result = engine
        .calculate(&employee("emp_005"), &template, Some(&attendance("30", "30")))
        .unwrap();

    assert_eq!(result.component("HOUSING").unwrap().adjusted_amount, dec("50000.00"));
    assert_eq!(result.component("TRANSPORT").unwrap().adjusted_amount, dec("10000.00"));
    assert_eq!(
        result.component("TOTAL_ALLOWANCE").unwrap().adjusted_amount,
        dec("60000.00")
    );
    assert_eq!(result.component("BONUS_A").unwrap().adjusted_amount, dec("1000.00"));
    assert_eq!(result.component("BONUS_B").unwrap().adjusted_amount, dec("500.00"));
    assert!(result.warnings().is_empty());
    assert_consistent(&result);
}

#[test]
fn test_unsafe_formula_degrades_to_warning() {
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_unsafe",
        "Unsafe",
        vec![
            Component::fixed("BASIC_SALARY", dec("1200000")),
            Component::formula("HACK", "BASIC_SALARY; system('rm -rf /')"),
            Component::formula("EXEC", "exec(BASIC_SALARY)"),
        ],
        vec![DeductionRule::formula("LEVY", "eval(1)")],
    );

    let result = engine
        .calculate(&employee("emp_006"), &template, Some(&attendance("30", "30")))
        .unwrap();

    assert_eq!(result.component("HACK").unwrap().adjusted_amount, Decimal::ZERO);
    assert_eq!(result.component("EXEC").unwrap().adjusted_amount, Decimal::ZERO);
    assert_eq!(result.deduction("LEVY"), Some(Decimal::ZERO));
    assert_eq!(result.totals.gross_salary, dec("100000.00"));

    let codes: Vec<&str> = result.warnings().iter().map(|w| w.code.as_str()).collect();
    assert_eq!(
        codes,
        vec![
            "UNRESOLVED_COMPONENT",
            "UNRESOLVED_COMPONENT",
            "FORMULA_EVALUATION_FAILED"
        ]
    );
}

// =============================================================================
// SECTION 3: Attendance
// =============================================================================

#[test]
fn test_half_attendance_halves_adjustable_components() {
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_d",
        "Scenario D",
        vec![
            Component::fixed("BASIC_SALARY", dec("600000")),
            Component::fixed("HOUSING", dec("180000")).with_category(ComponentCategory::Allowance),
            Component::fixed("FUEL", dec("60000"))
                .with_category(ComponentCategory::Reimbursable)
                .not_attendance_adjustable(),
        ],
        vec![DeductionRule::percentage("PENSION", dec("8"))],
    );

    let result = engine
        .calculate(&employee("emp_007"), &template, Some(&attendance("15", "30")))
        .unwrap();

    assert_eq!(result.component("BASIC_SALARY").unwrap().adjusted_amount, dec("25000.00"));
    assert_eq!(result.component("HOUSING").unwrap().adjusted_amount, dec("7500.00"));
    assert_eq!(result.component("FUEL").unwrap().adjusted_amount, dec("5000.00"));
    assert_eq!(result.totals.gross_salary, dec("37500.00"));
    assert_consistent(&result);
}

#[test]
fn test_overtime_attendance_is_capped() {
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_cap",
        "Capped",
        vec![Component::fixed("BASIC_SALARY", dec("600000"))],
        vec![DeductionRule::prorated_annual("THIRTEENTH_MONTH", dec("600000"))],
    );

    let result = engine
        .calculate(&employee("emp_008"), &template, Some(&attendance("26", "22")))
        .unwrap();

    assert_eq!(result.attendance_factor, Decimal::ONE);
    assert_eq!(result.totals.gross_salary, dec("50000.00"));
    assert_eq!(result.deduction("THIRTEENTH_MONTH"), Some(dec("50000.00")));
}

#[test]
fn test_working_day_basis() {
    // January 2026 has 22 weekdays
    let attendance =
        AttendanceContext::for_month(dec("11"), 2026, 1, PayBasis::WorkingDays).unwrap();
    let engine = engine_for("2026-01-31");
    let template = Template::new(
        "tpl_wd",
        "Working days",
        vec![Component::fixed("BASIC_SALARY", dec("1200000"))],
        vec![DeductionRule::percentage("PENSION", dec("8"))],
    );

    let result = engine
        .calculate(&employee("emp_009"), &template, Some(&attendance))
        .unwrap();

    assert_eq!(result.totals.gross_salary, dec("50000.00"));
}

// =============================================================================
// SECTION 4: Configuration-driven calculation
// =============================================================================

#[test]
fn test_yaml_template_full_month_on_2026_schedule() {
    let result = engine_for("2026-01-31")
        .calculate(&employee("emp_010"), &grade_b_template(), Some(&attendance("31", "31")))
        .unwrap();

    assert_eq!(result.component("HOUSING").unwrap().adjusted_amount, dec("37500.00"));
    assert_eq!(result.component("TRANSPORT").unwrap().adjusted_amount, dec("18750.00"));
    assert_eq!(result.component("MEAL SUBSIDY").unwrap().adjusted_amount, dec("10000.00"));
    assert_eq!(result.component("UTILITY").unwrap().adjusted_amount, dec("10812.50"));
    assert_eq!(result.totals.gross_salary, dec("227062.50"));

    assert_eq!(result.deduction("PENSION"), Some(dec("15000.00")));
    assert_eq!(result.deduction("NHF"), Some(dec("3750.00")));
    assert_eq!(result.deduction("UNION_DUES"), Some(dec("1000.00")));

    let tax = result.tax.as_ref().unwrap();
    assert_eq!(tax.annual_gross, dec("2604750"));
    assert_eq!(tax.chargeable_income, dec("2379166.875"));
    assert_eq!(result.deduction("PAYE"), Some(dec("19739.59")));

    assert_eq!(result.totals.total_deductions, dec("39489.59"));
    assert_eq!(result.totals.net_salary, dec("187572.91"));
    assert_eq!(result.totals.credit_to_bank, dec("266552.09"));
    assert_consistent(&result);
}

#[test]
fn test_schedule_follows_period_end() {
    let template = Template::new(
        "tpl_sched",
        "Manager",
        vec![
            Component::fixed("BASIC_SALARY", dec("3000000")).pensionable(),
            Component::fixed("HOUSING", dec("600000"))
                .with_category(ComponentCategory::Allowance)
                .pensionable(),
        ],
        vec![
            DeductionRule::formula("PENSION", "8 * (BASIC_SALARY + HOUSING)"),
            DeductionRule::tax("PAYE"),
        ],
    );
    let full_month = attendance("30", "30");

    // Chargeable: 3,600,000 - 288,000 - 63,000 = 3,249,000
    let result_2026 = engine_for("2026-06-30")
        .calculate(&employee("emp_011"), &template, Some(&full_month))
        .unwrap();
    assert_eq!(result_2026.deduction("PENSION"), Some(dec("24000.00")));
    assert_eq!(result_2026.tax.as_ref().unwrap().annual_tax, dec("374820"));
    assert_eq!(result_2026.deduction("PAYE"), Some(dec("31235.00")));
    assert_eq!(result_2026.totals.net_salary, dec("244765.00"));
    assert_eq!(result_2026.totals.credit_to_bank, dec("355235.00"));

    let result_2025 = engine_for("2025-06-30")
        .calculate(&employee("emp_011"), &template, Some(&full_month))
        .unwrap();
    assert_eq!(result_2025.tax.as_ref().unwrap().annual_tax, dec("620250"));
    assert_eq!(result_2025.deduction("PAYE"), Some(dec("51687.50")));
}

#[test]
fn test_result_snapshot_is_json_serializable() {
    let result = engine_for("2026-01-31")
        .calculate(&employee("emp_012"), &grade_b_template(), Some(&attendance("20", "31")))
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["employee_id"], "emp_012");
    assert_eq!(json["template_id"], "tpl_grade_b");
    assert_eq!(json["deductions"][3]["kind"], "tax");
    assert!(json["audit_trace"]["steps"].as_array().unwrap().len() >= 3);
}

// =============================================================================
// SECTION 5: Payroll runs
// =============================================================================

#[tokio::test]
async fn test_payroll_run_with_loaded_config() {
    let engine = Arc::new(engine_for("2026-01-31"));
    let template = Arc::new(grade_b_template());

    let mut entries: Vec<PayrollRunEntry> = (0..50)
        .map(|i| {
            PayrollRunEntry::new(
                employee(&format!("emp_{:03}", i)),
                Arc::clone(&template),
                attendance(&(i % 31 + 1).to_string(), "31"),
            )
        })
        .collect();
    entries.push(PayrollRunEntry {
        employee: employee("emp_no_attendance"),
        template: Some(Arc::clone(&template)),
        attendance: None,
    });

    let report = run_payroll(engine, entries).await;

    assert_eq!(report.processed(), 50);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.failed.is_empty());

    for result in &report.results {
        assert_consistent(result);
    }

    let full_month = report.result_for("emp_030").unwrap();
    assert_eq!(full_month.totals.gross_salary, dec("227062.50"));
}

// =============================================================================
// SECTION 6: Aggregation consistency
// =============================================================================

proptest! {
    #[test]
    fn prop_totals_are_consistent(
        annual_basic in 100_000i64..200_000_000,
        days_worked in 0u32..=31,
        total_days in 28u32..=31,
    ) {
        let engine = engine_for("2026-01-31");
        let template = Template::new(
            "tpl_prop",
            "Property",
            vec![
                Component::fixed("BASIC_SALARY", Decimal::from(annual_basic)).pensionable(),
                Component::formula("HOUSING", "BASIC_SALARY * 0.3")
                    .with_category(ComponentCategory::Allowance),
                Component::percentage("UTILITY", dec("5"))
                    .with_category(ComponentCategory::Allowance),
            ],
            vec![
                DeductionRule::percentage("PENSION", dec("8")),
                DeductionRule::formula("NHF", "BASIC_SALARY * 0.025"),
                DeductionRule::tax("PAYE"),
            ],
        );
        let attendance =
            AttendanceContext::new(Decimal::from(days_worked), Decimal::from(total_days)).unwrap();

        let result = engine
            .calculate(&employee("emp_prop"), &template, Some(&attendance))
            .unwrap();
        let totals = &result.totals;
        let deduction_sum: Decimal = result.deductions.iter().map(|d| d.amount).sum();

        prop_assert_eq!(deduction_sum, totals.total_deductions);
        prop_assert_eq!(totals.net_salary + deduction_sum, totals.gross_salary);
        prop_assert_eq!(totals.credit_to_bank, totals.gross_salary + deduction_sum);
        prop_assert!(result.verify().is_empty(), "{:?}", result.verify());
    }
}
