//! Integration tests for the consistency checks.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use rustbalance_booking::Valuation;
use rustbalance_core::{
    Account, AccountNames, Chart, Classification, DataIntegrityError, Impact, IntegrityCode, Sign,
    Transaction,
};
use rustbalance_report::roll_up;
use rustbalance_validate::{check, Check, CheckInput};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn chart(opening: rust_decimal::Decimal) -> Chart {
    Chart::new(vec![
        Account::new(1, "Checking", "Cash", Classification::Asset, Sign::Positive)
            .with_baseline(dec!(1000)),
        Account::new(2, "Opening Balance", "Equity", Classification::Equity, Sign::Positive)
            .with_baseline(opening),
        Account::new(3, "Salary", "Revenue", Classification::Equity, Sign::Positive),
    ])
    .unwrap()
}

fn paycheck(chart: &Chart) -> Transaction {
    Transaction::new(
        date(2024, 1, 5),
        "Paycheck",
        Impact::increase("Checking"),
        Impact::increase("Salary"),
        dec!(500),
    )
    .resolve(chart)
}

#[test]
fn test_clean_run_passes_everything() {
    let chart = chart(dec!(1000));
    let txns = vec![paycheck(&chart)];
    let sheet = roll_up(&chart, &txns, &Valuation::default(), &AccountNames::default());

    let report = check(
        &CheckInput {
            sheet: &sheet,
            transactions: &txns,
            issues: &[],
        },
        dec!(0.01),
    );

    assert!(report.all_passed());
    assert_eq!(report.results.len(), 4);
    let lines: Vec<_> = report.results.iter().map(ToString::to_string).collect();
    assert_eq!(lines[0], "(1) \u{2713} Accounting Equation Preserved");
    assert_eq!(lines[2], "(3) \u{2713} Account names are standardized");
}

#[test]
fn test_unbalanced_baseline_fails_equation() {
    let chart = chart(dec!(990));
    let sheet = roll_up(&chart, &[], &Valuation::default(), &AccountNames::default());

    let report = check(
        &CheckInput {
            sheet: &sheet,
            transactions: &[],
            issues: &[],
        },
        dec!(0.01),
    );

    assert!(!report.equation_holds());
    assert_eq!(report.failed(), 1);
    let equation = report.get(Check::AccountingEquation).unwrap();
    assert_eq!(equation.detail.as_deref(), Some("A - (L + E) = 10"));
}

#[test]
fn test_gap_within_tolerance_passes() {
    let chart = chart(dec!(999.995));
    let sheet = roll_up(&chart, &[], &Valuation::default(), &AccountNames::default());
    let report = check(
        &CheckInput {
            sheet: &sheet,
            transactions: &[],
            issues: &[],
        },
        dec!(0.01),
    );
    assert!(report.equation_holds());
}

#[test]
fn test_stage_issues_routed_to_checks() {
    let chart = chart(dec!(1000));
    let sheet = roll_up(&chart, &[], &Valuation::default(), &AccountNames::default());
    let stray = Transaction::new(
        date(2024, 2, 1),
        "Unknown payee",
        Impact::decrease("Checking"),
        Impact::increase("Misc"),
        dec!(5),
    )
    .with_init_date(date(2024, 2, 3))
    .resolve(&chart);
    let issues = vec![
        DataIntegrityError::new(IntegrityCode::UnresolvedCategory, "Misc has no group"),
        DataIntegrityError::new(IntegrityCode::ZeroQuantityBasis, "no units held"),
    ];

    let report = check(
        &CheckInput {
            sheet: &sheet,
            transactions: std::slice::from_ref(&stray),
            issues: &issues,
        },
        dec!(0.01),
    );

    assert!(report.equation_holds());
    assert_eq!(report.failed(), 3);
    assert_eq!(report.get(Check::ReferentialIntegrity).unwrap().issues.len(), 2);
    assert_eq!(report.get(Check::LotIntegrity).unwrap().issues.len(), 1);
    assert_eq!(report.issues().count(), 4);
}
