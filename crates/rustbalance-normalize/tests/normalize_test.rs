//! Integration tests for the normalization pipeline.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rustbalance_booking::net_change_all;
use rustbalance_core::{
    Account, Category, CategoryKind, Chart, Classification, Impact, Metric, NaiveDate, Origin,
    Picklist, RunConfig, SecurityFlag, Sign, TaxRates, Transaction,
};
use rustbalance_normalize::{ensure_deferred_tax_accounts, normalize};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn chart() -> Chart {
    let mut chart = Chart::new(vec![
        Account::new(1, "Checking", "Cash", Classification::Asset, Sign::Positive),
        Account::new(2, "Cash - Brokerage", "Cash", Classification::Asset, Sign::Positive),
        Account::new(3, "Brokerage - ABC", "Marketable Securities", Classification::Asset, Sign::Positive)
            .with_baseline(dec!(1000))
            .with_security("ABC", dec!(100), dec!(1000)),
        Account::new(4, "PP&E - Fixtures", "PP&E", Classification::Asset, Sign::Positive),
        Account::new(10, "Salary", "Revenue", Classification::Equity, Sign::Positive),
        Account::new(11, "Gain - Realized Investment Gain", "Gain", Classification::Equity, Sign::Positive),
        Account::new(12, "Loss - Realized Investment Loss", "Loss", Classification::Equity, Sign::Negative),
        Account::new(13, "Expense - Housing", "Expense", Classification::Equity, Sign::Negative),
    ])
    .unwrap();
    ensure_deferred_tax_accounts(&mut chart, &RunConfig::default().names).unwrap();
    chart
}

fn picklist() -> Picklist {
    let rates = TaxRates::new(dec!(0.22), dec!(0.05), dec!(0));
    [
        Category::new("Salary", CategoryKind::Income, 1),
        Category::new("Investment - Realized Gains", CategoryKind::Income, 2)
            .with_deferred_tax(rates, true),
        Category::new("Investment Expense - Realized Loss", CategoryKind::Expense, 3)
            .with_deferred_tax(rates, true),
        Category::new("Housing Expense - Fixture Investment", CategoryKind::Expense, 4),
        Category::new("Housing Expense - Depreciation", CategoryKind::Expense, 4),
    ]
    .into_iter()
    .collect()
}

fn config() -> RunConfig {
    RunConfig::new(date(2021, 1, 1), date(2024, 1, 1), date(2024, 12, 31))
}

#[test]
fn test_depreciation_scenario() {
    let raw = vec![Transaction::new(
        date(2021, 1, 15),
        "Water heater",
        Impact::decrease("Checking"),
        Impact::increase("PP&E - Fixtures"),
        dec!(1200),
    )
    .with_expense_category("Housing Expense - Fixture Investment")
    .with_lifetime(dec!(12))];

    let ledger = normalize(&raw, &chart(), &picklist(), &config());
    let schedule: Vec<_> = ledger
        .transactions
        .iter()
        .filter(|t| t.origin == Origin::Depreciation)
        .collect();

    assert_eq!(schedule.len(), 12);
    assert!(schedule.iter().all(|t| t.amount == dec!(100)));
    let expected: Vec<_> = (0..12)
        .map(|i| {
            let (year, month) = if i < 11 { (2021, i + 2) } else { (2022, 1) };
            date(year, month, 15)
        })
        .collect();
    let dates: Vec<_> = schedule.iter().map(|t| t.close_date).collect();
    assert_eq!(dates, expected);
}

#[test]
fn test_realized_gain_scenario() {
    let raw = vec![Transaction::new(
        date(2024, 3, 1),
        "Sell ABC",
        Impact::increase("Cash - Brokerage"),
        Impact::decrease("Brokerage - ABC"),
        dec!(1500),
    )
    .with_quantity(dec!(100))
    .with_security_flag(SecurityFlag::Sale)];

    let ledger = normalize(&raw, &chart(), &picklist(), &config());
    let sale = ledger
        .transactions
        .iter()
        .find(|t| t.is_sale())
        .unwrap();
    assert_eq!(sale.amount, dec!(1000));

    let gains: Vec<_> = ledger
        .transactions
        .iter()
        .filter(|t| t.origin == Origin::RealizedGainLoss)
        .collect();
    assert_eq!(gains.len(), 1);
    assert_eq!(gains[0].amount, dec!(500));
    assert_eq!(gains[0].second.account, "Gain - Realized Investment Gain");

    // The gain is deferred-taxable and offsetting: 500 * 27%, dated at year end
    let accruals: Vec<_> = ledger
        .transactions
        .iter()
        .filter(|t| t.origin == Origin::DeferredTax)
        .collect();
    assert_eq!(accruals.len(), 1);
    assert_eq!(accruals[0].amount, dec!(135));
    assert_eq!(accruals[0].close_date, date(2024, 12, 31));
    assert!(accruals[0].is_resolved());
}

#[test]
fn test_wash_sale_scenario() {
    let raw = vec![
        Transaction::new(
            date(2024, 5, 6),
            "Buy ABC",
            Impact::decrease("Cash - Brokerage"),
            Impact::increase("Brokerage - ABC"),
            dec!(600),
        )
        .with_quantity(dec!(50))
        .with_security_flag(SecurityFlag::Purchase),
        Transaction::new(
            date(2024, 5, 10),
            "Sell ABC",
            Impact::increase("Cash - Brokerage"),
            Impact::decrease("Brokerage - ABC"),
            dec!(500),
        )
        .with_quantity(dec!(50))
        .with_security_flag(SecurityFlag::Sale)
        .with_wash_sale(),
    ];

    let ledger = normalize(&raw, &chart(), &picklist(), &config());
    let sale = ledger
        .transactions
        .iter()
        .find(|t| t.is_sale())
        .unwrap();
    // 50 units at $12 from the lookback, not the $10 baseline
    assert_eq!(sale.amount, dec!(600));

    let loss = ledger
        .transactions
        .iter()
        .find(|t| t.origin == Origin::RealizedGainLoss)
        .unwrap();
    assert_eq!(loss.amount, dec!(100));
    assert_eq!(loss.second.account, "Loss - Realized Investment Loss");
}

#[test]
fn test_idempotent() {
    let raw = vec![
        Transaction::new(
            date(2024, 2, 1),
            "Paycheck",
            Impact::increase("Checking"),
            Impact::increase("Salary"),
            dec!(5000),
        )
        .with_income_category("Salary"),
        Transaction::new(
            date(2024, 3, 1),
            "Sell ABC",
            Impact::increase("Cash - Brokerage"),
            Impact::decrease("Brokerage - ABC"),
            dec!(800),
        )
        .with_quantity(dec!(100))
        .with_security_flag(SecurityFlag::Sale),
    ];

    let chart = chart();
    let first = normalize(&raw, &chart, &picklist(), &config());
    let second = normalize(&raw, &chart, &picklist(), &config());
    assert_eq!(first.transactions, second.transactions);
    assert_eq!(first.issues, second.issues);
}

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|n| Decimal::new(n, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Synthetic entries keep the books balanced.
    #[test]
    fn prop_normalized_ledger_balanced(
        salaries in prop::collection::vec(arb_amount(), 0..5),
        sales in prop::collection::vec((arb_amount(), 1i64..50), 0..5),
        capex in prop::option::of((arb_amount(), 1i64..36)),
    ) {
        let mut raw = Vec::new();
        for amount in salaries {
            raw.push(
                Transaction::new(date(2024, 1, 5), "Paycheck", Impact::increase("Checking"), Impact::increase("Salary"), amount)
                    .with_income_category("Salary"),
            );
        }
        for (amount, units) in sales {
            raw.push(
                Transaction::new(date(2024, 4, 1), "Sell", Impact::increase("Cash - Brokerage"), Impact::decrease("Brokerage - ABC"), amount)
                    .with_quantity(Decimal::from(units))
                    .with_security_flag(SecurityFlag::Sale),
            );
        }
        if let Some((amount, months)) = capex {
            raw.push(
                Transaction::new(date(2023, 6, 1), "Fixture", Impact::decrease("Checking"), Impact::increase("PP&E - Fixtures"), amount)
                    .with_expense_category("Housing Expense - Fixture Investment")
                    .with_lifetime(Decimal::from(months)),
            );
        }

        let chart = chart();
        let ledger = normalize(&raw, &chart, &picklist(), &config());
        prop_assert!(ledger.issues.is_empty());
        prop_assert!(ledger.transactions.iter().all(Transaction::is_resolved));

        let total: Decimal = net_change_all(&ledger.transactions, Metric::Amount)
            .iter()
            .map(|(id, value)| chart.get(*id).unwrap().equation_effect(*value))
            .sum();
        // Depreciation splits amounts at full precision
        prop_assert_eq!(total.round_dp(12), Decimal::ZERO);
    }
}
