//! Full pipeline benchmarks (normalize -> value -> roll up -> check).
//!
//! Run with: cargo bench -p rustbalance

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rustbalance::run_with_prices;
use rustbalance_booking::{PriceTable, Quote};
use rustbalance_core::{
    Account, Category, CategoryKind, Chart, Classification, Impact, Picklist, PriceMetric,
    RunConfig, SecurityFlag, Sign, Transaction,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn chart() -> Chart {
    Chart::new(vec![
        Account::new(1, "Checking", "Cash", Classification::Asset, Sign::Positive)
            .with_baseline(dec!(10000)),
        Account::new(2, "Brokerage - ABC", "Marketable Securities", Classification::Asset, Sign::Positive)
            .with_baseline(dec!(5000))
            .with_security("ABC", dec!(500), dec!(5000)),
        Account::new(3, "Credit Card", "Credit Card", Classification::Liability, Sign::Positive),
        Account::new(4, "Opening Balance", "Equity", Classification::Equity, Sign::Positive)
            .with_baseline(dec!(15000)),
        Account::new(5, "Salary", "Revenue", Classification::Equity, Sign::Positive),
        Account::new(6, "Groceries", "Expense", Classification::Equity, Sign::Negative),
        Account::new(7, "Gain - Realized Investment Gain", "Gain", Classification::Equity, Sign::Positive),
        Account::new(8, "Loss - Realized Investment Loss", "Loss", Classification::Equity, Sign::Negative),
        Account::new(9, "Unrealized Investment Gain", "Gain", Classification::Equity, Sign::Positive),
        Account::new(10, "Unrealized Investment Loss", "Loss", Classification::Equity, Sign::Negative),
    ])
    .unwrap()
}

fn picklist() -> Picklist {
    [
        Category::new("Salary", CategoryKind::Income, 1)
            .with_group("Employment")
            .with_pnl("Income", "Wages"),
        Category::new("Groceries", CategoryKind::Expense, 10)
            .with_group("Food")
            .with_pnl("Living", "Food"),
    ]
    .into_iter()
    .collect()
}

/// Generate a realistic ledger with N transactions.
fn generate_ledger(num_transactions: usize) -> Vec<Transaction> {
    let start = date(2022, 1, 1);
    (0..num_transactions)
        .map(|i| {
            let day = start + Days::new((i % 900) as u64);
            match i % 10 {
                0 => Transaction::new(
                    day,
                    "Paycheck",
                    Impact::increase("Checking"),
                    Impact::increase("Salary"),
                    dec!(2500),
                )
                .with_income_category("Salary"),
                1 => Transaction::new(
                    day,
                    "Buy ABC",
                    Impact::decrease("Checking"),
                    Impact::increase("Brokerage - ABC"),
                    dec!(110),
                )
                .with_quantity(dec!(10))
                .with_security_flag(SecurityFlag::Purchase),
                2 => Transaction::new(
                    day,
                    "Card payment",
                    Impact::decrease("Checking"),
                    Impact::decrease("Credit Card"),
                    dec!(50),
                ),
                _ => Transaction::new(
                    day,
                    "Market",
                    Impact::increase("Credit Card"),
                    Impact::increase("Groceries"),
                    Decimal::from(20 + (i % 37) as i64),
                )
                .with_expense_category("Groceries"),
            }
        })
        .collect()
}

fn prices() -> PriceTable {
    let mut table = PriceTable::new(PriceMetric::AdjClose);
    table.insert(
        "ABC",
        date(2024, 6, 28),
        Quote {
            adj_close: Some(dec!(14.25)),
            ..Quote::default()
        },
    );
    table
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    let config = RunConfig::new(date(2021, 6, 25), date(2024, 1, 1), date(2024, 6, 30));
    let prices = prices();

    for size in [100, 1000, 10000] {
        let ledger = generate_ledger(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &ledger, |b, ledger| {
            b.iter(|| {
                let output = run_with_prices(
                    chart(),
                    picklist(),
                    black_box(ledger.clone()),
                    config.clone(),
                    &prices,
                )
                .unwrap();
                black_box(output.checks.all_passed())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_pipeline);
criterion_main!(benches);
