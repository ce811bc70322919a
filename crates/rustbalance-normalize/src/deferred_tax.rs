//! Deferred taxes on realized income.
//!
//! Realized income tagged with a deferred-taxable category accrues a tax
//! liability until the return is filed. Each accrual is one synthetic
//! transaction increasing both the deferred-tax expense and the payable.
//!
//! Non-offsetting categories accrue per category over the whole window.
//! Offsetting categories (e.g. capital gains against capital losses) are
//! netted per calendar year and floored at zero, with no carryforward.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rustbalance_core::{
    Account, AccountId, AccountNames, Category, CategoryKind, Chart, ChartError, Classification,
    Impact, Origin, Picklist, RunConfig, Sign, Transaction,
};
use std::collections::BTreeMap;

/// Add the deferred-tax payable and expense accounts when the chart lacks
/// them. Returns the ids of the added accounts.
pub fn ensure_deferred_tax_accounts(
    chart: &mut Chart,
    names: &AccountNames,
) -> Result<Vec<AccountId>, ChartError> {
    let wanted = [
        (
            &names.deferred_tax_payable,
            "Deferred Taxes",
            Classification::Liability,
            Sign::Positive,
        ),
        (
            &names.deferred_tax_expense,
            "Expense",
            Classification::Equity,
            Sign::Negative,
        ),
    ];

    let mut added = Vec::new();
    for (name, account_type, classification, sign) in wanted {
        if chart.by_name(name).is_some() {
            continue;
        }
        let id = chart.max_id() + 1;
        chart.insert(Account::new(id, name.clone(), account_type, classification, sign))?;
        tracing::debug!("synthesized account {id} {name:?}");
        added.push(id);
    }
    Ok(added)
}

/// Deferred-tax transactions for the realized income in `transactions`.
pub fn deferred_tax_entries(
    transactions: &[Transaction],
    picklist: &Picklist,
    config: &RunConfig,
) -> Vec<Transaction> {
    let base: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.close_date >= config.deferred_tax_start && t.close_date <= config.end_date)
        .filter(|t| {
            !config.is_tax_excluded(&t.first.account) && !config.is_tax_excluded(&t.second.account)
        })
        .collect();

    let mut entries = Vec::new();
    let mut offsetting: BTreeMap<i32, Decimal> = BTreeMap::new();

    for category in picklist.deferred_taxable() {
        let Some(rates) = category.deferred_tax else {
            continue;
        };
        let rate = rates.total();
        let tagged = base.iter().filter(|t| is_tagged(t, category));

        if category.tax_offsetting {
            for txn in tagged {
                *offsetting.entry(txn.close_date.year()).or_default() +=
                    category.kind.vector() * txn.amount * rate;
            }
        } else {
            let total: Decimal = tagged.map(|t| t.amount).sum();
            let tax = category.kind.vector() * total * rate;
            if !tax.is_zero() {
                entries.push(accrual(
                    config.end_date,
                    format!("Deferred Taxes - {}", category.name),
                    tax,
                    &config.names,
                ));
            }
        }
    }

    for (year, net) in offsetting {
        let tax = net.max(Decimal::ZERO);
        if tax.is_zero() {
            continue;
        }
        let year_end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(config.end_date);
        entries.push(accrual(
            year_end.min(config.end_date),
            format!("Deferred Taxes - {year} net realized income"),
            tax,
            &config.names,
        ));
    }

    tracing::debug!(
        "{} deferred-tax entries from {} transactions in window",
        entries.len(),
        base.len()
    );
    entries
}

fn is_tagged(txn: &Transaction, category: &Category) -> bool {
    let tag = match category.kind {
        CategoryKind::Income => txn.income_category.as_deref(),
        CategoryKind::Expense => txn.expense_category.as_deref(),
    };
    tag == Some(category.name.as_str())
}

/// One accrual; a negative `tax` reverses both sides.
fn accrual(date: NaiveDate, description: String, tax: Decimal, names: &AccountNames) -> Transaction {
    let sign = if tax.is_sign_negative() {
        Sign::Negative
    } else {
        Sign::Positive
    };
    Transaction::new(
        date,
        description,
        Impact::new(names.deferred_tax_expense.clone(), sign),
        Impact::new(names.deferred_tax_payable.clone(), sign),
        tax.abs(),
    )
    .with_origin(Origin::DeferredTax)
}
