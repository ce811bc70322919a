//! Capital-expenditure depreciation schedules.
//!
//! A capex purchase with a lifetime of `L` months is expensed over `L`
//! monthly synthetic transactions of `amount / L`, dated one to `L` months
//! after the purchase. Each one decreases the fixture asset and increases the
//! depreciation expense account.
//!
//! ```text
//! 2021-01-15  Buy water heater  1200.00  lifetime 12
//! ```
//!
//! expands into
//!
//! ```text
//! 2021-02-15  Fixture Depreciation  100.00  PP&E - Fixtures (-)  Expense - Housing (+)
//! ...
//! 2022-01-15  Fixture Depreciation  100.00  PP&E - Fixtures (-)  Expense - Housing (+)
//! ```

use chrono::Months;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rustbalance_core::{
    DataIntegrityError, DepreciationRule, Impact, IntegrityCode, Origin, Transaction,
};

/// Result of expanding depreciation schedules.
#[derive(Debug, Clone, Default)]
pub struct DepreciationResult {
    /// Synthetic depreciation transactions, in input order.
    pub transactions: Vec<Transaction>,
    /// Capex transactions that could not be scheduled.
    pub issues: Vec<DataIntegrityError>,
}

/// Emit the monthly depreciation of every capex transaction.
pub fn expand_depreciation(
    transactions: &[Transaction],
    rule: &DepreciationRule,
) -> DepreciationResult {
    let mut result = DepreciationResult::default();

    for capex in transactions
        .iter()
        .filter(|t| t.expense_category.as_deref() == Some(rule.capex_category.as_str()))
    {
        let months = capex
            .lifetime_months
            .map(|l| l.trunc())
            .and_then(|l| l.to_u32())
            .filter(|&l| l > 0);

        let Some(months) = months else {
            result.issues.push(
                DataIntegrityError::new(
                    IntegrityCode::InvalidLifetime,
                    format!(
                        "capital expenditure {:?} has no usable lifetime ({:?})",
                        capex.description, capex.lifetime_months
                    ),
                )
                .with_date(capex.close_date),
            );
            continue;
        };

        let monthly = capex.amount / Decimal::from(months);
        for j in 1..=months {
            let Some(date) = capex.close_date.checked_add_months(Months::new(j)) else {
                break;
            };
            result.transactions.push(
                Transaction::new(
                    date,
                    "Fixture Depreciation",
                    Impact::decrease(&rule.asset_account),
                    Impact::increase(&rule.expense_account),
                    monthly,
                )
                .with_expense_category(&rule.expense_category)
                .with_origin(Origin::Depreciation),
            );
        }
    }

    result
}
